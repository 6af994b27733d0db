//! The complete dispatch tree: one default router plus one per vhost.
//!
//! # Data Flow
//! ```text
//! AppConfig + ModuleSource
//!     → VhostComposer          (one isolated router per `<name>.vhost`)
//!     → RouterBuilder          (default router from routes.dirs, with
//!                               global uses, static dirs, proxy entry)
//!     → Tree
//!
//! Request → hostname → vhost router, or the default router
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use serde::Serialize;

use crate::config::AppConfig;
use crate::discovery::{ModuleSource, UseRef};
use crate::http::request::hostname;
use crate::routing::{BoxFuture, RegisteredEntry, RouterBuilder, RouterDescription, RouterNode, UseGroup};
use crate::vhost::VhostComposer;

/// Serializable view of a [`Tree`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeDescription {
    pub default: RouterDescription,
    pub vhosts: BTreeMap<String, RouterDescription>,
}

impl TreeDescription {
    pub fn without_ids(&self) -> TreeDescription {
        TreeDescription {
            default: self.default.without_ids(),
            vhosts: self
                .vhosts
                .iter()
                .map(|(host, desc)| (host.clone(), desc.without_ids()))
                .collect(),
        }
    }
}

impl std::fmt::Display for TreeDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "default:")?;
        write!(f, "{}", self.default)?;
        for (host, desc) in &self.vhosts {
            writeln!(f, "vhost {host}:")?;
            write!(f, "{desc}")?;
        }
        Ok(())
    }
}

/// A built set of routers keyed by hostname.
#[derive(Debug)]
pub struct Tree {
    default: Arc<RouterNode>,
    vhosts: HashMap<String, Arc<RouterNode>>,
    description: TreeDescription,
}

impl Tree {
    /// Build every router the configuration describes.
    ///
    /// `entries` are registered at the root of the default router only,
    /// e.g. the reverse proxy.
    pub fn build(config: &AppConfig, source: &dyn ModuleSource, entries: Vec<RegisteredEntry>) -> Tree {
        let routes = &config.routes;

        let mappings = VhostComposer::new(source, &config.vhosts, &routes.use_dirs).compose();

        let globals = UseGroup {
            uses: routes.uses.iter().cloned().map(UseRef::Named).collect(),
            starting_use_priority: routes.starting_use_priority,
            specific_use_priorities: routes.specific_use_priorities.clone(),
        };
        let mut builder = RouterBuilder::new(source)
            .use_dirs(routes.use_dirs.clone())
            .globals(globals);
        for entry in entries {
            builder = builder.entry(entry);
        }
        for dir in &routes.static_dirs {
            builder = builder.entry(RegisteredEntry::Static {
                dir: dir.clone(),
                priority: 0,
            });
        }
        let built = builder.build(&routes.dirs);

        let mut vhosts = HashMap::with_capacity(mappings.len());
        let mut descriptions = BTreeMap::new();
        for mapping in mappings {
            descriptions.insert(mapping.hostname.clone(), mapping.description);
            vhosts.insert(mapping.hostname, mapping.root);
        }

        Tree {
            default: built.node,
            vhosts,
            description: TreeDescription {
                default: built.description,
                vhosts: descriptions,
            },
        }
    }

    /// Route a request to its vhost router, or the default one.
    pub fn dispatch(&self, req: Request<Body>) -> BoxFuture<Response> {
        let node = hostname(&req)
            .and_then(|host| self.vhosts.get(&host))
            .unwrap_or(&self.default);
        node.dispatch(req)
    }

    pub fn description(&self) -> &TreeDescription {
        &self.description
    }

    pub fn vhost_count(&self) -> usize {
        self.vhosts.len()
    }
}
