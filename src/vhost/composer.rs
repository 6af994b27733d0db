//! Virtual host composer.
//!
//! # Responsibilities
//! - Scan every configured vhost root for `<name>.<marker>` directories
//! - Build each one's `routes/` subdirectory into an isolated tree
//! - Bind each tree to `<name>.<base_hostname>`
//!
//! # Design Decisions
//! - A vhost tree sees only the configured middleware directories plus its
//!   own `use/` directory; default-tree globals never leak into it
//! - Duplicate hostnames: the first in scan order wins
//! - One vhost's problems never stop the others from being built

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::VhostConfig;
use crate::discovery::{EntryKind, ModuleSource};
use crate::routing::{RouterBuilder, RouterDescription, RouterNode};
use crate::vhost::naming::{hostname_for, parse_vhost_dir};

/// One hostname bound to its tree.
#[derive(Debug, Clone)]
pub struct VhostMapping {
    pub hostname: String,
    pub dir: PathBuf,
    pub root: Arc<RouterNode>,
    pub description: RouterDescription,
}

/// Discovers and builds virtual hosts.
pub struct VhostComposer<'a> {
    source: &'a dyn ModuleSource,
    config: &'a VhostConfig,
    use_dirs: &'a [PathBuf],
}

impl<'a> VhostComposer<'a> {
    pub fn new(source: &'a dyn ModuleSource, config: &'a VhostConfig, use_dirs: &'a [PathBuf]) -> Self {
        Self {
            source,
            config,
            use_dirs,
        }
    }

    /// Build every vhost found under the configured roots.
    pub fn compose(&self) -> Vec<VhostMapping> {
        let mut seen = HashSet::new();
        let mut mappings = Vec::new();

        for root in &self.config.dirs {
            let listing = match self.source.list(root) {
                Ok(listing) => listing,
                Err(e) => {
                    tracing::error!(dir = %root.display(), error = %e, "cannot scan vhost root");
                    continue;
                }
            };

            for entry in listing.into_iter().filter(|e| e.kind == EntryKind::Dir) {
                let parsed = parse_vhost_dir(&entry.name, &self.config.separator, &self.config.marker);
                if !parsed.matched {
                    continue;
                }

                let hostname = hostname_for(&parsed.name, &self.config.base_hostname);
                if seen.contains(&hostname) {
                    tracing::warn!(
                        hostname = %hostname,
                        dir = %entry.path.display(),
                        "duplicate vhost hostname, keeping the first"
                    );
                    continue;
                }

                if let Some(mapping) = self.build_one(&hostname, &entry.path) {
                    seen.insert(hostname);
                    mappings.push(mapping);
                }
            }
        }

        mappings
    }

    fn build_one(&self, hostname: &str, dir: &Path) -> Option<VhostMapping> {
        let routes = dir.join("routes");
        if !self.source.is_dir(&routes) {
            tracing::warn!(hostname = %hostname, dir = %dir.display(), "vhost has no routes directory, skipping");
            return None;
        }

        tracing::info!(hostname = %hostname, dir = %dir.display(), "----- vhost begin -----");

        let mut use_dirs = self.use_dirs.to_vec();
        let own_use = dir.join("use");
        if self.source.is_dir(&own_use) {
            use_dirs.push(own_use);
        }

        let built = RouterBuilder::new(self.source).use_dirs(use_dirs).build(&[routes]);

        tracing::info!(
            hostname = %hostname,
            routes = built.description.route_count(),
            "----- vhost end -----"
        );

        Some(VhostMapping {
            hostname: hostname.to_string(),
            dir: dir.to_path_buf(),
            root: built.node,
            description: built.description,
        })
    }
}
