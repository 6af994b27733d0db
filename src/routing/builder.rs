//! Directory router builder.
//!
//! # Responsibilities
//! - Walk one directory level (possibly several roots merged into one level)
//! - Load and validate handler modules, skipping and logging failures
//! - Merge routes and middleware by priority
//! - Build one child router per subdirectory name, mounted at `/<name>`
//! - Return the live node together with its description
//!
//! # Design Decisions
//! - Pure recursion: each level returns a fresh value, nothing is mutated
//!   in place across levels
//! - Child routers are mounted once, immediately before the first entry with
//!   priority ≤ 0 (or at the end), so positive priorities always win over
//!   subdirectories
//! - A level with no valid handler still mounts all of its children

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::discovery::{EntryKind, ModuleSource};
use crate::http::statics;
use crate::routing::describe::{EntryDescription, RouterDescription};
use crate::routing::matcher::PathPattern;
use crate::routing::merge::{merge, partition_point, RegisteredEntry, UseGroup};
use crate::routing::node::{Layer, RouterNode};
use crate::routing::resolver::Resolver;
use crate::routing::validator::{validate, HandlerDefinition};

/// Result of building one router.
#[derive(Debug, Clone)]
pub struct Built {
    pub node: Arc<RouterNode>,
    pub description: RouterDescription,
}

/// Builds router trees from a [`ModuleSource`].
pub struct RouterBuilder<'a> {
    source: &'a dyn ModuleSource,
    use_dirs: Vec<PathBuf>,
    globals: Option<UseGroup>,
    explicit: Vec<RegisteredEntry>,
}

impl<'a> RouterBuilder<'a> {
    pub fn new(source: &'a dyn ModuleSource) -> Self {
        Self {
            source,
            use_dirs: Vec::new(),
            globals: None,
            explicit: Vec::new(),
        }
    }

    /// Directories searched for named middleware.
    pub fn use_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.use_dirs = dirs;
        self
    }

    /// Router-wide middleware merged into the root level.
    pub fn globals(mut self, group: UseGroup) -> Self {
        self.globals = Some(group);
        self
    }

    /// An entry registered at the root level, e.g. the reverse proxy.
    pub fn entry(mut self, entry: RegisteredEntry) -> Self {
        self.explicit.push(entry);
        self
    }

    /// Build a tree rooted at `/` from one or more directories and log its dump.
    pub fn build(&self, dirs: &[PathBuf]) -> Built {
        let built = self.build_level(dirs, "/", true);
        tracing::info!(
            routes = built.description.route_count(),
            "router tree built\n{}",
            built.description
        );
        built
    }

    fn build_level(&self, dirs: &[PathBuf], mount_path: &str, root: bool) -> Built {
        let resolver = Resolver::new(self.source, &self.use_dirs);
        let mut handlers = Vec::new();
        let mut subdirs: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();

        for dir in dirs {
            let listing = match self.source.list(dir) {
                Ok(listing) => listing,
                Err(e) => {
                    tracing::error!(dir = %dir.display(), error = %e, "cannot list route directory");
                    continue;
                }
            };

            for entry in listing {
                match entry.kind {
                    EntryKind::Dir => subdirs.entry(entry.name).or_default().push(entry.path),
                    EntryKind::File if self.source.is_module(&entry.path) => {
                        if let Some(def) = self.load(&entry.path) {
                            handlers.push(def);
                        }
                    }
                    EntryKind::File => {}
                }
            }
        }

        let (group, explicit) = if root {
            (self.globals.as_ref(), self.explicit.as_slice())
        } else {
            (None, &[][..])
        };
        let sequence = merge(&handlers, group, explicit, &resolver);
        let mount_at = partition_point(&sequence);

        let children: Vec<(String, Built)> = subdirs
            .into_iter()
            .map(|(name, paths)| {
                let prefix = format!("/{name}");
                let child = self.build_level(&paths, &prefix, false);
                (prefix, child)
            })
            .collect();

        let mut node = RouterNode::new(mount_path);
        let mut entries = Vec::with_capacity(sequence.len() + children.len());
        let mut descriptions = Vec::with_capacity(children.len());
        let mut children = Some(children);

        for (index, entry) in sequence.into_iter().enumerate() {
            if index == mount_at {
                self.mount_children(children.take(), &mut node, &mut entries, &mut descriptions);
            }
            self.register(entry, &mut node, &mut entries);
        }
        self.mount_children(children.take(), &mut node, &mut entries, &mut descriptions);

        let description = RouterDescription {
            id: node.id(),
            mount_path: mount_path.to_string(),
            entries,
            children: descriptions,
        };
        Built {
            node: Arc::new(node),
            description,
        }
    }

    fn load(&self, path: &Path) -> Option<HandlerDefinition> {
        let module = match self.source.load_handler(path) {
            Ok(module) => module,
            Err(e) => {
                tracing::error!(file = %path.display(), error = %e, "failed to load handler");
                return None;
            }
        };
        let def = validate(module, path).ok()?;
        tracing::info!(
            file = %path.display(),
            path = %def.path,
            priority = def.priority,
            methods = ?def.methods.keys().collect::<Vec<_>>(),
            "loaded handler"
        );
        Some(def)
    }

    fn mount_children(
        &self,
        children: Option<Vec<(String, Built)>>,
        node: &mut RouterNode,
        entries: &mut Vec<EntryDescription>,
        descriptions: &mut Vec<RouterDescription>,
    ) {
        for (prefix, child) in children.into_iter().flatten() {
            tracing::info!(
                parent = %node.mount_path(),
                mount = %prefix,
                router = %child.node.id(),
                "mounted subrouter"
            );
            entries.push(EntryDescription::Mount {
                path: prefix.clone(),
                router: child.node.id(),
            });
            descriptions.push(child.description);
            node.push(Layer::Mount {
                prefix,
                node: child.node,
            });
        }
    }

    fn register(&self, entry: RegisteredEntry, node: &mut RouterNode, entries: &mut Vec<EntryDescription>) {
        match entry {
            RegisteredEntry::Route { path, method, priority, source, handler } => {
                let pattern = match PathPattern::new(&path) {
                    Ok(pattern) => pattern,
                    Err(e) => {
                        tracing::warn!(file = %source.display(), path = %path, error = %e, "skipping route: invalid path");
                        return;
                    }
                };
                node.push(Layer::Route { pattern, method, handler });
                entries.push(EntryDescription::Route { path, method, priority, source });
            }
            RegisteredEntry::Use { name, priority, function } => {
                node.push(Layer::Use(function));
                entries.push(EntryDescription::Use { name, priority });
            }
            RegisteredEntry::Static { dir, priority } => {
                node.push(Layer::Use(statics::serve_dir(dir.clone())));
                entries.push(EntryDescription::Static { dir, priority });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{HandlerModule, MemorySource, MiddlewareModule, UseRef};
    use crate::routing::matcher::PathParams;
    use crate::routing::method::Method;
    use crate::routing::{handler_fn, middleware_fn, Handler, Middleware, Next};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;

    fn text(body: &'static str) -> Handler {
        handler_fn(move |_req: Request<Body>| async move { body })
    }

    fn pass() -> Middleware {
        middleware_fn(|req: Request<Body>, next: Next| async move { next.run(req).await })
    }

    /// Middleware appending `tag` to an `x-trail` response header.
    fn trail(tag: &'static str) -> Middleware {
        middleware_fn(move |req: Request<Body>, next: Next| async move {
            let mut response = next.run(req).await;
            let previous = response
                .headers()
                .get("x-trail")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            let value = if previous.is_empty() { tag.to_string() } else { format!("{tag},{previous}") };
            response.headers_mut().insert("x-trail", value.parse().unwrap());
            response
        })
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_of(response: Response) -> String {
        String::from_utf8(to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()).unwrap()
    }

    fn example_source() -> MemorySource {
        MemorySource::new()
            .handler(
                "/routes/a.js",
                HandlerModule::new().path("/x").priority(5).method("get", text("x")),
            )
            .handler(
                "/routes/b.js",
                HandlerModule::new().path("/y").method("post", text("y")),
            )
            .dir("/routes/admin")
    }

    #[test]
    fn test_mount_goes_before_first_non_positive_entry() {
        let source = example_source();
        let built = RouterBuilder::new(&source).build(&[PathBuf::from("/routes")]);
        let entries = &built.description.entries;

        assert_eq!(entries.len(), 3);
        assert!(matches!(
            &entries[0],
            EntryDescription::Route { path, method: Method::Get, priority: 5, .. } if path == "/x"
        ));
        assert!(matches!(&entries[1], EntryDescription::Mount { path, .. } if path == "/admin"));
        assert!(matches!(
            &entries[2],
            EntryDescription::Route { path, method: Method::Post, priority: 0, .. } if path == "/y"
        ));
        assert_eq!(built.description.children.len(), 1);
        assert_eq!(built.description.children[0].mount_path, "/admin");
    }

    #[test]
    fn test_mounts_at_end_when_all_positive() {
        let source = MemorySource::new()
            .handler("/r/a", HandlerModule::new().path("/x").priority(3).method("get", text("x")))
            .dir("/r/sub");
        let built = RouterBuilder::new(&source).build(&[PathBuf::from("/r")]);

        assert!(matches!(built.description.entries.last(), Some(EntryDescription::Mount { .. })));
    }

    #[test]
    fn test_subdirectories_only() {
        let source = MemorySource::new()
            .dir("/r/alpha")
            .dir("/r/beta")
            .handler("/r/broken", HandlerModule::new().method("get", text("no path")))
            .dir("/r/gamma/deeper");
        let built = RouterBuilder::new(&source).build(&[PathBuf::from("/r")]);

        let mounts: Vec<&str> = built
            .description
            .entries
            .iter()
            .filter_map(|e| match e {
                EntryDescription::Mount { path, .. } => Some(path.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(mounts, vec!["/alpha", "/beta", "/gamma"]);
        assert_eq!(built.description.entries.len(), 3);
        assert_eq!(built.description.children[2].children[0].mount_path, "/deeper");
    }

    #[test]
    fn test_load_failures_are_skipped() {
        let source = MemorySource::new()
            .broken("/r/a", "syntax error")
            .handler("/r/b", HandlerModule::new().path("/ok").method("get", text("ok")))
            .handler("/r/c", HandlerModule::new().path("/users/:").method("get", text("bad")));
        let built = RouterBuilder::new(&source).build(&[PathBuf::from("/r")]);

        assert_eq!(built.description.route_count(), 1);
    }

    #[test]
    fn test_rebuild_is_structurally_identical() {
        let source = example_source()
            .middleware("/use/auth/check", MiddlewareModule::new(pass()).priority(2))
            .handler(
                "/routes/admin/index",
                HandlerModule::new()
                    .path("/")
                    .method("get", text("admin"))
                    .use_ref(UseRef::Named("auth".into())),
            );
        let builder = RouterBuilder::new(&source).use_dirs(vec![PathBuf::from("/use")]);

        let first = builder.build(&[PathBuf::from("/routes")]);
        let second = builder.build(&[PathBuf::from("/routes")]);
        assert_ne!(first.description.id, second.description.id);
        assert_eq!(first.description.without_ids(), second.description.without_ids());
    }

    #[test]
    fn test_multiple_roots_merge_into_one_level() {
        let source = MemorySource::new()
            .handler("/one/a", HandlerModule::new().path("/a").method("get", text("a")))
            .handler("/one/shared/x", HandlerModule::new().path("/x").method("get", text("x")))
            .handler("/two/b", HandlerModule::new().path("/b").method("get", text("b")))
            .handler("/two/shared/y", HandlerModule::new().path("/y").method("get", text("y")));
        let built = RouterBuilder::new(&source).build(&[PathBuf::from("/one"), PathBuf::from("/two")]);

        assert_eq!(built.description.children.len(), 1);
        assert_eq!(built.description.children[0].mount_path, "/shared");
        assert_eq!(built.description.route_count(), 4);
    }

    #[tokio::test]
    async fn test_dispatch_routes_and_mounts() {
        let source = example_source().handler(
            "/routes/admin/users",
            HandlerModule::new().path("/users/:id").method("get", handler_fn(
                |req: Request<Body>| async move {
                    let params = req.extensions().get::<PathParams>().cloned().unwrap_or_default();
                    format!("user {}", params.get("id").unwrap_or("?"))
                },
            )),
        );
        let root = RouterBuilder::new(&source).build(&[PathBuf::from("/routes")]).node;

        let response = root.dispatch(get("/x")).await;
        assert_eq!(body_of(response).await, "x");

        let response = root.dispatch(get("/admin/users/42")).await;
        assert_eq!(body_of(response).await, "user 42");

        let post = Request::builder().method("POST").uri("/y").body(Body::empty()).unwrap();
        assert_eq!(body_of(root.dispatch(post).await).await, "y");

        // Wrong method falls off the end of the tree.
        let response = root.dispatch(get("/y")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_child_miss_falls_back_to_parent_stack() {
        let source = MemorySource::new()
            .handler(
                "/r/fallback",
                HandlerModule::new().path("*rest").priority(-10).method("all", text("fallback")),
            )
            .handler("/r/admin/a", HandlerModule::new().path("/a").method("get", text("admin a")));
        let root = RouterBuilder::new(&source).build(&[PathBuf::from("/r")]).node;

        assert_eq!(body_of(root.dispatch(get("/admin/a")).await).await, "admin a");
        assert_eq!(body_of(root.dispatch(get("/admin/zzz")).await).await, "fallback");
    }

    #[tokio::test]
    async fn test_encoded_request_reaches_directory_with_space() {
        let source = MemorySource::new()
            .handler("/r/my dir/a", HandlerModule::new().path("/a").method("get", text("spaced")));
        let root = RouterBuilder::new(&source).build(&[PathBuf::from("/r")]).node;

        assert_eq!(body_of(root.dispatch(get("/my%20dir/a")).await).await, "spaced");
    }

    #[tokio::test]
    async fn test_middleware_runs_in_priority_order() {
        let source = MemorySource::new().handler(
            "/r/a",
            HandlerModule::new()
                .path("/x")
                .priority(-5)
                .method("get", text("x"))
                .use_ref(UseRef::Inline(trail("first")))
                .use_ref(UseRef::Inline(trail("second"))),
        );
        let builder = RouterBuilder::new(&source).entry(RegisteredEntry::middleware("outer", 100, trail("outer")));
        let root = builder.build(&[PathBuf::from("/r")]).node;

        let response = root.dispatch(get("/x")).await;
        assert_eq!(
            response.headers().get("x-trail").unwrap().to_str().unwrap(),
            "outer,first,second"
        );
    }
}
