//! Live router nodes and request dispatch.
//!
//! A [`RouterNode`] holds its registrations as an ordered layer stack. A
//! request walks the stack top to bottom:
//!
//! ```text
//! Route  ── method + path match? ──▶ handler answers
//! Use    ────────────────────────▶ middleware, which may call Next::run
//! Mount  ── under prefix? ───────▶ child stack (prefix stripped),
//!                                   falling back to the rest of this stack
//! end of stack ──▶ parent's remaining stack, or 404 at the root
//! ```
//!
//! Nodes are immutable once built and shared through `Arc`; no locking is
//! needed on the request path.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::routing::handler::BoxFuture;
use crate::routing::matcher::{mount_match, relative_to, PathPattern};
use crate::routing::method::Method;
use crate::routing::{Handler, Middleware};

/// One slot of a router's stack.
pub(crate) enum Layer {
    Route {
        pattern: PathPattern,
        method: Method,
        handler: Handler,
    },
    Use(Middleware),
    Mount {
        prefix: String,
        node: Arc<RouterNode>,
    },
}

/// A mountable router: an ordered stack of registrations.
pub struct RouterNode {
    id: Uuid,
    mount_path: String,
    layers: Vec<Layer>,
}

impl RouterNode {
    pub(crate) fn new(mount_path: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            mount_path: mount_path.into(),
            layers: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mount_path(&self) -> &str {
        &self.mount_path
    }

    /// Number of registrations, mounts included.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Dispatch a request through this node as the root of a tree.
    pub fn dispatch(self: &Arc<Self>, req: Request<Body>) -> BoxFuture<Response> {
        Next {
            node: Arc::clone(self),
            index: 0,
            base: Arc::from(""),
            parent: None,
        }
        .run(req)
    }
}

impl std::fmt::Debug for RouterNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterNode")
            .field("id", &self.id)
            .field("mount_path", &self.mount_path)
            .field("layers", &self.layers.len())
            .finish()
    }
}

/// The continuation handed to middleware: the rest of the stack.
#[derive(Clone)]
pub struct Next {
    node: Arc<RouterNode>,
    index: usize,
    /// Path prefix consumed by the mounts above this node.
    base: Arc<str>,
    parent: Option<Arc<Next>>,
}

impl Next {
    /// Continue dispatch with the next registration.
    pub fn run(self, req: Request<Body>) -> BoxFuture<Response> {
        Box::pin(self.step(req))
    }

    /// The request path relative to the router this continuation belongs to.
    pub fn relative_path<'r>(&self, req: &'r Request<Body>) -> &'r str {
        relative_to(req.uri().path(), &self.base)
    }

    async fn step(mut self, mut req: Request<Body>) -> Response {
        let node = Arc::clone(&self.node);

        while let Some(layer) = node.layers.get(self.index) {
            self.index += 1;
            let path = self.relative_path(&req).to_owned();

            match layer {
                Layer::Route { pattern, method, handler } => {
                    if !method.matches(req.method()) {
                        continue;
                    }
                    if let Some(params) = pattern.matches(&path) {
                        req.extensions_mut().insert(params);
                        return handler(req).await;
                    }
                }
                Layer::Use(middleware) => {
                    return middleware(req, self.clone()).await;
                }
                Layer::Mount { prefix, node: child } => {
                    if let Some(consumed) = mount_match(&path, prefix) {
                        let base: Arc<str> = Arc::from(format!("{}{}", self.base, consumed));
                        let next = Next {
                            node: Arc::clone(child),
                            index: 0,
                            base,
                            parent: Some(Arc::new(self.clone())),
                        };
                        return next.run(req).await;
                    }
                }
            }
        }

        match self.parent {
            Some(parent) => Arc::unwrap_or_clone(parent).run(req).await,
            None => (StatusCode::NOT_FOUND, "Not Found").into_response(),
        }
    }
}
