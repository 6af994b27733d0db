//! Named action registry.
//!
//! Manifests on disk refer to functions by name; the registry maps those
//! names to the compiled handler and middleware functions of the binary.

use std::collections::HashMap;
use std::fmt;

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, StatusCode};
use axum::response::IntoResponse;

use crate::routing::{handler_fn, middleware_fn, Handler, Middleware, Next};

/// Action table consulted when a manifest is loaded.
#[derive(Clone, Default)]
pub struct Registry {
    handlers: HashMap<String, Handler>,
    middleware: HashMap<String, Middleware>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the built-in actions:
    ///
    /// | Kind | Name | Behavior |
    /// |---|---|---|
    /// | handler | `health.liveness` | `200 ok` |
    /// | handler | `health.readiness` | `200 ready` |
    /// | handler | `echo` | `200` with `METHOD /path` |
    /// | handler | `not_found` | `404` |
    /// | middleware | `log.request` | logs method and path, then continues |
    /// | middleware | `headers.server` | adds `server: vhostd` to the response |
    pub fn with_builtins() -> Self {
        Self::new()
            .handler("health.liveness", handler_fn(|_req: Request<Body>| async { "ok" }))
            .handler("health.readiness", handler_fn(|_req: Request<Body>| async { "ready" }))
            .handler(
                "echo",
                handler_fn(|req: Request<Body>| async move {
                    format!("{} {}", req.method(), req.uri().path())
                }),
            )
            .handler(
                "not_found",
                handler_fn(|_req: Request<Body>| async { StatusCode::NOT_FOUND.into_response() }),
            )
            .middleware(
                "log.request",
                middleware_fn(|req: Request<Body>, next: Next| async move {
                    tracing::info!(method = %req.method(), path = %req.uri().path(), "request");
                    next.run(req).await
                }),
            )
            .middleware(
                "headers.server",
                middleware_fn(|req: Request<Body>, next: Next| async move {
                    let mut response = next.run(req).await;
                    response
                        .headers_mut()
                        .insert(header::SERVER, HeaderValue::from_static("vhostd"));
                    response
                }),
            )
    }

    /// Register a handler action. Returns `self` for chaining.
    pub fn handler(mut self, name: impl Into<String>, handler: Handler) -> Self {
        self.handlers.insert(name.into(), handler);
        self
    }

    /// Register a middleware action. Returns `self` for chaining.
    pub fn middleware(mut self, name: impl Into<String>, middleware: Middleware) -> Self {
        self.middleware.insert(name.into(), middleware);
        self
    }

    pub fn get_handler(&self, name: &str) -> Option<Handler> {
        self.handlers.get(name).cloned()
    }

    pub fn get_middleware(&self, name: &str) -> Option<Middleware> {
        self.middleware.get(name).cloned()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut handlers: Vec<_> = self.handlers.keys().collect();
        let mut middleware: Vec<_> = self.middleware.keys().collect();
        handlers.sort();
        middleware.sort();
        f.debug_struct("Registry")
            .field("handlers", &handlers)
            .field("middleware", &middleware)
            .finish()
    }
}
