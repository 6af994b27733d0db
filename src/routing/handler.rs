//! Handler and middleware function types.
//!
//! Discovered modules carry functions of different concrete types, so both
//! kinds are stored type-erased behind an `Arc<dyn Fn>`:
//!
//! ```text
//! async fn show(req) -> impl IntoResponse        ← compiled into the binary
//!        ↓ handler_fn(show)
//! Arc<dyn Fn(Request) -> BoxFuture<Response>>    ← Handler
//!        ↓ registered in the Registry under "users.show"
//! manifest `get = "users.show"`                  ← resolved at build time
//! ```
//!
//! Middleware receives a [`Next`] continuation and must either return a
//! response or call [`Next::run`] on every path.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};

use crate::routing::node::Next;

/// A heap-allocated, type-erased future.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// A route handler: answers a request.
pub type Handler = Arc<dyn Fn(Request<Body>) -> BoxFuture<Response> + Send + Sync + 'static>;

/// A middleware function: answers a request or passes it on through `Next`.
pub type Middleware =
    Arc<dyn Fn(Request<Body>, Next) -> BoxFuture<Response> + Send + Sync + 'static>;

/// Wraps an async function into a [`Handler`].
pub fn handler_fn<F, Fut, R>(f: F) -> Handler
where
    F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    Arc::new(move |req| {
        let fut = f(req);
        Box::pin(async move { fut.await.into_response() })
    })
}

/// Wraps an async function into a [`Middleware`].
pub fn middleware_fn<F, Fut, R>(f: F) -> Middleware
where
    F: Fn(Request<Body>, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    Arc::new(move |req, next| {
        let fut = f(req, next);
        Box::pin(async move { fut.await.into_response() })
    })
}
