//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum Router that feeds every request into the current Tree
//! - Wire up middleware (request ID, tracing, panic recovery)
//! - Bind server to listener and shut down gracefully
//!
//! # Design Decisions
//! - The tree sits behind an `ArcSwap`; each request loads it once and keeps
//!   that tree until it completes, so rebuilds never disturb in-flight work
//! - A panicking handler becomes a 500 and a critical log line

use std::any::Any;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::observability::metrics;
use crate::tree::Tree;

/// Application state injected into the dispatch handler.
#[derive(Clone)]
pub struct AppState {
    pub tree: Arc<ArcSwap<Tree>>,
}

/// HTTP server in front of the dispatch tree.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(tree: Arc<ArcSwap<Tree>>) -> Self {
        let router = Self::build_router(AppState { tree });
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(dispatch))
            .route("/{*path}", any(dispatch))
            .with_state(state)
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The router, for serving on a custom transport or testing with `oneshot`.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    let tree = state.tree.load_full();
    let response = tree.dispatch(request).await;

    metrics::record_request(&method, response.status().as_u16(), start);
    response
}

fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(severity = "critical", panic = %detail, "handler panicked");

    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::discovery::{HandlerModule, MemorySource};
    use crate::routing::handler_fn;
    use std::path::PathBuf;
    use tower::ServiceExt;

    fn server(source: &MemorySource) -> HttpServer {
        let mut config = AppConfig::default();
        config.routes.dirs = vec![PathBuf::from("/routes")];
        let tree = Tree::build(&config, source, Vec::new());
        HttpServer::new(Arc::new(ArcSwap::from_pointee(tree)))
    }

    #[tokio::test]
    async fn test_request_id_and_not_found() {
        let server = server(&MemorySource::new().dir("/routes"));

        let response = server
            .router()
            .oneshot(Request::builder().uri("/nothing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_panic_becomes_500() {
        let source = MemorySource::new().handler(
            "/routes/boom",
            HandlerModule::new().path("/boom").method(
                "get",
                handler_fn(|_req: Request<Body>| async move {
                    if true {
                        panic!("boom");
                    }
                    "unreachable"
                }),
            ),
        );

        let response = server(&source)
            .router()
            .oneshot(Request::builder().uri("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
