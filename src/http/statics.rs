//! Static directory middleware.
//!
//! Serves files from a directory at the position its handler's priority puts
//! it in the stack. Anything the directory cannot answer (missing file,
//! non-GET/HEAD method) passes on to the rest of the stack.

use std::path::PathBuf;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, Uri};
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::routing::{middleware_fn, Middleware, Next};

/// Build a middleware serving `dir` relative to the router it is mounted on.
pub fn serve_dir(dir: PathBuf) -> Middleware {
    let service = ServeDir::new(dir);

    middleware_fn(move |req: Request<Body>, next: Next| {
        let service = service.clone();
        async move {
            if req.method() != Method::GET && req.method() != Method::HEAD {
                return next.run(req).await;
            }

            let Ok(uri) = next.relative_path(&req).parse::<Uri>() else {
                return next.run(req).await;
            };
            let mut probe = Request::new(Body::empty());
            *probe.method_mut() = req.method().clone();
            *probe.uri_mut() = uri;
            *probe.headers_mut() = req.headers().clone();

            match service.oneshot(probe).await {
                Ok(response) if response.status() != StatusCode::NOT_FOUND => response.map(Body::new),
                _ => next.run(req).await,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{HandlerModule, MemorySource};
    use crate::routing::{handler_fn, RouterBuilder};
    use axum::body::to_bytes;

    #[tokio::test]
    async fn test_serves_files_and_falls_through() {
        let public = tempfile::tempdir().unwrap();
        std::fs::write(public.path().join("hello.txt"), "hello").unwrap();

        let source = MemorySource::new().handler(
            "/r/site",
            HandlerModule::new()
                .path("/fallback")
                .priority(1)
                .method("get", handler_fn(|_req: Request<Body>| async { "fallback" }))
                .static_dir(public.path()),
        );
        let root = RouterBuilder::new(&source).build(&[PathBuf::from("/r")]).node;

        let response = root
            .dispatch(Request::builder().uri("/hello.txt").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"hello");

        let response = root
            .dispatch(Request::builder().uri("/fallback").body(Body::empty()).unwrap())
            .await;
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"fallback");

        let response = root
            .dispatch(Request::builder().uri("/missing.txt").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
