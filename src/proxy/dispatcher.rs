//! Hostname-keyed reverse proxy.
//!
//! # Responsibilities
//! - Look up the request hostname in the proxy route table
//! - Forward matching requests to `http://<backend><path-and-query>`
//! - Rewrite response headers that mention the backend address
//! - Pass everything else on to the rest of the tree
//!
//! # Design Decisions
//! - Lookups run on the blocking pool; the file store does synchronous I/O
//! - A lookup error is logged and treated as a miss
//! - No retries: an unreachable backend is an immediate 502

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::{Request, StatusCode, Uri, Version};
use axum::response::{IntoResponse, Response};
use hyper::body::Incoming;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;

use crate::http::request::hostname;
use crate::observability::metrics;
use crate::proxy::rewrite::rewrite_headers;
use crate::routing::{middleware_fn, Middleware, Next, RegisteredEntry};
use crate::store::{ProxyRoute, RouteLookup, StoreError};

/// Name of the registered proxy entry in tree dumps.
pub const ENTRY_NAME: &str = "reverse-proxy";

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Forwards requests for proxied hostnames to their backends.
#[derive(Clone)]
pub struct ProxyDispatcher {
    lookup: Arc<dyn RouteLookup>,
    client: Client<HttpConnector, Body>,
}

impl ProxyDispatcher {
    pub fn new(lookup: Arc<dyn RouteLookup>) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { lookup, client }
    }

    /// The dispatcher as a middleware function.
    pub fn middleware(&self) -> Middleware {
        let dispatcher = self.clone();
        middleware_fn(move |req: Request<Body>, next: Next| dispatcher.clone().handle(req, next))
    }

    /// The dispatcher as a root-level entry at `priority`.
    pub fn entry(&self, priority: i64) -> RegisteredEntry {
        RegisteredEntry::middleware(ENTRY_NAME, priority, self.middleware())
    }

    async fn handle(self, req: Request<Body>, next: Next) -> Response {
        let Some(host) = hostname(&req) else {
            return next.run(req).await;
        };

        let route = match self.find(&host).await {
            Ok(Some(route)) => route,
            Ok(None) => return next.run(req).await,
            Err(e) => {
                tracing::error!(hostname = %host, error = %e, "proxy lookup failed, falling through");
                return next.run(req).await;
            }
        };

        let start = Instant::now();
        let response = self.forward(req, &host, &route).await;
        metrics::record_proxy(&route.backend_hostname, response.status().as_u16(), start);
        response
    }

    async fn find(&self, host: &str) -> Result<Option<ProxyRoute>, StoreError> {
        let lookup = Arc::clone(&self.lookup);
        let host = host.to_string();
        tokio::task::spawn_blocking(move || lookup.lookup(&host))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    async fn forward(&self, req: Request<Body>, host: &str, route: &ProxyRoute) -> Response {
        let (mut parts, body) = req.into_parts();
        let path_and_query = parts.uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

        let uri = match format!("http://{}{}", route.backend_hostname, path_and_query).parse::<Uri>() {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!(backend = %route.backend_hostname, error = %e, "invalid backend address");
                return (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response();
            }
        };

        let client_ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        strip_hop_by_hop(&mut parts.headers);
        add_forwarded(&mut parts.headers, host, client_ip);
        parts.uri = uri;
        parts.version = Version::HTTP_11;

        tracing::debug!(hostname = %host, backend = %route.backend_hostname, uri = %parts.uri, "proxying request");

        match self.client.request(Request::from_parts(parts, body)).await {
            Ok(response) => relay(response, route),
            Err(e) => {
                tracing::error!(hostname = %host, backend = %route.backend_hostname, error = %e, "upstream error");
                (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response()
            }
        }
    }
}

/// Turn a backend response into ours, hiding the backend address.
fn relay(response: hyper::Response<Incoming>, route: &ProxyRoute) -> Response {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    rewrite_headers(&mut parts.headers, &route.backend_hostname, &route.external_hostname);
    Response::from_parts(parts, Body::new(body))
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    for name in &named {
        headers.remove(name);
    }
}

fn add_forwarded(headers: &mut HeaderMap, host: &str, client_ip: Option<std::net::IpAddr>) {
    if let Ok(value) = HeaderValue::from_str(host) {
        headers.insert("x-forwarded-host", value);
    }
    headers.insert("x-forwarded-proto", HeaderValue::from_static("http"));

    if let Some(ip) = client_ip {
        let chain = match headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
            Some(existing) => format!("{existing}, {ip}"),
            None => ip.to_string(),
        };
        if let Ok(value) = HeaderValue::from_str(&chain) {
            headers.insert("x-forwarded-for", value);
        }
    }
}
