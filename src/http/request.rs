//! Request inspection helpers.

use axum::body::Body;
use axum::http::{header, Request};

/// The hostname a request is addressed to: the `Host` header, else the URI
/// authority. The port is stripped and the result lowercased.
pub fn hostname(req: &Request<Body>) -> Option<String> {
    let raw = req
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| req.uri().authority().map(|authority| authority.as_str()))?;

    let host = strip_port(raw.trim());
    if host.is_empty() {
        return None;
    }
    Some(host.to_ascii_lowercase())
}

fn strip_port(authority: &str) -> &str {
    // Drop userinfo if an absolute-form authority carried one.
    let authority = authority.rsplit('@').next().unwrap_or(authority);

    if let Some(rest) = authority.strip_prefix('[') {
        // [v6]:port
        return match rest.find(']') {
            Some(end) => &authority[..end + 2],
            None => authority,
        };
    }
    match authority.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => authority,
    }
}
