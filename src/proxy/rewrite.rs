//! Response header rewriting.

use axum::http::{HeaderMap, HeaderValue};

/// Replace every occurrence of `backend` with `external` in each header
/// value that is valid visible ASCII. Other values are left untouched.
///
/// Returns the number of headers changed.
pub fn rewrite_headers(headers: &mut HeaderMap, backend: &str, external: &str) -> usize {
    if backend.is_empty() {
        return 0;
    }

    let mut changed = 0;
    for value in headers.values_mut() {
        let Ok(text) = value.to_str() else {
            continue;
        };
        if !text.contains(backend) {
            continue;
        }
        match HeaderValue::from_str(&text.replace(backend, external)) {
            Ok(rewritten) => {
                *value = rewritten;
                changed += 1;
            }
            Err(e) => tracing::debug!(error = %e, "rewritten header value is invalid, keeping original"),
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;

    #[test]
    fn test_location_is_rewritten() {
        let mut headers = HeaderMap::new();
        headers.insert(header::LOCATION, "http://10.0.0.5:8080/cart".parse().unwrap());

        assert_eq!(rewrite_headers(&mut headers, "10.0.0.5:8080", "shop.example.com"), 1);
        assert_eq!(headers[header::LOCATION], "http://shop.example.com/cart");
    }

    #[test]
    fn test_every_occurrence_and_repeated_headers() {
        let mut headers = HeaderMap::new();
        headers.append(header::LINK, "<http://b:1/a>, <http://b:1/b>".parse().unwrap());
        headers.append(header::LINK, "<http://b:1/c>".parse().unwrap());
        headers.insert(header::CONTENT_TYPE, "text/html".parse().unwrap());

        assert_eq!(rewrite_headers(&mut headers, "b:1", "x.test"), 2);
        let links: Vec<&str> = headers
            .get_all(header::LINK)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(links, vec!["<http://x.test/a>, <http://x.test/b>", "<http://x.test/c>"]);
        assert_eq!(headers[header::CONTENT_TYPE], "text/html");
    }

    #[test]
    fn test_non_string_values_untouched() {
        let mut headers = HeaderMap::new();
        let opaque = HeaderValue::from_bytes(b"b:1 \xff").unwrap();
        headers.insert("x-binary", opaque.clone());

        assert_eq!(rewrite_headers(&mut headers, "b:1", "x.test"), 0);
        assert_eq!(headers["x-binary"], opaque);
    }

    #[test]
    fn test_empty_backend_is_noop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::LOCATION, "/cart".parse().unwrap());
        assert_eq!(rewrite_headers(&mut headers, "", "x.test"), 0);
    }
}
