//! Path matching for registered routes and mounted routers.
//!
//! # Responsibilities
//! - Compile a handler's path pattern (`/users/:id`, `/files/*`) once at build
//! - Match a router-relative path and extract named parameters
//! - Decide whether a path falls under a child router's mount prefix
//!
//! # Design Decisions
//! - Patterns compile to a single-route `matchit` tree; lookup is O(path)
//! - Matching is case-sensitive, as is prefix matching
//! - A mount prefix matches on segment boundaries only (`/admin` does not
//!   match `/administrator`)
//! - Mount prefixes are directory names, so the request segment is
//!   percent-decoded before comparing (`/my%20dir` reaches `/my dir`)

use std::borrow::Cow;
use std::collections::HashMap;

use matchit::Router as MatchitRouter;

/// Named parameters captured by a route pattern, stored in request extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(HashMap<String, String>);

impl PathParams {
    /// Returns a named parameter. For `/users/:id` on `/users/42`, `get("id")` is `Some("42")`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A compiled route path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    tree: MatchitRouter<()>,
}

impl PathPattern {
    /// Compile a pattern. `:name` captures one segment, a trailing `*` or
    /// `*name` captures the rest of the path.
    pub fn new(pattern: &str) -> Result<Self, matchit::InsertError> {
        let mut tree = MatchitRouter::new();
        tree.insert(to_matchit(pattern), ())?;
        Ok(Self {
            source: pattern.to_string(),
            tree,
        })
    }

    /// The pattern as written in the manifest.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Match a router-relative path, returning captured parameters.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let matched = self.tree.at(path).ok()?;
        Some(PathParams(
            matched
                .params
                .iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
        ))
    }
}

/// Translate `:param` / `*` segments into matchit's `{param}` / `{*rest}`.
fn to_matchit(pattern: &str) -> String {
    let normalized = if pattern.starts_with('/') {
        pattern.to_string()
    } else {
        format!("/{pattern}")
    };

    normalized
        .split('/')
        .map(|segment| {
            if let Some(name) = segment.strip_prefix(':') {
                format!("{{{name}}}")
            } else if segment == "*" {
                "{*wildcard}".to_string()
            } else if let Some(name) = segment.strip_prefix('*') {
                format!("{{*{name}}}")
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// If `path` is the single-segment mount `prefix` or lies beneath it,
/// returns the raw (still encoded) part of `path` the mount consumes.
pub fn mount_match<'p>(path: &'p str, prefix: &str) -> Option<&'p str> {
    let name = prefix.strip_prefix('/')?;
    let rest = path.strip_prefix('/')?;
    let segment = rest.split('/').next().unwrap_or(rest);

    let decoded = urlencoding::decode(segment).unwrap_or(Cow::Borrowed(segment));
    (decoded == name).then(|| &path[..segment.len() + 1])
}

/// The part of `full` below `base`, always starting with `/`.
pub fn relative_to<'a>(full: &'a str, base: &str) -> &'a str {
    match full.strip_prefix(base) {
        Some("") => "/",
        Some(rest) => rest,
        None => full,
    }
}
