//! Handler validation.
//!
//! Turns a loaded [`HandlerModule`] into a [`HandlerDefinition`] or rejects
//! it. Rejections are warnings: the caller skips the file and keeps scanning.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::discovery::{HandlerModule, UseRef};
use crate::routing::method::Method;
use crate::routing::Handler;

/// Default `starting_use_priority` for unlabelled middleware.
pub const DEFAULT_STARTING_USE_PRIORITY: i64 = -1;

/// A validated handler.
#[derive(Clone)]
pub struct HandlerDefinition {
    pub path: String,
    pub priority: i64,
    /// Only recognized methods, in [`Method`] order.
    pub methods: BTreeMap<Method, Handler>,
    pub uses: Vec<UseRef>,
    pub static_dirs: Vec<PathBuf>,
    pub starting_use_priority: i64,
    pub specific_use_priorities: Vec<i64>,
    /// File the handler was loaded from.
    pub source: PathBuf,
}

impl fmt::Debug for HandlerDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDefinition")
            .field("path", &self.path)
            .field("priority", &self.priority)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("uses", &self.uses)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Why a handler module was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("no `path` declared")]
    MissingPath,
    #[error("no recognized HTTP method declared")]
    NoMethods,
}

/// Validate a loaded module. Logs a warning on rejection and an info line
/// when the priority is defaulted.
pub fn validate(module: HandlerModule, source: &Path) -> Result<HandlerDefinition, Rejection> {
    let Some(path) = module.path else {
        tracing::warn!(file = %source.display(), "skipping handler: {}", Rejection::MissingPath);
        return Err(Rejection::MissingPath);
    };

    let mut methods = BTreeMap::new();
    for (name, handler) in module.methods {
        match name.parse::<Method>() {
            Ok(method) => {
                methods.insert(method, handler);
            }
            Err(()) => {
                tracing::debug!(file = %source.display(), method = %name, "ignoring unrecognized method");
            }
        }
    }

    if methods.is_empty() {
        tracing::warn!(file = %source.display(), "skipping handler: {}", Rejection::NoMethods);
        return Err(Rejection::NoMethods);
    }

    let priority = module.priority.unwrap_or_else(|| {
        tracing::info!(file = %source.display(), "no priority declared, defaulting to 0");
        0
    });

    Ok(HandlerDefinition {
        path,
        priority,
        methods,
        uses: module.uses,
        static_dirs: module.static_dirs,
        starting_use_priority: module
            .starting_use_priority
            .unwrap_or(DEFAULT_STARTING_USE_PRIORITY),
        specific_use_priorities: module.specific_use_priorities,
        source: source.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::handler_fn;
    use axum::body::Body;
    use axum::http::Request;

    fn ok() -> Handler {
        handler_fn(|_req: Request<Body>| async { "ok" })
    }

    #[test]
    fn test_rejects_missing_path() {
        let module = HandlerModule::new().method("get", ok());
        assert_eq!(
            validate(module, Path::new("a")).unwrap_err(),
            Rejection::MissingPath
        );
    }

    #[test]
    fn test_rejects_no_recognized_method() {
        let module = HandlerModule::new()
            .path("/x")
            .method("fetch", ok())
            .method("propfind", ok());
        assert_eq!(validate(module, Path::new("a")).unwrap_err(), Rejection::NoMethods);

        let empty = HandlerModule::new().path("/x");
        assert_eq!(validate(empty, Path::new("a")).unwrap_err(), Rejection::NoMethods);
    }

    #[test]
    fn test_defaults() {
        let module = HandlerModule::new()
            .path("/x")
            .method("POST", ok())
            .method("bogus", ok());
        let def = validate(module, Path::new("routes/b.toml")).unwrap();

        assert_eq!(def.priority, 0);
        assert_eq!(def.starting_use_priority, DEFAULT_STARTING_USE_PRIORITY);
        assert_eq!(def.methods.keys().copied().collect::<Vec<_>>(), vec![Method::Post]);
        assert_eq!(def.source, PathBuf::from("routes/b.toml"));
    }

    #[test]
    fn test_keeps_declared_values() {
        let module = HandlerModule::new()
            .path("/x")
            .priority(7)
            .method("all", ok())
            .starting_use_priority(-10)
            .specific_use_priorities(vec![3]);
        let def = validate(module, Path::new("a")).unwrap();

        assert_eq!(def.priority, 7);
        assert_eq!(def.starting_use_priority, -10);
        assert_eq!(def.specific_use_priorities, vec![3]);
        assert!(def.methods.contains_key(&Method::All));
    }
}
