//! Priority merge.
//!
//! Interleaves one directory level's routes and middleware into a single
//! registration sequence:
//!
//! ```text
//! handlers (file order) ──▶ Route entries   (one per method, handler priority)
//!                       └─▶ Static entries  (handler priority)
//! use refs ──resolver──▶ MiddlewareEntry ──assign──▶ Use entries
//!
//! routes ++ statics ++ uses ──stable sort desc──▶ sequence
//! sequence ──partition_point──▶ index where child routers are mounted
//! ```
//!
//! Unlabelled middleware at index `i` of a group's resolved list takes
//! `specific_use_priorities[i]` when that slot exists; otherwise it takes the
//! next value of a counter that starts at `starting_use_priority` and
//! decreases by one per use.

use std::cmp::Reverse;
use std::fmt;
use std::path::PathBuf;

use crate::discovery::UseRef;
use crate::routing::method::Method;
use crate::routing::resolver::{MiddlewareEntry, Resolver};
use crate::routing::validator::{HandlerDefinition, DEFAULT_STARTING_USE_PRIORITY};
use crate::routing::{Handler, Middleware};

/// One registration on a router.
#[derive(Clone)]
pub enum RegisteredEntry {
    /// A method-specific binding at a path.
    Route {
        path: String,
        method: Method,
        priority: i64,
        source: PathBuf,
        handler: Handler,
    },
    /// Unconditional middleware.
    Use {
        name: Option<String>,
        priority: i64,
        function: Middleware,
    },
    /// Unconditional middleware serving a directory verbatim.
    Static { dir: PathBuf, priority: i64 },
}

impl RegisteredEntry {
    pub fn priority(&self) -> i64 {
        match self {
            Self::Route { priority, .. }
            | Self::Use { priority, .. }
            | Self::Static { priority, .. } => *priority,
        }
    }

    /// A named middleware entry with an explicit priority.
    pub fn middleware(name: impl Into<String>, priority: i64, function: Middleware) -> Self {
        Self::Use {
            name: Some(name.into()),
            priority,
            function,
        }
    }
}

impl fmt::Debug for RegisteredEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Route { path, method, priority, source, .. } => f
                .debug_struct("Route")
                .field("path", path)
                .field("method", method)
                .field("priority", priority)
                .field("source", source)
                .finish_non_exhaustive(),
            Self::Use { name, priority, .. } => f
                .debug_struct("Use")
                .field("name", name)
                .field("priority", priority)
                .finish_non_exhaustive(),
            Self::Static { dir, priority } => f
                .debug_struct("Static")
                .field("dir", dir)
                .field("priority", priority)
                .finish(),
        }
    }
}

/// Middleware references that apply to a router as a whole rather than
/// coming from a handler, e.g. the configured global uses at the root.
#[derive(Debug, Clone)]
pub struct UseGroup {
    pub uses: Vec<UseRef>,
    pub starting_use_priority: i64,
    pub specific_use_priorities: Vec<i64>,
}

impl Default for UseGroup {
    fn default() -> Self {
        Self {
            uses: Vec::new(),
            starting_use_priority: DEFAULT_STARTING_USE_PRIORITY,
            specific_use_priorities: Vec::new(),
        }
    }
}

/// Give every unlabelled entry a priority. Labelled entries keep theirs.
pub fn assign_priorities(
    entries: Vec<MiddlewareEntry>,
    starting: i64,
    specific: &[i64],
) -> Vec<RegisteredEntry> {
    let mut counter = starting;

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let priority = entry.priority.unwrap_or_else(|| {
                specific.get(index).copied().unwrap_or_else(|| {
                    let assigned = counter;
                    counter -= 1;
                    assigned
                })
            });
            RegisteredEntry::Use {
                name: entry.name,
                priority,
                function: entry.run,
            }
        })
        .collect()
}

fn resolve_group(
    resolver: &Resolver<'_>,
    uses: &[UseRef],
    starting: i64,
    specific: &[i64],
) -> Vec<RegisteredEntry> {
    let resolved = uses
        .iter()
        .flat_map(|reference| resolver.resolve(reference))
        .collect();
    assign_priorities(resolved, starting, specific)
}

/// Merge one level's handlers, optional router-wide uses and any explicit
/// entries into the registration order.
pub fn merge(
    handlers: &[HandlerDefinition],
    group: Option<&UseGroup>,
    explicit: &[RegisteredEntry],
    resolver: &Resolver<'_>,
) -> Vec<RegisteredEntry> {
    let mut routes = Vec::new();
    let mut uses: Vec<RegisteredEntry> = explicit.to_vec();

    if let Some(group) = group {
        uses.extend(resolve_group(
            resolver,
            &group.uses,
            group.starting_use_priority,
            &group.specific_use_priorities,
        ));
    }

    for def in handlers {
        for (method, handler) in &def.methods {
            routes.push(RegisteredEntry::Route {
                path: def.path.clone(),
                method: *method,
                priority: def.priority,
                source: def.source.clone(),
                handler: handler.clone(),
            });
        }
        for dir in &def.static_dirs {
            routes.push(RegisteredEntry::Static {
                dir: dir.clone(),
                priority: def.priority,
            });
        }
        uses.extend(resolve_group(
            resolver,
            &def.uses,
            def.starting_use_priority,
            &def.specific_use_priorities,
        ));
    }

    let mut sequence = routes;
    sequence.extend(uses);
    // `sort_by_key` is stable: equal priorities keep insertion order.
    sequence.sort_by_key(|entry| Reverse(entry.priority()));
    sequence
}

/// Index at which child routers are mounted: before the first entry with
/// priority ≤ 0, or at the end.
pub fn partition_point(sequence: &[RegisteredEntry]) -> usize {
    sequence
        .iter()
        .position(|entry| entry.priority() <= 0)
        .unwrap_or(sequence.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{HandlerModule, MemorySource, MiddlewareModule};
    use crate::routing::validator::validate;
    use crate::routing::{handler_fn, middleware_fn, Next};
    use axum::body::Body;
    use axum::http::Request;
    use std::path::Path;

    fn ok() -> Handler {
        handler_fn(|_req: Request<Body>| async { "ok" })
    }

    fn pass() -> Middleware {
        middleware_fn(|req: Request<Body>, next: Next| async move { next.run(req).await })
    }

    fn def(module: HandlerModule, file: &str) -> HandlerDefinition {
        validate(module, Path::new(file)).unwrap()
    }

    /// `(kind, label, priority)` for compact assertions.
    fn shape(sequence: &[RegisteredEntry]) -> Vec<(&'static str, String, i64)> {
        sequence
            .iter()
            .map(|entry| match entry {
                RegisteredEntry::Route { path, method, priority, .. } => {
                    ("route", format!("{method} {path}"), *priority)
                }
                RegisteredEntry::Use { name, priority, .. } => {
                    ("use", name.clone().unwrap_or_else(|| "<inline>".into()), *priority)
                }
                RegisteredEntry::Static { dir, priority } => {
                    ("static", dir.display().to_string(), *priority)
                }
            })
            .collect()
    }

    #[test]
    fn test_unlabelled_priorities_strictly_decrease() {
        let entries = (0..4)
            .map(|_| MiddlewareEntry { run: pass(), name: None, priority: None })
            .collect();
        let assigned = assign_priorities(entries, -1, &[]);
        let priorities: Vec<i64> = assigned.iter().map(RegisteredEntry::priority).collect();
        assert_eq!(priorities, vec![-1, -2, -3, -4]);

        let entries = (0..3)
            .map(|_| MiddlewareEntry { run: pass(), name: None, priority: None })
            .collect();
        let assigned = assign_priorities(entries, 10, &[]);
        let priorities: Vec<i64> = assigned.iter().map(RegisteredEntry::priority).collect();
        assert_eq!(priorities, vec![10, 9, 8]);
    }

    #[test]
    fn test_specific_priorities_then_counter() {
        let entries = vec![
            MiddlewareEntry { run: pass(), name: None, priority: None },
            MiddlewareEntry { run: pass(), name: None, priority: None },
            MiddlewareEntry { run: pass(), name: None, priority: None },
            MiddlewareEntry { run: pass(), name: None, priority: None },
        ];
        let assigned = assign_priorities(entries, -1, &[7, 3]);
        let priorities: Vec<i64> = assigned.iter().map(RegisteredEntry::priority).collect();
        assert_eq!(priorities, vec![7, 3, -1, -2]);
    }

    #[test]
    fn test_specific_priorities_are_positional() {
        let entries = vec![
            MiddlewareEntry { run: pass(), name: Some("a".into()), priority: Some(50) },
            MiddlewareEntry { run: pass(), name: None, priority: None },
            MiddlewareEntry { run: pass(), name: None, priority: None },
        ];
        let assigned = assign_priorities(entries, -1, &[7, 3]);
        let priorities: Vec<i64> = assigned.iter().map(RegisteredEntry::priority).collect();
        // Slot 0 belongs to the labelled entry and goes unused.
        assert_eq!(priorities, vec![50, 3, -1]);
    }

    #[test]
    fn test_named_module_without_priority_lands_at_zero() {
        let source = MemorySource::new().middleware("/use/log", MiddlewareModule::new(pass()));
        let dirs = vec![PathBuf::from("/use")];
        let resolver = Resolver::new(&source, &dirs);
        let handlers = vec![def(
            HandlerModule::new()
                .path("/x")
                .method("get", ok())
                .use_ref(UseRef::Named("log".into()))
                .use_ref(UseRef::Inline(pass())),
            "a",
        )];

        let sequence = merge(&handlers, None, &[], &resolver);
        assert_eq!(
            shape(&sequence),
            vec![
                ("route", "GET /x".into(), 0),
                ("use", "log".into(), 0),
                ("use", "<inline>".into(), -1),
            ]
        );
    }

    #[test]
    fn test_sorted_descending_and_stable() {
        let source = MemorySource::new();
        let resolver = Resolver::new(&source, &[]);
        let handlers = vec![
            def(HandlerModule::new().path("/low").priority(-5).method("get", ok()), "a"),
            def(HandlerModule::new().path("/x").priority(5).method("get", ok()).method("post", ok()), "b"),
            def(HandlerModule::new().path("/y").method("get", ok()), "c"),
            def(HandlerModule::new().path("/z").priority(5).method("put", ok()), "d"),
        ];

        let sequence = merge(&handlers, None, &[], &resolver);
        let priorities: Vec<i64> = sequence.iter().map(RegisteredEntry::priority).collect();
        assert!(priorities.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(
            shape(&sequence),
            vec![
                ("route", "GET /x".into(), 5),
                ("route", "POST /x".into(), 5),
                ("route", "PUT /z".into(), 5),
                ("route", "GET /y".into(), 0),
                ("route", "GET /low".into(), -5),
            ]
        );
    }

    #[test]
    fn test_routes_precede_own_middleware_on_ties() {
        let source = MemorySource::new();
        let resolver = Resolver::new(&source, &[]);
        let handlers = vec![def(
            HandlerModule::new()
                .path("/x")
                .method("get", ok())
                .use_ref(UseRef::Inline(pass()))
                .use_ref(UseRef::Inline(pass()))
                .starting_use_priority(0),
            "a",
        )];

        let sequence = merge(&handlers, None, &[], &resolver);
        assert_eq!(
            shape(&sequence),
            vec![
                ("route", "GET /x".into(), 0),
                ("use", "<inline>".into(), 0),
                ("use", "<inline>".into(), -1),
            ]
        );
    }

    #[test]
    fn test_group_and_explicit_entries() {
        let source = MemorySource::new()
            .middleware("/use/log", MiddlewareModule::new(pass()).priority(20));
        let dirs = vec![PathBuf::from("/use")];
        let resolver = Resolver::new(&source, &dirs);
        let handlers = vec![
            def(HandlerModule::new().path("/x").priority(50).method("get", ok()).static_dir("/pub"), "a"),
        ];
        let group = UseGroup {
            uses: vec![UseRef::Named("log".into()), UseRef::Inline(pass())],
            ..UseGroup::default()
        };
        let explicit = vec![RegisteredEntry::middleware("reverse-proxy", 100, pass())];

        let sequence = merge(&handlers, Some(&group), &explicit, &resolver);
        assert_eq!(
            shape(&sequence),
            vec![
                ("use", "reverse-proxy".into(), 100),
                ("route", "GET /x".into(), 50),
                ("static", "/pub".into(), 50),
                ("use", "log".into(), 20),
                ("use", "<inline>".into(), -1),
            ]
        );
    }

    #[test]
    fn test_partition_point() {
        let source = MemorySource::new();
        let resolver = Resolver::new(&source, &[]);

        let handlers = vec![
            def(HandlerModule::new().path("/x").priority(5).method("get", ok()), "a"),
            def(HandlerModule::new().path("/y").method("post", ok()), "b"),
        ];
        let sequence = merge(&handlers, None, &[], &resolver);
        // Priority 0 is the threshold: mount goes between /x (5) and /y (0).
        assert_eq!(partition_point(&sequence), 1);

        let positive = vec![def(HandlerModule::new().path("/x").priority(1).method("get", ok()), "a")];
        let sequence = merge(&positive, None, &[], &resolver);
        assert_eq!(partition_point(&sequence), 1);

        assert_eq!(partition_point(&[]), 0);
    }
}
