//! Loaded module records.
//!
//! A [`ModuleSource`](crate::discovery::ModuleSource) turns a file into one
//! of these records. They are deliberately unvalidated: a handler module may
//! lack a path or declare no usable method, and the validator decides.

use std::fmt;
use std::path::PathBuf;

use crate::routing::{Handler, Middleware};

/// A reference to middleware, as listed in a handler's `use` table.
#[derive(Clone)]
pub enum UseRef {
    /// A function supplied directly.
    Inline(Middleware),
    /// A name looked up under every registered middleware directory.
    Named(String),
    /// One explicit directory, scanned recursively.
    Dir(PathBuf),
}

impl fmt::Debug for UseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UseRef::Inline(_) => f.write_str("Inline(<fn>)"),
            UseRef::Named(name) => f.debug_tuple("Named").field(name).finish(),
            UseRef::Dir(dir) => f.debug_tuple("Dir").field(dir).finish(),
        }
    }
}

/// A handler module as loaded, before validation.
#[derive(Clone, Default)]
pub struct HandlerModule {
    pub path: Option<String>,
    pub priority: Option<i64>,
    /// Method name (as written) to handler function.
    pub methods: Vec<(String, Handler)>,
    pub uses: Vec<UseRef>,
    pub static_dirs: Vec<PathBuf>,
    pub starting_use_priority: Option<i64>,
    pub specific_use_priorities: Vec<i64>,
}

impl HandlerModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn method(mut self, name: impl Into<String>, handler: Handler) -> Self {
        self.methods.push((name.into(), handler));
        self
    }

    pub fn use_ref(mut self, r: UseRef) -> Self {
        self.uses.push(r);
        self
    }

    pub fn static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dirs.push(dir.into());
        self
    }

    pub fn starting_use_priority(mut self, priority: i64) -> Self {
        self.starting_use_priority = Some(priority);
        self
    }

    pub fn specific_use_priorities(mut self, priorities: Vec<i64>) -> Self {
        self.specific_use_priorities = priorities;
        self
    }
}

impl fmt::Debug for HandlerModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerModule")
            .field("path", &self.path)
            .field("priority", &self.priority)
            .field("methods", &self.methods.iter().map(|(m, _)| m).collect::<Vec<_>>())
            .field("uses", &self.uses)
            .field("static_dirs", &self.static_dirs)
            .finish_non_exhaustive()
    }
}

/// A middleware module as loaded, before validation.
#[derive(Clone, Default)]
pub struct MiddlewareModule {
    /// `None` means the module exported nothing runnable.
    pub run: Option<Middleware>,
    pub name: Option<String>,
    pub priority: Option<i64>,
}

impl MiddlewareModule {
    pub fn new(run: Middleware) -> Self {
        Self {
            run: Some(run),
            name: None,
            priority: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }
}

impl fmt::Debug for MiddlewareModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareModule")
            .field("runnable", &self.run.is_some())
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish()
    }
}
