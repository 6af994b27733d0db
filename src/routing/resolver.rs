//! Middleware resolution.
//!
//! # Responsibilities
//! - Turn a [`UseRef`] into an ordered list of [`MiddlewareEntry`]
//! - Scan middleware directories recursively, in sorted order
//! - Skip (and log) modules that fail to load or export nothing runnable
//!
//! # Design Decisions
//! - A loaded module without a declared priority gets 0; only inline
//!   references stay `None` for the merge step to assign
//! - The result is stably sorted descending: ties keep discovery order
//!   (search directory order, then listing order)

use std::cmp::Reverse;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::discovery::{EntryKind, ModuleSource, UseRef};
use crate::routing::Middleware;

/// One resolved middleware function.
#[derive(Clone)]
pub struct MiddlewareEntry {
    pub run: Middleware,
    pub name: Option<String>,
    /// `None` means unlabelled (inline references only).
    pub priority: Option<i64>,
}

impl fmt::Debug for MiddlewareEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareEntry")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Resolves middleware references against a set of search directories.
pub struct Resolver<'a> {
    source: &'a dyn ModuleSource,
    search_dirs: &'a [PathBuf],
}

impl<'a> Resolver<'a> {
    pub fn new(source: &'a dyn ModuleSource, search_dirs: &'a [PathBuf]) -> Self {
        Self {
            source,
            search_dirs,
        }
    }

    /// Resolve one reference. Never fails; problems are logged and skipped.
    pub fn resolve(&self, reference: &UseRef) -> Vec<MiddlewareEntry> {
        let mut entries = Vec::new();

        match reference {
            UseRef::Inline(run) => entries.push(MiddlewareEntry {
                run: run.clone(),
                name: None,
                priority: None,
            }),
            UseRef::Named(name) => {
                for dir in self.search_dirs {
                    self.resolve_name(dir, name, &mut entries);
                }
                if entries.is_empty() {
                    tracing::warn!(middleware = %name, "no middleware found for name");
                }
            }
            UseRef::Dir(dir) => {
                if self.source.is_dir(dir) {
                    self.walk(dir, &mut entries);
                } else {
                    tracing::warn!(dir = %dir.display(), "middleware directory does not exist");
                }
            }
        }

        entries.sort_by_key(|entry| Reverse(entry.priority.unwrap_or(0)));
        entries
    }

    /// `<dir>/<name>` as a directory, else any module file with stem `name`.
    fn resolve_name(&self, dir: &Path, name: &str, out: &mut Vec<MiddlewareEntry>) {
        let candidate = dir.join(name);
        if self.source.is_dir(&candidate) {
            self.walk(&candidate, out);
            return;
        }
        if self.source.is_module(&candidate) {
            self.load(&candidate, out);
            return;
        }

        let Ok(listing) = self.source.list(dir) else {
            return;
        };
        for entry in listing {
            if entry.kind == EntryKind::File
                && entry.path.file_stem().and_then(|s| s.to_str()) == Some(name)
                && self.source.is_module(&entry.path)
            {
                self.load(&entry.path, out);
            }
        }
    }

    fn walk(&self, dir: &Path, out: &mut Vec<MiddlewareEntry>) {
        let listing = match self.source.list(dir) {
            Ok(listing) => listing,
            Err(e) => {
                tracing::error!(dir = %dir.display(), error = %e, "cannot list middleware directory");
                return;
            }
        };

        for entry in listing {
            match entry.kind {
                EntryKind::Dir => self.walk(&entry.path, out),
                EntryKind::File if self.source.is_module(&entry.path) => self.load(&entry.path, out),
                EntryKind::File => {}
            }
        }
    }

    fn load(&self, path: &Path, out: &mut Vec<MiddlewareEntry>) {
        let module = match self.source.load_middleware(path) {
            Ok(module) => module,
            Err(e) => {
                tracing::error!(file = %path.display(), error = %e, "failed to load middleware");
                return;
            }
        };

        let Some(run) = module.run else {
            tracing::warn!(file = %path.display(), "skipping middleware: nothing runnable exported");
            return;
        };

        let name = module.name.or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        });
        let priority = module.priority.unwrap_or_else(|| {
            tracing::info!(file = %path.display(), "middleware has no priority, defaulting to 0");
            0
        });
        tracing::debug!(file = %path.display(), name = ?name, priority, "loaded middleware");

        out.push(MiddlewareEntry {
            run,
            name,
            priority: Some(priority),
        });
    }
}
