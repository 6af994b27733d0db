//! Structural description of a built router tree.
//!
//! Used for startup diagnostics and the `tree` command only; dispatch never
//! reads it.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use uuid::Uuid;

use crate::routing::method::Method;

/// One registration, as shown in a dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryDescription {
    Route {
        path: String,
        method: Method,
        priority: i64,
        source: PathBuf,
    },
    Use {
        name: Option<String>,
        priority: i64,
    },
    Static {
        dir: PathBuf,
        priority: i64,
    },
    Mount {
        path: String,
        router: Uuid,
    },
}

/// A router, its ordered registrations and its children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouterDescription {
    pub id: Uuid,
    pub mount_path: String,
    pub entries: Vec<EntryDescription>,
    pub children: Vec<RouterDescription>,
}

impl RouterDescription {
    /// A copy with every generated id replaced by the nil UUID, for
    /// comparing two builds of the same tree.
    pub fn without_ids(&self) -> RouterDescription {
        RouterDescription {
            id: Uuid::nil(),
            mount_path: self.mount_path.clone(),
            entries: self
                .entries
                .iter()
                .map(|entry| match entry {
                    EntryDescription::Mount { path, .. } => EntryDescription::Mount {
                        path: path.clone(),
                        router: Uuid::nil(),
                    },
                    other => other.clone(),
                })
                .collect(),
            children: self.children.iter().map(Self::without_ids).collect(),
        }
    }

    /// Number of route entries in this router and all descendants.
    pub fn route_count(&self) -> usize {
        let own = self
            .entries
            .iter()
            .filter(|e| matches!(e, EntryDescription::Route { .. }))
            .count();
        own + self.children.iter().map(Self::route_count).sum::<usize>()
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let pad = "  ".repeat(depth);
        writeln!(f, "{pad}router {} at {}", self.id, self.mount_path)?;

        for entry in &self.entries {
            match entry {
                EntryDescription::Route { path, method, priority, source } => {
                    writeln!(f, "{pad}  [{priority:>5}] route  {method} {path}  ({})", source.display())?
                }
                EntryDescription::Use { name, priority } => writeln!(
                    f,
                    "{pad}  [{priority:>5}] use    {}",
                    name.as_deref().unwrap_or("<inline>")
                )?,
                EntryDescription::Static { dir, priority } => {
                    writeln!(f, "{pad}  [{priority:>5}] static {}", dir.display())?
                }
                EntryDescription::Mount { path, router } => {
                    writeln!(f, "{pad}  [    -] mount  {path}")?;
                    if let Some(child) = self.children.iter().find(|c| c.id == *router) {
                        child.write_indented(f, depth + 2)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Indented tree dump.
impl fmt::Display for RouterDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}
