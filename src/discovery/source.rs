//! Module sources: where handler and middleware modules come from.
//!
//! # Responsibilities
//! - List a directory's entries in a stable order
//! - Say whether a file is a loadable module
//! - Load a file into a [`HandlerModule`] or [`MiddlewareModule`]
//!
//! # Design Decisions
//! - The router builder never touches the filesystem directly; it talks to a
//!   `ModuleSource`, so a whole tree can be built from memory in tests
//! - Listings are sorted by name, so ties between equal priorities resolve
//!   the same way on every platform
//! - Action names are resolved at load time; an unknown action is a load
//!   failure for that file only

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::discovery::manifest::{HandlerManifest, MiddlewareManifest};
use crate::discovery::module::{HandlerModule, MiddlewareModule, UseRef};
use crate::discovery::registry::Registry;

/// Error loading a single module. Never fatal to a scan.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{path}: unknown action `{action}`")]
    UnknownAction { path: PathBuf, action: String },
    #[error("{path}: {message}")]
    Invalid { path: PathBuf, message: String },
    #[error("{0}: no such module")]
    NotFound(PathBuf),
}

/// Kind of a listed directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Dir,
    File,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub name: String,
    pub path: PathBuf,
    pub kind: EntryKind,
}

/// Enumerates and loads modules.
pub trait ModuleSource: Send + Sync {
    /// List `dir`, sorted by entry name.
    fn list(&self, dir: &Path) -> Result<Vec<SourceEntry>, LoadError>;

    fn is_dir(&self, path: &Path) -> bool;

    /// Returns true if `path` names a file this source can load.
    fn is_module(&self, path: &Path) -> bool;

    fn load_handler(&self, path: &Path) -> Result<HandlerModule, LoadError>;

    fn load_middleware(&self, path: &Path) -> Result<MiddlewareModule, LoadError>;
}

// ── Filesystem source ─────────────────────────────────────────────────────────

/// Loads TOML manifests from real directories.
#[derive(Debug, Clone)]
pub struct FsSource {
    registry: Arc<Registry>,
    extensions: Vec<String>,
}

impl FsSource {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            extensions: vec!["toml".to_string()],
        }
    }

    /// Override the recognized file extensions (without the dot).
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    fn read(&self, path: &Path) -> Result<String, LoadError> {
        fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl ModuleSource for FsSource {
    fn list(&self, dir: &Path) -> Result<Vec<SourceEntry>, LoadError> {
        let io_err = |source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut entries = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            let path = entry.path();
            let kind = if path.is_dir() { EntryKind::Dir } else { EntryKind::File };
            entries.push(SourceEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path,
                kind,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_module(&self, path: &Path) -> bool {
        path.is_file()
            && path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| self.extensions.iter().any(|known| known.eq_ignore_ascii_case(ext)))
                .unwrap_or(false)
    }

    fn load_handler(&self, path: &Path) -> Result<HandlerModule, LoadError> {
        let manifest: HandlerManifest =
            toml::from_str(&self.read(path)?).map_err(|source| LoadError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));

        let mut methods = Vec::with_capacity(manifest.methods.len());
        for (method, action) in manifest.methods {
            let handler = self
                .registry
                .get_handler(&action)
                .ok_or_else(|| LoadError::UnknownAction {
                    path: path.to_path_buf(),
                    action: action.clone(),
                })?;
            methods.push((method, handler));
        }

        let uses = manifest
            .uses
            .into_iter()
            .map(|reference| {
                if reference.starts_with("./") || reference.starts_with("../") {
                    UseRef::Dir(base.join(reference))
                } else if Path::new(&reference).is_absolute() {
                    UseRef::Dir(PathBuf::from(reference))
                } else {
                    UseRef::Named(reference)
                }
            })
            .collect();

        Ok(HandlerModule {
            path: manifest.path,
            priority: manifest.priority,
            methods,
            uses,
            static_dirs: manifest.static_dirs.iter().map(|dir| base.join(dir)).collect(),
            starting_use_priority: manifest.starting_use_priority,
            specific_use_priorities: manifest.specific_use_priorities,
        })
    }

    fn load_middleware(&self, path: &Path) -> Result<MiddlewareModule, LoadError> {
        let manifest: MiddlewareManifest =
            toml::from_str(&self.read(path)?).map_err(|source| LoadError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let run = match manifest.run {
            Some(action) => Some(self.registry.get_middleware(&action).ok_or_else(|| {
                LoadError::UnknownAction {
                    path: path.to_path_buf(),
                    action,
                }
            })?),
            None => None,
        };

        Ok(MiddlewareModule {
            run,
            name: manifest.name,
            priority: manifest.priority,
        })
    }
}

// ── In-memory source ──────────────────────────────────────────────────────────

#[derive(Clone)]
enum MemoryNode {
    Dir,
    Handler(HandlerModule),
    Middleware(MiddlewareModule),
    Broken(String),
}

/// An in-memory directory tree of pre-built modules.
///
/// Adding a file creates its parent directories implicitly.
///
/// ```rust,ignore
/// let source = MemorySource::new()
///     .handler("/routes/a", HandlerModule::new().path("/x").method("get", h))
///     .dir("/routes/admin")
///     .middleware("/use/auth/check", MiddlewareModule::new(mw));
/// ```
#[derive(Clone, Default)]
pub struct MemorySource {
    nodes: BTreeMap<PathBuf, MemoryNode>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dir(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.insert_parents(&path);
        self.nodes.insert(path, MemoryNode::Dir);
        self
    }

    pub fn handler(self, path: impl Into<PathBuf>, module: HandlerModule) -> Self {
        self.file(path.into(), MemoryNode::Handler(module))
    }

    pub fn middleware(self, path: impl Into<PathBuf>, module: MiddlewareModule) -> Self {
        self.file(path.into(), MemoryNode::Middleware(module))
    }

    /// A file that fails to load with `message`.
    pub fn broken(self, path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        self.file(path.into(), MemoryNode::Broken(message.into()))
    }

    fn file(mut self, path: PathBuf, node: MemoryNode) -> Self {
        self.insert_parents(&path);
        self.nodes.insert(path, node);
        self
    }

    fn insert_parents(&mut self, path: &Path) {
        for ancestor in path.ancestors().skip(1) {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            self.nodes.entry(ancestor.to_path_buf()).or_insert(MemoryNode::Dir);
        }
    }
}

impl ModuleSource for MemorySource {
    fn list(&self, dir: &Path) -> Result<Vec<SourceEntry>, LoadError> {
        if !self.is_dir(dir) {
            return Err(LoadError::NotFound(dir.to_path_buf()));
        }

        // BTreeMap iteration is already ordered by path, hence by name
        // among siblings.
        Ok(self
            .nodes
            .iter()
            .filter(|(path, _)| path.parent() == Some(dir))
            .map(|(path, node)| SourceEntry {
                name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                path: path.clone(),
                kind: match node {
                    MemoryNode::Dir => EntryKind::Dir,
                    _ => EntryKind::File,
                },
            })
            .collect())
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.nodes.get(path), Some(MemoryNode::Dir))
    }

    fn is_module(&self, path: &Path) -> bool {
        matches!(self.nodes.get(path), Some(node) if !matches!(node, MemoryNode::Dir))
    }

    fn load_handler(&self, path: &Path) -> Result<HandlerModule, LoadError> {
        match self.nodes.get(path) {
            Some(MemoryNode::Handler(module)) => Ok(module.clone()),
            Some(MemoryNode::Broken(message)) => Err(LoadError::Invalid {
                path: path.to_path_buf(),
                message: message.clone(),
            }),
            Some(MemoryNode::Middleware(_)) => Err(LoadError::Invalid {
                path: path.to_path_buf(),
                message: "not a handler module".to_string(),
            }),
            _ => Err(LoadError::NotFound(path.to_path_buf())),
        }
    }

    fn load_middleware(&self, path: &Path) -> Result<MiddlewareModule, LoadError> {
        match self.nodes.get(path) {
            Some(MemoryNode::Middleware(module)) => Ok(module.clone()),
            Some(MemoryNode::Broken(message)) => Err(LoadError::Invalid {
                path: path.to_path_buf(),
                message: message.clone(),
            }),
            Some(MemoryNode::Handler(_)) => Err(LoadError::Invalid {
                path: path.to_path_buf(),
                message: "not a middleware module".to_string(),
            }),
            _ => Err(LoadError::NotFound(path.to_path_buf())),
        }
    }
}
