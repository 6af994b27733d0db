//! Proxy route persistence.
//!
//! # Responsibilities
//! - Hold the table of `external hostname → backend hostname` routes
//! - Open a connection per operation, run it, and always close it
//!
//! # Design Decisions
//! - The table is a JSON file; a missing file is an empty table
//! - Writes are flushed on close through a temporary file and rename, so a
//!   reader never sees a half-written table
//! - A failed operation discards its changes; its error is returned after
//!   the connection is closed
//! - Hostnames are stored lowercased, one route per external hostname

mod memory;

pub use memory::MemoryStore;

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One proxied hostname.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyRoute {
    pub external_hostname: String,
    pub backend_hostname: String,
}

impl ProxyRoute {
    pub fn new(external: impl Into<String>, backend: impl Into<String>) -> Self {
        Self {
            external_hostname: external.into().to_ascii_lowercase(),
            backend_hostname: backend.into(),
        }
    }
}

/// Errors from the route store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store i/o on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt store {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no proxy route for {0}")]
    NotFound(String),

    #[error("invalid proxy route: {0}")]
    Invalid(String),

    #[error("store task failed: {0}")]
    Task(String),
}

/// Looks up the proxy route for a hostname.
pub trait RouteLookup: Send + Sync {
    fn lookup(&self, hostname: &str) -> Result<Option<ProxyRoute>, StoreError>;
}

/// An open view of the route table, valid for one operation.
#[derive(Debug, Default)]
pub struct Connection {
    routes: BTreeMap<String, ProxyRoute>,
    dirty: bool,
}

impl Connection {
    pub fn get(&self, hostname: &str) -> Option<&ProxyRoute> {
        self.routes.get(&hostname.to_ascii_lowercase())
    }

    /// Insert or replace the route for its external hostname.
    pub fn put(&mut self, route: ProxyRoute) -> Result<Option<ProxyRoute>, StoreError> {
        if route.external_hostname.is_empty() || route.backend_hostname.is_empty() {
            return Err(StoreError::Invalid(format!(
                "`{}` -> `{}`",
                route.external_hostname, route.backend_hostname
            )));
        }
        self.dirty = true;
        let key = route.external_hostname.to_ascii_lowercase();
        Ok(self.routes.insert(key, route))
    }

    pub fn remove(&mut self, hostname: &str) -> Result<ProxyRoute, StoreError> {
        let key = hostname.to_ascii_lowercase();
        let removed = self.routes.remove(&key).ok_or(StoreError::NotFound(key))?;
        self.dirty = true;
        Ok(removed)
    }

    /// All routes, ordered by external hostname.
    pub fn list(&self) -> Vec<ProxyRoute> {
        self.routes.values().cloned().collect()
    }
}

/// File-backed route store.
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    // Serialises read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl Store {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a connection, run `op`, close the connection, and return the
    /// operation's result. Changes are written only if `op` succeeds.
    pub fn operation<T>(
        &self,
        op: impl FnOnce(&mut Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut conn = self.connect()?;
        let result = op(&mut conn);
        self.close(conn, result.is_ok())?;
        result
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Connection::default()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let routes: Vec<ProxyRoute> =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| StoreError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        Ok(Connection {
            routes: routes
                .into_iter()
                .map(|r| (r.external_hostname.to_ascii_lowercase(), r))
                .collect(),
            dirty: false,
        })
    }

    fn close(&self, conn: Connection, commit: bool) -> Result<(), StoreError> {
        if !(commit && conn.dirty) {
            return Ok(());
        }

        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let file = File::create(&tmp).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &conn.list()).map_err(|source| StoreError::Corrupt {
            path: tmp.clone(),
            source,
        })?;
        writer.flush().map_err(io_err)?;
        drop(writer);
        fs::rename(&tmp, &self.path).map_err(io_err)?;

        tracing::debug!(path = %self.path.display(), routes = conn.routes.len(), "proxy store written");
        Ok(())
    }
}

impl RouteLookup for Store {
    fn lookup(&self, hostname: &str) -> Result<Option<ProxyRoute>, StoreError> {
        self.operation(|conn| Ok(conn.get(hostname).cloned()))
    }
}
