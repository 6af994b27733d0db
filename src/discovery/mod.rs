//! Module discovery subsystem (plugin registry).
//!
//! # Data Flow
//! ```text
//! directory of manifests (*.toml)        in-memory tree (tests, embedding)
//!     → FsSource                           → MemorySource
//!         (toml parse, Registry lookup)
//!     → HandlerModule / MiddlewareModule  (unvalidated records)
//!     → routing::validator / routing::resolver
//! ```
//!
//! # Design Decisions
//! - Functions are compiled in; files only name them
//! - No module cache: every build re-reads its sources
//! - Listing order is lexicographic, independent of the host filesystem

pub mod manifest;
pub mod module;
pub mod registry;
pub mod source;

pub use module::{HandlerModule, MiddlewareModule, UseRef};
pub use registry::Registry;
pub use source::{EntryKind, FsSource, LoadError, MemorySource, ModuleSource, SourceEntry};
