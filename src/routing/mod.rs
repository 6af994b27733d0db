//! Directory router subsystem.
//!
//! # Data Flow
//! ```text
//! Build (startup and every reload):
//!     ModuleSource listing of one directory level
//!     → validator.rs   (HandlerModule → HandlerDefinition, or skip)
//!     → resolver.rs    (UseRef → MiddlewareEntry[])
//!     → merge.rs       (priority sort, mount partition point)
//!     → builder.rs     (recurse into subdirectories, register layers)
//!     → RouterNode + RouterDescription
//!
//! Dispatch (per request):
//!     Request → node.rs (walk layers: Route / Use / Mount) → Response
//! ```
//!
//! # Design Decisions
//! - Trees are immutable once built; a reload builds a new tree
//! - Higher priority registers first; ties keep discovery order
//! - Subdirectory routers sit between positive and non-positive priorities

pub mod builder;
pub mod describe;
pub mod handler;
pub mod matcher;
pub mod merge;
pub mod method;
pub mod node;
pub mod resolver;
pub mod validator;

pub use builder::{Built, RouterBuilder};
pub use describe::{EntryDescription, RouterDescription};
pub use handler::{handler_fn, middleware_fn, BoxFuture, Handler, Middleware};
pub use matcher::{PathParams, PathPattern};
pub use merge::{merge, partition_point, RegisteredEntry, UseGroup};
pub use method::Method;
pub use node::{Next, RouterNode};
pub use resolver::{MiddlewareEntry, Resolver};
pub use validator::{validate, HandlerDefinition, Rejection};
