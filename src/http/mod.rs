//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, panic recovery)
//!     → Tree::dispatch (hostname → router)
//!     → request.rs (hostname extraction), statics.rs (directory serving)
//!     → Send to client
//! ```

pub mod request;
pub mod server;
pub mod statics;

pub use request::hostname;
pub use server::{AppState, HttpServer};
