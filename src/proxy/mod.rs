//! Reverse proxy subsystem.
//!
//! # Data Flow
//! ```text
//! Request (Host: shop.example.com)
//!     → dispatcher.rs (RouteLookup: shop.example.com → 10.0.0.5:8080)
//!     → hyper client → backend
//!     → rewrite.rs (10.0.0.5:8080 → shop.example.com in response headers)
//!     → Response
//! ```

pub mod dispatcher;
pub mod rewrite;

pub use dispatcher::ProxyDispatcher;
pub use rewrite::rewrite_headers;
