//! vhostd: directory-discovered routing with virtual hosts and a
//! hostname-keyed reverse proxy.

// Core subsystems
pub mod config;
pub mod discovery;
pub mod http;
pub mod routing;
pub mod tree;

// Hosting
pub mod proxy;
pub mod store;
pub mod vhost;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::AppConfig;
pub use discovery::Registry;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use tree::Tree;
