//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse, deserialize, anchor relative paths)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!
//! While serving:
//!     watcher.rs detects changes under route / vhost roots
//!     → lifecycle rebuilds the Tree
//!     → atomic swap of Arc<Tree>
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; only the route tree is rebuilt live
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AppConfig, ListenerConfig, LogFormat, ObservabilityConfig, ProxyConfig, RoutesConfig, VhostConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::TreeWatcher;
