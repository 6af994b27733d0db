//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files, and
//! every section has defaults so a minimal file (or none) is valid.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::routing::validator::DEFAULT_STARTING_USE_PRIORITY;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Default route tree: directories, middleware search path, global uses.
    pub routes: RoutesConfig,

    /// Virtual host discovery.
    pub vhosts: VhostConfig,

    /// Hostname-keyed reverse proxy.
    pub proxy: ProxyConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Default route tree configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutesConfig {
    /// Route roots, merged into one top level.
    pub dirs: Vec<PathBuf>,

    /// Directories searched for named middleware.
    pub use_dirs: Vec<PathBuf>,

    /// Directories served verbatim at the root, at priority 0.
    pub static_dirs: Vec<PathBuf>,

    /// Middleware names applied to the whole default tree.
    pub uses: Vec<String>,

    /// First priority given to unlabelled global middleware.
    pub starting_use_priority: i64,

    /// Explicit priorities for unlabelled global middleware, in order.
    pub specific_use_priorities: Vec<i64>,

    /// File extensions recognised as manifests.
    pub extensions: Vec<String>,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            dirs: vec![PathBuf::from("routes")],
            use_dirs: vec![PathBuf::from("use")],
            static_dirs: Vec::new(),
            uses: Vec::new(),
            starting_use_priority: DEFAULT_STARTING_USE_PRIORITY,
            specific_use_priorities: Vec::new(),
            extensions: vec!["toml".to_string()],
        }
    }
}

/// Virtual host configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VhostConfig {
    /// Directories scanned for `<name>.<marker>` subdirectories.
    pub dirs: Vec<PathBuf>,

    /// Hostname suffix; a vhost named `shop` answers `shop.<base_hostname>`.
    pub base_hostname: String,

    /// Separator between the vhost name and the marker.
    pub separator: String,

    /// Marker identifying a vhost directory.
    pub marker: String,

    /// Rebuild the tree when files under the vhost or route roots change.
    pub watch: bool,
}

impl Default for VhostConfig {
    fn default() -> Self {
        Self {
            dirs: Vec::new(),
            base_hostname: "localhost".to_string(),
            separator: ".".to_string(),
            marker: "vhost".to_string(),
            watch: false,
        }
    }
}

/// Reverse proxy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Register the proxy dispatcher on the default tree.
    pub enabled: bool,

    /// Priority of the proxy entry; above every ordinary route by default.
    pub priority: i64,

    /// JSON file holding the proxy route table.
    pub store_path: PathBuf,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            priority: 100,
            store_path: PathBuf::from("proxy-routes.json"),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level or filter directive (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.proxy.priority, 100);
        assert_eq!(config.vhosts.separator, ".");
        assert_eq!(config.vhosts.marker, "vhost");
        assert_eq!(config.routes.extensions, vec!["toml"]);
        assert_eq!(config.routes.starting_use_priority, -1);
    }

    #[test]
    fn test_partial_sections() {
        let config: AppConfig = toml::from_str(
            r#"
            [vhosts]
            dirs = ["sites"]
            base_hostname = "example.com"

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.vhosts.dirs, vec![PathBuf::from("sites")]);
        assert_eq!(config.vhosts.base_hostname, "example.com");
        assert_eq!(config.vhosts.marker, "vhost");
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }
}
