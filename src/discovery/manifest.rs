//! On-disk manifest formats.
//!
//! Handler manifest:
//!
//! ```toml
//! path = "/users/:id"
//! priority = 5
//! use = ["auth", "./local-middleware"]
//! static = ["public"]
//! starting_use_priority = -1
//! specific_use_priorities = [10]
//!
//! [methods]
//! get = "users.show"
//! delete = "users.remove"
//! ```
//!
//! Middleware manifest:
//!
//! ```toml
//! run = "auth.check"
//! name = "auth"
//! priority = 20
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;

/// Deserialized handler manifest. Every field is optional at this stage.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HandlerManifest {
    pub path: Option<String>,
    pub priority: Option<i64>,
    /// Method name to action name.
    pub methods: BTreeMap<String, String>,
    #[serde(rename = "use")]
    pub uses: Vec<String>,
    #[serde(rename = "static")]
    pub static_dirs: Vec<String>,
    pub starting_use_priority: Option<i64>,
    pub specific_use_priorities: Vec<i64>,
}

/// Deserialized middleware manifest.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MiddlewareManifest {
    pub run: Option<String>,
    pub name: Option<String>,
    pub priority: Option<i64>,
}
