//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value shapes (addresses parse, names are usable)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Missing directories are not errors; they build as empty levels

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::AppConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),

    #[error("vhosts.{0} must not be empty")]
    EmptyVhostField(&'static str),

    #[error("vhosts.separator `{0}` must not appear in vhosts.marker")]
    SeparatorInMarker(String),

    #[error("routes.extensions entry `{0}` must be a bare extension without a dot")]
    Extension(String),

    #[error("routes.uses entry `{0}` is empty")]
    EmptyUse(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    let obs = &config.observability;
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::MetricsAddress(obs.metrics_address.clone()));
    }

    let vhosts = &config.vhosts;
    if vhosts.separator.is_empty() {
        errors.push(ValidationError::EmptyVhostField("separator"));
    }
    if vhosts.marker.is_empty() {
        errors.push(ValidationError::EmptyVhostField("marker"));
    }
    if vhosts.base_hostname.is_empty() {
        errors.push(ValidationError::EmptyVhostField("base_hostname"));
    }
    if !vhosts.separator.is_empty() && vhosts.marker.contains(&vhosts.separator) {
        errors.push(ValidationError::SeparatorInMarker(vhosts.separator.clone()));
    }

    for ext in &config.routes.extensions {
        if ext.is_empty() || ext.contains('.') {
            errors.push(ValidationError::Extension(ext.clone()));
        }
    }
    for name in &config.routes.uses {
        if name.trim().is_empty() {
            errors.push(ValidationError::EmptyUse(name.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
