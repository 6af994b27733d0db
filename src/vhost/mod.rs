//! Virtual host subsystem.
//!
//! # Data Flow
//! ```text
//! vhost roots
//!     → naming.rs   (`shop.vhost` → name "shop")
//!     → composer.rs (build `shop.vhost/routes` with the router builder)
//!     → VhostMapping { hostname: "shop.<base>", root }
//! ```

pub mod composer;
pub mod naming;

pub use composer::{VhostComposer, VhostMapping};
pub use naming::{hostname_for, parse_vhost_dir, VhostName};
