//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment:
//! - Programmatic defaults
//! - Project YAML files under `.reposcore/`
//! - `REPOSCORE_*` environment overrides
//! - Validation of the merged result

pub mod loader;

pub use loader::{ConfigError, ConfigLoader, CONFIG_DIR, ENV_PREFIX};
