//! Infrastructure layer module
//!
//! Process-level concerns that sit outside the domain:
//! - Configuration loading (figment)
//! - Logging setup (tracing)
//!
//! Storage and worker adapters live in [`crate::adapters`].

pub mod config;
pub mod logging;
