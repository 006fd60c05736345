//! Domain layer for the analysis job orchestrator
//!
//! Core models, lifecycle rules and the port traits that adapters implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
