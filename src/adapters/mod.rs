//! Adapters implementing the domain ports.

pub mod sqlite;
pub mod workers;
