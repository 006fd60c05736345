//! CLI command implementations.

pub mod bugs;
pub mod cancel;
pub mod init;
pub mod list;
pub mod show;
pub mod stats;
pub mod submit;
pub mod submit_batch;
pub mod watch;
