//! Analysis worker adapters.

pub mod mock;
pub mod process;

pub use mock::{MockBehavior, MockWorker};
pub use process::{ProcessWorker, ProcessWorkerConfig};
