//! Command-line interface.

pub mod commands;
pub mod context;
pub mod id_resolver;
pub mod output;
pub mod types;

pub use context::AppContext;
pub use types::{Cli, Commands, GlobalArgs};

use crate::domain::errors::DomainError;

/// Print an error in the requested format and exit non-zero.
///
/// Validation and not-found errors exit with 2, everything else with 1.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    let code = match err.downcast_ref::<DomainError>() {
        Some(DomainError::Validation { .. } | DomainError::ProjectNotFound(_)) => 2,
        _ => 1,
    };

    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "error": format!("{err:#}"),
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {err:#}", console::style("Error:").red().bold());
    }
    std::process::exit(code)
}
