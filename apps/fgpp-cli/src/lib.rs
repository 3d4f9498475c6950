//! fgpp CLI library
//!
//! Exposes argument parsing, errors and report rendering for integration
//! testing. The binary entry point is in main.rs.

pub mod args;
pub mod error;
pub mod logging;
pub mod output;
pub mod report;

pub use args::Cli;
pub use error::{CliError, CliResult};
pub use report::{render_json, render_text, ReportOptions};
