//! CLI module for docpilot
//!
//! Provides command-line interface for:
//! - serve: Run the HTTP server
//! - plan: One-shot plan generation
//! - query: One-shot plan execution

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{plan, query, run, run_command, serve};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{error_envelope, ok_envelope, read_plan_file, write_error, write_response};
