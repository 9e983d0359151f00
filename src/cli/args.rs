//! CLI argument definitions using clap
//!
//! Commands:
//! - docpilot serve --config <path>
//! - docpilot plan --config <path> --session <id> --question <q>
//! - docpilot query --config <path> --session <id> --question <q> [--plan-file <path>] [--confirm]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// docpilot - natural-language questions answered from a document store
#[derive(Parser, Debug)]
#[command(name = "docpilot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server
    Serve {
        /// Path to configuration file; defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Generate and validate a plan without executing it
    Plan {
        /// Path to configuration file; defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Session id used as the rate-limit key
        #[arg(long, default_value = "cli")]
        session: String,

        /// Natural-language question
        #[arg(long)]
        question: String,
    },

    /// Validate and execute a plan, generating one if none is given
    Query {
        /// Path to configuration file; defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Session id used as the rate-limit key
        #[arg(long, default_value = "cli")]
        session: String,

        /// Natural-language question
        #[arg(long)]
        question: String,

        /// JSON file holding a plan returned by `plan`
        #[arg(long)]
        plan_file: Option<PathBuf>,

        /// Allow update and delete plans to run
        #[arg(long)]
        confirm: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
