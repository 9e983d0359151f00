//! docpilot CLI entry point
//!
//! Parses arguments and dispatches through `cli::run`. The command has
//! already written its JSON error to stdout when this returns an error.

use docpilot::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
