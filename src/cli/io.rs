//! JSON I/O handling for CLI
//!
//! - Output: single JSON object via stdout
//! - Logs go to stderr, so stdout stays machine-readable

use std::io::{self, Write};
use std::path::Path;

use serde_json::{json, Value};

use super::errors::{CliError, CliResult};

/// Read a plan JSON file
pub fn read_plan_file(path: &Path) -> CliResult<Value> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| CliError::io_error(format!("failed to read {}: {}", path.display(), e)))?;

    if raw.trim().is_empty() {
        return Err(CliError::io_error(format!("{} is empty", path.display())));
    }

    let value: Value = serde_json::from_str(&raw)?;
    Ok(value)
}

/// Success envelope
pub fn ok_envelope(data: Value) -> Value {
    json!({
        "status": "ok",
        "data": data
    })
}

/// Error envelope
pub fn error_envelope(code: &str, message: &str) -> Value {
    json!({
        "status": "error",
        "code": code,
        "message": message
    })
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    write_line(&ok_envelope(data))
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    write_line(&error_envelope(code, message))
}

fn write_line(value: &Value) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelopes() {
        assert_eq!(
            ok_envelope(json!([1])),
            json!({"status": "ok", "data": [1]})
        );
        assert_eq!(
            error_envelope("RATE_LIMITED", "slow down"),
            json!({"status": "error", "code": "RATE_LIMITED", "message": "slow down"})
        );
    }

    #[test]
    fn test_read_plan_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.json");
        std::fs::write(&path, r#"{"action": "count", "collection": "users"}"#).unwrap();
        assert_eq!(read_plan_file(&path).unwrap()["action"], "count");

        std::fs::write(&path, "  ").unwrap();
        assert_eq!(read_plan_file(&path).unwrap_err().code_str(), "CLI_IO_ERROR");

        assert!(read_plan_file(&dir.path().join("missing.json")).is_err());
    }
}
