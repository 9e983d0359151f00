//! CLI command implementations
//!
//! `plan` and `query` are one-shot: they build the app, run one pipeline
//! phase, print one JSON object and exit. `serve` runs the HTTP server
//! until ctrl-c.

use std::path::Path;

use serde_json::Value;

use crate::app::App;
use crate::config::AppConfig;
use crate::http_server::HttpServer;
use crate::observability::install_tracing_subscriber;
use crate::pipeline::ExecuteRequest;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_plan_file, write_error, write_response};

/// Parse arguments and run; failures are also reported on stdout
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    install_tracing_subscriber();

    match run_command(cli.command) {
        Ok(()) => Ok(()),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config } => serve(config.as_deref()),
        Command::Plan {
            config,
            session,
            question,
        } => {
            let data = plan(config.as_deref(), &session, &question)?;
            write_response(data)
        }
        Command::Query {
            config,
            session,
            question,
            plan_file,
            confirm,
        } => {
            let mut request = ExecuteRequest::question(question);
            if let Some(path) = plan_file {
                request = request.with_plan(read_plan_file(&path)?);
            }
            if confirm {
                request = request.confirmed();
            }
            let data = query(config.as_deref(), &session, request)?;
            write_response(data)
        }
    }
}

/// Start the HTTP server
pub fn serve(config_path: Option<&Path>) -> CliResult<()> {
    let app = App::from_config(AppConfig::load_or_default(config_path)?)?;
    let server = HttpServer::new(&app);

    runtime()?.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Phase 1: returns `{plan, requiresConfirmation}`
pub fn plan(config_path: Option<&Path>, session: &str, question: &str) -> CliResult<Value> {
    let app = App::from_config(AppConfig::load_or_default(config_path)?)?;

    let planned = runtime()?.block_on(app.pipeline.plan(session, question))?;
    Ok(serde_json::to_value(planned)?)
}

/// Phase 2: returns `{rows, meta, plan}`
pub fn query(
    config_path: Option<&Path>,
    session: &str,
    request: ExecuteRequest,
) -> CliResult<Value> {
    let app = App::from_config(AppConfig::load_or_default(config_path)?)?;

    let outcome = runtime()?.block_on(app.pipeline.execute(session, request))?;
    Ok(serde_json::to_value(outcome)?)
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn seeded_config() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let seed = dir.path().join("seed.json");
        std::fs::write(
            &seed,
            r#"{"users": [{"name": "ada", "active": true}, {"name": "bob", "active": false}]}"#,
        )
        .unwrap();

        let config = dir.path().join("docpilot.json");
        let mut file = std::fs::File::create(&config).unwrap();
        write!(
            file,
            "{}",
            json!({"data": {"db_name": "shop", "seed_path": seed.display().to_string()}})
        )
        .unwrap();
        (dir, config)
    }

    #[test]
    fn test_query_with_supplied_plan() {
        let (_dir, config) = seeded_config();
        let request = ExecuteRequest::question("how many active users?").with_plan(json!({
            "action": "count",
            "collection": "users",
            "filter": {"active": true}
        }));

        let data = query(Some(config.as_path()), "cli-test", request).unwrap();
        assert_eq!(data["rows"], json!([{"count": 1}]));
        assert_eq!(data["meta"]["type"], "count");
    }

    #[test]
    fn test_query_mutation_needs_confirm() {
        let (_dir, config) = seeded_config();
        let request = ExecuteRequest::question("remove inactive users").with_plan(json!({
            "action": "delete",
            "collection": "users",
            "filter": {"active": false}
        }));

        let err = query(Some(config.as_path()), "cli-test", request).unwrap_err();
        assert_eq!(err.code_str(), "CONFIRMATION_REQUIRED");
    }

    #[test]
    fn test_missing_config_file() {
        let err = plan(Some(Path::new("/nonexistent/docpilot.json")), "s", "q").unwrap_err();
        assert_eq!(err.code_str(), "CLI_CONFIG_ERROR");
    }
}
