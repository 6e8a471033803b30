//! Workflow command handlers

use crate::cli::workflow::RunArgs;
use anyhow::{Context, Result};
use bytes::Bytes;
use faasflow_core::models::{Configuration, InvocationParams, RunReport, Termination};
use faasflow_core::workflow::{
    load_definition, CollectingSink, GatewayInvoker, RunOptions, StateMachineEngine,
    WorkflowValidator, WriterSink,
};
use std::io::{IsTerminal, Read};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Merge command-line flags over the configured invocation parameters
pub fn invocation_params(args: &RunArgs, config: &Configuration) -> InvocationParams {
    let mut params = config.invocation_params();

    if let Some(gateway) = &args.gateway {
        params.gateway = gateway.clone();
    }
    if let Some(namespace) = &args.namespace {
        params.namespace = Some(namespace.clone());
    }
    if let Some(content_type) = &args.content_type {
        params.content_type = content_type.clone();
    }
    if let Some(method) = &args.method {
        params.http_method = method.to_uppercase();
    }
    params.tls_insecure |= args.tls_no_verify;
    params.is_async = args.is_async;
    params.query = args.query.clone();
    params.headers = args.header.clone();

    params
}

/// Read the run input from `--data`, `--input` or a piped stdin
fn read_input(args: &RunArgs) -> Result<Bytes> {
    if let Some(data) = &args.data {
        return Ok(Bytes::from(data.clone()));
    }

    if let Some(path) = &args.input {
        let content = std::fs::read(path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?;
        return Ok(Bytes::from(content));
    }

    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Ok(Bytes::new());
    }

    let mut buffer = Vec::new();
    stdin
        .lock()
        .read_to_end(&mut buffer)
        .context("Failed to read input from stdin")?;
    Ok(Bytes::from(buffer))
}

/// Cancel the run on the first Ctrl-C, exit on the second
fn spawn_interrupt_handler(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("Interrupt received, stopping after the current state");
        token.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
}

/// Handle run command
pub async fn handle_run(args: RunArgs, config: Configuration) -> Result<()> {
    let definition = load_definition(&args.definition)?;
    let params = invocation_params(&args, &config);
    let input = read_input(&args)?;

    let token = CancellationToken::new();
    spawn_interrupt_handler(token.clone());

    let invoker = Arc::new(GatewayInvoker::new()?);
    let engine = StateMachineEngine::new(definition, invoker).with_options(RunOptions {
        max_steps: args.max_steps.or(config.max_steps),
        cancellation: Some(token),
    });

    if args.json {
        let mut sink = CollectingSink::new();
        let result = engine.execute(input, params, &mut sink).await;
        let output = match &result {
            Ok(report) => serde_json::json!({
                "report": report,
                "outputs": sink.into_chunks(),
            }),
            // Responses of the steps that ran before the abort are still reported
            Err(err) => serde_json::json!({
                "error": err.to_string(),
                "state": err.state(),
                "outputs": sink.into_chunks(),
            }),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        result?;
    } else {
        let mut sink = WriterSink::stdout();
        let report = engine.execute(input, params, &mut sink).await?;
        log_termination(&report);
    }

    Ok(())
}

fn log_termination(report: &RunReport) {
    match &report.termination {
        Termination::End { state } => {
            tracing::info!(run_id = %report.run_id, state = %state, steps = report.steps, "Run finished");
        }
        Termination::Fail { state, error, cause } => {
            tracing::warn!(
                run_id = %report.run_id,
                state = %state,
                error = error.as_deref().unwrap_or(""),
                cause = cause.as_deref().unwrap_or(""),
                "Run ended in Fail state"
            );
        }
    }
}

/// Handle validate command
pub async fn handle_validate(definition_file: &Path, json: bool) -> Result<()> {
    let definition = load_definition(definition_file)?;
    let validation_result = WorkflowValidator::validate_definition(&definition);

    if json {
        let json_output = serde_json::json!({
            "valid": validation_result.is_valid(),
            "errors": validation_result.errors,
            "warnings": validation_result.warnings,
        });
        println!("{}", serde_json::to_string_pretty(&json_output)?);
    } else {
        println!("Validating definition: {}", definition_file.display());
        println!();

        if validation_result.is_valid() {
            println!("✓ Definition is valid");
            println!();
            println!("Summary:");
            if let Some(comment) = &definition.comment {
                println!("  Comment:       {}", comment);
            }
            println!("  Start state:   {}", definition.start_state);
            println!("  Total states:  {}", definition.states.len());
        } else {
            println!("✗ Definition validation failed");
            println!();
            println!("Errors:");
            for error in &validation_result.errors {
                println!("  ✗ {}: {}", error.field, error.message);
            }
        }

        if !validation_result.warnings.is_empty() {
            println!();
            println!("Warnings:");
            for warning in &validation_result.warnings {
                println!("  ⚠  {}", warning);
            }
        }
    }

    if !validation_result.is_valid() {
        return Err(anyhow::anyhow!(
            "Definition validation failed with {} error(s)",
            validation_result.errors.len()
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        run: RunArgs,
    }

    fn parse(args: &[&str]) -> RunArgs {
        let mut argv = vec!["faasflow", "flow.json"];
        argv.extend_from_slice(args);
        TestCli::parse_from(argv).run
    }

    #[test]
    fn test_defaults_come_from_configuration() {
        let config = Configuration {
            gateway: "https://gw.example.com".to_string(),
            namespace: Some("prod".to_string()),
            http_method: "put".to_string(),
            ..Configuration::default()
        };

        let params = invocation_params(&parse(&[]), &config);
        assert_eq!(params.gateway, "https://gw.example.com");
        assert_eq!(params.namespace.as_deref(), Some("prod"));
        assert_eq!(params.http_method, "PUT");
        assert!(!params.is_async);
    }

    #[test]
    fn test_flags_override_configuration() {
        let args = parse(&[
            "--gateway",
            "http://127.0.0.1:9999",
            "-n",
            "dev",
            "--method",
            "get",
            "--async",
            "--tls-no-verify",
            "-q",
            "a=1",
            "-H",
            "X-Trace=t",
            "--content-type",
            "application/json",
        ]);

        let params = invocation_params(&args, &Configuration::default());
        assert_eq!(params.gateway, "http://127.0.0.1:9999");
        assert_eq!(params.namespace.as_deref(), Some("dev"));
        assert_eq!(params.http_method, "GET");
        assert!(params.is_async);
        assert!(params.tls_insecure);
        assert_eq!(params.query, vec!["a=1"]);
        assert_eq!(params.headers, vec!["X-Trace=t"]);
        assert_eq!(params.content_type, "application/json");
    }

    #[test]
    fn test_data_and_input_conflict() {
        let result =
            TestCli::try_parse_from(["faasflow", "flow.json", "--data", "x", "--input", "in.txt"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_read_input_prefers_inline_data() {
        let args = parse(&["--data", "trip-1"]);
        assert_eq!(read_input(&args).unwrap(), Bytes::from_static(b"trip-1"));
    }

    #[test]
    fn test_read_input_from_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("input.json");
        std::fs::write(&path, b"{\"trip_id\": 7}").unwrap();

        let args = parse(&["--input", path.to_str().unwrap()]);
        assert_eq!(read_input(&args).unwrap(), Bytes::from_static(b"{\"trip_id\": 7}"));
    }

    #[tokio::test]
    async fn test_validate_reports_errors() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("flow.json");
        std::fs::write(
            &path,
            r#"{"StartFunction": "a", "States": {"a": {"Type": "Task"}}}"#,
        )
        .unwrap();

        let err = handle_validate(&path, true).await.unwrap_err();
        assert!(err.to_string().contains("1 error(s)"));
    }
}
