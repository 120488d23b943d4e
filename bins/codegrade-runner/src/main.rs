mod config;
mod engine;
mod evaluator;
mod executor;
mod report;

#[cfg(test)]
mod engine_tests;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use codegrade_common::payload;
use codegrade_common::types::{Payload, Report};
use config::{Args, LogFormat};
use engine::PythonEngine;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::process::ExitCode;
use tracing::{error, info, info_span};
use uuid::Uuid;

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            init_tracing(LogFormat::Pretty);
            error!(error = %e, "Invalid harness arguments");
            return finish(report::failure_report(0, e.to_string()), ExitCode::FAILURE);
        }
    };

    init_tracing(args.log_format);

    let run_id = Uuid::new_v4();
    let span = info_span!("grade", run_id = %run_id);
    let _guard = span.enter();

    info!("Grading harness starting");

    let (report, code) = grade(&args);
    finish(report, code)
}

/// Logs go to stderr; stdout carries only the report line
fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_line_number(true);

    let _ = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

fn load_payload(args: &Args) -> Result<Payload> {
    let raw = args.read_payload()?;
    let payload = payload::decode(&raw).context("Failed to decode payload")?;

    info!(
        operation = ?payload.operation,
        test_cases = payload.tests.len(),
        source_size = payload.code.len(),
        "Payload decoded"
    );
    Ok(payload)
}

/// Produce the report and exit code for one invocation
///
/// Every path yields a report; only faults outside the per-test guard
/// yield a non-zero exit code.
fn grade(args: &Args) -> (Report, ExitCode) {
    let payload = match load_payload(args) {
        Ok(payload) => payload,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Payload rejected");
            return (report::failure_report(0, format!("{:#}", e)), ExitCode::FAILURE);
        }
    };
    let total = payload.tests.len();

    let interpreter = match args.interpreter() {
        Ok(interpreter) => interpreter,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Interpreter configuration invalid");
            return (report::failure_report(total, format!("{:#}", e)), ExitCode::FAILURE);
        }
    };
    info!(command = %interpreter.command, args = ?interpreter.args, "Interpreter configured");

    let engine = args
        .payload_variables()
        .into_iter()
        .fold(PythonEngine::new(interpreter), PythonEngine::hide_env);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        executor::execute(&payload, &engine, args.numeric_equality)
    }));

    match outcome {
        Ok(Ok(report)) => (report, ExitCode::SUCCESS),
        Ok(Err(e)) => {
            error!(error = %format!("{:#}", e), "Harness fault");
            (report::failure_report(total, format!("{:#}", e)), ExitCode::FAILURE)
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!(error = %message, "Harness panicked");
            (report::failure_report(total, message), ExitCode::FAILURE)
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("Internal fault: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("Internal fault: {}", message)
    } else {
        "Internal fault".to_string()
    }
}

fn finish(report: Report, code: ExitCode) -> ExitCode {
    match report::emit(&report) {
        Ok(()) => code,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Failed to emit report");
            ExitCode::FAILURE
        }
    }
}
