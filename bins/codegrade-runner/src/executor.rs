/// Payload Executor - High-Level Orchestration
///
/// **Responsibility:**
/// Pick the mode from the payload and coordinate the execution engine,
/// evaluator and report builder to produce the final report.
///
/// **Architecture:**
/// 1. Lint: one smoke run through the engine (engine.rs), shaped by report.rs
/// 2. Test: one engine invocation per test, in input order, scored by evaluator.rs
///
/// This module is the glue layer - it knows nothing about:
/// - How code executes (engine's job)
/// - How outputs are compared (evaluator's job)

use crate::config::NumericEquality;
use crate::engine::{elapsed_ms, ExecutionEngine};
use crate::evaluator;
use crate::report;
use anyhow::{Context, Result};
use codegrade_common::types::{LintReport, Operation, Payload, Report, TestReport};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Positional arguments for the entry point
///
/// A JSON array is spread into positional arguments; any other value is
/// passed as the only argument.
pub fn arguments_for(input: &Value) -> Vec<Value> {
    match input {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

/// Run a decoded payload to completion
///
/// Per-test failures are folded into the report. An `Err` here means the
/// harness itself could not produce a report.
pub fn execute(
    payload: &Payload,
    engine: &dyn ExecutionEngine,
    numeric: NumericEquality,
) -> Result<Report> {
    match payload.operation {
        Operation::Lint => Ok(Report::Lint(run_lint(&payload.code, engine)?)),
        Operation::Test => Ok(Report::Test(run_tests(payload, engine, numeric))),
    }
}

/// Syntax check plus one top-level run of the submitted code
pub fn run_lint(code: &str, engine: &dyn ExecutionEngine) -> Result<LintReport> {
    info!(source_size = code.len(), "Starting lint");

    let smoke = engine
        .smoke_run(code)
        .context("Lint run did not produce a verdict")?;
    let lint = report::lint_report(smoke);

    info!(passed = lint.passed(), "Lint complete");
    Ok(lint)
}

/// Execute every test case in input order
pub fn run_tests(
    payload: &Payload,
    engine: &dyn ExecutionEngine,
    numeric: NumericEquality,
) -> TestReport {
    info!(
        test_cases = payload.tests.len(),
        source_size = payload.code.len(),
        numeric_equality = ?numeric,
        "Starting test run"
    );

    let mut results = Vec::with_capacity(payload.tests.len());

    for (idx, test_case) in payload.tests.iter().enumerate() {
        let args = arguments_for(&test_case.input);

        let start = Instant::now();
        let outcome = engine.invoke(&payload.code, &args);
        let wall_ms = elapsed_ms(start);

        if let Err(e) = &outcome {
            warn!(test_num = idx + 1, test_id = %test_case.id, error = %e, "Invocation failed");
        }

        let result = evaluator::evaluate_test(test_case, &outcome, wall_ms, numeric);

        debug!(
            test_num = idx + 1,
            test_id = %result.test_id,
            passed = result.passed,
            hidden = result.is_hidden,
            duration_ms = result.duration_ms,
            "Test result"
        );

        results.push(result);
    }

    let report = evaluator::aggregate_results(results);

    info!(
        passed = report.passed,
        passed_count = report.summary.passed_count,
        total = report.summary.total,
        "Test run complete"
    );

    report
}
