// Report construction and emission: bounded lint output, the degraded
// failure report, and the single stdout line.

use crate::engine::SmokeRun;
use anyhow::{Context, Result};
use codegrade_common::config::{LINT_OK_MESSAGE, LINT_OUTPUT_CAP, TRUNCATION_MARKER};
use codegrade_common::types::{FailureReport, LintReport, Location, Report};
use std::io::Write;

/// Cut captured output to `LINT_OUTPUT_CAP` characters plus the marker
pub fn bound_output(captured: String) -> String {
    match captured.char_indices().nth(LINT_OUTPUT_CAP) {
        Some((cut, _)) => {
            let mut bounded = captured[..cut].to_string();
            bounded.push_str(TRUNCATION_MARKER);
            bounded
        }
        None => captured,
    }
}

/// Build the lint verdict from a smoke run
///
/// A runtime error during the smoke run keeps `passed: true`; it only
/// annotates the message and is echoed into the captured output by the
/// bootstrap.
pub fn lint_report(smoke: SmokeRun) -> LintReport {
    match smoke {
        SmokeRun::SyntaxError {
            message,
            line,
            column,
        } => LintReport::SyntaxError {
            passed: false,
            error: message,
            location: Location { line, column },
        },
        SmokeRun::Ran {
            output,
            runtime_error,
        } => {
            let message = match runtime_error {
                Some(error) => format!("{} (Runtime error: {})", LINT_OK_MESSAGE, error),
                None => LINT_OK_MESSAGE.to_string(),
            };
            LintReport::Checked {
                passed: true,
                message,
                output: bound_output(output),
            }
        }
    }
}

/// Degraded report for faults outside the per-test guard
pub fn failure_report(total: usize, error: impl Into<String>) -> Report {
    Report::Failure(FailureReport::new(total, error))
}

/// Serialize a report as exactly one line (no trailing newline)
pub fn render(report: &Report) -> Result<String> {
    serde_json::to_string(report).context("Failed to serialize report")
}

/// Write the report line to `out` and flush
pub fn emit_to(out: &mut impl Write, report: &Report) -> Result<()> {
    let line = render(report)?;
    writeln!(out, "{}", line).context("Failed to write report")?;
    out.flush().context("Failed to flush report")
}

/// Write the report line to stdout
pub fn emit(report: &Report) -> Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    emit_to(&mut handle, report)
}
