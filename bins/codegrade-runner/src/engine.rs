/// Execution Engine - Abstraction for Code Execution
///
/// **Core Responsibility:**
/// Run submitted source in a fresh namespace, call its entry point with the
/// test arguments, and hand back the raw returned value or the failure.
///
/// **Critical Architectural Boundary:**
/// - Engine knows HOW to execute (interpreter process, bootstrap protocol)
/// - Engine does NOT compare outputs
/// - Engine does NOT decide hint disclosure or report shape
///
/// Production uses `PythonEngine`: one interpreter process per invocation,
/// so no state survives from one test to the next.

use crate::config::InterpreterConfig;
use codegrade_common::config::STDERR_TAIL_CAP;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{self, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, warn};

const BOOTSTRAP: &str = include_str!("bootstrap.py");

/// Value returned by one successful entry-point call
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub value: Value,
    pub duration_ms: u64,
}

/// Outcome of a lint request
#[derive(Debug, Clone, PartialEq)]
pub enum SmokeRun {
    SyntaxError {
        message: String,
        line: Option<u32>,
        column: Option<u32>,
    },
    /// Parsed and executed once; `runtime_error` is set if that run failed
    Ran {
        output: String,
        runtime_error: Option<String>,
    },
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("{message}")]
    NoEntryPoint { message: String, duration_ms: u64 },

    #[error("{message}")]
    Runtime { message: String, duration_ms: u64 },

    #[error("Failed to start interpreter `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Interpreter I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Interpreter exited ({status}) without reporting a result{stderr}")]
    NoVerdict { status: String, stderr: String },

    #[error("Interpreter sent an unexpected `{0}` record")]
    Protocol(&'static str),
}

impl ExecError {
    /// Duration measured inside the interpreter, when it got that far
    pub fn duration_ms(&self) -> Option<u64> {
        match self {
            ExecError::NoEntryPoint { duration_ms, .. }
            | ExecError::Runtime { duration_ms, .. } => Some(*duration_ms),
            _ => None,
        }
    }
}

/// The one seam between grading logic and the interpreter
pub trait ExecutionEngine {
    /// Execute `code` in a fresh namespace and call its entry point with `args`
    fn invoke(&self, code: &str, args: &[Value]) -> Result<Invocation, ExecError>;

    /// Compile `code`, and if it compiles, run it once as a script
    fn smoke_run(&self, code: &str) -> Result<SmokeRun, ExecError>;
}

#[derive(Debug, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
enum Request<'a> {
    Invoke { code: &'a str, args: &'a [Value] },
    Lint { code: &'a str },
}

/// One line written by the bootstrap to its real stdout
#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Record {
    Ok {
        value: String,
        #[serde(rename = "elapsedMs")]
        elapsed_ms: u64,
    },
    NoEntryPoint {
        message: String,
        #[serde(rename = "elapsedMs")]
        elapsed_ms: u64,
    },
    Error {
        message: String,
        #[serde(rename = "elapsedMs")]
        elapsed_ms: u64,
    },
    SyntaxError {
        message: String,
        line: Option<u32>,
        column: Option<u32>,
    },
    Compiled,
    Ran {
        output: String,
        error: Option<String>,
    },
}

impl Record {
    fn name(&self) -> &'static str {
        match self {
            Record::Ok { .. } => "ok",
            Record::NoEntryPoint { .. } => "no_entry_point",
            Record::Error { .. } => "error",
            Record::SyntaxError { .. } => "syntax_error",
            Record::Compiled => "compiled",
            Record::Ran { .. } => "ran",
        }
    }
}

/// Raw result of one bootstrap process
struct ChildOutput {
    records: Vec<Record>,
    status: ExitStatus,
    stderr: String,
}

impl ChildOutput {
    fn no_verdict(&self) -> ExecError {
        let tail = tail_chars(self.stderr.trim_end(), STDERR_TAIL_CAP);
        ExecError::NoVerdict {
            status: self.status.to_string(),
            stderr: if tail.is_empty() {
                String::new()
            } else {
                format!(": {}", tail)
            },
        }
    }
}

/// Interpreter-backed engine for Python submissions
///
/// Every call spawns `<command> <args...> -c <bootstrap>`, writes one JSON
/// request to the child's stdin and reads protocol records back from its
/// stdout. Output printed by submitted code never reaches our stdout.
pub struct PythonEngine {
    interpreter: InterpreterConfig,
    hidden_env: Vec<String>,
}

impl PythonEngine {
    pub fn new(interpreter: InterpreterConfig) -> Self {
        Self {
            interpreter,
            hidden_env: Vec::new(),
        }
    }

    /// Keep the environment variable `name` away from submitted code
    pub fn hide_env(mut self, name: impl Into<String>) -> Self {
        self.hidden_env.push(name.into());
        self
    }

    fn run_bootstrap(&self, request: &Request<'_>) -> Result<ChildOutput, ExecError> {
        let body = serde_json::to_vec(request)
            .map_err(|e| ExecError::Io(io::Error::new(io::ErrorKind::InvalidInput, e)))?;

        debug!(
            command = %self.interpreter.command,
            request_bytes = body.len(),
            "Spawning interpreter"
        );

        let mut command = Command::new(&self.interpreter.command);
        command
            .args(&self.interpreter.args)
            .arg("-c")
            .arg(BOOTSTRAP)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for name in &self.hidden_env {
            command.env_remove(name);
        }

        let mut child = command.spawn().map_err(|source| ExecError::Spawn {
            command: self.interpreter.command.clone(),
            source,
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A child that dies before reading closes the pipe; the missing
            // verdict is reported below instead.
            if let Err(e) = stdin.write_all(&body) {
                if e.kind() != io::ErrorKind::BrokenPipe {
                    return Err(ExecError::Io(e));
                }
            }
        }

        let output = child.wait_with_output()?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        Ok(ChildOutput {
            records: parse_records(&stdout),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl ExecutionEngine for PythonEngine {
    fn invoke(&self, code: &str, args: &[Value]) -> Result<Invocation, ExecError> {
        let mut output = self.run_bootstrap(&Request::Invoke { code, args })?;

        match output.records.pop() {
            Some(Record::Ok { value, elapsed_ms }) => match serde_json::from_str(&value) {
                Ok(value) => Ok(Invocation {
                    value,
                    duration_ms: elapsed_ms,
                }),
                Err(e) => Err(ExecError::Runtime {
                    message: format!("Result is not representable as JSON: {}", e),
                    duration_ms: elapsed_ms,
                }),
            },
            Some(Record::NoEntryPoint { message, elapsed_ms }) => Err(ExecError::NoEntryPoint {
                message,
                duration_ms: elapsed_ms,
            }),
            Some(Record::Error { message, elapsed_ms }) => Err(ExecError::Runtime {
                message,
                duration_ms: elapsed_ms,
            }),
            Some(other) => Err(ExecError::Protocol(other.name())),
            None => {
                warn!(status = %output.status, "Interpreter produced no invoke record");
                Err(output.no_verdict())
            }
        }
    }

    fn smoke_run(&self, code: &str) -> Result<SmokeRun, ExecError> {
        let output = self.run_bootstrap(&Request::Lint { code })?;
        let compiled = output
            .records
            .iter()
            .any(|record| matches!(record, Record::Compiled));

        match output.records.last() {
            Some(Record::SyntaxError {
                message,
                line,
                column,
            }) => Ok(SmokeRun::SyntaxError {
                message: message.clone(),
                line: *line,
                column: *column,
            }),
            Some(Record::Ran { output, error }) => Ok(SmokeRun::Ran {
                output: output.clone(),
                runtime_error: error.clone(),
            }),
            Some(Record::Compiled) | None if compiled => {
                // Parsed fine, then the process died mid-run
                warn!(status = %output.status, "Interpreter exited during lint run");
                Ok(SmokeRun::Ran {
                    output: String::new(),
                    runtime_error: Some(output.no_verdict().to_string()),
                })
            }
            Some(other) => Err(ExecError::Protocol(other.name())),
            None => Err(output.no_verdict()),
        }
    }
}

/// Protocol records in the order the bootstrap wrote them
///
/// Lines that are not records (raw writes to the real stdout, or records the
/// parser rejects) are skipped.
fn parse_records(stdout: &str) -> Vec<Record> {
    stdout
        .lines()
        .filter_map(|line| match serde_json::from_str::<Record>(line) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(
                    error = %e,
                    line_chars = line.chars().count(),
                    "Dropped unreadable interpreter record"
                );
                None
            }
        })
        .collect()
}

/// Last `max` characters of `text`
fn tail_chars(text: &str, max: usize) -> &str {
    if max == 0 {
        return "";
    }
    match text.char_indices().rev().nth(max - 1) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

/// Wall-clock milliseconds since `start`
pub fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
