use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Requested harness operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Lint,
    Test,
}

/// Decoded task payload.
///
/// `operation` is already resolved: an absent `operation` key means `Test`.
/// `tests` is empty for lint payloads that did not carry a test list.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    pub code: String,
    pub operation: Operation,
    pub tests: Vec<TestCase>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    /// Opaque identifier, echoed back verbatim as `testId`
    pub id: Value,
    /// A JSON array is spread into positional arguments
    #[serde(default)]
    pub input: Value,
    #[serde(default)]
    pub expected_output: Value,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub hint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub test_id: Value,
    pub passed: bool,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub is_hidden: bool,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub passed_count: usize,
    pub total: usize,
}

/// Aggregate verdict for a test-mode payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestReport {
    pub passed: bool,
    pub details: Vec<TestResult>,
    pub summary: Summary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: Option<u32>,
    pub column: Option<u32>,
}

/// Lint verdict: either the code parsed (and was smoke-run), or it did not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LintReport {
    Checked {
        passed: bool,
        message: String,
        output: String,
    },
    SyntaxError {
        passed: bool,
        error: String,
        location: Location,
    },
}

impl LintReport {
    pub fn passed(&self) -> bool {
        match self {
            LintReport::Checked { passed, .. } | LintReport::SyntaxError { passed, .. } => *passed,
        }
    }
}

/// Degraded report emitted when the harness itself could not finish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReport {
    pub passed: bool,
    pub details: Vec<TestResult>,
    pub summary: Summary,
    pub error: String,
}

impl FailureReport {
    pub fn new(total: usize, error: impl Into<String>) -> Self {
        Self {
            passed: false,
            details: Vec::new(),
            summary: Summary {
                passed_count: 0,
                total,
            },
            error: error.into(),
        }
    }
}

/// Anything the harness can print as its single output line
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Report {
    Test(TestReport),
    Lint(LintReport),
    Failure(FailureReport),
}
