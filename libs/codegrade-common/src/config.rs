// Harness-wide constants shared by the decoder and the runner

/// Environment variable that carries the base64 payload by default
pub const DEFAULT_PAYLOAD_ENV: &str = "PAYLOAD";

/// Default interpreter command
pub const DEFAULT_INTERPRETER: &str = "python3";

/// Maximum number of characters of captured lint output kept in a report
pub const LINT_OUTPUT_CAP: usize = 10_000;

/// Appended after lint output that hit `LINT_OUTPUT_CAP`
pub const TRUNCATION_MARKER: &str = "\n... [Output Truncated for Security]";

/// Maximum number of characters of interpreter stderr quoted in an error
pub const STDERR_TAIL_CAP: usize = 1_000;

/// Reported by the bootstrap when neither `solution` nor `main` is callable
pub const NO_ENTRY_POINT_MESSAGE: &str = "No solution or main function found";

pub const LINT_OK_MESSAGE: &str = "Syntax valid";
