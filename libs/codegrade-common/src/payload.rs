use crate::types::{Operation, Payload, TestCase};
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use thiserror::Error;

/// Payload decoding - defines only the wire shape, not execution
/// Ensures the runner never sees a half-valid payload: either every field
/// it needs is present and typed, or decoding fails as a whole.

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("payload is empty")]
    Empty,
    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("payload is not a valid task document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload requests test mode but carries no `tests` list")]
    MissingTests,
}

/// Wire form, before mode resolution
#[derive(Debug, Deserialize)]
struct RawPayload {
    code: String,
    #[serde(default)]
    operation: Option<Operation>,
    #[serde(default)]
    tests: Option<Vec<TestCase>>,
}

/// Decode a base64-encoded JSON payload
///
/// Surrounding whitespace is ignored. The standard alphabet is tried first,
/// then the URL-safe one.
pub fn decode(encoded: &str) -> Result<Payload, PayloadError> {
    let trimmed = encoded.trim();
    if trimmed.is_empty() {
        return Err(PayloadError::Empty);
    }

    let bytes = match general_purpose::STANDARD.decode(trimmed) {
        Ok(bytes) => bytes,
        Err(standard_err) => general_purpose::URL_SAFE
            .decode(trimmed)
            .map_err(|_| standard_err)?,
    };

    let text = String::from_utf8(bytes)?;
    from_json(&text)
}

/// Parse an already-decoded JSON payload document
pub fn from_json(text: &str) -> Result<Payload, PayloadError> {
    let raw: RawPayload = serde_json::from_str(text)?;
    let operation = raw.operation.unwrap_or(Operation::Test);

    let tests = match (operation, raw.tests) {
        (_, Some(tests)) => tests,
        (Operation::Lint, None) => Vec::new(),
        (Operation::Test, None) => return Err(PayloadError::MissingTests),
    };

    Ok(Payload {
        code: raw.code,
        operation,
        tests,
    })
}
