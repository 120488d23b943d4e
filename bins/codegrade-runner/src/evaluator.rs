/// Test Evaluator - Language-Agnostic Scoring Logic
///
/// **Core Responsibility:**
/// Compare the value returned by an entry point against the expected output
/// and turn every invocation outcome into a `TestResult`.
///
/// **Critical Properties:**
/// - Knows nothing about interpreters or processes
/// - Pure function: (test case, invocation outcome) → TestResult
///
/// **Comparison Rules:**
/// - Two values match iff their canonical JSON text is byte-identical
/// - Canonical text is compact JSON; object keys keep the order they were produced in
/// - Integers keep every digit; floats render the way the interpreter prints them
/// - Sequences are order-sensitive
/// - Integer vs float: distinct under `Strict`, integral floats fold to integers under `Lenient`
///
/// **Disclosure Rules:**
/// - A hint is surfaced only for a failing, visible test that carries a non-empty hint
/// - Hidden tests never surface a hint, pass or fail

use crate::config::NumericEquality;
use crate::engine::{ExecError, Invocation};
use codegrade_common::types::{Summary, TestCase, TestReport, TestResult};
use serde_json::{Map, Number, Value};

/// Largest float magnitude that still maps onto an exact integer
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Canonical serialization used for both comparison and the `stdout` field
pub fn canonical_form(value: &Value) -> String {
    normalize_numbers(value).to_string()
}

/// Rewrite every float in interpreter spelling, recursively
fn normalize_numbers(value: &Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(normalize_number(n)),
        Value::Array(items) => Value::Array(items.iter().map(normalize_numbers).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), normalize_numbers(v)))
                .collect::<Map<String, Value>>(),
        ),
        _ => value.clone(),
    }
}

fn normalize_number(n: &Number) -> Number {
    if let Some(i) = n.as_i64() {
        return Number::from(i);
    }
    if !n.is_f64() {
        // Integer beyond i64, or a float literal that overflows: keep the digits
        return n.clone();
    }
    n.as_f64()
        .and_then(|f| serde_json::from_str(&float_repr(f)).ok())
        .unwrap_or_else(|| n.clone())
}

/// Shortest round-trip float text with a signed, two-digit exponent
///
/// `{:?}` already switches to exponent form at the same thresholds as the
/// interpreter (below 1e-4, at or above 1e16); only the exponent spelling
/// differs (`1e30` vs `1e+30`, `1e-5` vs `1e-05`).
fn float_repr(f: f64) -> String {
    let text = format!("{:?}", f);
    match text.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => text,
    }
}

/// Rewrite integral floats as integers, recursively
fn fold_integral_floats(value: &Value) -> Value {
    match value {
        Value::Number(n) if n.is_f64() => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < MAX_EXACT_INTEGER => {
                Value::Number(Number::from(f as i64))
            }
            _ => value.clone(),
        },
        Value::Array(items) => Value::Array(items.iter().map(fold_integral_floats).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), fold_integral_floats(v)))
                .collect::<Map<String, Value>>(),
        ),
        _ => value.clone(),
    }
}

/// Decide whether an actual result matches the expected output
pub fn outputs_match(actual: &Value, expected: &Value, numeric: NumericEquality) -> bool {
    match numeric {
        NumericEquality::Strict => canonical_form(actual) == canonical_form(expected),
        NumericEquality::Lenient => {
            canonical_form(&fold_integral_floats(actual))
                == canonical_form(&fold_integral_floats(expected))
        }
    }
}

/// Hint to disclose for a test with the given outcome
pub fn disclosed_hint(test_case: &TestCase, passed: bool) -> Option<String> {
    if passed || test_case.is_hidden {
        return None;
    }
    test_case.hint.clone().filter(|hint| !hint.is_empty())
}

/// Evaluate a single test case invocation outcome
///
/// ## Arguments
/// * `test_case` - Test definition from the payload
/// * `outcome` - Returned value, or the failure that prevented one
/// * `wall_ms` - Harness-side duration, used when the engine measured none
/// * `numeric` - Numeric comparison policy
pub fn evaluate_test(
    test_case: &TestCase,
    outcome: &Result<Invocation, ExecError>,
    wall_ms: u64,
    numeric: NumericEquality,
) -> TestResult {
    let (passed, stdout, stderr, duration_ms) = match outcome {
        Ok(invocation) => (
            outputs_match(&invocation.value, &test_case.expected_output, numeric),
            canonical_form(&invocation.value),
            String::new(),
            invocation.duration_ms,
        ),
        Err(e) => (
            false,
            String::new(),
            e.to_string(),
            e.duration_ms().unwrap_or(wall_ms),
        ),
    };

    TestResult {
        test_id: test_case.id.clone(),
        passed,
        stdout,
        stderr,
        duration_ms,
        is_hidden: test_case.is_hidden,
        hint: disclosed_hint(test_case, passed),
    }
}

/// Aggregate per-test results into the final report
///
/// `passed` is true iff every result passed; an empty list passes.
pub fn aggregate_results(results: Vec<TestResult>) -> TestReport {
    let passed_count = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    TestReport {
        passed: passed_count == total,
        details: results,
        summary: Summary {
            passed_count,
            total,
        },
    }
}
