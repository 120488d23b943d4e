/// Integration tests for the interpreter-backed engine
///
/// These tests drive a real `python3` through the bootstrap:
/// 1. Entry-point resolution and argument spreading
/// 2. Failures surface as data, never as a crashed batch
/// 3. Lint parsing, smoke runs and output capture
/// 4. Namespaces do not leak between invocations
///
/// Each test returns early when no `python3` is on PATH.

#[cfg(test)]
mod python_engine_tests {
    use crate::config::{InterpreterConfig, NumericEquality};
    use crate::engine::{ExecError, ExecutionEngine, PythonEngine, SmokeRun};
    use crate::executor::{execute, run_tests};
    use codegrade_common::config::{LINT_OUTPUT_CAP, NO_ENTRY_POINT_MESSAGE, TRUNCATION_MARKER};
    use codegrade_common::types::{LintReport, Operation, Payload, Report, TestCase};
    use serde_json::{json, Value};
    use std::process::Command;

    fn python_engine() -> Option<PythonEngine> {
        let available = Command::new("python3")
            .arg("--version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false);

        if !available {
            eprintln!("python3 not found on PATH; skipping");
            return None;
        }
        Some(PythonEngine::new(InterpreterConfig::default()))
    }

    fn test_case(id: &str, input: Value, expected: Value) -> TestCase {
        TestCase {
            id: json!(id),
            input,
            expected_output: expected,
            is_hidden: false,
            hint: None,
        }
    }

    fn lint(engine: &PythonEngine, code: &str) -> LintReport {
        let payload = Payload {
            code: code.to_string(),
            operation: Operation::Lint,
            tests: Vec::new(),
        };
        match execute(&payload, engine, NumericEquality::Strict).unwrap() {
            Report::Lint(report) => report,
            other => panic!("expected lint report, got {:?}", other),
        }
    }

    #[test]
    fn test_solution_with_positional_arguments() {
        let Some(engine) = python_engine() else {
            return;
        };
        let payload = Payload {
            code: "def solution(a, b): return a + b".to_string(),
            operation: Operation::Test,
            tests: vec![test_case("t1", json!([2, 3]), json!(5))],
        };

        let report = run_tests(&payload, &engine, NumericEquality::Strict);
        let result = &report.details[0];

        assert!(report.passed);
        assert_eq!(result.test_id, json!("t1"));
        assert!(result.passed);
        assert_eq!(result.stdout, "5");
        assert_eq!(result.stderr, "");
    }

    #[test]
    fn test_main_with_single_argument() {
        let Some(engine) = python_engine() else {
            return;
        };
        let code = concat!(
            "def main(data):\n",
            "    print('noise')\n",
            "    return {'total': sum(data['xs']), 'names': sorted(data['names'])}\n",
        );
        let input = json!({ "xs": [1, 2, 3], "names": ["b", "a"] });

        let invocation = engine.invoke(code, &[input]).unwrap();
        assert_eq!(invocation.value, json!({ "total": 6, "names": ["a", "b"] }));
    }

    #[test]
    fn test_solution_preferred_over_main() {
        let Some(engine) = python_engine() else {
            return;
        };
        let code = "def main(x): return 'main'\ndef solution(x): return 'solution'\n";

        let invocation = engine.invoke(code, &[json!(null)]).unwrap();
        assert_eq!(invocation.value, json!("solution"));
    }

    #[test]
    fn test_non_callable_solution_falls_through_to_main() {
        let Some(engine) = python_engine() else {
            return;
        };
        let code = "solution = 3\ndef main(x): return x * 2\n";

        let invocation = engine.invoke(code, &[json!(21)]).unwrap();
        assert_eq!(invocation.value, json!(42));
    }

    #[test]
    fn test_missing_entry_point() {
        let Some(engine) = python_engine() else {
            return;
        };
        let payload = Payload {
            code: "def helper(): return 1".to_string(),
            operation: Operation::Test,
            tests: vec![
                test_case("a", json!(1), json!(1)),
                test_case("b", json!([1, 2]), json!(3)),
            ],
        };

        let report = run_tests(&payload, &engine, NumericEquality::Strict);

        assert_eq!(report.summary.total, 2);
        assert_eq!(report.summary.passed_count, 0);
        for result in &report.details {
            assert!(!result.passed);
            assert_eq!(result.stdout, "");
            assert_eq!(result.stderr, NO_ENTRY_POINT_MESSAGE);
        }
    }

    #[test]
    fn test_runtime_error_is_captured() {
        let Some(engine) = python_engine() else {
            return;
        };
        let err = engine
            .invoke("def solution(x): return 1 / x", &[json!(0)])
            .unwrap_err();

        assert!(matches!(err, ExecError::Runtime { .. }));
        assert_eq!(err.to_string(), "division by zero");
    }

    #[test]
    fn test_empty_exception_message_uses_type_name() {
        let Some(engine) = python_engine() else {
            return;
        };
        let err = engine
            .invoke("def solution(): raise ValueError()", &[])
            .unwrap_err();
        assert_eq!(err.to_string(), "ValueError");
    }

    #[test]
    fn test_syntax_error_in_test_mode_fails_per_test() {
        let Some(engine) = python_engine() else {
            return;
        };
        let err = engine.invoke("def solution(:\n", &[json!(1)]).unwrap_err();
        assert!(matches!(err, ExecError::Runtime { .. }));
    }

    #[test]
    fn test_unserializable_result_fails() {
        let Some(engine) = python_engine() else {
            return;
        };
        let err = engine
            .invoke("def solution(): return {1, 2}", &[])
            .unwrap_err();
        assert!(err.to_string().contains("not JSON serializable"));
    }

    #[test]
    fn test_system_exit_is_captured() {
        let Some(engine) = python_engine() else {
            return;
        };
        let err = engine
            .invoke("import sys\ndef solution(): sys.exit(3)", &[])
            .unwrap_err();
        assert!(matches!(err, ExecError::Runtime { .. }));
    }

    #[test]
    fn test_hard_exit_reports_no_verdict() {
        let Some(engine) = python_engine() else {
            return;
        };
        let err = engine
            .invoke("import os\ndef solution(): os._exit(7)", &[])
            .unwrap_err();

        assert!(matches!(err, ExecError::NoVerdict { .. }));
        assert!(err.to_string().contains('7'));
    }

    #[test]
    fn test_float_result_is_strictly_distinct() {
        let Some(engine) = python_engine() else {
            return;
        };
        let payload = Payload {
            code: "def solution(x): return x / 2".to_string(),
            operation: Operation::Test,
            tests: vec![test_case("half", json!(10), json!(5))],
        };

        let strict = run_tests(&payload, &engine, NumericEquality::Strict);
        assert!(!strict.passed);
        assert_eq!(strict.details[0].stdout, "5.0");

        let lenient = run_tests(&payload, &engine, NumericEquality::Lenient);
        assert!(lenient.passed);
        assert_eq!(lenient.details[0].stdout, "5.0");
    }

    #[test]
    fn test_namespace_is_fresh_per_invocation() {
        let Some(engine) = python_engine() else {
            return;
        };
        let code = concat!(
            "import sys\n",
            "calls = []\n",
            "def solution(x):\n",
            "    calls.append(x)\n",
            "    sys.modules.setdefault('seen', []).append(x)\n",
            "    return [len(calls), len(sys.modules['seen'])]\n",
        );

        let first = engine.invoke(code, &[json!(1)]).unwrap();
        let second = engine.invoke(code, &[json!(2)]).unwrap();

        assert_eq!(first.value, json!([1, 1]));
        assert_eq!(second.value, json!([1, 1]));
    }

    #[test]
    fn test_lint_valid_code() {
        let Some(engine) = python_engine() else {
            return;
        };
        assert_eq!(
            lint(&engine, "print('hi')"),
            LintReport::Checked {
                passed: true,
                message: "Syntax valid".to_string(),
                output: "hi\n".to_string(),
            }
        );
    }

    #[test]
    fn test_lint_runs_as_main_script() {
        let Some(engine) = python_engine() else {
            return;
        };
        let report = lint(&engine, "if __name__ == '__main__':\n    print('script')\n");
        match report {
            LintReport::Checked { output, .. } => assert_eq!(output, "script\n"),
            other => panic!("unexpected report: {:?}", other),
        }
    }

    #[test]
    fn test_lint_syntax_error_location() {
        let Some(engine) = python_engine() else {
            return;
        };
        match lint(&engine, "x = (") {
            LintReport::SyntaxError {
                passed,
                error,
                location,
            } => {
                assert!(!passed);
                assert!(!error.is_empty());
                assert_eq!(location.line, Some(1));
                assert!(location.column.is_some());
            }
            other => panic!("unexpected report: {:?}", other),
        }
    }

    #[test]
    fn test_lint_runtime_error_still_passes() {
        let Some(engine) = python_engine() else {
            return;
        };
        match lint(&engine, "print('before')\n1 / 0\n") {
            LintReport::Checked {
                passed,
                message,
                output,
            } => {
                assert!(passed);
                assert_eq!(message, "Syntax valid (Runtime error: division by zero)");
                assert_eq!(output, "before\nRuntime Error: division by zero\n");
            }
            other => panic!("unexpected report: {:?}", other),
        }
    }

    #[test]
    fn test_lint_output_is_truncated() {
        let Some(engine) = python_engine() else {
            return;
        };
        match lint(&engine, "print('x' * 25000)") {
            LintReport::Checked { output, .. } => {
                assert_eq!(
                    output.chars().count(),
                    LINT_OUTPUT_CAP + TRUNCATION_MARKER.chars().count()
                );
                assert!(output.ends_with(TRUNCATION_MARKER));
            }
            other => panic!("unexpected report: {:?}", other),
        }
    }

    #[test]
    fn test_lint_hard_exit_after_parse() {
        let Some(engine) = python_engine() else {
            return;
        };
        match engine.smoke_run("import os\nos._exit(4)\n").unwrap() {
            SmokeRun::Ran {
                output,
                runtime_error,
            } => {
                assert_eq!(output, "");
                assert!(runtime_error.unwrap().contains('4'));
            }
            other => panic!("unexpected smoke run: {:?}", other),
        }
    }

    #[test]
    fn test_large_integer_result_keeps_every_digit() {
        let Some(engine) = python_engine() else {
            return;
        };
        let expected: Value = serde_json::from_str("1000000000000000000000000000000").unwrap();
        let payload = Payload {
            code: "def solution(): return 10**30 + 1".to_string(),
            operation: Operation::Test,
            tests: vec![test_case("big", json!([]), expected)],
        };

        let report = run_tests(&payload, &engine, NumericEquality::Strict);
        assert!(!report.passed);
        assert_eq!(report.details[0].stdout, "1000000000000000000000000000001");
    }

    #[test]
    fn test_large_integer_argument_arrives_as_int() {
        let Some(engine) = python_engine() else {
            return;
        };
        let arg: Value = serde_json::from_str("100000000000000000000000000001").unwrap();
        let code = "def solution(n): return [type(n).__name__, n - 1]";

        let invocation = engine.invoke(code, &[arg]).unwrap();
        let expected: Value =
            serde_json::from_str(r#"["int", 100000000000000000000000000000]"#).unwrap();
        assert_eq!(invocation.value, expected);
    }

    #[test]
    fn test_hidden_variables_do_not_reach_submitted_code() {
        let Some(engine) = python_engine() else {
            return;
        };
        std::env::set_var("CODEGRADE_TEST_SEALED_PAYLOAD", "sealed");
        let code = concat!(
            "import os\n",
            "def solution(): return os.environ.get('CODEGRADE_TEST_SEALED_PAYLOAD')",
        );

        let open = engine.invoke(code, &[]).unwrap();
        assert_eq!(open.value, json!("sealed"));

        let sealed = PythonEngine::new(InterpreterConfig::default())
            .hide_env("CODEGRADE_TEST_SEALED_PAYLOAD");
        let hidden = sealed.invoke(code, &[]).unwrap();
        assert_eq!(hidden.value, Value::Null);
    }

    #[test]
    fn test_lint_output_with_lone_surrogate_survives() {
        let Some(engine) = python_engine() else {
            return;
        };
        assert_eq!(
            lint(&engine, "print('\\ud800 done')"),
            LintReport::Checked {
                passed: true,
                message: "Syntax valid".to_string(),
                output: "? done\n".to_string(),
            }
        );
    }
}
