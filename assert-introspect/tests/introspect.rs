//! End-to-end tests: source text through the front end, the rewriter and
//! the interpreter, checking what a failing assertion prints.

use assert_introspect::interp::{self, Execution, Interpreter, Outcome, Value};
use assert_introspect::{rewrite_source, Config, RewriteError, TranslationUnit};

/// Four lines, so test code starts on line 5
const PRELUDE: &str = "#include <assert.h>\n#include <stdio.h>\n#include <stdlib.h>\n#include <string.h>\n";

fn rewritten(source: &str, color: bool) -> TranslationUnit {
    let mut config = Config::default();
    config.rewrite.color = color;
    let (unit, report) = rewrite_source("t.c", &format!("{PRELUDE}{source}"), &config).unwrap();
    assert!(report.is_clean(), "assertions left unchanged: {:?}", report.diagnostics);
    unit
}

fn run(source: &str, args: &[i128]) -> Execution {
    let unit = rewritten(source, false);
    let args: Vec<Value> = args.iter().map(|n| Value::Int(*n)).collect();
    interp::run(&unit, "test", &args).unwrap()
}

fn failure(source: &str, args: &[i128]) -> String {
    let execution = run(source, args);
    assert_eq!(execution.outcome, Outcome::Aborted, "stdout: {}", execution.stdout);
    assert_eq!(execution.stderr, "");
    execution.stdout
}

// ============================================
// Basic reports
// ============================================

#[test]
fn test_passing_assertion_prints_nothing() {
    let execution = run("void test(int n) {\n    assert(n == 5);\n}", &[5]);
    assert_eq!(execution.outcome, Outcome::Returned(Value::Void));
    assert_eq!(execution.stdout, "");
}

#[test]
fn test_sanity() {
    let out = failure("void test(int n) {\n    assert(n == 5);\n}", &[3]);
    insta::assert_snapshot!(out.trim_end(), @r###"
    In t.c:6, function 'test':
    > assert(n == 5)
    E assert(3 == 5)
    > subexpressions:
      n = 3
    "###);
}

#[test]
fn test_unary_not() {
    let out = failure("void test(int n) {\n    assert(!n);\n}", &[4]);
    assert!(out.contains("> assert(!n)\n"), "{out}");
    assert!(out.contains("E assert(!4)\n"), "{out}");
    assert!(out.contains("  n = 4\n"), "{out}");
}

#[test]
fn test_percent_survives_both_format_layers() {
    let out = failure("void test(int n) {\n    assert(n % 2 == 0);\n}", &[7]);
    assert!(out.contains("> assert(n % 2 == 0)\n"), "{out}");
    assert!(out.contains("E assert(7 % 2 == 0)\n"), "{out}");
}

// ============================================
// Short-circuit fidelity
// ============================================

#[test]
fn test_and_reports_right_side_only() {
    // n != 6 held, so only n == 12 decided the failure
    let out = failure("void test(int n) {\n    assert(n != 6 && n == 12);\n}", &[3]);
    insta::assert_snapshot!(out.trim_end(), @r###"
    In t.c:6, function 'test':
    > assert((n != 6) && (n == 12))
    E assert((...) && (3 == 12))
    > subexpressions:
      n = 3
    "###);
}

#[test]
fn test_and_with_failing_left_hides_right() {
    let out = failure("void test(int n, int m) {\n    assert(n > 10 && m > 0);\n}", &[3, 7]);
    assert!(out.contains("E assert(3 > 10)\n"), "{out}");
    assert!(out.contains("  n = 3\n"), "{out}");
    assert!(!out.contains("m = "), "{out}");
}

#[test]
fn test_or_reports_both_sides() {
    let out = failure("void test(int a, int b) {\n    assert(a == 1 || b == 2);\n}", &[5, 9]);
    insta::assert_snapshot!(out.trim_end(), @r###"
    In t.c:6, function 'test':
    > assert((a == 1) || (b == 2))
    E assert((5 == 1) || (9 == 2))
    > subexpressions:
      a = 5
      b = 9
    "###);
}

#[test]
fn test_right_operand_not_evaluated() {
    let source = "int side(int n) {\n    printf(\"side\\n\");\n    return n;\n}\nvoid test(int n) {\n    assert(n > 0 && side(n) > 0);\n}";
    let out = failure(source, &[0]);
    assert!(!out.contains("side"), "{out}");
    assert!(out.contains("E assert(0 > 0)\n"), "{out}");
}

#[test]
fn test_or_inside_comparison_hides_skipped_side() {
    let out = failure("void test(int n, int m) {\n    assert((n == 1 || m == 2) == 0);\n}", &[1, 2]);
    assert!(out.contains("> assert(((n == 1) || (m == 2)) == 0)\n"), "{out}");
    assert!(out.contains("E assert(((1 == 1) || (...)) == 0)\n"), "{out}");
    assert!(!out.contains("m = "), "{out}");
}

#[test]
fn test_eager_and_shows_both_sides() {
    let source = "void test(int n, int m) {\n    assert((n > 0) & (m > 0));\n}";
    let out = failure(source, &[0, 1]);
    assert!(out.contains("> assert((n > 0) && (m > 0))\n"), "{out}");
    assert!(out.contains("E assert((0 > 0) && (1 > 0))\n"), "{out}");
    assert!(out.contains("  n = 0\n  m = 1\n"), "{out}");

    let out = failure(source, &[1, 0]);
    assert!(out.contains("E assert((...) && (0 > 0))\n"), "{out}");
}

// ============================================
// Subexpression listing
// ============================================

#[test]
fn test_variable_listed_once() {
    let out = failure("void test(int n) {\n    assert(n == 1 || n == 2);\n}", &[3]);
    assert_eq!(out.matches("  n = 3\n").count(), 1, "{out}");
}

#[test]
fn test_listing_follows_the_path_taken() {
    let source = "void test(int n, int m) {\n    assert((n > 5 && m > 0) || n == 3);\n}";

    let out = failure(source, &[0, 1]);
    assert!(out.contains("> assert(((n > 5) && (m > 0)) || (n == 3))\n"), "{out}");
    assert!(out.contains("E assert((0 > 5) || (0 == 3))\n"), "{out}");
    assert!(out.ends_with("> subexpressions:\n  n = 0\n"), "{out}");

    let out = failure(source, &[6, 0]);
    assert!(out.contains("E assert(((...) && (0 > 0)) || (6 == 3))\n"), "{out}");
    assert!(out.ends_with("> subexpressions:\n  m = 0\n  n = 6\n"), "{out}");
}

// ============================================
// Calls
// ============================================

#[test]
fn test_call_repr() {
    let source = "int f(int n) {\n    return n * 3 + 1;\n}\nvoid test(int n) {\n    assert(f(n) > 100);\n}";
    let out = failure(source, &[2]);
    insta::assert_snapshot!(out.trim_end(), @r###"
    In t.c:9, function 'test':
    > assert(f(n) > 100)
    E assert(7 > 100)
    > subexpressions:
      n = 2
      f(n=2) = 7
    "###);
}

#[test]
fn test_variable_inside_arguments_listed() {
    let source = "int f(int m, int n) {\n    return m + n;\n}\nvoid test(int n) {\n    assert(f(12, n) == 5);\n}";
    let out = failure(source, &[20]);
    assert!(out.contains("E assert(32 == 5)\n"), "{out}");
    assert!(out.ends_with("> subexpressions:\n  n = 20\n  f(12, n=20) = 32\n"), "{out}");
}

#[test]
fn test_nested_call_repr() {
    let source = "int g(int n) {\n    return n + 1;\n}\nint f(int n) {\n    return n * 2;\n}\nvoid test(int n) {\n    assert(f(g(n)) == 1);\n}";
    let out = failure(source, &[2]);
    insta::assert_snapshot!(out.trim_end(), @r###"
    In t.c:12, function 'test':
    > assert(f(g(n)) == 1)
    E assert(6 == 1)
    > subexpressions:
      n = 2
      g(n=2) = 3
      f(g(n)=3) = 6
    "###);
}

#[test]
fn test_argument_variable_listed_once() {
    let source = "int f(int n) {\n    return n + 1;\n}\nvoid test(int n, int m) {\n    assert(n != 6 && f(m) % 5 == m);\n}";
    let out = failure(source, &[3, 2]);
    assert!(out.contains("E assert((...) && (3 % 5 == 2))\n"), "{out}");
    assert!(out.ends_with("> subexpressions:\n  m = 2\n  f(m=2) = 3\n"), "{out}");
}

#[test]
fn test_call_evaluated_once() {
    let source = "int calls = 0;\nint next(void) {\n    calls = calls + 1;\n    printf(\"tick\\n\");\n    return calls;\n}\nvoid test(void) {\n    assert(next() == 5);\n}";
    let out = failure(source, &[]);
    assert_eq!(out.matches("tick").count(), 1, "{out}");
    assert!(out.contains("E assert(1 == 5)\n"), "{out}");
    assert!(out.contains("  next() = 1\n"), "{out}");
}

#[test]
fn test_static_counter_evaluated_once() {
    let source = "int bump(void) {\n    static int count = 0;\n    count = count + 1;\n    return count;\n}\nvoid test(void) {\n    assert(bump() == 0 || bump() == 0);\n}";
    let out = failure(source, &[]);
    assert!(out.contains("E assert((1 == 0) || (2 == 0))\n"), "{out}");
    assert!(out.contains("  bump() = 1\n  bump() = 2\n"), "{out}");
}

#[test]
fn test_string_repr_and_null() {
    let unit = rewritten("void test(char *s) {\n    assert(strstr(s, \"x\") != NULL);\n}", false);
    let mut interp = Interpreter::new(&unit).unwrap();
    let s = interp.alloc_str("hello");
    assert_eq!(interp.call("test", &[s]).unwrap(), Outcome::Aborted);
    insta::assert_snapshot!(interp.stdout().trim_end(), @r###"
    In t.c:6, function 'test':
    > assert(strstr(s, "x") != NULL)
    E assert("(null)" != (nil))
    > subexpressions:
      s = "hello"
      strstr(s="hello", "x") = "(null)"
    "###);
}

#[test]
fn test_size_t_result() {
    let unit = rewritten("void test(char *s) {\n    assert(strlen(s) == 3);\n}", false);
    let mut interp = Interpreter::new(&unit).unwrap();
    let s = interp.alloc_str("hello");
    interp.call("test", &[s]).unwrap();
    let out = interp.stdout();
    assert!(out.contains("E assert(5 == 3)\n"), "{out}");
    assert!(out.contains("  strlen(s=\"hello\") = 5\n"), "{out}");
}

// ============================================
// Colors
// ============================================

#[test]
fn test_same_variable_same_color() {
    let unit = rewritten("void test(int n, int m) {\n    assert(n == 1 || m == n);\n}", true);
    let execution = interp::run(&unit, "test", &[Value::Int(3), Value::Int(4)]).unwrap();
    let out = execution.stdout;
    let n = "\x1b[32mn\x1b[0m";
    let m = "\x1b[33mm\x1b[0m";
    assert!(out.contains(&format!("> assert(({n} == 1) || ({m} == {n}))\n")), "{out:?}");
    assert!(
        out.contains("\x1b[1;31mE\x1b[0m assert((\x1b[32m3\x1b[0m == 1) || (\x1b[33m4\x1b[0m == \x1b[32m3\x1b[0m))\n"),
        "{out:?}"
    );
    assert!(out.contains(&format!("  {n} = 3\n  {m} = 4\n")), "{out:?}");
}

#[test]
fn test_plain_output_has_no_escapes() {
    let out = failure("void test(int n, int m) {\n    assert(n == m);\n}", &[1, 2]);
    assert!(!out.contains('\x1b'), "{out:?}");
}

// ============================================
// Skipped assertions
// ============================================

#[test]
fn test_unsupported_type_keeps_original_behavior() {
    let source = format!("{PRELUDE}void test(double d) {{\n    assert(d > 1.0);\n}}");
    let (unit, report) = rewrite_source("t.c", &source, &Config::default()).unwrap();
    assert_eq!(report.rewritten, 0);
    assert_eq!(report.diagnostics[0].error, RewriteError::UnsupportedType("double".into()));

    let execution = interp::run(&unit, "test", &[Value::Float(0.5)]).unwrap();
    assert_eq!(execution.outcome, Outcome::Aborted);
    assert_eq!(execution.stdout, "");
    assert_eq!(execution.stderr, "t: t.c:6: test: Assertion `d > 1.0' failed.\n");
}

#[test]
fn test_missing_terminate_keeps_original_behavior() {
    let source = "#include <assert.h>\n#include <stdio.h>\nvoid test(int n) {\n    assert(n == 5);\n}";
    let (unit, report) = rewrite_source("t.c", source, &Config::default()).unwrap();
    assert_eq!(report.diagnostics.len(), 1);
    let execution = interp::run(&unit, "test", &[Value::Int(3)]).unwrap();
    assert_eq!(execution.stderr, "t: t.c:4: test: Assertion `n == 5' failed.\n");
}

#[test]
fn test_function_filter_limits_rewriting() {
    let source = format!("{PRELUDE}void keep(int n) {{\n    assert(n);\n}}\nvoid test(int n) {{\n    assert(n);\n}}");
    let mut config = Config::default();
    config.rewrite.color = false;
    config.rewrite.functions = vec!["test".to_string()];
    let (unit, report) = rewrite_source("t.c", &source, &config).unwrap();
    assert_eq!(report.rewritten, 1);

    let kept = interp::run(&unit, "keep", &[Value::Int(0)]).unwrap();
    assert!(kept.stderr.contains("Assertion `n' failed."));
    let rewritten = interp::run(&unit, "test", &[Value::Int(0)]).unwrap();
    assert!(rewritten.stdout.contains("E assert(0)\n"), "{}", rewritten.stdout);
}

#[test]
fn test_small_buffer_truncates_report() {
    let source = format!("{PRELUDE}void test(int n) {{\n    assert(n == 123456789);\n}}");
    let mut config = Config::default();
    config.rewrite.color = false;
    config.rewrite.buffer_size = 16;
    let (unit, _) = rewrite_source("t.c", &source, &config).unwrap();
    let execution = interp::run(&unit, "test", &[Value::Int(1)]).unwrap();
    assert_eq!(execution.outcome, Outcome::Aborted);
    // 15 characters and the terminator
    assert!(execution.stdout.contains("E assert(1 == 123\n"), "{}", execution.stdout);
}
