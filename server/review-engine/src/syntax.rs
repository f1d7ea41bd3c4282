//! Syntax-tree inspection: parse failures, division by a literal zero, and
//! unconditional loops that never exit.
//!
//! Whether the source parses at all is decided by the Python interpreter
//! (`ast.parse`). tree-sitter only decides when the interpreter cannot run.

use std::borrow::Cow;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};
use tree_sitter::{Node, Parser};

use crate::config::Config;
use crate::error::EngineError;
use crate::tool::{ToolCommand, ToolOutcome};

pub const DIVISION_BY_ZERO_FLAG: &str = "Logic: Division by Zero detected";
pub const INFINITE_LOOP_FLAG: &str = "Logic: Potential infinite loop (while True without break)";

const DIVISION_BY_ZERO_HINT: &str = "Ensure the denominator is not zero.";
const INFINITE_LOOP_HINT: &str =
  "Add a `break` statement inside the loop or use a condition variable.";
const NUMBER_LITERAL_HINT: &str = "You are trying to call a method on a number literal. \
  Use parenthesis: `(5).upper()` or quotes: `'5'.upper()`.";

/// Parses the file named by `argv[1]` and prints `{"error": <message or null>}`.
const COMPILE_SCRIPT: &str = r#"
import ast, json, sys
try:
    ast.parse(open(sys.argv[1], 'rb').read())
    err = None
except SyntaxError as e:
    err = 'SyntaxError: %s at line %s' % (e.msg, e.lineno)
except Exception as e:
    err = 'Parse Error: %s' % (e,)
print(json.dumps({'error': err}))
"#;

/// Partial result of the syntax stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyntaxReport {
  pub risk: u32,
  pub flags: Vec<String>,
  /// Set when the source does not parse; the pipeline stops here.
  pub fatal_error: Option<String>,
  pub suggestions: Vec<String>,
}

/// The interpreter's answer for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
  Parses,
  /// Carries the fatal message, e.g. `SyntaxError: invalid syntax at line 3`.
  Rejected(String),
}

#[derive(Debug, Deserialize)]
struct CompileOutput {
  error: Option<String>,
}

/// `python -c <script> <path>`: asks CPython whether the file parses.
#[derive(Debug, Clone)]
pub struct CompileCheck {
  command: ToolCommand,
}

impl CompileCheck {
  pub fn new(config: &Config) -> Self {
    Self::with_command(ToolCommand::new(
      "python",
      &config.python,
      &["-c", COMPILE_SCRIPT],
      config.tool_timeout,
    ))
  }

  pub fn with_command(command: ToolCommand) -> Self {
    Self { command }
  }

  /// `None` when the interpreter did not give a usable answer.
  pub fn check(&self, path: &Path) -> Option<Verdict> {
    match self.command.run(path) {
      ToolOutcome::Finished { stdout, stderr, .. } => {
        let verdict = read_verdict(&stdout);
        if verdict.is_none() {
          warn!(stderr = %stderr.trim(), "interpreter gave no parse verdict");
        }
        verdict
      }
      other => {
        warn!(
          reason = ?other.failure_reason(&self.command.name),
          "interpreter unavailable, falling back to tree-sitter"
        );
        None
      }
    }
  }
}

/// The last JSON line the compile script printed.
fn read_verdict(stdout: &str) -> Option<Verdict> {
  let line = stdout.lines().rev().find(|l| !l.trim().is_empty())?;
  let output: CompileOutput = serde_json::from_str(line.trim()).ok()?;
  Some(match output.error {
    Some(message) => Verdict::Rejected(message),
    None => Verdict::Parses,
  })
}

/// Parse Python source and walk every node for known logic hazards.
///
/// `verdict` is the interpreter's answer; with `None`, tree-sitter's own
/// error nodes decide whether the source parses.
pub fn inspect(
  source: &str,
  verdict: Option<Verdict>,
  config: &Config,
) -> Result<SyntaxReport, EngineError> {
  let decided = match verdict {
    Some(Verdict::Rejected(message)) => return Ok(fatal(message, source)),
    Some(Verdict::Parses) => true,
    None => false,
  };

  let source = normalize_newlines(source);
  let mut parser = Parser::new();
  parser.set_language(&tree_sitter_python::LANGUAGE.into())?;
  let tree = parser
    .parse(source.as_bytes(), None)
    .ok_or_else(|| EngineError::parse("python parser produced no tree"))?;
  let root = tree.root_node();

  if !decided && root.has_error() {
    return Ok(fatal(syntax_error_message(root), &source));
  }

  let bytes = source.as_bytes();
  let mut report = SyntaxReport::default();
  for node in preorder(root) {
    match node.kind() {
      "binary_operator" if divides_by_literal_zero(node, bytes) => {
        report.risk = report.risk.saturating_add(config.division_by_zero_risk);
        report.flags.push(DIVISION_BY_ZERO_FLAG.to_string());
        report.suggestions.push(DIVISION_BY_ZERO_HINT.to_string());
      }
      "while_statement" if loops_without_exit(node, bytes) => {
        report.risk = report.risk.saturating_add(config.infinite_loop_risk);
        report.flags.push(INFINITE_LOOP_FLAG.to_string());
        report.suggestions.push(INFINITE_LOOP_HINT.to_string());
      }
      _ => {}
    }
  }
  debug!(risk = report.risk, flags = report.flags.len(), "syntax stage done");
  Ok(report)
}

fn fatal(message: String, source: &str) -> SyntaxReport {
  debug!(%message, "source failed to parse");
  let suggestions = number_literal_hint(&message, source)
    .map(|hint| vec![hint.to_string()])
    .unwrap_or_default();
  SyntaxReport {
    risk: 100,
    flags: Vec::new(),
    fatal_error: Some(message),
    suggestions,
  }
}

/// `\r\n` and lone `\r` become `\n`; tree-sitter only knows `\n` as a line end.
fn normalize_newlines(source: &str) -> Cow<'_, str> {
  if source.contains('\r') {
    Cow::Owned(source.replace("\r\n", "\n").replace('\r', "\n"))
  } else {
    Cow::Borrowed(source)
  }
}

/// Message for the first ERROR or MISSING node in document order.
fn syntax_error_message(root: Node<'_>) -> String {
  let culprit = preorder(root)
    .into_iter()
    .find(|n| n.is_error() || n.is_missing());
  match culprit {
    Some(node) if node.is_missing() => format!(
      "SyntaxError: invalid syntax (expected '{}') at line {}",
      node.kind(),
      node.start_position().row + 1
    ),
    Some(node) => format!(
      "SyntaxError: invalid syntax at line {}",
      node.start_position().row + 1
    ),
    None => format!(
      "SyntaxError: invalid syntax at line {}",
      root.start_position().row + 1
    ),
  }
}

/// `5.upper()` style mistakes: a method call on a bare number literal.
pub fn number_literal_hint(message: &str, source: &str) -> Option<&'static str> {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  if !(message.contains("invalid syntax") || message.contains("invalid decimal literal")) {
    return None;
  }
  let re = PATTERN.get_or_init(|| Regex::new(r"\b\d+\.(upper|lower)\(").expect("valid regex"));
  re.is_match(source).then_some(NUMBER_LITERAL_HINT)
}

fn divides_by_literal_zero(node: Node<'_>, source: &[u8]) -> bool {
  let is_true_division = node
    .child_by_field_name("operator")
    .is_some_and(|op| op.kind() == "/");
  if !is_true_division {
    return false;
  }
  node
    .child_by_field_name("right")
    .map(unparenthesized)
    .and_then(|right| literal_value(right, source))
    .is_some_and(|v| v == 0.0)
}

/// `while True:` (or `while 1:`) whose subtree has no break, return or raise.
fn loops_without_exit(node: Node<'_>, source: &[u8]) -> bool {
  let Some(condition) = node.child_by_field_name("condition").map(unparenthesized) else {
    return false;
  };
  if !literal_value(condition, source).is_some_and(|v| v == 1.0) {
    return false;
  }
  !preorder(node).into_iter().any(|n| {
    matches!(
      n.kind(),
      "break_statement" | "return_statement" | "raise_statement"
    )
  })
}

fn unparenthesized(mut node: Node<'_>) -> Node<'_> {
  while node.kind() == "parenthesized_expression" {
    let mut cursor = node.walk();
    let inner = node
      .named_children(&mut cursor)
      .find(|c| c.kind() != "comment");
    match inner {
      Some(inner) => node = inner,
      None => break,
    }
  }
  node
}

/// Numeric value of a literal: `True`/`False` are 1 and 0; integers and floats
/// ignore `_` separators and `j`/`l` suffixes.
fn literal_value(node: Node<'_>, source: &[u8]) -> Option<f64> {
  match node.kind() {
    "true" => return Some(1.0),
    "false" => return Some(0.0),
    "integer" | "float" => {}
    _ => return None,
  }
  let text = node.utf8_text(source).ok()?;
  let cleaned: String = text
    .chars()
    .filter(|c| *c != '_')
    .collect::<String>()
    .to_ascii_lowercase();
  let cleaned = cleaned.trim_end_matches(|c: char| c == 'j' || c == 'l');

  let radix = [("0x", 16), ("0o", 8), ("0b", 2)]
    .into_iter()
    .find_map(|(prefix, radix)| cleaned.strip_prefix(prefix).map(|digits| (digits, radix)));
  match radix {
    Some((digits, radix)) => u128::from_str_radix(digits, radix).ok().map(|v| v as f64),
    None => cleaned.parse::<f64>().ok(),
  }
}

/// Every node of the subtree rooted at `root`, parents before children.
fn preorder(root: Node<'_>) -> Vec<Node<'_>> {
  let mut out = Vec::new();
  let mut stack = vec![root];
  while let Some(node) = stack.pop() {
    out.push(node);
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    stack.extend(children.into_iter().rev());
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::lint::SourceArtifact;
  use std::time::Duration;

  /// tree-sitter alone, as when no interpreter is available.
  fn run(source: &str) -> SyntaxReport {
    inspect(source, None, &Config::default()).unwrap()
  }

  /// Ask the configured interpreter; `None` if it is not installed here.
  fn interpreter_verdict(source: &str) -> Option<Verdict> {
    let artifact = SourceArtifact::materialize(source, ".py").unwrap();
    CompileCheck::new(&Config::default()).check(artifact.path())
  }

  #[test]
  fn clean_source_has_no_findings() {
    let report = run("def add(a, b):\n    return a / b\n\nprint(add(4, 2))\n");
    assert_eq!(report, SyntaxReport::default());
  }

  #[test]
  fn unclosed_call_is_fatal() {
    let report = run("print(\"hello\"\n");
    let message = report.fatal_error.expect("should fail to parse");
    assert!(message.starts_with("SyntaxError: invalid syntax"));
    assert!(message.contains("at line"));
    assert_eq!(report.risk, 100);
    assert!(report.flags.is_empty());
  }

  #[test]
  fn broken_def_reports_line_number() {
    let report = run("x = 1\ny = 2\ndef broken(:\n    pass\n");
    let message = report.fatal_error.unwrap();
    assert!(message.contains("line"), "{}", message);
  }

  #[test]
  fn interpreter_rejects_what_tree_sitter_tolerates() {
    let cases = [
      "def f():\nreturn 1\n",
      "if x:\npass\n",
      "  x = 1\n",
      "x := 1\n",
      "def f(**a, b): pass\n",
      "print \"hello\"\n",
      "exec \"code\"\n",
    ];
    for src in cases {
      let Some(verdict) = interpreter_verdict(src) else {
        eprintln!("python interpreter not available, skipping");
        return;
      };
      let report = inspect(src, Some(verdict), &Config::default()).unwrap();
      let message = report
        .fatal_error
        .unwrap_or_else(|| panic!("{:?} should not parse", src));
      assert!(message.starts_with("SyntaxError: "), "{}", message);
      assert!(message.contains(" at line "), "{}", message);
      assert_eq!(report.risk, 100);
      assert!(report.flags.is_empty());
    }
  }

  #[test]
  fn indentation_error_names_the_offending_line() {
    let Some(verdict) = interpreter_verdict("def f():\nreturn 1\n") else {
      return;
    };
    match verdict {
      Verdict::Rejected(message) => assert!(message.ends_with("at line 2"), "{}", message),
      Verdict::Parses => panic!("missing indentation should not parse"),
    }
  }

  #[test]
  fn interpreter_accepts_valid_source() {
    let Some(verdict) = interpreter_verdict("def f(x):\n    return x / 0\n") else {
      return;
    };
    assert_eq!(verdict, Verdict::Parses);
    let report = inspect("def f(x):\n    return x / 0\n", Some(verdict), &Config::default());
    assert_eq!(report.unwrap().flags, vec![DIVISION_BY_ZERO_FLAG.to_string()]);
  }

  #[test]
  fn rejection_message_is_used_verbatim() {
    let verdict = Verdict::Rejected("SyntaxError: unexpected indent at line 1".into());
    let report = inspect("  x = 1\n", Some(verdict), &Config::default()).unwrap();
    assert_eq!(
      report.fatal_error.as_deref(),
      Some("SyntaxError: unexpected indent at line 1")
    );
    assert_eq!(report.risk, 100);
  }

  #[test]
  fn parsed_verdict_runs_the_walk() {
    let report = inspect("x = 1 / 0\n", Some(Verdict::Parses), &Config::default()).unwrap();
    assert!(report.fatal_error.is_none());
    assert_eq!(report.risk, 50);
  }

  #[test]
  fn reads_the_last_json_line() {
    assert_eq!(read_verdict("{\"error\": null}\n"), Some(Verdict::Parses));
    assert_eq!(
      read_verdict("noise\n{\"error\": \"SyntaxError: invalid syntax at line 4\"}\n\n"),
      Some(Verdict::Rejected("SyntaxError: invalid syntax at line 4".into()))
    );
    assert_eq!(read_verdict(""), None);
    assert_eq!(read_verdict("Traceback (most recent call last):"), None);
  }

  #[test]
  fn missing_interpreter_defers_to_tree_sitter() {
    let check = CompileCheck::with_command(ToolCommand::new(
      "python",
      "no-such-python-9191",
      &["-c", COMPILE_SCRIPT],
      Duration::from_secs(1),
    ));
    let artifact = SourceArtifact::materialize("def f(:\n", ".py").unwrap();
    assert_eq!(check.check(artifact.path()), None);
    assert!(run("def f(:\n").fatal_error.is_some());
  }

  #[cfg(unix)]
  #[test]
  fn verdict_comes_from_interpreter_stdout() {
    let check = CompileCheck::with_command(ToolCommand::new(
      "python",
      "sh",
      &["-c", r#"echo '{"error": "SyntaxError: expected an indented block at line 2"}'"#],
      Duration::from_secs(5),
    ));
    let artifact = SourceArtifact::materialize("def f():\nreturn 1\n", ".py").unwrap();
    assert_eq!(
      check.check(artifact.path()),
      Some(Verdict::Rejected(
        "SyntaxError: expected an indented block at line 2".into()
      ))
    );
  }

  #[test]
  fn carriage_return_line_endings_parse() {
    let report = run("x = 1\ry = x / 0\r");
    assert!(report.fatal_error.is_none());
    assert_eq!(report.flags, vec![DIVISION_BY_ZERO_FLAG.to_string()]);
    assert!(run("while True:\r\n    pass\r\n").fatal_error.is_none());
  }

  #[test]
  fn division_by_zero_literal() {
    let report = run("def f(x):\n    return x / 0\n");
    assert_eq!(report.risk, 50);
    assert_eq!(report.flags, vec![DIVISION_BY_ZERO_FLAG.to_string()]);
    assert_eq!(report.suggestions, vec![DIVISION_BY_ZERO_HINT.to_string()]);
  }

  #[test]
  fn zero_spellings_and_parentheses_count() {
    for src in ["a = 1 / 0.0\n", "a = 1 / (0)\n", "a = 1 / 0x0\n", "a = 1 / 0_0\n"] {
      assert_eq!(run(src).risk, 50, "{}", src);
    }
  }

  #[test]
  fn division_by_false_is_division_by_zero() {
    assert_eq!(run("a = 1 / False\n").risk, 50);
    assert_eq!(run("a = 1 / True\n").risk, 0);
  }

  #[test]
  fn risk_saturates_instead_of_overflowing() {
    let config = Config {
      division_by_zero_risk: u32::MAX,
      ..Config::default()
    };
    let report = inspect("a = 1 / 0\nb = 2 / 0\n", None, &config).unwrap();
    assert_eq!(report.risk, u32::MAX);
    assert_eq!(report.flags.len(), 2);
  }

  #[test]
  fn floor_division_and_nonzero_are_ignored() {
    assert_eq!(run("a = 1 // 0\n").risk, 0);
    assert_eq!(run("a = 1 / 10\n").risk, 0);
    assert_eq!(run("a = 1 / b\n").risk, 0);
  }

  #[test]
  fn every_division_by_zero_is_counted() {
    let report = run("a = 1 / 0\nb = 2 / 0\n");
    assert_eq!(report.risk, 100);
    assert_eq!(report.flags.len(), 2);
  }

  #[test]
  fn while_true_without_break() {
    let report = run("items = []\nwhile True:\n    items.append(1)\n");
    assert_eq!(report.risk, 30);
    assert_eq!(report.flags, vec![INFINITE_LOOP_FLAG.to_string()]);
  }

  #[test]
  fn while_one_is_unconditional_too() {
    assert_eq!(run("while 1:\n    pass\n").risk, 30);
    assert_eq!(run("while (True):\n    pass\n").risk, 30);
  }

  #[test]
  fn loop_exits_suppress_the_flag() {
    assert_eq!(run("while True:\n    if ready():\n        break\n").risk, 0);
    assert_eq!(run("def f():\n    while True:\n        return 1\n").risk, 0);
    assert_eq!(run("while True:\n    raise StopIteration\n").risk, 0);
  }

  #[test]
  fn conditional_loop_is_ignored() {
    assert_eq!(run("while running:\n    step()\n").risk, 0);
  }

  #[test]
  fn number_literal_hint_needs_invalid_syntax_and_pattern() {
    let msg = "SyntaxError: invalid syntax at line 1";
    assert!(number_literal_hint(msg, "x = 5.upper()").is_some());
    assert!(number_literal_hint(msg, "x = 12.lower()").is_some());
    assert!(number_literal_hint(msg, "x = '5'.upper()").is_none());
    let decimal = "SyntaxError: invalid decimal literal at line 1";
    assert!(number_literal_hint(decimal, "x = 5.upper()").is_some());
    assert!(number_literal_hint("SyntaxError: something else", "x = 5.upper()").is_none());
  }

  #[test]
  fn numeric_literal_method_call_gets_hint() {
    let report = run("value = 5.upper()\n");
    assert!(report.fatal_error.is_some());
    assert_eq!(report.suggestions, vec![NUMBER_LITERAL_HINT.to_string()]);
  }
}
