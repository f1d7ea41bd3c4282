//! Lint collection: the source as a temp file, and flake8 diagnostics turned
//! into plain messages.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::EngineError;
use crate::tool::{ToolCommand, ToolOutcome};

/// Source text written to a uniquely named temp file. Removed on drop.
#[derive(Debug)]
pub struct SourceArtifact {
  file: NamedTempFile,
}

impl SourceArtifact {
  pub fn materialize(source: &str, suffix: &str) -> Result<Self, EngineError> {
    let mut file = tempfile::Builder::new()
      .prefix("analysis_")
      .suffix(suffix)
      .tempfile()?;
    file.write_all(source.as_bytes())?;
    file.flush()?;
    Ok(Self { file })
  }

  pub fn path(&self) -> &Path {
    self.file.path()
  }
}

/// Partial result of the lint stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LintReport {
  /// Diagnostic messages in tool order, without `path:line:col:` prefixes.
  pub comments: Vec<String>,
}

impl LintReport {
  /// The single synthetic comment for a linter that could not run.
  pub fn failed(reason: &str) -> Self {
    Self {
      comments: vec![format!("Static analysis failed: {}", reason)],
    }
  }

  /// Number of F821 (undefined name) diagnostics.
  pub fn undefined_names(&self) -> usize {
    self.comments.iter().filter(|c| c.contains("F821")).count()
  }
}

/// A line-oriented static-analysis tool.
pub trait Linter: Send + Sync {
  fn lint(&self, path: &Path) -> LintReport;
}

/// `python -m flake8 --format=default <path>`.
#[derive(Debug, Clone)]
pub struct Flake8Linter {
  command: ToolCommand,
}

impl Flake8Linter {
  pub fn new(config: &Config) -> Self {
    Self::with_command(ToolCommand::new(
      "flake8",
      &config.python,
      &["-m", "flake8", "--format=default"],
      config.tool_timeout,
    ))
  }

  pub fn with_command(command: ToolCommand) -> Self {
    Self { command }
  }
}

impl Linter for Flake8Linter {
  fn lint(&self, path: &Path) -> LintReport {
    match self.command.run(path) {
      ToolOutcome::Finished {
        stdout,
        stderr,
        code,
      } => {
        if stdout.trim().is_empty() && code != Some(0) && !stderr.trim().is_empty() {
          warn!(code = ?code, "flake8 exited without diagnostics");
          return LintReport::failed(first_line(&stderr));
        }
        let comments = parse_diagnostics(&stdout);
        debug!(count = comments.len(), "lint stage done");
        LintReport { comments }
      }
      other => LintReport::failed(
        &other
          .failure_reason(&self.command.name)
          .unwrap_or_else(|| "unknown error".to_string()),
      ),
    }
  }
}

/// `<path>:<line>:<col>: <message>` lines → `<message>`; anything else is skipped.
pub fn parse_diagnostics(stdout: &str) -> Vec<String> {
  stdout
    .lines()
    .filter_map(|line| {
      let mut parts = line.splitn(4, ':');
      let (_path, _line, _col) = (parts.next()?, parts.next()?, parts.next()?);
      parts.next().map(|msg| msg.trim().to_string())
    })
    .collect()
}

fn first_line(text: &str) -> &str {
  text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("")
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  #[test]
  fn parses_messages_in_order() {
    let out = "/tmp/f.py:1:1: E123 error\n/tmp/f.py:2:1: W234 warning\n";
    assert_eq!(parse_diagnostics(out), vec!["E123 error", "W234 warning"]);
  }

  #[test]
  fn message_keeps_its_own_colons() {
    let out = "/tmp/f.py:3:5: F821 undefined name 'x': see docs\n";
    assert_eq!(parse_diagnostics(out), vec!["F821 undefined name 'x': see docs"]);
  }

  #[test]
  fn malformed_lines_are_skipped() {
    assert!(parse_diagnostics("no colons here\nonly:two\n").is_empty());
  }

  #[test]
  fn counts_undefined_names() {
    let report = LintReport {
      comments: vec![
        "F821 undefined name 'a'".into(),
        "E302 expected 2 blank lines".into(),
        "F821 undefined name 'b'".into(),
      ],
    };
    assert_eq!(report.undefined_names(), 2);
  }

  #[test]
  fn artifact_is_removed_on_drop() {
    let artifact = SourceArtifact::materialize("x = 1\n", ".py").unwrap();
    let path = artifact.path().to_path_buf();
    assert!(path.exists());
    assert!(path.extension().is_some_and(|e| e == "py"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "x = 1\n");
    drop(artifact);
    assert!(!path.exists());
  }

  #[test]
  fn missing_linter_yields_one_synthetic_comment() {
    let linter = Flake8Linter::with_command(ToolCommand::new(
      "flake8",
      "no-such-python-9191",
      &["-m", "flake8"],
      Duration::from_secs(1),
    ));
    let artifact = SourceArtifact::materialize("x = 1\n", ".py").unwrap();
    let report = linter.lint(artifact.path());
    assert_eq!(report.comments.len(), 1);
    assert!(report.comments[0].starts_with("Static analysis failed:"));
  }

  #[cfg(unix)]
  #[test]
  fn slow_linter_becomes_a_failure_comment() {
    let linter = Flake8Linter::with_command(ToolCommand::new(
      "flake8",
      "sh",
      &["-c", "sleep 5"],
      Duration::from_millis(200),
    ));
    let artifact = SourceArtifact::materialize("x = 1\n", ".py").unwrap();
    let report = linter.lint(artifact.path());
    assert_eq!(
      report.comments,
      vec!["Static analysis failed: flake8 timed out after 0.2s"]
    );
  }

  #[cfg(unix)]
  #[test]
  fn reads_diagnostics_from_tool_stdout() {
    // `cat` echoes the file, which here already looks like flake8 output.
    let linter =
      Flake8Linter::with_command(ToolCommand::new("flake8", "cat", &[], Duration::from_secs(5)));
    let artifact = SourceArtifact::materialize("a.py:1:1: E111 indentation\n", ".py").unwrap();
    let report = linter.lint(artifact.path());
    assert_eq!(report.comments, vec!["E111 indentation"]);
  }

  #[cfg(unix)]
  #[test]
  fn stderr_only_failure_is_reported() {
    let linter = Flake8Linter::with_command(ToolCommand::new(
      "flake8",
      "sh",
      &["-c", "echo 'No module named flake8' >&2; exit 1"],
      Duration::from_secs(5),
    ));
    let artifact = SourceArtifact::materialize("x = 1\n", ".py").unwrap();
    let report = linter.lint(artifact.path());
    assert_eq!(
      report.comments,
      vec!["Static analysis failed: No module named flake8"]
    );
  }
}
