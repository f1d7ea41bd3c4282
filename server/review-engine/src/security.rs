//! Security scanning: run bandit over the materialized source and turn its
//! severity-tagged findings into scored flags.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::tool::{ToolCommand, ToolOutcome};

/// Partial result of the security stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityReport {
  pub risk: u32,
  pub flags: Vec<String>,
}

impl SecurityReport {
  /// Zero-risk report carrying one informational flag.
  pub fn failed(reason: &str) -> Self {
    Self {
      risk: 0,
      flags: vec![format!("Security analysis failed: {}", reason)],
    }
  }
}

/// A security scanner that reports severity-tagged findings for one file.
pub trait SecurityScanner: Send + Sync {
  fn scan(&self, path: &Path) -> SecurityReport;
}

/// bandit's JSON report; only the fields we score are read.
#[derive(Debug, Deserialize)]
pub struct BanditReport {
  #[serde(default)]
  pub results: Vec<BanditIssue>,
}

#[derive(Debug, Deserialize)]
pub struct BanditIssue {
  pub issue_severity: String,
  pub issue_text: String,
}

/// Per-severity risk weights.
#[derive(Debug, Clone, Copy)]
pub struct SeverityWeights {
  pub high: u32,
  pub medium: u32,
  pub other: u32,
}

impl SeverityWeights {
  pub fn from_config(config: &Config) -> Self {
    Self {
      high: config.high_severity_risk,
      medium: config.medium_severity_risk,
      other: config.unknown_severity_risk,
    }
  }

  pub fn weight(&self, severity: &str) -> u32 {
    if severity.eq_ignore_ascii_case("HIGH") {
      self.high
    } else if severity.eq_ignore_ascii_case("MEDIUM") {
      self.medium
    } else {
      self.other
    }
  }
}

/// `python -m bandit -f json -ll <path>` (medium severity and above).
#[derive(Debug, Clone)]
pub struct BanditScanner {
  command: ToolCommand,
  weights: SeverityWeights,
}

impl BanditScanner {
  pub fn new(config: &Config) -> Self {
    Self::with_command(
      ToolCommand::new(
        "bandit",
        &config.python,
        &["-m", "bandit", "-f", "json", "-ll"],
        config.tool_timeout,
      ),
      SeverityWeights::from_config(config),
    )
  }

  pub fn with_command(command: ToolCommand, weights: SeverityWeights) -> Self {
    Self { command, weights }
  }
}

impl SecurityScanner for BanditScanner {
  fn scan(&self, path: &Path) -> SecurityReport {
    match self.command.run(path) {
      ToolOutcome::Finished { stdout, stderr, .. } => {
        interpret_output(&stdout, &stderr, &self.weights)
      }
      other => SecurityReport::failed(
        &other
          .failure_reason(&self.command.name)
          .unwrap_or_else(|| "unknown error".to_string()),
      ),
    }
  }
}

/// Score a finished bandit run. Exit status is ignored: bandit exits 1 on findings.
pub fn interpret_output(stdout: &str, stderr: &str, weights: &SeverityWeights) -> SecurityReport {
  if stdout.trim().is_empty() {
    let stderr = stderr.trim();
    if stderr.is_empty() {
      return SecurityReport::default();
    }
    warn!("security scanner wrote only to stderr");
    return SecurityReport {
      risk: 0,
      flags: vec![format!("Security analysis error: {}", stderr)],
    };
  }

  match serde_json::from_str::<BanditReport>(stdout) {
    Ok(report) => {
      let report = score_issues(&report.results, weights);
      debug!(risk = report.risk, findings = report.flags.len(), "security stage done");
      report
    }
    Err(e) => {
      warn!(error = %e, "unparseable security scanner output");
      SecurityReport::failed(&format!("unreadable report: {}", e))
    }
  }
}

/// `Security (<SEVERITY>): <text>` per issue, in report order.
pub fn score_issues(issues: &[BanditIssue], weights: &SeverityWeights) -> SecurityReport {
  let mut report = SecurityReport::default();
  for issue in issues {
    report.risk = report.risk.saturating_add(weights.weight(&issue.issue_severity));
    report.flags.push(format!(
      "Security ({}): {}",
      issue.issue_severity, issue.issue_text
    ));
  }
  report
}
