//! Engine configuration: every weight and threshold is a named value here.

use std::time::Duration;

use crate::error::EngineError;

/// How the syntax-tree contribution joins the security + heuristic total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskCombine {
  /// `ast + security + heuristics`.
  Sum,
  /// `max(ast, security + heuristics)`.
  Max,
}

/// Flag wording and keyword set for the heuristic overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeuristicWording {
  /// "Manual detection of eval/exec", matches `password` and `secret`.
  Extended,
  /// "Use of eval/exec detected", matches `password` only.
  Minimal,
}

/// Tunable weights, thresholds and tool settings.
#[derive(Debug, Clone)]
pub struct Config {
  /// Interpreter used to run `-m flake8` and `-m bandit`.
  pub python: String,
  /// Upper bound on each external tool run.
  pub tool_timeout: Duration,
  /// Risk for a division by a literal zero.
  pub division_by_zero_risk: u32,
  /// Risk for an unconditional loop with no exit.
  pub infinite_loop_risk: u32,
  /// Risk per HIGH security finding.
  pub high_severity_risk: u32,
  /// Risk per MEDIUM security finding.
  pub medium_severity_risk: u32,
  /// Risk per finding of any other severity (flag is always kept).
  pub unknown_severity_risk: u32,
  /// Risk for an eval/exec call not already reported by the scanner.
  pub eval_risk: u32,
  /// Risk for a password/secret keyword not already reported by the scanner.
  pub secret_risk: u32,
  pub heuristic_wording: HeuristicWording,
  /// Line count above which a change set is "large". `None` disables the rule.
  pub large_change_lines: Option<usize>,
  pub large_change_risk: u32,
  /// Risk per F821 (undefined name) lint diagnostic. `None` disables the rule.
  pub undefined_name_risk: Option<u32>,
  pub risk_combine: RiskCombine,
  /// Quality penalty per risk point.
  pub quality_risk_weight: u32,
  /// Quality penalty per lint diagnostic.
  pub quality_lint_weight: u32,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      python: "python3".to_string(),
      tool_timeout: Duration::from_secs(10),
      division_by_zero_risk: 50,
      infinite_loop_risk: 30,
      high_severity_risk: 30,
      medium_severity_risk: 15,
      unknown_severity_risk: 0,
      eval_risk: 50,
      secret_risk: 30,
      heuristic_wording: HeuristicWording::Extended,
      large_change_lines: Some(100),
      large_change_risk: 10,
      undefined_name_risk: None,
      risk_combine: RiskCombine::Sum,
      quality_risk_weight: 2,
      quality_lint_weight: 5,
    }
  }
}

impl Config {
  /// Defaults overlaid with `REVIEW_*` environment variables.
  pub fn from_env() -> Result<Self, EngineError> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Same as [`Config::from_env`] with an injectable variable source.
  pub fn from_lookup<F>(lookup: F) -> Result<Self, EngineError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let mut config = Self::default();

    if let Some(python) = lookup("REVIEW_PYTHON") {
      if python.trim().is_empty() {
        return Err(EngineError::config("REVIEW_PYTHON", "must not be empty"));
      }
      config.python = python.trim().to_string();
    }
    if let Some(secs) = lookup("REVIEW_TOOL_TIMEOUT_SECS") {
      let secs = parse_u32("REVIEW_TOOL_TIMEOUT_SECS", &secs)?;
      if secs == 0 {
        return Err(EngineError::config(
          "REVIEW_TOOL_TIMEOUT_SECS",
          "must be at least 1",
        ));
      }
      config.tool_timeout = Duration::from_secs(u64::from(secs));
    }
    if let Some(mode) = lookup("REVIEW_RISK_COMBINE") {
      config.risk_combine = match mode.trim().to_ascii_lowercase().as_str() {
        "sum" => RiskCombine::Sum,
        "max" => RiskCombine::Max,
        _ => return Err(EngineError::config("REVIEW_RISK_COMBINE", "expected sum|max")),
      };
    }
    if let Some(wording) = lookup("REVIEW_HEURISTIC_WORDING") {
      config.heuristic_wording = match wording.trim().to_ascii_lowercase().as_str() {
        "extended" => HeuristicWording::Extended,
        "minimal" => HeuristicWording::Minimal,
        _ => {
          return Err(EngineError::config(
            "REVIEW_HEURISTIC_WORDING",
            "expected extended|minimal",
          ))
        }
      };
    }
    if let Some(lines) = lookup("REVIEW_LARGE_CHANGE_LINES") {
      let lines = parse_u32("REVIEW_LARGE_CHANGE_LINES", &lines)?;
      config.large_change_lines = (lines > 0).then_some(lines as usize);
    }
    if let Some(risk) = lookup("REVIEW_UNDEFINED_NAME_RISK") {
      let risk = parse_u32("REVIEW_UNDEFINED_NAME_RISK", &risk)?;
      config.undefined_name_risk = (risk > 0).then_some(risk);
    }
    if let Some(risk) = lookup("REVIEW_UNKNOWN_SEVERITY_RISK") {
      config.unknown_severity_risk = parse_u32("REVIEW_UNKNOWN_SEVERITY_RISK", &risk)?;
    }

    Ok(config)
  }
}

fn parse_u32(key: &str, raw: &str) -> Result<u32, EngineError> {
  raw
    .trim()
    .parse::<u32>()
    .map_err(|e| EngineError::config(key, &format!("expected a non-negative integer: {}", e)))
}
