//! Score combiner: fold the stage reports into one bounded result.

use crate::config::{Config, RiskCombine};
use crate::heuristics::HeuristicReport;
use crate::lint::LintReport;
use crate::security::SecurityReport;
use crate::syntax::SyntaxReport;
use crate::types::AnalysisResult;

const UNDEFINED_NAME_HINT: &str = "Define variables before using them, or check for typos.";

/// Risk 0–100 from the stage totals, then quality from risk and lint volume.
/// Clamping happens here and nowhere upstream.
pub fn combine(
  config: &Config,
  syntax: SyntaxReport,
  lint: LintReport,
  security: SecurityReport,
  heuristics: HeuristicReport,
) -> AnalysisResult {
  let mut flags = syntax.flags;
  let mut suggestions = syntax.suggestions;

  let mut tool_risk = i64::from(security.risk) + i64::from(heuristics.risk);
  if let Some(per_name) = config.undefined_name_risk {
    let undefined = lint.undefined_names();
    if undefined > 0 {
      tool_risk += i64::from(per_name) * undefined as i64;
      flags.push(format!("Critical: {} Undefined variables detected", undefined));
      suggestions.push(UNDEFINED_NAME_HINT.to_string());
    }
  }
  flags.extend(security.flags);
  flags.extend(heuristics.flags);

  let ast_risk = i64::from(syntax.risk);
  let raw_risk = match config.risk_combine {
    RiskCombine::Sum => ast_risk + tool_risk,
    RiskCombine::Max => ast_risk.max(tool_risk),
  };
  let risk = clamp_score(raw_risk);
  let quality = quality_score(config, risk, lint.comments.len());

  AnalysisResult {
    risk_score: risk,
    quality_score: quality,
    comments: lint.comments,
    flags,
    suggestions,
  }
}

/// `max(0, 100 - lint_weight × diagnostics - risk_weight × risk)`.
pub fn quality_score(config: &Config, risk: u8, diagnostics: usize) -> u8 {
  let penalty = i64::from(config.quality_risk_weight) * i64::from(risk)
    + i64::from(config.quality_lint_weight) * diagnostics as i64;
  clamp_score(100 - penalty)
}

fn clamp_score(raw: i64) -> u8 {
  raw.clamp(0, 100) as u8
}
