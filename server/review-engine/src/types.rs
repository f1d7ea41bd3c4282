//! Input/output types for the review engine (JSON contract with callers).

use serde::{Deserialize, Serialize};

/// Flag attached to every result whose source failed to parse.
pub const SYNTAX_ERROR_FLAG: &str = "Critical: Syntax Error (Code cannot run)";

/// Input: one diff/source blob and the language it is written in.
#[derive(Debug, Clone, Deserialize)]
pub struct Submission {
  #[serde(default)]
  pub diff: String,
  #[serde(default = "default_language")]
  pub language: String,
}

fn default_language() -> String {
  "python".to_string()
}

/// Output: scores plus the human-readable findings behind them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
  pub risk_score: u8,
  pub quality_score: u8,
  pub comments: Vec<String>,
  pub flags: Vec<String>,
  pub suggestions: Vec<String>,
}

impl AnalysisResult {
  /// Terminal result for source that does not parse.
  pub fn syntax_failure(message: String, suggestions: Vec<String>) -> Self {
    Self {
      risk_score: 100,
      quality_score: 0,
      comments: vec![message],
      flags: vec![SYNTAX_ERROR_FLAG.to_string()],
      suggestions,
    }
  }

  /// Well-formed result for an internal fault; callers always get a record.
  pub fn system_error(error: impl std::fmt::Display) -> Self {
    Self {
      risk_score: 0,
      quality_score: 0,
      comments: Vec::new(),
      flags: vec![format!("System Error: {}", error)],
      suggestions: vec!["Check the server logs for more details.".to_string()],
    }
  }
}
