//! Structured error types for the review engine.
//!
//! None of these reach a caller of `Analyzer::analyze`: they are folded into a
//! system-error `AnalysisResult` at the pipeline boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
  #[error("config: {key}: {reason}")]
  Config { key: String, reason: String },

  #[error("grammar: {0}")]
  Grammar(#[from] tree_sitter::LanguageError),

  #[error("parse: {0}")]
  Parse(String),

  #[error("io: {0}")]
  Io(#[from] std::io::Error),
}

impl EngineError {
  pub fn config(key: &str, reason: &str) -> Self {
    Self::Config {
      key: key.to_string(),
      reason: reason.to_string(),
    }
  }

  pub fn parse(msg: impl Into<String>) -> Self {
    Self::Parse(msg.into())
  }
}
