//! Code review scoring engine: syntax tree checks, flake8, bandit and text
//! heuristics fused into a risk score and a quality score.
//!
//! Used by the binary for stdin/stdout and by review-worker as a library.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod heuristics;
pub mod language;
pub mod lint;
pub mod score;
pub mod security;
pub mod syntax;
pub mod tool;
pub mod types;

pub use analyzer::Analyzer;
pub use config::{Config, HeuristicWording, RiskCombine};
pub use error::EngineError;
pub use lint::{LintReport, Linter};
pub use security::{SecurityReport, SecurityScanner};
pub use types::{AnalysisResult, Submission};

/// Install a stderr `tracing` subscriber honouring `RUST_LOG` (default `info`).
/// stdout is left for JSON output.
pub fn init_logging() {
  use tracing_subscriber::{fmt, prelude::*, EnvFilter};

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let _ = tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr))
    .with(filter)
    .try_init();
}
