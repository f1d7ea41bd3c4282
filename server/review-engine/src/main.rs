//! Binary entrypoint: read one JSON submission from stdin, write one result to stdout.

use review_engine::{AnalysisResult, Analyzer, Config, Submission};
use std::io::{self, Read, Write};
use tracing::warn;

fn main() {
  review_engine::init_logging();
  if let Err(e) = run_binary() {
    let _ = writeln!(io::stderr(), "review-engine error: {}", e);
    std::process::exit(1);
  }
}

fn run_binary() -> Result<(), Box<dyn std::error::Error>> {
  let config = Config::from_env()?;
  let mut raw = String::new();
  io::stdin().lock().read_to_string(&mut raw)?;

  // A malformed submission still gets a result record.
  let out = match serde_json::from_str::<Submission>(&raw) {
    Ok(submission) => Analyzer::new(config).analyze_submission(&submission),
    Err(e) => {
      warn!(error = %e, "malformed submission");
      AnalysisResult::system_error(format!("invalid submission: {}", e))
    }
  };
  let json = serde_json::to_vec(&out)?;
  io::stdout().write_all(&json)?;
  Ok(())
}
