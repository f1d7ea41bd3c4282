//! Binary entrypoint for the review worker: jobs on stdin, records on stdout.

use review_engine::{Analyzer, Config};
use review_worker::{concurrency_from, Worker};
use tokio::io::BufReader;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  review_engine::init_logging();

  let config = Config::from_env()?;
  let workers = concurrency_from(std::env::var("REVIEW_WORKERS").ok())?;
  let worker = Worker::new(Analyzer::new(config), workers);

  info!(workers, "review-worker started, waiting for jobs");
  let processed = worker
    .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    .await?;
  info!(processed, "input closed, worker exiting");

  Ok(())
}
