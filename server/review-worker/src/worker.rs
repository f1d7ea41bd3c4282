//! Concurrent job runner: each job gets its own blocking task and temp file.

use std::sync::Arc;

use review_engine::{Analyzer, EngineError};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Semaphore};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::types::{Job, ResultRecord};

/// Shares one analyzer across up to `concurrency` in-flight jobs.
#[derive(Clone)]
pub struct Worker {
  analyzer: Arc<Analyzer>,
  permits: Arc<Semaphore>,
}

impl Worker {
  pub fn new(analyzer: Analyzer, concurrency: usize) -> Self {
    Self {
      analyzer: Arc::new(analyzer),
      permits: Arc::new(Semaphore::new(concurrency.max(1))),
    }
  }

  /// Analyze one job. Never fails: a panicking analysis becomes a `failed` record.
  pub async fn process(&self, job: Job) -> ResultRecord {
    let id = job.id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let _permit = match Arc::clone(&self.permits).acquire_owned().await {
      Ok(permit) => permit,
      Err(e) => return ResultRecord::failed(id, e),
    };

    info!(submission_id = %id, "processing job");
    let analyzer = Arc::clone(&self.analyzer);
    let submission = job.submission;
    match tokio::task::spawn_blocking(move || analyzer.analyze_submission(&submission)).await {
      Ok(result) => {
        info!(submission_id = %id, risk = result.risk_score, "job completed");
        ResultRecord::completed(id, result)
      }
      Err(e) => {
        error!(submission_id = %id, error = %e, "analysis task failed");
        ResultRecord::failed(id, format!("analysis task failed: {}", e))
      }
    }
  }

  /// Read JSON-lines jobs until EOF, writing one record per non-blank line in
  /// completion order. Returns the number of records written.
  pub async fn run<R, W>(&self, input: R, mut output: W) -> std::io::Result<usize>
  where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
  {
    let (tx, mut rx) = mpsc::unbounded_channel::<ResultRecord>();
    let mut lines = input.lines();
    let mut written = 0;

    loop {
      tokio::select! {
        line = lines.next_line() => {
          let Some(line) = line? else { break };
          let trimmed = line.trim();
          if trimmed.is_empty() {
            continue;
          }
          match serde_json::from_str::<Job>(trimmed) {
            Ok(job) => {
              let worker = self.clone();
              let tx = tx.clone();
              tokio::spawn(async move {
                let _ = tx.send(worker.process(job).await);
              });
            }
            Err(e) => {
              warn!(error = %e, "rejecting malformed job");
              let record = ResultRecord::failed("error".to_string(), format!("invalid job: {}", e));
              let _ = tx.send(record);
            }
          }
        }
        Some(record) = rx.recv() => {
          write_record(&mut output, &record).await?;
          written += 1;
        }
      }
    }

    drop(tx);
    while let Some(record) = rx.recv().await {
      write_record(&mut output, &record).await?;
      written += 1;
    }
    output.flush().await?;
    Ok(written)
  }
}

async fn write_record<W: AsyncWrite + Unpin>(
  output: &mut W,
  record: &ResultRecord,
) -> std::io::Result<()> {
  let mut line = serde_json::to_vec(record)?;
  line.push(b'\n');
  output.write_all(&line).await
}

/// `REVIEW_WORKERS` if set, else the machine's available parallelism.
pub fn concurrency_from(raw: Option<String>) -> Result<usize, EngineError> {
  match raw {
    Some(raw) => match raw.trim().parse::<usize>() {
      Ok(n) if n > 0 => Ok(n),
      _ => Err(EngineError::config("REVIEW_WORKERS", "expected a positive integer")),
    },
    None => Ok(
      std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1),
    ),
  }
}
