//! Job and result-record types for the worker (JSON-lines contract).

use chrono::{DateTime, Utc};
use review_engine::{AnalysisResult, Submission};
use serde::{Deserialize, Serialize};

/// One queued submission.
#[derive(Debug, Clone, Deserialize)]
pub struct Job {
  #[serde(default)]
  pub id: Option<String>,
  #[serde(flatten)]
  pub submission: Submission,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
  Completed,
  Failed,
}

/// One output line: the analysis result plus job bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
  pub submission_id: String,
  pub status: JobStatus,
  #[serde(flatten)]
  pub result: AnalysisResult,
  pub completed_at: DateTime<Utc>,
}

impl ResultRecord {
  pub fn completed(submission_id: String, result: AnalysisResult) -> Self {
    Self {
      submission_id,
      status: JobStatus::Completed,
      result,
      completed_at: Utc::now(),
    }
  }

  /// A job that never produced a result still gets a well-formed record.
  pub fn failed(submission_id: String, error: impl std::fmt::Display) -> Self {
    Self {
      submission_id,
      status: JobStatus::Failed,
      result: AnalysisResult::system_error(error),
      completed_at: Utc::now(),
    }
  }
}
