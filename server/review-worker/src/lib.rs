//! Code Review Worker
//!
//! Turns a stream of JSON-lines jobs into JSON-lines result records, running
//! independent analyses in parallel.

pub mod types;
pub mod worker;

pub use types::{Job, JobStatus, ResultRecord};
pub use worker::{concurrency_from, Worker};
