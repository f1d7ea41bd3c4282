//! Child-process runner for the external analysis tools.
//!
//! Tools are run to completion or killed at the timeout. stdout and stderr are
//! drained on their own threads so a tool that writes more than a pipe buffer
//! cannot block while we wait on it.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// How one tool run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
  /// The process exited on its own; a non-zero code is not an error by itself.
  Finished {
    stdout: String,
    stderr: String,
    code: Option<i32>,
  },
  /// The process could not be started or waited on.
  Failed(String),
  TimedOut(Duration),
}

/// `program args... <path>` with a deadline.
#[derive(Debug, Clone)]
pub struct ToolCommand {
  pub name: String,
  pub program: String,
  pub args: Vec<String>,
  pub timeout: Duration,
}

impl ToolCommand {
  pub fn new(name: &str, program: &str, args: &[&str], timeout: Duration) -> Self {
    Self {
      name: name.to_string(),
      program: program.to_string(),
      args: args.iter().map(|a| a.to_string()).collect(),
      timeout,
    }
  }

  /// Run against `path`, appended as the last argument.
  pub fn run(&self, path: &Path) -> ToolOutcome {
    debug!(tool = %self.name, program = %self.program, path = %path.display(), "running tool");

    let spawned = Command::new(&self.program)
      .args(&self.args)
      .arg(path)
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn();
    let mut child = match spawned {
      Ok(child) => child,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        warn!(tool = %self.name, "tool not found");
        return ToolOutcome::Failed(format!("{} not found ({})", self.name, self.program));
      }
      Err(e) => {
        warn!(tool = %self.name, error = %e, "failed to start tool");
        return ToolOutcome::Failed(format!("failed to run {}: {}", self.name, e));
      }
    };

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    match self.wait(&mut child) {
      Ok(Some(code)) => ToolOutcome::Finished {
        stdout: collect(stdout),
        stderr: collect(stderr),
        code,
      },
      Ok(None) => {
        let _ = child.kill();
        let _ = child.wait();
        warn!(tool = %self.name, timeout_secs = self.timeout.as_secs_f64(), "tool timed out");
        ToolOutcome::TimedOut(self.timeout)
      }
      Err(e) => {
        let _ = child.kill();
        let _ = child.wait();
        ToolOutcome::Failed(format!("failed to wait for {}: {}", self.name, e))
      }
    }
  }

  /// `Ok(Some(exit_code))` when the child exits, `Ok(None)` on timeout.
  fn wait(&self, child: &mut Child) -> std::io::Result<Option<Option<i32>>> {
    let start = Instant::now();
    loop {
      if let Some(status) = child.try_wait()? {
        return Ok(Some(status.code()));
      }
      if start.elapsed() >= self.timeout {
        return Ok(None);
      }
      thread::sleep(POLL_INTERVAL);
    }
  }
}

impl ToolOutcome {
  /// Human-readable reason for a run that produced no usable output.
  pub fn failure_reason(&self, name: &str) -> Option<String> {
    match self {
      ToolOutcome::Finished { .. } => None,
      ToolOutcome::Failed(reason) => Some(reason.clone()),
      ToolOutcome::TimedOut(limit) => Some(format!(
        "{} timed out after {}s",
        name,
        limit.as_secs_f64()
      )),
    }
  }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
  pipe.map(|mut pipe| {
    thread::spawn(move || {
      let mut buf = Vec::new();
      let _ = pipe.read_to_end(&mut buf);
      String::from_utf8_lossy(&buf).into_owned()
    })
  })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
  handle.and_then(|h| h.join().ok()).unwrap_or_default()
}
