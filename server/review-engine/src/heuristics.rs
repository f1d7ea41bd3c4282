//! Text heuristics over the raw diff: a fallback for what the scanner misses.

use crate::config::{Config, HeuristicWording};

/// Partial result of the heuristic stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeuristicReport {
  pub risk: u32,
  pub flags: Vec<String>,
}

impl HeuristicWording {
  fn eval_flag(self) -> &'static str {
    match self {
      HeuristicWording::Extended => "Security: Manual detection of eval/exec",
      HeuristicWording::Minimal => "Security: Use of eval/exec detected",
    }
  }

  fn secret_flag(self) -> &'static str {
    match self {
      HeuristicWording::Extended => "Security: Potential sensitive data hardcoded",
      HeuristicWording::Minimal => "Security: Potential hardcoded password",
    }
  }

  fn secret_keywords(self) -> &'static [&'static str] {
    match self {
      HeuristicWording::Extended => &["password", "secret"],
      HeuristicWording::Minimal => &["password"],
    }
  }
}

/// Check `diff` against the security flags already raised. A category the
/// scanner already reported is not counted twice.
pub fn assess(diff: &str, existing_flags: &[String], config: &Config) -> HeuristicReport {
  let wording = config.heuristic_wording;
  let mut report = HeuristicReport::default();

  if (diff.contains("eval(") || diff.contains("exec("))
    && !existing_flags.iter().any(|f| f.contains("eval"))
  {
    report.risk = report.risk.saturating_add(config.eval_risk);
    report.flags.push(wording.eval_flag().to_string());
  }

  let lowered = diff.to_lowercase();
  if wording.secret_keywords().iter().any(|k| lowered.contains(k))
    && !existing_flags
      .iter()
      .any(|f| f.to_lowercase().contains("hardcoded"))
  {
    report.risk = report.risk.saturating_add(config.secret_risk);
    report.flags.push(wording.secret_flag().to_string());
  }

  if let Some(limit) = config.large_change_lines {
    if count_lines(diff) > limit {
      report.risk = report.risk.saturating_add(config.large_change_risk);
      report
        .flags
        .push(format!("Maintainability: Large change set (>{} lines)", limit));
    }
  }

  report
}

/// Line count with `\n`, `\r\n`, lone `\r` and the other Unicode line
/// boundaries all ending a line. A trailing partial line counts.
fn count_lines(text: &str) -> usize {
  let mut count = 0;
  let mut open = false;
  let mut chars = text.chars().peekable();
  while let Some(c) = chars.next() {
    match c {
      '\r' => {
        if chars.peek() == Some(&'\n') {
          chars.next();
        }
        count += 1;
        open = false;
      }
      '\n' | '\u{0b}' | '\u{0c}' | '\u{1c}' | '\u{1d}' | '\u{1e}' | '\u{85}' | '\u{2028}'
      | '\u{2029}' => {
        count += 1;
        open = false;
      }
      _ => open = true,
    }
  }
  count + usize::from(open)
}
