//! The analysis pipeline: syntax → lint → security → heuristics → combine.

use tracing::{debug, error, info_span, warn};

use crate::config::Config;
use crate::error::EngineError;
use crate::heuristics;
use crate::language::Language;
use crate::lint::{Flake8Linter, LintReport, Linter, SourceArtifact};
use crate::score;
use crate::security::{BanditScanner, SecurityReport, SecurityScanner};
use crate::syntax::{self, CompileCheck, SyntaxReport};
use crate::types::{AnalysisResult, Submission};

/// Runs one submission at a time through the pipeline. Holds no per-run
/// state, so one instance can be shared across threads.
pub struct Analyzer {
  config: Config,
  compile_check: CompileCheck,
  linter: Box<dyn Linter>,
  scanner: Box<dyn SecurityScanner>,
}

impl Analyzer {
  /// flake8 and bandit, invoked through `config.python`.
  pub fn new(config: Config) -> Self {
    let linter = Box::new(Flake8Linter::new(&config));
    let scanner = Box::new(BanditScanner::new(&config));
    Self::with_tools(config, linter, scanner)
  }

  pub fn with_tools(
    config: Config,
    linter: Box<dyn Linter>,
    scanner: Box<dyn SecurityScanner>,
  ) -> Self {
    Self {
      compile_check: CompileCheck::new(&config),
      config,
      linter,
      scanner,
    }
  }

  /// Replace the interpreter used to decide whether source parses.
  pub fn with_compile_check(mut self, compile_check: CompileCheck) -> Self {
    self.compile_check = compile_check;
    self
  }

  pub fn analyze_submission(&self, submission: &Submission) -> AnalysisResult {
    self.analyze(&submission.diff, &submission.language)
  }

  /// Always returns a well-formed result; internal faults become a
  /// system-error result rather than an `Err`.
  pub fn analyze(&self, source: &str, language: &str) -> AnalysisResult {
    let span = info_span!("analyze", language, bytes = source.len());
    let _enter = span.enter();

    match self.run_pipeline(source, &Language::from_tag(language)) {
      Ok(result) => {
        debug!(
          risk = result.risk_score,
          quality = result.quality_score,
          "analysis complete"
        );
        result
      }
      Err(e) => {
        error!(error = %e, "analysis failed");
        AnalysisResult::system_error(e)
      }
    }
  }

  fn run_pipeline(&self, source: &str, language: &Language) -> Result<AnalysisResult, EngineError> {
    let caps = language.capabilities();

    // Lives until the scan is done; dropping it removes the file.
    let artifact = if caps.needs_artifact() {
      SourceArtifact::materialize(source, language.file_suffix())
        .map_err(|e| {
          warn!(error = %e, "could not write source for analysis");
          e.to_string()
        })
        .map(Some)
    } else {
      Ok(None)
    };
    let path = match &artifact {
      Ok(Some(artifact)) => Some(artifact.path()),
      _ => None,
    };

    let syntax = if caps.syntax_tree {
      let verdict = path.and_then(|p| self.compile_check.check(p));
      syntax::inspect(source, verdict, &self.config)?
    } else {
      SyntaxReport::default()
    };
    if let Some(message) = syntax.fatal_error {
      return Ok(AnalysisResult::syntax_failure(message, syntax.suggestions));
    }

    let lint = match (caps.linter, path, &artifact) {
      (false, _, _) => LintReport::default(),
      (true, Some(path), _) => self.linter.lint(path),
      (true, None, Err(reason)) => LintReport::failed(reason),
      (true, None, Ok(_)) => LintReport::failed("source artifact unavailable"),
    };

    let security = match (caps.security_scanner, path) {
      (false, _) => SecurityReport::default(),
      (true, Some(path)) => self.scanner.scan(path),
      (true, None) => SecurityReport::failed("source artifact unavailable"),
    };
    drop(artifact);

    let heuristics = heuristics::assess(source, &security.flags, &self.config);
    Ok(score::combine(&self.config, syntax, lint, security, heuristics))
  }
}
