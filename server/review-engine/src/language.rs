//! Language dispatch by capability rather than by string comparison.

/// Which pipeline stages a language supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
  pub syntax_tree: bool,
  pub linter: bool,
  pub security_scanner: bool,
}

impl Capabilities {
  /// Any stage that needs the source on disk. The syntax stage hands it to
  /// the interpreter.
  pub fn needs_artifact(&self) -> bool {
    self.syntax_tree || self.linter || self.security_scanner
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Language {
  Python,
  /// Unrecognized tag: heuristics only.
  Other(String),
}

impl Language {
  pub fn from_tag(tag: &str) -> Self {
    match tag.trim().to_ascii_lowercase().as_str() {
      "python" | "py" | "python3" => Language::Python,
      _ => Language::Other(tag.to_string()),
    }
  }

  pub fn capabilities(&self) -> Capabilities {
    match self {
      Language::Python => Capabilities {
        syntax_tree: true,
        linter: true,
        security_scanner: true,
      },
      Language::Other(_) => Capabilities {
        syntax_tree: false,
        linter: false,
        security_scanner: false,
      },
    }
  }

  /// Suffix for the temp artifact; the external tools key off it.
  pub fn file_suffix(&self) -> &'static str {
    match self {
      Language::Python => ".py",
      Language::Other(_) => ".txt",
    }
  }
}
