//! Document configuration.
//!
//! ```toml
//! code_page = 65001
//! eol_mode = "lf"
//! line_end_types_allowed = "unicode"
//! tab_width = 4
//! use_tabs = false
//! regex_engine = "standard"
//! ```

use quill_core::line_ending::{
  EndOfLine,
  LineEndTypes,
};
use serde::Deserialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("invalid document options: {0}")]
  Parse(#[from] toml::de::Error),
  #[error("tab_width must be at least 1")]
  ZeroTabWidth,
}

/// Regular expression back end used when a search does not pick one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegexEngine {
  /// Line oriented backtracking matcher with `\(` `\)` groups.
  #[default]
  Builtin,
  /// `regex-automata` with the usual modern syntax.
  Standard,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "snake_case", deny_unknown_fields)]
pub struct DocumentOptions {
  /// 0 for single byte text, 65001 for UTF-8, or a double byte code page.
  pub code_page:              u32,
  pub eol_mode:               EndOfLine,
  pub line_end_types_allowed: LineEndTypes,
  pub tab_width:              usize,
  /// 0 means indent by one tab width.
  pub indent:                 usize,
  pub use_tabs:               bool,
  pub tab_indents:            bool,
  pub backspace_unindents:    bool,
  pub undo_collection:        bool,
  pub read_only:              bool,
  pub regex_engine:           RegexEngine,
  /// Keep a style byte per text byte.
  pub styling:                bool,
}

impl Default for DocumentOptions {
  fn default() -> Self {
    Self {
      code_page:              0,
      eol_mode:               EndOfLine::default(),
      line_end_types_allowed: LineEndTypes::DEFAULT,
      tab_width:              8,
      indent:                 0,
      use_tabs:               true,
      tab_indents:            true,
      backspace_unindents:    false,
      undo_collection:        true,
      read_only:              false,
      regex_engine:           RegexEngine::Builtin,
      styling:                true,
    }
  }
}

impl DocumentOptions {
  pub fn from_toml(source: &str) -> Result<Self> {
    let options: Self = toml::from_str(source)?;
    options.validate()?;
    Ok(options)
  }

  pub fn validate(&self) -> Result<()> {
    if self.tab_width == 0 {
      return Err(ConfigError::ZeroTabWidth);
    }
    Ok(())
  }
}
