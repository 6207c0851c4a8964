//! Regular expression search over a [`Document`].
//!
//! Two engines are available. The builtin one is a small backtracking
//! matcher over bytes with `\(` `\)` groups and `\<` `\>` word anchors. The
//! standard one hands each line to `regex-automata`. Both search one line at
//! a time, so no match ever spans a line end.

mod backtrack;
mod standard;

use std::fmt;

use thiserror::Error;

pub use self::{
  backtrack::BacktrackSearch,
  standard::StandardSearch,
};
use crate::{
  config::RegexEngine,
  document::{
    Document,
    FindFlags,
  },
};

/// Number of groups a match can report, the whole match included.
pub const MAX_TAG: usize = 10;

pub type Result<T> = std::result::Result<T, RegexError>;

/// How a pattern writes its groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupSyntax {
  /// `(` and `)`.
  Posix,
  /// `\(` and `\)`.
  Escaped,
}

impl GroupSyntax {
  fn open(self) -> &'static str {
    match self {
      Self::Posix => "(",
      Self::Escaped => "\\(",
    }
  }

  fn close(self) -> &'static str {
    match self {
      Self::Posix => ")",
      Self::Escaped => "\\)",
    }
  }
}

impl fmt::Display for GroupSyntax {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}{}", self.open(), self.close())
  }
}

#[derive(Debug, Error)]
pub enum RegexError {
  #[error("Missing ]")]
  MissingBracket,
  #[error("Empty closure")]
  EmptyClosure,
  #[error("Illegal closure")]
  IllegalClosure,
  #[error("Cyclical reference")]
  CyclicalReference,
  #[error("Undetermined reference")]
  UndeterminedReference,
  #[error("Too many {0} pairs")]
  TooManyGroups(GroupSyntax),
  #[error("Null pattern inside {0}")]
  NullGroup(GroupSyntax),
  #[error("Unmatched {}", .0.close())]
  UnmatchedClose(GroupSyntax),
  #[error("Unmatched {}", .0.open())]
  UnmatchedOpen(GroupSyntax),
  #[error("Null pattern inside \\<\\>")]
  NullWordPattern,
  #[error("No previous regular expression")]
  NoPrevious,
  #[error("Pattern too long")]
  TooLong,
  #[error("invalid regular expression: {0}")]
  Build(#[from] Box<regex_automata::meta::BuildError>),
}

/// Byte access for the matchers.
pub trait CharacterIndexer {
  /// Byte at `position`, 0 outside the text.
  fn char_at(&self, position: usize) -> u8;

  /// Moves `position` out of the middle of a character, towards the end
  /// when `move_dir` is positive.
  fn move_position_outside_char(&self, position: usize, move_dir: isize) -> usize;
}

pub(crate) struct DocumentIndexer<'a> {
  doc: &'a Document,
}

impl<'a> DocumentIndexer<'a> {
  pub(crate) fn new(doc: &'a Document) -> Self {
    Self { doc }
  }
}

impl CharacterIndexer for DocumentIndexer<'_> {
  #[inline]
  fn char_at(&self, position: usize) -> u8 {
    self.doc.char_at(position)
  }

  #[inline]
  fn move_position_outside_char(&self, position: usize, move_dir: isize) -> usize {
    self.doc.move_position_outside_char(position, move_dir, false)
  }
}

/// Document ranges of the groups of the last match. Groups that did not take
/// part in the match are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Captures {
  groups: [Option<(usize, usize)>; MAX_TAG],
}

impl Captures {
  pub fn clear(&mut self) {
    self.groups = [None; MAX_TAG];
  }

  pub(crate) fn set(&mut self, index: usize, start: usize, end: usize) {
    if let Some(group) = self.groups.get_mut(index) {
      *group = Some((start, end.max(start)));
    }
  }

  /// Start and end of group `index`.
  pub fn get(&self, index: usize) -> Option<(usize, usize)> {
    self.groups.get(index).copied().flatten()
  }

  /// Text of group `index` as it is now in `doc`.
  pub fn text(&self, doc: &Document, index: usize) -> Vec<u8> {
    self
      .get(index)
      .map_or_else(Vec::new, |(start, end)| doc.char_range(start, end - start))
  }

  /// Expands `\0` to `\9` along with the `\a \b \f \n \r \t \v \\` escapes.
  /// Any other backslash is kept as is.
  pub fn substitute(&self, doc: &Document, text: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut i = 0;
    while i < text.len() {
      let ch = text[i];
      i += 1;
      if ch != b'\\' {
        out.push(ch);
        continue;
      }
      let escaped = match text.get(i) {
        Some(&digit @ b'0'..=b'9') => {
          out.extend_from_slice(&self.text(doc, usize::from(digit - b'0')));
          i += 1;
          continue;
        },
        Some(b'a') => 0x07,
        Some(b'b') => 0x08,
        Some(b'f') => 0x0c,
        Some(b'n') => b'\n',
        Some(b'r') => b'\r',
        Some(b't') => b'\t',
        Some(b'v') => 0x0b,
        Some(b'\\') => b'\\',
        _ => {
          out.push(b'\\');
          continue;
        },
      };
      out.push(escaped);
      i += 1;
    }
    out
  }
}

/// Part of one line a search looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LineSpan {
  pub line_start: usize,
  /// End of the line text, before its terminator.
  pub line_end:   usize,
  pub from:       usize,
  pub to:         usize,
}

/// Search bounds resolved to lines. Backwards searches visit lines from the
/// bottom up.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SearchRange {
  pub forward: bool,
  start:       usize,
  end:         usize,
  line_first:  usize,
  line_last:   usize,
}

impl SearchRange {
  pub(crate) fn new(doc: &Document, min: usize, max: usize) -> Self {
    let forward = min <= max;
    let increment: isize = if forward { 1 } else { -1 };
    let mut start = doc.move_position_outside_char(min, increment, false);
    let end = doc.move_position_outside_char(max, -increment, false);
    let mut line_first = doc.line_from_position(start);
    let line_last = doc.line_from_position(end);
    if forward && start >= doc.line_end(line_first) && line_first < line_last {
      // From the end of a line, start with the next one.
      line_first += 1;
      start = doc.line_start(line_first);
    } else if !forward && start <= doc.line_start(line_first) && line_first > line_last {
      line_first -= 1;
      start = doc.line_end(line_first);
    }
    Self {
      forward,
      start,
      end,
      line_first,
      line_last,
    }
  }

  /// Lines to visit, in search order.
  pub(crate) fn lines<'a>(&self, doc: &'a Document) -> impl Iterator<Item = LineSpan> + 'a {
    let range = *self;
    let mut next = Some(self.line_first);
    std::iter::from_fn(move || {
      let line = next?;
      next = if line == range.line_last {
        None
      } else if range.forward {
        Some(line + 1)
      } else {
        Some(line - 1)
      };
      Some(range.span(doc, line))
    })
  }

  fn span(&self, doc: &Document, line: usize) -> LineSpan {
    let line_start = doc.line_start(line);
    let line_end = doc.line_end(line);
    let (low, high) = if self.forward {
      (self.start, self.end)
    } else {
      (self.end, self.start)
    };
    let low_line = if self.forward { self.line_first } else { self.line_last };
    let high_line = if self.forward { self.line_last } else { self.line_first };
    let mut from = line_start;
    let mut to = line_end;
    if line == low_line {
      from = low.clamp(line_start, line_end);
    }
    if line == high_line {
      to = high.clamp(line_start, line_end);
    }
    LineSpan {
      line_start,
      line_end,
      from,
      to,
    }
  }
}

/// The regular expression engine a document searches with. It keeps the
/// groups of its last match for [`RegexSearch::substitute_by_position`].
#[derive(Debug)]
pub enum RegexSearch {
  Builtin(BacktrackSearch),
  Standard(StandardSearch),
}

impl RegexSearch {
  pub fn new(engine: RegexEngine) -> Self {
    match engine {
      RegexEngine::Builtin => Self::Builtin(BacktrackSearch::default()),
      RegexEngine::Standard => Self::Standard(StandardSearch::default()),
    }
  }

  pub fn engine(&self) -> RegexEngine {
    match self {
      Self::Builtin(_) => RegexEngine::Builtin,
      Self::Standard(_) => RegexEngine::Standard,
    }
  }

  /// Finds `pattern` between `min` and `max`, backwards when `min > max`.
  /// Returns the start and length of the match.
  pub fn find_text(
    &mut self,
    doc: &Document,
    min: usize,
    max: usize,
    pattern: &[u8],
    flags: FindFlags,
  ) -> Result<Option<(usize, usize)>> {
    match self {
      Self::Builtin(search) => search.find_text(doc, min, max, pattern, flags),
      Self::Standard(search) => search.find_text(doc, min, max, pattern, flags),
    }
  }

  pub fn captures(&self) -> &Captures {
    match self {
      Self::Builtin(search) => search.captures(),
      Self::Standard(search) => search.captures(),
    }
  }

  /// Expands `text` against the groups of the last match in `doc`.
  pub fn substitute_by_position(&self, doc: &Document, text: &[u8]) -> Vec<u8> {
    self.captures().substitute(doc, text)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::DocumentOptions;

  fn doc(text: &[u8], code_page: u32) -> Document {
    let mut doc = Document::with_options(&DocumentOptions {
      code_page,
      ..Default::default()
    });
    doc.insert_string(0, text);
    doc
  }

  fn find(doc: &mut Document, min: usize, max: usize, pattern: &str, flags: FindFlags) -> Option<(usize, usize)> {
    doc
      .find_text(min, max, pattern.as_bytes(), flags | FindFlags::REGEXP)
      .unwrap()
  }

  fn position(doc: &mut Document, min: usize, max: usize, pattern: &str, flags: FindFlags) -> Option<usize> {
    find(doc, min, max, pattern, flags).map(|(position, _)| position)
  }

  #[test]
  fn substitution_escapes() {
    let doc = doc(b"whole two", 0);
    let mut captures = Captures::default();
    captures.set(0, 0, 5);
    captures.set(2, 6, 9);
    assert_eq!(captures.substitute(&doc, b"[\\0|\\1|\\2]"), b"[whole||two]");
    assert_eq!(captures.substitute(&doc, b"\\t\\n\\\\\\q"), b"\t\n\\\\q");
    assert_eq!(captures.substitute(&doc, b"end\\"), b"end\\");
    captures.clear();
    assert_eq!(captures.get(0), None);
    assert_eq!(captures.text(&doc, 0), b"");
  }

  #[test]
  fn groups_read_the_current_text() {
    let mut doc = doc(b"abc", 0);
    let len = doc.len();
    assert_eq!(find(&mut doc, 0, len, "b", FindFlags::empty()), Some((1, 1)));
    doc.delete_chars(1, 1);
    doc.insert_string(1, b"X");
    assert_eq!(doc.substitute_by_position(b"<\\0>").unwrap(), b"<X>");
  }

  #[test]
  fn errors_read_like_messages() {
    assert_eq!(RegexError::TooManyGroups(GroupSyntax::Escaped).to_string(), "Too many \\(\\) pairs");
    assert_eq!(RegexError::UnmatchedClose(GroupSyntax::Posix).to_string(), "Unmatched )");
    assert_eq!(RegexError::UnmatchedOpen(GroupSyntax::Escaped).to_string(), "Unmatched \\(");
    assert_eq!(RegexError::NullGroup(GroupSyntax::Posix).to_string(), "Null pattern inside ()");
  }

  #[test]
  fn search_ranges_walk_lines() {
    let doc = doc(b"ab\r\ncd\r\nef", 0);
    let forward: Vec<_> = SearchRange::new(&doc, 1, 9).lines(&doc).collect();
    assert_eq!(forward.len(), 3);
    assert_eq!((forward[0].from, forward[0].to), (1, 2));
    assert_eq!((forward[2].from, forward[2].to), (8, 9));

    // Starting at a line end moves on to the next line.
    let from_end: Vec<_> = SearchRange::new(&doc, 2, 6).lines(&doc).collect();
    assert_eq!(from_end.len(), 1);
    assert_eq!((from_end[0].from, from_end[0].to), (4, 6));

    let backward: Vec<_> = SearchRange::new(&doc, 9, 1).lines(&doc).collect();
    assert_eq!(backward.len(), 3);
    assert_eq!((backward[0].from, backward[0].to), (8, 9));
    assert_eq!((backward[2].from, backward[2].to), (1, 2));
  }

  const ASSERTIONS: &[u8] = b"ab cd ef\r\ngh ij kl";

  fn assertions(engine: FindFlags) {
    let mut doc = doc(ASSERTIONS, 0);
    let flags = FindFlags::POSIX | engine;
    let len = doc.len();
    assert_eq!(position(&mut doc, 0, len, "^", flags), Some(0));
    assert_eq!(position(&mut doc, 1, len, "^", flags), Some(10));
    assert_eq!(position(&mut doc, len, 0, "^", flags), Some(10));
    assert_eq!(position(&mut doc, len - 1, 0, "^", flags), Some(10));

    assert_eq!(position(&mut doc, 0, len, "$", flags), Some(8));
    assert_eq!(position(&mut doc, 1, len, "$", flags), Some(8));
    assert_eq!(position(&mut doc, len, 0, "$", flags), Some(18));
    assert_eq!(position(&mut doc, len - 1, 0, "$", flags), Some(8));
  }

  #[test]
  fn line_anchors() {
    assertions(FindFlags::empty());
    assertions(FindFlags::CXX11_REGEX);
  }

  #[test]
  fn word_anchors() {
    let mut doc = doc(ASSERTIONS, 0);
    let flags = FindFlags::POSIX;
    let len = doc.len();
    assert_eq!(position(&mut doc, 0, len, "\\<", flags), Some(0));
    assert_eq!(position(&mut doc, 1, len, "\\<", flags), Some(3));
    assert_eq!(position(&mut doc, len, 0, "\\<", flags), Some(16));
    assert_eq!(position(&mut doc, len - 1, 0, "\\<", flags), Some(16));

    assert_eq!(position(&mut doc, 0, len, "\\>", flags), Some(2));
    assert_eq!(position(&mut doc, 1, len, "\\>", flags), Some(2));
    assert_eq!(position(&mut doc, len, 0, "\\>", flags), Some(18));
    assert_eq!(position(&mut doc, len - 1, 0, "\\>", flags), Some(15));

    assert_eq!(position(&mut doc, 0, len, "\\>$", flags), Some(8));
    assert_eq!(position(&mut doc, 10, len, "\\>$", flags), Some(18));
  }

  const LINES: &str = "\n\r\r\n 1a\u{0393}z \n\r\r\n 2b\u{0393}y \n\r\r\n";

  fn search_and_substitute(engine: FindFlags) {
    let mut doc = doc(LINES.as_bytes(), 65001);
    let flags = FindFlags::POSIX | engine;
    let len = doc.len();

    assert_eq!(find(&mut doc, 0, len, "\\d+(\\w+)", flags), Some((5, 5)));
    assert_eq!(doc.substitute_by_position(b"\\t\\1\\n").unwrap(), "\ta\u{0393}z\n".as_bytes());

    assert_eq!(find(&mut doc, len, 0, "\\d+(\\w+)", flags), Some((16, 5)));
    assert_eq!(doc.substitute_by_position(b"\\t\\1\\n").unwrap(), "\tb\u{0393}y\n".as_bytes());

    assert_eq!(find(&mut doc, len, 0, "\\w+", flags), Some((16, 5)));
    assert_eq!(doc.substitute_by_position(b"\\t\\0\\n").unwrap(), "\t2b\u{0393}y\n".as_bytes());
  }

  #[test]
  fn search_and_substitution() {
    search_and_substitute(FindFlags::empty());
    search_and_substitute(FindFlags::CXX11_REGEX);
  }

  #[test]
  fn groups_end_outside_characters() {
    let mut utf8 = doc(" a\u{0393}\u{0393}z ".as_bytes(), 65001);
    let len = utf8.len();
    assert_eq!(find(&mut utf8, 0, len, "[a-z](\\w)\\1", FindFlags::POSIX), Some((1, 5)));
    assert_eq!(utf8.substitute_by_position(b"\\t\\1\\n").unwrap(), "\t\u{0393}\n".as_bytes());

    let mut doc = doc(b" \x98\x61xx 1aa\x83\xA1\x83\xA1z ", 932);
    let len = doc.len();
    assert_eq!(find(&mut doc, 0, len, "[a-z](\\w)\\1", FindFlags::POSIX), Some((8, 5)));
    assert_eq!(doc.substitute_by_position(b"\\t\\1\\n").unwrap(), b"\t\x83\xA1\n");
    assert_eq!(find(&mut doc, 0, len, "\\w([a-z])\\1", FindFlags::POSIX), Some((6, 3)));
    assert_eq!(doc.substitute_by_position(b"\\t\\1\\n").unwrap(), b"\ta\n");
  }

  #[test]
  fn bad_patterns_are_reported() {
    let mut doc = doc(b"abc", 0);
    let len = doc.len();
    let err = doc.find_text(0, len, b"a\\(b", FindFlags::REGEXP).unwrap_err();
    assert!(matches!(err, RegexError::UnmatchedOpen(GroupSyntax::Escaped)));
    let err = doc
      .find_text(0, len, b"(a", FindFlags::REGEXP | FindFlags::CXX11_REGEX)
      .unwrap_err();
    assert!(matches!(err, RegexError::Build(_)));
    // The document goes on searching after a failure.
    assert_eq!(find(&mut doc, 0, len, "c", FindFlags::empty()), Some((2, 1)));
  }

  #[test]
  fn engines_can_be_switched() {
    let mut doc = doc(b"x{2}xx", 0);
    let len = doc.len();
    assert_eq!(find(&mut doc, 0, len, "x{2}", FindFlags::empty()), Some((0, 4)));
    assert_eq!(find(&mut doc, 0, len, "x{2}", FindFlags::CXX11_REGEX), Some((4, 2)));
    doc.set_regex_engine(RegexEngine::Standard);
    assert_eq!(find(&mut doc, 0, len, "x{2}", FindFlags::empty()), Some((4, 2)));
  }
}
