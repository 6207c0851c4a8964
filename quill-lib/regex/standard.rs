//! `regex-automata` backed search.
//!
//! UTF-8 documents get Unicode syntax. Other documents are searched as raw
//! bytes, with non ASCII pattern bytes matching themselves.

use std::fmt::Write as _;

use regex_automata::{
  Input,
  meta::{
    self,
    Regex,
  },
  util::{
    captures::Captures as Groups,
    syntax,
  },
};

use super::{
  Captures,
  LineSpan,
  MAX_TAG,
  RegexError,
  Result,
  SearchRange,
};
use crate::document::{
  Document,
  FindFlags,
};

#[derive(Debug)]
struct Compiled {
  pattern:        Vec<u8>,
  case_sensitive: bool,
  utf8:           bool,
  regex:          Regex,
}

/// Pattern text for byte oriented matching.
fn escape_high_bytes(pattern: &[u8]) -> String {
  let mut source = String::with_capacity(pattern.len());
  for &b in pattern {
    if b.is_ascii() {
      source.push(char::from(b));
    } else {
      let _ = write!(source, "\\x{b:02X}");
    }
  }
  source
}

fn build(pattern: &[u8], case_sensitive: bool, utf8: bool) -> Result<Regex> {
  let source = if utf8 {
    String::from_utf8_lossy(pattern).into_owned()
  } else {
    escape_high_bytes(pattern)
  };
  let syntax = syntax::Config::new()
    .case_insensitive(!case_sensitive)
    .unicode(utf8)
    .utf8(utf8);
  Regex::builder()
    .configure(meta::Config::new().utf8_empty(utf8))
    .syntax(syntax)
    .build(&source)
    .map_err(|err| RegexError::Build(Box::new(err)))
}

/// Reuses the compiled pattern when nothing it depends on changed.
fn compile<'a>(
  compiled: &'a mut Option<Compiled>,
  pattern: &[u8],
  case_sensitive: bool,
  utf8: bool,
) -> Result<&'a Regex> {
  let reuse = compiled.as_ref().is_some_and(|compiled| {
    compiled.pattern == pattern && compiled.case_sensitive == case_sensitive && compiled.utf8 == utf8
  });
  if !reuse {
    *compiled = None;
    let regex = build(pattern, case_sensitive, utf8)?;
    tracing::trace!(captures = regex.captures_len(), "compiled regular expression");
    *compiled = Some(Compiled {
      pattern: pattern.to_vec(),
      case_sensitive,
      utf8,
      regex,
    });
  }
  match compiled {
    Some(compiled) => Ok(&compiled.regex),
    None => Err(RegexError::NoPrevious),
  }
}

#[derive(Debug, Default)]
pub struct StandardSearch {
  compiled: Option<Compiled>,
  captures: Captures,
}

impl StandardSearch {
  pub fn find_text(
    &mut self,
    doc: &Document,
    min: usize,
    max: usize,
    pattern: &[u8],
    flags: FindFlags,
  ) -> Result<Option<(usize, usize)>> {
    let utf8 = doc.encoding().is_utf8();
    let regex = compile(&mut self.compiled, pattern, flags.contains(FindFlags::MATCH_CASE), utf8)?;
    let mut groups = regex.create_captures();
    let range = SearchRange::new(doc, min, max);

    for span in range.lines(doc) {
      let haystack = doc.char_range(span.line_start, span.line_end - span.line_start);
      if let Some(found) = search_line(doc, regex, &haystack, span, range.forward, &mut groups) {
        return Ok(grab(&mut self.captures, doc, span.line_start, &found));
      }
    }
    Ok(None)
  }

  pub fn captures(&self) -> &Captures {
    &self.captures
  }
}

/// First match of the line going forwards, last one going backwards. A match
/// starting on a trail byte is skipped and the search goes on from the next
/// character, so a match overlapping it is still found.
fn search_line(
  doc: &Document,
  regex: &Regex,
  haystack: &[u8],
  span: LineSpan,
  forward: bool,
  groups: &mut Groups,
) -> Option<Groups> {
  let end = span.to - span.line_start;
  let mut at = span.from - span.line_start;
  let mut found = None;
  while at <= end {
    regex.search_captures(&Input::new(haystack).range(at..end), groups);
    let Some(whole) = groups.get_match() else {
      break;
    };
    let start = span.line_start + whole.start();
    if doc.move_position_outside_char(start, -1, false) != start {
      at = doc.move_position_outside_char(start + 1, 1, false) - span.line_start;
      continue;
    }
    found = Some(groups.clone());
    if forward {
      break;
    }
    at = whole.end().max(whole.start() + 1);
  }
  found
}

fn grab(captures: &mut Captures, doc: &Document, line_start: usize, groups: &Groups) -> Option<(usize, usize)> {
  let whole = groups.get_match()?;
  captures.clear();
  for index in 0..groups.group_len().min(MAX_TAG) {
    if let Some(span) = groups.get_group(index) {
      let end = doc.move_position_outside_char(line_start + span.end, 1, false);
      captures.set(index, line_start + span.start, end);
    }
  }
  let start = line_start + whole.start();
  let end = doc.move_position_outside_char(line_start + whole.end(), 1, false);
  Some((start, end - start))
}
