//! Literal and regular expression search.

use bitflags::bitflags;
use quill_core::utf8;

use super::Document;
use crate::{
  config::RegexEngine,
  regex::{
    self,
    RegexSearch,
  },
  watcher::Status,
};

bitflags! {
  /// Search options.
  #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
  pub struct FindFlags: u32 {
    /// The match must be a whole word.
    const WHOLE_WORD  = 0x2;
    const MATCH_CASE  = 0x4;
    /// The match must start a word.
    const WORD_START  = 0x0010_0000;
    const REGEXP      = 0x0020_0000;
    /// Builtin syntax: `(` `)` group without backslashes.
    const POSIX       = 0x0040_0000;
    /// Use the `regex-automata` engine whatever the document default.
    const CXX11_REGEX = 0x0080_0000;
  }
}

impl FindFlags {
  pub(crate) fn engine(self, default: RegexEngine) -> RegexEngine {
    if self.contains(Self::CXX11_REGEX) {
      RegexEngine::Standard
    } else {
      default
    }
  }
}

impl Document {
  /// Finds `pattern` between `min` and `max`, searching backwards when
  /// `min > max`. Returns the start and length of the match.
  ///
  /// Bounds inside a character snap to the boundary inside the range. Only
  /// regular expressions can fail, when the pattern does not compile.
  pub fn find_text(
    &mut self,
    min: usize,
    max: usize,
    pattern: &[u8],
    flags: FindFlags,
  ) -> regex::Result<Option<(usize, usize)>> {
    if pattern.is_empty() {
      return Ok(Some((min, 0)));
    }
    if flags.contains(FindFlags::REGEXP) {
      let engine = flags.engine(self.regex_engine);
      let mut regex = match self.regex.take() {
        Some(regex) if regex.engine() == engine => regex,
        _ => RegexSearch::new(engine),
      };
      let found = regex.find_text(self, min, max, pattern, flags);
      self.regex = Some(regex);
      if let Err(err) = &found {
        tracing::debug!(%err, "regular expression rejected");
        self.notify_error_occurred(Status::WarnRegex);
      }
      return found;
    }
    Ok(self.find_literal(min, max, pattern, flags))
  }

  fn find_literal(&self, min: usize, max: usize, pattern: &[u8], flags: FindFlags) -> Option<(usize, usize)> {
    let word = flags.contains(FindFlags::WHOLE_WORD);
    let word_start = flags.contains(FindFlags::WORD_START);
    let forward = min <= max;
    let increment: isize = if forward { 1 } else { -1 };

    let start = self.move_position_outside_char(min, increment, false);
    let end = self.move_position_outside_char(max, -increment, false);
    let limit = start.max(end);
    let len_find = pattern.len();
    let mut position = start;
    if !forward {
      // Back over all of a character.
      position = self.next_position(position, increment);
    }
    let in_range = |pos: usize, end_search: usize| {
      if forward {
        pos < end_search
      } else {
        pos >= end_search
      }
    };

    if flags.contains(FindFlags::MATCH_CASE) {
      let end_search = if forward {
        (end + 1).saturating_sub(len_find)
      } else {
        end
      };
      // Byte values that only start characters can be scanned for directly.
      let scan_first = forward
        && !self.encoding.is_dbcs()
        && !(self.encoding.is_utf8() && utf8::is_trail_byte(pattern[0]));
      while in_range(position, end_search) {
        if scan_first {
          match self.find_byte(pattern[0], position, end_search) {
            Some(found) => position = found,
            None => break,
          }
        }
        if self.cb.char_at(position) == pattern[0] {
          let found = position + len_find <= limit
            && (1..len_find).all(|i| self.cb.char_at(position + i) == pattern[i]);
          if found && self.matches_word_options(word, word_start, position, len_find) {
            return Some((position, len_find));
          }
        }
        if !self.next_character(&mut position, increment) {
          break;
        }
      }
    } else if self.encoding.is_utf8() {
      let search = self.case_folder.fold(pattern);
      let mut folded = Vec::with_capacity(utf8::MAX_BYTES * 4);
      while in_range(position, end) {
        let mut width_first = 0;
        let mut index_document = position;
        let mut index_search = 0;
        let mut matches = true;
        loop {
          let lead = self.cb.char_at(index_document);
          let width = if utf8::is_ascii(lead) {
            1
          } else {
            let bytes = self.cb.char_range(index_document, utf8::bytes_from_lead(lead));
            utf8::classify(&bytes).width
          };
          if width_first == 0 {
            width_first = width;
          }
          if index_document + width > limit {
            break;
          }
          folded.clear();
          self
            .case_folder
            .fold_into(&self.cb.char_range(index_document, width), &mut folded);
          matches = search[index_search..].starts_with(&folded);
          if !matches {
            break;
          }
          index_document += width;
          index_search += folded.len();
          if index_search >= search.len() {
            break;
          }
        }
        if matches
          && index_search == search.len()
          && self.matches_word_options(word, word_start, position, index_document - position)
        {
          return Some((position, index_document - position));
        }
        if forward {
          position += width_first;
        } else if !self.next_character(&mut position, increment) {
          break;
        }
      }
    } else if self.encoding.is_dbcs() {
      let search = self.case_folder.fold(pattern);
      let mut folded = Vec::with_capacity(8);
      while in_range(position, end) {
        let mut index_document = 0;
        let mut index_search = 0;
        let mut matches = true;
        while matches && position + index_document < limit && index_search < search.len() {
          let width = self.dbcs_char_width(position + index_document);
          if position + index_document + width > limit {
            break;
          }
          folded.clear();
          self
            .case_folder
            .fold_into(&self.cb.char_range(position + index_document, width), &mut folded);
          matches = search[index_search..].starts_with(&folded);
          index_document += width;
          index_search += folded.len();
        }
        if matches
          && index_search == search.len()
          && self.matches_word_options(word, word_start, position, index_document)
        {
          return Some((position, index_document));
        }
        if !self.next_character(&mut position, increment) {
          break;
        }
      }
    } else {
      let end_search = if forward {
        (end + 1).saturating_sub(len_find)
      } else {
        end
      };
      let search = self.case_folder.fold(pattern);
      let mut folded = Vec::with_capacity(1);
      while in_range(position, end_search) {
        let found = position + len_find <= limit
          && (0..len_find).all(|i| {
            folded.clear();
            self.case_folder.fold_into(&[self.cb.char_at(position + i)], &mut folded);
            folded.first() == search.get(i)
          });
        if found && self.matches_word_options(word, word_start, position, len_find) {
          return Some((position, len_find));
        }
        if !self.next_character(&mut position, increment) {
          break;
        }
      }
    }
    None
  }

  /// First `byte` in `[from, to)`.
  fn find_byte(&self, byte: u8, from: usize, to: usize) -> Option<usize> {
    let (first, second) = self.cb.range(from, to - from);
    first
      .iter()
      .chain(second)
      .position(|&b| b == byte)
      .map(|offset| from + offset)
  }

  /// Expands `\0` to `\9` and the usual escapes in `text` against the last
  /// regular expression match. `None` before any regular expression search.
  pub fn substitute_by_position(&self, text: &[u8]) -> Option<Vec<u8>> {
    self
      .regex
      .as_ref()
      .map(|regex| regex.substitute_by_position(self, text))
  }
}
