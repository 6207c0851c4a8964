//! Word and word part boundaries.

use quill_core::{
  chars::{
    CharClass,
    code_point_class,
    is_ascii_lower,
    is_ascii_upper,
    is_punctuation,
    is_space_char,
  },
  encoding::CharacterExtracted,
};

use super::Document;

impl Document {
  /// Class of a decoded character for word movement.
  ///
  /// ASCII and single byte text go through the configurable byte table.
  /// Other UTF-8 characters are classed by Unicode category, and double
  /// byte characters are words.
  pub fn character_class(&self, ch: CharacterExtracted) -> CharClass {
    let byte = u8::try_from(ch.character).ok();
    match byte {
      Some(b) if b.is_ascii() || !self.encoding.is_multi_byte() => self.char_class.class(b),
      _ if self.encoding.is_utf8() => code_point_class(ch.character),
      Some(b) if ch.width == 1 => self.char_class.class(b),
      _ => CharClass::Word,
    }
  }

  /// Class and width of the character at `position`.
  fn class_at(&self, position: usize) -> (CharClass, usize) {
    let ch = self.character_and_width(position);
    (self.character_class(ch), ch.width)
  }

  /// Class and start of the character before `position`.
  fn class_before(&self, position: usize) -> (CharClass, usize) {
    let start = self.next_position(position, -1);
    (self.character_class(self.character_and_width(start)), start)
  }

  fn back_while(&self, mut position: usize, keep: impl Fn(CharClass) -> bool) -> usize {
    while position > 0 {
      let (class, start) = self.class_before(position);
      if !keep(class) {
        break;
      }
      position = start;
    }
    position
  }

  fn forward_while(&self, mut position: usize, keep: impl Fn(CharClass) -> bool) -> usize {
    let len = self.len();
    while position < len {
      let (class, width) = self.class_at(position);
      if !keep(class) {
        break;
      }
      position = (position + width).min(len);
    }
    position
  }

  /// Start (`delta < 0`) or end of the run of same class characters around
  /// `position`. With `only_word_chars` only word runs are crossed.
  pub fn extend_word_select(&self, position: usize, delta: isize, only_word_chars: bool) -> usize {
    let mut class_start = CharClass::Word;
    let position = if delta < 0 {
      if !only_word_chars && position > 0 {
        class_start = self.class_before(position).0;
      }
      self.back_while(position, |class| class == class_start)
    } else {
      if !only_word_chars && position < self.len() {
        class_start = self.class_at(position).0;
      }
      self.forward_while(position, |class| class == class_start)
    };
    self.move_position_outside_char(position, delta, true)
  }

  /// Start of the next word in the direction of `delta`, skipping spaces.
  pub fn next_word_start(&self, mut position: usize, delta: isize) -> usize {
    if delta < 0 {
      position = self.back_while(position, |class| class == CharClass::Space);
      if position > 0 {
        let class_start = self.class_before(position).0;
        position = self.back_while(position, |class| class == class_start);
      }
    } else {
      let class_start = self.class_at(position).0;
      position = self.forward_while(position, |class| class == class_start);
      position = self.forward_while(position, |class| class == CharClass::Space);
    }
    position
  }

  /// End of the next word in the direction of `delta`, skipping spaces.
  pub fn next_word_end(&self, mut position: usize, delta: isize) -> usize {
    if delta < 0 {
      if position > 0 {
        let class_start = self.class_before(position).0;
        if class_start != CharClass::Space {
          position = self.back_while(position, |class| class == class_start);
        }
        position = self.back_while(position, |class| class == CharClass::Space);
      }
    } else {
      position = self.forward_while(position, |class| class == CharClass::Space);
      if position < self.len() {
        let class_start = self.class_at(position).0;
        position = self.forward_while(position, |class| class == class_start);
      }
    }
    position
  }

  /// True when a word or punctuation run starts at `position`.
  pub fn is_word_start_at(&self, position: usize) -> bool {
    if position == 0 {
      return true;
    }
    let (class, _) = self.class_at(position);
    matches!(class, CharClass::Word | CharClass::Punctuation) && class != self.class_before(position).0
  }

  /// True when a word or punctuation run ends at `position`.
  pub fn is_word_end_at(&self, position: usize) -> bool {
    if position >= self.len() {
      return true;
    }
    let (class, _) = self.class_before(position);
    matches!(class, CharClass::Word | CharClass::Punctuation) && class != self.class_at(position).0
  }

  /// True when `[start, end)` is a whole, non empty word.
  pub fn is_word_at(&self, start: usize, end: usize) -> bool {
    start < end && self.is_word_start_at(start) && self.is_word_end_at(end)
  }

  /// Applies the whole word and word start search options to a match.
  pub fn matches_word_options(&self, word: bool, word_start: bool, position: usize, len: usize) -> bool {
    (!word && !word_start)
      || (word && self.is_word_at(position, position + len))
      || (word_start && self.is_word_start_at(position))
  }

  /// Punctuation that is classified as part of words, such as `_`.
  pub fn is_word_part_separator(&self, b: u8) -> bool {
    self.char_class.class(b) == CharClass::Word && is_punctuation(b)
  }

  /// Start of the word part before `position`. Parts are split at case
  /// changes, digit runs and separators, as in `camelCase` or `snake_case`.
  pub fn word_part_left(&self, mut position: usize) -> usize {
    if position == 0 {
      return position;
    }
    position -= 1;
    let at = |pos: usize| self.cb.char_at(pos);
    if self.is_word_part_separator(at(position)) {
      while position > 0 && self.is_word_part_separator(at(position)) {
        position -= 1;
      }
    }
    if position == 0 {
      return position;
    }
    let start = at(position);
    position -= 1;
    let skip_back = |mut pos: usize, keep: &dyn Fn(u8) -> bool, stop_ok: &dyn Fn(u8) -> bool| {
      while pos > 0 && keep(at(pos)) {
        pos -= 1;
      }
      if !stop_ok(at(pos)) {
        pos += 1;
      }
      pos
    };
    if is_ascii_lower(start) {
      skip_back(position, &is_ascii_lower, &|b: u8| is_ascii_upper(b) || is_ascii_lower(b))
    } else if is_ascii_upper(start) {
      skip_back(position, &is_ascii_upper, &is_ascii_upper)
    } else if start.is_ascii_digit() {
      skip_back(position, &|b: u8| b.is_ascii_digit(), &|b: u8| b.is_ascii_digit())
    } else if is_punctuation(start) {
      skip_back(position, &is_punctuation, &is_punctuation)
    } else if is_space_char(start) {
      skip_back(position, &is_space_char, &is_space_char)
    } else if !start.is_ascii() {
      skip_back(position, &|b: u8| !b.is_ascii(), &|b: u8| !b.is_ascii())
    } else {
      position + 1
    }
  }

  /// End of the word part at `position`.
  pub fn word_part_right(&self, mut position: usize) -> usize {
    let len = self.len();
    let at = |pos: usize| self.cb.char_at(pos);
    let mut start = at(position);
    if self.is_word_part_separator(start) {
      while position < len && self.is_word_part_separator(at(position)) {
        position += 1;
      }
      start = at(position);
    }
    let skip = |mut pos: usize, keep: &dyn Fn(u8) -> bool| {
      while pos < len && keep(at(pos)) {
        pos += 1;
      }
      pos
    };
    if !start.is_ascii() {
      position = skip(position, &|b: u8| !b.is_ascii());
    } else if is_ascii_lower(start) {
      position = skip(position, &is_ascii_lower);
    } else if is_ascii_upper(start) {
      if is_ascii_lower(at(position + 1)) {
        position = skip(position + 1, &is_ascii_lower);
      } else {
        position = skip(position, &is_ascii_upper);
      }
      // "HTMLParser": the last capital starts the next part.
      if is_ascii_lower(at(position)) && is_ascii_upper(self.cb.char_before(position, 1)) {
        position -= 1;
      }
    } else if start.is_ascii_digit() {
      position = skip(position, &|b: u8| b.is_ascii_digit());
    } else if is_punctuation(start) {
      position = skip(position, &is_punctuation);
    } else if is_space_char(start) {
      position = skip(position, &is_space_char);
    } else {
      position += 1;
    }
    position.min(len)
  }
}
