//! Character boundary arithmetic over the document's encoding.

use quill_core::{
  chars::is_space_or_tab,
  encoding::CharacterExtracted,
  utf8,
};

use super::Document;

impl Document {
  /// Clamps `position` into `[0, len]`.
  #[inline]
  pub fn clamp_position(&self, position: usize) -> usize {
    position.min(self.len())
  }

  /// True when a CR LF pair starts at `position`.
  pub fn is_crlf(&self, position: usize) -> bool {
    if position + 1 >= self.len() {
      return false;
    }
    self.cb.char_at(position) == b'\r' && self.cb.char_at(position + 1) == b'\n'
  }

  /// Bytes taken by the character at `position`; CR LF counts as one.
  pub fn len_char(&self, position: usize) -> usize {
    if self.is_crlf(position) {
      return 2;
    }
    if self.encoding.is_utf8() {
      let width = utf8::bytes_from_lead(self.cb.char_at(position));
      width.min(self.len().saturating_sub(position))
    } else if self.encoding.is_dbcs() {
      self.dbcs_char_width(position)
    } else {
      1
    }
  }

  /// Width of the DBCS character at `position`: 2 for a valid lead and
  /// trail pair, otherwise 1.
  pub(super) fn dbcs_char_width(&self, position: usize) -> usize {
    let bytes = [self.cb.char_at(position), self.cb.char_at(position + 1)];
    let available = 2.min(self.len().saturating_sub(position));
    self.encoding.char_width(&bytes[..available])
  }

  /// True when a valid lead and trail pair starts at `position`.
  pub(super) fn is_dbcs_dual_byte_at(&self, position: usize) -> bool {
    self.dbcs_char_width(position) == 2
  }

  /// The bounds of the valid UTF-8 character that `position` is in the
  /// middle of.
  fn in_good_utf8(&self, position: usize) -> Option<(usize, usize)> {
    let mut trail = position;
    while trail > 0
      && position - trail < utf8::MAX_BYTES
      && utf8::is_trail_byte(self.cb.char_at(trail - 1))
    {
      trail -= 1;
    }
    let start = trail.saturating_sub(1);
    let width = utf8::bytes_from_lead(self.cb.char_at(start));
    if width == 1 || position - start > width - 1 {
      return None;
    }
    let bytes = self.cb.char_range(start, width);
    if !utf8::classify(&bytes).valid {
      return None;
    }
    Some((start, start + width))
  }

  /// Moves `position` out of the middle of a character, towards the end
  /// when `move_dir` is positive. With `check_line_end`, a position between
  /// CR and LF also moves.
  pub fn move_position_outside_char(
    &self,
    position: usize,
    move_dir: isize,
    check_line_end: bool,
  ) -> usize {
    if position == 0 {
      return 0;
    }
    if position >= self.len() {
      return self.len();
    }
    if check_line_end && self.is_crlf(position - 1) {
      return if move_dir > 0 {
        position + 1
      } else {
        position - 1
      };
    }

    if self.encoding.is_utf8() {
      if utf8::is_trail_byte(self.cb.char_at(position)) {
        // An isolated trail byte is already a boundary.
        if let Some((start, end)) = self.in_good_utf8(position) {
          return if move_dir > 0 { end } else { start };
        }
      }
    } else if self.encoding.is_dbcs() {
      // A line start can never be a trail byte, so scan from there.
      let line_start = self.line_start(self.line_from_position(position));
      if position == line_start {
        return position;
      }
      let mut check = position;
      while check > line_start && self.encoding.is_dbcs_lead_byte(self.cb.char_at(check - 1)) {
        check -= 1;
      }
      while check < position {
        let next = check + self.dbcs_char_width(check);
        if next == position {
          return position;
        }
        if next > position {
          return if move_dir > 0 { next } else { check };
        }
        check = next;
      }
    }
    position
  }

  /// The character boundary after (`move_dir > 0`) or before `position`.
  /// `position` must already be a boundary.
  pub fn next_position(&self, position: usize, move_dir: isize) -> usize {
    let len = self.len();
    if move_dir > 0 {
      if position + 1 >= len {
        return len;
      }
    } else if position <= 1 {
      return 0;
    }

    if self.encoding.is_utf8() {
      if move_dir > 0 {
        let lead = self.cb.char_at(position);
        if utf8::is_ascii(lead) {
          return position + 1;
        }
        let bytes = self.cb.char_range(position, utf8::bytes_from_lead(lead));
        let class = utf8::classify(&bytes);
        return if class.valid {
          position + class.width
        } else {
          position + 1
        };
      }
      let previous = position - 1;
      if utf8::is_trail_byte(self.cb.char_at(previous)) {
        if let Some((start, _)) = self.in_good_utf8(previous) {
          return start;
        }
      }
      previous
    } else if self.encoding.is_dbcs() {
      if move_dir > 0 {
        return (position + self.dbcs_char_width(position)).min(len);
      }
      let line_start = self.line_start(self.line_from_position(position));
      if position - 1 <= line_start {
        return position - 1;
      }
      if self.encoding.is_dbcs_lead_byte(self.cb.char_at(position - 1)) {
        // Should be the trail byte of a pair; a broken pair is one byte.
        return if self.is_dbcs_dual_byte_at(position - 2) {
          position - 2
        } else {
          position - 1
        };
      }
      // Step back over the run of lead-like bytes. The parity of the run
      // decides whether the byte before `position` is a trail byte.
      let mut temp = position as isize - 1;
      loop {
        temp -= 1;
        if temp < line_start as isize
          || !self
            .encoding
            .is_dbcs_lead_byte(self.cb.char_at(temp as usize))
        {
          break;
        }
      }
      let width_last = ((position as isize - temp) & 1) as usize + 1;
      if width_last == 2 && self.is_dbcs_dual_byte_at(position - 2) {
        position - 2
      } else {
        position - 1
      }
    } else if move_dir > 0 {
      position + 1
    } else {
      position - 1
    }
  }

  /// Steps `position` onto the next boundary. Returns false at either end of
  /// the document.
  pub fn next_character(&self, position: &mut usize, move_dir: isize) -> bool {
    let next = self.next_position(*position, move_dir);
    if next == *position {
      false
    } else {
      *position = next;
      true
    }
  }

  /// The position `offset` characters away from `start`.
  pub fn relative_position(&self, start: usize, offset: isize) -> Option<usize> {
    if !self.encoding.is_multi_byte() {
      let position = start.checked_add_signed(offset)?;
      return (position <= self.len()).then_some(position);
    }
    let increment = if offset > 0 { 1 } else { -1 };
    let mut position = start;
    let mut remaining = offset;
    while remaining != 0 {
      let next = self.next_position(position, increment);
      if next == position {
        return None;
      }
      position = next;
      remaining -= increment;
    }
    Some(position)
  }

  /// Decodes the character at `position`.
  pub fn character_and_width(&self, position: usize) -> CharacterExtracted {
    let lead = self.cb.char_at(position);
    if !self.encoding.is_multi_byte() || (self.encoding.is_utf8() && utf8::is_ascii(lead)) {
      return CharacterExtracted::new(u32::from(lead), 1);
    }
    let bytes = self.cb.char_range(position, utf8::MAX_BYTES);
    self.encoding.decode(&bytes)
  }

  /// Characters in `[start, end)`; CR LF counts as one.
  pub fn count_characters(&self, start: usize, end: usize) -> usize {
    let start = self.move_position_outside_char(start, 1, false);
    let end = self.move_position_outside_char(end, -1, false);
    let mut count = 0;
    let mut i = start;
    while i < end {
      count += 1;
      if self.is_crlf(i) {
        i += 1;
      }
      i = self.next_position(i, 1);
    }
    count
  }

  /// UTF-16 code units needed for `[start, end)`.
  pub fn count_utf16(&self, start: usize, end: usize) -> usize {
    let start = self.move_position_outside_char(start, 1, false);
    let end = self.move_position_outside_char(end, -1, false);
    let mut count = 0;
    let mut i = start;
    while i < end {
      let next = self.next_position(i, 1);
      count += utf8::utf16_len_from_width(next - i);
      i = next;
    }
    count
  }

  /// Length of a prefix of `text` no longer than `segment_len` that ends at
  /// a good place to break: after white space, before punctuation, or at
  /// least on a character boundary.
  pub fn safe_segment(&self, text: &[u8], segment_len: usize) -> usize {
    if text.len() <= segment_len {
      return text.len();
    }
    let mut last_space_break = None;
    let mut last_punctuation_break = None;
    let mut last_encoding_break = 0;
    let mut j = 0;
    while j < segment_len {
      let ch = text[j];
      if j > 0 {
        if is_space_or_tab(text[j - 1]) && !is_space_or_tab(ch) {
          last_space_break = Some(j);
        }
        if ch < b'A' {
          last_punctuation_break = Some(j);
        }
      }
      last_encoding_break = j;
      j += if self.encoding.is_utf8() {
        utf8::bytes_from_lead(ch)
      } else if self.encoding.is_dbcs_lead_byte(ch) {
        2
      } else {
        1
      };
    }
    last_space_break
      .or(last_punctuation_break)
      .unwrap_or(last_encoding_break)
  }
}
