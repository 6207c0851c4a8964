//! Byte storage with a line index, style bytes and undo history.
//!
//! [`CellBuffer`] is the single choke point for content changes: every
//! insertion and deletion, including undo and redo replay, goes through
//! `basic_insert_string` / `basic_delete_chars`, which keep the line index in
//! step with the bytes. CR, LF and CRLF always end lines; with Unicode line
//! ends enabled NEL, LS and PS do as well.

use quill_core::{
  line_ending::LineEndTypes,
  utf8,
};
use quill_stdx::{
  Partitioning,
  SplitVector,
  split_vector::Result,
};

use crate::{
  per_line::PerLine,
  undo::{
    Action,
    ActionKind,
    UndoHistory,
  },
};

#[derive(Debug, Clone)]
pub struct CellBuffer {
  substance:       SplitVector<u8>,
  style:           SplitVector<u8>,
  has_styles:      bool,
  read_only:       bool,
  utf8_line_ends:  bool,
  collecting_undo: bool,
  undo:            UndoHistory,
  lines:           Partitioning,
}

impl Default for CellBuffer {
  fn default() -> Self {
    Self::new(true)
  }
}

impl CellBuffer {
  pub fn new(has_styles: bool) -> Self {
    let mut substance = SplitVector::new();
    substance.set_grow_size(4096);
    Self {
      substance,
      style: SplitVector::new(),
      has_styles,
      read_only: false,
      utf8_line_ends: false,
      collecting_undo: true,
      undo: UndoHistory::new(),
      lines: Partitioning::new(),
    }
  }

  /// Byte at `position`, 0 outside the buffer.
  #[inline]
  pub fn char_at(&self, position: usize) -> u8 {
    self.substance.value_at(position)
  }

  /// Byte `back` places before `position`, 0 before the start.
  #[inline]
  pub fn char_before(&self, position: usize, back: usize) -> u8 {
    position
      .checked_sub(back)
      .map_or(0, |pos| self.substance.value_at(pos))
  }

  /// Bytes of `[position, position + len)` as the halves around the gap.
  pub fn range(&self, position: usize, len: usize) -> (&[u8], &[u8]) {
    self.substance.range(position, len)
  }

  /// Bytes of `[position, position + len)` as one slice, moving the gap
  /// when it splits the range.
  pub fn range_contiguous(&mut self, position: usize, len: usize) -> &[u8] {
    self.substance.range_contiguous(position, len)
  }

  /// Copies `[position, position + len)`. Ranges reaching past the end are
  /// clipped.
  pub fn char_range(&self, position: usize, len: usize) -> Vec<u8> {
    self.substance.to_vec(position, len)
  }

  #[inline]
  pub fn style_at(&self, position: usize) -> u8 {
    if self.has_styles {
      self.style.value_at(position)
    } else {
      0
    }
  }

  /// Styles of `[position, position + len)`; zeros without style storage.
  pub fn style_range(&self, position: usize, len: usize) -> Vec<u8> {
    if self.has_styles {
      self.style.to_vec(position, len)
    } else {
      vec![0; len.min(self.len().saturating_sub(position))]
    }
  }

  #[inline]
  pub fn gap_position(&self) -> usize {
    self.substance.gap_position()
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.substance.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.substance.is_empty()
  }

  /// Reserves room for `new_size` bytes.
  pub fn allocate(&mut self, new_size: usize) -> Result<()> {
    self.substance.reserve(new_size)?;
    if self.has_styles {
      self.style.reserve(new_size)?;
    }
    Ok(())
  }

  /// Inserts `s` at `position`, recording an undo action when collecting.
  /// Returns true when the action starts a new undo turn. Read only buffers
  /// are left untouched.
  pub fn insert_string(
    &mut self,
    position: usize,
    s: &[u8],
    per_line: &mut dyn PerLine,
  ) -> Result<bool> {
    if self.read_only {
      return Ok(false);
    }
    self.basic_insert_string(position, s, per_line)?;
    let start_sequence = self.collecting_undo
      && self
        .undo
        .append_action(ActionKind::Insert, position, s, true);
    Ok(start_sequence)
  }

  /// Deletes `delete_len` bytes at `position`, recording them for undo when
  /// collecting. Returns true when the action starts a new undo turn.
  pub fn delete_chars(
    &mut self,
    position: usize,
    delete_len: usize,
    per_line: &mut dyn PerLine,
  ) -> bool {
    if self.read_only {
      return false;
    }
    let mut start_sequence = false;
    if self.collecting_undo {
      let removed = self.substance.range_contiguous(position, delete_len).to_vec();
      start_sequence = self
        .undo
        .append_action(ActionKind::Remove, position, &removed, true);
    }
    self.basic_delete_chars(position, delete_len, per_line);
    start_sequence
  }

  /// Returns true when the style changed.
  pub fn set_style_at(&mut self, position: usize, style: u8) -> bool {
    if !self.has_styles || self.style.value_at(position) == style {
      return false;
    }
    self.style.set_value_at(position, style);
    true
  }

  /// Styles `[position, position + len)`. Returns true when any style
  /// changed.
  pub fn set_style_for(&mut self, position: usize, len: usize, style: u8) -> bool {
    if !self.has_styles {
      return false;
    }
    let end = position.saturating_add(len).min(self.style.len());
    let mut changed = false;
    for pos in position..end {
      if self.style.value_at(pos) != style {
        self.style.set_value_at(pos, style);
        changed = true;
      }
    }
    changed
  }

  #[inline]
  pub fn has_styles(&self) -> bool {
    self.has_styles
  }

  #[inline]
  pub fn is_read_only(&self) -> bool {
    self.read_only
  }

  pub fn set_read_only(&mut self, read_only: bool) {
    self.read_only = read_only;
  }

  /// Switches Unicode line ends on or off and rebuilds the line index.
  pub fn set_line_end_types(
    &mut self,
    types: LineEndTypes,
    per_line: &mut dyn PerLine,
  ) -> Result<()> {
    let utf8_line_ends = types.contains(LineEndTypes::UNICODE);
    if self.utf8_line_ends != utf8_line_ends {
      self.utf8_line_ends = utf8_line_ends;
      self.reset_line_ends(per_line)?;
    }
    Ok(())
  }

  #[inline]
  pub fn line_end_types(&self) -> LineEndTypes {
    if self.utf8_line_ends {
      LineEndTypes::UNICODE
    } else {
      LineEndTypes::DEFAULT
    }
  }

  /// True when `s` contains a line end of the active kinds.
  pub fn contains_line_end(&self, s: &[u8]) -> bool {
    let mut ch_before_prev = 0;
    let mut ch_prev = 0;
    for &ch in s {
      if ch == b'\r' || ch == b'\n' {
        return true;
      }
      if self.utf8_line_ends
        && (utf8::is_separator(ch_before_prev, ch_prev, ch) || utf8::is_nel(ch_prev, ch))
      {
        return true;
      }
      ch_before_prev = ch_prev;
      ch_prev = ch;
    }
    false
  }

  #[inline]
  pub fn lines(&self) -> usize {
    self.lines.partitions()
  }

  /// Start of `line`, or the length for lines past the end.
  pub fn line_start(&self, line: usize) -> usize {
    if line >= self.lines() {
      self.len()
    } else {
      self.lines.position_from_partition(line)
    }
  }

  #[inline]
  pub fn line_from_position(&self, position: usize) -> usize {
    self.lines.partition_from_position(position)
  }

  // Undo history.

  #[inline]
  pub fn undo_history(&self) -> &UndoHistory {
    &self.undo
  }

  pub fn set_save_point(&mut self) {
    self.undo.set_save_point();
  }

  pub fn is_save_point(&self) -> bool {
    self.undo.is_save_point()
  }

  pub fn tentative_start(&mut self) {
    self.undo.tentative_start();
  }

  pub fn tentative_commit(&mut self) {
    self.undo.tentative_commit();
  }

  pub fn tentative_steps(&self) -> Option<usize> {
    self.undo.tentative_steps()
  }

  pub fn tentative_active(&self) -> bool {
    self.undo.tentative_active()
  }

  /// Turning collection on or off ends any open group.
  pub fn set_undo_collection(&mut self, collect_undo: bool) -> bool {
    self.collecting_undo = collect_undo;
    self.undo.drop_undo_sequence();
    self.collecting_undo
  }

  #[inline]
  pub fn is_collecting_undo(&self) -> bool {
    self.collecting_undo
  }

  pub fn begin_undo_action(&mut self, may_coalesce: bool) {
    self.undo.begin_undo_action(may_coalesce);
  }

  pub fn end_undo_action(&mut self) {
    self.undo.end_undo_action();
  }

  pub fn add_undo_action(&mut self, token: usize, may_coalesce: bool) {
    self
      .undo
      .append_action(ActionKind::Container, token, &[], may_coalesce);
  }

  pub fn delete_undo_history(&mut self) {
    self.undo.delete_undo_history();
  }

  pub fn can_undo(&self) -> bool {
    self.undo.can_undo()
  }

  pub fn start_undo(&self) -> usize {
    self.undo.start_undo()
  }

  pub fn undo_step(&self) -> &Action {
    self.undo.undo_step()
  }

  pub fn perform_undo_step(&mut self, per_line: &mut dyn PerLine) -> Result<()> {
    let action = self.undo.undo_step().clone();
    match action.kind {
      ActionKind::Insert => {
        let len = action.len().min(self.len().saturating_sub(action.position));
        self.basic_delete_chars(action.position, len, per_line);
      },
      ActionKind::Remove => self.basic_insert_string(action.position, &action.data, per_line)?,
      ActionKind::Container => {},
    }
    self.undo.completed_undo_step();
    Ok(())
  }

  pub fn can_redo(&self) -> bool {
    self.undo.can_redo()
  }

  pub fn start_redo(&self) -> usize {
    self.undo.start_redo()
  }

  pub fn redo_step(&self) -> &Action {
    self.undo.redo_step()
  }

  pub fn perform_redo_step(&mut self, per_line: &mut dyn PerLine) -> Result<()> {
    let action = self.undo.redo_step().clone();
    match action.kind {
      ActionKind::Insert => self.basic_insert_string(action.position, &action.data, per_line)?,
      ActionKind::Remove => self.basic_delete_chars(action.position, action.len(), per_line),
      ActionKind::Container => {},
    }
    self.undo.completed_redo_step();
    Ok(())
  }

  // Line index maintenance.

  fn init_lines(&mut self, per_line: &mut dyn PerLine) {
    self.lines.delete_all();
    per_line.init();
  }

  /// Per line data of a line inserted at its own start belongs to the line
  /// above, which is the one that moved.
  fn insert_line(
    &mut self,
    line: usize,
    position: usize,
    line_start: bool,
    per_line: &mut dyn PerLine,
  ) -> Result<()> {
    self.lines.insert_partition(line, position)?;
    let data_line = if line > 0 && line_start { line - 1 } else { line };
    per_line.insert_line(data_line)
  }

  fn remove_line(&mut self, line: usize, per_line: &mut dyn PerLine) {
    self.lines.remove_partition(line);
    per_line.remove_line(line);
  }

  /// True when `position` falls inside a NEL, LS or PS sequence.
  fn utf8_line_end_overlaps(&self, position: usize) -> bool {
    let b0 = self.char_before(position, 2);
    let b1 = self.char_before(position, 1);
    let b2 = self.char_at(position);
    let b3 = self.char_at(position + 1);
    utf8::is_separator(b0, b1, b2) || utf8::is_separator(b1, b2, b3) || utf8::is_nel(b1, b2)
  }

  fn reset_line_ends(&mut self, per_line: &mut dyn PerLine) -> Result<()> {
    self.init_lines(per_line);

    let length = self.len();
    let mut line_insert = 1;
    self.lines.insert_text(0, length as isize);
    let mut ch_before_prev = 0;
    let mut ch_prev = 0;
    for i in 0..length {
      let ch = self.substance.value_at(i);
      if ch == b'\r' {
        self.insert_line(line_insert, i + 1, true, per_line)?;
        line_insert += 1;
      } else if ch == b'\n' {
        if ch_prev == b'\r' {
          self.lines.set_partition_start_position(line_insert - 1, i + 1);
        } else {
          self.insert_line(line_insert, i + 1, true, per_line)?;
          line_insert += 1;
        }
      } else if self.utf8_line_ends
        && (utf8::is_separator(ch_before_prev, ch_prev, ch) || utf8::is_nel(ch_prev, ch))
      {
        self.insert_line(line_insert, i + 1, true, per_line)?;
        line_insert += 1;
      }
      ch_before_prev = ch_prev;
      ch_prev = ch;
    }
    Ok(())
  }

  fn basic_insert_string(
    &mut self,
    position: usize,
    s: &[u8],
    per_line: &mut dyn PerLine,
  ) -> Result<()> {
    if s.is_empty() {
      return Ok(());
    }
    tracing::trace!(position, len = s.len(), "insert");

    let ch_after = self.char_at(position);
    let breaking_utf8_line_end = self.utf8_line_ends
      && utf8::is_trail_byte(ch_after)
      && self.utf8_line_end_overlaps(position);

    let line_position = self.line_from_position(position);
    let mut line_insert = line_position + 1;

    self.substance.insert_from_slice(position, s)?;
    if self.has_styles {
      self.style.insert_value(position, s.len(), 0)?;
    }

    let at_line_start = self.lines.position_from_partition(line_insert - 1) == position;
    // Every line after the insertion point moves along.
    self.lines.insert_text(line_insert - 1, s.len() as isize);
    let mut ch_before_prev = self.char_before(position, 2);
    let mut ch_prev = self.char_before(position, 1);
    if ch_prev == b'\r' && ch_after == b'\n' {
      // Splitting a CRLF pair.
      self.insert_line(line_insert, position, false, per_line)?;
      line_insert += 1;
    }
    if breaking_utf8_line_end {
      self.remove_line(line_insert, per_line);
    }

    let mut ch = b' ';
    for (i, &byte) in s.iter().enumerate() {
      ch = byte;
      let after = position + i + 1;
      if ch == b'\r' {
        self.insert_line(line_insert, after, at_line_start, per_line)?;
        line_insert += 1;
      } else if ch == b'\n' {
        if ch_prev == b'\r' {
          // The CR already ended the line; move its end past the LF.
          self.lines.set_partition_start_position(line_insert - 1, after);
        } else {
          self.insert_line(line_insert, after, at_line_start, per_line)?;
          line_insert += 1;
        }
      } else if self.utf8_line_ends
        && (utf8::is_separator(ch_before_prev, ch_prev, ch) || utf8::is_nel(ch_prev, ch))
      {
        self.insert_line(line_insert, after, at_line_start, per_line)?;
        line_insert += 1;
      }
      ch_before_prev = ch_prev;
      ch_prev = ch;
    }

    if ch_after == b'\n' {
      if ch == b'\r' {
        // Inserted CR joins the LF already in the buffer.
        self.remove_line(line_insert - 1, per_line);
      }
    } else if self.utf8_line_ends && !utf8::is_ascii(ch_after) {
      // The inserted text may start a separator that the buffer completes.
      let end = position + s.len();
      for j in 0..utf8::LS.len() - 1 {
        let ch_at = self.char_at(end + j);
        if utf8::is_separator(ch_before_prev, ch_prev, ch_at) {
          self.insert_line(line_insert, end + j + 1, at_line_start, per_line)?;
          line_insert += 1;
        }
        if j == 0 && utf8::is_nel(ch_prev, ch_at) {
          self.insert_line(line_insert, end + j + 1, at_line_start, per_line)?;
          line_insert += 1;
        }
        ch_before_prev = ch_prev;
        ch_prev = ch_at;
      }
    }
    Ok(())
  }

  fn basic_delete_chars(&mut self, position: usize, delete_len: usize, per_line: &mut dyn PerLine) {
    if delete_len == 0 {
      return;
    }
    tracing::trace!(position, len = delete_len, "delete");

    if position == 0 && delete_len == self.len() {
      self.init_lines(per_line);
    } else {
      // Line starts are fixed up before the bytes go since the removed bytes
      // tell which lines disappear.
      let line_position = self.line_from_position(position);
      let mut line_remove = line_position + 1;

      self.lines.insert_text(line_remove - 1, -(delete_len as isize));
      let ch_before = self.char_before(position, 1);
      let mut ch_next = self.char_at(position);

      let mut ignore_nl = false;
      if ch_before == b'\r' && ch_next == b'\n' {
        // Deleting from between CR and LF.
        self.lines.set_partition_start_position(line_remove, position);
        line_remove += 1;
        ignore_nl = true;
      }
      if self.utf8_line_ends
        && utf8::is_trail_byte(ch_next)
        && self.utf8_line_end_overlaps(position)
      {
        self.remove_line(line_remove, per_line);
      }

      let mut ch = ch_next;
      for i in 0..delete_len {
        ch_next = self.char_at(position + i + 1);
        if ch == b'\r' {
          if ch_next != b'\n' {
            self.remove_line(line_remove, per_line);
          }
        } else if ch == b'\n' {
          if ignore_nl {
            ignore_nl = false;
          } else {
            self.remove_line(line_remove, per_line);
          }
        } else if self.utf8_line_ends && !utf8::is_ascii(ch) {
          let ch_next2 = self.char_at(position + i + 2);
          if utf8::is_separator(ch, ch_next, ch_next2) || utf8::is_nel(ch, ch_next) {
            self.remove_line(line_remove, per_line);
          }
        }
        ch = ch_next;
      }

      // The deletion may bring a CR next to an LF.
      let ch_after = self.char_at(position + delete_len);
      if ch_before == b'\r' && ch_after == b'\n' {
        self.remove_line(line_remove - 1, per_line);
        self
          .lines
          .set_partition_start_position(line_remove - 1, position + 1);
      }
    }

    self.substance.delete_range(position, delete_len);
    if self.has_styles {
      self.style.delete_range(position, delete_len);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct NoLines;

  impl PerLine for NoLines {
    fn init(&mut self) {}

    fn insert_line(&mut self, _line: usize) -> Result<()> {
      Ok(())
    }

    fn remove_line(&mut self, _line: usize) {}
  }

  /// Fails every line insertion.
  struct FullLines;

  impl PerLine for FullLines {
    fn init(&mut self) {}

    fn insert_line(&mut self, _line: usize) -> Result<()> {
      Err(Vec::<u8>::new().try_reserve(usize::MAX).unwrap_err().into())
    }

    fn remove_line(&mut self, _line: usize) {}
  }

  fn buffer(text: &[u8]) -> CellBuffer {
    let mut cb = CellBuffer::new(true);
    cb.insert_string(0, text, &mut NoLines).unwrap();
    cb
  }

  fn line_starts(cb: &CellBuffer) -> Vec<usize> {
    (0..=cb.lines()).map(|line| cb.line_start(line)).collect()
  }

  /// Line starts found by scanning the text directly.
  fn scan_line_starts(text: &[u8]) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, &b) in text.iter().enumerate() {
      let crlf = b == b'\r' && text.get(i + 1) == Some(&b'\n');
      if (b == b'\r' && !crlf) || b == b'\n' {
        starts.push(i + 1);
      }
    }
    starts.push(text.len());
    starts
  }

  #[test]
  fn line_index_tracks_all_line_ends() {
    let cb = buffer(b"a\nb\r\nc\rd");
    assert_eq!(cb.lines(), 4);
    assert_eq!(line_starts(&cb), vec![0, 2, 5, 7, 8]);
    assert_eq!(cb.line_from_position(4), 1);
    assert_eq!(cb.line_from_position(8), 3);
  }

  #[test]
  fn splitting_and_joining_crlf() {
    let mut cb = buffer(b"ab\r\ncd");
    // Insert between CR and LF: both become separate line ends.
    cb.insert_string(3, b"x", &mut NoLines).unwrap();
    assert_eq!(line_starts(&cb), scan_line_starts(b"ab\rx\ncd"));
    // Removing the x joins them again.
    cb.delete_chars(3, 1, &mut NoLines);
    assert_eq!(line_starts(&cb), vec![0, 4, 6]);

    // An inserted CR before an existing LF makes one line end.
    let mut cb = buffer(b"ab\ncd");
    cb.insert_string(2, b"\r", &mut NoLines).unwrap();
    assert_eq!(line_starts(&cb), vec![0, 4, 6]);
  }

  #[test]
  fn unicode_line_ends_are_optional() {
    let text = "a\u{2028}b\u{85}c".as_bytes();
    let mut cb = buffer(text);
    assert_eq!(cb.lines(), 1);
    cb.set_line_end_types(LineEndTypes::UNICODE, &mut NoLines)
      .unwrap();
    assert_eq!(cb.lines(), 3);
    assert_eq!(cb.line_start(1), 4);
    assert_eq!(cb.line_start(2), 7);

    // Deleting the LS joins the first two lines.
    cb.delete_chars(1, 3, &mut NoLines);
    assert_eq!(cb.lines(), 2);
    assert!(cb.contains_line_end("\u{2029}".as_bytes()));
  }

  #[test]
  fn undo_steps_replay_through_the_line_index() {
    let mut cb = buffer(b"one\ntwo");
    cb.delete_chars(3, 1, &mut NoLines);
    assert_eq!(cb.lines(), 1);
    assert_eq!(cb.start_undo(), 1);
    cb.perform_undo_step(&mut NoLines).unwrap();
    assert_eq!(cb.char_range(0, cb.len()), b"one\ntwo");
    assert_eq!(cb.lines(), 2);
    cb.perform_redo_step(&mut NoLines).unwrap();
    assert_eq!(cb.char_range(0, cb.len()), b"onetwo");
  }

  #[test]
  fn failed_inserts_leave_no_undo_step() {
    let mut cb = CellBuffer::new(true);
    assert!(cb.insert_string(0, b"a\nb", &mut FullLines).is_err());
    assert!(!cb.can_undo());

    let mut cb = buffer(b"abc");
    assert!(cb.insert_string(1, b"\n", &mut FullLines).is_err());
    assert_eq!(cb.undo_step().position, 0);
    assert_eq!(cb.undo_step().data, b"abc");
  }

  #[test]
  fn read_only_blocks_changes() {
    let mut cb = buffer(b"abc");
    cb.set_read_only(true);
    assert!(!cb.insert_string(0, b"x", &mut NoLines).unwrap());
    assert!(!cb.delete_chars(0, 1, &mut NoLines));
    assert_eq!(cb.char_range(0, 3), b"abc");
  }

  #[test]
  fn styles_follow_text() {
    let mut cb = buffer(b"abcd");
    assert!(cb.set_style_for(1, 2, 7));
    assert!(!cb.set_style_for(1, 2, 7));
    cb.insert_string(0, b"zz", &mut NoLines).unwrap();
    assert_eq!(cb.style_range(0, 6), vec![0, 0, 0, 7, 7, 0]);
    cb.delete_chars(0, 3, &mut NoLines);
    assert_eq!(cb.style_at(0), 7);

    let unstyled = CellBuffer::new(false);
    assert!(unstyled.style_range(0, 4).is_empty());
  }

  quickcheck::quickcheck! {
    fn line_index_matches_scan(edits: Vec<(u16, u8, bool)>) -> bool {
      const ALPHABET: &[u8] = b"ab\r\n";
      let mut cb = CellBuffer::new(false);
      let mut model: Vec<u8> = Vec::new();
      for (pos, sel, insert) in edits {
        let pos = usize::from(pos) % (model.len() + 1);
        if insert {
          let text = [ALPHABET[usize::from(sel) % 4], ALPHABET[usize::from(sel / 4) % 4]];
          let text = &text[..1 + usize::from(sel % 2)];
          cb.insert_string(pos, text, &mut NoLines).unwrap();
          model.splice(pos..pos, text.iter().copied());
        } else if pos < model.len() {
          let len = (1 + usize::from(sel) % 3).min(model.len() - pos);
          cb.delete_chars(pos, len, &mut NoLines);
          model.drain(pos..pos + len);
        }
      }
      line_starts(&cb) == scan_line_starts(&model)
    }
  }
}
