//! Line geometry and the data attached to lines.

use quill_core::{
  chars::is_space_or_tab,
  line_ending::LineEndTypes,
  utf8,
};

use super::Document;
use crate::{
  per_line::{
    FOLD_LEVEL_HEADER_FLAG,
    FOLD_LEVEL_WHITE_FLAG,
    MarkerHandle,
    StyledText,
    fold_level_number,
  },
  watcher::{
    DocModification,
    ModificationFlags,
  },
};

/// Lines at `level_try` belong to a fold headed at `level_start`.
fn is_subordinate(level_start: u32, level_try: u32) -> bool {
  if level_try & FOLD_LEVEL_WHITE_FLAG != 0 {
    true
  } else {
    fold_level_number(level_start) < fold_level_number(level_try)
  }
}

impl Document {
  /// Position of the line end of `line`, before its terminator.
  pub fn line_end(&self, line: usize) -> usize {
    if line + 1 >= self.lines_total() {
      return self.line_start(line + 1);
    }
    let mut position = self.line_start(line + 1);
    if self.cb.line_end_types().contains(LineEndTypes::UNICODE) {
      let b0 = self.cb.char_before(position, 3);
      let b1 = self.cb.char_before(position, 2);
      let b2 = self.cb.char_before(position, 1);
      if utf8::is_separator(b0, b1, b2) {
        return position - utf8::LS.len();
      }
      if utf8::is_nel(b1, b2) {
        return position - utf8::NEL.len();
      }
    }
    // Back over the CR or LF, then over the CR of a CR LF.
    position -= 1;
    if position > self.line_start(line) && self.cb.char_at(position - 1) == b'\r' {
      position -= 1;
    }
    position
  }

  pub fn line_end_position(&self, position: usize) -> usize {
    self.line_end(self.line_from_position(position))
  }

  pub fn is_line_end_position(&self, position: usize) -> bool {
    self.line_end_position(position) == position
  }

  /// True for positions at or inside the terminator of their line.
  pub fn is_position_in_line_end(&self, position: usize) -> bool {
    position >= self.line_end_position(position)
  }

  /// Start of the text on the line of `position`, or the line start when
  /// `position` is already there.
  pub fn vc_home_position(&self, position: usize) -> usize {
    let line = self.line_from_position(position);
    let start = self.line_start(line);
    let end = self.line_end(line);
    let mut start_text = start;
    while start_text < end && is_space_or_tab(self.cb.char_at(start_text)) {
      start_text += 1;
    }
    if position == start_text {
      start
    } else {
      start_text
    }
  }

  /// True when `line` holds nothing but spaces and tabs.
  pub fn is_white_line(&self, line: usize) -> bool {
    (self.line_start(line)..self.line_end(line)).all(|pos| is_space_or_tab(self.cb.char_at(pos)))
  }

  /// Start of the paragraph before the one containing `position`.
  pub fn para_up(&self, position: usize) -> usize {
    let mut line = self.line_from_position(position) as isize - 1;
    while line >= 0 && self.is_white_line(line as usize) {
      line -= 1;
    }
    while line >= 0 && !self.is_white_line(line as usize) {
      line -= 1;
    }
    self.line_start((line + 1) as usize)
  }

  /// Start of the paragraph after the one containing `position`, or the
  /// end of the document.
  pub fn para_down(&self, position: usize) -> usize {
    let lines = self.lines_total();
    let mut line = self.line_from_position(position);
    while line < lines && !self.is_white_line(line) {
      line += 1;
    }
    while line < lines && self.is_white_line(line) {
      line += 1;
    }
    if line < lines {
      self.line_start(line)
    } else {
      self.line_end(line - 1)
    }
  }

  // Markers.

  /// Adds marker `number` to `line`. Returns the new marker's handle.
  pub fn add_mark(&mut self, line: usize, number: u32) -> Option<MarkerHandle> {
    let lines = self.lines_total();
    if line > lines {
      return None;
    }
    let handle = self.per_line.markers.add_mark(line, number, lines);
    self.notify_marker_changed(Some(line));
    handle
  }

  /// Adds every marker whose bit is set in `value_set` to `line`.
  pub fn add_mark_set(&mut self, line: usize, value_set: u32) {
    let lines = self.lines_total();
    if line > lines {
      return;
    }
    for number in (0..u32::BITS).filter(|number| value_set & (1 << number) != 0) {
      self.per_line.markers.add_mark(line, number, lines);
    }
    self.notify_marker_changed(Some(line));
  }

  /// Deletes marker `number` from `line`; `None` deletes every marker.
  pub fn delete_mark(&mut self, line: usize, number: Option<u32>) {
    self.per_line.markers.delete_mark(line, number, false);
    self.notify_marker_changed(Some(line));
  }

  pub fn delete_mark_from_handle(&mut self, handle: MarkerHandle) {
    self.per_line.markers.delete_mark_from_handle(handle);
    self.notify_marker_changed(None);
  }

  /// Deletes marker `number` from every line; `None` deletes all markers.
  pub fn delete_all_marks(&mut self, number: Option<u32>) {
    let mut some_changes = false;
    for line in 0..self.lines_total() {
      if self.per_line.markers.delete_mark(line, number, true) {
        some_changes = true;
      }
    }
    if some_changes {
      self.notify_marker_changed(None);
    }
  }

  pub fn line_from_handle(&self, handle: MarkerHandle) -> Option<usize> {
    self.per_line.markers.line_from_handle(handle)
  }

  /// Bit mask of the markers on `line`.
  pub fn mark_value(&self, line: usize) -> u32 {
    self.per_line.markers.mark_value(line)
  }

  /// First line at or after `line_start` with a marker in `mask`.
  pub fn marker_next(&self, line_start: usize, mask: u32) -> Option<usize> {
    self.per_line.markers.marker_next(line_start, mask)
  }

  fn notify_marker_changed(&mut self, line: Option<usize>) {
    let position = line.map_or(0, |line| self.line_start(line));
    let mut modification = DocModification::new(ModificationFlags::CHANGE_MARKER, position, 0);
    modification.line = line;
    self.notify_modified(modification);
  }

  // Fold levels.

  /// Sets the fold level of `line` and returns the previous level.
  pub fn set_level(&mut self, line: usize, level: u32) -> u32 {
    let lines = self.lines_total();
    let prev = match self.per_line.levels.set_level(line, level, lines) {
      Ok(prev) => prev,
      Err(err) => {
        self.report_alloc_failure(&err);
        return self.level(line);
      },
    };
    if prev != level {
      let mut modification = DocModification::new(
        ModificationFlags::CHANGE_FOLD | ModificationFlags::CHANGE_MARKER,
        self.line_start(line),
        0,
      )
      .with_line(line);
      modification.fold_level_now = level;
      modification.fold_level_prev = prev;
      self.notify_modified(modification);
    }
    prev
  }

  pub fn level(&self, line: usize) -> u32 {
    self.per_line.levels.level(line)
  }

  pub fn clear_levels(&mut self) {
    self.per_line.levels.clear_levels();
  }

  /// Last line of the fold headed by `line_parent`.
  ///
  /// `level` defaults to the level of the parent. With `last_line` set the
  /// scan stops there unless it is inside trailing white lines.
  pub fn last_child(&mut self, line_parent: usize, level: Option<u32>, last_line: Option<usize>) -> usize {
    let level = level.unwrap_or_else(|| fold_level_number(self.level(line_parent)));
    let max_line = self.lines_total();
    let look_last_line = last_line.map(|last| last.min(max_line.saturating_sub(1)));
    let mut line_max_subord = line_parent;
    while line_max_subord + 1 < max_line {
      let style_to = self.line_start(line_max_subord + 2);
      self.ensure_styled_to(style_to);
      if !is_subordinate(level, self.level(line_max_subord + 1)) {
        break;
      }
      if look_last_line.is_some_and(|look| line_max_subord >= look)
        && self.level(line_max_subord) & FOLD_LEVEL_WHITE_FLAG == 0
      {
        break;
      }
      line_max_subord += 1;
    }
    if line_max_subord > line_parent
      && level > fold_level_number(self.level(line_max_subord + 1))
      && self.level(line_max_subord) & FOLD_LEVEL_WHITE_FLAG != 0
    {
      // Trailing white lines belong to the parent's parent.
      line_max_subord -= 1;
    }
    line_max_subord
  }

  /// Header line of the fold containing `line`.
  pub fn fold_parent(&self, line: usize) -> Option<usize> {
    let level = fold_level_number(self.level(line));
    let is_parent = |look: usize| {
      let level_look = self.level(look);
      level_look & FOLD_LEVEL_HEADER_FLAG != 0 && fold_level_number(level_look) < level
    };
    let mut look = line.checked_sub(1)?;
    while look > 0 && !is_parent(look) {
      look -= 1;
    }
    is_parent(look).then_some(look)
  }

  // Lexer line state.

  /// Sets the lexer state of `line` and returns the previous state.
  pub fn set_line_state(&mut self, line: usize, state: i32) -> i32 {
    let prev = match self.per_line.states.set_line_state(line, state) {
      Ok(prev) => prev,
      Err(err) => {
        self.report_alloc_failure(&err);
        return self.line_state(line);
      },
    };
    if state != prev {
      self.notify_modified(
        DocModification::new(
          ModificationFlags::CHANGE_LINE_STATE,
          self.line_start(line),
          0,
        )
        .with_line(line),
      );
    }
    prev
  }

  pub fn line_state(&self, line: usize) -> i32 {
    self.per_line.states.line_state(line)
  }

  pub fn max_line_state(&self) -> usize {
    self.per_line.states.max_line_state()
  }

  // Margin text.

  pub fn margin_styled_text(&self, line: usize) -> StyledText<'_> {
    self.per_line.margins.styled_text(line)
  }

  /// Sets or, with `None`, clears the margin text of `line`.
  pub fn margin_set_text(&mut self, line: usize, text: Option<&[u8]>) {
    if let Err(err) = self.per_line.margins.set_text(line, text) {
      self.report_alloc_failure(&err);
    }
    self.notify_line_data_changed(ModificationFlags::CHANGE_MARGIN, line, 0);
  }

  pub fn margin_set_style(&mut self, line: usize, style: u8) {
    if let Err(err) = self.per_line.margins.set_style(line, style) {
      self.report_alloc_failure(&err);
    }
    self.notify_line_data_changed(ModificationFlags::CHANGE_MARGIN, line, 0);
  }

  pub fn margin_set_styles(&mut self, line: usize, styles: &[u8]) {
    if let Err(err) = self.per_line.margins.set_styles(line, styles) {
      self.report_alloc_failure(&err);
    }
    self.notify_line_data_changed(ModificationFlags::CHANGE_MARGIN, line, 0);
  }

  pub fn margin_clear_all(&mut self) {
    for line in 0..self.lines_total() {
      self.margin_set_text(line, None);
    }
    self.per_line.margins.clear_all();
  }

  // Annotations.

  pub fn annotation_styled_text(&self, line: usize) -> StyledText<'_> {
    self.per_line.annotations.styled_text(line)
  }

  /// Display lines taken by the annotation of `line`.
  pub fn annotation_lines(&self, line: usize) -> usize {
    self.per_line.annotations.lines(line)
  }

  /// Sets or, with `None`, clears the annotation of `line`.
  pub fn annotation_set_text(&mut self, line: usize, text: Option<&[u8]>) {
    if line >= self.lines_total() {
      return;
    }
    let lines_before = self.annotation_lines(line);
    if let Err(err) = self.per_line.annotations.set_text(line, text) {
      self.report_alloc_failure(&err);
    }
    let lines_added = self.annotation_lines(line) as isize - lines_before as isize;
    self.notify_line_data_changed(ModificationFlags::CHANGE_ANNOTATION, line, lines_added);
  }

  pub fn annotation_set_style(&mut self, line: usize, style: u8) {
    if let Err(err) = self.per_line.annotations.set_style(line, style) {
      self.report_alloc_failure(&err);
    }
    self.notify_line_data_changed(ModificationFlags::CHANGE_ANNOTATION, line, 0);
  }

  /// Sets per byte styles of the annotation of `line`. Watchers are not
  /// told; the styles only matter once the text is shown.
  pub fn annotation_set_styles(&mut self, line: usize, styles: &[u8]) {
    if line >= self.lines_total() {
      return;
    }
    if let Err(err) = self.per_line.annotations.set_styles(line, styles) {
      self.report_alloc_failure(&err);
    }
  }

  pub fn annotation_clear_all(&mut self) {
    for line in 0..self.lines_total() {
      self.annotation_set_text(line, None);
    }
    self.per_line.annotations.clear_all();
  }

  fn notify_line_data_changed(&mut self, flags: ModificationFlags, line: usize, annotation_lines_added: isize) {
    let mut modification = DocModification::new(flags, self.line_start(line), 0).with_line(line);
    modification.annotation_lines_added = annotation_lines_added;
    self.notify_modified(modification);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    config::DocumentOptions,
    per_line::FOLD_LEVEL_BASE,
  };

  fn doc(text: &str) -> Document {
    let mut doc = Document::new();
    doc.insert_string(0, text.as_bytes());
    doc
  }

  #[test]
  fn line_ends_skip_terminators() {
    let doc = doc("ab\r\ncd\ne\rf");
    assert_eq!(doc.lines_total(), 4);
    assert_eq!(doc.line_end(0), 2);
    assert_eq!(doc.line_end(1), 6);
    assert_eq!(doc.line_end(2), 8);
    assert_eq!(doc.line_end(3), 10);
    assert!(doc.is_line_end_position(6));
    assert!(doc.is_position_in_line_end(3));
    assert!(!doc.is_position_in_line_end(1));
  }

  #[test]
  fn unicode_line_ends() {
    let mut doc = Document::with_options(&DocumentOptions {
      code_page: 65001,
      line_end_types_allowed: LineEndTypes::UNICODE,
      ..Default::default()
    });
    doc.insert_string(0, "a\u{2028}b\u{85}c".as_bytes());
    assert_eq!(doc.lines_total(), 3);
    assert_eq!(doc.line_end(0), 1);
    assert_eq!(doc.line_start(1), 4);
    assert_eq!(doc.line_end(1), 5);

    doc.set_line_end_types_allowed(LineEndTypes::DEFAULT);
    assert_eq!(doc.lines_total(), 1);
  }

  #[test]
  fn home_and_paragraphs() {
    let doc = doc("  ab\ncd\n\n \nef\ngh");
    assert_eq!(doc.vc_home_position(4), 2);
    assert_eq!(doc.vc_home_position(2), 0);
    assert!(doc.is_white_line(2));
    assert!(doc.is_white_line(3));
    assert!(!doc.is_white_line(4));

    assert_eq!(doc.para_down(0), doc.line_start(4));
    assert_eq!(doc.para_down(doc.line_start(4)), doc.len());
    assert_eq!(doc.para_up(doc.line_start(5)), doc.line_start(4));
    assert_eq!(doc.para_up(doc.line_start(4)), 0);
  }

  #[test]
  fn markers_and_handles() {
    let mut doc = doc("a\nb\nc");
    let handle = doc.add_mark(1, 3).unwrap();
    doc.add_mark_set(2, 0b101);
    assert_eq!(doc.mark_value(1), 1 << 3);
    assert_eq!(doc.mark_value(2), 0b101);
    assert_eq!(doc.line_from_handle(handle), Some(1));
    assert_eq!(doc.marker_next(0, 1 << 2), Some(2));

    doc.insert_string(0, b"x\n");
    assert_eq!(doc.line_from_handle(handle), Some(2));

    doc.delete_mark_from_handle(handle);
    assert_eq!(doc.line_from_handle(handle), None);
    doc.delete_all_marks(Some(0));
    assert_eq!(doc.mark_value(3), 1 << 2);
    doc.delete_all_marks(None);
    assert_eq!(doc.mark_value(3), 0);
    assert_eq!(doc.add_mark(10, 1), None);
  }

  #[test]
  fn fold_structure() {
    let mut doc = doc("if\n  a\n\n  b\nend\n");
    doc.set_level(0, FOLD_LEVEL_BASE | FOLD_LEVEL_HEADER_FLAG);
    doc.set_level(1, FOLD_LEVEL_BASE + 1);
    doc.set_level(2, (FOLD_LEVEL_BASE + 1) | FOLD_LEVEL_WHITE_FLAG);
    doc.set_level(3, FOLD_LEVEL_BASE + 1);
    doc.set_level(4, FOLD_LEVEL_BASE);
    assert_eq!(doc.last_child(0, None, None), 3);
    assert_eq!(doc.fold_parent(3), Some(0));
    assert_eq!(doc.fold_parent(0), None);
    assert_eq!(doc.fold_parent(4), None);
    assert_eq!(doc.set_level(1, FOLD_LEVEL_BASE + 2), FOLD_LEVEL_BASE + 1);
  }

  #[test]
  fn annotations_count_lines() {
    let mut doc = doc("a\nb");
    doc.annotation_set_text(0, Some(b"one\ntwo"));
    assert_eq!(doc.annotation_lines(0), 2);
    assert_eq!(doc.annotation_styled_text(0).text, b"one\ntwo");
    doc.annotation_set_text(5, Some(b"ignored"));
    doc.annotation_clear_all();
    assert_eq!(doc.annotation_lines(0), 0);

    doc.margin_set_text(1, Some(b"42"));
    doc.margin_set_style(1, 7);
    assert_eq!(doc.margin_styled_text(1).style, 7);
    doc.margin_clear_all();
    assert!(doc.margin_styled_text(1).is_empty());
  }

  #[test]
  fn line_state() {
    let mut doc = doc("a\nb");
    assert_eq!(doc.set_line_state(1, 9), 0);
    assert_eq!(doc.line_state(1), 9);
    assert_eq!(doc.set_line_state(1, 4), 9);
  }
}
