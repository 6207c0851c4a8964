//! Data attached to lines rather than bytes.
//!
//! Each store follows line insertion and removal through [`PerLine`], so a
//! marker set on line 10 stays on the same text when lines are added above
//! it. Stores are empty until first written; an empty store answers every
//! query with its default.

use quill_stdx::{
  SplitVector,
  split_vector::Result,
};

/// Base fold level of a top level line.
pub const FOLD_LEVEL_BASE: u32 = 0x400;
/// Line is blank for folding purposes.
pub const FOLD_LEVEL_WHITE_FLAG: u32 = 0x1000;
/// Line starts a fold.
pub const FOLD_LEVEL_HEADER_FLAG: u32 = 0x2000;
pub const FOLD_LEVEL_NUMBER_MASK: u32 = 0x0FFF;

/// Extracts the numeric part of a fold level.
#[inline]
pub const fn fold_level_number(level: u32) -> u32 {
  level & FOLD_LEVEL_NUMBER_MASK
}

/// Receives line structure changes from the line index.
pub trait PerLine {
  fn init(&mut self);
  /// A line was inserted at `line`.
  fn insert_line(&mut self, line: usize) -> Result<()>;
  /// Line `line` was removed.
  fn remove_line(&mut self, line: usize);
}

/// Handle returned by [`LineMarkers::add_mark`].
pub type MarkerHandle = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MarkerHandleNumber {
  handle: MarkerHandle,
  number: u32,
}

/// Markers on one line, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct MarkerHandleSet {
  list: Vec<MarkerHandleNumber>,
}

impl MarkerHandleSet {
  fn is_empty(&self) -> bool {
    self.list.is_empty()
  }

  fn mark_value(&self) -> u32 {
    self
      .list
      .iter()
      .fold(0, |mask, mhn| mask | marker_bit(mhn.number))
  }

  fn contains(&self, handle: MarkerHandle) -> bool {
    self.list.iter().any(|mhn| mhn.handle == handle)
  }

  fn insert_handle(&mut self, handle: MarkerHandle, number: u32) {
    self.list.insert(0, MarkerHandleNumber { handle, number });
  }

  fn remove_handle(&mut self, handle: MarkerHandle) {
    self.list.retain(|mhn| mhn.handle != handle);
  }

  /// Removes the newest marker numbered `number`, or all of them.
  fn remove_number(&mut self, number: u32, all: bool) -> bool {
    let mut performed = false;
    self.list.retain(|mhn| {
      if (all || !performed) && mhn.number == number {
        performed = true;
        return false;
      }
      true
    });
    performed
  }

  /// Moves every marker of `other` in front of this set's.
  fn combine_with(&mut self, other: &mut Self) {
    let mut merged = std::mem::take(&mut other.list);
    merged.append(&mut self.list);
    self.list = merged;
  }
}

#[inline]
fn marker_bit(number: u32) -> u32 {
  1u32.checked_shl(number).unwrap_or(0)
}

#[derive(Debug, Clone, Default)]
pub struct LineMarkers {
  markers:        Vec<Option<MarkerHandleSet>>,
  handle_current: MarkerHandle,
}

impl LineMarkers {
  /// Bit mask of the marker numbers on `line`.
  pub fn mark_value(&self, line: usize) -> u32 {
    match self.markers.get(line) {
      Some(Some(set)) => set.mark_value(),
      _ => 0,
    }
  }

  /// First line at or after `line_start` carrying a marker in `mask`.
  pub fn marker_next(&self, line_start: usize, mask: u32) -> Option<usize> {
    (line_start..self.markers.len()).find(|&line| self.mark_value(line) & mask != 0)
  }

  /// Adds marker `number` to `line` of a document with `lines` lines.
  pub fn add_mark(&mut self, line: usize, number: u32, lines: usize) -> Option<MarkerHandle> {
    self.handle_current += 1;
    if self.markers.is_empty() {
      self.markers.resize(lines, None);
    }
    let slot = self.markers.get_mut(line)?;
    slot
      .get_or_insert_with(MarkerHandleSet::default)
      .insert_handle(self.handle_current, number);
    Some(self.handle_current)
  }

  /// Deletes marker `number` from `line`, every marker when `number` is
  /// `None`. With `all` unset only the newest matching marker goes.
  pub fn delete_mark(&mut self, line: usize, number: Option<u32>, all: bool) -> bool {
    let Some(slot) = self.markers.get_mut(line) else {
      return false;
    };
    let Some(set) = slot.as_mut() else {
      return false;
    };
    match number {
      None => {
        *slot = None;
        true
      },
      Some(number) => {
        let changed = set.remove_number(number, all);
        if set.is_empty() {
          *slot = None;
        }
        changed
      },
    }
  }

  pub fn delete_mark_from_handle(&mut self, handle: MarkerHandle) {
    let Some(line) = self.line_from_handle(handle) else {
      return;
    };
    let Some(slot) = self.markers.get_mut(line) else {
      return;
    };
    if let Some(set) = slot.as_mut() {
      set.remove_handle(handle);
      if set.is_empty() {
        *slot = None;
      }
    }
  }

  pub fn line_from_handle(&self, handle: MarkerHandle) -> Option<usize> {
    self
      .markers
      .iter()
      .position(|slot| slot.as_ref().is_some_and(|set| set.contains(handle)))
  }

  /// Folds the markers of `line + 1` into `line`.
  fn merge_markers(&mut self, line: usize) {
    let Some(mut next) = self.markers.get_mut(line + 1).and_then(Option::take) else {
      return;
    };
    if let Some(slot) = self.markers.get_mut(line) {
      slot
        .get_or_insert_with(MarkerHandleSet::default)
        .combine_with(&mut next);
    }
  }
}

impl PerLine for LineMarkers {
  fn init(&mut self) {
    self.markers.clear();
  }

  fn insert_line(&mut self, line: usize) -> Result<()> {
    if !self.markers.is_empty() {
      let line = line.min(self.markers.len());
      self.markers.try_reserve(1)?;
      self.markers.insert(line, None);
    }
    Ok(())
  }

  fn remove_line(&mut self, line: usize) {
    // Markers of a removed line survive on the line before it.
    if !self.markers.is_empty() && line < self.markers.len() {
      if line > 0 {
        self.merge_markers(line - 1);
      }
      self.markers.remove(line);
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct LineLevels {
  levels: SplitVector<u32>,
}

impl LineLevels {
  fn expand_levels(&mut self, size_new: usize) -> Result<()> {
    let len = self.levels.len();
    self
      .levels
      .insert_value(len, size_new.saturating_sub(len), FOLD_LEVEL_BASE)
  }

  pub fn clear_levels(&mut self) {
    self.levels.delete_all();
  }

  /// Sets the level of `line` in a document of `lines` lines and returns
  /// the previous level.
  pub fn set_level(&mut self, line: usize, level: u32, lines: usize) -> Result<u32> {
    if line >= lines {
      return Ok(0);
    }
    if self.levels.is_empty() {
      self.expand_levels(lines + 1)?;
    }
    let prev = self.levels.value_at(line);
    if prev != level {
      self.levels.set_value_at(line, level);
    }
    Ok(prev)
  }

  pub fn level(&self, line: usize) -> u32 {
    if line < self.levels.len() {
      self.levels.value_at(line)
    } else {
      FOLD_LEVEL_BASE
    }
  }
}

impl PerLine for LineLevels {
  fn init(&mut self) {
    self.levels.delete_all();
  }

  fn insert_line(&mut self, line: usize) -> Result<()> {
    if !self.levels.is_empty() {
      let level = if line < self.levels.len() {
        self.levels.value_at(line)
      } else {
        FOLD_LEVEL_BASE
      };
      self.levels.insert_value(line, 1, level)?;
    }
    Ok(())
  }

  fn remove_line(&mut self, line: usize) {
    if self.levels.is_empty() || line >= self.levels.len() {
      return;
    }
    // Keep a header on the line above so the fold does not flicker open.
    let first_header = self.levels.value_at(line) & FOLD_LEVEL_HEADER_FLAG;
    self.levels.delete(line);
    if line == 0 {
      return;
    }
    let above = self.levels.value_at(line - 1);
    if line + 1 == self.levels.len() {
      // The last line loses the header flag.
      self
        .levels
        .set_value_at(line - 1, above & !FOLD_LEVEL_HEADER_FLAG);
    } else {
      self.levels.set_value_at(line - 1, above | first_header);
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct LineState {
  line_states: SplitVector<i32>,
}

impl LineState {
  /// Returns the previous state.
  pub fn set_line_state(&mut self, line: usize, state: i32) -> Result<i32> {
    self.line_states.ensure_length(line + 1)?;
    let old = self.line_states.value_at(line);
    self.line_states.set_value_at(line, state);
    Ok(old)
  }

  pub fn line_state(&self, line: usize) -> i32 {
    self.line_states.value_at(line)
  }

  /// One past the highest line that has stored state.
  pub fn max_line_state(&self) -> usize {
    self.line_states.len()
  }
}

impl PerLine for LineState {
  fn init(&mut self) {
    self.line_states.delete_all();
  }

  fn insert_line(&mut self, line: usize) -> Result<()> {
    if !self.line_states.is_empty() {
      self.line_states.ensure_length(line)?;
      let state = self.line_states.value_at(line);
      self.line_states.insert(line, state)?;
    }
    Ok(())
  }

  fn remove_line(&mut self, line: usize) {
    if self.line_states.len() > line {
      self.line_states.delete(line);
    }
  }
}

/// How an annotation is styled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationStyle {
  Single(u8),
  /// One style per text byte.
  Individual(Vec<u8>),
}

impl Default for AnnotationStyle {
  fn default() -> Self {
    Self::Single(0)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Annotation {
  text:  Vec<u8>,
  style: AnnotationStyle,
  lines: usize,
}

/// Borrowed view of a margin text or annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyledText<'a> {
  pub text:   &'a [u8],
  pub style:  u8,
  /// Present when every byte has its own style.
  pub styles: Option<&'a [u8]>,
}

impl StyledText<'_> {
  pub fn len(&self) -> usize {
    self.text.len()
  }

  pub fn is_empty(&self) -> bool {
    self.text.is_empty()
  }

  pub fn multiple_styles(&self) -> bool {
    self.styles.is_some()
  }
}

/// Text shown beside (margin) or below (annotation) a line.
#[derive(Debug, Clone, Default)]
pub struct LineAnnotation {
  annotations: Vec<Option<Annotation>>,
}

fn number_lines(text: &[u8]) -> usize {
  text.iter().filter(|&&b| b == b'\n').count() + 1
}

impl LineAnnotation {
  fn get(&self, line: usize) -> Option<&Annotation> {
    self.annotations.get(line).and_then(Option::as_ref)
  }

  fn ensure_length(&mut self, len: usize) -> Result<()> {
    if self.annotations.len() < len {
      self.annotations.try_reserve(len - self.annotations.len())?;
      self.annotations.resize(len, None);
    }
    Ok(())
  }

  pub fn styled_text(&self, line: usize) -> StyledText<'_> {
    match self.get(line) {
      Some(annotation) => {
        match &annotation.style {
          AnnotationStyle::Single(style) => {
            StyledText {
              text:   &annotation.text,
              style:  *style,
              styles: None,
            }
          },
          AnnotationStyle::Individual(styles) => {
            StyledText {
              text:   &annotation.text,
              style:  0,
              styles: Some(styles),
            }
          },
        }
      },
      None => {
        StyledText {
          text:   &[],
          style:  0,
          styles: None,
        }
      },
    }
  }

  pub fn multiple_styles(&self, line: usize) -> bool {
    self
      .get(line)
      .is_some_and(|annotation| matches!(annotation.style, AnnotationStyle::Individual(_)))
  }

  pub fn style(&self, line: usize) -> u8 {
    match self.get(line).map(|annotation| &annotation.style) {
      Some(AnnotationStyle::Single(style)) => *style,
      _ => 0,
    }
  }

  pub fn text(&self, line: usize) -> Option<&[u8]> {
    self.get(line).map(|annotation| annotation.text.as_slice())
  }

  pub fn len(&self, line: usize) -> usize {
    self.get(line).map_or(0, |annotation| annotation.text.len())
  }

  /// Display lines taken by the text of `line`; 0 without text.
  pub fn lines(&self, line: usize) -> usize {
    self.get(line).map_or(0, |annotation| annotation.lines)
  }

  /// Sets or, with `None`, clears the text of `line`. A single style is
  /// kept; per byte styles are dropped since they no longer fit.
  pub fn set_text(&mut self, line: usize, text: Option<&[u8]>) -> Result<()> {
    match text {
      Some(text) => {
        self.ensure_length(line + 1)?;
        let style = AnnotationStyle::Single(self.style(line));
        self.annotations[line] = Some(Annotation {
          text: text.to_vec(),
          style,
          lines: number_lines(text),
        });
      },
      None => {
        if let Some(slot) = self.annotations.get_mut(line) {
          *slot = None;
        }
      },
    }
    Ok(())
  }

  pub fn set_style(&mut self, line: usize, style: u8) -> Result<()> {
    self.ensure_length(line + 1)?;
    self.annotations[line]
      .get_or_insert_with(Annotation::default)
      .style = AnnotationStyle::Single(style);
    Ok(())
  }

  /// Gives each text byte its own style. Missing styles are 0.
  pub fn set_styles(&mut self, line: usize, styles: &[u8]) -> Result<()> {
    self.ensure_length(line + 1)?;
    let annotation = self.annotations[line].get_or_insert_with(Annotation::default);
    let mut per_byte = vec![0; annotation.text.len()];
    let n = per_byte.len().min(styles.len());
    per_byte[..n].copy_from_slice(&styles[..n]);
    annotation.style = AnnotationStyle::Individual(per_byte);
    Ok(())
  }

  pub fn clear_all(&mut self) {
    self.annotations.clear();
  }
}

impl PerLine for LineAnnotation {
  fn init(&mut self) {
    self.clear_all();
  }

  fn insert_line(&mut self, line: usize) -> Result<()> {
    if !self.annotations.is_empty() {
      self.ensure_length(line)?;
      self.annotations.try_reserve(1)?;
      self.annotations.insert(line, None);
    }
    Ok(())
  }

  fn remove_line(&mut self, line: usize) {
    // Drops the entry above the removed line break.
    if line > 0 && line <= self.annotations.len() {
      self.annotations.remove(line - 1);
    }
  }
}

/// All per line stores of a document.
#[derive(Debug, Clone, Default)]
pub struct PerLineData {
  pub markers:     LineMarkers,
  pub levels:      LineLevels,
  pub states:      LineState,
  pub margins:     LineAnnotation,
  pub annotations: LineAnnotation,
}

impl PerLine for PerLineData {
  fn init(&mut self) {
    self.markers.init();
    self.levels.init();
    self.states.init();
    self.margins.init();
    self.annotations.init();
  }

  fn insert_line(&mut self, line: usize) -> Result<()> {
    self.markers.insert_line(line)?;
    self.levels.insert_line(line)?;
    self.states.insert_line(line)?;
    self.margins.insert_line(line)?;
    self.annotations.insert_line(line)
  }

  fn remove_line(&mut self, line: usize) {
    self.markers.remove_line(line);
    self.levels.remove_line(line);
    self.states.remove_line(line);
    self.margins.remove_line(line);
    self.annotations.remove_line(line);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn markers_follow_lines() {
    let mut markers = LineMarkers::default();
    let handle = markers.add_mark(2, 3, 4).unwrap();
    assert_eq!(markers.mark_value(2), 1 << 3);
    markers.insert_line(1).unwrap();
    assert_eq!(markers.line_from_handle(handle), Some(3));
    assert_eq!(markers.marker_next(0, 1 << 3), Some(3));
    assert_eq!(markers.marker_next(0, 1 << 4), None);
  }

  #[test]
  fn removed_line_merges_markers_upward() {
    let mut markers = LineMarkers::default();
    markers.add_mark(1, 0, 3).unwrap();
    markers.add_mark(2, 5, 3).unwrap();
    markers.remove_line(2);
    assert_eq!(markers.mark_value(1), (1 << 0) | (1 << 5));
  }

  #[test]
  fn delete_mark_variants() {
    let mut markers = LineMarkers::default();
    markers.add_mark(0, 1, 2).unwrap();
    markers.add_mark(0, 1, 2).unwrap();
    let other = markers.add_mark(0, 2, 2).unwrap();
    assert!(markers.delete_mark(0, Some(1), false));
    assert_eq!(markers.mark_value(0), (1 << 1) | (1 << 2));
    assert!(markers.delete_mark(0, Some(1), true));
    assert_eq!(markers.mark_value(0), 1 << 2);
    markers.delete_mark_from_handle(other);
    assert_eq!(markers.mark_value(0), 0);
    assert!(!markers.delete_mark(0, None, true));
    assert_eq!(markers.add_mark(5, 0, 2), None);
  }

  #[test]
  fn levels_default_and_copy_on_insert() {
    let mut levels = LineLevels::default();
    assert_eq!(levels.level(7), FOLD_LEVEL_BASE);
    let header = FOLD_LEVEL_BASE | FOLD_LEVEL_HEADER_FLAG;
    assert_eq!(levels.set_level(1, header, 3).unwrap(), FOLD_LEVEL_BASE);
    levels.insert_line(1).unwrap();
    assert_eq!(levels.level(1), header);
    assert_eq!(levels.level(2), header);
    assert_eq!(levels.set_level(9, 0, 3).unwrap(), 0);
  }

  #[test]
  fn removing_a_line_keeps_header_above() {
    let mut levels = LineLevels::default();
    levels.set_level(1, FOLD_LEVEL_BASE + 1, 4).unwrap();
    levels
      .set_level(2, FOLD_LEVEL_BASE | FOLD_LEVEL_HEADER_FLAG, 4)
      .unwrap();
    levels.remove_line(2);
    assert_eq!(levels.level(1), (FOLD_LEVEL_BASE + 1) | FOLD_LEVEL_HEADER_FLAG);
  }

  #[test]
  fn line_state_tracks_lines() {
    let mut states = LineState::default();
    assert_eq!(states.line_state(4), 0);
    assert_eq!(states.set_line_state(2, 9).unwrap(), 0);
    assert_eq!(states.max_line_state(), 3);
    states.insert_line(0).unwrap();
    assert_eq!(states.line_state(3), 9);
    states.remove_line(0);
    assert_eq!(states.line_state(2), 9);
  }

  #[test]
  fn annotation_text_and_styles() {
    let mut annotations = LineAnnotation::default();
    annotations.set_style(1, 4).unwrap();
    annotations.set_text(1, Some(b"two\nlines")).unwrap();
    assert_eq!(annotations.lines(1), 2);
    assert_eq!(annotations.style(1), 4);
    assert_eq!(annotations.text(1), Some(&b"two\nlines"[..]));

    annotations.set_styles(1, &[1, 2]).unwrap();
    let styled = annotations.styled_text(1);
    assert!(styled.multiple_styles());
    assert_eq!(styled.styles.unwrap().len(), 9);
    assert_eq!(&styled.styles.unwrap()[..3], &[1, 2, 0]);

    annotations.set_text(1, None).unwrap();
    assert_eq!(annotations.lines(1), 0);
    assert!(annotations.styled_text(1).is_empty());
  }
}
