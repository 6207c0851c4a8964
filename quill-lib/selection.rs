//! Carets, anchors and multiple selections.
//!
//! A [`SelectionPosition`] is a byte position plus an amount of virtual
//! space: columns past the end of a line that hold no text yet. A
//! [`SelectionRange`] joins an anchor and a caret, and a [`Selection`] keeps
//! one or more ranges with one of them marked as the main range.
//!
//! ```text
//! anchor=2, caret=7: "he[llo w]orld"
//! anchor=7, caret=2: "he]llo w[orld"
//! anchor=5, caret=5: "hello|world"
//! ```
//!
//! Rectangular and thin selections keep the rectangle itself in
//! [`Selection::rectangular`]; turning it into one range per line needs the
//! layout and is left to the caller.
//!
//! # Serialized form
//!
//! [`Selection`] implements [`Display`](fmt::Display) and [`FromStr`]:
//!
//! ```text
//! 3-7,12,20v2-18#1     two ranges and a caret in virtual space, main is 1
//! R4-30v5              rectangular, anchor 4, caret 30 plus 5 virtual columns
//! ```
//!
//! An empty range is written as one position. `R`, `L` and `T` prefixes mark
//! rectangular, line and thin selections.

use std::{
  fmt,
  str::FromStr,
};

use smallvec::{
  SmallVec,
  smallvec,
};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionParseError {
  #[error("serialized selection is empty")]
  Empty,
  #[error("invalid position '{0}' in serialized selection")]
  InvalidPosition(String),
  #[error("main range {main} out of bounds for selection of length {len}")]
  MainOutOfBounds { main: usize, len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SelectionPosition {
  position:      usize,
  virtual_space: usize,
}

impl SelectionPosition {
  pub const fn new(position: usize) -> Self {
    Self {
      position,
      virtual_space: 0,
    }
  }

  pub const fn with_virtual_space(position: usize, virtual_space: usize) -> Self {
    Self {
      position,
      virtual_space,
    }
  }

  #[inline]
  pub const fn position(self) -> usize {
    self.position
  }

  /// Moves to `position`, leaving virtual space.
  pub fn set_position(&mut self, position: usize) {
    self.position = position;
    self.virtual_space = 0;
  }

  #[inline]
  pub const fn virtual_space(self) -> usize {
    self.virtual_space
  }

  pub fn set_virtual_space(&mut self, virtual_space: usize) {
    self.virtual_space = virtual_space;
  }

  pub fn add(&mut self, increment: usize) {
    self.position += increment;
  }

  #[inline]
  pub const fn is_virtual(self) -> bool {
    self.virtual_space > 0
  }

  /// Follows an insertion or deletion of `length` bytes at `start_change`.
  ///
  /// Text inserted at a caret in virtual space fills the virtual space
  /// before pushing the caret. A position inside deleted text collapses to
  /// the start of the deletion.
  pub fn move_for_insert_delete(&mut self, insertion: bool, start_change: usize, length: usize) {
    if insertion {
      if self.position == start_change {
        let virtual_length_remove = length.min(self.virtual_space);
        self.virtual_space -= virtual_length_remove;
        self.position += virtual_length_remove;
      } else if self.position > start_change {
        self.position += length;
      }
    } else {
      if self.position == start_change {
        self.virtual_space = 0;
      }
      if self.position > start_change {
        let end_deletion = start_change + length;
        if self.position > end_deletion {
          self.position -= length;
        } else {
          self.position = start_change;
          self.virtual_space = 0;
        }
      }
    }
  }
}

impl fmt::Display for SelectionPosition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.position)?;
    if self.virtual_space > 0 {
      write!(f, "v{}", self.virtual_space)?;
    }
    Ok(())
  }
}

impl FromStr for SelectionPosition {
  type Err = SelectionParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = || SelectionParseError::InvalidPosition(s.to_string());
    let (position, virtual_space) = match s.split_once('v') {
      Some((position, virtual_space)) => (position, Some(virtual_space)),
      None => (s, None),
    };
    let position = position.parse().map_err(|_| invalid())?;
    let virtual_space = match virtual_space {
      Some(virtual_space) => virtual_space.parse().map_err(|_| invalid())?,
      None => 0,
    };
    Ok(Self::with_virtual_space(position, virtual_space))
  }
}

/// Ordered pair of positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionSegment {
  pub start: SelectionPosition,
  pub end:   SelectionPosition,
}

impl SelectionSegment {
  pub fn new(a: SelectionPosition, b: SelectionPosition) -> Self {
    if a <= b {
      Self { start: a, end: b }
    } else {
      Self { start: b, end: a }
    }
  }

  pub fn is_empty(&self) -> bool {
    self.start == self.end
  }

  pub fn length(&self) -> usize {
    self.end.position() - self.start.position()
  }

  /// Grows the segment to cover `p`.
  pub fn extend(&mut self, p: SelectionPosition) {
    if self.start > p {
      self.start = p;
    }
    if self.end < p {
      self.end = p;
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionRange {
  pub anchor: SelectionPosition,
  pub caret:  SelectionPosition,
}

impl SelectionRange {
  pub fn new(anchor: SelectionPosition, caret: SelectionPosition) -> Self {
    Self { anchor, caret }
  }

  /// A range from byte positions without virtual space.
  pub fn from_positions(anchor: usize, caret: usize) -> Self {
    Self::new(SelectionPosition::new(anchor), SelectionPosition::new(caret))
  }

  pub fn point(position: SelectionPosition) -> Self {
    Self::new(position, position)
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.anchor == self.caret
  }

  pub fn start(&self) -> SelectionPosition {
    self.anchor.min(self.caret)
  }

  pub fn end(&self) -> SelectionPosition {
    self.anchor.max(self.caret)
  }

  /// Bytes covered, ignoring virtual space.
  pub fn length(&self) -> usize {
    self.end().position() - self.start().position()
  }

  pub fn reset(&mut self) {
    *self = Self::default();
  }

  pub fn clear_virtual_space(&mut self) {
    self.anchor.set_virtual_space(0);
    self.caret.set_virtual_space(0);
  }

  pub fn swap(&mut self) {
    std::mem::swap(&mut self.anchor, &mut self.caret);
  }

  /// True when `position` is inside the range or at either end.
  pub fn contains(&self, position: usize) -> bool {
    (self.start().position()..=self.end().position()).contains(&position)
  }

  pub fn contains_position(&self, sp: SelectionPosition) -> bool {
    sp >= self.start() && sp <= self.end()
  }

  /// True when the character starting at `position` is selected.
  pub fn contains_character(&self, position: usize) -> bool {
    (self.start().position()..self.end().position()).contains(&position)
  }

  /// The part of `check` inside this range.
  pub fn intersect(&self, check: SelectionSegment) -> Option<SelectionSegment> {
    let in_order = SelectionSegment::new(self.caret, self.anchor);
    let start = check.start.max(in_order.start);
    let end = check.end.min(in_order.end);
    (start <= end).then_some(SelectionSegment { start, end })
  }

  /// Clips this range so it does not overlap `range`. A range that covers
  /// or is covered by `range` collapses to its start. Returns true when
  /// the result is empty.
  pub fn trim(&mut self, range: SelectionRange) -> bool {
    let start_range = range.start();
    let end_range = range.end();
    let mut start = self.start();
    let mut end = self.end();
    if start_range > end || end_range < start {
      return false;
    }
    if (start > start_range && end < end_range) || (start < start_range && end > end_range) {
      end = start;
    } else if start <= start_range {
      end = start_range;
    } else {
      start = end_range;
    }
    if self.anchor > self.caret {
      self.caret = start;
      self.anchor = end;
    } else {
      self.anchor = start;
      self.caret = end;
    }
    self.is_empty()
  }

  /// A range that is all virtual space collapses to the smaller amount.
  pub fn minimize_virtual_space(&mut self) {
    if self.caret.position() == self.anchor.position() {
      let virtual_space = self.caret.virtual_space().min(self.anchor.virtual_space());
      self.caret.set_virtual_space(virtual_space);
      self.anchor.set_virtual_space(virtual_space);
    }
  }

  pub fn move_for_insert_delete(&mut self, insertion: bool, start_change: usize, length: usize) {
    self.caret.move_for_insert_delete(insertion, start_change, length);
    self.anchor.move_for_insert_delete(insertion, start_change, length);
  }
}

impl fmt::Display for SelectionRange {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.anchor)?;
    if !self.is_empty() {
      write!(f, "-{}", self.caret)?;
    }
    Ok(())
  }
}

impl FromStr for SelectionRange {
  type Err = SelectionParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.split_once('-') {
      Some((anchor, caret)) => Ok(Self::new(anchor.parse()?, caret.parse()?)),
      None => Ok(Self::point(s.parse()?)),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SelectionType {
  #[default]
  Stream,
  Rectangle,
  Lines,
  /// A zero width rectangle, used while dragging.
  Thin,
}

impl SelectionType {
  fn prefix(self) -> Option<char> {
    match self {
      Self::Stream => None,
      Self::Rectangle => Some('R'),
      Self::Lines => Some('L'),
      Self::Thin => Some('T'),
    }
  }
}

/// Which range of a selection holds a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InSelection {
  Main,
  Additional,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
  ranges:            SmallVec<[SelectionRange; 1]>,
  ranges_saved:      SmallVec<[SelectionRange; 1]>,
  range_rectangular: SelectionRange,
  main_range:        usize,
  move_extends:      bool,
  tentative_main:    bool,
  sel_type:          SelectionType,
}

impl Default for Selection {
  fn default() -> Self {
    Self::new()
  }
}

impl Selection {
  /// A single caret at the start of the text.
  pub fn new() -> Self {
    Self {
      ranges:            smallvec![SelectionRange::default()],
      ranges_saved:      SmallVec::new(),
      range_rectangular: SelectionRange::default(),
      main_range:        0,
      move_extends:      false,
      tentative_main:    false,
      sel_type:          SelectionType::Stream,
    }
  }

  #[inline]
  pub fn sel_type(&self) -> SelectionType {
    self.sel_type
  }

  pub fn set_sel_type(&mut self, sel_type: SelectionType) {
    self.sel_type = sel_type;
  }

  pub fn is_rectangular(&self) -> bool {
    matches!(self.sel_type, SelectionType::Rectangle | SelectionType::Thin)
  }

  pub fn main_caret(&self) -> usize {
    self.range_main().caret.position()
  }

  pub fn main_anchor(&self) -> usize {
    self.range_main().anchor.position()
  }

  pub fn rectangular(&self) -> &SelectionRange {
    &self.range_rectangular
  }

  pub fn rectangular_mut(&mut self) -> &mut SelectionRange {
    &mut self.range_rectangular
  }

  /// Segment from the first to the last position of any range.
  pub fn limits(&self) -> SelectionSegment {
    let first = &self.ranges[0];
    let mut limits = SelectionSegment::new(first.anchor, first.caret);
    for range in &self.ranges[1..] {
      limits.extend(range.anchor);
      limits.extend(range.caret);
    }
    limits
  }

  pub fn limits_for_rectangular_else_main(&self) -> SelectionSegment {
    if self.is_rectangular() {
      self.limits()
    } else {
      let main = self.range_main();
      SelectionSegment::new(main.caret, main.anchor)
    }
  }

  #[inline]
  pub fn count(&self) -> usize {
    self.ranges.len()
  }

  #[inline]
  pub fn main(&self) -> usize {
    self.main_range
  }

  /// Makes range `r` the main one. Out of range indexes are ignored.
  pub fn set_main(&mut self, r: usize) {
    if r < self.ranges.len() {
      self.main_range = r;
    }
  }

  pub fn range(&self, r: usize) -> Option<&SelectionRange> {
    self.ranges.get(r)
  }

  pub fn range_mut(&mut self, r: usize) -> Option<&mut SelectionRange> {
    self.ranges.get_mut(r)
  }

  pub fn range_main(&self) -> &SelectionRange {
    &self.ranges[self.main_range]
  }

  pub fn range_main_mut(&mut self) -> &mut SelectionRange {
    &mut self.ranges[self.main_range]
  }

  pub fn ranges(&self) -> &[SelectionRange] {
    &self.ranges
  }

  pub fn move_extends(&self) -> bool {
    self.move_extends
  }

  pub fn set_move_extends(&mut self, move_extends: bool) {
    self.move_extends = move_extends;
  }

  /// True when no range selects anything.
  pub fn is_empty(&self) -> bool {
    self.ranges.iter().all(SelectionRange::is_empty)
  }

  /// The furthest position of any range.
  pub fn last(&self) -> SelectionPosition {
    self
      .ranges
      .iter()
      .flat_map(|range| [range.caret, range.anchor])
      .max()
      .unwrap_or_default()
  }

  /// Bytes selected over all ranges.
  pub fn length(&self) -> usize {
    self.ranges.iter().map(SelectionRange::length).sum()
  }

  /// Follows an insertion or deletion in the text.
  pub fn move_positions(&mut self, insertion: bool, start_change: usize, length: usize) {
    for range in &mut self.ranges {
      range.move_for_insert_delete(insertion, start_change, length);
    }
    if self.is_rectangular() {
      self
        .range_rectangular
        .move_for_insert_delete(insertion, start_change, length);
    }
  }

  fn trim_ranges(&mut self, range: SelectionRange, keep_main: bool) {
    let mut i = 0;
    while i < self.ranges.len() {
      let keep = keep_main && i == self.main_range;
      if !keep && self.ranges.len() > 1 && self.ranges[i].trim(range) {
        self.ranges.remove(i);
        if self.main_range > i || self.main_range >= self.ranges.len() {
          self.main_range = self.main_range.saturating_sub(1);
        }
      } else {
        i += 1;
      }
    }
  }

  /// Clips every range but the main one against `range`, dropping those
  /// that become empty.
  pub fn trim_selection(&mut self, range: SelectionRange) {
    self.trim_ranges(range, true);
  }

  /// Replaces all ranges with `range`.
  pub fn set_selection(&mut self, range: SelectionRange) {
    self.ranges.clear();
    self.ranges.push(range);
    self.main_range = 0;
  }

  /// Adds `range` as the new main range after clipping the others
  /// against it.
  pub fn add_selection(&mut self, range: SelectionRange) {
    self.trim_ranges(range, false);
    if self.ranges.len() == 1 && self.ranges[0].trim(range) {
      self.ranges.clear();
    }
    self.add_selection_without_trim(range);
  }

  pub fn add_selection_without_trim(&mut self, range: SelectionRange) {
    self.ranges.push(range);
    self.main_range = self.ranges.len() - 1;
  }

  /// Removes range `r` unless it is the only one.
  pub fn drop_selection(&mut self, r: usize) {
    if self.ranges.len() < 2 || r >= self.ranges.len() {
      return;
    }
    let mut main_new = self.main_range;
    if main_new >= r {
      main_new = if main_new == 0 {
        self.ranges.len() - 2
      } else {
        main_new - 1
      };
    }
    self.ranges.remove(r);
    self.main_range = main_new;
  }

  /// Adds `range` provisionally. Each call replaces the previous tentative
  /// range until [`Selection::commit_tentative`].
  pub fn tentative_selection(&mut self, range: SelectionRange) {
    if !self.tentative_main {
      self.ranges_saved = self.ranges.clone();
    }
    self.ranges = self.ranges_saved.clone();
    self.add_selection(range);
    let main = *self.range_main();
    self.trim_selection(main);
    self.tentative_main = true;
  }

  pub fn commit_tentative(&mut self) {
    self.ranges_saved.clear();
    self.tentative_main = false;
  }

  fn hit(&self, i: usize) -> InSelection {
    if i == self.main_range {
      InSelection::Main
    } else {
      InSelection::Additional
    }
  }

  /// Range selecting the character at `position`.
  pub fn character_in_selection(&self, position: usize) -> Option<InSelection> {
    self
      .ranges
      .iter()
      .position(|range| range.contains_character(position))
      .map(|i| self.hit(i))
  }

  /// Range selecting the line end before `position`.
  pub fn in_selection_for_eol(&self, position: usize) -> Option<InSelection> {
    self
      .ranges
      .iter()
      .position(|range| {
        !range.is_empty() && position > range.start().position() && position <= range.end().position()
      })
      .map(|i| self.hit(i))
  }

  /// Largest virtual space of any caret or anchor at `position`.
  pub fn virtual_space_for(&self, position: usize) -> usize {
    self
      .ranges
      .iter()
      .flat_map(|range| [range.caret, range.anchor])
      .filter(|sp| sp.position() == position)
      .map(SelectionPosition::virtual_space)
      .max()
      .unwrap_or(0)
  }

  /// Back to one caret at the start of a stream selection.
  pub fn clear(&mut self) {
    self.ranges.clear();
    self.ranges.push(SelectionRange::default());
    self.main_range = 0;
    self.sel_type = SelectionType::Stream;
    self.move_extends = false;
    self.range_rectangular.reset();
  }

  /// Drops empty ranges equal to an earlier empty range.
  pub fn remove_duplicates(&mut self) {
    let mut i = 0;
    while i + 1 < self.ranges.len() {
      if self.ranges[i].is_empty() {
        let mut j = i + 1;
        while j < self.ranges.len() {
          if self.ranges[i] == self.ranges[j] {
            self.ranges.remove(j);
            if self.main_range >= j {
              self.main_range -= 1;
            }
          } else {
            j += 1;
          }
        }
      }
      i += 1;
    }
  }

  pub fn rotate_main(&mut self) {
    self.main_range = (self.main_range + 1) % self.ranges.len();
  }
}

impl fmt::Display for Selection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let Some(prefix) = self.sel_type.prefix() {
      write!(f, "{prefix}")?;
    }
    if self.is_rectangular() {
      write!(f, "{}", self.range_rectangular)?;
    } else {
      for (i, range) in self.ranges.iter().enumerate() {
        if i > 0 {
          write!(f, ",")?;
        }
        write!(f, "{range}")?;
      }
    }
    if self.main_range > 0 {
      write!(f, "#{}", self.main_range)?;
    }
    Ok(())
  }
}

impl FromStr for Selection {
  type Err = SelectionParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if s.is_empty() {
      return Err(SelectionParseError::Empty);
    }
    let (sel_type, rest) = match s.as_bytes()[0] {
      b'R' => (SelectionType::Rectangle, &s[1..]),
      b'L' => (SelectionType::Lines, &s[1..]),
      b'T' => (SelectionType::Thin, &s[1..]),
      _ => (SelectionType::Stream, s),
    };
    let (ranges, main) = match rest.split_once('#') {
      Some((ranges, main)) => {
        let main = main
          .parse()
          .map_err(|_| SelectionParseError::InvalidPosition(main.to_string()))?;
        (ranges, main)
      },
      None => (rest, 0),
    };
    if ranges.is_empty() {
      return Err(SelectionParseError::Empty);
    }
    let ranges = ranges
      .split(',')
      .map(str::parse)
      .collect::<Result<SmallVec<[SelectionRange; 1]>, _>>()?;

    let mut selection = Self::new();
    selection.sel_type = sel_type;
    if selection.is_rectangular() {
      selection.range_rectangular = ranges[0];
      selection.set_selection(ranges[0]);
    } else {
      selection.ranges = ranges;
    }
    if main >= selection.ranges.len() && main > 0 {
      return Err(SelectionParseError::MainOutOfBounds {
        main,
        len: selection.ranges.len(),
      });
    }
    selection.main_range = main;
    Ok(selection)
  }
}
