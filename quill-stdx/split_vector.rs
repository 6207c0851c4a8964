//! A gap buffer over `Copy` elements.
//!
//! [`SplitVector`] keeps its elements in one allocation split by a gap. Edits
//! move the gap to the edit position first, so a sequence of nearby edits only
//! shifts the elements between consecutive edit points. Reads never move the
//! gap; [`SplitVector::range`] hands out the two halves of a range as slices.
//!
//! Growth goes through [`Vec::try_reserve_exact`] so that callers loading
//! large inputs can observe allocation failure instead of aborting.

use std::collections::TryReserveError;

use thiserror::Error;

/// Result type for fallible buffer growth.
pub type Result<T> = std::result::Result<T, BufferError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BufferError {
  #[error("buffer allocation failed: {0}")]
  OutOfMemory(#[from] TryReserveError),
}

const DEFAULT_GROW_SIZE: usize = 8;

#[derive(Debug, Clone)]
pub struct SplitVector<T> {
  body:      Vec<T>,
  length:    usize,
  part1_len: usize,
  gap_len:   usize,
  grow_size: usize,
}

impl<T: Copy + Default> Default for SplitVector<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: Copy + Default> SplitVector<T> {
  pub fn new() -> Self {
    Self {
      body:      Vec::new(),
      length:    0,
      part1_len: 0,
      gap_len:   0,
      grow_size: DEFAULT_GROW_SIZE,
    }
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.length
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.length == 0
  }

  #[inline]
  pub fn gap_position(&self) -> usize {
    self.part1_len
  }

  pub fn set_grow_size(&mut self, grow_size: usize) {
    self.grow_size = grow_size.max(1);
  }

  /// Returns the element at `position`, or `T::default()` when out of range.
  #[inline]
  pub fn value_at(&self, position: usize) -> T {
    if position < self.part1_len {
      self.body[position]
    } else if position < self.length {
      self.body[position + self.gap_len]
    } else {
      T::default()
    }
  }

  /// Overwrites the element at `position`. Out of range writes are ignored.
  pub fn set_value_at(&mut self, position: usize, value: T) {
    if position < self.part1_len {
      self.body[position] = value;
    } else if position < self.length {
      self.body[position + self.gap_len] = value;
    }
  }

  /// Returns a mutable reference to the element at `position`.
  pub fn get_mut(&mut self, position: usize) -> Option<&mut T> {
    if position < self.part1_len {
      Some(&mut self.body[position])
    } else if position < self.length {
      Some(&mut self.body[position + self.gap_len])
    } else {
      None
    }
  }

  /// Ensures room for at least `new_size` elements without further growth.
  pub fn reserve(&mut self, new_size: usize) -> Result<()> {
    if new_size > self.body.len() {
      self.gap_to(self.length);
      let additional = new_size - self.body.len();
      self.body.try_reserve_exact(additional)?;
      self.body.resize(new_size, T::default());
      self.gap_len += additional;
    }
    Ok(())
  }

  pub fn insert(&mut self, position: usize, value: T) -> Result<()> {
    self.insert_value(position, 1, value)
  }

  /// Inserts `count` copies of `value` at `position`.
  pub fn insert_value(&mut self, position: usize, count: usize, value: T) -> Result<()> {
    if count == 0 || position > self.length {
      return Ok(());
    }
    self.room_for(count)?;
    self.gap_to(position);
    self.body[self.part1_len..self.part1_len + count].fill(value);
    self.advance_part1(count);
    Ok(())
  }

  pub fn insert_from_slice(&mut self, position: usize, values: &[T]) -> Result<()> {
    if values.is_empty() || position > self.length {
      return Ok(());
    }
    self.room_for(values.len())?;
    self.gap_to(position);
    self.body[self.part1_len..self.part1_len + values.len()].copy_from_slice(values);
    self.advance_part1(values.len());
    Ok(())
  }

  /// Appends `count` copies of `value`.
  pub fn push_value(&mut self, count: usize, value: T) -> Result<()> {
    self.insert_value(self.length, count, value)
  }

  /// Extends the vector with default elements until it holds `len` elements.
  pub fn ensure_length(&mut self, len: usize) -> Result<()> {
    if len > self.length {
      self.push_value(len - self.length, T::default())?;
    }
    Ok(())
  }

  pub fn delete(&mut self, position: usize) {
    self.delete_range(position, 1);
  }

  pub fn delete_range(&mut self, position: usize, delete_len: usize) {
    if delete_len == 0 || position >= self.length {
      return;
    }
    let delete_len = delete_len.min(self.length - position);
    if position == 0 && delete_len == self.length {
      self.delete_all();
      return;
    }
    self.gap_to(position);
    self.length -= delete_len;
    self.gap_len += delete_len;
  }

  pub fn delete_all(&mut self) {
    self.body = Vec::new();
    self.length = 0;
    self.part1_len = 0;
    self.gap_len = 0;
    self.grow_size = DEFAULT_GROW_SIZE;
  }

  /// Returns `[position, position + len)` as the slices before and after the
  /// gap. Either slice may be empty and the range is clipped to the length.
  pub fn range(&self, position: usize, len: usize) -> (&[T], &[T]) {
    let start = position.min(self.length);
    let end = position.saturating_add(len).min(self.length);
    if end <= self.part1_len {
      (&self.body[start..end], &[])
    } else if start >= self.part1_len {
      let gap = self.gap_len;
      (&self.body[start + gap..end + gap], &[])
    } else {
      (
        &self.body[start..self.part1_len],
        &self.body[self.part1_len + self.gap_len..end + self.gap_len],
      )
    }
  }

  /// Moves the gap out of `[position, position + len)` and returns the range
  /// as one slice.
  pub fn range_contiguous(&mut self, position: usize, len: usize) -> &[T] {
    let start = position.min(self.length);
    let end = position.saturating_add(len).min(self.length);
    if start < self.part1_len && end > self.part1_len {
      self.gap_to(start);
    }
    if end <= self.part1_len {
      &self.body[start..end]
    } else {
      let gap = self.gap_len;
      &self.body[start + gap..end + gap]
    }
  }

  /// Copies `[position, position + len)` into `out`, replacing its contents.
  pub fn copy_range(&self, position: usize, len: usize, out: &mut Vec<T>) {
    let (first, second) = self.range(position, len);
    out.clear();
    out.extend_from_slice(first);
    out.extend_from_slice(second);
  }

  pub fn to_vec(&self, position: usize, len: usize) -> Vec<T> {
    let mut out = Vec::with_capacity(len.min(self.length));
    self.copy_range(position, len, &mut out);
    out
  }

  pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
    let (first, second) = self.range(0, self.length);
    first.iter().chain(second.iter()).copied()
  }

  // Gap management.
  //

  fn gap_to(&mut self, position: usize) {
    if position == self.part1_len {
      return;
    }
    let gap = self.gap_len;
    if gap > 0 {
      if position < self.part1_len {
        self
          .body
          .copy_within(position..self.part1_len, position + gap);
      } else {
        self
          .body
          .copy_within(self.part1_len + gap..position + gap, self.part1_len);
      }
    }
    self.part1_len = position;
  }

  fn room_for(&mut self, insertion_len: usize) -> Result<()> {
    if self.gap_len <= insertion_len {
      while self.grow_size < self.body.len() / 6 {
        self.grow_size *= 2;
      }
      self.reserve(self.body.len() + insertion_len + self.grow_size)?;
    }
    Ok(())
  }

  fn advance_part1(&mut self, count: usize) {
    self.length += count;
    self.part1_len += count;
    self.gap_len -= count;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn contents(sv: &SplitVector<u8>) -> Vec<u8> {
    sv.iter().collect()
  }

  #[test]
  fn insert_and_delete_across_gap() {
    let mut sv = SplitVector::new();
    sv.insert_from_slice(0, b"hello world").unwrap();
    sv.insert_from_slice(5, b",").unwrap();
    assert_eq!(contents(&sv), b"hello, world");
    assert_eq!(sv.gap_position(), 6);

    sv.delete_range(0, 7);
    assert_eq!(contents(&sv), b"world");
    sv.insert_from_slice(5, b"!").unwrap();
    assert_eq!(contents(&sv), b"world!");
    assert_eq!(sv.len(), 6);
  }

  #[test]
  fn out_of_range_reads_yield_default() {
    let mut sv = SplitVector::new();
    sv.insert_from_slice(0, b"ab").unwrap();
    assert_eq!(sv.value_at(1), b'b');
    assert_eq!(sv.value_at(2), 0);
    assert_eq!(sv.value_at(usize::MAX), 0);
  }

  #[test]
  fn range_splits_at_gap() {
    let mut sv = SplitVector::new();
    sv.insert_from_slice(0, b"abcdef").unwrap();
    sv.insert_from_slice(3, b"X").unwrap();
    sv.delete(3);
    // Gap now sits at 3.
    let (first, second) = sv.range(1, 4);
    assert_eq!(first, b"bc");
    assert_eq!(second, b"de");
    assert_eq!(sv.range_contiguous(1, 4), b"bcde");
    assert_eq!(sv.to_vec(4, 10), b"ef".to_vec());
  }

  #[test]
  fn insert_value_fills() {
    let mut sv: SplitVector<i32> = SplitVector::new();
    sv.insert_value(0, 3, 7).unwrap();
    sv.insert(1, 1).unwrap();
    assert_eq!(sv.iter().collect::<Vec<_>>(), vec![7, 1, 7, 7]);
    if let Some(v) = sv.get_mut(3) {
      *v = 9;
    }
    assert_eq!(sv.value_at(3), 9);
    sv.ensure_length(6).unwrap();
    assert_eq!(sv.len(), 6);
    assert_eq!(sv.value_at(5), 0);
  }

  quickcheck::quickcheck! {
    fn matches_vec_model(ops: Vec<(bool, u8, u8)>) -> bool {
      let mut sv = SplitVector::new();
      let mut model: Vec<u8> = Vec::new();
      for (insert, at, n) in ops {
        let at = if model.is_empty() { 0 } else { at as usize % (model.len() + 1) };
        if insert {
          let data: Vec<u8> = (0..n % 16).collect();
          sv.insert_from_slice(at, &data).unwrap();
          model.splice(at..at, data);
        } else {
          let len = (n as usize % 8).min(model.len() - at.min(model.len()));
          sv.delete_range(at, len);
          model.drain(at..at + len);
        }
      }
      sv.iter().collect::<Vec<_>>() == model
    }
  }
}
