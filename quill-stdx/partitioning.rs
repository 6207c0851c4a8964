//! Monotonic partition start positions with a deferred shift.
//!
//! A [`Partitioning`] divides `[0, len)` into consecutive partitions. Line
//! starts are the main user: partition `n` is line `n`, and its start position
//! is the byte offset of the line.
//!
//! Text edits shift every partition after the edit point. Rather than
//! rewriting all of them, a pending `step` is kept: every stored start after
//! `step_partition` is short by `step_length`. Nearby edits grow or shrink the
//! pending step; the stored values are only brought up to date when an edit
//! lands far from the current step partition.

use crate::split_vector::{
  Result,
  SplitVector,
};

#[derive(Debug, Clone)]
pub struct Partitioning {
  step_partition: usize,
  step_length:    isize,
  body:           SplitVector<usize>,
}

impl Default for Partitioning {
  fn default() -> Self {
    Self::new()
  }
}

impl Partitioning {
  /// Creates a partitioning holding a single empty partition.
  pub fn new() -> Self {
    let mut body = SplitVector::new();
    // A failed allocation leaves the body empty; the first insert grows it.
    let _ = body.push_value(2, 0);
    Self {
      step_partition: 0,
      step_length: 0,
      body,
    }
  }

  #[inline]
  pub fn partitions(&self) -> usize {
    self.body.len().saturating_sub(1)
  }

  /// Inserts a partition boundary at `position` as partition `partition`.
  pub fn insert_partition(&mut self, partition: usize, position: usize) -> Result<()> {
    if self.step_partition < partition {
      self.apply_step(partition);
    }
    self.body.insert(partition, position)?;
    self.step_partition += 1;
    Ok(())
  }

  pub fn set_partition_start_position(&mut self, partition: usize, position: usize) {
    self.apply_step(partition + 1);
    if partition < self.body.len() {
      self.body.set_value_at(partition, position);
    }
  }

  /// Shifts every partition after `partition` by `delta`.
  pub fn insert_text(&mut self, partition: usize, delta: isize) {
    if self.step_length != 0 {
      if partition >= self.step_partition {
        // Fill in up to the new insertion point.
        self.apply_step(partition);
        self.step_length += delta;
      } else if partition + self.body.len() / 10 >= self.step_partition {
        // Close to the step, move it back.
        self.back_step(partition);
        self.step_length += delta;
      } else {
        self.apply_step(self.body.len() - 1);
        self.step_partition = partition;
        self.step_length = delta;
      }
    } else {
      self.step_partition = partition;
      self.step_length = delta;
    }
  }

  pub fn remove_partition(&mut self, partition: usize) {
    if partition > self.step_partition {
      self.apply_step(partition);
    }
    self.step_partition = self.step_partition.saturating_sub(1);
    self.body.delete(partition);
  }

  /// Returns the start position of `partition`, or 0 when it does not exist.
  pub fn position_from_partition(&self, partition: usize) -> usize {
    if partition >= self.body.len() {
      return 0;
    }
    let position = self.body.value_at(partition);
    if partition > self.step_partition {
      position.wrapping_add_signed(self.step_length)
    } else {
      position
    }
  }

  /// Returns the partition containing `position`. Positions beyond the last
  /// boundary belong to the last partition.
  pub fn partition_from_position(&self, position: usize) -> usize {
    if self.body.len() <= 1 {
      return 0;
    }
    if position >= self.position_from_partition(self.partitions()) {
      return self.partitions() - 1;
    }
    let mut lower = 0;
    let mut upper = self.partitions();
    while lower < upper {
      let middle = (upper + lower).div_ceil(2);
      let mut pos_middle = self.body.value_at(middle);
      if middle > self.step_partition {
        pos_middle = pos_middle.wrapping_add_signed(self.step_length);
      }
      if position < pos_middle {
        upper = middle - 1;
      } else {
        lower = middle;
      }
    }
    lower
  }

  pub fn delete_all(&mut self) {
    *self = Self::new();
  }

  fn apply_step(&mut self, partition_up_to: usize) {
    if self.step_length != 0 {
      self.range_add(
        self.step_partition + 1,
        partition_up_to.saturating_sub(self.step_partition),
        self.step_length,
      );
    }
    self.step_partition = partition_up_to;
    let last = self.body.len().saturating_sub(1);
    if self.step_partition >= last {
      self.step_partition = last;
      self.step_length = 0;
    }
  }

  fn back_step(&mut self, partition_down_to: usize) {
    if self.step_length != 0 {
      self.range_add(
        partition_down_to + 1,
        self.step_partition - partition_down_to,
        -self.step_length,
      );
    }
    self.step_partition = partition_down_to;
  }

  fn range_add(&mut self, start: usize, len: usize, delta: isize) {
    let end = (start + len).min(self.body.len());
    for i in start..end {
      if let Some(value) = self.body.get_mut(i) {
        *value = value.wrapping_add_signed(delta);
      }
    }
  }
}
