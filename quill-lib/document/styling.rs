//! Styling watermark, lexer driving and brace matching.

use std::time::Instant;

use quill_core::line_ending::is_eol_byte;

use super::{
  Document,
  Lexer,
};
use crate::watcher::{
  DocModification,
  ModificationFlags,
};

const STYLE_CLOCK_PERIOD: u32 = 0x10_0000;

/// Partner of `ch` and whether it is searched for forwards.
fn brace_opposite(ch: u8) -> Option<(u8, bool)> {
  match ch {
    b'(' => Some((b')', true)),
    b')' => Some((b'(', false)),
    b'[' => Some((b']', true)),
    b']' => Some((b'[', false)),
    b'{' => Some((b'}', true)),
    b'}' => Some((b'{', false)),
    b'<' => Some((b'>', true)),
    b'>' => Some((b'<', false)),
    _ => None,
  }
}

impl Document {
  /// Moves the styling cursor to `position`.
  pub fn start_styling(&mut self, position: usize) {
    self.end_styled = position;
  }

  /// Everything before this position has been styled.
  #[inline]
  pub fn end_styled(&self) -> usize {
    self.end_styled
  }

  /// Styles `len` bytes at the styling cursor and advances it.
  ///
  /// Returns false when called from inside another styling call.
  pub fn set_style_for(&mut self, len: usize, style: u8) -> bool {
    if self.entered_styling != 0 {
      return false;
    }
    self.entered_styling += 1;
    let prev_end_styled = self.end_styled;
    if self.cb.set_style_for(prev_end_styled, len, style) {
      self.notify_modified(DocModification::new(
        ModificationFlags::CHANGE_STYLE | ModificationFlags::USER,
        prev_end_styled,
        len,
      ));
    }
    self.end_styled += len;
    self.entered_styling -= 1;
    true
  }

  /// Styles one byte per entry of `styles` from the styling cursor on.
  pub fn set_styles(&mut self, styles: &[u8]) -> bool {
    if self.entered_styling != 0 {
      return false;
    }
    self.entered_styling += 1;
    let mut changed: Option<(usize, usize)> = None;
    for &style in styles {
      let position = self.end_styled;
      self.end_styled += 1;
      if self.cb.set_style_at(position, style) {
        changed = Some(changed.map_or((position, position), |(start, _)| (start, position)));
      }
    }
    if let Some((start, end)) = changed {
      self.notify_modified(DocModification::new(
        ModificationFlags::CHANGE_STYLE | ModificationFlags::USER,
        start,
        end - start + 1,
      ));
    }
    self.entered_styling -= 1;
    true
  }

  /// Makes sure everything before `position` is styled, running the lexer
  /// or, without one, asking watchers.
  pub fn ensure_styled_to(&mut self, position: usize) {
    if self.entered_styling != 0 || position <= self.end_styled {
      return;
    }
    self.style_clock = (self.style_clock + 1) % STYLE_CLOCK_PERIOD;
    if self.lexer.is_none() || self.performing_style {
      self.notify_style_needed(position);
      return;
    }
    let Some(mut lexer) = self.lexer.take() else {
      return;
    };
    self.performing_style = true;
    let started = Instant::now();
    let start = self.line_start(self.line_from_position(self.end_styled));
    let end = position.min(self.len());
    let init_style = start.checked_sub(1).map_or(0, |pos| self.style_at(pos));
    let len = end.saturating_sub(start);
    if len > 0 {
      tracing::trace!(start, len, "lexing");
      lexer.lex(self, start, len, init_style);
      lexer.fold(self, start, len, init_style);
    }
    self.performing_style = false;
    self.lexer = Some(lexer);
    self.duration_style_one_byte.add_sample(len, started.elapsed());
  }

  /// Number of bytes that can be styled in `seconds`.
  pub fn style_budget(&self, seconds: f64) -> usize {
    self.duration_style_one_byte.actions_in_allowed_time(seconds)
  }

  /// Counter bumped by every styling pass that had work to do.
  #[inline]
  pub fn style_clock(&self) -> u32 {
    self.style_clock
  }

  /// Attaches or detaches the lexer. Styling restarts from the top.
  pub fn set_lexer(&mut self, lexer: Option<Box<dyn Lexer>>) {
    self.lexer = lexer;
    self.apply_line_end_types();
    self.modified_at(0);
    self.lexer_changed();
  }

  #[inline]
  pub fn has_lexer(&self) -> bool {
    self.lexer.is_some()
  }

  pub fn lexer_changed(&mut self) {
    self.notify_lexer_changed();
  }

  /// Reports that the lexer's private state changed over `[start, end)`.
  pub fn change_lexer_state(&mut self, start: usize, end: usize) {
    self.notify_modified(DocModification::new(
      ModificationFlags::LEXER_STATE,
      start,
      end.saturating_sub(start),
    ));
  }

  #[inline]
  pub fn style_at(&self, position: usize) -> u8 {
    self.cb.style_at(position)
  }

  pub fn style_range(&self, position: usize, len: usize) -> Vec<u8> {
    self.cb.style_range(position, len)
  }

  /// Extends `position` over bytes with the same style. With `single_line`
  /// the run stops at line ends.
  pub fn extend_style_range(&self, mut position: usize, delta: isize, single_line: bool) -> usize {
    let style = self.style_at(position);
    let same = |pos: usize| {
      self.style_at(pos) == style && (!single_line || !is_eol_byte(self.cb.char_at(pos)))
    };
    if delta < 0 {
      while position > 0 && same(position) {
        position -= 1;
      }
      position += 1;
    } else {
      while position < self.len() && same(position) {
        position += 1;
      }
    }
    position
  }

  /// Position of the brace matching the one at `position`.
  ///
  /// Only braces in the same style count, except past the styled region
  /// where nothing is known about styles yet.
  pub fn brace_match(&self, position: usize) -> Option<usize> {
    let ch_brace = self.cb.char_at(position);
    let (ch_seek, forwards) = brace_opposite(ch_brace)?;
    let direction: isize = if forwards { 1 } else { -1 };
    let style_brace = self.style_at(position);
    let mut depth = 1usize;
    let mut position = self.next_position(position, direction);
    while position < self.len() {
      let ch = self.cb.char_at(position);
      if (ch == ch_brace || ch == ch_seek)
        && (position > self.end_styled || self.style_at(position) == style_brace)
      {
        if ch == ch_brace {
          depth += 1;
        } else {
          depth -= 1;
        }
        if depth == 0 {
          return Some(position);
        }
      }
      let next = self.next_position(position, direction);
      if next == position {
        break;
      }
      position = next;
    }
    None
  }
}
