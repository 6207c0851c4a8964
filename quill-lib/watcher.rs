//! Change notifications.
//!
//! Every structural change to a [`Document`] is broadcast synchronously to
//! its registered watchers, in registration order, before the mutating call
//! returns. The document only keeps weak handles: a watcher that has been
//! dropped is silently forgotten.

use std::{
  cell::RefCell,
  rc::{
    Rc,
    Weak,
  },
};

use bitflags::bitflags;

use crate::document::Document;

bitflags! {
  /// What a [`DocModification`] describes.
  #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
  pub struct ModificationFlags: u32 {
    const INSERT_TEXT            = 0x1;
    const DELETE_TEXT            = 0x2;
    const CHANGE_STYLE           = 0x4;
    const CHANGE_FOLD            = 0x8;
    const USER                   = 0x10;
    const UNDO                   = 0x20;
    const REDO                   = 0x40;
    const MULTI_STEP_UNDO_REDO   = 0x80;
    const LAST_STEP_IN_UNDO_REDO = 0x100;
    const CHANGE_MARKER          = 0x200;
    const BEFORE_INSERT          = 0x400;
    const BEFORE_DELETE          = 0x800;
    const MULTILINE_UNDO_REDO    = 0x1000;
    const START_ACTION           = 0x2000;
    const CHANGE_LINE_STATE      = 0x8000;
    const CHANGE_MARGIN          = 0x10000;
    const CHANGE_ANNOTATION      = 0x20000;
    const CONTAINER              = 0x40000;
    const LEXER_STATE            = 0x80000;
    const INSERT_CHECK           = 0x100000;
  }
}

/// One structural change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocModification {
  pub flags:                  ModificationFlags,
  pub position:               usize,
  pub length:                 usize,
  pub lines_added:            isize,
  /// Bytes inserted or removed, when the change carries text.
  pub text:                   Option<Vec<u8>>,
  pub line:                   Option<usize>,
  pub fold_level_now:         u32,
  pub fold_level_prev:        u32,
  pub annotation_lines_added: isize,
  /// Caller supplied token of a container undo action.
  pub token:                  usize,
}

impl DocModification {
  pub fn new(flags: ModificationFlags, position: usize, length: usize) -> Self {
    Self {
      flags,
      position,
      length,
      ..Default::default()
    }
  }

  #[must_use]
  pub fn with_text(mut self, text: &[u8]) -> Self {
    self.text = Some(text.to_vec());
    self
  }

  #[must_use]
  pub fn with_lines_added(mut self, lines_added: isize) -> Self {
    self.lines_added = lines_added;
    self
  }

  #[must_use]
  pub fn with_line(mut self, line: usize) -> Self {
    self.line = Some(line);
    self
  }
}

/// Status codes reported through [`DocWatcher::notify_error_occurred`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
  #[default]
  Ok,
  Failure,
  BadAlloc,
  WarnRegex,
}

impl Status {
  pub const fn code(self) -> i32 {
    match self {
      Self::Ok => 0,
      Self::Failure => 1,
      Self::BadAlloc => 2,
      Self::WarnRegex => 1001,
    }
  }
}

/// Receiver of document events. Every method defaults to doing nothing.
///
/// Callbacks get mutable access to the document so they can react, for
/// example by replacing text during [`ModificationFlags::INSERT_CHECK`].
/// Mutations made from inside a modification callback are rejected by the
/// document's reentrancy guard.
#[allow(unused_variables)]
pub trait DocWatcher {
  fn notify_modify_attempt(&mut self, doc: &mut Document, token: usize) {}

  fn notify_save_point(&mut self, doc: &mut Document, token: usize, at_save_point: bool) {}

  fn notify_modified(&mut self, doc: &mut Document, modification: &DocModification, token: usize) {}

  /// The document is being dropped.
  fn notify_deleted(&mut self, doc: &Document, token: usize) {}

  /// Styling is needed up to `end_style_needed` and no lexer is attached.
  fn notify_style_needed(&mut self, doc: &mut Document, token: usize, end_style_needed: usize) {}

  fn notify_lexer_changed(&mut self, doc: &mut Document, token: usize) {}

  fn notify_error_occurred(&mut self, doc: &mut Document, token: usize, status: Status) {}
}

pub type WatcherHandle = Rc<RefCell<dyn DocWatcher>>;

#[derive(Clone)]
pub(crate) struct WatcherEntry {
  pub(crate) watcher: Weak<RefCell<dyn DocWatcher>>,
  pub(crate) token:   usize,
}

impl WatcherEntry {
  fn is(&self, watcher: &WatcherHandle, token: usize) -> bool {
    self.token == token && Weak::ptr_eq(&self.watcher, &Rc::downgrade(watcher))
  }
}

/// Ordered registration list.
#[derive(Clone, Default)]
pub(crate) struct Watchers {
  entries: Vec<WatcherEntry>,
}

impl Watchers {
  /// Returns false when the pair is already registered.
  pub(crate) fn add(&mut self, watcher: &WatcherHandle, token: usize) -> bool {
    self.prune();
    if self.entries.iter().any(|entry| entry.is(watcher, token)) {
      tracing::warn!(token, "watcher already registered");
      return false;
    }
    self.entries.push(WatcherEntry {
      watcher: Rc::downgrade(watcher),
      token,
    });
    true
  }

  pub(crate) fn remove(&mut self, watcher: &WatcherHandle, token: usize) -> bool {
    match self.entries.iter().position(|entry| entry.is(watcher, token)) {
      Some(index) => {
        self.entries.remove(index);
        true
      },
      None => false,
    }
  }

  /// Live watchers in registration order. The list is a snapshot so
  /// callbacks may register or remove watchers while it is walked.
  pub(crate) fn snapshot(&mut self) -> Vec<(WatcherHandle, usize)> {
    self.prune();
    self
      .entries
      .iter()
      .filter_map(|entry| entry.watcher.upgrade().map(|watcher| (watcher, entry.token)))
      .collect()
  }

  pub(crate) fn len(&self) -> usize {
    self.entries.len()
  }

  fn prune(&mut self) {
    self.entries.retain(|entry| entry.watcher.strong_count() > 0);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Nop;

  impl DocWatcher for Nop {}

  #[test]
  fn duplicate_pairs_are_rejected() {
    let mut watchers = Watchers::default();
    let a: WatcherHandle = Rc::new(RefCell::new(Nop));
    let b: WatcherHandle = Rc::new(RefCell::new(Nop));
    assert!(watchers.add(&a, 1));
    assert!(!watchers.add(&a, 1));
    assert!(watchers.add(&a, 2));
    assert!(watchers.add(&b, 1));
    assert_eq!(watchers.len(), 3);

    assert!(watchers.remove(&a, 1));
    assert!(!watchers.remove(&a, 1));
    assert_eq!(watchers.snapshot().len(), 2);
  }

  #[test]
  fn dropped_watchers_are_forgotten() {
    let mut watchers = Watchers::default();
    let a: WatcherHandle = Rc::new(RefCell::new(Nop));
    {
      let b: WatcherHandle = Rc::new(RefCell::new(Nop));
      watchers.add(&b, 0);
    }
    watchers.add(&a, 0);
    let live = watchers.snapshot();
    assert_eq!(live.len(), 1);
    assert!(Rc::ptr_eq(&live[0].0, &a));
  }

  #[test]
  fn status_codes() {
    assert_eq!(Status::Ok.code(), 0);
    assert_eq!(Status::BadAlloc.code(), 2);
    assert_eq!(Status::WarnRegex.code(), 1001);
  }
}
