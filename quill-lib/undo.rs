//! Undo history.
//!
//! The history is a flat list of [`Action`]s. Consecutive actions that
//! belong to one user visible step (a *turn*) are chained through
//! `may_coalesce`: an action with the flag set is undone together with the
//! action after it. Typing and backspacing coalesce automatically; compound
//! commands are grouped explicitly with [`UndoHistory::begin_undo_action`] and
//! [`UndoHistory::end_undo_action`].
//!
//! ```text
//! actions:   [ins "a"] [ins "b"] [ins "c"] [del "c"] [ins "x"]
//! coalesce:      ✓         ✓         ✗         ✗         ✓
//! turns:     |------- 1 --------|  |- 2 -|  |- 3 -|
//!                                                     ^ current
//! ```

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
  Insert,
  Remove,
  /// Opaque entry added by the embedding application.
  Container,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
  pub kind:         ActionKind,
  pub may_coalesce: bool,
  /// Byte position for text actions, the caller's token for container
  /// actions.
  pub position:     usize,
  pub data:         Vec<u8>,
}

impl Action {
  #[inline]
  pub fn len(&self) -> usize {
    self.data.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }
}

#[derive(Debug, Clone)]
pub struct UndoHistory {
  actions:             Vec<Action>,
  current:             usize,
  undo_sequence_depth: usize,
  save_point:          Option<usize>,
  tentative_point:     Option<usize>,
  detach_point:        Option<usize>,
}

impl Default for UndoHistory {
  fn default() -> Self {
    Self::new()
  }
}

impl UndoHistory {
  pub fn new() -> Self {
    Self {
      actions:             Vec::new(),
      current:             0,
      undo_sequence_depth: 0,
      save_point:          Some(0),
      tentative_point:     None,
      detach_point:        None,
    }
  }

  /// Records an action, discarding any redo history. Returns true when the
  /// action starts a new turn.
  pub fn append_action(
    &mut self,
    kind: ActionKind,
    position: usize,
    data: &[u8],
    may_coalesce: bool,
  ) -> bool {
    if self.save_point.is_some_and(|save| self.current < save) {
      // History before the save point is overwritten.
      self.save_point = None;
      if self.detach_point.is_none() {
        self.detach_point = Some(self.current);
      }
    } else if self.detach_point.is_some_and(|detach| detach > self.current) {
      self.detach_point = Some(self.current);
    }

    let may_coalesce = may_coalesce || self.undo_sequence_depth > 0;
    let coalesce = self.current > 0 && self.can_coalesce(kind, position, data.len(), may_coalesce);
    let start_sequence = !coalesce;

    if self.current > 0 && start_sequence {
      self.actions[self.current - 1].may_coalesce = false;
    }
    self.actions.truncate(self.current);
    self.actions.push(Action {
      kind,
      may_coalesce,
      position,
      data: data.to_vec(),
    });
    self.current += 1;
    start_sequence
  }

  fn can_coalesce(&self, kind: ActionKind, position: usize, len: usize, may_coalesce: bool) -> bool {
    let mut target = self.current - 1;
    if self.undo_sequence_depth > 0 {
      // Grouped actions coalesce unless the group has just been opened.
      return self.actions[target].may_coalesce;
    }

    // Container actions forward the coalesce state of the text action
    // before them.
    while target > 0
      && self.actions[target].kind == ActionKind::Container
      && self.actions[target].may_coalesce
    {
      target -= 1;
    }
    let previous = &self.actions[target];

    if Some(self.current) == self.save_point || Some(self.current) == self.tentative_point {
      return false;
    }
    if !may_coalesce || !previous.may_coalesce {
      return false;
    }
    if kind == ActionKind::Container || previous.kind == ActionKind::Container {
      return true;
    }
    if kind != previous.kind {
      return false;
    }
    match kind {
      // Typing: each insertion continues where the previous ended.
      ActionKind::Insert => position == previous.position + previous.len(),
      // Backspace or delete of single characters at one spot.
      ActionKind::Remove => {
        (len == 1 || len == 2) && (position + len == previous.position || position == previous.position)
      },
      ActionKind::Container => true,
    }
  }

  /// Opens a group. Groups nest; the turn closes when the outermost group
  /// ends.
  pub fn begin_undo_action(&mut self, may_coalesce: bool) {
    if self.undo_sequence_depth == 0 && self.current > 0 {
      self.actions[self.current - 1].may_coalesce = may_coalesce;
    }
    self.undo_sequence_depth += 1;
  }

  pub fn end_undo_action(&mut self) {
    self.undo_sequence_depth = self.undo_sequence_depth.saturating_sub(1);
    if self.undo_sequence_depth == 0 && self.current > 0 {
      self.actions[self.current - 1].may_coalesce = false;
    }
  }

  pub fn drop_undo_sequence(&mut self) {
    self.undo_sequence_depth = 0;
  }

  #[inline]
  pub fn undo_sequence_depth(&self) -> usize {
    self.undo_sequence_depth
  }

  pub fn delete_undo_history(&mut self) {
    self.actions.clear();
    self.current = 0;
    self.save_point = Some(0);
    self.tentative_point = None;
    self.detach_point = None;
  }

  #[inline]
  pub fn actions(&self) -> usize {
    self.actions.len()
  }

  #[inline]
  pub fn current(&self) -> usize {
    self.current
  }

  pub fn action(&self, index: usize) -> Option<&Action> {
    self.actions.get(index)
  }

  pub fn set_save_point(&mut self) {
    self.save_point = Some(self.current);
    self.detach_point = None;
  }

  #[inline]
  pub fn save_point(&self) -> Option<usize> {
    self.save_point
  }

  #[inline]
  pub fn is_save_point(&self) -> bool {
    self.save_point == Some(self.current)
  }

  /// True when undoing further moves away from a save point that can still
  /// be reached, or when the save point is lost.
  pub fn before_save_point(&self) -> bool {
    self.save_point.is_none_or(|save| save > self.current)
  }

  pub fn after_save_point(&self) -> bool {
    self.save_point.is_some_and(|save| save <= self.current)
  }

  /// Where history diverged from the saved state, once the save point has
  /// become unreachable.
  #[inline]
  pub fn detach_point(&self) -> Option<usize> {
    self.detach_point
  }

  pub fn tentative_start(&mut self) {
    self.tentative_point = Some(self.current);
  }

  /// Accepts the tentative actions and drops any redo history.
  pub fn tentative_commit(&mut self) {
    self.tentative_point = None;
    self.actions.truncate(self.current);
  }

  #[inline]
  pub fn tentative_active(&self) -> bool {
    self.tentative_point.is_some()
  }

  /// Actions recorded since the tentative start.
  pub fn tentative_steps(&self) -> Option<usize> {
    self
      .tentative_point
      .map(|point| self.current.saturating_sub(point))
  }

  #[inline]
  pub fn can_undo(&self) -> bool {
    self.current > 0 && !self.actions.is_empty()
  }

  /// Number of actions in the turn before `current`.
  pub fn start_undo(&self) -> usize {
    if self.current == 0 {
      return 0;
    }
    let mut act = self.current - 1;
    while act > 0 && self.actions[act - 1].may_coalesce {
      act -= 1;
    }
    self.current - act
  }

  /// The action undone next. Only valid while [`Self::can_undo`] holds.
  pub fn undo_step(&self) -> &Action {
    &self.actions[self.current - 1]
  }

  pub fn completed_undo_step(&mut self) {
    self.current -= 1;
  }

  #[inline]
  pub fn can_redo(&self) -> bool {
    self.actions.len() > self.current
  }

  /// Number of actions in the turn starting at `current`.
  pub fn start_redo(&self) -> usize {
    if self.current >= self.actions.len() {
      return 0;
    }
    // The last action may still carry `may_coalesce`.
    let max_action = self.actions.len() - 1;
    let mut act = self.current;
    while act <= max_action && self.actions[act].may_coalesce {
      act += 1;
    }
    act.min(max_action) - self.current + 1
  }

  /// The action redone next. Only valid while [`Self::can_redo`] holds.
  pub fn redo_step(&self) -> &Action {
    &self.actions[self.current]
  }

  pub fn completed_redo_step(&mut self) {
    self.current += 1;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn insert(history: &mut UndoHistory, position: usize, text: &str) -> bool {
    history.append_action(ActionKind::Insert, position, text.as_bytes(), true)
  }

  fn remove(history: &mut UndoHistory, position: usize, text: &str) -> bool {
    history.append_action(ActionKind::Remove, position, text.as_bytes(), true)
  }

  #[test]
  fn typing_coalesces_into_one_turn() {
    let mut history = UndoHistory::new();
    history.set_save_point();
    assert!(insert(&mut history, 0, "a"));
    assert!(!insert(&mut history, 1, "b"));
    assert!(!insert(&mut history, 2, "c"));
    assert_eq!(history.start_undo(), 3);

    // A jump elsewhere starts a new turn.
    assert!(insert(&mut history, 10, "d"));
    assert_eq!(history.start_undo(), 1);
  }

  #[test]
  fn backspace_and_delete_coalesce() {
    let mut history = UndoHistory::new();
    insert(&mut history, 0, "hello");
    assert!(remove(&mut history, 4, "o"));
    assert!(!remove(&mut history, 3, "l"));
    // Delete at the same spot.
    assert!(!remove(&mut history, 3, "x"));
    // Removing more than two bytes never coalesces.
    assert!(remove(&mut history, 0, "hel"));
    assert_eq!(history.start_undo(), 1);
  }

  #[test]
  fn save_point_breaks_coalescing() {
    let mut history = UndoHistory::new();
    insert(&mut history, 0, "a");
    history.set_save_point();
    assert!(insert(&mut history, 1, "b"));
    assert!(!history.is_save_point());
  }

  #[test]
  fn groups_form_one_turn() {
    let mut history = UndoHistory::new();
    insert(&mut history, 0, "abc");
    history.begin_undo_action(false);
    assert!(remove(&mut history, 0, "abc"));
    assert!(!insert(&mut history, 0, "xyz"));
    history.begin_undo_action(false);
    assert!(!insert(&mut history, 20, "nested"));
    history.end_undo_action();
    assert!(!remove(&mut history, 0, "x"));
    history.end_undo_action();
    assert_eq!(history.start_undo(), 4);

    // The group is closed, so typing after it starts afresh.
    assert!(insert(&mut history, 2, "q"));
  }

  #[test]
  fn undo_and_redo_walk_turns() {
    let mut history = UndoHistory::new();
    insert(&mut history, 0, "a");
    insert(&mut history, 1, "b");
    insert(&mut history, 5, "c");
    assert!(history.can_undo());
    assert!(!history.can_redo());

    let steps = history.start_undo();
    assert_eq!(steps, 1);
    assert_eq!(history.undo_step().data, b"c");
    history.completed_undo_step();

    let steps = history.start_undo();
    assert_eq!(steps, 2);
    for _ in 0..steps {
      history.completed_undo_step();
    }
    assert!(!history.can_undo());
    assert!(history.is_save_point());

    assert_eq!(history.start_redo(), 2);
    assert_eq!(history.redo_step().data, b"a");
    history.completed_redo_step();
    history.completed_redo_step();
    assert_eq!(history.start_redo(), 1);
  }

  #[test]
  fn overwriting_history_detaches_save_point() {
    let mut history = UndoHistory::new();
    insert(&mut history, 0, "a");
    insert(&mut history, 5, "b");
    history.set_save_point();
    history.completed_undo_step();
    assert!(history.before_save_point());
    insert(&mut history, 9, "z");
    assert_eq!(history.save_point(), None);
    assert_eq!(history.detach_point(), Some(1));
    assert!(!history.can_redo());
  }

  #[test]
  fn container_actions_forward_coalescing() {
    let mut history = UndoHistory::new();
    insert(&mut history, 0, "a");
    assert!(!history.append_action(ActionKind::Container, 7, &[], true));
    assert!(!insert(&mut history, 1, "b"));
    assert_eq!(history.start_undo(), 3);
    assert!(history.append_action(ActionKind::Container, 8, &[], false));
  }

  #[test]
  fn tentative_steps_count_from_start() {
    let mut history = UndoHistory::new();
    insert(&mut history, 0, "a");
    history.tentative_start();
    assert_eq!(history.tentative_steps(), Some(0));
    // Tentative edits never merge into what came before.
    assert!(insert(&mut history, 1, "b"));
    insert(&mut history, 2, "c");
    assert_eq!(history.tentative_steps(), Some(2));
    history.tentative_commit();
    assert!(!history.tentative_active());
    assert_eq!(history.tentative_steps(), None);
  }

  #[test]
  fn clearing_resets_everything() {
    let mut history = UndoHistory::new();
    insert(&mut history, 0, "a");
    history.tentative_start();
    history.delete_undo_history();
    assert_eq!(history.actions(), 0);
    assert!(history.is_save_point());
    assert!(!history.tentative_active());
    assert_eq!(history.start_redo(), 0);
  }
}
