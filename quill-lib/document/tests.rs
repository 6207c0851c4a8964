use std::{
  cell::RefCell,
  rc::Rc,
};

use quickcheck::{
  Arbitrary,
  Gen,
};

use super::*;
use crate::watcher::DocWatcher;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
  Attempt,
  SavePoint(bool),
  Modified(ModificationFlags, usize, usize),
  Error(Status),
}

#[derive(Default)]
struct Recorder {
  events:         Vec<Event>,
  /// Clears read only state when an edit is attempted.
  allow_edits:    bool,
  /// Replaces checked insertions.
  replacement:    Option<Vec<u8>>,
  /// Tries to edit from inside the insertion notification.
  reenter:        bool,
  reenter_result: Option<usize>,
}

impl DocWatcher for Recorder {
  fn notify_modify_attempt(&mut self, doc: &mut Document, _token: usize) {
    self.events.push(Event::Attempt);
    if self.allow_edits {
      doc.set_read_only(false);
    }
  }

  fn notify_save_point(&mut self, _doc: &mut Document, _token: usize, at_save_point: bool) {
    self.events.push(Event::SavePoint(at_save_point));
  }

  fn notify_modified(&mut self, doc: &mut Document, modification: &DocModification, _token: usize) {
    self.events.push(Event::Modified(
      modification.flags,
      modification.position,
      modification.length,
    ));
    if modification.flags.contains(ModificationFlags::INSERT_CHECK) {
      if let Some(replacement) = &self.replacement {
        doc.change_insertion(replacement);
      }
    }
    if self.reenter && modification.flags.contains(ModificationFlags::INSERT_TEXT) {
      self.reenter_result = Some(doc.insert_string(0, b"!"));
    }
  }

  fn notify_error_occurred(&mut self, _doc: &mut Document, _token: usize, status: Status) {
    self.events.push(Event::Error(status));
  }
}

fn watched(doc: &mut Document) -> Rc<RefCell<Recorder>> {
  let recorder = Rc::new(RefCell::new(Recorder::default()));
  let handle: WatcherHandle = recorder.clone();
  assert!(doc.add_watcher(&handle, 0));
  recorder
}

fn take_events(recorder: &Rc<RefCell<Recorder>>) -> Vec<Event> {
  std::mem::take(&mut recorder.borrow_mut().events)
}

fn text(doc: &Document) -> String {
  String::from_utf8_lossy(&doc.text()).into_owned()
}

#[test]
fn insertion_notifies_in_order() {
  let mut doc = Document::new();
  let recorder = watched(&mut doc);
  assert_eq!(doc.insert_string(0, b"ab\ncd"), 5);
  assert_eq!(text(&doc), "ab\ncd");
  assert_eq!(take_events(&recorder), vec![
    Event::Modified(ModificationFlags::INSERT_CHECK, 0, 5),
    Event::Modified(ModificationFlags::BEFORE_INSERT | ModificationFlags::USER, 0, 5),
    Event::SavePoint(false),
    Event::Modified(
      ModificationFlags::INSERT_TEXT | ModificationFlags::USER | ModificationFlags::START_ACTION,
      0,
      5
    ),
  ]);
}

#[test]
fn deletion_notifies_in_order() {
  let mut doc = Document::new();
  doc.insert_string(0, b"hello");
  let recorder = watched(&mut doc);
  assert!(doc.delete_chars(1, 3));
  assert_eq!(text(&doc), "ho");
  assert_eq!(take_events(&recorder), vec![
    Event::Modified(ModificationFlags::BEFORE_DELETE | ModificationFlags::USER, 1, 3),
    Event::Modified(
      ModificationFlags::DELETE_TEXT | ModificationFlags::USER | ModificationFlags::START_ACTION,
      1,
      3
    ),
  ]);
}

#[test]
fn out_of_range_edits_do_nothing() {
  let mut doc = Document::new();
  doc.insert_string(0, b"abc");
  let recorder = watched(&mut doc);
  assert_eq!(doc.insert_string(4, b"x"), 0);
  assert_eq!(doc.insert_string(1, b""), 0);
  assert!(!doc.delete_chars(2, 5));
  assert!(!doc.delete_chars(1, 0));
  assert!(!doc.delete_chars(usize::MAX, 2));
  assert!(take_events(&recorder).is_empty());
  assert_eq!(text(&doc), "abc");
}

#[test]
fn read_only_documents_ask_watchers() {
  let mut doc = Document::new();
  doc.insert_string(0, b"abc");
  doc.set_read_only(true);
  let recorder = watched(&mut doc);

  assert_eq!(doc.insert_string(0, b"x"), 0);
  assert!(!doc.delete_chars(0, 1));
  assert_eq!(take_events(&recorder), vec![Event::Attempt, Event::Attempt]);
  assert_eq!(text(&doc), "abc");

  recorder.borrow_mut().allow_edits = true;
  assert_eq!(doc.insert_string(0, b"x"), 1);
  assert!(!doc.is_read_only());
  assert_eq!(text(&doc), "xabc");
}

#[test]
fn edits_from_callbacks_are_ignored() {
  let mut doc = Document::new();
  let recorder = watched(&mut doc);
  recorder.borrow_mut().reenter = true;
  assert_eq!(doc.insert_string(0, b"abc"), 3);
  assert_eq!(recorder.borrow().reenter_result, Some(0));
  assert_eq!(text(&doc), "abc");
}

#[test]
fn insert_check_can_replace_text() {
  let mut doc = Document::new();
  let recorder = watched(&mut doc);
  recorder.borrow_mut().replacement = Some(b"XYZ".to_vec());
  assert_eq!(doc.insert_string(0, b"a"), 3);
  assert_eq!(text(&doc), "XYZ");

  recorder.borrow_mut().replacement = Some(Vec::new());
  assert_eq!(doc.insert_string(0, b"a"), 0);
  assert_eq!(text(&doc), "XYZ");

  // Outside a check the replacement is dropped.
  recorder.borrow_mut().replacement = None;
  doc.change_insertion(b"ignored");
  assert_eq!(doc.insert_string(3, b"!"), 1);
  assert_eq!(text(&doc), "XYZ!");
}

#[test]
fn typing_undoes_as_one_turn() {
  let mut doc = Document::new();
  for (i, ch) in [b"a", b"b", b"c"].iter().enumerate() {
    doc.insert_string(i, *ch);
  }
  assert!(doc.can_undo());
  assert_eq!(doc.undo(), Some(0));
  assert!(doc.is_empty());
  assert!(!doc.can_undo());
  assert_eq!(doc.redo(), Some(3));
  assert_eq!(text(&doc), "abc");
  assert!(!doc.can_redo());
}

#[test]
fn backspace_run_undoes_to_the_end_of_the_restored_text() {
  let mut doc = Document::new();
  doc.insert_string(0, b"abcd");
  assert!(doc.del_char_back(4));
  assert!(doc.del_char_back(3));
  assert!(doc.del_char_back(2));
  assert_eq!(text(&doc), "a");
  assert_eq!(doc.undo(), Some(4));
  assert_eq!(text(&doc), "abcd");
}

#[test]
fn crlf_is_deleted_whole() {
  let mut doc = Document::new();
  doc.insert_string(0, b"a\r\nb");
  assert!(doc.del_char_back(3));
  assert_eq!(text(&doc), "ab");
  doc.insert_string(1, b"\r\n");
  assert!(doc.del_char(1));
  assert_eq!(text(&doc), "ab");
}

#[test]
fn groups_undo_together() {
  let mut doc = Document::new();
  doc.insert_string(0, b"hello");
  doc.undo_group(|doc| {
    doc.insert_string(0, b"<");
    let end = doc.len();
    doc.insert_string(end, b">");
  });
  assert_eq!(text(&doc), "<hello>");
  let recorder = watched(&mut doc);
  assert_eq!(doc.undo(), Some(0));
  assert_eq!(text(&doc), "hello");
  let last = take_events(&recorder)
    .into_iter()
    .filter_map(|event| match event {
      Event::Modified(flags, ..) if flags.contains(ModificationFlags::UNDO) => Some(flags),
      _ => None,
    })
    .last();
  let last = last.unwrap();
  assert!(last.contains(ModificationFlags::MULTI_STEP_UNDO_REDO));
  assert!(last.contains(ModificationFlags::LAST_STEP_IN_UNDO_REDO));
  assert!(!last.contains(ModificationFlags::MULTILINE_UNDO_REDO));
}

#[test]
fn save_point_is_reported() {
  let mut doc = Document::new();
  let recorder = watched(&mut doc);
  doc.insert_string(0, b"a");
  doc.set_save_point();
  doc.insert_string(1, b"\n");
  doc.undo();
  assert!(doc.is_save_point());
  doc.undo();
  let save_points: Vec<_> = take_events(&recorder)
    .into_iter()
    .filter(|event| matches!(event, Event::SavePoint(_)))
    .collect();
  assert_eq!(save_points, vec![
    Event::SavePoint(false),
    Event::SavePoint(true),
    Event::SavePoint(false),
    Event::SavePoint(true),
    Event::SavePoint(false),
  ]);
}

#[test]
fn container_actions_are_replayed() {
  let mut doc = Document::new();
  doc.insert_string(0, b"a");
  doc.add_undo_action(7, false);
  let recorder = watched(&mut doc);
  assert_eq!(doc.undo(), None);
  assert_eq!(text(&doc), "a");
  let events = take_events(&recorder);
  assert!(events.contains(&Event::Modified(
    ModificationFlags::CONTAINER | ModificationFlags::UNDO,
    0,
    0
  )));
  assert_eq!(doc.undo(), Some(0));
  assert!(doc.is_empty());
}

#[test]
fn tentative_undo_leaves_no_redo() {
  let mut doc = Document::new();
  doc.insert_string(0, b"ab");
  doc.tentative_start();
  assert!(doc.tentative_active());
  doc.insert_string(2, b"c");
  doc.insert_string(3, b"d");
  doc.tentative_undo();
  assert_eq!(text(&doc), "ab");
  assert!(!doc.tentative_active());
  assert!(!doc.can_redo());
  assert_eq!(doc.undo(), Some(0));
}

#[test]
fn nothing_is_replayed_without_collection() {
  let mut doc = Document::new();
  doc.insert_string(0, b"ab");
  doc.set_undo_collection(false);
  assert_eq!(doc.undo(), None);
  assert_eq!(text(&doc), "ab");
  doc.set_undo_collection(true);
  doc.delete_undo_history();
  assert!(!doc.can_undo());
}

#[test]
fn loading_appends_data() {
  let mut doc = Document::new();
  doc.allocate(64).unwrap();
  doc.add_data(b"one\n").unwrap();
  doc.add_data(b"two").unwrap();
  assert_eq!(text(&doc), "one\ntwo");
  assert_eq!(doc.lines_total(), 2);
}

#[test]
fn load_error_status() {
  let mut reserve = Vec::<u8>::new();
  let err = reserve.try_reserve(usize::MAX).unwrap_err();
  let err = LoadError::from(BufferError::from(err));
  assert_eq!(err.status(), Status::BadAlloc);
  assert!(err.to_string().starts_with("out of memory while loading"));
}

#[test]
fn code_page_change_restyles() {
  let mut doc = Document::new();
  assert!(!doc.set_code_page(0));
  assert!(doc.set_code_page(65001));
  assert!(doc.encoding().is_utf8());
  assert_eq!(doc.code_page(), 65001);
}

#[test]
fn bad_regex_is_reported() {
  let mut doc = Document::new();
  doc.insert_string(0, b"abc");
  let recorder = watched(&mut doc);
  let len = doc.len();
  assert!(doc.find_text(0, len, b"\\(a", FindFlags::REGEXP).is_err());
  assert_eq!(take_events(&recorder), vec![Event::Error(Status::WarnRegex)]);
}

#[test]
fn dropped_watchers_are_not_called() {
  let mut doc = Document::new();
  {
    let recorder = watched(&mut doc);
    drop(recorder);
  }
  assert_eq!(doc.insert_string(0, b"a"), 1);
}

#[derive(Debug, Clone)]
enum Edit {
  Insert(usize, Vec<u8>),
  Delete(usize, usize),
}

impl Arbitrary for Edit {
  fn arbitrary(g: &mut Gen) -> Self {
    let position = usize::arbitrary(g);
    if bool::arbitrary(g) {
      let len = 1 + usize::arbitrary(g) % 4;
      let text = (0..len)
        .map(|_| *g.choose(b"ab \n\r").unwrap_or(&b'a'))
        .collect();
      Self::Insert(position, text)
    } else {
      Self::Delete(position, 1 + usize::arbitrary(g) % 3)
    }
  }
}

fn count_lines(text: &[u8]) -> usize {
  let lone_cr = text
    .iter()
    .enumerate()
    .filter(|&(i, &b)| b == b'\r' && text.get(i + 1) != Some(&b'\n'))
    .count();
  1 + lone_cr + text.iter().filter(|&&b| b == b'\n').count()
}

quickcheck::quickcheck! {
  fn undo_then_redo_restores_every_state(edits: Vec<Edit>) -> bool {
    let mut doc = Document::new();
    for edit in &edits {
      let len = doc.len();
      match edit {
        Edit::Insert(position, text) => {
          doc.insert_string(position % (len + 1), text);
        },
        Edit::Delete(position, count) if len > 0 => {
          let position = position % len;
          doc.delete_chars(position, (*count).min(len - position));
        },
        Edit::Delete(..) => {},
      }
    }
    let edited = doc.text();
    while doc.can_undo() {
      doc.undo();
    }
    let undone = doc.is_empty() && doc.is_save_point();
    while doc.can_redo() {
      doc.redo();
    }
    undone && doc.text() == edited && doc.lines_total() == count_lines(&edited)
  }
}
