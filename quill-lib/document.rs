//! Document core state and mutation API.
//!
//! A [`Document`] owns the byte buffer, the per line stores, the undo history
//! and the styling state of one text. Positions are byte offsets; every
//! operation that takes a position from outside interprets it through the
//! document's [`Encoding`] so edits never split a character.
//!
//! # Design
//!
//! - Single threaded. Watchers are told about each change synchronously,
//!   before the mutating call returns.
//! - Reentrancy is blocked with explicit depth counters: a watcher that tries
//!   to edit the document from inside a modification callback is ignored.
//! - Expected failures (read only, out of range, reentrant) are reported
//!   through return values. Only allocation failures while loading and
//!   regular expression compile errors are errors.
//!
//! # Example
//!
//! ```no_run
//! use quill_lib::document::{
//!   Document,
//!   FindFlags,
//! };
//!
//! let mut doc = Document::new();
//! doc.insert_string(0, b"hello world");
//! let found = doc.find_text(0, doc.len(), b"world", FindFlags::MATCH_CASE).unwrap();
//! assert_eq!(found, Some((6, 5)));
//! doc.undo();
//! assert!(doc.is_empty());
//! ```

mod columns;
mod find;
mod lines;
mod navigation;
mod styling;
mod words;

pub use find::FindFlags;
use quill_core::{
  case_fold::{
    self,
    CaseFolder,
  },
  chars::{
    CharClass,
    CharClassify,
  },
  encoding::Encoding,
  line_ending::{
    EndOfLine,
    LineEndTypes,
  },
};
use quill_stdx::BufferError;
use thiserror::Error;

use crate::{
  cell_buffer::CellBuffer,
  config::{
    DocumentOptions,
    RegexEngine,
  },
  per_line::PerLineData,
  regex::RegexSearch,
  timing::ActionDuration,
  undo::{
    ActionKind,
    UndoHistory,
  },
  watcher::{
    DocModification,
    ModificationFlags,
    Status,
    WatcherHandle,
    Watchers,
  },
};

/// Failure of the bulk loading entry points.
#[derive(Debug, Error)]
pub enum LoadError {
  #[error("out of memory while loading: {0}")]
  OutOfMemory(#[from] BufferError),
}

impl LoadError {
  /// The status watchers are told about.
  pub fn status(&self) -> Status {
    match self {
      Self::OutOfMemory(_) => Status::BadAlloc,
    }
  }
}

/// Styles a range of a document.
///
/// The lexer is detached from the document while it runs, so it may freely
/// call the styling API on the document it is given.
pub trait Lexer {
  /// Styles `[start, start + len)`. `init_style` is the style of the byte
  /// before `start`.
  fn lex(&mut self, doc: &mut Document, start: usize, len: usize, init_style: u8);

  /// Sets fold levels for `[start, start + len)` after it has been styled.
  fn fold(&mut self, _doc: &mut Document, _start: usize, _len: usize, _init_style: u8) {}

  /// Line end kinds the lexer can handle.
  fn line_end_types_supported(&self) -> LineEndTypes {
    LineEndTypes::DEFAULT
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Replay {
  Undo,
  Redo,
  Tentative,
}

/// Tracks a run of undone removals that reinsert next to each other, so a
/// backspace run undoes to a caret at the end of the restored text.
#[derive(Debug, Default)]
struct CoalescedRemove {
  position:      usize,
  len:           usize,
  prev_position: Option<usize>,
  prev_len:      usize,
}

impl CoalescedRemove {
  /// Records `len` bytes reinserted at `position` and returns the caret.
  fn reinsert(&mut self, position: usize, len: usize) -> usize {
    let adjacent = self
      .prev_position
      .is_some_and(|prev| position == prev || position == prev + self.prev_len);
    let caret = if self.len > 0 && adjacent {
      self.len += len;
      self.position + self.len
    } else {
      self.position = position;
      self.len = len;
      position + len
    };
    self.prev_position = Some(position);
    self.prev_len = len;
    caret
  }
}

pub struct Document {
  cb:                      CellBuffer,
  per_line:                PerLineData,
  encoding:                Encoding,
  line_end_types_allowed:  LineEndTypes,
  eol_mode:                EndOfLine,
  tab_in_chars:            usize,
  indent_in_chars:         usize,
  actual_indent_in_chars:  usize,
  use_tabs:                bool,
  tab_indents:             bool,
  backspace_unindents:     bool,
  char_class:              CharClassify,
  case_folder:             Box<dyn CaseFolder>,
  end_styled:              usize,
  style_clock:             u32,
  entered_modification:    usize,
  entered_styling:         usize,
  entered_read_only_count: usize,
  /// Replacement text set through [`Document::change_insertion`].
  insertion:               Option<Vec<u8>>,
  watchers:                Watchers,
  lexer:                   Option<Box<dyn Lexer>>,
  performing_style:        bool,
  regex:                   Option<RegexSearch>,
  regex_engine:            RegexEngine,
  duration_style_one_byte: ActionDuration,
}

impl Default for Document {
  fn default() -> Self {
    Self::new()
  }
}

impl std::fmt::Debug for Document {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Document")
      .field("len", &self.len())
      .field("lines", &self.lines_total())
      .field("encoding", &self.encoding)
      .field("end_styled", &self.end_styled)
      .field("watchers", &self.watchers.len())
      .finish_non_exhaustive()
  }
}

impl Drop for Document {
  fn drop(&mut self) {
    for (watcher, token) in self.watchers.snapshot() {
      if let Ok(mut watcher) = watcher.try_borrow_mut() {
        watcher.notify_deleted(self, token);
      }
    }
  }
}

impl Document {
  pub fn new() -> Self {
    Self::with_options(&DocumentOptions::default())
  }

  pub fn with_options(options: &DocumentOptions) -> Self {
    let encoding = Encoding::from_code_page(options.code_page);
    let tab_in_chars = options.tab_width.max(1);
    let mut doc = Self {
      cb: CellBuffer::new(options.styling),
      per_line: PerLineData::default(),
      encoding,
      line_end_types_allowed: options.line_end_types_allowed,
      eol_mode: options.eol_mode,
      tab_in_chars,
      indent_in_chars: options.indent,
      actual_indent_in_chars: if options.indent > 0 {
        options.indent
      } else {
        tab_in_chars
      },
      use_tabs: options.use_tabs,
      tab_indents: options.tab_indents,
      backspace_unindents: options.backspace_unindents,
      char_class: CharClassify::new(),
      case_folder: case_fold::folder_for(encoding),
      end_styled: 0,
      style_clock: 0,
      entered_modification: 0,
      entered_styling: 0,
      entered_read_only_count: 0,
      insertion: None,
      watchers: Watchers::default(),
      lexer: None,
      performing_style: false,
      regex: None,
      regex_engine: options.regex_engine,
      duration_style_one_byte: ActionDuration::default(),
    };
    doc.cb.set_undo_collection(options.undo_collection);
    doc.cb.set_read_only(options.read_only);
    doc.apply_line_end_types();
    doc
  }

  // Content access.

  #[inline]
  pub fn len(&self) -> usize {
    self.cb.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.cb.is_empty()
  }

  /// Byte at `position`, 0 outside the document.
  #[inline]
  pub fn char_at(&self, position: usize) -> u8 {
    self.cb.char_at(position)
  }

  /// Copies `[position, position + len)`, clipped to the document.
  pub fn char_range(&self, position: usize, len: usize) -> Vec<u8> {
    self.cb.char_range(position, len)
  }

  pub fn text(&self) -> Vec<u8> {
    self.cb.char_range(0, self.len())
  }

  #[inline]
  pub fn lines_total(&self) -> usize {
    self.cb.lines()
  }

  #[inline]
  pub fn line_start(&self, line: usize) -> usize {
    self.cb.line_start(line)
  }

  #[inline]
  pub fn line_from_position(&self, position: usize) -> usize {
    self.cb.line_from_position(position)
  }

  // Modes.

  #[inline]
  pub fn encoding(&self) -> Encoding {
    self.encoding
  }

  #[inline]
  pub fn code_page(&self) -> u32 {
    self.encoding.code_page()
  }

  /// Switches the encoding. Returns false when it is unchanged.
  ///
  /// The whole document needs restyling afterwards and the active line end
  /// kinds are recomputed, since only UTF-8 supports Unicode line ends.
  pub fn set_code_page(&mut self, code_page: u32) -> bool {
    let encoding = Encoding::from_code_page(code_page);
    if encoding == self.encoding {
      return false;
    }
    tracing::debug!(from = self.encoding.code_page(), to = code_page, "code page changed");
    self.encoding = encoding;
    self.case_folder = case_fold::folder_for(encoding);
    self.apply_line_end_types();
    self.modified_at(0);
    true
  }

  /// Replaces the folder used by case insensitive searches.
  pub fn set_case_folder(&mut self, case_folder: Box<dyn CaseFolder>) {
    self.case_folder = case_folder;
  }

  /// Line end kinds the current encoding and lexer can handle.
  pub fn line_end_types_supported(&self) -> LineEndTypes {
    if !self.encoding.is_utf8() {
      return LineEndTypes::DEFAULT;
    }
    self
      .lexer
      .as_ref()
      .map_or(LineEndTypes::UNICODE, |lexer| lexer.line_end_types_supported())
  }

  #[inline]
  pub fn line_end_types_allowed(&self) -> LineEndTypes {
    self.line_end_types_allowed
  }

  /// Line end kinds the line index currently honours.
  #[inline]
  pub fn line_end_types_active(&self) -> LineEndTypes {
    self.cb.line_end_types()
  }

  /// Returns true when the active line end kinds changed.
  pub fn set_line_end_types_allowed(&mut self, allowed: LineEndTypes) -> bool {
    if allowed == self.line_end_types_allowed {
      return false;
    }
    self.line_end_types_allowed = allowed;
    let active = allowed & self.line_end_types_supported();
    if active == self.cb.line_end_types() {
      return false;
    }
    tracing::debug!(?active, "line end types changed");
    self.modified_at(0);
    self.apply_line_end_types();
    true
  }

  fn apply_line_end_types(&mut self) {
    let active = self.line_end_types_allowed & self.line_end_types_supported();
    if let Err(err) = self.cb.set_line_end_types(active, &mut self.per_line) {
      self.report_alloc_failure(&err);
    }
  }

  #[inline]
  pub fn eol_mode(&self) -> EndOfLine {
    self.eol_mode
  }

  pub fn set_eol_mode(&mut self, eol_mode: EndOfLine) {
    self.eol_mode = eol_mode;
  }

  #[inline]
  pub fn tab_width(&self) -> usize {
    self.tab_in_chars
  }

  /// A zero width is ignored.
  pub fn set_tab_width(&mut self, tab_width: usize) {
    if tab_width > 0 {
      self.tab_in_chars = tab_width;
    }
    if self.indent_in_chars == 0 {
      self.actual_indent_in_chars = self.tab_in_chars;
    }
  }

  /// Columns added by one indentation step.
  #[inline]
  pub fn indent_size(&self) -> usize {
    self.actual_indent_in_chars
  }

  /// 0 indents by the tab width.
  pub fn set_indent(&mut self, indent: usize) {
    self.indent_in_chars = indent;
    self.actual_indent_in_chars = if indent > 0 { indent } else { self.tab_in_chars };
  }

  #[inline]
  pub fn use_tabs(&self) -> bool {
    self.use_tabs
  }

  pub fn set_use_tabs(&mut self, use_tabs: bool) {
    self.use_tabs = use_tabs;
  }

  #[inline]
  pub fn tab_indents(&self) -> bool {
    self.tab_indents
  }

  pub fn set_tab_indents(&mut self, tab_indents: bool) {
    self.tab_indents = tab_indents;
  }

  #[inline]
  pub fn backspace_unindents(&self) -> bool {
    self.backspace_unindents
  }

  pub fn set_backspace_unindents(&mut self, backspace_unindents: bool) {
    self.backspace_unindents = backspace_unindents;
  }

  #[inline]
  pub fn regex_engine(&self) -> RegexEngine {
    self.regex_engine
  }

  pub fn set_regex_engine(&mut self, engine: RegexEngine) {
    self.regex_engine = engine;
  }

  pub fn set_default_char_classes(&mut self, include_word_class: bool) {
    self.char_class.set_default_char_classes(include_word_class);
  }

  pub fn set_char_classes(&mut self, bytes: &[u8], class: CharClass) {
    self.char_class.set_char_classes(bytes, class);
  }

  pub fn chars_of_class(&self, class: CharClass) -> Vec<u8> {
    self.char_class.chars_of_class(class)
  }

  #[inline]
  pub fn char_classify(&self) -> &CharClassify {
    &self.char_class
  }

  // Read only state.

  #[inline]
  pub fn is_read_only(&self) -> bool {
    self.cb.is_read_only()
  }

  pub fn set_read_only(&mut self, read_only: bool) {
    self.cb.set_read_only(read_only);
  }

  /// Tells watchers that a read only document is about to be edited. They
  /// may clear the read only state in response.
  fn check_read_only(&mut self) {
    if self.cb.is_read_only() && self.entered_read_only_count == 0 {
      self.entered_read_only_count += 1;
      self.notify_modify_attempt();
      self.entered_read_only_count -= 1;
    }
  }

  // Watchers.

  /// Registers a watcher. Returns false when the pair is already present.
  pub fn add_watcher(&mut self, watcher: &WatcherHandle, token: usize) -> bool {
    self.watchers.add(watcher, token)
  }

  pub fn remove_watcher(&mut self, watcher: &WatcherHandle, token: usize) -> bool {
    self.watchers.remove(watcher, token)
  }

  fn notify_modify_attempt(&mut self) {
    for (watcher, token) in self.watchers.snapshot() {
      if let Ok(mut watcher) = watcher.try_borrow_mut() {
        watcher.notify_modify_attempt(self, token);
      }
    }
  }

  fn notify_save_point(&mut self, at_save_point: bool) {
    for (watcher, token) in self.watchers.snapshot() {
      if let Ok(mut watcher) = watcher.try_borrow_mut() {
        watcher.notify_save_point(self, token, at_save_point);
      }
    }
  }

  fn notify_modified(&mut self, modification: DocModification) {
    for (watcher, token) in self.watchers.snapshot() {
      if let Ok(mut watcher) = watcher.try_borrow_mut() {
        watcher.notify_modified(self, &modification, token);
      }
    }
  }

  fn notify_style_needed(&mut self, end_style_needed: usize) {
    for (watcher, token) in self.watchers.snapshot() {
      if end_style_needed <= self.end_styled {
        break;
      }
      if let Ok(mut watcher) = watcher.try_borrow_mut() {
        watcher.notify_style_needed(self, token, end_style_needed);
      }
    }
  }

  fn notify_lexer_changed(&mut self) {
    for (watcher, token) in self.watchers.snapshot() {
      if let Ok(mut watcher) = watcher.try_borrow_mut() {
        watcher.notify_lexer_changed(self, token);
      }
    }
  }

  fn notify_error_occurred(&mut self, status: Status) {
    for (watcher, token) in self.watchers.snapshot() {
      if let Ok(mut watcher) = watcher.try_borrow_mut() {
        watcher.notify_error_occurred(self, token, status);
      }
    }
  }

  fn report_alloc_failure(&mut self, err: &BufferError) {
    tracing::warn!(%err, "document allocation failed");
    self.notify_error_occurred(Status::BadAlloc);
  }

  /// Lowers the styled watermark so text at `position` is styled again.
  fn modified_at(&mut self, position: usize) {
    if self.end_styled > position {
      self.end_styled = position;
    }
  }

  // Mutation.

  /// Inserts `s` at `position` and returns the number of bytes inserted.
  ///
  /// Watchers see `INSERT_CHECK` first and may replace the text through
  /// [`Document::change_insertion`], then `BEFORE_INSERT`, then
  /// `INSERT_TEXT` once the bytes are in. Nothing is inserted into a read
  /// only document, from inside a modification callback, or past the end.
  pub fn insert_string(&mut self, position: usize, s: &[u8]) -> usize {
    match self.try_insert_string(position, s) {
      Ok(inserted) => inserted,
      Err(err) => {
        self.report_alloc_failure(&err);
        0
      },
    }
  }

  fn try_insert_string(&mut self, position: usize, s: &[u8]) -> Result<usize, BufferError> {
    if s.is_empty() || position > self.len() {
      return Ok(0);
    }
    self.check_read_only();
    if self.cb.is_read_only() || self.entered_modification != 0 {
      return Ok(0);
    }
    self.entered_modification += 1;
    let inserted = self.insert_entered(position, s);
    self.entered_modification -= 1;
    inserted
  }

  fn insert_entered(&mut self, position: usize, s: &[u8]) -> Result<usize, BufferError> {
    self.insertion = None;
    self.notify_modified(
      DocModification::new(ModificationFlags::INSERT_CHECK, position, s.len()).with_text(s),
    );
    let replacement = self.insertion.take();
    let text = replacement.as_deref().unwrap_or(s);
    if text.is_empty() {
      return Ok(0);
    }

    self.notify_modified(
      DocModification::new(
        ModificationFlags::BEFORE_INSERT | ModificationFlags::USER,
        position,
        text.len(),
      )
      .with_text(text),
    );
    let prev_lines = self.lines_total();
    let start_save_point = self.cb.is_save_point();
    let start_sequence = self.cb.insert_string(position, text, &mut self.per_line)?;
    if start_save_point && self.cb.is_collecting_undo() {
      self.notify_save_point(false);
    }
    self.modified_at(position);

    let mut flags = ModificationFlags::INSERT_TEXT | ModificationFlags::USER;
    if start_sequence {
      flags |= ModificationFlags::START_ACTION;
    }
    let lines_added = self.lines_total() as isize - prev_lines as isize;
    self.notify_modified(
      DocModification::new(flags, position, text.len())
        .with_lines_added(lines_added)
        .with_text(text),
    );
    Ok(text.len())
  }

  /// Replaces the text of the insertion being checked. Only has an effect
  /// while watchers handle an `INSERT_CHECK` notification.
  pub fn change_insertion(&mut self, s: &[u8]) {
    self.insertion = Some(s.to_vec());
  }

  /// Deletes `len` bytes at `position`. Returns false when nothing was
  /// deleted.
  pub fn delete_chars(&mut self, position: usize, len: usize) -> bool {
    if len == 0 || position.checked_add(len).is_none_or(|end| end > self.len()) {
      return false;
    }
    self.check_read_only();
    if self.entered_modification != 0 || self.cb.is_read_only() {
      return false;
    }
    self.entered_modification += 1;

    self.notify_modified(DocModification::new(
      ModificationFlags::BEFORE_DELETE | ModificationFlags::USER,
      position,
      len,
    ));
    let removed = self.cb.char_range(position, len);
    let prev_lines = self.lines_total();
    let start_save_point = self.cb.is_save_point();
    let start_sequence = self.cb.delete_chars(position, len, &mut self.per_line);
    if start_save_point && self.cb.is_collecting_undo() {
      self.notify_save_point(false);
    }
    if position < self.len() || position == 0 {
      self.modified_at(position);
    } else {
      self.modified_at(position - 1);
    }

    let mut flags = ModificationFlags::DELETE_TEXT | ModificationFlags::USER;
    if start_sequence {
      flags |= ModificationFlags::START_ACTION;
    }
    let lines_added = self.lines_total() as isize - prev_lines as isize;
    self.notify_modified(
      DocModification::new(flags, position, len)
        .with_lines_added(lines_added)
        .with_text(&removed),
    );

    self.entered_modification -= 1;
    true
  }

  /// Deletes the character at `position`, treating CRLF as one.
  pub fn del_char(&mut self, position: usize) -> bool {
    let len = self.len_char(position);
    self.delete_chars(position, len)
  }

  /// Deletes the character before `position`, treating CRLF as one.
  pub fn del_char_back(&mut self, position: usize) -> bool {
    if position == 0 {
      false
    } else if position >= 2 && self.is_crlf(position - 2) {
      self.delete_chars(position - 2, 2)
    } else if self.encoding.is_multi_byte() {
      let start = self.next_position(position, -1);
      self.delete_chars(start, position - start)
    } else {
      self.delete_chars(position - 1, 1)
    }
  }

  /// Appends raw bytes from a loader.
  ///
  /// Allocation failure is reported to watchers and returned instead of
  /// being swallowed like it is for interactive insertion.
  pub fn add_data(&mut self, data: &[u8]) -> Result<(), LoadError> {
    let position = self.len();
    match self.try_insert_string(position, data) {
      Ok(_) => Ok(()),
      Err(err) => {
        tracing::warn!(%err, len = data.len(), "loading data failed");
        let err = LoadError::from(err);
        self.notify_error_occurred(err.status());
        Err(err)
      },
    }
  }

  /// Reserves room for `size` bytes ahead of a load.
  pub fn allocate(&mut self, size: usize) -> Result<(), LoadError> {
    self.cb.allocate(size).map_err(|err| {
      tracing::warn!(%err, size, "allocation for load failed");
      LoadError::from(err)
    })
  }

  /// Runs `f` as one undo turn.
  pub fn undo_group<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
    self.begin_undo_action();
    let result = f(self);
    self.end_undo_action();
    result
  }

  // Undo history.

  #[inline]
  pub fn undo_history(&self) -> &UndoHistory {
    self.cb.undo_history()
  }

  pub fn set_undo_collection(&mut self, collect_undo: bool) -> bool {
    self.cb.set_undo_collection(collect_undo)
  }

  #[inline]
  pub fn is_collecting_undo(&self) -> bool {
    self.cb.is_collecting_undo()
  }

  pub fn begin_undo_action(&mut self) {
    self.cb.begin_undo_action(false);
  }

  pub fn end_undo_action(&mut self) {
    self.cb.end_undo_action();
  }

  /// Records a container action carrying `token` in the undo stream.
  pub fn add_undo_action(&mut self, token: usize, may_coalesce: bool) {
    self.cb.add_undo_action(token, may_coalesce);
  }

  pub fn delete_undo_history(&mut self) {
    tracing::debug!(actions = self.cb.undo_history().actions(), "undo history cleared");
    self.cb.delete_undo_history();
  }

  #[inline]
  pub fn can_undo(&self) -> bool {
    self.cb.can_undo()
  }

  #[inline]
  pub fn can_redo(&self) -> bool {
    self.cb.can_redo()
  }

  #[inline]
  pub fn is_save_point(&self) -> bool {
    self.cb.is_save_point()
  }

  pub fn set_save_point(&mut self) {
    self.cb.set_save_point();
    self.notify_save_point(true);
  }

  pub fn tentative_start(&mut self) {
    self.cb.tentative_start();
  }

  pub fn tentative_commit(&mut self) {
    self.cb.tentative_commit();
  }

  #[inline]
  pub fn tentative_active(&self) -> bool {
    self.cb.tentative_active()
  }

  /// Undoes one turn. Returns the caret position after the turn, or `None`
  /// when nothing was undone or the turn only held container actions.
  pub fn undo(&mut self) -> Option<usize> {
    self.replay(Replay::Undo)
  }

  /// Redoes one turn. Returns the caret position after the turn.
  pub fn redo(&mut self) -> Option<usize> {
    self.replay(Replay::Redo)
  }

  /// Rolls back every action since [`Document::tentative_start`] without
  /// leaving them in the redo history.
  pub fn tentative_undo(&mut self) {
    if self.cb.tentative_active() {
      self.replay(Replay::Tentative);
    }
  }

  fn replay(&mut self, replay: Replay) -> Option<usize> {
    self.check_read_only();
    if self.entered_modification != 0 {
      return None;
    }
    if replay != Replay::Tentative && !self.cb.is_collecting_undo() {
      return None;
    }
    self.entered_modification += 1;
    let mut new_pos = None;
    if !self.cb.is_read_only() {
      new_pos = self.replay_steps(replay);
    }
    self.entered_modification -= 1;
    new_pos
  }

  fn replay_steps(&mut self, replay: Replay) -> Option<usize> {
    let start_save_point = self.cb.is_save_point();
    let steps = match replay {
      Replay::Undo => self.cb.start_undo(),
      Replay::Redo => self.cb.start_redo(),
      Replay::Tentative => self.cb.tentative_steps().unwrap_or(0),
    };
    let performed = match replay {
      Replay::Redo => ModificationFlags::REDO,
      Replay::Undo | Replay::Tentative => ModificationFlags::UNDO,
    };
    let mut new_pos = None;
    let mut multi_line = false;
    let mut coalesced = CoalescedRemove::default();

    for step in 0..steps {
      let prev_lines = self.lines_total();
      let action = match replay {
        Replay::Redo => self.cb.redo_step().clone(),
        Replay::Undo | Replay::Tentative => self.cb.undo_step().clone(),
      };
      // Undoing a removal and redoing an insertion both put text back.
      let inserts = match action.kind {
        ActionKind::Insert => replay == Replay::Redo,
        ActionKind::Remove => replay != Replay::Redo,
        ActionKind::Container => false,
      };

      if action.kind == ActionKind::Container {
        let mut container = DocModification::new(ModificationFlags::CONTAINER | performed, 0, 0);
        container.token = action.position;
        self.notify_modified(container);
        if !action.may_coalesce {
          coalesced = CoalescedRemove::default();
        }
      } else {
        let before = if inserts {
          ModificationFlags::BEFORE_INSERT
        } else {
          ModificationFlags::BEFORE_DELETE
        };
        self.notify_modified(
          DocModification::new(before | performed, action.position, action.len())
            .with_text(&action.data),
        );
      }

      let performed_step = match replay {
        Replay::Redo => self.cb.perform_redo_step(&mut self.per_line),
        Replay::Undo | Replay::Tentative => self.cb.perform_undo_step(&mut self.per_line),
      };
      if let Err(err) = performed_step {
        self.report_alloc_failure(&err);
        break;
      }

      let mut flags = performed;
      if action.kind != ActionKind::Container {
        self.modified_at(action.position);
        if inserts {
          flags |= ModificationFlags::INSERT_TEXT;
        } else {
          flags |= ModificationFlags::DELETE_TEXT;
        }
        new_pos = match replay {
          Replay::Tentative => None,
          Replay::Undo if inserts => Some(coalesced.reinsert(action.position, action.len())),
          Replay::Undo => {
            coalesced = CoalescedRemove::default();
            Some(action.position)
          },
          Replay::Redo if inserts => Some(action.position + action.len()),
          Replay::Redo => Some(action.position),
        };
      }
      if steps > 1 {
        flags |= ModificationFlags::MULTI_STEP_UNDO_REDO;
      }
      let lines_added = self.lines_total() as isize - prev_lines as isize;
      if lines_added != 0 {
        multi_line = true;
      }
      if step == steps - 1 {
        flags |= ModificationFlags::LAST_STEP_IN_UNDO_REDO;
        if multi_line {
          flags |= ModificationFlags::MULTILINE_UNDO_REDO;
        }
      }
      self.notify_modified(
        DocModification::new(flags, action.position, action.len())
          .with_lines_added(lines_added)
          .with_text(&action.data),
      );
    }

    let end_save_point = self.cb.is_save_point();
    if start_save_point != end_save_point {
      self.notify_save_point(end_save_point);
    }
    if replay == Replay::Tentative {
      self.cb.tentative_commit();
    }
    tracing::debug!(?replay, steps, ?new_pos, "replayed undo turn");
    new_pos
  }
}

#[cfg(test)]
mod tests;
