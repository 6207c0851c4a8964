//! Columns, indentation and line end conversion.

use quill_core::{
  chars::is_space_or_tab,
  line_ending::EndOfLine,
};

use super::Document;

#[inline]
fn next_tab(column: usize, tab_size: usize) -> usize {
  (column / tab_size + 1) * tab_size
}

/// Whitespace that indents to `indent` columns: tabs first unless
/// `insert_spaces`, then spaces.
pub fn create_indentation(mut indent: usize, tab_size: usize, insert_spaces: bool) -> Vec<u8> {
  let mut indentation = Vec::with_capacity(indent);
  if !insert_spaces && tab_size > 0 {
    while indent >= tab_size {
      indentation.push(b'\t');
      indent -= tab_size;
    }
  }
  indentation.resize(indentation.len() + indent, b' ');
  indentation
}

impl Document {
  /// Indentation of `line` in columns.
  pub fn line_indentation(&self, line: usize) -> usize {
    let mut indent = 0;
    if line >= self.lines_total() {
      return indent;
    }
    for position in self.line_start(line)..self.len() {
      match self.cb.char_at(position) {
        b' ' => indent += 1,
        b'\t' => indent = next_tab(indent, self.tab_in_chars),
        _ => return indent,
      }
    }
    indent
  }

  /// Replaces the leading whitespace of `line` so it indents to `indent`
  /// columns. Returns the position after the new indentation.
  pub fn set_line_indentation(&mut self, line: usize, indent: usize) -> usize {
    if indent != self.line_indentation(line) {
      let indentation = create_indentation(indent, self.tab_in_chars, !self.use_tabs);
      let line_start = self.line_start(line);
      let indent_position = self.line_indent_position(line);
      self.undo_group(|doc| {
        doc.delete_chars(line_start, indent_position - line_start);
        doc.insert_string(line_start, &indentation);
      });
    }
    self.line_indent_position(line)
  }

  /// First position on `line` after its leading spaces and tabs.
  pub fn line_indent_position(&self, line: usize) -> usize {
    let mut position = self.line_start(line);
    while position < self.len() && is_space_or_tab(self.cb.char_at(position)) {
      position += 1;
    }
    position
  }

  /// Display column of `position`, expanding tabs.
  pub fn column(&self, position: usize) -> usize {
    let mut column = 0;
    let line = self.line_from_position(position);
    if line >= self.lines_total() {
      return column;
    }
    let mut i = self.line_start(line);
    while i < position {
      match self.cb.char_at(i) {
        b'\t' => {
          column = next_tab(column, self.tab_in_chars);
          i += 1;
        },
        b'\r' | b'\n' => return column,
        _ if i >= self.len() => return column,
        _ => {
          column += 1;
          i = self.next_position(i, 1);
        },
      }
    }
    column
  }

  /// Position on `line` at display column `column`, or the nearest
  /// position before it when a tab spans the column.
  pub fn find_column(&self, line: usize, column: usize) -> usize {
    let mut position = self.line_start(line);
    if line >= self.lines_total() {
      return position;
    }
    let mut column_current = 0;
    while column_current < column && position < self.len() {
      match self.cb.char_at(position) {
        b'\t' => {
          column_current = next_tab(column_current, self.tab_in_chars);
          if column_current > column {
            return position;
          }
          position += 1;
        },
        b'\r' | b'\n' => return position,
        _ => {
          column_current += 1;
          position = self.next_position(position, 1);
        },
      }
    }
    position
  }

  /// Indents (or with `forwards` unset, dedents) lines `line_top` through
  /// `line_bottom` by one indent step. Empty lines are not indented.
  pub fn indent(&mut self, forwards: bool, line_bottom: usize, line_top: usize) {
    for line in (line_top..=line_bottom).rev() {
      let indent_of_line = self.line_indentation(line);
      if forwards {
        if self.line_start(line) < self.line_end(line) {
          self.set_line_indentation(line, indent_of_line + self.indent_size());
        }
      } else {
        self.set_line_indentation(line, indent_of_line.saturating_sub(self.indent_size()));
      }
    }
  }

  /// Rewrites every line end in the document to `eol`, as one undo step.
  pub fn convert_line_ends(&mut self, eol: EndOfLine) {
    tracing::debug!(?eol, "converting line ends");
    self.undo_group(|doc| {
      let mut position = 0;
      while position < doc.len() {
        match doc.cb.char_at(position) {
          b'\r' if doc.cb.char_at(position + 1) == b'\n' => match eol {
            EndOfLine::Cr => {
              doc.delete_chars(position + 1, 1);
            },
            EndOfLine::Lf => {
              doc.delete_chars(position, 1);
            },
            EndOfLine::CrLf => position += 1,
          },
          b'\r' => match eol {
            EndOfLine::CrLf => {
              position += doc.insert_string(position + 1, b"\n");
            },
            EndOfLine::Lf => {
              let inserted = doc.insert_string(position, b"\n");
              doc.delete_chars(position + inserted, 1);
            },
            EndOfLine::Cr => {},
          },
          b'\n' => match eol {
            EndOfLine::CrLf => {
              position += doc.insert_string(position, b"\r");
            },
            EndOfLine::Cr => {
              let inserted = doc.insert_string(position, b"\r");
              doc.delete_chars(position + inserted, 1);
            },
            EndOfLine::Lf => {},
          },
          _ => {},
        }
        position += 1;
      }
    });
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::DocumentOptions;

  fn doc(text: &str, use_tabs: bool) -> Document {
    let mut doc = Document::with_options(&DocumentOptions {
      tab_width: 4,
      use_tabs,
      ..Default::default()
    });
    doc.insert_string(0, text.as_bytes());
    doc
  }

  #[test]
  fn indentation_strings() {
    assert_eq!(create_indentation(10, 4, false), b"\t\t  ");
    assert_eq!(create_indentation(10, 4, true), b"          ");
    assert_eq!(create_indentation(0, 4, false), b"");
  }

  #[test]
  fn columns_expand_tabs() {
    let doc = doc("a\tb\r\n  \tc", true);
    assert_eq!(doc.column(1), 1);
    assert_eq!(doc.column(2), 4);
    assert_eq!(doc.column(3), 5);
    assert_eq!(doc.column(4), 5);
    assert_eq!(doc.find_column(0, 4), 2);
    assert_eq!(doc.find_column(0, 3), 1);
    assert_eq!(doc.find_column(0, 20), 3);
    assert_eq!(doc.find_column(1, 4), 8);
    assert_eq!(doc.line_indentation(1), 4);
    assert_eq!(doc.line_indent_position(1), 8);
  }

  #[test]
  fn utf8_columns_count_characters() {
    let mut doc = Document::with_options(&DocumentOptions {
      code_page: 65001,
      ..Default::default()
    });
    doc.insert_string(0, "ΓΓx".as_bytes());
    assert_eq!(doc.column(4), 2);
    assert_eq!(doc.find_column(0, 1), 2);
  }

  #[test]
  fn set_indentation_is_one_undo_step() {
    let mut doc = doc("  x\n", true);
    assert_eq!(doc.set_line_indentation(0, 6), 3);
    assert_eq!(doc.text(), b"\t  x\n");
    doc.undo();
    assert_eq!(doc.text(), b"  x\n");
    assert_eq!(doc.set_line_indentation(0, 2), 2);
    assert!(doc.can_redo());
  }

  #[test]
  fn indent_skips_empty_lines() {
    let mut doc = doc("a\n\n  b\n", false);
    doc.indent(true, 2, 0);
    assert_eq!(doc.text(), b"    a\n\n      b\n");
    doc.indent(false, 2, 0);
    doc.indent(false, 2, 0);
    assert_eq!(doc.text(), b"a\n\nb\n");
  }

  #[test]
  fn line_ends_convert_both_ways() {
    let mut doc = doc("a\r\nb\rc\nd", true);
    doc.convert_line_ends(EndOfLine::Lf);
    assert_eq!(doc.text(), b"a\nb\nc\nd");
    doc.convert_line_ends(EndOfLine::CrLf);
    assert_eq!(doc.text(), b"a\r\nb\r\nc\r\nd");
    doc.convert_line_ends(EndOfLine::Cr);
    assert_eq!(doc.text(), b"a\rb\rc\rd");
    doc.undo();
    assert_eq!(doc.text(), b"a\r\nb\r\nc\r\nd");
  }

  #[test]
  fn lone_cr_before_crlf() {
    let mut doc = doc("\r\r\n\n", true);
    doc.convert_line_ends(EndOfLine::CrLf);
    assert_eq!(doc.text(), b"\r\n\r\n\r\n");
  }
}
