//! Backtracking matcher for the builtin syntax.
//!
//! Supported: `.`, `[...]` classes with ranges and `^` negation, `*`, `+`,
//! `?` and the lazy `*?`, `^` and `$` at the ends of the pattern, `\<` and
//! `\>`, groups with back references `\1` to `\9`, and the `\d \D \s \S \w
//! \W \xHH` escapes. Groups are `\(` `\)`, or `(` `)` in posix mode.

use quill_core::chars::{
  CharClassify,
  is_ascii_lower,
  is_ascii_upper,
};

use super::{
  Captures,
  CharacterIndexer,
  DocumentIndexer,
  GroupSyntax,
  MAX_TAG,
  RegexError,
  Result,
  SearchRange,
};
use crate::document::{
  Document,
  FindFlags,
};

const BITBLK: usize = 32;
const MAX_NFA: usize = 4096;
const NFA_LIMIT: usize = MAX_NFA - BITBLK - 10;
/// Cap on the rescans looking for the last match of a line.
const MAX_REPETITIONS: usize = 1000;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ByteSet([u8; BITBLK]);

impl ByteSet {
  #[inline]
  fn insert(&mut self, b: u8) {
    self.0[usize::from(b >> 3)] |= 1 << (b & 7);
  }

  fn insert_with_case(&mut self, b: u8, case_sensitive: bool) {
    self.insert(b);
    if !case_sensitive {
      if is_ascii_upper(b) {
        self.insert(b + (b'a' - b'A'));
      } else if is_ascii_lower(b) {
        self.insert(b - (b'a' - b'A'));
      }
    }
  }

  fn insert_where(&mut self, keep: impl Fn(u8) -> bool) {
    for b in u8::MIN..=u8::MAX {
      if keep(b) {
        self.insert(b);
      }
    }
  }

  #[inline]
  fn contains(&self, b: u8) -> bool {
    self.0[usize::from(b >> 3)] & (1 << (b & 7)) != 0
  }

  fn invert(&mut self) {
    for block in &mut self.0 {
      *block = !*block;
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Repeat {
  /// `*` and `+`.
  Greedy,
  /// `*?`.
  Lazy,
  /// `?`.
  Optional,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
  Char(u8),
  Any,
  Class(Box<ByteSet>),
  LineStart,
  LineEnd,
  GroupStart(usize),
  GroupEnd(usize),
  WordStart,
  WordEnd,
  Backref(usize),
  Repeat(Repeat, Box<Node>),
}

impl Node {
  /// Room taken in the compiled program.
  fn cost(&self) -> usize {
    match self {
      Self::Any | Self::LineStart | Self::LineEnd | Self::WordStart | Self::WordEnd => 1,
      Self::Char(_) | Self::GroupStart(_) | Self::GroupEnd(_) | Self::Backref(_) => 2,
      Self::Class(_) => 1 + BITBLK,
      Self::Repeat(_, inner) => 2 + inner.cost(),
    }
  }
}

enum Escape {
  Char(u8),
  /// The escape added a class of bytes to the set.
  Class,
}

fn hex_value(b: u8) -> Option<u8> {
  char::from(b)
    .to_digit(16)
    .and_then(|digit| u8::try_from(digit).ok())
}

/// Reads the escape starting at `pattern[at]`, just after a backslash.
/// Returns it with the number of extra bytes it used.
fn backslash_expression(
  pattern: &[u8],
  at: usize,
  set: &mut ByteSet,
  classify: &CharClassify,
) -> (Escape, usize) {
  let Some(&bsc) = pattern.get(at) else {
    return (Escape::Char(b'\\'), 0);
  };
  let escape = match bsc {
    b'a' => Escape::Char(0x07),
    b'b' => Escape::Char(0x08),
    b'f' => Escape::Char(0x0c),
    b'n' => Escape::Char(b'\n'),
    b'r' => Escape::Char(b'\r'),
    b't' => Escape::Char(b'\t'),
    b'v' => Escape::Char(0x0b),
    b'x' => {
      let high = pattern.get(at + 1).copied().and_then(hex_value);
      let low = pattern.get(at + 2).copied().and_then(hex_value);
      return match (high, low) {
        (Some(high), Some(low)) => (Escape::Char(high << 4 | low), 2),
        _ => (Escape::Char(b'x'), 0),
      };
    },
    b'd' => {
      set.insert_where(|b| b.is_ascii_digit());
      Escape::Class
    },
    b'D' => {
      set.insert_where(|b| !b.is_ascii_digit());
      Escape::Class
    },
    b's' => {
      set.insert_where(|b| matches!(b, b' ' | 0x09..=0x0d));
      Escape::Class
    },
    b'S' => {
      set.insert_where(|b| !matches!(b, b' ' | 0x09..=0x0d));
      Escape::Class
    },
    b'w' => {
      set.insert_where(|b| classify.is_word(b));
      Escape::Class
    },
    b'W' => {
      set.insert_where(|b| !classify.is_word(b));
      Escape::Class
    },
    other => Escape::Char(other),
  };
  (escape, 0)
}

struct Compiler<'a> {
  pattern:        &'a [u8],
  case_sensitive: bool,
  posix:          bool,
  classify:       &'a CharClassify,
  nodes:          Vec<Node>,
  size:           usize,
  tag_count:      usize,
  tag_stack:      Vec<usize>,
}

impl<'a> Compiler<'a> {
  fn new(pattern: &'a [u8], case_sensitive: bool, posix: bool, classify: &'a CharClassify) -> Self {
    Self {
      pattern,
      case_sensitive,
      posix,
      classify,
      nodes: Vec::new(),
      size: 0,
      tag_count: 1,
      tag_stack: Vec::new(),
    }
  }

  fn syntax(&self) -> GroupSyntax {
    if self.posix {
      GroupSyntax::Posix
    } else {
      GroupSyntax::Escaped
    }
  }

  fn push(&mut self, node: Node) {
    self.size += node.cost();
    self.nodes.push(node);
  }

  fn compile(mut self) -> Result<Vec<Node>> {
    let len = self.pattern.len();
    let mut i = 0;
    while i < len {
      if self.size > NFA_LIMIT {
        return Err(RegexError::TooLong);
      }
      let byte = self.pattern[i];
      match byte {
        b'.' => self.push(Node::Any),
        b'^' if i == 0 => self.push(Node::LineStart),
        b'$' if i + 1 == len => self.push(Node::LineEnd),
        b'[' => i = self.class(i)?,
        b'*' | b'+' | b'?' => {
          if i == 0 {
            return Err(RegexError::EmptyClosure);
          }
          let lazy = self.pattern.get(i + 1) == Some(&b'?');
          self.closure(byte, lazy)?;
        },
        b'\\' => i = self.backslash(i + 1)?,
        _ => self.literal(byte)?,
      }
      i += 1;
    }
    if !self.tag_stack.is_empty() {
      return Err(RegexError::UnmatchedOpen(self.syntax()));
    }
    Ok(self.nodes)
  }

  fn closure(&mut self, op: u8, lazy: bool) -> Result<()> {
    let Some(inner) = self.nodes.pop() else {
      return Err(RegexError::EmptyClosure);
    };
    match inner {
      // A closure of a closure is the same closure.
      Node::Repeat(..) => {
        self.nodes.push(inner);
        return Ok(());
      },
      Node::LineStart
      | Node::LineEnd
      | Node::GroupStart(_)
      | Node::GroupEnd(_)
      | Node::WordStart
      | Node::WordEnd
      | Node::Backref(_) => return Err(RegexError::IllegalClosure),
      Node::Char(_) | Node::Any | Node::Class(_) => {},
    }
    self.size -= inner.cost();
    if op == b'+' {
      self.push(inner.clone());
    }
    let kind = match op {
      b'?' => Repeat::Optional,
      _ if lazy => Repeat::Lazy,
      _ => Repeat::Greedy,
    };
    self.push(Node::Repeat(kind, Box::new(inner)));
    Ok(())
  }

  /// Compiles the class opened at `open`. Returns the index of its `]`.
  fn class(&mut self, open: usize) -> Result<usize> {
    let pattern = self.pattern;
    let len = pattern.len();
    let at = |i: usize| pattern.get(i).copied().unwrap_or(0);
    let mut set = ByteSet::default();
    let mut p = open + 1;
    let negate = at(p) == b'^';
    if negate {
      p += 1;
    }
    // None after a class escape such as `\d`, which cannot start a range.
    let mut prev_char = Some(0u8);
    if at(p) == b'-' {
      prev_char = Some(b'-');
      set.insert(b'-');
      p += 1;
    }
    if at(p) == b']' {
      prev_char = Some(b']');
      set.insert(b']');
      p += 1;
    }
    while p < len && pattern[p] != b']' {
      let ch = pattern[p];
      if ch == b'-' {
        match prev_char {
          None => {
            prev_char = Some(b'-');
            set.insert(b'-');
          },
          Some(_) if p + 1 >= len => return Err(RegexError::MissingBracket),
          Some(_) if pattern[p + 1] == b']' => {
            prev_char = Some(b'-');
            set.insert(b'-');
          },
          Some(low) => {
            p += 1;
            let mut high = Some(pattern[p]);
            if pattern[p] == b'\\' {
              if p + 1 >= len {
                return Err(RegexError::MissingBracket);
              }
              p += 1;
              let (escape, extra) = backslash_expression(pattern, p, &mut set, self.classify);
              p += extra;
              high = match escape {
                Escape::Char(c) => {
                  set.insert(c);
                  Some(c)
                },
                Escape::Class => None,
              };
              prev_char = high;
            }
            match high {
              Some(high) => {
                for c in u16::from(low) + 1..=u16::from(high) {
                  set.insert_with_case(c as u8, self.case_sensitive);
                }
              },
              None => {
                prev_char = Some(b'-');
                set.insert(b'-');
              },
            }
          },
        }
      } else if ch == b'\\' && p + 1 < len {
        p += 1;
        let (escape, extra) = backslash_expression(pattern, p, &mut set, self.classify);
        p += extra;
        prev_char = match escape {
          Escape::Char(c) => {
            set.insert(c);
            Some(c)
          },
          Escape::Class => None,
        };
      } else {
        prev_char = Some(ch);
        set.insert_with_case(ch, self.case_sensitive);
      }
      p += 1;
    }
    if p >= len {
      return Err(RegexError::MissingBracket);
    }
    if negate {
      set.invert();
    }
    self.push(Node::Class(Box::new(set)));
    Ok(p)
  }

  /// Compiles the escape at `p`. Returns the index of its last byte.
  fn backslash(&mut self, p: usize) -> Result<usize> {
    let Some(&ch) = self.pattern.get(p) else {
      self.push(Node::Char(b'\\'));
      return Ok(p);
    };
    match ch {
      b'<' => self.push(Node::WordStart),
      b'>' => {
        if self.nodes.last() == Some(&Node::WordStart) {
          return Err(RegexError::NullWordPattern);
        }
        self.push(Node::WordEnd);
      },
      b'1'..=b'9' => {
        let n = usize::from(ch - b'0');
        if self.tag_stack.last() == Some(&n) {
          return Err(RegexError::CyclicalReference);
        }
        if self.tag_count <= n {
          return Err(RegexError::UndeterminedReference);
        }
        self.push(Node::Backref(n));
      },
      b'(' if !self.posix => self.open_group()?,
      b')' if !self.posix => self.close_group()?,
      _ => {
        let mut set = ByteSet::default();
        let (escape, extra) = backslash_expression(self.pattern, p, &mut set, self.classify);
        match escape {
          Escape::Char(c) => self.push(Node::Char(c)),
          Escape::Class => self.push(Node::Class(Box::new(set))),
        }
        return Ok(p + extra);
      },
    }
    Ok(p)
  }

  fn literal(&mut self, ch: u8) -> Result<()> {
    match ch {
      b'(' if self.posix => self.open_group(),
      b')' if self.posix => self.close_group(),
      _ => {
        if self.case_sensitive || !self.classify.is_word(ch) {
          self.push(Node::Char(ch));
        } else {
          let mut set = ByteSet::default();
          set.insert_with_case(ch, false);
          self.push(Node::Class(Box::new(set)));
        }
        Ok(())
      },
    }
  }

  fn open_group(&mut self) -> Result<()> {
    if self.tag_count >= MAX_TAG {
      return Err(RegexError::TooManyGroups(self.syntax()));
    }
    self.tag_stack.push(self.tag_count);
    self.push(Node::GroupStart(self.tag_count));
    self.tag_count += 1;
    Ok(())
  }

  fn close_group(&mut self) -> Result<()> {
    if matches!(self.nodes.last(), Some(Node::GroupStart(_))) {
      return Err(RegexError::NullGroup(self.syntax()));
    }
    let Some(tag) = self.tag_stack.pop() else {
      return Err(RegexError::UnmatchedClose(self.syntax()));
    };
    self.push(Node::GroupEnd(tag));
    Ok(())
  }
}

/// Group spans of one match, the whole match first.
type Groups = [Option<(usize, usize)>; MAX_TAG];

struct Matcher<'a, C> {
  ci:       &'a C,
  classify: &'a CharClassify,
  bol:      usize,
  endp:     usize,
  bopat:    [Option<usize>; MAX_TAG],
  eopat:    [Option<usize>; MAX_TAG],
}

impl<C: CharacterIndexer> Matcher<'_, C> {
  #[inline]
  fn is_word(&self, position: usize) -> bool {
    self.classify.is_word(self.ci.char_at(position))
  }

  fn matches_one(&self, node: &Node, position: usize) -> bool {
    let ch = self.ci.char_at(position);
    match node {
      Node::Char(c) => ch == *c,
      Node::Any => true,
      Node::Class(set) => set.contains(ch),
      _ => false,
    }
  }

  /// End of a match of `nodes` starting at `lp`.
  fn pmatch(&mut self, mut lp: usize, nodes: &[Node]) -> Option<usize> {
    for (i, node) in nodes.iter().enumerate() {
      match node {
        Node::Char(_) | Node::Any | Node::Class(_) => {
          if lp >= self.endp || !self.matches_one(node, lp) {
            return None;
          }
          lp += 1;
        },
        Node::LineStart => {
          if lp != self.bol {
            return None;
          }
        },
        Node::LineEnd => {
          if lp < self.endp {
            return None;
          }
        },
        Node::GroupStart(n) => self.bopat[*n] = Some(lp),
        Node::GroupEnd(n) => {
          // A group never ends inside a character.
          lp = self.ci.move_position_outside_char(lp, 1);
          self.eopat[*n] = Some(lp);
        },
        Node::WordStart => {
          if (lp != self.bol && self.is_word(lp - 1)) || !self.is_word(lp) {
            return None;
          }
        },
        Node::WordEnd => {
          if lp == self.bol || !self.is_word(lp - 1) || self.is_word(lp) {
            return None;
          }
        },
        Node::Backref(n) => {
          if let (Some(bp), Some(ep)) = (self.bopat[*n], self.eopat[*n]) {
            for position in bp..ep {
              if lp >= self.endp || self.ci.char_at(position) != self.ci.char_at(lp) {
                return None;
              }
              lp += 1;
            }
          }
        },
        Node::Repeat(kind, inner) => return self.repeat(lp, *kind, inner, &nodes[i + 1..]),
      }
    }
    Some(lp)
  }

  fn repeat(&mut self, start: usize, kind: Repeat, inner: &Node, rest: &[Node]) -> Option<usize> {
    let most = if kind == Repeat::Optional { 1 } else { usize::MAX };
    let mut end = start;
    while end < self.endp && end - start < most && self.matches_one(inner, end) {
      end += 1;
    }
    if kind == Repeat::Lazy {
      (start..=end).find_map(|lp| self.pmatch(lp, rest))
    } else {
      (start..=end).rev().find_map(|lp| self.pmatch(lp, rest))
    }
  }
}

/// Matches `nodes` at or after `lp` and before `endp`. `bol` is the start
/// of the line.
fn execute<C: CharacterIndexer>(
  nodes: &[Node],
  ci: &C,
  classify: &CharClassify,
  bol: usize,
  mut lp: usize,
  endp: usize,
) -> Option<Groups> {
  let mut matcher = Matcher {
    ci,
    classify,
    bol,
    endp,
    bopat: [None; MAX_TAG],
    eopat: [None; MAX_TAG],
  };
  let next = |lp: usize| ci.move_position_outside_char(lp + 1, 1);
  let (start, end) = match nodes.first()? {
    Node::LineStart => (lp, matcher.pmatch(lp, nodes)?),
    Node::LineEnd if nodes.len() == 1 => (endp, endp),
    Node::LineEnd => return None,
    first => {
      if let Node::Char(c) = first {
        while lp < endp && ci.char_at(lp) != *c {
          lp = next(lp);
        }
        if lp >= endp {
          return None;
        }
      }
      loop {
        if lp > endp {
          return None;
        }
        if let Some(ep) = matcher.pmatch(lp, nodes) {
          break (lp, ep);
        }
        if lp >= endp {
          return None;
        }
        lp = next(lp);
      }
    },
  };
  matcher.bopat[0] = Some(start);
  matcher.eopat[0] = Some(ci.move_position_outside_char(end, 1));
  let mut groups = [None; MAX_TAG];
  for (i, group) in groups.iter_mut().enumerate() {
    if let (Some(bp), Some(ep)) = (matcher.bopat[i], matcher.eopat[i]) {
      if bp <= ep {
        *group = Some((bp, ep));
      }
    }
  }
  Some(groups)
}

/// The builtin engine. Keeps the last compiled pattern, so an empty pattern
/// searches for it again.
#[derive(Debug, Default)]
pub struct BacktrackSearch {
  program:  Option<Vec<Node>>,
  captures: Captures,
}

impl BacktrackSearch {
  pub fn compile(
    &mut self,
    pattern: &[u8],
    case_sensitive: bool,
    posix: bool,
    classify: &CharClassify,
  ) -> Result<()> {
    if pattern.is_empty() {
      return match self.program {
        Some(_) => Ok(()),
        None => Err(RegexError::NoPrevious),
      };
    }
    match Compiler::new(pattern, case_sensitive, posix, classify).compile() {
      Ok(nodes) => {
        self.program = Some(nodes);
        Ok(())
      },
      Err(err) => {
        self.program = None;
        Err(err)
      },
    }
  }

  pub fn find_text(
    &mut self,
    doc: &Document,
    min: usize,
    max: usize,
    pattern: &[u8],
    flags: FindFlags,
  ) -> Result<Option<(usize, usize)>> {
    let classify = doc.char_classify();
    self.compile(
      pattern,
      flags.contains(FindFlags::MATCH_CASE),
      flags.contains(FindFlags::POSIX),
      classify,
    )?;
    let Some(nodes) = self.program.as_deref() else {
      return Ok(None);
    };
    let line_anchored = nodes.first() == Some(&Node::LineStart);
    let end_anchored = nodes.last() == Some(&Node::LineEnd);
    let range = SearchRange::new(doc, min, max);
    let ci = DocumentIndexer::new(doc);

    for span in range.lines(doc) {
      // A clipped line cannot hold the anchored end.
      if (line_anchored && span.from != span.line_start) || (end_anchored && span.to != span.line_end) {
        continue;
      }
      let Some(mut groups) = execute(nodes, &ci, classify, span.line_start, span.from, span.to) else {
        continue;
      };
      if !range.forward && !line_anchored {
        // Backwards, the last match on the line wins.
        let mut repetitions = MAX_REPETITIONS;
        while let Some((start, end)) = groups[0] {
          if end >= span.to || repetitions == 0 {
            break;
          }
          repetitions -= 1;
          let from = if end > start {
            end
          } else {
            ci.move_position_outside_char(end + 1, 1)
          };
          match execute(nodes, &ci, classify, span.line_start, from, span.to) {
            Some(later) => groups = later,
            None => break,
          }
        }
      }
      let Some((start, end)) = groups[0] else {
        continue;
      };
      self.captures.clear();
      for (i, group) in groups.iter().enumerate() {
        if let Some((bp, ep)) = group {
          self.captures.set(i, *bp, *ep);
        }
      }
      return Ok(Some((start, end - start)));
    }
    Ok(None)
  }

  pub fn captures(&self) -> &Captures {
    &self.captures
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Bytes<'a>(&'a [u8]);

  impl CharacterIndexer for Bytes<'_> {
    fn char_at(&self, position: usize) -> u8 {
      self.0.get(position).copied().unwrap_or(0)
    }

    fn move_position_outside_char(&self, position: usize, _move_dir: isize) -> usize {
      position
    }
  }

  fn compile(pattern: &str, case_sensitive: bool, posix: bool) -> Result<Vec<Node>> {
    Compiler::new(pattern.as_bytes(), case_sensitive, posix, &CharClassify::new()).compile()
  }

  fn matches(pattern: &str, text: &str) -> Option<(usize, usize)> {
    let nodes = compile(pattern, true, false).unwrap();
    let groups = execute(&nodes, &Bytes(text.as_bytes()), &CharClassify::new(), 0, 0, text.len())?;
    groups[0]
  }

  #[test]
  fn compile_errors() {
    let err = |pattern: &str, posix: bool| compile(pattern, true, posix).unwrap_err().to_string();
    assert_eq!(err("[ab", false), "Missing ]");
    assert_eq!(err("*a", false), "Empty closure");
    assert_eq!(err("^*", false), "Illegal closure");
    assert_eq!(err("\\(a\\1\\)", false), "Cyclical reference");
    assert_eq!(err("\\1", false), "Undetermined reference");
    assert_eq!(err("\\(\\)", false), "Null pattern inside \\(\\)");
    assert_eq!(err("()", true), "Null pattern inside ()");
    assert_eq!(err("a\\)", false), "Unmatched \\)");
    assert_eq!(err("(a", true), "Unmatched (");
    assert_eq!(err("\\<\\>", false), "Null pattern inside \\<\\>");
    assert_eq!(err(&"(a)".repeat(10), true), "Too many () pairs");
    assert_eq!(err(&"[a]".repeat(200), false), "Pattern too long");
  }

  #[test]
  fn anchors_compile_only_at_the_ends() {
    assert_eq!(compile("a^", true, false).unwrap(), vec![Node::Char(b'a'), Node::Char(b'^')]);
    assert_eq!(compile("$a", true, false).unwrap(), vec![Node::Char(b'$'), Node::Char(b'a')]);
    assert_eq!(compile("^$", true, false).unwrap(), vec![Node::LineStart, Node::LineEnd]);
    // Without groups, parentheses are plain.
    assert_eq!(compile("(", true, false).unwrap(), vec![Node::Char(b'(')]);
  }

  #[test]
  fn closures() {
    assert_eq!(matches("ab*c", "xacz"), Some((1, 3)));
    assert_eq!(matches("ab*c", "abbbc"), Some((0, 5)));
    assert_eq!(matches("ab+c", "xacabc"), Some((3, 6)));
    assert_eq!(matches("ab?c", "abbc"), None);
    assert_eq!(matches("a.*b", "a1b2b3"), Some((0, 5)));
    assert_eq!(matches("a.*?b", "a1b2b3"), Some((0, 3)));
    assert_eq!(matches("x**", "xx"), Some((0, 2)));
  }

  #[test]
  fn classes() {
    assert_eq!(matches("[0-9]+", "ab123c"), Some((2, 5)));
    assert_eq!(matches("[^a-c]", "abcd"), Some((3, 4)));
    assert_eq!(matches("[]x]", "a]"), Some((1, 2)));
    assert_eq!(matches("[a-]", "x-"), Some((1, 2)));
    assert_eq!(matches("[\\d-z]", "-"), Some((0, 1)));
    assert_eq!(matches("\\s\\S", "a  b"), Some((2, 4)));
    assert_eq!(matches("\\x41", "zA"), Some((1, 2)));
    assert_eq!(matches("\\t", "a\tb"), Some((1, 2)));
  }

  #[test]
  fn case_folds_word_bytes_only() {
    let nodes = compile("ab.", false, false).unwrap();
    let text = b"xABc";
    let groups = execute(&nodes, &Bytes(text), &CharClassify::new(), 0, 0, text.len()).unwrap();
    assert_eq!(groups[0], Some((1, 4)));
  }

  #[test]
  fn back_references() {
    assert_eq!(matches("\\(a*\\)b\\1", "aabaa"), Some((0, 5)));
    assert_eq!(matches("\\(.\\)\\1", "abccd"), Some((2, 4)));
    let nodes = compile("(.)(.)\\2\\1", true, true).unwrap();
    let text = b"xabbay";
    let groups = execute(&nodes, &Bytes(text), &CharClassify::new(), 0, 0, text.len()).unwrap();
    assert_eq!(groups[0], Some((1, 5)));
    assert_eq!(groups[1], Some((1, 2)));
    assert_eq!(groups[2], Some((2, 3)));
  }

  #[test]
  fn empty_pattern_reuses_the_last() {
    let classify = CharClassify::new();
    let mut search = BacktrackSearch::default();
    assert!(matches!(search.compile(b"", true, false, &classify), Err(RegexError::NoPrevious)));
    search.compile(b"abc", true, false, &classify).unwrap();
    assert!(search.compile(b"", true, false, &classify).is_ok());
  }
}
