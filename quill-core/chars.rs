use unicode_general_category::{
  GeneralCategory,
  get_general_category,
};

/// Coarse character class used for word boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharClass {
  Space,
  NewLine,
  Word,
  Punctuation,
}

/// Classifies a code point by its Unicode general category.
///
/// Letters, numbers and marks are words; punctuation and symbols are
/// punctuation; line and paragraph separators are new lines; everything else
/// (space separators, controls, unassigned) is space.
pub fn char_class(ch: char) -> CharClass {
  use GeneralCategory::*;

  match get_general_category(ch) {
    LineSeparator | ParagraphSeparator => CharClass::NewLine,
    UppercaseLetter | LowercaseLetter | TitlecaseLetter | ModifierLetter | OtherLetter
    | DecimalNumber | LetterNumber | OtherNumber | NonspacingMark | SpacingMark
    | EnclosingMark => CharClass::Word,
    ConnectorPunctuation | DashPunctuation | OpenPunctuation | ClosePunctuation
    | InitialPunctuation | FinalPunctuation | OtherPunctuation | MathSymbol | CurrencySymbol
    | ModifierSymbol | OtherSymbol => CharClass::Punctuation,
    _ => CharClass::Space,
  }
}

/// Classifies a code point that may not be a valid `char`.
#[inline]
pub fn code_point_class(ch: u32) -> CharClass {
  char::from_u32(ch).map_or(CharClass::Space, char_class)
}

/// Per byte character classes, used for single byte text and for the ASCII
/// range of every encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharClassify {
  classes: [CharClass; 256],
}

impl Default for CharClassify {
  fn default() -> Self {
    Self::new()
  }
}

impl CharClassify {
  pub fn new() -> Self {
    let mut classify = Self {
      classes: [CharClass::Space; 256],
    };
    classify.set_default_char_classes(true);
    classify
  }

  /// Resets every byte to its default class. With `include_word_class` unset,
  /// bytes that would be words become punctuation.
  pub fn set_default_char_classes(&mut self, include_word_class: bool) {
    for (b, class) in self.classes.iter_mut().enumerate() {
      let b = b as u8;
      *class = if b == b'\r' || b == b'\n' {
        CharClass::NewLine
      } else if b < 0x20 || b == b' ' {
        CharClass::Space
      } else if include_word_class && (b >= 0x80 || b.is_ascii_alphanumeric() || b == b'_') {
        CharClass::Word
      } else {
        CharClass::Punctuation
      };
    }
  }

  pub fn set_char_classes(&mut self, bytes: &[u8], class: CharClass) {
    for &b in bytes {
      self.classes[usize::from(b)] = class;
    }
  }

  /// Bytes currently in `class`, in ascending order.
  pub fn chars_of_class(&self, class: CharClass) -> Vec<u8> {
    (0..=u8::MAX)
      .filter(|&b| self.classes[usize::from(b)] == class)
      .collect()
  }

  #[inline]
  pub fn class(&self, b: u8) -> CharClass {
    self.classes[usize::from(b)]
  }

  #[inline]
  pub fn is_word(&self, b: u8) -> bool {
    self.class(b) == CharClass::Word
  }
}

#[inline]
pub fn is_space_or_tab(b: u8) -> bool {
  b == b' ' || b == b'\t'
}

/// Matches C `isspace`: space, tab, and the line feed through carriage return
/// control range.
#[inline]
pub fn is_space_char(b: u8) -> bool {
  b == b' ' || (0x09..=0x0D).contains(&b)
}

#[inline]
pub fn is_punctuation(b: u8) -> bool {
  b.is_ascii_punctuation()
}

#[inline]
pub fn is_ascii_lower(b: u8) -> bool {
  b.is_ascii_lowercase()
}

#[inline]
pub fn is_ascii_upper(b: u8) -> bool {
  b.is_ascii_uppercase()
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn unicode_categories_collapse() {
    assert_eq!(char_class('a'), CharClass::Word);
    assert_eq!(char_class('漢'), CharClass::Word);
    assert_eq!(char_class('٣'), CharClass::Word);
    // Combining acute accent.
    assert_eq!(char_class('\u{0301}'), CharClass::Word);
    assert_eq!(char_class('«'), CharClass::Punctuation);
    assert_eq!(char_class('€'), CharClass::Punctuation);
    assert_eq!(char_class('\u{2028}'), CharClass::NewLine);
    assert_eq!(char_class('\u{2029}'), CharClass::NewLine);
    assert_eq!(char_class('\u{3000}'), CharClass::Space);
    assert_eq!(char_class('\u{0007}'), CharClass::Space);
    assert_eq!(code_point_class(0xD800), CharClass::Space);
  }

  #[test]
  fn default_byte_classes() {
    let classify = CharClassify::new();
    assert_eq!(classify.class(b'\n'), CharClass::NewLine);
    assert_eq!(classify.class(b'\r'), CharClass::NewLine);
    assert_eq!(classify.class(b'\t'), CharClass::Space);
    assert_eq!(classify.class(b' '), CharClass::Space);
    assert_eq!(classify.class(b'_'), CharClass::Word);
    assert_eq!(classify.class(b'Z'), CharClass::Word);
    assert_eq!(classify.class(0xE9), CharClass::Word);
    assert_eq!(classify.class(b'-'), CharClass::Punctuation);
  }

  #[test]
  fn classes_can_be_overridden() {
    let mut classify = CharClassify::new();
    classify.set_char_classes(b"-", CharClass::Word);
    assert!(classify.is_word(b'-'));

    classify.set_default_char_classes(false);
    assert_eq!(classify.class(b'a'), CharClass::Punctuation);
    assert_eq!(classify.chars_of_class(CharClass::NewLine), vec![b'\n', b'\r']);
    assert!(classify.chars_of_class(CharClass::Word).is_empty());
  }
}
