//! UTF-8 byte classification.
//!
//! Buffers hold arbitrary bytes, so decoding never assumes validity: every
//! sequence is checked with [`classify`], and anything malformed is treated as
//! a single byte.

/// Longest UTF-8 sequence.
pub const MAX_BYTES: usize = 4;

/// U+0085 NEXT LINE encoded as UTF-8.
pub const NEL: [u8; 2] = [0xC2, 0x85];
/// U+2028 LINE SEPARATOR encoded as UTF-8.
pub const LS: [u8; 3] = [0xE2, 0x80, 0xA8];
/// U+2029 PARAGRAPH SEPARATOR encoded as UTF-8.
pub const PS: [u8; 3] = [0xE2, 0x80, 0xA9];

/// Replacement character reported for malformed sequences.
pub const REPLACEMENT: u32 = 0xFFFD;

/// Result of classifying the bytes at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Utf8Class {
  /// Bytes consumed, 1 for every invalid sequence except the noncharacters
  /// which keep their full width.
  pub width: usize,
  pub valid: bool,
}

impl Utf8Class {
  const fn valid(width: usize) -> Self {
    Self { width, valid: true }
  }

  const fn invalid(width: usize) -> Self {
    Self {
      width,
      valid: false,
    }
  }
}

#[inline]
pub const fn is_ascii(b: u8) -> bool {
  b < 0x80
}

#[inline]
pub const fn is_trail_byte(b: u8) -> bool {
  b & 0xC0 == 0x80
}

/// Width of a sequence as predicted by its lead byte. Bytes that cannot start
/// a sequence report 1.
#[inline]
pub const fn bytes_from_lead(lead: u8) -> usize {
  match lead {
    0x00..=0xC1 => 1,
    0xC2..=0xDF => 2,
    0xE0..=0xEF => 3,
    0xF0..=0xF4 => 4,
    _ => 1,
  }
}

/// Classifies the sequence starting at `bytes[0]`. `bytes` may be longer than
/// the sequence; only the first [`MAX_BYTES`] are examined.
pub fn classify(bytes: &[u8]) -> Utf8Class {
  let Some(&lead) = bytes.first() else {
    return Utf8Class::invalid(1);
  };
  if is_ascii(lead) {
    return Utf8Class::valid(1);
  }
  if lead > 0xF4 || lead < 0xC2 {
    // Trail byte, overlong two byte lead or past the Unicode range.
    return Utf8Class::invalid(1);
  }
  let trail = |i: usize| bytes.get(i).copied().is_some_and(is_trail_byte);

  if lead >= 0xF0 {
    // 4 bytes
    if !(trail(1) && trail(2) && trail(3)) {
      return Utf8Class::invalid(1);
    }
    let b1 = bytes[1];
    if (b1 & 0xF) == 0xF && bytes[2] == 0xBF && (bytes[3] == 0xBE || bytes[3] == 0xBF) {
      // *FFFE or *FFFF noncharacter
      return Utf8Class::invalid(4);
    }
    if lead == 0xF4 && b1 > 0x8F {
      // Above 0x10FFFF
      return Utf8Class::invalid(1);
    }
    if lead == 0xF0 && (b1 & 0xF0) == 0x80 {
      // Overlong
      return Utf8Class::invalid(1);
    }
    return Utf8Class::valid(4);
  }

  if lead >= 0xE0 {
    // 3 bytes
    if !(trail(1) && trail(2)) {
      return Utf8Class::invalid(1);
    }
    let b1 = bytes[1];
    if lead == 0xE0 && (b1 & 0xE0) == 0x80 {
      // Overlong
      return Utf8Class::invalid(1);
    }
    if lead == 0xED && (b1 & 0xE0) == 0xA0 {
      // Surrogate
      return Utf8Class::invalid(1);
    }
    if lead == 0xEF && b1 == 0xBF && (bytes[2] == 0xBE || bytes[2] == 0xBF) {
      // U+FFFE or U+FFFF noncharacter
      return Utf8Class::invalid(3);
    }
    if lead == 0xEF && b1 == 0xB7 && (0x90..=0xAF).contains(&bytes[2]) {
      // U+FDD0 to U+FDEF noncharacters
      return Utf8Class::invalid(3);
    }
    return Utf8Class::valid(3);
  }

  // 2 bytes
  if trail(1) {
    Utf8Class::valid(2)
  } else {
    Utf8Class::invalid(1)
  }
}

/// Decodes a sequence already known to be valid with the given width.
pub fn decode(bytes: &[u8], width: usize) -> u32 {
  let b = |i: usize| u32::from(bytes.get(i).copied().unwrap_or(0));
  match width {
    1 => b(0),
    2 => ((b(0) & 0x1F) << 6) | (b(1) & 0x3F),
    3 => ((b(0) & 0x0F) << 12) | ((b(1) & 0x3F) << 6) | (b(2) & 0x3F),
    _ => ((b(0) & 0x07) << 18) | ((b(1) & 0x3F) << 12) | ((b(2) & 0x3F) << 6) | (b(3) & 0x3F),
  }
}

/// Number of UTF-16 code units needed for `ch`.
#[inline]
pub const fn utf16_len(ch: u32) -> usize {
  if ch >= 0x10000 { 2 } else { 1 }
}

/// Number of UTF-16 code units for a sequence of the given byte width.
#[inline]
pub const fn utf16_len_from_width(width: usize) -> usize {
  if width >= MAX_BYTES { 2 } else { 1 }
}

/// True when the three bytes encode LS or PS.
#[inline]
pub fn is_separator(b0: u8, b1: u8, b2: u8) -> bool {
  b0 == LS[0] && b1 == LS[1] && (b2 == LS[2] || b2 == PS[2])
}

/// True when the two bytes encode NEL.
#[inline]
pub fn is_nel(b0: u8, b1: u8) -> bool {
  b0 == NEL[0] && b1 == NEL[1]
}
