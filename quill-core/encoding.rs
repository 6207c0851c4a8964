//! Encoding families and character extraction.
//!
//! A document is in exactly one [`Encoding`] at a time:
//!
//! - `EightBit`: every byte is a character.
//! - `Dbcs`: one of the double byte code pages. A byte in the code page's lead
//!   range followed by a byte in its trail range forms one character.
//! - `Utf8`: validated through [`crate::utf8::classify`].
//!
//! Malformed input never fails; it decodes as single bytes.

use crate::utf8;

/// Numeric code page for UTF-8.
pub const CP_UTF8: u32 = 65001;

/// Double byte code pages with lead/trail tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbcsCodePage {
  /// Shift-JIS
  Japanese,
  /// GBK
  SimplifiedChinese,
  /// Unified Hangul Code
  Korean,
  /// Big5
  TraditionalChinese,
  /// Johab
  Johab,
}

impl DbcsCodePage {
  pub const fn from_code_page(code_page: u32) -> Option<Self> {
    match code_page {
      932 => Some(Self::Japanese),
      936 => Some(Self::SimplifiedChinese),
      949 => Some(Self::Korean),
      950 => Some(Self::TraditionalChinese),
      1361 => Some(Self::Johab),
      _ => None,
    }
  }

  pub const fn code_page(self) -> u32 {
    match self {
      Self::Japanese => 932,
      Self::SimplifiedChinese => 936,
      Self::Korean => 949,
      Self::TraditionalChinese => 950,
      Self::Johab => 1361,
    }
  }

  #[inline]
  pub const fn is_lead_byte(self, b: u8) -> bool {
    match self {
      Self::Japanese => matches!(b, 0x81..=0x9F | 0xE0..=0xFC),
      Self::SimplifiedChinese | Self::Korean | Self::TraditionalChinese => {
        matches!(b, 0x81..=0xFE)
      },
      Self::Johab => matches!(b, 0x84..=0xD3 | 0xD8..=0xDE | 0xE0..=0xF9),
    }
  }

  #[inline]
  pub const fn is_trail_byte(self, b: u8) -> bool {
    match self {
      Self::Japanese => matches!(b, 0x40..=0x7E | 0x80..=0xFC),
      Self::SimplifiedChinese => matches!(b, 0x40..=0x7E | 0x80..=0xFE),
      Self::Korean => matches!(b, 0x41..=0x5A | 0x61..=0x7A | 0x81..=0xFE),
      Self::TraditionalChinese => matches!(b, 0x40..=0x7E | 0xA1..=0xFE),
      Self::Johab => matches!(b, 0x31..=0x7E | 0x81..=0xFE),
    }
  }

  /// The matching `encoding_rs` codec, when there is one.
  pub fn codec(self) -> Option<&'static encoding_rs::Encoding> {
    match self {
      Self::Japanese => Some(encoding_rs::SHIFT_JIS),
      Self::SimplifiedChinese => Some(encoding_rs::GBK),
      Self::Korean => Some(encoding_rs::EUC_KR),
      Self::TraditionalChinese => Some(encoding_rs::BIG5),
      Self::Johab => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Encoding {
  #[default]
  EightBit,
  Dbcs(DbcsCodePage),
  Utf8,
}

/// A decoded character and the bytes it occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterExtracted {
  pub character: u32,
  pub width:     usize,
}

impl CharacterExtracted {
  pub const fn new(character: u32, width: usize) -> Self {
    Self { character, width }
  }
}

impl Encoding {
  /// Unknown code pages behave as single byte.
  pub const fn from_code_page(code_page: u32) -> Self {
    if code_page == CP_UTF8 {
      return Self::Utf8;
    }
    match DbcsCodePage::from_code_page(code_page) {
      Some(dbcs) => Self::Dbcs(dbcs),
      None => Self::EightBit,
    }
  }

  pub const fn code_page(self) -> u32 {
    match self {
      Self::EightBit => 0,
      Self::Dbcs(dbcs) => dbcs.code_page(),
      Self::Utf8 => CP_UTF8,
    }
  }

  #[inline]
  pub const fn is_utf8(self) -> bool {
    matches!(self, Self::Utf8)
  }

  #[inline]
  pub const fn is_dbcs(self) -> bool {
    matches!(self, Self::Dbcs(_))
  }

  /// True for encodings in which a character may span several bytes.
  #[inline]
  pub const fn is_multi_byte(self) -> bool {
    !matches!(self, Self::EightBit)
  }

  #[inline]
  pub const fn is_dbcs_lead_byte(self, b: u8) -> bool {
    match self {
      Self::Dbcs(dbcs) => dbcs.is_lead_byte(b),
      _ => false,
    }
  }

  #[inline]
  pub const fn is_dbcs_trail_byte(self, b: u8) -> bool {
    match self {
      Self::Dbcs(dbcs) => dbcs.is_trail_byte(b),
      _ => false,
    }
  }

  /// Width of the character starting at `bytes[0]`.
  #[inline]
  pub fn char_width(self, bytes: &[u8]) -> usize {
    self.decode(bytes).width
  }

  /// Decodes the character at the start of `bytes`.
  ///
  /// - EightBit: the byte value, width 1.
  /// - DBCS: `lead << 8 | trail` at width 2 for a valid pair, else width 1.
  /// - UTF-8: the code point, or [`utf8::REPLACEMENT`] at width 1 when the
  ///   sequence is malformed.
  ///
  /// An empty slice yields a zero character of width 1.
  pub fn decode(self, bytes: &[u8]) -> CharacterExtracted {
    let Some(&lead) = bytes.first() else {
      return CharacterExtracted::new(0, 1);
    };
    match self {
      Self::EightBit => CharacterExtracted::new(u32::from(lead), 1),
      Self::Dbcs(dbcs) => {
        match bytes.get(1) {
          Some(&trail) if dbcs.is_lead_byte(lead) && dbcs.is_trail_byte(trail) => {
            CharacterExtracted::new((u32::from(lead) << 8) | u32::from(trail), 2)
          },
          _ => CharacterExtracted::new(u32::from(lead), 1),
        }
      },
      Self::Utf8 => {
        if utf8::is_ascii(lead) {
          return CharacterExtracted::new(u32::from(lead), 1);
        }
        let class = utf8::classify(bytes);
        if class.valid {
          CharacterExtracted::new(utf8::decode(bytes, class.width), class.width)
        } else {
          CharacterExtracted::new(utf8::REPLACEMENT, 1)
        }
      },
    }
  }
}
