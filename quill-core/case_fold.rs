//! Case folding for case insensitive search.
//!
//! A [`CaseFolder`] maps a byte sequence to its folded form through the
//! document's encoding. Folding may change the byte length, so searches fold
//! the needle once and then fold the haystack one character at a time.

use crate::{
  encoding::{
    DbcsCodePage,
    Encoding,
  },
  utf8,
};

pub trait CaseFolder {
  /// Appends the folded form of `mixed` to `out`.
  fn fold_into(&self, mixed: &[u8], out: &mut Vec<u8>);

  fn fold(&self, mixed: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(mixed.len());
    self.fold_into(mixed, &mut out);
    out
  }
}

/// Creates the folder matching `encoding`.
pub fn folder_for(encoding: Encoding) -> Box<dyn CaseFolder> {
  match encoding {
    Encoding::EightBit => Box::new(TableFolder::new()),
    Encoding::Utf8 => Box::new(UnicodeFolder),
    Encoding::Dbcs(code_page) => Box::new(DbcsFolder::new(code_page)),
  }
}

/// Byte to byte folding table. Starts as ASCII lower casing.
#[derive(Debug, Clone)]
pub struct TableFolder {
  mapping: [u8; 256],
}

impl Default for TableFolder {
  fn default() -> Self {
    Self::new()
  }
}

impl TableFolder {
  pub fn new() -> Self {
    let mut mapping = [0u8; 256];
    for (i, folded) in mapping.iter_mut().enumerate() {
      *folded = (i as u8).to_ascii_lowercase();
    }
    Self { mapping }
  }

  pub fn set_translation(&mut self, ch: u8, folded: u8) {
    self.mapping[usize::from(ch)] = folded;
  }

  #[inline]
  pub fn fold_byte(&self, b: u8) -> u8 {
    self.mapping[usize::from(b)]
  }
}

impl CaseFolder for TableFolder {
  fn fold_into(&self, mixed: &[u8], out: &mut Vec<u8>) {
    out.extend(mixed.iter().map(|&b| self.fold_byte(b)));
  }
}

/// Folds valid UTF-8 through Unicode lower casing and copies malformed bytes
/// unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeFolder;

impl CaseFolder for UnicodeFolder {
  fn fold_into(&self, mixed: &[u8], out: &mut Vec<u8>) {
    let mut i = 0;
    while i < mixed.len() {
      let b = mixed[i];
      if utf8::is_ascii(b) {
        out.push(b.to_ascii_lowercase());
        i += 1;
        continue;
      }
      let class = utf8::classify(&mixed[i..]);
      let decoded = class
        .valid
        .then(|| char::from_u32(utf8::decode(&mixed[i..], class.width)))
        .flatten();
      match decoded {
        Some(ch) => {
          let mut buf = [0u8; utf8::MAX_BYTES];
          for lower in ch.to_lowercase() {
            out.extend_from_slice(lower.encode_utf8(&mut buf).as_bytes());
          }
        },
        None => out.extend_from_slice(&mixed[i..i + class.width]),
      }
      i += class.width;
    }
  }
}

/// Folds double byte text by decoding each pair through the code page.
/// Characters without a codec or without a round trip stay unchanged.
#[derive(Debug, Clone, Copy)]
pub struct DbcsFolder {
  code_page: DbcsCodePage,
}

impl DbcsFolder {
  pub fn new(code_page: DbcsCodePage) -> Self {
    Self { code_page }
  }

  fn fold_pair(&self, pair: &[u8], out: &mut Vec<u8>) {
    let Some(codec) = self.code_page.codec() else {
      out.extend_from_slice(pair);
      return;
    };
    let (decoded, malformed) = codec.decode_without_bom_handling(pair);
    let mut chars = decoded.chars();
    let folded = match (malformed, chars.next(), chars.next()) {
      (false, Some(ch), None) => {
        let lower: String = ch.to_lowercase().collect();
        let (encoded, _, unmappable) = codec.encode(&lower);
        (!unmappable).then(|| encoded.into_owned())
      },
      _ => None,
    };
    match folded {
      Some(encoded) => out.extend_from_slice(&encoded),
      None => out.extend_from_slice(pair),
    }
  }
}

impl CaseFolder for DbcsFolder {
  fn fold_into(&self, mixed: &[u8], out: &mut Vec<u8>) {
    let mut i = 0;
    while i < mixed.len() {
      let b = mixed[i];
      let pair = self.code_page.is_lead_byte(b)
        && mixed
          .get(i + 1)
          .is_some_and(|&trail| self.code_page.is_trail_byte(trail));
      if pair {
        self.fold_pair(&mixed[i..i + 2], out);
        i += 2;
      } else {
        out.push(b.to_ascii_lowercase());
        i += 1;
      }
    }
  }
}
