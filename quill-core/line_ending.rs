use bitflags::bitflags;
use serde::{
  Deserialize,
  Deserializer,
};

#[cfg(target_os = "windows")]
pub const NATIVE_LINE_ENDING: EndOfLine = EndOfLine::CrLf;

#[cfg(not(target_os = "windows"))]
pub const NATIVE_LINE_ENDING: EndOfLine = EndOfLine::Lf;

/// Line end inserted by new line commands and line end conversion.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndOfLine {
  /// CarriageReturn followed by LineFeed.
  CrLf,

  /// U+000D -- CarriageReturn
  Cr,

  /// U+000A -- LineFeed
  Lf,
}

impl Default for EndOfLine {
  fn default() -> Self {
    NATIVE_LINE_ENDING
  }
}

impl EndOfLine {
  #[inline]
  pub const fn len_bytes(&self) -> usize {
    match self {
      Self::CrLf => 2,
      _ => 1,
    }
  }

  #[inline]
  pub const fn as_bytes(&self) -> &'static [u8] {
    match self {
      Self::CrLf => b"\r\n",
      Self::Cr => b"\r",
      Self::Lf => b"\n",
    }
  }
}

bitflags! {
  /// Line end kinds recognised by the line index.
  #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
  pub struct LineEndTypes: u8 {
    /// CR, LF and CRLF.
    const DEFAULT = 0;
    /// Also NEL, LS and PS. Only honoured for UTF-8 documents.
    const UNICODE = 1;
  }
}

impl Default for LineEndTypes {
  fn default() -> Self {
    Self::DEFAULT
  }
}

impl<'de> Deserialize<'de> for LineEndTypes {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let name = String::deserialize(deserializer)?;
    match name.as_str() {
      "default" => Ok(Self::DEFAULT),
      "unicode" => Ok(Self::UNICODE),
      other => {
        Err(serde::de::Error::unknown_variant(other, &[
          "default", "unicode",
        ]))
      },
    }
  }
}

#[inline]
pub const fn is_eol_byte(b: u8) -> bool {
  b == b'\r' || b == b'\n'
}

/// Rewrites every CR, LF and CRLF in `text` as `eol`.
pub fn transform_line_ends(text: &[u8], eol: EndOfLine) -> Vec<u8> {
  let mut out = Vec::with_capacity(text.len());
  let mut i = 0;
  while i < text.len() {
    match text[i] {
      b'\r' => {
        if text.get(i + 1) == Some(&b'\n') {
          i += 1;
        }
        out.extend_from_slice(eol.as_bytes());
      },
      b'\n' => out.extend_from_slice(eol.as_bytes()),
      b => out.push(b),
    }
    i += 1;
  }
  out
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn transform_mixed_line_endings() {
    let text = b"a\rb\nc\r\nd";
    assert_eq!(transform_line_ends(text, EndOfLine::Lf), b"a\nb\nc\nd");
    assert_eq!(
      transform_line_ends(text, EndOfLine::CrLf),
      b"a\r\nb\r\nc\r\nd"
    );
    assert_eq!(transform_line_ends(text, EndOfLine::Cr), b"a\rb\rc\rd");
  }

  #[test]
  fn trailing_cr_is_converted() {
    assert_eq!(transform_line_ends(b"x\r", EndOfLine::Lf), b"x\n");
    assert_eq!(transform_line_ends(b"", EndOfLine::Lf), b"");
  }

  #[test]
  fn line_end_lengths() {
    assert_eq!(EndOfLine::CrLf.len_bytes(), 2);
    assert_eq!(EndOfLine::Lf.as_bytes(), b"\n");
  }
}
