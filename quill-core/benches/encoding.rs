//! Benchmarks for byte classification and case folding in quill-core.
//!
//! Run with: `cargo bench -p quill-core --bench encoding`

use divan::{
  Bencher,
  black_box,
};
use quill_core::{
  case_fold::{
    CaseFolder,
    DbcsFolder,
    UnicodeFolder,
  },
  encoding::{
    DbcsCodePage,
    Encoding,
  },
  utf8,
};

fn main() {
  divan::main();
}

fn mixed_text(len: usize) -> Vec<u8> {
  "Grüße, Ωμέγα → 漢字テキスト 😀 plain ascii words\n"
    .as_bytes()
    .iter()
    .copied()
    .cycle()
    .take(len)
    .collect()
}

// `utf8::classify` benchmarks.

mod classify {
  use super::*;

  #[divan::bench(args = [1_000, 100_000])]
  fn walk_mixed(bencher: Bencher, len: usize) {
    let text = mixed_text(len);
    bencher.bench(|| {
      let mut pos = 0;
      let mut chars = 0;
      while pos < text.len() {
        pos += utf8::classify(black_box(&text[pos..])).width;
        chars += 1;
      }
      chars
    });
  }
}

// `Encoding::decode` benchmarks.

mod decode {
  use super::*;

  #[divan::bench(args = [1_000, 100_000])]
  fn dbcs(bencher: Bencher, len: usize) {
    let text: Vec<u8> = [0x82, 0xA0, b'a', 0x93, 0xFA]
      .iter()
      .copied()
      .cycle()
      .take(len)
      .collect();
    let encoding = Encoding::Dbcs(DbcsCodePage::Japanese);
    bencher.bench(|| {
      let mut pos = 0;
      while pos < text.len() {
        pos += encoding.decode(black_box(&text[pos..])).width;
      }
      pos
    });
  }
}

// `CaseFolder` benchmarks.

mod fold {
  use super::*;

  #[divan::bench(args = [1_000, 100_000])]
  fn unicode(bencher: Bencher, len: usize) {
    let text = mixed_text(len);
    bencher.bench(|| UnicodeFolder.fold(black_box(&text)));
  }

  #[divan::bench(args = [1_000])]
  fn shift_jis(bencher: Bencher, len: usize) {
    let text: Vec<u8> = [0x82, 0x60, b'A', 0x82, 0xA0]
      .iter()
      .copied()
      .cycle()
      .take(len)
      .collect();
    let folder = DbcsFolder::new(DbcsCodePage::Japanese);
    bencher.bench(|| folder.fold(black_box(&text)));
  }
}
