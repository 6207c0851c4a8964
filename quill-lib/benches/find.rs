//! Benchmarks for searching a document.
//!
//! Run with: `cargo bench -p quill-lib --bench find`

use divan::{
  Bencher,
  black_box,
};
use quill_lib::{
  config::{
    DocumentOptions,
    RegexEngine,
  },
  document::{
    Document,
    FindFlags,
  },
};

fn main() {
  divan::main();
}

fn make_doc(size: usize, code_page: u32) -> Document {
  let line = "The quick brown fox jumps over the lazy dog. Grüße Ωμέγα\n";
  let mut text = String::with_capacity(size + line.len());
  while text.len() < size {
    text.push_str(line);
  }
  text.push_str("needle at the end\n");
  let mut doc = Document::with_options(&DocumentOptions {
    code_page,
    ..Default::default()
  });
  doc.insert_string(0, text.as_bytes());
  doc
}

// Literal search.

mod literal {
  use super::*;

  #[divan::bench(args = [10_000, 1_000_000])]
  fn match_case(bencher: Bencher, size: usize) {
    let mut doc = make_doc(size, 65001);
    let len = doc.len();
    bencher.bench_local(|| doc.find_text(0, len, black_box(b"needle"), FindFlags::MATCH_CASE));
  }

  #[divan::bench(args = [10_000, 1_000_000])]
  fn ignore_case(bencher: Bencher, size: usize) {
    let mut doc = make_doc(size, 65001);
    let len = doc.len();
    bencher.bench_local(|| doc.find_text(0, len, black_box(b"NEEDLE"), FindFlags::empty()));
  }

  #[divan::bench(args = [10_000, 1_000_000])]
  fn backward(bencher: Bencher, size: usize) {
    let mut doc = make_doc(size, 65001);
    let len = doc.len();
    bencher.bench_local(|| doc.find_text(len, 0, black_box(b"quick"), FindFlags::MATCH_CASE));
  }

  #[divan::bench(args = [10_000, 1_000_000])]
  fn whole_word(bencher: Bencher, size: usize) {
    let mut doc = make_doc(size, 0);
    let len = doc.len();
    let flags = FindFlags::MATCH_CASE | FindFlags::WHOLE_WORD;
    bencher.bench_local(|| doc.find_text(0, len, black_box(b"needle"), flags));
  }
}

// Regular expression search with both engines.

mod regex {
  use super::*;

  #[divan::bench(args = [RegexEngine::Builtin, RegexEngine::Standard])]
  fn anchored_line(bencher: Bencher, engine: RegexEngine) {
    let mut doc = make_doc(100_000, 65001);
    doc.set_regex_engine(engine);
    let len = doc.len();
    let pattern: &[u8] = match engine {
      RegexEngine::Builtin => b"^needle \\([a-z]+\\)",
      RegexEngine::Standard => b"^needle ([a-z]+)",
    };
    bencher.bench_local(|| doc.find_text(0, len, black_box(pattern), FindFlags::REGEXP));
  }

  #[divan::bench(args = [RegexEngine::Builtin, RegexEngine::Standard])]
  fn word_class(bencher: Bencher, engine: RegexEngine) {
    let mut doc = make_doc(100_000, 65001);
    doc.set_regex_engine(engine);
    let len = doc.len();
    bencher.bench_local(|| doc.find_text(0, len, black_box(b"n\\w+e e"), FindFlags::REGEXP));
  }
}
