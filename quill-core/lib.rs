pub mod case_fold;
pub mod chars;
pub mod encoding;
pub mod line_ending;
pub mod utf8;
