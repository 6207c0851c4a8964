//! Storage primitives shared by the buffer crates.

pub mod partitioning;
pub mod split_vector;

pub use partitioning::Partitioning;
pub use split_vector::{
  BufferError,
  SplitVector,
};
