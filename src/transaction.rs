//! Transaction records embedded line by line in a block's `info`.

pub mod types;

pub use types::*;
