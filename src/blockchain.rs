// Thin re-export module: implementation lives in `blockchain/core.rs`, split
// into chain structure, validation and ledger replay.

pub mod core;
pub use core::*;
