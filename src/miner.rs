//! Proof-of-work puzzle: hashing and independent mining attempts.
//!
//! Every attempt draws a fresh random filler; there is no nonce counter and no
//! memory between attempts, so the expected number of attempts before a hit
//! is `16^difficulty`.

use crate::blockchain::{leading_zeros, Block};
use rand::Rng;
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_DIFFICULTY: usize = 5;

/// SHA-256 over `parent_hash ∥ info ∥ filler`, lowercase hex.
pub fn block_hash(parent_hash: &str, info: &str, filler: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(parent_hash.as_bytes());
    hasher.update(info.as_bytes());
    hasher.update(filler.as_bytes());
    hex::encode(hasher.finalize())
}

/// A fresh random filler, stringified the same way for every node.
pub fn random_filler() -> String {
    rand::thread_rng().gen::<f64>().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Miner {
    difficulty: usize,
}

impl Miner {
    pub fn new(difficulty: usize) -> Self {
        Miner { difficulty }
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn meets_target(&self, hash: &str) -> bool {
        leading_zeros(hash) >= self.difficulty
    }

    /// One attempt with a random filler.
    pub fn attempt(&self, parent_hash: &str, info: &str) -> Option<Block> {
        self.attempt_with_filler(parent_hash, info, random_filler())
    }

    pub fn attempt_with_filler(&self, parent_hash: &str, info: &str, filler: String) -> Option<Block> {
        let block = Block::new(parent_hash, info, filler);
        self.meets_target(block.hash()).then_some(block)
    }

    /// Up to `batch` attempts; the caller checks for cancellation between
    /// batches.
    pub fn attempt_batch(&self, parent_hash: &str, info: &str, batch: usize) -> Option<Block> {
        (0..batch).find_map(|_| self.attempt(parent_hash, info))
    }

    /// Mine until a block is found or `cancel` fires. The token is checked
    /// once every `batch` attempts.
    pub fn mine_until_found(
        &self,
        parent_hash: &str,
        info: &str,
        batch: usize,
        cancel: &CancellationToken,
    ) -> Option<Block> {
        let batch = batch.max(1);
        while !cancel.is_cancelled() {
            if let Some(block) = self.attempt_batch(parent_hash, info, batch) {
                return Some(block);
            }
        }
        None
    }
}

impl Default for Miner {
    fn default() -> Self {
        Self::new(DEFAULT_DIFFICULTY)
    }
}
