//! Pending transactions waiting to be embedded in a mined block.

use crate::blockchain::Block;
use std::collections::{HashSet, VecDeque};
use tracing::debug;

/// FIFO of raw transaction texts. Only the head is ever mined.
#[derive(Debug, Clone, Default)]
pub struct Mempool {
    pending: VecDeque<String>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, text: String) {
        self.pending.push_back(text);
    }

    pub fn head(&self) -> Option<&str> {
        self.pending.front().map(String::as_str)
    }

    pub fn pop_head(&mut self) -> Option<String> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(String::as_str)
    }

    /// Drop every pending text already carried by a block of `chain`.
    pub fn remove_committed(&mut self, chain: &[Block]) -> usize {
        let before = self.pending.len();
        self.pending.retain(|text| {
            let committed = chain.iter().any(|block| is_carried_by(text, block));
            if committed {
                debug!(transaction = text.trim(), "pending transaction already on chain");
            }
            !committed
        });
        before - self.pending.len()
    }
}

/// Every non-blank line of `text` must be a whole line of the block's info,
/// compared after trimming. Blank texts are never carried.
fn is_carried_by(text: &str, block: &Block) -> bool {
    let block_lines: HashSet<&str> = block.info().lines().map(str::trim).collect();
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty()).peekable();
    lines.peek().is_some() && lines.all(|line| block_lines.contains(line))
}
