use crate::error::ChainError;
use crate::miner::Miner;

use super::chain::Block;

/// Whether the final block of a candidate chain is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TipPolicy {
    /// Every block after genesis is checked.
    #[default]
    Strict,
    /// The final block is skipped, as older nodes on the network do.
    Lenient,
}

#[derive(Debug, Clone, Copy)]
pub struct ChainValidator {
    miner: Miner,
    tip_policy: TipPolicy,
}

impl ChainValidator {
    pub fn new(difficulty: usize, tip_policy: TipPolicy) -> Self {
        ChainValidator {
            miner: Miner::new(difficulty),
            tip_policy,
        }
    }

    pub fn difficulty(&self) -> usize {
        self.miner.difficulty()
    }

    pub fn tip_policy(&self) -> TipPolicy {
        self.tip_policy
    }

    pub fn is_valid_block(&self, block: &Block) -> bool {
        if block.is_genesis() {
            return true;
        }
        self.miner.meets_target(block.hash()) && block.recompute_hash() == block.hash()
    }

    /// Length of the chain if it is valid, with the reason otherwise.
    pub fn check_chain(&self, chain: &[Block]) -> Result<usize, ChainError> {
        let first = chain.first().ok_or(ChainError::EmptyChain)?;
        if !first.is_genesis() {
            return Err(ChainError::InvalidGenesis);
        }

        let checked = match self.tip_policy {
            TipPolicy::Strict => chain.len(),
            TipPolicy::Lenient => chain.len().saturating_sub(1),
        };

        for index in 1..checked {
            let block = &chain[index];
            if block.parent_hash() != chain[index - 1].hash() {
                return Err(ChainError::BrokenLink { index });
            }
            if !self.is_valid_block(block) {
                return Err(ChainError::InvalidBlock { index });
            }
        }
        Ok(chain.len())
    }

    pub fn is_valid_chain(&self, chain: &[Block]) -> Option<usize> {
        self.check_chain(chain).ok()
    }

    /// Longest valid chain wins; ties keep the current chain.
    pub fn should_adopt(&self, current: &[Block], candidate: &[Block]) -> bool {
        self.is_valid_chain(candidate)
            .is_some_and(|len| len > current.len())
    }
}

impl Default for ChainValidator {
    fn default() -> Self {
        Self::new(crate::miner::DEFAULT_DIFFICULTY, TipPolicy::Strict)
    }
}
