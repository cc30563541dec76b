use crate::miner::block_hash;
use serde::{Deserialize, Serialize};

/// Wire form of a block: `[parent_hash, info, filler, hash]`.
type BlockTuple = (String, String, String, String);

pub const GENESIS_PARENT: &str = "Nothing";
pub const GENESIS_INFO: &str = "Am Anfang war das Wort";
pub const GENESIS_FILLER: &str = "0.49688992381305275";
pub const GENESIS_HASH: &str = "00000007ab34dc09d01261286b544cd00ca4639acdfbcd9f16ab6204908f63ab";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BlockTuple", into = "BlockTuple")]
pub struct Block {
    parent_hash: String,
    info: String,
    filler: String,
    hash: String,
}

impl Block {
    /// Build a block and compute its hash. No proof-of-work check happens here.
    pub fn new(parent_hash: impl Into<String>, info: impl Into<String>, filler: impl Into<String>) -> Self {
        let parent_hash = parent_hash.into();
        let info = info.into();
        let filler = filler.into();
        let hash = block_hash(&parent_hash, &info, &filler);
        Block {
            parent_hash,
            info,
            filler,
            hash,
        }
    }

    /// Take a block exactly as claimed by a peer, stored hash included.
    pub fn from_parts(
        parent_hash: impl Into<String>,
        info: impl Into<String>,
        filler: impl Into<String>,
        hash: impl Into<String>,
    ) -> Self {
        Block {
            parent_hash: parent_hash.into(),
            info: info.into(),
            filler: filler.into(),
            hash: hash.into(),
        }
    }

    pub fn genesis() -> Self {
        Block::from_parts(GENESIS_PARENT, GENESIS_INFO, GENESIS_FILLER, GENESIS_HASH)
    }

    pub fn is_genesis(&self) -> bool {
        self.parent_hash == GENESIS_PARENT
            && self.info == GENESIS_INFO
            && self.filler == GENESIS_FILLER
            && self.hash == GENESIS_HASH
    }

    pub fn parent_hash(&self) -> &str {
        &self.parent_hash
    }

    pub fn info(&self) -> &str {
        &self.info
    }

    pub fn filler(&self) -> &str {
        &self.filler
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn recompute_hash(&self) -> String {
        block_hash(&self.parent_hash, &self.info, &self.filler)
    }
}

impl From<BlockTuple> for Block {
    fn from((parent_hash, info, filler, hash): BlockTuple) -> Self {
        Block::from_parts(parent_hash, info, filler, hash)
    }
}

impl From<Block> for BlockTuple {
    fn from(block: Block) -> Self {
        (block.parent_hash, block.info, block.filler, block.hash)
    }
}

/// Number of leading `'0'` hex digits in a digest.
pub fn leading_zeros(hash: &str) -> usize {
    hash.chars().take_while(|c| *c == '0').count()
}

/// The node's own chain. Always starts with the genesis block; only ever
/// extended by one locally mined block or replaced wholesale by an adopted
/// candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blockchain {
    blocks: Vec<Block>,
}

impl Blockchain {
    pub fn new() -> Self {
        Blockchain {
            blocks: vec![Block::genesis()],
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Never true: genesis is always present.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn tip(&self) -> &Block {
        // `blocks` is non-empty by construction.
        &self.blocks[self.blocks.len() - 1]
    }

    /// Append a block mined on top of the current tip.
    pub(crate) fn push(&mut self, block: Block) {
        debug_assert_eq!(block.parent_hash(), self.tip().hash());
        self.blocks.push(block);
    }

    /// Swap in a candidate that already passed validation.
    pub(crate) fn replace(&mut self, blocks: Vec<Block>) {
        debug_assert!(blocks.first().is_some_and(Block::is_genesis));
        self.blocks = blocks;
    }

    pub fn to_vec(&self) -> Vec<Block> {
        self.blocks.clone()
    }
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}
