//! Gossip through a shared spool directory.
//!
//! Peers never talk to each other directly. A node that mines a block drops
//! its whole chain into the spool as `<tip hash>.block`; anyone may drop a
//! `<name>.transaction` file holding raw record text. Every node watches the
//! spool, and a janitor deletes artifacts shortly after they appear.
//!
//! - [`spool`] - reading and writing artifacts
//! - [`watcher`] - polling the spool and feeding the node's inbound queues
//! - [`janitor`] - consuming (deleting) artifacts after a delay

pub mod janitor;
pub mod spool;
pub mod watcher;

use crate::blockchain::Block;
use crate::error::{ChainError, Result};

pub use janitor::Janitor;
pub use spool::SpoolDir;
pub use watcher::SpoolWatcher;

pub const BLOCK_SUFFIX: &str = ".block";
pub const TRANSACTION_SUFFIX: &str = ".transaction";

/// Outbound half of gossip, as seen by the node loop.
pub trait GossipPort: Send {
    /// Announce the full chain after a local block was mined.
    fn publish_chain(&mut self, chain: &[Block]) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Block,
    Transaction,
}

impl ArtifactKind {
    /// Classify by file name; hidden files and unknown suffixes are ignored.
    pub fn from_name(name: &str) -> Option<Self> {
        if name.starts_with('.') {
            None
        } else if name.ends_with(BLOCK_SUFFIX) {
            Some(ArtifactKind::Block)
        } else if name.ends_with(TRANSACTION_SUFFIX) {
            Some(ArtifactKind::Transaction)
        } else {
            None
        }
    }
}

pub fn block_artifact_name(tip_hash: &str) -> String {
    format!("{}{}", tip_hash, BLOCK_SUFFIX)
}

pub fn encode_chain(chain: &[Block]) -> Result<String> {
    Ok(serde_json::to_string(chain)?)
}

pub fn decode_chain(name: &str, bytes: &[u8]) -> Result<Vec<Block>> {
    serde_json::from_slice(bytes).map_err(|e| ChainError::malformed(name, e))
}

pub fn decode_transaction(name: &str, bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| ChainError::malformed(name, e))
}
