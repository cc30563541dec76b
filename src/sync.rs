//! Inbound queues between the gossip side and the node loop.
//!
//! The gossip side only ever appends; the node loop is the only reader and
//! the only writer of chain and ledger state.

use crate::blockchain::Block;
use crossbeam_channel::{unbounded, Receiver, Select, Sender};
use std::time::Duration;

/// A full chain received from a peer, tagged with the artifact it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateChain {
    pub source: String,
    pub blocks: Vec<Block>,
}

/// Raw transaction text, tagged with the artifact it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    pub source: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Chain(CandidateChain),
    Transaction { source: String, text: String },
}

/// Append side, cloned into every ingestion task.
#[derive(Debug, Clone)]
pub struct InboundSender {
    chains: Sender<CandidateChain>,
    transactions: Sender<PendingTransaction>,
}

/// Drain side, owned by the node.
#[derive(Debug)]
pub struct InboundQueues {
    chains: Receiver<CandidateChain>,
    transactions: Receiver<PendingTransaction>,
}

pub fn inbound_channel() -> (InboundSender, InboundQueues) {
    let (chain_tx, chain_rx) = unbounded();
    let (tx_tx, tx_rx) = unbounded();
    (
        InboundSender {
            chains: chain_tx,
            transactions: tx_tx,
        },
        InboundQueues {
            chains: chain_rx,
            transactions: tx_rx,
        },
    )
}

impl InboundSender {
    /// Returns false once the node has shut down.
    pub fn submit(&self, inbound: Inbound) -> bool {
        match inbound {
            Inbound::Chain(candidate) => self.chains.send(candidate).is_ok(),
            Inbound::Transaction { source, text } => self
                .transactions
                .send(PendingTransaction { source, text })
                .is_ok(),
        }
    }

    pub fn submit_chain(&self, source: impl Into<String>, blocks: Vec<Block>) -> bool {
        self.submit(Inbound::Chain(CandidateChain {
            source: source.into(),
            blocks,
        }))
    }

    pub fn submit_transaction(&self, source: impl Into<String>, text: impl Into<String>) -> bool {
        self.submit(Inbound::Transaction {
            source: source.into(),
            text: text.into(),
        })
    }
}

impl InboundQueues {
    pub fn drain_chains(&self) -> Vec<CandidateChain> {
        self.chains.try_iter().collect()
    }

    pub fn drain_transactions(&self) -> Vec<PendingTransaction> {
        self.transactions.try_iter().collect()
    }

    pub fn has_pending(&self) -> bool {
        !self.chains.is_empty() || !self.transactions.is_empty()
    }

    /// Block until something is queued or `timeout` passes. Returns whether
    /// anything is waiting.
    pub fn wait(&self, timeout: Duration) -> bool {
        if self.has_pending() {
            return true;
        }
        let mut select = Select::new();
        select.recv(&self.chains);
        select.recv(&self.transactions);
        if select.ready_timeout(timeout).is_err() {
            return false;
        }
        if self.has_pending() {
            return true;
        }
        // Ready without data means every sender is gone.
        std::thread::sleep(timeout);
        false
    }
}
