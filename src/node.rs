//! The node loop: the single owner of chain, ledger and pending transactions.
//!
//! Ingestion tasks only append to the inbound queues. Everything that
//! mutates chain or ledger state happens on the thread running
//! [`Node::run`], so a chain replacement and the ledger recomputation that
//! follows it are never observed apart.

use crate::blockchain::{Block, Blockchain, ChainValidator, LedgerRules, LedgerState, TipPolicy, Wallet};
use crate::config::Config;
use crate::mempool::Mempool;
use crate::miner::{random_filler, Miner};
use crate::network::GossipPort;
use crate::sync::{CandidateChain, InboundQueues};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Mining,
    /// Bookkeeping right after a chain change; never a waiting point.
    Reconciling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeMode {
    Miner,
    /// Follows the network without mining.
    Listener,
}

#[derive(Debug, Clone)]
pub struct NodeOptions {
    pub name: String,
    pub mode: NodeMode,
    pub difficulty: usize,
    pub batch_size: usize,
    pub idle_interval: Duration,
    pub tip_policy: TipPolicy,
    pub rules: LedgerRules,
}

impl NodeOptions {
    pub fn from_config(config: &Config, mode: NodeMode) -> Self {
        NodeOptions {
            name: config.node.name.clone(),
            mode,
            difficulty: config.mining.difficulty,
            batch_size: config.mining.batch_size,
            idle_interval: config.mining.idle_interval,
            tip_policy: if config.validation.lenient_tip {
                TipPolicy::Lenient
            } else {
                TipPolicy::Strict
            },
            rules: LedgerRules {
                reward: config.mining.reward,
                one_reward_per_block: config.ledger.one_reward_per_block,
            },
        }
    }
}

/// Read-only view of the node for status reporting.
#[derive(Debug, Clone)]
pub struct NodeStatus {
    pub name: String,
    pub mode: NodeMode,
    pub state: NodeState,
    pub height: usize,
    pub tip_hash: String,
    pub wallet: Wallet,
    pub pending: usize,
    pub blocks_mined: u64,
    pub chains_adopted: u64,
    pub chains_rejected: u64,
    pub last_change: Option<DateTime<Utc>>,
}

pub type SharedStatus = Arc<RwLock<NodeStatus>>;

/// What happened to one inbound candidate chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Adopted,
    NotLonger,
    Invalid,
}

pub struct Node<G: GossipPort> {
    options: NodeOptions,
    miner: Miner,
    validator: ChainValidator,
    chain: Blockchain,
    ledger: LedgerState,
    mempool: Mempool,
    inbound: InboundQueues,
    gossip: G,
    state: NodeState,
    status: SharedStatus,
}

impl<G: GossipPort> Node<G> {
    pub fn new(options: NodeOptions, inbound: InboundQueues, gossip: G) -> Self {
        let chain = Blockchain::new();
        let ledger = LedgerState::recompute(chain.blocks(), &options.rules);
        let status = Arc::new(RwLock::new(NodeStatus {
            name: options.name.clone(),
            mode: options.mode,
            state: NodeState::Mining,
            height: chain.len(),
            tip_hash: chain.tip().hash().to_string(),
            wallet: ledger.wallet.clone(),
            pending: 0,
            blocks_mined: 0,
            chains_adopted: 0,
            chains_rejected: 0,
            last_change: None,
        }));
        Node {
            miner: Miner::new(options.difficulty),
            validator: ChainValidator::new(options.difficulty, options.tip_policy),
            options,
            chain,
            ledger,
            mempool: Mempool::new(),
            inbound,
            gossip,
            state: NodeState::Mining,
            status,
        }
    }

    pub fn status_handle(&self) -> SharedStatus {
        Arc::clone(&self.status)
    }

    pub fn name(&self) -> &str {
        &self.options.name
    }

    pub fn chain(&self) -> &Blockchain {
        &self.chain
    }

    pub fn ledger(&self) -> &LedgerState {
        &self.ledger
    }

    pub fn mempool(&self) -> &Mempool {
        &self.mempool
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn gossip(&self) -> &G {
        &self.gossip
    }

    /// Step 1 of the loop: take in queued transactions, then drain and judge
    /// every queued candidate chain. Returns whether the chain changed.
    pub fn reconcile(&mut self) -> bool {
        for pending in self.inbound.drain_transactions() {
            debug!(
                artifact = %pending.source,
                pending = self.mempool.len() + 1,
                "queued transaction"
            );
            self.mempool.push(pending.text);
        }

        let mut changed = false;
        for candidate in self.inbound.drain_chains() {
            changed |= self.consider(candidate) == Verdict::Adopted;
        }
        self.publish_status();
        changed
    }

    /// Fork choice for one candidate; adopts it when strictly longer and valid.
    pub fn consider(&mut self, candidate: CandidateChain) -> Verdict {
        let CandidateChain { source, blocks } = candidate;
        let length = match self.validator.check_chain(&blocks) {
            Ok(length) => length,
            Err(e) => {
                warn!(artifact = %source, reason = %e, "rejecting invalid chain");
                self.status.write().chains_rejected += 1;
                return Verdict::Invalid;
            }
        };
        if length <= self.chain.len() {
            debug!(
                artifact = %source,
                candidate = length,
                local = self.chain.len(),
                "keeping local chain"
            );
            return Verdict::NotLonger;
        }

        self.state = NodeState::Reconciling;
        self.chain.replace(blocks);
        self.recompute();
        let dropped = self.mempool.remove_committed(self.chain.blocks());
        info!(
            artifact = %source,
            height = self.chain.len(),
            tip = %self.chain.tip().hash(),
            dropped_pending = dropped,
            "adopted longer chain"
        );
        {
            let mut status = self.status.write();
            status.chains_adopted += 1;
            status.last_change = Some(Utc::now());
        }
        self.state = NodeState::Mining;
        Verdict::Adopted
    }

    /// Step 2: pending head (if any) followed by a fresh self-reward record.
    pub fn mining_payload(&self) -> (String, bool) {
        let reward = format!(
            "\n>{}>{}>{}\n",
            self.options.rules.reward,
            self.options.name,
            random_filler()
        );
        match self.mempool.head() {
            Some(pending) => (format!("{}{}", pending, reward), true),
            None => (reward, false),
        }
    }

    /// Step 3: one batch of attempts on the current tip. On success the block
    /// is appended, the ledger rebuilt and the chain published.
    pub fn mine_batch(&mut self) -> Option<Block> {
        let (payload, uses_pending) = self.mining_payload();
        let block = self.miner.attempt_batch(
            self.chain.tip().hash(),
            &payload,
            self.options.batch_size,
        )?;
        self.accept_mined(block.clone(), uses_pending);
        Some(block)
    }

    fn accept_mined(&mut self, block: Block, uses_pending: bool) {
        info!(hash = %block.hash(), height = self.chain.len() + 1, "found a block");
        self.state = NodeState::Reconciling;
        self.chain.push(block);
        self.recompute();
        if uses_pending {
            self.mempool.pop_head();
        }
        if let Err(e) = self.gossip.publish_chain(self.chain.blocks()) {
            warn!(error = %e, "failed to publish chain; next block will carry it");
        }
        {
            let mut status = self.status.write();
            status.blocks_mined += 1;
            status.last_change = Some(Utc::now());
        }
        self.state = NodeState::Mining;
        self.publish_status();
    }

    fn recompute(&mut self) {
        self.ledger = LedgerState::recompute(self.chain.blocks(), &self.options.rules);
        debug!(
            applied = self.ledger.applied,
            skipped = self.ledger.skipped.total(),
            accounts = self.ledger.wallet.len(),
            "ledger rebuilt"
        );
    }

    fn publish_status(&self) {
        let mut status = self.status.write();
        status.state = self.state;
        status.height = self.chain.len();
        status.tip_hash = self.chain.tip().hash().to_string();
        status.wallet = self.ledger.wallet.clone();
        status.pending = self.mempool.len();
    }

    /// Run until `cancel` fires; hands back the final chain.
    pub fn run(mut self, cancel: &CancellationToken) -> Blockchain {
        info!(
            name = %self.options.name,
            mode = ?self.options.mode,
            difficulty = self.miner.difficulty(),
            "node started"
        );
        while !cancel.is_cancelled() {
            self.reconcile();
            match self.options.mode {
                NodeMode::Miner => {
                    self.mine_batch();
                }
                NodeMode::Listener => {
                    self.inbound.wait(self.options.idle_interval);
                }
            }
        }
        info!(height = self.chain.len(), "node stopped");
        self.chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::sync::{inbound_channel, InboundSender};

    #[derive(Default)]
    struct Recorder {
        published: Vec<Vec<Block>>,
    }

    impl GossipPort for Recorder {
        fn publish_chain(&mut self, chain: &[Block]) -> Result<()> {
            self.published.push(chain.to_vec());
            Ok(())
        }
    }

    fn options(name: &str) -> NodeOptions {
        NodeOptions {
            name: name.to_string(),
            mode: NodeMode::Miner,
            difficulty: 1,
            batch_size: 64,
            idle_interval: Duration::from_millis(10),
            tip_policy: TipPolicy::Strict,
            rules: LedgerRules::default(),
        }
    }

    fn node(name: &str) -> (InboundSender, Node<Recorder>) {
        let (sender, queues) = inbound_channel();
        (sender, Node::new(options(name), queues, Recorder::default()))
    }

    fn mine_one(node: &mut Node<Recorder>) -> Block {
        loop {
            if let Some(block) = node.mine_batch() {
                return block;
            }
        }
    }

    #[test]
    fn test_payload_without_pending_is_reward_only() {
        let (_sender, node) = node("alice");
        let (payload, uses_pending) = node.mining_payload();
        assert!(!uses_pending);
        assert!(payload.starts_with("\n>10>alice>"));
        assert!(payload.ends_with('\n'));
    }

    #[test]
    fn test_payload_embeds_pending_head() {
        let (sender, mut node) = node("alice");
        sender.submit_transaction("local.transaction", "alice>3>bob>gift");
        sender.submit_transaction("local.transaction", "alice>1>carol>later");
        node.reconcile();

        let (payload, uses_pending) = node.mining_payload();
        assert!(uses_pending);
        assert!(payload.starts_with("alice>3>bob>gift\n>10>alice>"));
        assert!(!payload.contains("carol"));
    }

    #[test]
    fn test_mining_extends_credits_and_publishes() {
        let (_sender, mut node) = node("alice");
        let block = mine_one(&mut node);

        assert_eq!(node.chain().len(), 2);
        assert_eq!(block.parent_hash(), Block::genesis().hash());
        assert_eq!(node.ledger().balance("alice"), 10);
        assert_eq!(node.gossip().published.len(), 1);
        assert_eq!(node.gossip().published[0], node.chain().to_vec());

        let status = node.status_handle().read().clone();
        assert_eq!(status.height, 2);
        assert_eq!(status.blocks_mined, 1);
        assert_eq!(status.wallet.get("alice"), Some(&10));
    }

    #[test]
    fn test_mined_pending_transaction_is_popped() {
        let (sender, mut node) = node("alice");
        mine_one(&mut node);
        sender.submit_transaction("local.transaction", "alice>4>bob>gift");
        node.reconcile();

        let block = mine_one(&mut node);
        assert!(block.info().starts_with("alice>4>bob>gift"));
        assert!(node.mempool().is_empty());
        assert_eq!(node.ledger().balance("alice"), 16);
        assert_eq!(node.ledger().balance("bob"), 4);
    }

    #[test]
    fn test_longer_chain_adopted_and_ledger_rebuilt() {
        let (_bob_sender, mut bob) = node("bob");
        mine_one(&mut bob);
        mine_one(&mut bob);
        let remote = bob.chain().to_vec();

        let (sender, mut alice) = node("alice");
        mine_one(&mut alice);
        assert_eq!(alice.ledger().balance("alice"), 10);

        sender.submit_chain("bob.block", remote.clone());
        assert!(alice.reconcile());
        assert_eq!(alice.chain().to_vec(), remote);
        assert_eq!(alice.ledger().balance("alice"), 0);
        assert_eq!(alice.ledger().balance("bob"), 20);
        assert_eq!(alice.state(), NodeState::Mining);
    }

    #[test]
    fn test_equal_or_invalid_chain_kept_out() {
        let (_bob_sender, mut bob) = node("bob");
        mine_one(&mut bob);
        let same_length = bob.chain().to_vec();

        let (sender, mut alice) = node("alice");
        mine_one(&mut alice);
        let local = alice.chain().to_vec();

        let mut forged = local.clone();
        forged.push(Block::from_parts(local[1].hash(), ">10>eve>x", "0.1", "0".repeat(64)));

        sender.submit_chain("tie.block", same_length);
        sender.submit_chain("forged.block", forged);
        assert!(!alice.reconcile());
        assert_eq!(alice.chain().to_vec(), local);

        let status = alice.status_handle().read().clone();
        assert_eq!(status.chains_rejected, 1);
        assert_eq!(status.chains_adopted, 0);
    }

    #[test]
    fn test_adoption_drops_committed_pending() {
        let (bob_sender, mut bob) = node("bob");
        mine_one(&mut bob);
        bob_sender.submit_transaction("local.transaction", "bob>2>carol>memo");
        bob.reconcile();
        mine_one(&mut bob);
        let remote = bob.chain().to_vec();

        let (sender, mut alice) = node("alice");
        sender.submit_transaction("local.transaction", "bob>2>carol>memo");
        sender.submit_transaction("local.transaction", "alice>1>dave>other");
        alice.reconcile();
        assert_eq!(alice.mempool().len(), 2);

        sender.submit_chain("bob.block", remote);
        alice.reconcile();
        assert_eq!(alice.mempool().iter().collect::<Vec<_>>(), vec!["alice>1>dave>other"]);
        assert_eq!(alice.ledger().balance("carol"), 2);
    }

    #[test]
    fn test_run_stops_on_cancel() {
        let (_sender, node) = node("alice");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let chain = node.run(&cancel);
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_listener_never_mines() {
        let (sender, queues) = inbound_channel();
        let mut opts = options("listener");
        opts.mode = NodeMode::Listener;
        let node = Node::new(opts, queues, Recorder::default());

        let (_bob_sender, mut bob) = self::node("bob");
        mine_one(&mut bob);
        sender.submit_chain("bob.block", bob.chain().to_vec());

        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        let handle = std::thread::spawn(move || node.run(&cancel));
        std::thread::sleep(Duration::from_millis(100));
        stopper.cancel();

        let chain = handle.join().unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.tip(), bob.chain().tip());
    }
}
