//! Integration tests for the node loop: mining, fork choice and mempool upkeep

use spoolchain::blockchain::{Block, ChainValidator, LedgerRules, TipPolicy};
use spoolchain::error::Result;
use spoolchain::miner::Miner;
use spoolchain::network::GossipPort;
use spoolchain::node::{Node, NodeMode, NodeOptions, NodeState, Verdict};
use spoolchain::sync::{inbound_channel, CandidateChain, InboundSender};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Gossip port that remembers every published chain.
#[derive(Clone, Default)]
struct RecordingGossip {
    published: Arc<Mutex<Vec<Vec<Block>>>>,
}

impl RecordingGossip {
    fn count(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    fn last(&self) -> Option<Vec<Block>> {
        self.published.lock().unwrap().last().cloned()
    }
}

impl GossipPort for RecordingGossip {
    fn publish_chain(&mut self, chain: &[Block]) -> Result<()> {
        self.published.lock().unwrap().push(chain.to_vec());
        Ok(())
    }
}

fn options(name: &str, mode: NodeMode) -> NodeOptions {
    NodeOptions {
        name: name.to_string(),
        mode,
        difficulty: 1,
        batch_size: 32,
        idle_interval: Duration::from_millis(10),
        tip_policy: TipPolicy::Strict,
        rules: LedgerRules::default(),
    }
}

fn spawn_node(name: &str) -> (InboundSender, RecordingGossip, Node<RecordingGossip>) {
    let (sender, queues) = inbound_channel();
    let gossip = RecordingGossip::default();
    let node = Node::new(options(name, NodeMode::Miner), queues, gossip.clone());
    (sender, gossip, node)
}

/// Build a chain by mining one block per payload on top of Genesis.
fn mine_chain(payloads: &[&str]) -> Vec<Block> {
    let miner = Miner::new(1);
    let cancel = CancellationToken::new();
    let mut chain = vec![Block::genesis()];
    for payload in payloads {
        let parent = chain.last().unwrap().hash().to_string();
        let block = miner.mine_until_found(&parent, payload, 64, &cancel).unwrap();
        chain.push(block);
    }
    chain
}

fn mine_until_height(node: &mut Node<RecordingGossip>, height: usize) {
    while node.chain().len() < height {
        node.mine_batch();
    }
}

#[test]
fn test_adopts_longer_valid_chain() {
    let (sender, _gossip, mut node) = spawn_node("alice");
    mine_until_height(&mut node, 2);

    let candidate = mine_chain(&["\n>10>bob>0.1\n", "\n>10>bob>0.2\n"]);
    assert!(ChainValidator::new(1, TipPolicy::Strict).is_valid_chain(&candidate).is_some());

    sender.submit_chain("bob.block", candidate.clone());
    assert!(node.reconcile());

    assert_eq!(node.chain().to_vec(), candidate);
    assert_eq!(node.ledger().balance("bob"), 20);
    assert_eq!(node.ledger().balance("alice"), 0);
}

#[test]
fn test_rejects_candidates_that_are_not_strictly_better() {
    let (_sender, _gossip, mut node) = spawn_node("alice");
    mine_until_height(&mut node, 3);
    let local = node.chain().to_vec();

    let shorter = mine_chain(&["\n>10>bob>0.1\n"]);
    let tied = mine_chain(&["\n>10>bob>0.1\n", "\n>10>bob>0.2\n"]);
    let mut broken = mine_chain(&["\n>10>eve>0.1\n", "\n>10>eve>0.2\n", "\n>10>eve>0.3\n"]);
    broken.remove(2);
    let wrong_genesis = {
        let mut chain = mine_chain(&["\n>10>eve>0.1\n", "\n>10>eve>0.2\n", "\n>10>eve>0.3\n"]);
        chain[0] = Block::from_parts("Nothing", "Other", "0.1", chain[0].hash());
        chain
    };

    for (source, blocks) in [
        ("shorter", shorter),
        ("tied", tied),
        ("broken", broken),
        ("wrong-genesis", wrong_genesis),
    ] {
        let verdict = node.consider(CandidateChain {
            source: source.to_string(),
            blocks,
        });
        assert_ne!(verdict, Verdict::Adopted, "{} was adopted", source);
    }
    assert_eq!(node.chain().to_vec(), local);
}

#[test]
fn test_mined_blocks_are_published_whole() {
    let (_sender, gossip, mut node) = spawn_node("alice");
    mine_until_height(&mut node, 3);

    assert_eq!(gossip.count(), 2);
    let published = gossip.last().unwrap();
    assert_eq!(published, node.chain().to_vec());
    assert_eq!(published[0], Block::genesis());
    assert_eq!(node.ledger().balance("alice"), 20);
}

#[test]
fn test_pending_transactions_mined_in_order() {
    let (sender, _gossip, mut node) = spawn_node("alice");
    mine_until_height(&mut node, 2);
    sender.submit_transaction("local.transaction", "alice>3>bob>first");
    sender.submit_transaction("local.transaction", "alice>2>carol>second");
    node.reconcile();
    assert_eq!(node.mempool().len(), 2);

    mine_until_height(&mut node, 3);
    assert!(node.chain().tip().info().starts_with("alice>3>bob>first\n"));
    assert_eq!(node.mempool().head(), Some("alice>2>carol>second"));

    mine_until_height(&mut node, 4);
    assert!(node.mempool().is_empty());
    assert_eq!(node.ledger().balance("alice"), 25);
    assert_eq!(node.ledger().balance("bob"), 3);
    assert_eq!(node.ledger().balance("carol"), 2);
}

#[test]
fn test_unfunded_pending_transaction_is_mined_but_not_applied() {
    let (sender, _gossip, mut node) = spawn_node("alice");
    sender.submit_transaction("local.transaction", "mallory>50>alice>free money");
    node.reconcile();

    mine_until_height(&mut node, 2);
    assert!(node.chain().tip().info().contains("mallory>50>alice"));
    assert_eq!(node.ledger().balance("alice"), 10);
    assert_eq!(node.ledger().balance("mallory"), 0);
}

#[test]
fn test_adoption_drops_pending_already_in_chain() {
    let (sender, _gossip, mut node) = spawn_node("alice");
    sender.submit_transaction("local.transaction", "bob>4>carol>memo");
    sender.submit_transaction("local.transaction", "  bob>1>dave>unrelated  ");
    node.reconcile();

    let candidate = mine_chain(&["\n>10>bob>0.1\n", "bob>4>carol>memo\n>10>bob>0.2\n"]);
    sender.submit_chain("bob.block", candidate);
    node.reconcile();

    assert_eq!(node.mempool().len(), 1);
    assert_eq!(node.mempool().head(), Some("  bob>1>dave>unrelated  "));
    assert_eq!(node.ledger().balance("carol"), 4);
    assert_eq!(node.state(), NodeState::Mining);
}

#[test]
fn test_status_snapshot_tracks_node() {
    let (sender, _gossip, mut node) = spawn_node("alice");
    let status = node.status_handle();
    mine_until_height(&mut node, 2);
    sender.submit_transaction("local.transaction", "alice>1>bob>x");
    node.reconcile();

    let snapshot = status.read().clone();
    assert_eq!(snapshot.name, "alice");
    assert_eq!(snapshot.height, 2);
    assert_eq!(snapshot.tip_hash, node.chain().tip().hash());
    assert_eq!(snapshot.pending, 1);
    assert_eq!(snapshot.blocks_mined, 1);
    assert!(snapshot.last_change.is_some());
}

#[tokio::test]
async fn test_run_until_cancelled_returns_chain() {
    tokio::time::timeout(Duration::from_secs(10), async {
        let (_sender, gossip, node) = spawn_node("alice");
        let status = node.status_handle();
        let cancel = CancellationToken::new();
        let node_cancel = cancel.clone();
        let handle = tokio::task::spawn_blocking(move || node.run(&node_cancel));

        while status.read().height < 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        cancel.cancel();

        let chain = handle.await.unwrap();
        assert!(chain.len() >= 3);
        assert_eq!(gossip.last().unwrap().len(), chain.len());
    })
    .await
    .expect("test_run_until_cancelled_returns_chain timed out");
}

#[tokio::test]
async fn test_listener_follows_without_mining() {
    tokio::time::timeout(Duration::from_secs(10), async {
        let (sender, queues) = inbound_channel();
        let gossip = RecordingGossip::default();
        let node = Node::new(options("watcher", NodeMode::Listener), queues, gossip.clone());
        let status = node.status_handle();
        let cancel = CancellationToken::new();
        let node_cancel = cancel.clone();
        let handle = tokio::task::spawn_blocking(move || node.run(&node_cancel));

        let candidate = mine_chain(&["\n>10>bob>0.1\n"]);
        sender.submit_chain("bob.block", candidate.clone());
        while status.read().height < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(status.read().wallet.get("bob"), Some(&10));

        cancel.cancel();
        let chain = handle.await.unwrap();
        assert_eq!(chain.to_vec(), candidate);
        assert_eq!(gossip.count(), 0);
    })
    .await
    .expect("test_listener_follows_without_mining timed out");
}
