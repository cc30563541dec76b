//! Spoolchain - a toy proof-of-work ledger whose nodes gossip through a
//! shared spool directory
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Blockchain
//! - [`blockchain`] - Blocks, chain validation and ledger replay
//! - [`transaction`] - `source>amount>target>extra` records
//! - [`mempool`] - Pending transaction queue
//!
//! ## Consensus & Mining
//! - [`miner`] - Proof-of-work puzzle
//!
//! ## Networking & Integration
//! - [`network`] - Spool gossip (artifacts, watcher, janitor)
//! - [`sync`] - Inbound queues between gossip and the node
//! - [`node`] - The node loop
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//! - [`cli`] - CLI utilities

#![forbid(unsafe_code)]

// ============================================================================
// Core Blockchain
// ============================================================================
pub mod blockchain;
pub mod mempool;
pub mod transaction;

// ============================================================================
// Consensus & Mining
// ============================================================================
pub mod miner;

// ============================================================================
// Networking & Integration
// ============================================================================
pub mod network;
pub mod node;
pub mod sync;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod cli;
pub mod config;
pub mod error;
