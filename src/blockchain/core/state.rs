use crate::transaction::{parse_lines, Fingerprint, Line, Record};
use std::collections::{BTreeMap, HashSet};
use tracing::trace;

use super::chain::Block;

pub const DEFAULT_REWARD: u64 = 10;

/// Account name to balance. Ordered so reports print deterministically.
pub type Wallet = BTreeMap<String, i64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerRules {
    pub reward: u64,
    /// Accept at most one reward record per block.
    pub one_reward_per_block: bool,
}

impl Default for LedgerRules {
    fn default() -> Self {
        LedgerRules {
            reward: DEFAULT_REWARD,
            one_reward_per_block: false,
        }
    }
}

/// Why a record was not applied during replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    MalformedRecord,
    InvalidReward,
    ExtraReward,
    InsufficientFunds,
    DuplicateTransaction,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipCounts {
    pub malformed: usize,
    pub invalid_reward: usize,
    pub extra_reward: usize,
    pub insufficient_funds: usize,
    pub duplicate: usize,
}

impl SkipCounts {
    fn record(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::MalformedRecord => self.malformed += 1,
            SkipReason::InvalidReward => self.invalid_reward += 1,
            SkipReason::ExtraReward => self.extra_reward += 1,
            SkipReason::InsufficientFunds => self.insufficient_funds += 1,
            SkipReason::DuplicateTransaction => self.duplicate += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.malformed + self.invalid_reward + self.extra_reward + self.insufficient_funds + self.duplicate
    }
}

/// Balances derived from a chain. Never persisted; rebuilt on every chain
/// change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerState {
    pub wallet: Wallet,
    pub fingerprints: HashSet<Fingerprint>,
    pub applied: usize,
    pub skipped: SkipCounts,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, account: &str) -> i64 {
        self.wallet.get(account).copied().unwrap_or(0)
    }

    /// Replay every record of every block, in order, from an empty wallet.
    pub fn recompute(chain: &[Block], rules: &LedgerRules) -> Self {
        let mut state = LedgerState::new();
        for block in chain {
            state.apply_block(block, rules);
        }
        state
    }

    fn apply_block(&mut self, block: &Block, rules: &LedgerRules) {
        let mut rewarded = false;
        for line in parse_lines(block.info()) {
            let record = match line {
                Line::Blank => continue,
                Line::Malformed(raw) => {
                    trace!(line = raw, "skipping malformed record");
                    self.skipped.record(SkipReason::MalformedRecord);
                    continue;
                }
                Line::Record(record) => record,
            };

            match self.apply_record(&record, rules, rewarded) {
                Ok(()) => {
                    rewarded |= record.is_reward();
                    self.applied += 1;
                }
                Err(reason) => {
                    trace!(record = %record, ?reason, "record not applied");
                    self.skipped.record(reason);
                }
            }
        }
    }

    /// Validate against the running wallet, then apply. Balance checks use
    /// the state accumulated so far in this replay, not a per-block snapshot.
    pub fn apply_record(
        &mut self,
        record: &Record,
        rules: &LedgerRules,
        block_already_rewarded: bool,
    ) -> Result<(), SkipReason> {
        if record.is_reward() {
            if record.amount != rules.reward {
                return Err(SkipReason::InvalidReward);
            }
            if rules.one_reward_per_block && block_already_rewarded {
                return Err(SkipReason::ExtraReward);
            }
        }
        // No balance can exceed i64::MAX, so such an amount is never funded.
        let amount = i64::try_from(record.amount).map_err(|_| SkipReason::InsufficientFunds)?;
        if !record.is_reward() && self.balance(&record.source) < amount {
            return Err(SkipReason::InsufficientFunds);
        }

        if !self.fingerprints.insert(record.fingerprint()) {
            return Err(SkipReason::DuplicateTransaction);
        }

        if !record.is_reward() {
            let source = self.wallet.entry(record.source.clone()).or_insert(0);
            *source -= amount;
        }
        let target = self.wallet.entry(record.target.clone()).or_insert(0);
        *target = target.saturating_add(amount);
        Ok(())
    }
}
