//! Shared command-line plumbing for the spool binaries

use crate::blockchain::{Block, Wallet};
use crate::config::{load_config, Config, DEFAULT_CONFIG_PATH};
use crate::error::{ChainError, Result};
use crate::node::{NodeMode, SharedStatus};
use crate::transaction::{Record, SEPARATOR};
use clap::{Args, Parser};
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Color as TableColor;
use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Table};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber; `RUST_LOG` overrides `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A second install (tests, embedded use) is harmless.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Flags shared by every binary that touches the spool.
#[derive(Debug, Clone, Args)]
pub struct SpoolArgs {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
    /// Spool directory (overrides spool.dir)
    #[arg(long)]
    pub spool: Option<PathBuf>,
}

impl SpoolArgs {
    pub fn load(&self) -> Result<Config> {
        let mut config = load_config(&self.config)?;
        if let Some(dir) = &self.spool {
            config.spool.dir = dir.clone();
        }
        Ok(config)
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about = "Mine on, and gossip through, a shared spool directory")]
pub struct NodeArgs {
    #[command(flatten)]
    pub spool: SpoolArgs,
    /// Node name credited with mining rewards
    #[arg(long)]
    pub name: Option<String>,
    /// Leading zero hex digits required of a block hash
    #[arg(long)]
    pub difficulty: Option<usize>,
    /// Follow the network without mining
    #[arg(long)]
    pub listen: bool,
    /// Also delete spool artifacts after spool.cleanup_delay
    #[arg(long)]
    pub janitor: bool,
    /// Skip proof-of-work checks on the tip block of received chains
    #[arg(long)]
    pub lenient_tip: bool,
}

impl NodeArgs {
    pub fn mode(&self) -> NodeMode {
        if self.listen {
            NodeMode::Listener
        } else {
            NodeMode::Miner
        }
    }

    /// Config file values with command-line overrides applied and re-checked.
    pub fn config(&self) -> Result<Config> {
        let mut config = self.spool.load()?;
        if let Some(name) = &self.name {
            config.node.name = name.clone();
        }
        if let Some(difficulty) = self.difficulty {
            config.mining.difficulty = difficulty;
        }
        if self.lenient_tip {
            config.validation.lenient_tip = true;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about = "Consume artifacts left in the spool directory")]
pub struct JanitorArgs {
    #[command(flatten)]
    pub spool: SpoolArgs,
    /// How long an artifact may stay, e.g. "1s" (overrides spool.cleanup_delay)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub delay: Option<Duration>,
}

impl JanitorArgs {
    pub fn config(&self) -> Result<Config> {
        let mut config = self.spool.load()?;
        if let Some(delay) = self.delay {
            config.spool.cleanup_delay = delay;
        }
        Ok(config)
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about = "Drop a transaction into the spool directory")]
pub struct SendArgs {
    #[command(flatten)]
    pub spool: SpoolArgs,
    /// Paying account
    #[arg(required_unless_present = "raw")]
    pub source: Option<String>,
    #[arg(required_unless_present = "raw")]
    pub amount: Option<u64>,
    /// Receiving account
    #[arg(required_unless_present = "raw")]
    pub target: Option<String>,
    /// Free-form memo
    pub extra: Option<String>,
    /// Send this text verbatim instead of building a record
    #[arg(long, conflicts_with_all = ["source", "amount", "target", "extra"])]
    pub raw: Option<String>,
}

impl SendArgs {
    /// The text to place in the `.transaction` artifact.
    pub fn transaction_text(&self) -> Result<String> {
        if let Some(raw) = &self.raw {
            return Ok(raw.clone());
        }
        let (Some(source), Some(amount), Some(target)) =
            (&self.source, self.amount, &self.target)
        else {
            return Err(ChainError::Config(
                "expected <source> <amount> <target> [extra] or --raw".into(),
            ));
        };
        let extra = self.extra.as_deref().unwrap_or_default();
        for field in [source.as_str(), target.as_str(), extra] {
            if field.contains(SEPARATOR) || field.contains('\n') {
                return Err(ChainError::Config(format!(
                    "field {:?} must not contain '{}' or newlines",
                    field, SEPARATOR
                )));
            }
        }
        if source.is_empty() {
            return Err(ChainError::Config("source must not be empty".into()));
        }
        Ok(Record::transfer(source.as_str(), amount, target.as_str(), extra).to_line())
    }
}

pub fn wallet_table(wallet: &Wallet) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Account")
                .fg(TableColor::Cyan)
                .add_attribute(Attribute::Bold),
            Cell::new("Balance")
                .fg(TableColor::Cyan)
                .add_attribute(Attribute::Bold),
        ]);
    for (account, balance) in wallet {
        let color = if *balance < 0 {
            TableColor::Red
        } else {
            TableColor::White
        };
        table.add_row(vec![
            Cell::new(account).fg(TableColor::White),
            Cell::new(balance)
                .fg(color)
                .set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

pub fn print_wallet(wallet: &Wallet) {
    if wallet.is_empty() {
        println!("{}", "(no balances yet)".dimmed());
    } else {
        println!("{}", wallet_table(wallet));
    }
}

pub fn print_chain(chain: &[Block]) {
    println!("{}", format!("Chain ({} blocks)", chain.len()).bright_cyan().bold());
    for (height, block) in chain.iter().enumerate() {
        println!(
            "{} {} <- {}",
            format!("#{}", height).bright_white(),
            block.hash().green(),
            block.parent_hash().dimmed()
        );
        for line in block.info().lines().filter(|l| !l.trim().is_empty()) {
            println!("    {}", line.yellow());
        }
    }
}

/// Prints the node's status until cancelled. A listener prints its wallet
/// whenever the chain changes; a miner prints a summary every `interval`.
pub async fn report_loop(status: SharedStatus, interval: Duration, cancel: CancellationToken) {
    let mode = status.read().mode;
    let period = match mode {
        NodeMode::Listener => interval.min(Duration::from_millis(250)),
        NodeMode::Miner => interval,
    };
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut last_tip = String::new();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        let snapshot = status.read().clone();
        match mode {
            NodeMode::Listener => {
                if snapshot.tip_hash == last_tip {
                    continue;
                }
                last_tip = snapshot.tip_hash.clone();
                println!(
                    "{} height {} tip {}",
                    "chain changed:".bright_green(),
                    snapshot.height,
                    snapshot.tip_hash
                );
                print_wallet(&snapshot.wallet);
            }
            NodeMode::Miner => {
                println!(
                    "{} height {} | mined {} | adopted {} | rejected {} | pending {}",
                    snapshot.name.bright_magenta().bold(),
                    snapshot.height,
                    snapshot.blocks_mined,
                    snapshot.chains_adopted,
                    snapshot.chains_rejected,
                    snapshot.pending
                );
                print_wallet(&snapshot.wallet);
            }
        }
    }
}
