#![forbid(unsafe_code)]
//! Spool node: mines (or listens) and gossips through the spool directory

use clap::Parser;
use colored::*;
use spoolchain::cli::{init_tracing, print_chain, print_wallet, report_loop, NodeArgs};
use spoolchain::network::{Janitor, SpoolDir, SpoolWatcher};
use spoolchain::node::{Node, NodeOptions};
use spoolchain::sync::inbound_channel;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = NodeArgs::parse();
    init_tracing();

    let config = args.config()?;
    let spool = SpoolDir::open(&config.spool.dir).inspect_err(|e| {
        error!(error = %e, "cannot start without a spool directory");
    })?;

    let cancel = CancellationToken::new();
    let (sender, queues) = inbound_channel();

    let mut watcher = SpoolWatcher::new(spool.clone(), config.spool.poll_interval);
    let skipped = watcher.prime()?;
    info!(skipped, "ignoring artifacts already in the spool");
    let watcher_task = tokio::spawn(watcher.run(sender, cancel.clone()));

    let janitor_task = args.janitor.then(|| {
        let janitor = Janitor::new(spool.clone(), config.spool.cleanup_delay);
        tokio::spawn(janitor.run(cancel.clone()))
    });

    let node = Node::new(NodeOptions::from_config(&config, args.mode()), queues, spool);
    let reporter_task = tokio::spawn(report_loop(
        node.status_handle(),
        config.status.interval,
        cancel.clone(),
    ));
    let status = node.status_handle();

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, shutting down");
        }
        interrupt.cancel();
    });

    let node_cancel = cancel.clone();
    let chain = tokio::task::spawn_blocking(move || node.run(&node_cancel)).await?;
    cancel.cancel();

    watcher_task.await?;
    if let Some(task) = janitor_task {
        task.await?;
    }
    reporter_task.await?;

    println!();
    print_chain(chain.blocks());
    println!();
    println!("{}", "Final wallet".bright_green().underline());
    print_wallet(&status.read().wallet);
    Ok(())
}
