#![forbid(unsafe_code)]
//! Standalone consumer for the spool directory

use clap::Parser;
use spoolchain::cli::{init_tracing, JanitorArgs};
use spoolchain::network::{Janitor, SpoolDir};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = JanitorArgs::parse();
    init_tracing();

    let config = args.config()?;
    let spool = SpoolDir::open(&config.spool.dir)?;
    let cancel = CancellationToken::new();

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, shutting down");
        }
        interrupt.cancel();
    });

    Janitor::new(spool, config.spool.cleanup_delay)
        .run(cancel)
        .await;
    Ok(())
}
