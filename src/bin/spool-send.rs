#![forbid(unsafe_code)]
//! Drop a transaction into the spool for every node to pick up

use clap::Parser;
use colored::*;
use spoolchain::cli::{init_tracing, SendArgs};
use spoolchain::network::SpoolDir;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = SendArgs::parse();
    init_tracing();

    let config = args.spool.load()?;
    let text = args.transaction_text()?;
    let spool = SpoolDir::open(&config.spool.dir)?;
    let path = spool.write_transaction(&text)?;

    println!("{} {}", "✅ Queued".bright_green().bold(), text.bright_white());
    println!("   {}", path.display().to_string().dimmed());
    Ok(())
}
