#![forbid(unsafe_code)]

use colored::*;

fn main() {
    println!("{}", "Spoolchain CLI".bright_cyan().bold());
    println!("{}", "--------------".bright_cyan());
    println!();
    println!(
        "{}",
        "This is the main entry point, but all functionality is in separate binaries.".yellow()
    );
    println!(
        "{}",
        "Use 'cargo run --bin <binary_name>' to run a specific command.".yellow()
    );
    println!();
    println!("{}", "Available binaries:".bright_green().underline());
    println!(
        "  - {}  {}",
        "spool-node".bright_white(),
        "mine and gossip (--listen to only follow)".dimmed()
    );
    println!(
        "  - {}  {}",
        "spool-janitor".bright_white(),
        "delete artifacts after spool.cleanup_delay".dimmed()
    );
    println!(
        "  - {}  {}",
        "spool-send".bright_white(),
        "queue a transaction: <source> <amount> <target> [extra]".dimmed()
    );
    println!();
    println!("{}", "Example:".bright_green().underline());
    println!(
        "{}",
        "  cargo run --bin spool-node -- --spool /tmp/spool --difficulty 4".italic()
    );
}
