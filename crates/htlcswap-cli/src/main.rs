//! swapctl: command-line client for an htlcswap node.
//!
//! Subcommands: status, balances, list, show, create, accept, lock-initiator,
//! lock-acceptor, claim-initiator, claim-acceptor, cancel, refund.

mod client;
mod commands;

use clap::{Parser, Subcommand};

/// swapctl: drive HTLC atomic swaps on an htlcswap node.
#[derive(Parser, Debug)]
#[command(name = "swapctl", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Query the status of a running node.
    Status(commands::status::StatusArgs),
    /// Show the node's ledger balances per asset.
    Balances(commands::status::StatusArgs),
    /// List swap offers.
    List(commands::offers::ListArgs),
    /// Show one swap offer.
    Show(commands::offers::SwapArgs),
    /// Publish a new swap offer as the initiator.
    Create(commands::offers::CreateArgs),
    /// Accept an open offer as the counterparty.
    Accept(commands::offers::AcceptArgs),
    /// Lock the initiator's leg.
    LockInitiator(commands::offers::SwapArgs),
    /// Lock the acceptor's leg.
    LockAcceptor(commands::offers::SwapArgs),
    /// Claim the acceptor's leg, revealing the secret.
    ClaimInitiator(commands::offers::SwapArgs),
    /// Claim the initiator's leg with the revealed secret.
    ClaimAcceptor(commands::offers::ClaimAcceptorArgs),
    /// Cancel an offer nobody has accepted.
    Cancel(commands::offers::CancelArgs),
    /// Refund locked legs after the timelock.
    Refund(commands::offers::SwapArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Status(args) => commands::status::run(args).await,
        Commands::Balances(args) => commands::status::run_balances(args).await,
        Commands::List(args) => commands::offers::list(args).await,
        Commands::Show(args) => commands::offers::show(args).await,
        Commands::Create(args) => commands::offers::create(args).await,
        Commands::Accept(args) => commands::offers::accept(args).await,
        Commands::LockInitiator(args) => commands::offers::step(args, "lock-initiator").await,
        Commands::LockAcceptor(args) => commands::offers::step(args, "lock-acceptor").await,
        Commands::ClaimInitiator(args) => commands::offers::claim_initiator(args).await,
        Commands::ClaimAcceptor(args) => commands::offers::claim_acceptor(args).await,
        Commands::Cancel(args) => commands::offers::cancel(args).await,
        Commands::Refund(args) => commands::offers::step(args, "refund").await,
    }
}
