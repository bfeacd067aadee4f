//! `swapctl status` and `swapctl balances` : node overview.

use std::collections::BTreeMap;

use clap::Args;
use serde::Deserialize;

use crate::client::{ApiClient, DEFAULT_ENDPOINT};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

#[derive(Deserialize)]
struct StatusResponse {
    version: String,
    uptime_secs: u64,
    ledger: String,
    assets: Vec<String>,
    swaps: usize,
    by_status: BTreeMap<String, usize>,
}

#[derive(Deserialize)]
struct AssetBalance {
    asset: String,
    balance: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct BalancesResponse {
    balances: Vec<AssetBalance>,
}

pub async fn run(args: &StatusArgs) -> anyhow::Result<()> {
    let client = ApiClient::new(&args.endpoint);
    let status: StatusResponse = client.get("/api/v1/status").await?;

    println!("Node Status:");
    println!("  Endpoint: {}", args.endpoint);
    println!("  Version:  {}", status.version);
    println!("  Uptime:   {}s", status.uptime_secs);
    println!("  Ledger:   {} ({})", status.ledger, status.assets.join(", "));
    println!("  Swaps:    {}", status.swaps);
    for (name, count) in status.by_status.iter().filter(|(_, c)| **c > 0) {
        println!("    {:<18} {}", name, count);
    }
    Ok(())
}

pub async fn run_balances(args: &StatusArgs) -> anyhow::Result<()> {
    let client = ApiClient::new(&args.endpoint);
    let resp: BalancesResponse = client.get("/api/v1/balances").await?;

    println!("Balances:");
    for entry in resp.balances {
        match (entry.balance, entry.error) {
            (Some(balance), _) => println!("  {:<10} {}", entry.asset, balance),
            (None, Some(error)) => println!("  {:<10} unavailable: {}", entry.asset, error),
            (None, None) => println!("  {:<10} unknown", entry.asset),
        }
    }
    Ok(())
}
