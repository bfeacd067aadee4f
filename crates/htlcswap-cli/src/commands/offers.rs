//! Swap offer commands: list, show, create, accept, the lock/claim/refund
//! steps, and cancel.

use clap::Args;
use htlcswap_core::{Actor, SwapOffer, SwapStatus};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use crate::client::{ApiClient, DEFAULT_ENDPOINT};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only offers in this status (e.g. offered, acceptor_locked).
    #[arg(short, long, conflicts_with_all = ["open", "active"])]
    pub status: Option<SwapStatus>,

    /// Only offers waiting for a counterparty.
    #[arg(long, conflicts_with = "active")]
    pub open: bool,

    /// Only swaps underway.
    #[arg(long)]
    pub active: bool,

    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

#[derive(Args, Debug)]
pub struct SwapArgs {
    /// Swap identifier.
    pub swap_id: String,

    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Asset the initiator gives (e.g. btc).
    #[arg(long)]
    pub give: String,

    /// Amount of the given asset, in its native unit.
    #[arg(long)]
    pub give_amount: Decimal,

    /// Asset the initiator wants in return (e.g. depix).
    #[arg(long)]
    pub want: String,

    /// Amount of the wanted asset.
    #[arg(long)]
    pub want_amount: Decimal,

    /// Initiator's receiving address for the wanted asset.
    #[arg(short, long)]
    pub address: String,

    /// Where a refund of the initiator's leg goes.
    #[arg(long)]
    pub refund_address: Option<String>,

    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

#[derive(Args, Debug)]
pub struct AcceptArgs {
    /// Swap identifier.
    pub swap_id: String,

    /// Acceptor's receiving address for the initiator's asset.
    #[arg(short, long)]
    pub address: String,

    /// Where a refund of the acceptor's leg goes.
    #[arg(long)]
    pub refund_address: Option<String>,

    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

#[derive(Args, Debug)]
pub struct ClaimAcceptorArgs {
    /// Swap identifier.
    pub swap_id: String,

    /// Hex secret revealed by the initiator's claim. The node's copy is used if omitted.
    #[arg(long)]
    pub secret: Option<String>,

    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

#[derive(Args, Debug)]
pub struct CancelArgs {
    /// Swap identifier.
    pub swap_id: String,

    /// Party requesting the cancellation (initiator or acceptor).
    #[arg(long, default_value = "initiator", value_parser = parse_actor)]
    pub actor: Actor,

    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

fn parse_actor(raw: &str) -> Result<Actor, String> {
    match raw.trim().to_lowercase().as_str() {
        "initiator" => Ok(Actor::Initiator),
        "acceptor" => Ok(Actor::Acceptor),
        other => Err(format!("unknown actor {} (expected initiator or acceptor)", other)),
    }
}

#[derive(Deserialize)]
struct OffersResponse {
    offers: Vec<SwapOffer>,
    count: usize,
}

#[derive(Deserialize)]
struct ClaimReceipt {
    swap_id: String,
    status: SwapStatus,
    secret: String,
}

#[derive(Deserialize)]
struct CompletedResponse {
    swap_id: String,
    status: SwapStatus,
}

fn offer_path(swap_id: &str) -> String {
    format!("/api/v1/offers/{}", swap_id)
}

fn print_offer(offer: &SwapOffer) {
    println!("Swap {}", offer.swap_id);
    println!("  Status:     {}", offer.status);
    println!(
        "  Gives:      {} {} (to {})",
        offer.initiator_amount,
        offer.initiator_asset,
        offer
            .acceptor_address
            .as_ref()
            .map(|a| a.as_str())
            .unwrap_or("<unaccepted>")
    );
    println!(
        "  Wants:      {} {} (to {})",
        offer.acceptor_amount, offer.acceptor_asset, offer.initiator_address
    );
    println!("  Hashlock:   {}", offer.hashlock);
    println!("  Timelocks:  initiator {} / acceptor {}", offer.initiator_timelock, offer.acceptor_timelock);
    let txs = [
        ("Lock (I)", &offer.initiator_txid),
        ("Lock (A)", &offer.acceptor_txid),
        ("Claim (I)", &offer.initiator_claim_txid),
        ("Claim (A)", &offer.acceptor_claim_txid),
        ("Refund (I)", &offer.initiator_refund_txid),
        ("Refund (A)", &offer.acceptor_refund_txid),
    ];
    for (label, tx) in txs {
        if let Some(tx) = tx {
            println!("  {:<11} {}", format!("{}:", label), tx);
        }
    }
}

pub async fn list(args: &ListArgs) -> anyhow::Result<()> {
    let path = if args.open {
        "/api/v1/offers/open".to_string()
    } else if args.active {
        "/api/v1/offers/active".to_string()
    } else if let Some(status) = args.status {
        format!("/api/v1/offers?status={}", status)
    } else {
        "/api/v1/offers".to_string()
    };

    let client = ApiClient::new(&args.endpoint);
    let resp: OffersResponse = client.get(&path).await?;

    println!("{} offer(s)", resp.count);
    for offer in &resp.offers {
        println!(
            "  {}  {:<18} {} {} -> {} {}",
            offer.swap_id,
            offer.status,
            offer.initiator_amount,
            offer.initiator_asset,
            offer.acceptor_amount,
            offer.acceptor_asset
        );
    }
    Ok(())
}

pub async fn show(args: &SwapArgs) -> anyhow::Result<()> {
    let client = ApiClient::new(&args.endpoint);
    let offer: SwapOffer = client.get(&offer_path(&args.swap_id)).await?;
    print_offer(&offer);
    Ok(())
}

pub async fn create(args: &CreateArgs) -> anyhow::Result<()> {
    let body = json!({
        "initiator_asset": args.give,
        "initiator_amount": args.give_amount.to_string(),
        "acceptor_asset": args.want,
        "acceptor_amount": args.want_amount.to_string(),
        "initiator_address": args.address,
        "initiator_refund_address": args.refund_address,
    });

    let client = ApiClient::new(&args.endpoint);
    let offer: SwapOffer = client.post("/api/v1/offers", Some(body)).await?;
    println!("Offer created!");
    print_offer(&offer);
    Ok(())
}

pub async fn accept(args: &AcceptArgs) -> anyhow::Result<()> {
    let body = json!({
        "acceptor_address": args.address,
        "acceptor_refund_address": args.refund_address,
    });

    let client = ApiClient::new(&args.endpoint);
    let offer: SwapOffer = client
        .post(&format!("{}/accept", offer_path(&args.swap_id)), Some(body))
        .await?;
    println!("Offer accepted!");
    print_offer(&offer);
    Ok(())
}

/// Run a step that takes no body and returns the updated offer.
pub async fn step(args: &SwapArgs, step: &str) -> anyhow::Result<()> {
    let client = ApiClient::new(&args.endpoint);
    let offer: SwapOffer = client
        .post(&format!("{}/{}", offer_path(&args.swap_id), step), None)
        .await?;
    print_offer(&offer);
    Ok(())
}

pub async fn claim_initiator(args: &SwapArgs) -> anyhow::Result<()> {
    let client = ApiClient::new(&args.endpoint);
    let receipt: ClaimReceipt = client
        .post(&format!("{}/claim-initiator", offer_path(&args.swap_id)), None)
        .await?;
    println!("Claimed!");
    println!("  Swap:    {}", receipt.swap_id);
    println!("  Status:  {}", receipt.status);
    println!("  Secret:  {}", receipt.secret);
    Ok(())
}

pub async fn claim_acceptor(args: &ClaimAcceptorArgs) -> anyhow::Result<()> {
    let body = args.secret.as_ref().map(|s| json!({ "secret": s }));
    let client = ApiClient::new(&args.endpoint);
    let done: CompletedResponse = client
        .post(&format!("{}/claim-acceptor", offer_path(&args.swap_id)), body)
        .await?;
    println!("Swap {} is {}", done.swap_id, done.status);
    Ok(())
}

pub async fn cancel(args: &CancelArgs) -> anyhow::Result<()> {
    let client = ApiClient::new(&args.endpoint);
    let offer: SwapOffer = client
        .post(
            &format!("{}/cancel", offer_path(&args.swap_id)),
            Some(json!({ "actor": args.actor })),
        )
        .await?;
    println!("Offer cancelled.");
    print_offer(&offer);
    Ok(())
}
