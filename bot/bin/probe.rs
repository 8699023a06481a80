use anyhow::Result;
use clap::{Arg, Command};
use std::env;
use tokenwatch::constants::{
    DEFAULT_EXPLORER_API_URL, DEFAULT_MAX_EVENTS_PER_QUERY, DEFAULT_REQUEST_TIMEOUT_SECONDS,
};
use tokenwatch::services::ExplorerClient;
use tokenwatch::utils::init_logging;
use tokio::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let matches = Command::new("probe")
        .about("One-shot explorer query for a (wallet, token) pair")
        .arg(
            Arg::new("wallet")
                .long("wallet")
                .required(true)
                .help("Wallet address to query"),
        )
        .arg(
            Arg::new("contract")
                .long("contract")
                .required(true)
                .help("BEP-20 token contract address"),
        )
        .arg(
            Arg::new("count")
                .long("count")
                .value_parser(clap::value_parser!(u32))
                .help("Max events to fetch (defaults to 10)"),
        )
        .get_matches();

    let wallet = matches.get_one::<String>("wallet").unwrap();
    let contract = matches.get_one::<String>("contract").unwrap();
    let count = matches
        .get_one::<u32>("count")
        .copied()
        .unwrap_or(DEFAULT_MAX_EVENTS_PER_QUERY);

    dotenvy::dotenv().ok();
    let api_url =
        env::var("BSCSCAN_API_URL").unwrap_or_else(|_| DEFAULT_EXPLORER_API_URL.to_string());
    let api_key = env::var("BSCSCAN_API_KEY")
        .map_err(|_| anyhow::anyhow!("BSCSCAN_API_KEY environment variable not set"))?;

    let explorer = ExplorerClient::new(
        api_url,
        api_key,
        Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECONDS),
    )?;

    info!(
        "🔍 Querying up to {} transfer(s) for wallet {} token {}",
        count, wallet, contract
    );

    let events = explorer.token_transfers(wallet, contract, count).await?;

    if events.is_empty() {
        println!("No transfers found.");
        return Ok(());
    }

    println!("{} transfer(s), newest first:", events.len());
    for event in events {
        let amount = event
            .amount()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| format!("raw {}", event.raw_value));
        let direction = event.direction(wallet);
        println!(
            "  {} {} | from {} to {} | tx {}",
            direction.label(),
            amount,
            event.from_address,
            event.to_address,
            event.tx_hash
        );
    }

    Ok(())
}
