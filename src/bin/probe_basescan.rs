//! Probe: resolve a token's creator and wallet age through Basescan.
//!
//! Uses `basescan.api_key` from the config (or BASESCAN_API_KEY) and prints
//! the raw lookups followed by what the resolver makes of them.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;

use agentwatch::config::AppConfig;
use agentwatch::onchain::{BasescanClient, ChainExplorer, OnChainResolver, hours_between};

#[derive(Parser)]
#[command(name = "probe_basescan", about = "Look up a token's creator on Basescan")]
struct Args {
    /// Token contract address (0x...)
    token_address: String,

    #[arg(long, default_value = agentwatch::config::CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    agentwatch::init_tracing();
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let mut config = AppConfig::load(&args.config)?;
    config.apply_env();

    let client = BasescanClient::new(
        &config.basescan.api_base,
        &config.basescan.api_key,
        config.settings.request_timeout(),
    )?;

    println!("=== Probe: Basescan ===");
    println!("Token: {}", args.token_address);
    println!();

    println!("--- 1. getcontractcreation ---");
    let start = Instant::now();
    let creator = client.contract_creator(&args.token_address).await;
    println!("Latency: {:?}", start.elapsed());
    match &creator {
        Ok(Some(c)) => println!("Creator: {c}"),
        Ok(None) => println!("No creation record"),
        Err(e) => println!("Error: {e:#}"),
    }
    println!();

    if let Ok(Some(c)) = &creator {
        println!("--- 2. txlist (earliest) ---");
        let start = Instant::now();
        let first = client.first_transaction_time(c).await;
        println!("Latency: {:?}", start.elapsed());
        match first {
            Ok(Some(t)) => println!(
                "First tx: {} ({} hours ago)",
                t.to_rfc3339(),
                hours_between(t, Utc::now())
            ),
            Ok(None) => println!("No transactions"),
            Err(e) => println!("Error: {e:#}"),
        }
        println!();
    }

    println!("--- 3. Resolver ---");
    let resolver = OnChainResolver::new(client);
    let info = resolver.resolve(&args.token_address).await;
    println!("{}", serde_json::to_string_pretty(&info)?);

    Ok(())
}
