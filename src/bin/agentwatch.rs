use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use agentwatch::config::AppConfig;
use agentwatch::engine::Watcher;
use agentwatch::notify::{DryRunSink, NotificationSink, TelegramSink};
use agentwatch::onchain::{BasescanClient, OnChainResolver};
use agentwatch::reporter;
use agentwatch::session::{BrowserOptions, ChromeSession};
use agentwatch::TELEGRAM_API_BASE;

#[derive(Parser)]
#[command(
    name = "agentwatch",
    about = "Watch creator.bid for new agents and post them to Telegram"
)]
struct Args {
    /// Path to the TOML config file
    #[arg(long, default_value = agentwatch::config::CONFIG_PATH)]
    config: PathBuf,

    /// Log composed messages instead of sending them
    #[arg(long)]
    dry_run: bool,

    /// Show the browser window
    #[arg(long)]
    headed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    agentwatch::init_tracing();

    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = AppConfig::load(&args.config)?;
    config.apply_env();
    config.validate(!args.dry_run)?;
    info!("Loaded config from {}", args.config.display());

    if config.basescan.api_key.is_empty() {
        tracing::warn!("basescan.api_key is empty, creator lookups will likely fail");
    }

    let sink: Box<dyn NotificationSink> = if args.dry_run {
        info!("Dry-run mode: messages are logged, not sent");
        Box::new(DryRunSink)
    } else {
        Box::new(TelegramSink::new(
            TELEGRAM_API_BASE,
            &config.telegram.bot_token,
            &config.telegram.chat_id,
            config.settings.request_timeout(),
        )?)
    };

    let explorer = BasescanClient::new(
        &config.basescan.api_base,
        &config.basescan.api_key,
        config.settings.request_timeout(),
    )?;

    let origin = url::Url::parse(&config.settings.detail_base_url)?
        .origin()
        .ascii_serialization();
    let session = ChromeSession::launch(&BrowserOptions {
        headless: config.settings.headless && !args.headed,
        clipboard_origin: Some(origin),
    })
    .await?;

    let mut watcher = Watcher::new(session, OnChainResolver::new(explorer), sink, &config)?;
    info!("Press Ctrl+C to stop.");
    let result = watcher.run(tokio::signal::ctrl_c()).await;

    reporter::report_summary(&watcher.state().summary());
    result?;
    Ok(())
}
