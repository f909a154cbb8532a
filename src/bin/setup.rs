//! setup: first-time setup for agentwatch.
//!
//! Creates `config.toml` from defaults if it does not exist, reads the
//! Telegram bot token and Basescan API key (hidden input), checks the bot
//! token with Telegram `getMe`, and saves the config.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;

use agentwatch::TELEGRAM_API_BASE;
use agentwatch::config::{AppConfig, BasescanConfig, SettingsConfig, SiteProfile, TelegramConfig};
use agentwatch::notify::TelegramSink;

#[derive(Parser)]
#[command(name = "setup", about = "Validate credentials and save them to config.toml")]
struct Cli {
    #[arg(long, default_value = agentwatch::config::CONFIG_PATH)]
    config: PathBuf,

    /// Channel id to post to (e.g. -1001234567890)
    #[arg(long)]
    chat_id: Option<String>,
}

fn prompt_secret(label: &str) -> Result<String> {
    let value = rpassword::prompt_password(format!("{label}: "))
        .with_context(|| format!("failed to read {label}"))?;
    Ok(value.trim().to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    agentwatch::init_tracing();
    let cli = Cli::parse();

    let mut app_config = if cli.config.exists() {
        AppConfig::load(&cli.config)?
    } else {
        println!("{} not found, starting from defaults", cli.config.display());
        AppConfig {
            telegram: TelegramConfig::default(),
            basescan: BasescanConfig::default(),
            settings: SettingsConfig::default(),
            site: SiteProfile::default(),
        }
    };

    println!("=== agentwatch setup ===\n");

    // ── Step 1: Telegram bot token ─────────────────────────────────
    let bot_token = prompt_secret("Telegram bot token")?;
    if bot_token.is_empty() {
        bail!("bot token cannot be empty");
    }

    println!("Checking bot token...");
    let sink = TelegramSink::new(
        TELEGRAM_API_BASE,
        &bot_token,
        "",
        app_config.settings.request_timeout(),
    )?;
    let username = sink
        .bot_username()
        .await
        .context("Telegram rejected the bot token")?;
    println!("  Bot: @{username}");
    println!();

    // ── Step 2: Channel ────────────────────────────────────────────
    if let Some(chat_id) = cli.chat_id {
        app_config.telegram.chat_id = chat_id;
    }
    if app_config.telegram.chat_id.is_empty() {
        println!("  WARNING: no chat id set; pass --chat-id or edit telegram.chat_id");
    }

    // ── Step 3: Basescan key ───────────────────────────────────────
    let api_key = prompt_secret("Basescan API key (leave empty to keep current)")?;
    if !api_key.is_empty() {
        app_config.basescan.api_key = api_key;
    }
    if app_config.basescan.api_key.is_empty() {
        println!("  WARNING: no Basescan key; creator lookups will fail");
    }
    println!();

    // ── Step 4: Save ───────────────────────────────────────────────
    app_config.telegram.bot_token = bot_token;
    println!("Saving {}...", cli.config.display());
    app_config.save(&cli.config)?;
    println!("  Config saved");
    println!();

    println!("Next steps:");
    println!("  cargo run --bin probe_listing            # check the selectors still match");
    println!("  cargo run --bin agentwatch -- --dry-run  # watch without posting");

    Ok(())
}
