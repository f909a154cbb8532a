pub mod config;
pub mod engine;
pub mod enricher;
pub mod listing;
pub mod message;
pub mod notify;
pub mod onchain;
pub mod reporter;
pub mod session;
pub mod state;
pub mod types;

/// Listing page watched for newly deployed agents.
pub const LISTING_URL: &str = "https://creator.bid/agents";

/// Prefix for the relative detail links found on listing items.
pub const DETAIL_BASE_URL: &str = "https://creator.bid";

/// Basescan REST API (Etherscan-compatible, Base mainnet).
pub const BASESCAN_API_BASE: &str = "https://api.basescan.org/api";

/// Basescan explorer used for the "View" links in notifications.
pub const BASESCAN_EXPLORER_BASE: &str = "https://basescan.org";

/// Telegram Bot API base URL. Append `/bot<token>/<method>`.
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Placeholder for enrichment data that could not be resolved.
pub const NOT_AVAILABLE: &str = "Non disponible";

/// Log to stderr, filtered by `RUST_LOG` (default `info`). Stdout is kept for
/// the JSON reports.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
