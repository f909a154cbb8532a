use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::{BASESCAN_API_BASE, BASESCAN_EXPLORER_BASE, DETAIL_BASE_URL, LISTING_URL};

/// Default config file path.
pub const CONFIG_PATH: &str = "config.toml";

/// Environment variables that override secrets from the config file.
pub const BOT_TOKEN_VAR: &str = "TELEGRAM_BOT_TOKEN";
pub const CHAT_ID_VAR: &str = "TELEGRAM_CHAT_ID";
pub const BASESCAN_KEY_VAR: &str = "BASESCAN_API_KEY";

/// Top-level application config deserialized from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub basescan: BasescanConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub site: SiteProfile,
}

/// Telegram bot credentials and target channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Channel or chat id, e.g. `-1001234567890`.
    #[serde(default)]
    pub chat_id: String,
}

/// Basescan API access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasescanConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_explorer_base")]
    pub explorer_base: String,
}

fn default_api_base() -> String {
    BASESCAN_API_BASE.to_string()
}

fn default_explorer_base() -> String {
    BASESCAN_EXPLORER_BASE.to_string()
}

impl Default for BasescanConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_api_base(),
            explorer_base: default_explorer_base(),
        }
    }
}

/// Runtime settings: pacing, bounded waits and browser mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    pub listing_url: String,
    /// Prepended to the relative detail link of a listing item.
    pub detail_base_url: String,
    /// Idle cycles tolerated before the listing is reloaded.
    pub stall_threshold: u32,
    /// Randomized pause before each snapshot, in milliseconds.
    pub jitter_min_ms: u64,
    pub jitter_max_ms: u64,
    /// Pause after loading a detail page before reading it.
    pub settle_ms: u64,
    pub click_timeout_secs: u64,
    pub consent_timeout_secs: u64,
    /// Upper bound for every Basescan and Telegram request.
    pub request_timeout_secs: u64,
    pub headless: bool,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            listing_url: LISTING_URL.to_string(),
            detail_base_url: DETAIL_BASE_URL.to_string(),
            stall_threshold: 30,
            jitter_min_ms: 1000,
            jitter_max_ms: 2000,
            settle_ms: 1500,
            click_timeout_secs: 10,
            consent_timeout_secs: 5,
            request_timeout_secs: 10,
            headless: true,
        }
    }
}

impl SettingsConfig {
    pub fn click_timeout(&self) -> Duration {
        Duration::from_secs(self.click_timeout_secs)
    }

    pub fn consent_timeout(&self) -> Duration {
        Duration::from_secs(self.consent_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// How an interactive element is located in the rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "lowercase")]
pub enum Locator {
    Css(String),
    Xpath(String),
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css={s}"),
            Locator::Xpath(s) => write!(f, "xpath={s}"),
        }
    }
}

/// Site-specific selectors. These follow the generated class names of the
/// creator.bid frontend and break whenever it is redeployed.
///
/// The listing renders two containers matching `list_container`; only the
/// second one holds the sorted agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteProfile {
    pub list_container: String,
    pub list_item: String,
    pub item_market_cap: String,
    pub item_symbol: String,
    pub item_name: String,
    pub item_link: String,
    pub socials_container: String,
    pub social_link: String,
    pub copy_button: Locator,
    pub consent_button: Locator,
    /// Clicked in order after every (re)load, e.g. "sort by creation time".
    pub nav_clicks: Vec<Locator>,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            list_container: "div.AgentList_agents__3ZX5J".to_string(),
            list_item: "div.AgentListItem_agent__maDHv".to_string(),
            item_market_cap: "div.AgentListItem_marketcap__8GMUk".to_string(),
            item_symbol: "div.AgentListItem_agentKeyTag__8cWPf".to_string(),
            item_name: "div.AgentListItem_name__Plxwu".to_string(),
            item_link: "a[href]".to_string(),
            socials_container: "div.AgentHeader_socials__Ao_7d".to_string(),
            social_link: "a[href]".to_string(),
            copy_button: Locator::Css("h5.AgentKeyChart_copy__JrS0u".to_string()),
            consent_button: Locator::Xpath(
                "//button[contains(text(), 'I agree to the Terms and Conditions')]".to_string(),
            ),
            nav_clicks: vec![
                Locator::Xpath("//div[contains(@class, 'Select_selectedOption')]".to_string()),
                Locator::Xpath(
                    "//div[contains(@class, 'Select_left')]//span[contains(text(), 'Created at')]"
                        .to_string(),
                ),
            ],
        }
    }
}

impl AppConfig {
    /// Load config from the given TOML file path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Write config to the given TOML file path.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("failed to serialize config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    /// Override secrets from the process environment (after `.env` is loaded).
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(token) = non_empty(BOT_TOKEN_VAR) {
            self.telegram.bot_token = token.trim().to_string();
        }
        if let Some(chat_id) = non_empty(CHAT_ID_VAR) {
            self.telegram.chat_id = chat_id.trim().to_string();
        }
        if let Some(key) = non_empty(BASESCAN_KEY_VAR) {
            self.basescan.api_key = key.trim().to_string();
        }
    }

    /// Check the values the watcher cannot run without.
    ///
    /// Telegram credentials are only required when messages are actually sent.
    pub fn validate(&self, require_telegram: bool) -> Result<()> {
        if require_telegram {
            if self.telegram.bot_token.is_empty() {
                bail!("telegram.bot_token is empty (or set {BOT_TOKEN_VAR})");
            }
            if self.telegram.chat_id.is_empty() {
                bail!("telegram.chat_id is empty (or set {CHAT_ID_VAR})");
            }
        }
        let s = &self.settings;
        if s.jitter_min_ms > s.jitter_max_ms {
            bail!(
                "settings.jitter_min_ms ({}) exceeds jitter_max_ms ({})",
                s.jitter_min_ms,
                s.jitter_max_ms
            );
        }
        if s.stall_threshold == 0 {
            bail!("settings.stall_threshold must be at least 1");
        }
        url::Url::parse(&s.listing_url)
            .with_context(|| format!("invalid settings.listing_url: {}", s.listing_url))?;
        url::Url::parse(&s.detail_base_url)
            .with_context(|| format!("invalid settings.detail_base_url: {}", s.detail_base_url))?;
        Ok(())
    }
}
