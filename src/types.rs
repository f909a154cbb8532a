use serde::Serialize;

/// One entry of the agent listing, as rendered on the page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListingItem {
    /// Ticker without the leading `$`.
    pub token_symbol: String,
    pub display_name: String,
    /// Market cap exactly as displayed (e.g. `$12K`).
    pub market_cap_text: String,
    /// Relative link to the agent detail page (e.g. `/agents/abc`).
    pub detail_link: String,
}

impl ListingItem {
    pub fn is_empty(&self) -> bool {
        self.token_symbol.is_empty()
            && self.display_name.is_empty()
            && self.market_cap_text.is_empty()
            && self.detail_link.is_empty()
    }
}

/// Social links from the agent header, taken by position: first anchor is
/// Twitter, second the website, third Telegram. Missing anchors are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SocialLinks {
    pub twitter: String,
    pub website: String,
    pub telegram: String,
}

/// How much of the detail-page enrichment succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentOutcome {
    /// Token address recovered.
    Full,
    /// No token address, but the social links read before the failure are kept.
    Partial,
    /// Nothing recovered.
    Empty,
}

/// Result of visiting an agent's detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrichment {
    /// Empty when the address could not be copied.
    pub token_address: String,
    pub socials: SocialLinks,
    pub outcome: EnrichmentOutcome,
    /// Whether the session left the listing page and must navigate back.
    pub navigated: bool,
}

impl Enrichment {
    pub fn empty(navigated: bool) -> Self {
        Self {
            token_address: String::new(),
            socials: SocialLinks::default(),
            outcome: EnrichmentOutcome::Empty,
            navigated,
        }
    }
}

/// Contract creator and the age of its wallet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatorInfo {
    /// Creator address, or [`crate::NOT_AVAILABLE`].
    pub address: String,
    /// Hours since the creator's first transaction, 0.0 when unknown.
    pub wallet_age_hours: f64,
}

impl CreatorInfo {
    pub fn unresolved() -> Self {
        Self {
            address: crate::NOT_AVAILABLE.to_string(),
            wallet_age_hours: 0.0,
        }
    }
}

/// Everything the notification needs about one new agent.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub item: ListingItem,
    pub token_address: String,
    pub socials: SocialLinks,
    pub creator_address: String,
    pub wallet_age_hours: f64,
}

/// Result of handing a message to the notification sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Delivery {
    Sent,
    Failed(String),
    /// Dry-run mode: logged only.
    Skipped,
}

/// Emitted on stdout for every agent that went through the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationEvent {
    pub timestamp: String,
    pub item: ListingItem,
    pub token_address: String,
    pub socials: SocialLinks,
    pub creator: CreatorInfo,
    pub enrichment: EnrichmentOutcome,
    pub delivery: Delivery,
}

/// Run statistics printed on shutdown.
#[derive(Debug, Clone, Serialize)]
pub struct WatchSummary {
    pub started_at: String,
    pub stopped_at: String,
    pub last_notified_token: String,
    pub total_cycles: u64,
    pub total_notifications: u64,
    pub total_delivery_failures: u64,
    pub total_refreshes: u64,
}
