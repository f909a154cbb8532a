use crate::NOT_AVAILABLE;
use crate::types::EnrichedRecord;

/// URL prefixes used when rendering a notification.
#[derive(Debug, Clone)]
pub struct MessageLinks {
    /// Prefix for the plain-text agent link.
    pub detail_base_url: String,
    /// Block explorer for the "View" links, without trailing slash.
    pub explorer_base: String,
}

/// Escape text for Telegram's HTML parse mode.
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape text placed inside a quoted attribute value.
fn escape_attr(text: &str) -> String {
    escape(text).replace('\'', "&#39;").replace('"', "&quot;")
}

/// `0x` followed by hex digits only.
fn is_address(value: &str) -> bool {
    value
        .strip_prefix("0x")
        .is_some_and(|hex| !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Format hours the way they read in the channel: `0.0`, `5.25`, `12.5`.
fn format_hours(hours: f64) -> String {
    if hours.fract() == 0.0 {
        format!("{hours:.1}")
    } else {
        format!("{hours}")
    }
}

/// An address followed by its explorer link. Anything that is not a plain hex
/// address is written as text only.
fn view_link(value: &str, explorer: &str, kind: &str) -> String {
    if !is_address(value) {
        return escape(value);
    }
    let url = format!("{explorer}/{kind}/{value}");
    format!("{} (<a href='{}'>View</a>)", escape(value), escape_attr(&url))
}

/// Build the Telegram message for a new agent.
///
/// Unresolved fields are written as [`NOT_AVAILABLE`] (and `0.0` hours) so a
/// reader can tell the enrichment came back incomplete. Social links that are
/// missing still get their (empty) line.
pub fn compose_message(record: &EnrichedRecord, links: &MessageLinks) -> String {
    let item = &record.item;
    let explorer = links.explorer_base.trim_end_matches('/');

    let ca = if record.token_address.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        view_link(&record.token_address, explorer, "token")
    };

    let creator = if record.creator_address.is_empty() || record.creator_address == NOT_AVAILABLE
    {
        NOT_AVAILABLE.to_string()
    } else {
        view_link(&record.creator_address, explorer, "address")
    };

    format!(
        "<b>NEW AGENT DEPLOYED</b>\n\
         Mcap: {}\n\
         Token: {}\n\
         Name: {}\n\
         Link: {}{}\n\
         CA: {ca}\n\
         Creator address: {creator} (created since: {} hours)\n\
         Twitter: {}\n\
         Site: {}\n\
         Telegram: {}",
        escape(&item.market_cap_text),
        escape(&item.token_symbol),
        escape(&item.display_name),
        escape(&links.detail_base_url),
        escape(&item.detail_link),
        format_hours(record.wallet_age_hours),
        escape(&record.socials.twitter),
        escape(&record.socials.website),
        escape(&record.socials.telegram),
    )
}
