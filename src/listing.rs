use anyhow::{Result, anyhow};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::config::SiteProfile;
use crate::types::{ListingItem, SocialLinks};

/// CSS selectors from a [`SiteProfile`], parsed once at startup so a broken
/// selector is reported before the watcher starts.
#[derive(Debug, Clone)]
pub struct SiteSelectors {
    list_container: Selector,
    list_item: Selector,
    item_market_cap: Selector,
    item_symbol: Selector,
    item_name: Selector,
    item_link: Selector,
    socials_container: Selector,
    social_link: Selector,
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector `{css}`: {e:?}"))
}

impl SiteSelectors {
    pub fn compile(profile: &SiteProfile) -> Result<Self> {
        Ok(Self {
            list_container: parse_selector(&profile.list_container)?,
            list_item: parse_selector(&profile.list_item)?,
            item_market_cap: parse_selector(&profile.item_market_cap)?,
            item_symbol: parse_selector(&profile.item_symbol)?,
            item_name: parse_selector(&profile.item_name)?,
            item_link: parse_selector(&profile.item_link)?,
            socials_container: parse_selector(&profile.socials_container)?,
            social_link: parse_selector(&profile.social_link)?,
        })
    }
}

/// Extract the raw HTML of every listing item in the second listing container.
///
/// The page renders an "all agents" container first and the sorted one
/// second. With fewer than two containers the page is not ready (or its
/// structure changed) and nothing is returned.
pub fn extract_listing(markup: &str, selectors: &SiteSelectors) -> Vec<String> {
    let document = Html::parse_document(markup);
    let Some(container) = document.select(&selectors.list_container).nth(1) else {
        debug!("Second listing container not found");
        return Vec::new();
    };
    container
        .select(&selectors.list_item)
        .map(|item| item.html())
        .collect()
}

fn first_text(root: ElementRef<'_>, selector: &Selector) -> Option<String> {
    root.select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
}

/// Parse one listing item fragment.
///
/// Returns the all-empty record if market cap, symbol or name is missing;
/// the dedup gate rejects such records, so a malformed item is skipped
/// instead of interrupting the cycle.
pub fn format_item(fragment: &str, selectors: &SiteSelectors) -> ListingItem {
    let html = Html::parse_fragment(fragment);
    let root = html.root_element();

    let (Some(market_cap), Some(symbol), Some(name)) = (
        first_text(root, &selectors.item_market_cap),
        first_text(root, &selectors.item_symbol),
        first_text(root, &selectors.item_name),
    ) else {
        debug!("Listing item is missing a field, ignoring it");
        return ListingItem::default();
    };

    let detail_link = root
        .select(&selectors.item_link)
        .next()
        .and_then(|a| a.value().attr("href"))
        .unwrap_or_default()
        .to_string();

    ListingItem {
        token_symbol: symbol.replace('$', ""),
        display_name: name,
        market_cap_text: market_cap,
        detail_link,
    }
}

/// Read the social links of an agent detail page, by position.
pub fn extract_socials(markup: &str, selectors: &SiteSelectors) -> SocialLinks {
    let document = Html::parse_document(markup);
    let Some(container) = document.select(&selectors.socials_container).next() else {
        return SocialLinks::default();
    };
    let mut hrefs = container
        .select(&selectors.social_link)
        .filter_map(|a| a.value().attr("href"))
        .map(str::to_string);

    SocialLinks {
        twitter: hrefs.next().unwrap_or_default(),
        website: hrefs.next().unwrap_or_default(),
        telegram: hrefs.next().unwrap_or_default(),
    }
}
