use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::Locator;
use crate::listing::{SiteSelectors, extract_socials};
use crate::session::{RenderSession, SessionError};
use crate::types::{Enrichment, EnrichmentOutcome, SocialLinks};

/// Parameters for visiting a detail page.
#[derive(Debug, Clone)]
pub struct DetailPage<'a> {
    /// Absolute URL prefix for relative detail links.
    pub base_url: &'a str,
    pub copy_button: &'a Locator,
    pub settle: Duration,
    pub click_timeout: Duration,
}

/// Visit an agent's detail page, read its social links and copy its token
/// address through the page's "copy" button.
///
/// The clipboard is cleared before the click, so only text written by this
/// page's button counts. Never fails: a timeout on the copy button or a
/// missing copy keeps the social links (`Partial`), any other error discards
/// everything (`Empty`). The session is left on the detail page whenever
/// `navigated` is set.
pub async fn enrich_detail<S: RenderSession>(
    session: &mut S,
    selectors: &SiteSelectors,
    page: &DetailPage<'_>,
    detail_link: &str,
) -> Enrichment {
    if detail_link.is_empty() {
        warn!("Listing item has no detail link, skipping enrichment");
        return Enrichment::empty(false);
    }

    let url = format!("{}{}", page.base_url, detail_link);
    info!("Navigating to {url}");
    if let Err(e) = session.load(&url).await {
        warn!("Failed to open detail page: {e}");
        // A timed-out navigation may still have left the listing.
        return Enrichment::empty(true);
    }

    tokio::time::sleep(page.settle).await;

    let socials = match session.current_markup().await {
        Ok(markup) => extract_socials(&markup, selectors),
        Err(e) => {
            warn!("Failed to read detail page: {e}");
            return Enrichment::empty(true);
        }
    };
    debug!("Social links: {socials:?}");

    // Leftover text from the previous agent must never be taken for this one.
    let stale = match session.clear_clipboard().await {
        Ok(()) => String::new(),
        Err(e) if e.is_fatal() => {
            warn!("Failed to clear clipboard: {e}");
            return Enrichment::empty(true);
        }
        Err(e) => {
            warn!("Failed to clear clipboard, comparing against its current text: {e}");
            match session.read_clipboard_text().await {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to read clipboard: {e}");
                    return Enrichment::empty(true);
                }
            }
        }
    };

    match session.click(page.copy_button, page.click_timeout).await {
        Ok(()) => {}
        Err(SessionError::Timeout(wait, _)) => {
            warn!("Copy button not clickable within {wait:?}, keeping social links only");
            return partial(socials);
        }
        Err(e) => {
            warn!("Failed to click copy button: {e}");
            return Enrichment::empty(true);
        }
    }

    let token_address = match session.read_clipboard_text().await {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to read copied address: {e}");
            return Enrichment::empty(true);
        }
    };

    if token_address.is_empty() {
        warn!("Clipboard was empty after copy");
        return partial(socials);
    }
    if token_address == stale {
        warn!("Clipboard unchanged after copy, ignoring {token_address}");
        return partial(socials);
    }
    info!("Copied token address: {token_address}");

    Enrichment {
        token_address,
        socials,
        outcome: EnrichmentOutcome::Full,
        navigated: true,
    }
}

fn partial(socials: SocialLinks) -> Enrichment {
    Enrichment {
        token_address: String::new(),
        socials,
        outcome: EnrichmentOutcome::Partial,
        navigated: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteProfile;
    use crate::listing::tests::selectors;
    use crate::session::testing::FakeSession;

    const DETAIL_URL: &str = "https://creator.bid/agents/abc";

    fn detail_markup() -> String {
        r#"<html><body>
             <div class="AgentHeader_socials__Ao_7d">
               <a href="https://x.com/abc">t</a>
               <a href="https://abc.ai">w</a>
             </div>
             <h5 class="AgentKeyChart_copy__JrS0u">0xdead…</h5>
           </body></html>"#
            .to_string()
    }

    fn page(profile: &SiteProfile) -> DetailPage<'_> {
        DetailPage {
            base_url: "https://creator.bid",
            copy_button: &profile.copy_button,
            settle: Duration::ZERO,
            click_timeout: Duration::from_millis(10),
        }
    }

    /// Make the copy button clickable and have it place `text` on the clipboard.
    fn copies(session: &mut FakeSession, profile: &SiteProfile, text: &str) {
        let button = profile.copy_button.to_string();
        session.clickable.insert(button.clone());
        session.copies.insert(button, text.to_string());
    }

    async fn enrich(session: &mut FakeSession, profile: &SiteProfile) -> Enrichment {
        enrich_detail(session, &selectors(), &page(profile), "/agents/abc").await
    }

    #[tokio::test]
    async fn full_enrichment_reads_socials_and_clipboard() {
        let profile = SiteProfile::default();
        let mut session = FakeSession::with_page(DETAIL_URL, &detail_markup());
        copies(&mut session, &profile, "0xdead");

        let result = enrich(&mut session, &profile).await;

        assert_eq!(result.outcome, EnrichmentOutcome::Full);
        assert_eq!(result.token_address, "0xdead");
        assert_eq!(result.socials.twitter, "https://x.com/abc");
        assert_eq!(result.socials.website, "https://abc.ai");
        assert_eq!(result.socials.telegram, "");
        assert!(result.navigated);
        assert_eq!(
            session.calls.first().map(String::as_str),
            Some("load https://creator.bid/agents/abc")
        );
    }

    #[tokio::test]
    async fn copy_timeout_keeps_socials() {
        let profile = SiteProfile::default();
        let mut session = FakeSession::with_page(DETAIL_URL, &detail_markup());

        let result = enrich(&mut session, &profile).await;

        assert_eq!(result.outcome, EnrichmentOutcome::Partial);
        assert_eq!(result.token_address, "");
        assert_eq!(result.socials.twitter, "https://x.com/abc");
        assert_eq!(session.count("clipboard"), 0);
    }

    #[tokio::test]
    async fn broken_session_yields_empty_enrichment() {
        let profile = SiteProfile::default();
        let mut session = FakeSession::with_page(DETAIL_URL, &detail_markup());
        session.crashed = true;

        let result = enrich(&mut session, &profile).await;

        assert_eq!(result, Enrichment::empty(true));
    }

    #[tokio::test]
    async fn empty_link_does_not_navigate() {
        let profile = SiteProfile::default();
        let mut session = FakeSession::default();

        let result = enrich_detail(&mut session, &selectors(), &page(&profile), "").await;

        assert_eq!(result.outcome, EnrichmentOutcome::Empty);
        assert!(!result.navigated);
        assert!(session.calls.is_empty());
    }

    #[tokio::test]
    async fn missing_social_container_is_not_a_failure() {
        let profile = SiteProfile::default();
        let mut session = FakeSession::with_page(DETAIL_URL, "<html><body></body></html>");
        copies(&mut session, &profile, "0xabc");

        let result = enrich(&mut session, &profile).await;

        assert_eq!(result.outcome, EnrichmentOutcome::Full);
        assert_eq!(result.socials, Default::default());
    }

    #[tokio::test]
    async fn leftover_clipboard_text_is_not_reported() {
        let profile = SiteProfile::default();
        let mut session = FakeSession::with_page(DETAIL_URL, &detail_markup());
        session.clickable.insert(profile.copy_button.to_string());
        session.clipboard = "0xPREVIOUS_AGENT".to_string();

        let result = enrich(&mut session, &profile).await;

        assert_eq!(result.outcome, EnrichmentOutcome::Partial);
        assert_eq!(result.token_address, "");
        assert_eq!(result.socials.twitter, "https://x.com/abc");
        assert_eq!(session.count("clear-clipboard"), 1);
    }

    #[tokio::test]
    async fn unchanged_clipboard_is_ignored_when_it_cannot_be_cleared() {
        let profile = SiteProfile::default();
        let mut session = FakeSession::with_page(DETAIL_URL, &detail_markup());
        session.clickable.insert(profile.copy_button.to_string());
        session.clipboard = "0xPREVIOUS_AGENT".to_string();
        session.clipboard_locked = true;

        let result = enrich(&mut session, &profile).await;

        assert_eq!(result.outcome, EnrichmentOutcome::Partial);
        assert_eq!(result.token_address, "");
    }

    #[tokio::test]
    async fn fresh_copy_is_kept_when_clipboard_cannot_be_cleared() {
        let profile = SiteProfile::default();
        let mut session = FakeSession::with_page(DETAIL_URL, &detail_markup());
        copies(&mut session, &profile, "0xdead");
        session.clipboard = "0xPREVIOUS_AGENT".to_string();
        session.clipboard_locked = true;

        let result = enrich(&mut session, &profile).await;

        assert_eq!(result.outcome, EnrichmentOutcome::Full);
        assert_eq!(result.token_address, "0xdead");
    }
}
