use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use rand::Rng;
use tracing::{debug, error, info, warn};

use crate::config::{AppConfig, SettingsConfig, SiteProfile};
use crate::enricher::{DetailPage, enrich_detail};
use crate::listing::{SiteSelectors, extract_listing, format_item};
use crate::message::{MessageLinks, compose_message};
use crate::notify::NotificationSink;
use crate::onchain::{ChainExplorer, OnChainResolver};
use crate::reporter;
use crate::session::{RenderSession, SessionError};
use crate::state::{WatchState, is_new};
use crate::types::{Delivery, EnrichedRecord, ListingItem, NotificationEvent};

/// Where the watcher is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Polling,
    /// Reloading the listing after too many idle cycles.
    Stalled,
    Terminated,
}

/// What a single poll cycle observed.
#[derive(Debug)]
pub enum CycleOutcome {
    /// No listing item could be read from the snapshot.
    Empty,
    /// The newest item was already notified (or incomplete).
    Unchanged,
    Notified(Box<NotificationEvent>),
}

/// Drives the listing page: detects new agents, enriches them and sends
/// notifications.
///
/// Only the first (newest) item is inspected per cycle; when several agents
/// appear between two snapshots the older ones are never reported.
pub struct Watcher<S, E, N> {
    session: S,
    resolver: OnChainResolver<E>,
    sink: N,
    selectors: SiteSelectors,
    site: SiteProfile,
    settings: SettingsConfig,
    links: MessageLinks,
    state: WatchState,
    phase: Phase,
}

impl<S, E, N> Watcher<S, E, N>
where
    S: RenderSession,
    E: ChainExplorer,
    N: NotificationSink,
{
    pub fn new(
        session: S,
        resolver: OnChainResolver<E>,
        sink: N,
        config: &AppConfig,
    ) -> Result<Self> {
        Ok(Self {
            session,
            resolver,
            sink,
            selectors: SiteSelectors::compile(&config.site)?,
            site: config.site.clone(),
            settings: config.settings.clone(),
            links: MessageLinks {
                detail_base_url: config.settings.detail_base_url.clone(),
                explorer_base: config.basescan.explorer_base.clone(),
            },
            state: WatchState::new(),
            phase: Phase::Init,
        })
    }

    pub fn state(&self) -> &WatchState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            debug!("Watcher phase {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
    }

    /// Random pause used between page interactions so requests are not evenly spaced.
    async fn pace(&self) {
        let (min, max) = (self.settings.jitter_min_ms, self.settings.jitter_max_ms);
        let ms = if max > min {
            rand::thread_rng().gen_range(min..=max)
        } else {
            min
        };
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }

    /// Absorb everything but a fatal session error.
    fn tolerate(result: Result<(), SessionError>, what: &str) -> Result<(), SessionError> {
        match result {
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("{what}: {e}");
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    /// Click through the configured navigation (e.g. "sort by creation time").
    async fn apply_nav_clicks(&mut self) -> Result<(), SessionError> {
        let wait = self.settings.click_timeout();
        for locator in &self.site.nav_clicks {
            let clicked = self.session.click(locator, wait).await;
            Self::tolerate(clicked, &format!("Navigation click on {locator} failed"))?;
            self.pace().await;
        }
        Ok(())
    }

    /// Load the listing, dismiss the consent dialog if shown and apply the
    /// navigation clicks.
    pub async fn init(&mut self) -> Result<(), SessionError> {
        self.set_phase(Phase::Init);
        info!("Loading listing page {}", self.settings.listing_url);
        let url = self.settings.listing_url.clone();
        let loaded = self.session.load(&url).await;
        Self::tolerate(loaded, "Listing page did not load cleanly")?;
        self.pace().await;

        match self
            .session
            .click(&self.site.consent_button, self.settings.consent_timeout())
            .await
        {
            Ok(()) => {
                info!("Consent dialog dismissed");
                self.pace().await;
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(_) => info!("No consent dialog shown"),
        }

        self.apply_nav_clicks().await?;
        self.set_phase(Phase::Polling);
        Ok(())
    }

    /// Reload the listing and re-apply the navigation clicks.
    async fn recover(&mut self) -> Result<(), SessionError> {
        self.set_phase(Phase::Stalled);
        warn!(
            "No new agent for {} cycles, reloading the listing",
            self.state.stall_counter
        );
        let refreshed = self.session.refresh().await;
        Self::tolerate(refreshed, "Reload failed")?;
        self.pace().await;
        self.apply_nav_clicks().await?;
        self.state.record_refresh();
        self.set_phase(Phase::Polling);
        Ok(())
    }

    /// Read the newest listing item from the current page, if any.
    async fn newest_item(&mut self) -> Result<Option<ListingItem>, SessionError> {
        let markup = match self.session.current_markup().await {
            Ok(markup) => markup,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Snapshot failed: {e}");
                return Ok(None);
            }
        };
        let items = extract_listing(&markup, &self.selectors);
        Ok(items.first().map(|fragment| format_item(fragment, &self.selectors)))
    }

    /// Enrich, notify and return to the listing.
    async fn process(&mut self, item: ListingItem) -> Result<NotificationEvent, SessionError> {
        info!(
            "New agent: {} ({}) mcap {}",
            item.token_symbol, item.display_name, item.market_cap_text
        );
        self.pace().await;

        let detail = DetailPage {
            base_url: &self.settings.detail_base_url,
            copy_button: &self.site.copy_button,
            settle: self.settings.settle_delay(),
            click_timeout: self.settings.click_timeout(),
        };
        let enrichment =
            enrich_detail(&mut self.session, &self.selectors, &detail, &item.detail_link).await;
        let creator = self.resolver.resolve(&enrichment.token_address).await;

        let record = EnrichedRecord {
            item,
            token_address: enrichment.token_address,
            socials: enrichment.socials,
            creator_address: creator.address.clone(),
            wallet_age_hours: creator.wallet_age_hours,
        };
        let message = compose_message(&record, &self.links);
        debug!("Composed message:\n{message}");

        let delivery = self.sink.deliver(&message).await;
        self.state
            .mark_notified(&record.item.token_symbol, !matches!(delivery, Delivery::Failed(_)));

        let event = NotificationEvent {
            timestamp: chrono::Utc::now().to_rfc3339(),
            item: record.item,
            token_address: record.token_address,
            socials: record.socials,
            creator,
            enrichment: enrichment.outcome,
            delivery,
        };
        reporter::report_event(&event);

        if enrichment.navigated {
            let back = self.session.back().await;
            Self::tolerate(back, "Failed to return to the listing")?;
            self.pace().await;
        }
        Ok(event)
    }

    /// One poll cycle: pace, snapshot, gate the newest item, process it if new,
    /// then update the stall counter (reloading the page when it trips).
    ///
    /// Only a fatal session error is returned.
    pub async fn cycle(&mut self) -> Result<CycleOutcome, SessionError> {
        self.pace().await;

        let outcome = match self.newest_item().await? {
            None => {
                debug!("No agents found on the listing");
                CycleOutcome::Empty
            }
            Some(item) if is_new(&item, &self.state) => {
                CycleOutcome::Notified(Box::new(self.process(item).await?))
            }
            Some(item) => {
                debug!("Token {:?} unchanged, nothing to send", item.token_symbol);
                CycleOutcome::Unchanged
            }
        };

        let stalled = self.state.tick(
            matches!(outcome, CycleOutcome::Notified(_)),
            self.settings.stall_threshold,
        );
        if stalled {
            self.recover().await?;
        }
        Ok(outcome)
    }

    /// Run until `shutdown` resolves or the session becomes unusable. The
    /// session is closed in both cases.
    pub async fn run<F: Future>(&mut self, shutdown: F) -> Result<(), SessionError> {
        tokio::pin!(shutdown);

        let result = tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                Ok(())
            }
            result = self.watch() => result,
        };

        if let Err(e) = &result {
            error!("Stopping watcher: {e}");
        }
        self.set_phase(Phase::Terminated);
        if let Err(e) = self.session.quit().await {
            warn!("Failed to close the browser: {e}");
        }
        result
    }

    async fn watch(&mut self) -> Result<(), SessionError> {
        self.init().await?;
        info!(
            "Watching {} (stall threshold: {} cycles)",
            self.settings.listing_url, self.settings.stall_threshold
        );
        loop {
            self.cycle().await?;
        }
    }
}
