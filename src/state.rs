use crate::types::{ListingItem, WatchSummary};

/// Whether `item` should trigger a notification.
///
/// Pure: recording the token afterwards is up to the caller
/// ([`WatchState::mark_notified`]).
pub fn is_new(item: &ListingItem, state: &WatchState) -> bool {
    !item.token_symbol.is_empty()
        && item.token_symbol != state.last_notified_token
        && !item.display_name.is_empty()
        && !item.market_cap_text.is_empty()
}

/// Everything the watcher remembers between cycles. Lives for one run only.
pub struct WatchState {
    /// Token of the last agent a notification was dispatched for.
    pub last_notified_token: String,
    /// Cycles since the last new agent (or the last refresh).
    pub stall_counter: u32,
    pub started_at: String,
    pub total_cycles: u64,
    pub total_notifications: u64,
    pub total_delivery_failures: u64,
    pub total_refreshes: u64,
}

impl Default for WatchState {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchState {
    pub fn new() -> Self {
        Self {
            last_notified_token: String::new(),
            stall_counter: 0,
            started_at: chrono::Utc::now().to_rfc3339(),
            total_cycles: 0,
            total_notifications: 0,
            total_delivery_failures: 0,
            total_refreshes: 0,
        }
    }

    /// Record that a notification was dispatched for `token`.
    pub fn mark_notified(&mut self, token: &str, delivered: bool) {
        self.last_notified_token = token.to_string();
        self.total_notifications += 1;
        if !delivered {
            self.total_delivery_failures += 1;
        }
    }

    /// Count one finished cycle. Returns true when the page has been idle for
    /// more than `threshold` cycles and should be reloaded.
    pub fn tick(&mut self, produced_new_item: bool, threshold: u32) -> bool {
        self.total_cycles += 1;
        if produced_new_item {
            self.stall_counter = 0;
        } else {
            self.stall_counter += 1;
        }
        self.stall_counter > threshold
    }

    pub fn record_refresh(&mut self) {
        self.stall_counter = 0;
        self.total_refreshes += 1;
    }

    pub fn summary(&self) -> WatchSummary {
        WatchSummary {
            started_at: self.started_at.clone(),
            stopped_at: chrono::Utc::now().to_rfc3339(),
            last_notified_token: self.last_notified_token.clone(),
            total_cycles: self.total_cycles,
            total_notifications: self.total_notifications,
            total_delivery_failures: self.total_delivery_failures,
            total_refreshes: self.total_refreshes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::tests::{item_html, listing_page, selectors};
    use crate::listing::{extract_listing, format_item};

    fn item(token: &str, name: &str, mcap: &str) -> ListingItem {
        ListingItem {
            token_symbol: token.to_string(),
            display_name: name.to_string(),
            market_cap_text: mcap.to_string(),
            detail_link: format!("/agents/{}", token.to_lowercase()),
        }
    }

    #[test]
    fn rejects_incomplete_records() {
        let state = WatchState::new();
        assert!(!is_new(&item("", "Agent", "$1K"), &state));
        assert!(!is_new(&item("ABC", "", "$1K"), &state));
        assert!(!is_new(&item("ABC", "Agent", ""), &state));
        assert!(!is_new(&ListingItem::default(), &state));
        assert!(is_new(&item("ABC", "Agent", "$1K"), &state));
    }

    #[test]
    fn accepts_each_token_once_until_replaced() {
        let mut state = WatchState::new();
        let abc = item("ABC", "Agent", "$1K");
        let xyz = item("XYZ", "Other", "$2K");

        assert!(is_new(&abc, &state));
        state.mark_notified(&abc.token_symbol, true);
        assert!(!is_new(&abc, &state));
        assert!(is_new(&xyz, &state));

        state.mark_notified(&xyz.token_symbol, false);
        // Only the last token is remembered.
        assert!(is_new(&abc, &state));
        assert_eq!(state.total_notifications, 2);
        assert_eq!(state.total_delivery_failures, 1);
    }

    #[test]
    fn same_snapshot_twice_is_new_then_not_new() {
        let sel = selectors();
        let page = listing_page(&[], &[item_html("ABC", "Agent X", "$12K", "/agents/abc")]);
        let mut state = WatchState::new();

        let first = format_item(&extract_listing(&page, &sel)[0], &sel);
        assert!(is_new(&first, &state));
        state.mark_notified(&first.token_symbol, true);

        let second = format_item(&extract_listing(&page, &sel)[0], &sel);
        assert!(!is_new(&second, &state));
    }

    #[test]
    fn stall_counter_trips_after_threshold() {
        let mut state = WatchState::new();
        for _ in 0..30 {
            assert!(!state.tick(false, 30));
        }
        assert!(state.tick(false, 30));
        assert_eq!(state.stall_counter, 31);

        state.record_refresh();
        assert_eq!(state.stall_counter, 0);
        assert_eq!(state.total_refreshes, 1);
        assert_eq!(state.total_cycles, 31);
    }

    #[test]
    fn new_item_resets_stall_counter() {
        let mut state = WatchState::new();
        for _ in 0..10 {
            state.tick(false, 30);
        }
        assert!(!state.tick(true, 30));
        assert_eq!(state.stall_counter, 0);
    }
}
