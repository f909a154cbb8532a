use crate::types::{NotificationEvent, WatchSummary};

/// Emit a notification event as a single JSON line to stdout.
pub fn report_event(event: &NotificationEvent) {
    if let Ok(json) = serde_json::to_string(event) {
        println!("{json}");
    }
}

/// Emit the run summary as pretty-printed JSON to stdout.
pub fn report_summary(summary: &WatchSummary) {
    if let Ok(json) = serde_json::to_string_pretty(summary) {
        println!("{json}");
    }
}
