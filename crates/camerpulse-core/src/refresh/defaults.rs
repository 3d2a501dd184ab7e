//! Compiled-in refresh intervals for the CamerPulse dashboards.

use std::collections::{BTreeMap, BTreeSet};

pub const SENTIMENT_STREAMS: &str = "sentiment_streams";
pub const TREND_RADAR: &str = "trend_radar";
pub const ELECTION_ALERTS: &str = "election_alerts";
pub const CIVIC_WARNINGS: &str = "civic_warnings";
pub const OFFICIAL_PROFILES: &str = "official_profiles";
pub const PARTY_STATISTICS: &str = "party_statistics";
pub const DASHBOARD_WIDGETS: &str = "dashboard_widgets";
pub const ADMIN_METRICS: &str = "admin_metrics";

/// Default interval in milliseconds for every known task.
pub const DEFAULT_INTERVALS_MS: [(&str, u64); 8] = [
    (SENTIMENT_STREAMS, 15_000),
    (TREND_RADAR, 15_000),
    (ELECTION_ALERTS, 10_000),
    (CIVIC_WARNINGS, 10_000),
    (OFFICIAL_PROFILES, 21_600_000),
    (PARTY_STATISTICS, 3_600_000),
    (DASHBOARD_WIDGETS, 30_000),
    (ADMIN_METRICS, 60_000),
];

/// Streaming dashboards paused while the page is hidden.
pub const TAB_SENSITIVE_TASKS: [&str; 2] = [SENTIMENT_STREAMS, TREND_RADAR];

pub fn default_intervals() -> BTreeMap<String, u64> {
    DEFAULT_INTERVALS_MS
        .iter()
        .map(|(name, ms)| (name.to_string(), *ms))
        .collect()
}

pub fn default_tab_sensitive() -> BTreeSet<String> {
    TAB_SENSITIVE_TASKS.iter().map(|s| s.to_string()).collect()
}
