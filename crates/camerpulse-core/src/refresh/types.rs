use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::defaults::{default_intervals, default_tab_sensitive};
use super::errors::RefreshError;

/// Task name -> interval in milliseconds.
///
/// Only names present in the defaults table are ever stored; everything else
/// is dropped on load and on update.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefreshConfig(BTreeMap<String, u64>);

impl RefreshConfig {
    pub fn new(intervals: BTreeMap<String, u64>) -> Self {
        Self(intervals)
    }

    pub fn interval_ms(&self, name: &str) -> Option<u64> {
        self.0.get(name).copied()
    }

    pub fn interval(&self, name: &str) -> Option<Duration> {
        self.interval_ms(name).map(Duration::from_millis)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn intervals(&self) -> &BTreeMap<String, u64> {
        &self.0
    }

    /// Merge `overrides` into this config, keeping only keys already present.
    ///
    /// Returns the names whose interval actually changed. Unknown names and
    /// zero intervals are returned as rejections instead of being applied.
    pub fn merge_known(
        &mut self,
        overrides: &BTreeMap<String, u64>,
    ) -> (Vec<String>, Vec<RefreshError>) {
        let mut changed = Vec::new();
        let mut rejected = Vec::new();

        for (name, &interval_ms) in overrides {
            let Some(current) = self.0.get_mut(name) else {
                rejected.push(RefreshError::UnknownTask { name: name.clone() });
                continue;
            };
            if interval_ms == 0 {
                rejected.push(RefreshError::InvalidInterval {
                    name: name.clone(),
                    interval_ms,
                });
                continue;
            }
            if *current != interval_ms {
                *current = interval_ms;
                changed.push(name.clone());
            }
        }

        (changed, rejected)
    }
}

/// Per-task execution record kept by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskTelemetry {
    pub last_run_at: Option<DateTime<Utc>>,
    pub run_count: u64,
    pub last_error: Option<String>,
}

/// One execution attempt, as forwarded to the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRecord {
    pub component_name: String,
    pub refresh_time: DateTime<Utc>,
    pub success: bool,
    pub error_message: Option<String>,
    pub interval_ms: u64,
}

/// `last_run_at + interval`, or `None` if the task never ran.
pub fn next_refresh_time(
    telemetry: Option<&TaskTelemetry>,
    interval_ms: u64,
) -> Option<DateTime<Utc>> {
    let last_run_at = telemetry?.last_run_at?;
    let interval = chrono::Duration::milliseconds(i64::try_from(interval_ms).ok()?);
    last_run_at.checked_add_signed(interval)
}

/// Static shape of an orchestrator: which tasks exist, their default
/// intervals, which of them pause on hidden pages, and where overrides live.
#[derive(Debug, Clone)]
pub struct RefreshSettings {
    pub defaults: BTreeMap<String, u64>,
    pub tab_sensitive: BTreeSet<String>,
    /// JSON file holding the merged config. `None` keeps it in memory only.
    pub state_file: Option<PathBuf>,
}

impl RefreshSettings {
    /// The eight CamerPulse dashboard tasks.
    pub fn camerpulse(state_file: Option<PathBuf>) -> Self {
        Self {
            defaults: default_intervals(),
            tab_sensitive: default_tab_sensitive(),
            state_file,
        }
    }

    /// Custom task table, no persistence.
    pub fn with_tasks<I, S>(tasks: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        Self {
            defaults: tasks
                .into_iter()
                .map(|(name, ms)| (name.into(), ms))
                .collect(),
            tab_sensitive: BTreeSet::new(),
            state_file: None,
        }
    }

    pub fn tab_sensitive<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tab_sensitive = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn state_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_file = Some(path.into());
        self
    }

    pub fn is_tab_sensitive(&self, name: &str) -> bool {
        self.tab_sensitive.contains(name)
    }
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self::camerpulse(None)
    }
}

/// Read-only view of the orchestrator for the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshSnapshot {
    pub is_active: bool,
    pub page_visible: bool,
    pub config: RefreshConfig,
    pub registered: Vec<String>,
    /// Tasks that currently own a running timer.
    pub live_timers: Vec<String>,
    pub telemetry: BTreeMap<String, TaskTelemetry>,
}
