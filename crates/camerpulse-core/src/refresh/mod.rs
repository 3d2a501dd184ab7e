//! Periodic dashboard refresh scheduling.
//!
//! [`RefreshOrchestrator`] owns one timer per registered task. Intervals come
//! from [`RefreshSettings::defaults`] merged with overrides stored as a flat
//! JSON object (see [`persistence`]). Every execution attempt updates the
//! task's [`TaskTelemetry`] and is mirrored to a [`TelemetrySink`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use camerpulse_core::refresh::{
//!     AuditLogSink, RefreshOrchestrator, RefreshSettings, handler_fn,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = RefreshSettings::camerpulse(camerpulse_core::refresh::default_state_file());
//! let orchestrator =
//!     RefreshOrchestrator::spawn(settings, Arc::new(AuditLogSink::new("refresh.jsonl")));
//!
//! orchestrator
//!     .register_component("trend_radar", handler_fn(|| async { Ok(()) }))
//!     .await?;
//! orchestrator.set_page_visible(false).await?;
//! # Ok(())
//! # }
//! ```

pub mod defaults;
pub mod errors;
pub mod handler;
pub mod orchestrator;
pub mod persistence;
pub mod telemetry;
pub mod types;

pub use errors::RefreshError;
pub use handler::{FnHandler, HandlerError, RefreshHandler, handler_fn};
pub use orchestrator::RefreshOrchestrator;
pub use persistence::{clear_config, default_state_file, load_config, save_config};
pub use telemetry::{AuditLogSink, NoopSink, TelemetrySink, read_audit_log};
pub use types::{
    RefreshConfig, RefreshRecord, RefreshSettings, RefreshSnapshot, TaskTelemetry,
    next_refresh_time,
};
