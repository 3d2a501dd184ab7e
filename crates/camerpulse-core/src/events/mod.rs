//! App-level lifecycle events shared by every CamerPulse entry point.

use tracing::{error, info, warn};

use crate::channel::ChannelSignal;

pub fn log_app_startup(command: &str) {
    info!(
        event = "core.app.startup_completed",
        version = env!("CARGO_PKG_VERSION"),
        command = command,
    );
}

pub fn log_app_shutdown(command: &str) {
    info!(event = "core.app.shutdown_started", command = command);
}

pub fn log_app_error(error: &dyn std::error::Error) {
    error!(
        event = "core.app.error_occurred",
        error = %error,
        error_type = std::any::type_name_of_val(error)
    );
}

/// Structured log line for a signal surfaced to a channel consumer.
pub fn log_channel_signal(signal: &ChannelSignal) {
    match signal {
        ChannelSignal::StateChanged(state) => {
            info!(event = "core.app.channel_state_changed", state = %state);
        }
        ChannelSignal::Notification { event, toast } => {
            info!(
                event = "core.app.notification_displayed",
                kind = %event.kind,
                resource_id = event.resource_id.as_deref().unwrap_or(""),
                toast_ms = toast.duration.as_millis() as u64,
            );
        }
        ChannelSignal::ConnectionLost { attempts } => {
            warn!(event = "core.app.channel_given_up", attempts = attempts);
        }
    }
}
