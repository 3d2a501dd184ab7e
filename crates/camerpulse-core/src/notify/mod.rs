//! Desktop notifications mirroring channel toasts.
//!
//! Delivery is best-effort. Failures are logged and never reach the channel.

use std::process::Command;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::channel::protocol::{NotificationEvent, NotificationKind};
use crate::channel::types::Toast;

/// Title shown for an event, falling back to the kind label.
pub fn notification_title(event: &NotificationEvent) -> String {
    match &event.title {
        Some(title) if !title.is_empty() => title.clone(),
        _ => event.kind.label().to_string(),
    }
}

/// Body shown for an event.
pub fn notification_message(event: &NotificationEvent) -> String {
    match (&event.message, &event.resource_id) {
        (Some(message), _) if !message.is_empty() => message.clone(),
        (_, Some(resource_id)) => format!("Tender {}", resource_id),
        _ => String::from("New activity on CamerPulse"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Normal,
    Critical,
}

impl Urgency {
    pub fn for_kind(kind: NotificationKind) -> Self {
        match kind {
            NotificationKind::DeadlineWarning | NotificationKind::SystemAlert => Urgency::Critical,
            _ => Urgency::Normal,
        }
    }

    fn as_notify_send_arg(self) -> &'static str {
        match self {
            Urgency::Normal => "normal",
            Urgency::Critical => "critical",
        }
    }
}

/// An OS-level notification built from a toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopNotification {
    pub title: String,
    pub message: String,
    pub urgency: Urgency,
    pub expire: Duration,
}

impl DesktopNotification {
    pub fn from_toast(toast: &Toast, kind: NotificationKind) -> Self {
        Self {
            title: toast.title.clone(),
            message: toast.description.clone(),
            urgency: Urgency::for_kind(kind),
            expire: toast.duration,
        }
    }

    /// Hand the notification to the platform notifier. Blocks on a child
    /// process, so call it from `spawn_blocking` inside async code.
    pub fn send(&self) {
        info!(
            event = "core.notify.send_started",
            title = %self.title,
            urgency = ?self.urgency,
        );

        let Some(mut command) = self.platform_command() else {
            return;
        };

        match command.output() {
            Ok(output) if output.status.success() => {
                info!(event = "core.notify.send_completed", title = %self.title);
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                warn!(
                    event = "core.notify.send_failed",
                    title = %self.title,
                    stderr = %stderr,
                );
            }
            Err(e) => {
                warn!(
                    event = "core.notify.send_failed",
                    title = %self.title,
                    error = %e,
                );
            }
        }
    }

    #[cfg(target_os = "linux")]
    fn platform_command(&self) -> Option<Command> {
        if let Err(e) = which::which("notify-send") {
            debug!(
                event = "core.notify.send_skipped",
                reason = "notify-send not found",
                error = %e,
            );
            return None;
        }

        let mut command = Command::new("notify-send");
        command
            .arg("--app-name=CamerPulse")
            .arg(format!("--urgency={}", self.urgency.as_notify_send_arg()))
            .arg(format!("--expire-time={}", self.expire.as_millis()))
            .arg(&self.title)
            .arg(&self.message);
        Some(command)
    }

    #[cfg(target_os = "macos")]
    fn platform_command(&self) -> Option<Command> {
        let mut script = format!(
            r#"display notification "{}" with title "CamerPulse" subtitle "{}""#,
            applescript_escape(&self.message),
            applescript_escape(&self.title)
        );
        // Notification Center has no expiry; critical ones get a sound instead.
        if self.urgency == Urgency::Critical {
            script.push_str(r#" sound name "Glass""#);
        }

        let mut command = Command::new("osascript");
        command.arg("-e").arg(script);
        Some(command)
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    fn platform_command(&self) -> Option<Command> {
        debug!(
            event = "core.notify.send_skipped",
            reason = "unsupported platform",
        );
        None
    }
}

#[cfg(target_os = "macos")]
fn applescript_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
