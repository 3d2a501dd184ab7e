use crate::errors::PulseError;

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("Unknown refresh task '{name}'")]
    UnknownTask { name: String },

    #[error("No handler registered for refresh task '{name}'")]
    NotRegistered { name: String },

    #[error("Refresh of '{name}' failed: {message}")]
    HandlerFailed { name: String, message: String },

    #[error("Invalid interval for '{name}': {interval_ms}ms")]
    InvalidInterval { name: String, interval_ms: u64 },

    #[error("Failed to save refresh config: {message}")]
    SaveFailed { message: String },

    #[error("Failed to write audit log: {message}")]
    AuditLogFailed { message: String },

    #[error("Refresh orchestrator has shut down")]
    OrchestratorStopped,
}

impl PulseError for RefreshError {
    fn error_code(&self) -> &'static str {
        match self {
            RefreshError::UnknownTask { .. } => "REFRESH_UNKNOWN_TASK",
            RefreshError::NotRegistered { .. } => "REFRESH_NOT_REGISTERED",
            RefreshError::HandlerFailed { .. } => "REFRESH_HANDLER_FAILED",
            RefreshError::InvalidInterval { .. } => "REFRESH_INVALID_INTERVAL",
            RefreshError::SaveFailed { .. } => "REFRESH_SAVE_FAILED",
            RefreshError::AuditLogFailed { .. } => "REFRESH_AUDIT_LOG_FAILED",
            RefreshError::OrchestratorStopped => "REFRESH_STOPPED",
        }
    }

    fn is_user_error(&self) -> bool {
        match self {
            RefreshError::UnknownTask { .. }
            | RefreshError::NotRegistered { .. }
            | RefreshError::InvalidInterval { .. } => true,

            RefreshError::HandlerFailed { .. }
            | RefreshError::SaveFailed { .. }
            | RefreshError::AuditLogFailed { .. }
            | RefreshError::OrchestratorStopped => false,
        }
    }
}
