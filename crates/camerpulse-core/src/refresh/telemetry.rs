use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::errors::RefreshError;
use super::types::RefreshRecord;

/// Destination for per-execution records.
///
/// Delivery is fire-and-forget from the orchestrator's point of view: a
/// returned error is logged and nothing else happens.
#[async_trait]
pub trait TelemetrySink: Send + Sync + 'static {
    async fn record(&self, record: &RefreshRecord) -> Result<(), RefreshError>;
}

/// Discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

#[async_trait]
impl TelemetrySink for NoopSink {
    async fn record(&self, _record: &RefreshRecord) -> Result<(), RefreshError> {
        Ok(())
    }
}

/// Append-only JSON Lines audit log.
#[derive(Debug, Clone)]
pub struct AuditLogSink {
    path: PathBuf,
}

impl AuditLogSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TelemetrySink for AuditLogSink {
    async fn record(&self, record: &RefreshRecord) -> Result<(), RefreshError> {
        let mut line = serde_json::to_string(record).map_err(|e| RefreshError::AuditLogFailed {
            message: e.to_string(),
        })?;
        line.push('\n');

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RefreshError::AuditLogFailed {
                    message: format!("{}: {}", parent.display(), e),
                })?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| RefreshError::AuditLogFailed {
                message: format!("{}: {}", self.path.display(), e),
            })?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| RefreshError::AuditLogFailed {
                message: format!("{}: {}", self.path.display(), e),
            })?;
        file.flush().await.map_err(|e| RefreshError::AuditLogFailed {
            message: format!("{}: {}", self.path.display(), e),
        })?;

        Ok(())
    }
}

/// Read the last `limit` records from an audit log. Unparsable lines are skipped.
pub fn read_audit_log(path: &Path, limit: usize) -> Result<Vec<RefreshRecord>, RefreshError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(RefreshError::AuditLogFailed {
                message: format!("{}: {}", path.display(), e),
            });
        }
    };

    let records: Vec<RefreshRecord> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str(line) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!(
                    event = "core.refresh.audit_line_skipped",
                    path = %path.display(),
                    error = %e
                );
                None
            }
        })
        .collect();

    let skip = records.len().saturating_sub(limit);
    Ok(records.into_iter().skip(skip).collect())
}
