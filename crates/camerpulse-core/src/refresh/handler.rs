use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

/// Error type handlers report. Only its display text is kept.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A unit of periodic work the orchestrator can run.
#[async_trait]
pub trait RefreshHandler: Send + Sync + 'static {
    async fn execute(&self) -> Result<(), HandlerError>;
}

/// Adapter that turns an async closure into a [`RefreshHandler`].
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> RefreshHandler for FnHandler<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn execute(&self) -> Result<(), HandlerError> {
        (self.0)().await
    }
}

/// Wrap an async closure as a shareable handler.
///
/// ```rust
/// use camerpulse_core::refresh::handler_fn;
///
/// let handler = handler_fn(|| async { Ok(()) });
/// # drop(handler);
/// ```
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn RefreshHandler>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}
