//! Notifier contract

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

/// Errors from delivering one message. Never fatal to a run.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("delivery request failed: {0}")]
    Transport(String),

    #[error("notifier rejected message with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("delivery timed out after {0}s")]
    Timeout(u64),

    #[error("notifier error: {0}")]
    Internal(String),
}

/// Outbound channel for plain-text messages.
///
/// One call per message; the pipeline never retries.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short name used in logs
    fn id(&self) -> &str;

    async fn send(&self, text: &str) -> Result<(), NotifyError>;
}

/// Stand-in used when no credentials are configured. Logs and succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    fn id(&self) -> &str {
        "disabled"
    }

    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        warn!(chars = text.chars().count(), "notifier not configured; skipping send");
        Ok(())
    }
}
