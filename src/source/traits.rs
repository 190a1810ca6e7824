//! Record source contract

use crate::record::RawRecord;
use async_trait::async_trait;
use thiserror::Error;

/// Errors from fetching one page. All of them are treated as transient:
/// pagination stops and already-fetched pages are still processed.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request for page {page} failed: {message}")]
    Transport { page: u32, message: String },

    #[error("page {page} returned HTTP {status}: {body}")]
    Status { page: u32, status: u16, body: String },

    #[error("page {page} could not be decoded: {message}")]
    Decode { page: u32, message: String },

    #[error("page {page} timed out after {seconds}s")]
    Timeout { page: u32, seconds: u64 },

    #[error("source error: {0}")]
    Internal(String),
}

/// A paginated upstream feed of disclosure rows.
///
/// Abstracts over transport (HTTP, scripted) so the pipeline does not
/// depend on how records are reached.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Short name used in logs
    fn id(&self) -> &str;

    /// Nominal rows per page. A shorter page means end of stream.
    fn page_size(&self) -> usize;

    /// Fetch one page, numbered from 1.
    async fn fetch_page(&self, page: u32) -> Result<Vec<RawRecord>, SourceError>;
}
