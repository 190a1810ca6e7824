//! Sequential page walk with partial-progress semantics

use super::traits::{RecordSource, SourceError};
use crate::record::RawRecord;
use std::time::Duration;
use tracing::{debug, warn};

/// Everything one run managed to fetch.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Rows in fetch order (page 1 first)
    pub records: Vec<RawRecord>,
    /// Pages that returned successfully
    pub pages_fetched: u32,
    /// The error that cut pagination short, if any
    pub error: Option<SourceError>,
}

/// Walk pages 1..=max_pages, stopping at the first short page or error.
///
/// Each call is bounded by `timeout`; a timeout counts as a page error.
pub async fn fetch_all(source: &dyn RecordSource, max_pages: u32, timeout: Duration) -> FetchOutcome {
    let mut outcome = FetchOutcome::default();
    let page_size = source.page_size();

    for page in 1..=max_pages {
        let rows = match tokio::time::timeout(timeout, source.fetch_page(page)).await {
            Ok(Ok(rows)) => rows,
            Ok(Err(e)) => {
                warn!(source = source.id(), page, error = %e, "page fetch failed; keeping earlier pages");
                outcome.error = Some(e);
                break;
            }
            Err(_) => {
                let e = SourceError::Timeout {
                    page,
                    seconds: timeout.as_secs(),
                };
                warn!(source = source.id(), page, error = %e, "page fetch timed out; keeping earlier pages");
                outcome.error = Some(e);
                break;
            }
        };

        outcome.pages_fetched += 1;
        let count = rows.len();
        debug!(source = source.id(), page, rows = count, "fetched page");
        outcome.records.extend(rows);

        if count < page_size {
            break;
        }
    }

    outcome
}
