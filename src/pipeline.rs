//! One ingestion cycle
//!
//! load watermark → fetch → normalize → select unseen → filter → cap →
//! deliver → advance watermark.
//!
//! Only records with an upstream ID take part in deduplication. Fallback
//! IDs are positional within one run, so those records are skipped and
//! never move the watermark.
//!
//! A run never aborts half way. Page errors end pagination but keep what
//! was fetched, delivery errors are counted, and a failed watermark save
//! is reported; the next run then reprocesses from the old watermark.

use crate::config::WatchConfig;
use crate::error::WatchError;
use crate::filter::{FilterContext, FilterPipeline};
use crate::limiter::DeliveryLimiter;
use crate::normalize::IdNormalizer;
use crate::notify::{render_alert, render_overflow, Notifier, NotifyError};
use crate::record::{IdOrigin, Record};
use crate::source::{fetch_all, RecordSource};
use crate::watermark::{RunLock, WatermarkStore};
use chrono::{Local, NaiveDate};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Terminal state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing fetched; watermark untouched
    Empty,
    /// First run: watermark seeded, nothing sent
    Bootstrapped,
    /// Records fetched but none had an upstream ID; watermark untouched
    Unidentified,
    /// Normal run: unseen matches delivered, watermark advanced
    Advanced,
}

/// What a run did, for logs and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub pages_fetched: u32,
    /// Normalized records fetched this run
    pub fetched: usize,
    /// Fetched records skipped for lack of an upstream ID
    pub unidentified: usize,
    pub unseen: usize,
    /// Unseen records that passed every filter
    pub matched: usize,
    /// Alerts delivered successfully
    pub sent: usize,
    /// Alerts whose delivery failed
    pub failed: usize,
    /// Matches beyond the per-run cap
    pub withheld: usize,
    pub summary_sent: bool,
    /// Watermark at run start
    pub previous_watermark: Option<i64>,
    /// Watermark this run settled on (persisted unless `save_error` is set)
    pub watermark: Option<i64>,
    /// Sequence IDs handed to the notifier, in order
    pub delivered_ids: Vec<i64>,
    pub fetch_error: Option<String>,
    pub save_error: Option<String>,
}

impl RunReport {
    fn new(outcome: RunOutcome, previous_watermark: Option<i64>) -> Self {
        Self {
            outcome,
            pages_fetched: 0,
            fetched: 0,
            unidentified: 0,
            unseen: 0,
            matched: 0,
            sent: 0,
            failed: 0,
            withheld: 0,
            summary_sent: false,
            previous_watermark,
            watermark: previous_watermark,
            delivered_ids: Vec::new(),
            fetch_error: None,
            save_error: None,
        }
    }
}

/// Composes source, filters, cap, notifier and watermark into runs.
pub struct WatchPipeline {
    config: Arc<WatchConfig>,
    source: Arc<dyn RecordSource>,
    store: Arc<dyn WatermarkStore>,
    notifier: Arc<dyn Notifier>,
    normalizer: IdNormalizer,
    filters: FilterPipeline,
    limiter: DeliveryLimiter,
    lock_path: Option<PathBuf>,
}

impl WatchPipeline {
    pub fn new(
        config: Arc<WatchConfig>,
        source: Arc<dyn RecordSource>,
        store: Arc<dyn WatermarkStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            normalizer: IdNormalizer::new(config.id_fields.clone()),
            filters: FilterPipeline::from_config(&config),
            limiter: DeliveryLimiter::new(config.max_notifications),
            config,
            source,
            store,
            notifier,
            lock_path: None,
        }
    }

    /// Hold an exclusive lock on `path` for the duration of `run()`.
    pub fn with_lock(mut self, path: impl Into<PathBuf>) -> Self {
        self.lock_path = Some(path.into());
        self
    }

    /// Replace the filter set built from the configuration.
    pub fn with_filters(mut self, filters: FilterPipeline) -> Self {
        self.filters = filters;
        self
    }

    /// Run one cycle dated today, under the run lock when one is set.
    pub async fn run(&self) -> Result<RunReport, WatchError> {
        let _guard = match &self.lock_path {
            Some(path) => Some(RunLock::try_acquire(path)?),
            None => None,
        };
        Ok(self.run_once_at(Local::now().date_naive()).await)
    }

    /// Run one cycle with `today` as the processing date. Never fails;
    /// every component error ends up in the report.
    pub async fn run_once_at(&self, today: NaiveDate) -> RunReport {
        let load = self.store.load();
        if load.corrupt {
            warn!("watermark unreadable; treating as absent");
        }
        let previous = load.last_sequence_id;
        let mut report = RunReport::new(RunOutcome::Empty, previous);

        let fetch = fetch_all(
            self.source.as_ref(),
            self.config.max_pages,
            self.config.request_timeout,
        )
        .await;
        report.pages_fetched = fetch.pages_fetched;
        report.fetch_error = fetch.error.as_ref().map(|e| e.to_string());

        if fetch.records.is_empty() {
            info!(source = self.source.id(), pages = fetch.pages_fetched, "no announcements fetched");
            return report;
        }

        let normalized = self.normalizer.normalize(fetch.records, &self.config.fields);
        report.fetched = normalized.len();
        let (records, unidentified): (Vec<Record>, Vec<Record>) = normalized
            .into_iter()
            .partition(|r| matches!(r.id_origin, IdOrigin::Upstream(_)));
        report.unidentified = unidentified.len();
        if !unidentified.is_empty() {
            warn!(
                unidentified = unidentified.len(),
                total = report.fetched,
                id_fields = ?self.normalizer.candidates(),
                "records without a usable upstream ID cannot be deduplicated across runs; skipping them"
            );
        }

        let newest = match records.iter().map(|r| r.sequence_id).max() {
            Some(id) => id,
            None => {
                report.outcome = RunOutcome::Unidentified;
                warn!("no fetched record carries an upstream ID; watermark left unchanged");
                return report;
            }
        };
        info!(fetched = records.len(), pages = fetch.pages_fetched, newest, "fetched announcements");

        if load.is_absent() && self.config.bootstrap_if_empty {
            report.outcome = RunOutcome::Bootstrapped;
            self.advance(&mut report, newest);
            info!(watermark = newest, "bootstrap: recorded watermark, sent 0 alerts");
            return report;
        }

        report.outcome = RunOutcome::Advanced;
        let baseline = previous.unwrap_or(-1);
        let unseen: Vec<Record> = records.into_iter().filter(|r| r.sequence_id > baseline).collect();
        report.unseen = unseen.len();

        let matched = self.filters.apply(unseen, &FilterContext::new(today));
        report.matched = matched.len();

        let batch = self.limiter.cap(matched);
        report.withheld = batch.withheld;

        for record in &batch.selected {
            debug!(sequence_id = record.sequence_id, subject = %record.subject_text, "delivering alert");
            report.delivered_ids.push(record.sequence_id);
            match self.deliver(&render_alert(record)).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    warn!(sequence_id = record.sequence_id, error = %e, "alert delivery failed");
                    report.failed += 1;
                }
            }
        }

        if batch.withheld > 0 {
            warn!(
                withheld = batch.withheld,
                cap = self.limiter.max_per_run(),
                "delivery cap reached; withheld matches will not be retried"
            );
            if self.config.summary_on_overflow {
                match self.deliver(&render_overflow(batch.withheld)).await {
                    Ok(()) => report.summary_sent = true,
                    Err(e) => warn!(error = %e, "overflow summary delivery failed"),
                }
            }
        }

        let target = match previous {
            Some(prev) if newest < prev => {
                warn!(newest, previous = prev, "fetched IDs are below the watermark; keeping it");
                prev
            }
            _ => newest,
        };
        self.advance(&mut report, target);

        info!(
            sent = report.sent,
            failed = report.failed,
            truncated = report.withheld,
            unseen = report.unseen,
            matched = report.matched,
            watermark = target,
            "run complete"
        );
        report
    }

    async fn deliver(&self, text: &str) -> Result<(), NotifyError> {
        let timeout = self.config.request_timeout;
        match tokio::time::timeout(timeout, self.notifier.send(text)).await {
            Ok(result) => result,
            Err(_) => Err(NotifyError::Timeout(timeout.as_secs())),
        }
    }

    fn advance(&self, report: &mut RunReport, sequence_id: i64) {
        match self.store.save(sequence_id) {
            Ok(()) => report.watermark = Some(sequence_id),
            Err(e) => {
                warn!(sequence_id, error = %e, "failed to save watermark; next run will reprocess");
                report.save_error = Some(e.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingNotifier;
    use crate::record::RawRecord;
    use crate::source::ScriptedSource;
    use crate::watermark::MemoryWatermarkStore;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 7).unwrap()
    }

    fn result_row(id: i64) -> RawRecord {
        RawRecord::new()
            .with("S_NO", id)
            .with("NEWSSUB", format!("Co{} Ltd - Financial Results", id))
            .with("SCRIP_CD", 500000 + id)
            .with("NEWS_DT", "2025-11-07T10:00:00")
    }

    fn pipeline(
        rows: Vec<RawRecord>,
        store: Arc<MemoryWatermarkStore>,
        notifier: Arc<RecordingNotifier>,
        config: WatchConfig,
    ) -> WatchPipeline {
        let source = Arc::new(ScriptedSource::from_rows(config.page_size, rows));
        WatchPipeline::new(Arc::new(config), source, store, notifier)
    }

    #[tokio::test]
    async fn corrupt_watermark_bootstraps() {
        let store = Arc::new(MemoryWatermarkStore::corrupt());
        let notifier = Arc::new(RecordingNotifier::new());
        let p = pipeline(vec![result_row(4), result_row(8)], store.clone(), notifier.clone(), WatchConfig::default());

        let report = p.run_once_at(today()).await;
        assert_eq!(report.outcome, RunOutcome::Bootstrapped);
        assert_eq!(store.saves(), vec![8]);
        assert!(notifier.attempts().is_empty());
    }

    #[tokio::test]
    async fn bootstrap_disabled_treats_everything_as_unseen() {
        let store = Arc::new(MemoryWatermarkStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let config = WatchConfig {
            bootstrap_if_empty: false,
            ..WatchConfig::default()
        };
        let p = pipeline(vec![result_row(0), result_row(1)], store.clone(), notifier.clone(), config);

        let report = p.run_once_at(today()).await;
        assert_eq!(report.outcome, RunOutcome::Advanced);
        assert_eq!(report.delivered_ids, vec![0, 1]);
        assert_eq!(store.saves(), vec![1]);
    }

    #[tokio::test]
    async fn delivery_failure_does_not_block_later_alerts_or_advance() {
        let store = Arc::new(MemoryWatermarkStore::starting_at(0));
        let notifier = Arc::new(RecordingNotifier::new().with_failure_on(0));
        let p = pipeline(vec![result_row(1), result_row(2)], store.clone(), notifier.clone(), WatchConfig::default());

        let report = p.run_once_at(today()).await;
        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(notifier.attempts().len(), 2);
        assert_eq!(store.saves(), vec![2]);
    }

    #[tokio::test]
    async fn save_failure_is_reported_not_fatal() {
        let store = Arc::new(MemoryWatermarkStore::starting_at(0));
        store.fail_saves(true);
        let notifier = Arc::new(RecordingNotifier::new());
        let p = pipeline(vec![result_row(1)], store.clone(), notifier.clone(), WatchConfig::default());

        let report = p.run_once_at(today()).await;
        assert_eq!(report.sent, 1);
        assert!(report.save_error.is_some());
        assert_eq!(report.watermark, Some(0));
    }

    #[tokio::test]
    async fn watermark_never_moves_backwards() {
        let store = Arc::new(MemoryWatermarkStore::starting_at(50));
        let notifier = Arc::new(RecordingNotifier::new());
        let p = pipeline(vec![result_row(3), result_row(4)], store.clone(), notifier.clone(), WatchConfig::default());

        let report = p.run_once_at(today()).await;
        assert_eq!(report.unseen, 0);
        assert_eq!(report.watermark, Some(50));
        assert_eq!(store.saves(), vec![50]);
    }

    #[tokio::test]
    async fn overflow_summary_can_be_disabled() {
        let store = Arc::new(MemoryWatermarkStore::starting_at(0));
        let notifier = Arc::new(RecordingNotifier::new());
        let config = WatchConfig {
            max_notifications: 1,
            summary_on_overflow: false,
            ..WatchConfig::default()
        };
        let p = pipeline((1..=3).map(result_row).collect(), store, notifier.clone(), config);

        let report = p.run_once_at(today()).await;
        assert_eq!(report.withheld, 2);
        assert!(!report.summary_sent);
        assert_eq!(notifier.attempts().len(), 1);
    }

    #[tokio::test]
    async fn fallback_records_are_skipped_and_never_saved() {
        let store = Arc::new(MemoryWatermarkStore::starting_at(4));
        let notifier = Arc::new(RecordingNotifier::new());
        let unnumbered = RawRecord::new()
            .with("NEWSSUB", "Loose Ltd - Financial Results")
            .with("NEWS_DT", "2025-11-07T10:00:00");
        let rows = vec![unnumbered.clone(), result_row(5), unnumbered, result_row(6)];
        let p = pipeline(rows, store.clone(), notifier.clone(), WatchConfig::default());

        let report = p.run_once_at(today()).await;
        assert_eq!(report.outcome, RunOutcome::Advanced);
        assert_eq!(report.fetched, 4);
        assert_eq!(report.unidentified, 2);
        assert_eq!(report.delivered_ids, vec![5, 6]);
        assert_eq!(store.saves(), vec![6]);
    }

    #[tokio::test]
    async fn batch_without_upstream_ids_does_not_bootstrap() {
        let store = Arc::new(MemoryWatermarkStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let rows = (0..3)
            .map(|i| RawRecord::new().with("NEWSID", format!("g{}", i)).with("NEWSSUB", "X - Results"))
            .collect();
        let p = pipeline(rows, store.clone(), notifier.clone(), WatchConfig::default());

        let report = p.run_once_at(today()).await;
        assert_eq!(report.outcome, RunOutcome::Unidentified);
        assert_eq!(report.unidentified, 3);
        assert_eq!(report.watermark, None);
        assert!(store.saves().is_empty());
        assert!(notifier.attempts().is_empty());
    }

    #[tokio::test]
    async fn stale_records_are_filtered_by_recency() {
        let store = Arc::new(MemoryWatermarkStore::starting_at(0));
        let notifier = Arc::new(RecordingNotifier::new());
        let stale = result_row(2).with("NEWS_DT", "2025-11-06T10:00:00");
        let p = pipeline(vec![result_row(1), stale], store, notifier.clone(), WatchConfig::default());

        let report = p.run_once_at(today()).await;
        assert_eq!(report.unseen, 2);
        assert_eq!(report.delivered_ids, vec![1]);
    }
}
