//! Shared fixtures for pipeline integration tests

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use filingwatch::{
    FileWatermarkStore, RawRecord, RecordingNotifier, ScriptedSource, WatchConfig, WatchPipeline,
};
use std::path::Path;
use std::sync::Arc;

pub const PAGE_SIZE: usize = 10;

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 7).unwrap()
}

/// A same-day row that passes the topic filter.
pub fn results_row(id: i64, code: &str) -> RawRecord {
    RawRecord::new()
        .with("S_NO", id)
        .with(
            "NEWSSUB",
            format!("Company {} Ltd - Unaudited Financial Results for Quarter Ended Sept 2025", id),
        )
        .with("SCRIP_CD", code)
        .with("NEWS_DT", "2025-11-07T16:35:12.53")
        .with("ATTACHMENTNAME", format!("{}.pdf", id))
}

/// A same-day row that fails the topic filter.
pub fn noise_row(id: i64) -> RawRecord {
    RawRecord::new()
        .with("S_NO", id)
        .with("NEWSSUB", format!("Company {} Ltd - Outcome of Board Meeting", id))
        .with("SCRIP_CD", "999999")
        .with("NEWS_DT", "2025-11-07T09:00:00")
}

/// A results row shaped like the live BSE feed: GUID `NEWSID`, no serial
/// number, dissemination time in `DissemDT`.
pub fn bse_row(news_id: &str, company: &str, code: &str, dissem: &str) -> RawRecord {
    RawRecord::new()
        .with("NEWSID", news_id)
        .with("NEWSSUB", format!("{} Ltd - Financial Results for Quarter Ended Sept 2025", company))
        .with("SCRIP_CD", code)
        .with("NEWS_DT", dissem)
        .with("DissemDT", dissem)
}

/// A results row with no field the default ID candidates recognise.
pub fn unnumbered_row(news_id: &str, company: &str) -> RawRecord {
    RawRecord::new()
        .with("NEWSID", news_id)
        .with("NEWSSUB", format!("{} Ltd - Financial Results for Quarter Ended Sept 2025", company))
        .with("SCRIP_CD", "500325")
        .with("NEWS_DT", "2025-11-07T16:35:12.53")
}

/// Sequence ID the normalizer derives from a `DissemDT` value.
pub fn dissem_id(dissem: &str) -> i64 {
    NaiveDateTime::parse_from_str(dissem, "%Y-%m-%dT%H:%M:%S%.f")
        .unwrap()
        .and_utc()
        .timestamp_millis()
}

pub fn config(state: &Path) -> WatchConfig {
    WatchConfig::default().with_state_path(state)
}

pub struct Harness {
    pub pipeline: WatchPipeline,
    pub source: Arc<ScriptedSource>,
    pub notifier: Arc<RecordingNotifier>,
    pub store: Arc<FileWatermarkStore>,
}

pub fn harness(config: WatchConfig, source: ScriptedSource) -> Harness {
    let source = Arc::new(source);
    let notifier = Arc::new(RecordingNotifier::new());
    let store = Arc::new(FileWatermarkStore::new(&config.state_path));
    let pipeline = WatchPipeline::new(
        Arc::new(config),
        source.clone(),
        store.clone(),
        notifier.clone(),
    );
    Harness {
        pipeline,
        source,
        notifier,
        store,
    }
}

pub fn rows_source(rows: Vec<RawRecord>) -> ScriptedSource {
    ScriptedSource::from_rows(PAGE_SIZE, rows)
}
