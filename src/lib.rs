//! filingwatch: incremental watcher for financial-results disclosures
//!
//! Polls a paginated announcement feed, keeps the records that look like
//! financial-results filings for watched entities, and sends one alert per
//! new record. A persisted watermark makes repeated runs safe: a record is
//! never alerted twice, and a per-run cap keeps the channel from flooding.
//!
//! # Core Concepts
//!
//! - **Watermark**: highest sequence ID processed so far, persisted atomically
//! - **Bootstrap**: the first run seeds the watermark without alerting
//! - **Delivery cap**: at most N alerts per run, oldest first
//!
//! # Example
//!
//! ```
//! use filingwatch::{MemoryWatermarkStore, RecordingNotifier, ScriptedSource, WatchConfig, WatchPipeline};
//! use std::sync::Arc;
//!
//! let pipeline = WatchPipeline::new(
//!     Arc::new(WatchConfig::default()),
//!     Arc::new(ScriptedSource::new(10)),
//!     Arc::new(MemoryWatermarkStore::new()),
//!     Arc::new(RecordingNotifier::new()),
//! );
//! // Pipeline is ready to run
//! ```

pub mod config;
mod error;
pub mod filter;
pub mod limiter;
pub mod normalize;
pub mod notify;
mod pipeline;
pub mod record;
pub mod source;
pub mod watermark;

pub use config::{ConfigError, TelegramCredentials, WatchConfig};
pub use error::WatchError;
pub use filter::{FilterContext, FilterPipeline, RecordPredicate};
pub use limiter::{CappedBatch, DeliveryLimiter};
pub use normalize::IdNormalizer;
pub use notify::{DisabledNotifier, Notifier, NotifyError, RecordingNotifier, TelegramNotifier};
pub use pipeline::{RunOutcome, RunReport, WatchPipeline};
pub use record::{FieldMap, IdOrigin, RawRecord, Record};
pub use source::{BseSource, RecordSource, ScriptedSource, SourceError};
pub use watermark::{FileWatermarkStore, MemoryWatermarkStore, RunLock, WatermarkLoad, WatermarkStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
