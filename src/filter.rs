//! Record filter pipeline
//!
//! A record is selected when every enabled predicate accepts it. Predicates
//! only see the record, their own configuration and the per-run
//! `FilterContext`, so each one can be tested on its own.

use crate::config::WatchConfig;
use crate::record::Record;
use chrono::NaiveDate;
use regex::{Regex, RegexBuilder};
use std::collections::BTreeSet;

/// Built-in topic pattern for financial-results filings.
///
/// Leans towards recall: a missed filing costs more than a spurious alert.
pub const DEFAULT_RESULTS_PATTERN: &str = concat!(
    r"\b(?:un)?audited\b",
    r"|\bfinancial\s*results?\b",
    r"|\bresults?\b",
    r"|\b(?:quarter|half[\s-]*year|year|period|nine\s*months)\s*ended\b",
    r"|\bstandalone\b|\bconsolidated\b",
    r"|\breg(?:ulation)?\s*\.?\s*33\b",
);

/// Values fixed for the duration of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterContext {
    /// The processing date used by the recency predicate
    pub today: NaiveDate,
}

impl FilterContext {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }
}

/// A pure yes/no decision about one record.
pub trait RecordPredicate: Send + Sync {
    fn name(&self) -> &str;

    fn matches(&self, record: &Record, ctx: &FilterContext) -> bool;
}

/// Case-insensitive match over subject and headline text.
#[derive(Debug, Clone)]
pub struct TopicPredicate {
    pattern: Regex,
}

impl TopicPredicate {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self { pattern })
    }

    pub fn financial_results() -> Self {
        Self::new(DEFAULT_RESULTS_PATTERN).expect("built-in results pattern compiles")
    }
}

impl RecordPredicate for TopicPredicate {
    fn name(&self) -> &str {
        "topic"
    }

    fn matches(&self, record: &Record, _ctx: &FilterContext) -> bool {
        let text = format!("{} {}", record.subject_text, record.headline_text);
        self.pattern.is_match(&text)
    }
}

/// Entity-code membership. An empty watchlist accepts everything.
#[derive(Debug, Clone, Default)]
pub struct WatchlistPredicate {
    codes: BTreeSet<String>,
}

impl WatchlistPredicate {
    pub fn new(codes: BTreeSet<String>) -> Self {
        Self { codes }
    }
}

impl RecordPredicate for WatchlistPredicate {
    fn name(&self) -> &str {
        "watchlist"
    }

    fn matches(&self, record: &Record, _ctx: &FilterContext) -> bool {
        if self.codes.is_empty() {
            return true;
        }
        record
            .entity_code
            .as_deref()
            .map(|code| self.codes.contains(code.trim()))
            .unwrap_or(false)
    }
}

/// Accepts records dated on the processing date.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecencyPredicate;

impl RecordPredicate for RecencyPredicate {
    fn name(&self) -> &str {
        "recency"
    }

    fn matches(&self, record: &Record, ctx: &FilterContext) -> bool {
        record
            .date_part()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .map(|d| d == ctx.today)
            .unwrap_or(false)
    }
}

/// Ordered conjunction of predicates.
#[derive(Default)]
pub struct FilterPipeline {
    predicates: Vec<Box<dyn RecordPredicate>>,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, predicate: impl RecordPredicate + 'static) -> Self {
        self.predicates.push(Box::new(predicate));
        self
    }

    /// Watchlist, topic, and (when enabled) recency, in that order.
    pub fn from_config(config: &WatchConfig) -> Self {
        let mut pipeline = Self::new()
            .with(WatchlistPredicate::new(config.watchlist.clone()))
            .with(config.topic.clone());
        if config.recency_filter {
            pipeline = pipeline.with(RecencyPredicate);
        }
        pipeline
    }

    pub fn predicate_names(&self) -> Vec<&str> {
        self.predicates.iter().map(|p| p.name()).collect()
    }

    pub fn passes(&self, record: &Record, ctx: &FilterContext) -> bool {
        self.predicates.iter().all(|p| p.matches(record, ctx))
    }

    /// Keep passing records, preserving order.
    pub fn apply(&self, records: Vec<Record>, ctx: &FilterContext) -> Vec<Record> {
        records.into_iter().filter(|r| self.passes(r, ctx)).collect()
    }
}
