//! Sequence ID assignment
//!
//! Upstream identifier fields change name and type between feed versions,
//! so resolution is a priority list of candidate fields rather than code.
//! A candidate holding an ISO date-time resolves to its epoch milliseconds,
//! which is how the BSE feed (GUID `NEWSID`, no serial number) gets a stable
//! ordering key from `DissemDT`. Rows with no parseable identifier get a
//! run-local fallback number and are never dropped.

use crate::record::{FieldMap, IdOrigin, RawRecord, Record};
use chrono::NaiveDateTime;
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

pub const DEFAULT_ID_FIELDS: [&str; 4] = ["S_NO", "SEQ_NO", "id", "DissemDT"];

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Assigns strictly comparable sequence IDs to a fetched batch.
#[derive(Debug, Clone)]
pub struct IdNormalizer {
    candidates: Vec<String>,
}

impl Default for IdNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_ID_FIELDS.iter().map(|s| s.to_string()).collect())
    }
}

impl IdNormalizer {
    pub fn new(candidates: Vec<String>) -> Self {
        Self { candidates }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// First candidate field whose value parses as an integer or date-time.
    pub fn resolve(&self, raw: &RawRecord) -> Option<(i64, String)> {
        self.candidates
            .iter()
            .find_map(|field| raw.get(field).and_then(parse_id).map(|id| (id, field.clone())))
    }

    /// Normalize one fetched batch, given in fetch order.
    ///
    /// Fallback numbers start at 1, follow fetch order, and skip values an
    /// upstream ID already holds. A row repeating an earlier row's ID, subject
    /// and entity code is dropped. The result is sorted ascending by
    /// `sequence_id`.
    pub fn normalize(&self, batch: Vec<RawRecord>, fields: &FieldMap) -> Vec<Record> {
        let resolved: Vec<Option<(i64, String)>> = batch.iter().map(|raw| self.resolve(raw)).collect();
        let claimed: HashSet<i64> = resolved.iter().flatten().map(|(id, _)| *id).collect();

        let mut seen = HashSet::with_capacity(batch.len());
        let mut next_fallback: i64 = 1;
        let mut records = Vec::with_capacity(batch.len());

        for (raw, resolved) in batch.into_iter().zip(resolved) {
            let (sequence_id, origin) = match resolved {
                Some((id, field)) => (id, IdOrigin::Upstream(field)),
                None => {
                    while claimed.contains(&next_fallback) {
                        next_fallback += 1;
                    }
                    let id = next_fallback;
                    next_fallback += 1;
                    (id, IdOrigin::Fallback)
                }
            };

            let key = (sequence_id, raw.text(&fields.subject), raw.text(&fields.entity_code));
            if !seen.insert(key) {
                debug!(sequence_id, "dropping repeated upstream row");
                continue;
            }
            records.push(Record::from_raw(raw, sequence_id, origin, fields));
        }

        records.sort_by_key(|r| r.sequence_id);
        records
    }
}

fn parse_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral_f64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| parse_timestamp_id(s))
        }
        _ => None,
    }
}

/// Integral floats inside the `i64` range. `i64::MAX as f64` rounds up to
/// 2^63, hence the exclusive upper bound.
fn integral_f64(f: f64) -> Option<i64> {
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn parse_timestamp_id(s: &str) -> Option<i64> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.and_utc().timestamp_millis())
}
