//! Disclosure records
//!
//! A `RawRecord` is exactly what the upstream feed returned for one row.
//! A `Record` is the normalized view the filters and notifier work on,
//! built once the ID normalizer has assigned a `sequence_id`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One upstream row, kept as an untyped JSON object.
///
/// Field names and value types drift between feed versions, so nothing is
/// interpreted until a `FieldMap` says where to look.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field setter, mostly for tests and scripted sources.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Text view of a field. Numbers are rendered, null and empty strings
    /// read as absent.
    pub fn text(&self, key: &str) -> Option<String> {
        let text = match self.0.get(key)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Where each record attribute lives in a raw row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    pub subject: String,
    pub headline: String,
    pub entity_code: String,
    pub timestamp: String,
    pub attachment: String,
    pub link: String,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            subject: "NEWSSUB".to_string(),
            headline: "HEADLINE".to_string(),
            entity_code: "SCRIP_CD".to_string(),
            timestamp: "NEWS_DT".to_string(),
            attachment: "ATTACHMENTNAME".to_string(),
            link: "URL".to_string(),
        }
    }
}

/// How a record's `sequence_id` was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdOrigin {
    /// Parsed from the named upstream field
    Upstream(String),
    /// Synthetic run-local counter; only comparable within this run
    Fallback,
}

/// A normalized disclosure record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub sequence_id: i64,
    pub id_origin: IdOrigin,
    pub subject_text: String,
    pub headline_text: String,
    pub entity_code: Option<String>,
    pub timestamp: String,
    pub attachment_ref: Option<String>,
    pub link: Option<String>,
    pub raw: RawRecord,
}

impl Record {
    /// Project a raw row through `fields`. Missing text fields default to
    /// empty; missing optional references stay `None`.
    pub fn from_raw(raw: RawRecord, sequence_id: i64, id_origin: IdOrigin, fields: &FieldMap) -> Self {
        Self {
            sequence_id,
            id_origin,
            subject_text: raw.text(&fields.subject).unwrap_or_default(),
            headline_text: raw.text(&fields.headline).unwrap_or_default(),
            entity_code: raw.text(&fields.entity_code),
            timestamp: raw.text(&fields.timestamp).unwrap_or_default(),
            attachment_ref: raw.text(&fields.attachment),
            link: raw.text(&fields.link),
            raw,
        }
    }

    /// Date part of the timestamp (`2025-11-07T16:35:12.53` -> `2025-11-07`).
    pub fn date_part(&self) -> Option<&str> {
        let ts = self.timestamp.trim();
        let date = ts.split(['T', ' ']).next().unwrap_or("");
        if date.is_empty() {
            None
        } else {
            Some(date)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_reads_numbers_and_skips_blank() {
        let raw = RawRecord::new()
            .with("SCRIP_CD", 500325)
            .with("NEWSSUB", "   ")
            .with("URL", Value::Null);
        assert_eq!(raw.text("SCRIP_CD").as_deref(), Some("500325"));
        assert_eq!(raw.text("NEWSSUB"), None);
        assert_eq!(raw.text("URL"), None);
        assert_eq!(raw.text("missing"), None);
    }

    #[test]
    fn from_raw_defaults_missing_fields() {
        let raw = RawRecord::new().with("HEADLINE", "Board meeting");
        let record = Record::from_raw(raw, 7, IdOrigin::Fallback, &FieldMap::default());
        assert_eq!(record.sequence_id, 7);
        assert_eq!(record.subject_text, "");
        assert_eq!(record.headline_text, "Board meeting");
        assert!(record.entity_code.is_none());
        assert!(record.attachment_ref.is_none());
    }

    #[test]
    fn raw_record_deserializes_from_feed_object() {
        let raw: RawRecord = serde_json::from_value(json!({
            "NEWSSUB": "XYZ Ltd - Financial Results",
            "SCRIP_CD": 532540,
            "NEWS_DT": "2025-11-07T16:35:12.53"
        }))
        .unwrap();
        let record = Record::from_raw(raw, 1, IdOrigin::Fallback, &FieldMap::default());
        assert_eq!(record.entity_code.as_deref(), Some("532540"));
        assert_eq!(record.date_part(), Some("2025-11-07"));
    }

    #[test]
    fn date_part_handles_space_separator_and_empty() {
        let mut record = Record::from_raw(RawRecord::new(), 1, IdOrigin::Fallback, &FieldMap::default());
        assert_eq!(record.date_part(), None);
        record.timestamp = "2025-11-07 09:00:00".to_string();
        assert_eq!(record.date_part(), Some("2025-11-07"));
    }
}
