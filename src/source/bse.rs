//! BSE corporate-announcement feed
//!
//! One GET per page against the public announcement API. The API wants
//! browser-like headers and answers with `{"Table": [...], "Table1": [...]}`.

use super::traits::{RecordSource, SourceError};
use crate::record::RawRecord;
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use reqwest::header::{HeaderMap, HeaderValue, ORIGIN, REFERER};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

const BSE_ANNOUNCEMENTS_URL: &str =
    "https://api.bseindia.com/BseIndiaAPI/api/AnnSubCategoryGetData/w";
const BSE_SITE: &str = "https://www.bseindia.com";
const BSE_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
const BSE_PAGE_SIZE: usize = 10;

/// Public location of announcement attachments, keyed by `ATTACHMENTNAME`.
pub const BSE_ATTACHMENT_BASE: &str = "https://www.bseindia.com/xml-data/corpfiling_attachments/";

/// HTTP client for the BSE announcement API.
pub struct BseSource {
    http: Client,
    page_size: usize,
    window: Option<(NaiveDate, NaiveDate)>,
}

impl BseSource {
    /// Create a client whose every request is bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static("https://www.bseindia.com/"));
        headers.insert(ORIGIN, HeaderValue::from_static(BSE_SITE));

        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(BSE_USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| SourceError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            page_size: BSE_PAGE_SIZE,
            window: None,
        })
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Query a fixed date range instead of the current local date.
    pub fn with_window(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.window = Some((from, to));
        self
    }

    fn query(&self, page: u32) -> Vec<(&'static str, String)> {
        let (from, to) = self.window.unwrap_or_else(|| {
            let today = Local::now().date_naive();
            (today, today)
        });
        vec![
            ("pageno", page.to_string()),
            ("strCat", "-1".to_string()),
            ("strPrevDate", from.format("%Y%m%d").to_string()),
            ("strScrip", String::new()),
            ("strSearch", "P".to_string()),
            ("strToDate", to.format("%Y%m%d").to_string()),
            ("strType", "C".to_string()),
            ("subcategory", "-1".to_string()),
        ]
    }
}

#[async_trait]
impl RecordSource for BseSource {
    fn id(&self) -> &str {
        "bse"
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    async fn fetch_page(&self, page: u32) -> Result<Vec<RawRecord>, SourceError> {
        let response = self
            .http
            .get(BSE_ANNOUNCEMENTS_URL)
            .query(&self.query(page))
            .send()
            .await
            .map_err(|e| SourceError::Transport {
                page,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                page,
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let body: Value = response.json().await.map_err(|e| SourceError::Decode {
            page,
            message: e.to_string(),
        })?;
        parse_page(page, body)
    }
}

/// Extract rows from a page body: the `Table` array, or a bare array.
fn parse_page(page: u32, body: Value) -> Result<Vec<RawRecord>, SourceError> {
    let rows = match body {
        Value::Array(rows) => rows,
        Value::Object(mut map) => match map.remove("Table") {
            Some(Value::Array(rows)) => rows,
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                return Err(SourceError::Decode {
                    page,
                    message: format!("`Table` is not an array: {}", other),
                })
            }
        },
        Value::Null => Vec::new(),
        other => {
            return Err(SourceError::Decode {
                page,
                message: format!("unexpected body: {}", other),
            })
        }
    };

    Ok(rows
        .into_iter()
        .filter_map(|row| match row {
            Value::Object(map) => Some(RawRecord::from(map)),
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_table_rows() {
        let body = json!({
            "Table": [
                {"NEWSID": "a1", "SCRIP_CD": 500325, "NEWSSUB": "RIL - Financial Results"},
                {"NEWSID": "b2", "SCRIP_CD": 532540, "NEWSSUB": "TCS - Board Meeting"}
            ],
            "Table1": [{"ROWCNT": 2}]
        });
        let rows = parse_page(1, body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text("SCRIP_CD").as_deref(), Some("500325"));
    }

    #[test]
    fn missing_table_is_an_empty_page() {
        assert!(parse_page(3, json!({"Table1": []})).unwrap().is_empty());
        assert!(parse_page(3, json!({"Table": null})).unwrap().is_empty());
        assert!(parse_page(3, Value::Null).unwrap().is_empty());
    }

    #[test]
    fn bare_array_body_is_accepted_and_non_objects_skipped() {
        let rows = parse_page(1, json!([{"S_NO": 1}, "junk", {"S_NO": 2}])).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn scalar_body_is_a_decode_error() {
        let err = parse_page(2, json!("maintenance")).unwrap_err();
        assert!(matches!(err, SourceError::Decode { page: 2, .. }));
    }

    #[test]
    fn query_carries_page_and_window() {
        let day = NaiveDate::from_ymd_opt(2025, 11, 7).unwrap();
        let source = BseSource::new(Duration::from_secs(5)).unwrap().with_window(day, day);
        let query = source.query(4);
        assert!(query.contains(&("pageno", "4".to_string())));
        assert!(query.contains(&("strPrevDate", "20251107".to_string())));
        assert!(query.contains(&("strToDate", "20251107".to_string())));
        assert_eq!(source.page_size(), 10);
    }
}
