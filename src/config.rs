//! Run configuration
//!
//! Built once at startup from environment-style key/value pairs and then
//! passed by reference. Pipeline code never reads the process environment.

use crate::filter::{TopicPredicate, DEFAULT_RESULTS_PATTERN};
use crate::normalize::DEFAULT_ID_FIELDS;
use crate::record::FieldMap;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_STATE_FILE: &str = "last_announcement.json";

/// Placeholder left in deployment templates; treated as "not set".
const CREDENTIAL_PLACEHOLDER: &str = "REPLACE_ME";

/// Errors that stop the process before any state is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key}: expected a non-negative integer, got {value:?}")]
    InvalidNumber { key: String, value: String },

    #[error("{key}: must be at least 1")]
    Zero { key: String },

    #[error("{key}: expected a boolean (1/0, true/false, yes/no, on/off), got {value:?}")]
    InvalidBool { key: String, value: String },

    #[error("{key}: invalid pattern: {source}")]
    InvalidPattern {
        key: String,
        #[source]
        source: regex::Error,
    },

    #[error("{key}: at least one field name is required")]
    EmptyList { key: String },
}

/// Bot credentials for the Telegram notifier.
#[derive(Clone, PartialEq, Eq)]
pub struct TelegramCredentials {
    pub bot_token: String,
    pub chat_id: String,
}

impl std::fmt::Debug for TelegramCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramCredentials")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// Immutable settings for one process.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Compiled topic predicate
    pub topic: TopicPredicate,
    /// Source text of the topic pattern, for logs
    pub topic_pattern: String,
    /// Entity codes to watch; empty means all
    pub watchlist: BTreeSet<String>,
    pub max_pages: u32,
    /// Nominal page size of the feed
    pub page_size: usize,
    /// Delivery cap per run
    pub max_notifications: usize,
    /// Only same-day filings pass when set
    pub recency_filter: bool,
    /// Seed the watermark silently on the first run
    pub bootstrap_if_empty: bool,
    /// Send one summary message when the cap withholds matches
    pub summary_on_overflow: bool,
    /// Bound on every network call
    pub request_timeout: Duration,
    /// Candidate ID fields, highest priority first
    pub id_fields: Vec<String>,
    pub fields: FieldMap,
    pub state_path: PathBuf,
    pub telegram: Option<TelegramCredentials>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            topic: TopicPredicate::financial_results(),
            topic_pattern: DEFAULT_RESULTS_PATTERN.to_string(),
            watchlist: BTreeSet::new(),
            max_pages: 5,
            page_size: 10,
            max_notifications: 10,
            recency_filter: true,
            bootstrap_if_empty: true,
            summary_on_overflow: true,
            request_timeout: Duration::from_secs(20),
            id_fields: DEFAULT_ID_FIELDS.iter().map(|s| s.to_string()).collect(),
            fields: FieldMap::default(),
            state_path: default_state_path(),
            telegram: None,
        }
    }
}

impl WatchConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`. Unset and blank keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(pattern) = get("RESULTS_PATTERN") {
            config.topic = TopicPredicate::new(&pattern).map_err(|source| ConfigError::InvalidPattern {
                key: "RESULTS_PATTERN".to_string(),
                source,
            })?;
            config.topic_pattern = pattern;
        }
        if let Some(codes) = get("WATCHLIST_CODES") {
            config.watchlist = split_list(&codes).into_iter().collect();
        }
        if let Some(v) = get("MAX_PAGES") {
            config.max_pages = u32::try_from(parse_positive("MAX_PAGES", &v)?).map_err(|_| {
                ConfigError::InvalidNumber {
                    key: "MAX_PAGES".to_string(),
                    value: v.clone(),
                }
            })?;
        }
        if let Some(v) = get("PAGE_SIZE") {
            config.page_size = parse_positive("PAGE_SIZE", &v)? as usize;
        }
        if let Some(v) = get("MAX_ALERTS_PER_RUN") {
            config.max_notifications = parse_number("MAX_ALERTS_PER_RUN", &v)? as usize;
        }
        if let Some(v) = get("TODAY_ONLY") {
            config.recency_filter = parse_bool("TODAY_ONLY", &v)?;
        }
        if let Some(v) = get("BOOTSTRAP_IF_EMPTY") {
            config.bootstrap_if_empty = parse_bool("BOOTSTRAP_IF_EMPTY", &v)?;
        }
        if let Some(v) = get("SUMMARY_ON_OVERFLOW") {
            config.summary_on_overflow = parse_bool("SUMMARY_ON_OVERFLOW", &v)?;
        }
        if let Some(v) = get("REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(parse_positive("REQUEST_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = get("ID_FIELDS") {
            let fields = split_list(&v);
            if fields.is_empty() {
                return Err(ConfigError::EmptyList {
                    key: "ID_FIELDS".to_string(),
                });
            }
            config.id_fields = fields;
        }
        if let Some(path) = get("STATE_FILE") {
            config.state_path = PathBuf::from(path);
        }

        let credential = |key: &str| get(key).filter(|v| !v.contains(CREDENTIAL_PLACEHOLDER));
        config.telegram = match (credential("TELEGRAM_BOT_TOKEN"), credential("TELEGRAM_CHAT_ID")) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramCredentials { bot_token, chat_id }),
            _ => None,
        };

        Ok(config)
    }

    pub fn with_state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_path = path.into();
        self
    }
}

/// `<data dir>/filingwatch/last_announcement.json`, or the working
/// directory when no data dir is known.
pub fn default_state_path() -> PathBuf {
    match dirs::data_dir() {
        Some(dir) => dir.join("filingwatch").join(DEFAULT_STATE_FILE),
        None => PathBuf::from(DEFAULT_STATE_FILE),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn parse_number(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidNumber {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_positive(key: &str, value: &str) -> Result<u64, ConfigError> {
    match parse_number(key, value)? {
        0 => Err(ConfigError::Zero { key: key.to_string() }),
        n => Ok(n),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<WatchConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WatchConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert!(config.watchlist.is_empty());
        assert_eq!(config.max_pages, 5);
        assert_eq!(config.max_notifications, 10);
        assert!(config.bootstrap_if_empty);
        assert!(config.recency_filter);
        assert_eq!(config.request_timeout, Duration::from_secs(20));
        assert_eq!(config.id_fields, vec!["S_NO", "SEQ_NO", "id", "DissemDT"]);
        assert!(config.telegram.is_none());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config_from(&[
            ("WATCHLIST_CODES", " 500325, 532540 ,,"),
            ("MAX_PAGES", "3"),
            ("MAX_ALERTS_PER_RUN", "0"),
            ("BOOTSTRAP_IF_EMPTY", "0"),
            ("TODAY_ONLY", "off"),
            ("REQUEST_TIMEOUT_SECS", "7"),
            ("ID_FIELDS", "NEWSID_NUM, S_NO"),
            ("STATE_FILE", "/tmp/fw/state.json"),
        ])
        .unwrap();
        assert_eq!(config.watchlist.len(), 2);
        assert!(config.watchlist.contains("532540"));
        assert_eq!(config.max_pages, 3);
        assert_eq!(config.max_notifications, 0);
        assert!(!config.bootstrap_if_empty);
        assert!(!config.recency_filter);
        assert_eq!(config.request_timeout, Duration::from_secs(7));
        assert_eq!(config.id_fields, vec!["NEWSID_NUM", "S_NO"]);
        assert_eq!(config.state_path, PathBuf::from("/tmp/fw/state.json"));
    }

    #[test]
    fn invalid_numbers_are_fatal() {
        assert!(matches!(
            config_from(&[("MAX_PAGES", "five")]),
            Err(ConfigError::InvalidNumber { .. })
        ));
        assert!(matches!(
            config_from(&[("MAX_ALERTS_PER_RUN", "-1")]),
            Err(ConfigError::InvalidNumber { .. })
        ));
        assert!(matches!(config_from(&[("MAX_PAGES", "0")]), Err(ConfigError::Zero { .. })));
        assert!(matches!(
            config_from(&[("REQUEST_TIMEOUT_SECS", "0")]),
            Err(ConfigError::Zero { .. })
        ));
    }

    #[test]
    fn invalid_bool_and_pattern_are_fatal() {
        assert!(matches!(
            config_from(&[("BOOTSTRAP_IF_EMPTY", "maybe")]),
            Err(ConfigError::InvalidBool { .. })
        ));
        assert!(matches!(
            config_from(&[("RESULTS_PATTERN", "(unclosed")]),
            Err(ConfigError::InvalidPattern { .. })
        ));
        assert!(matches!(
            config_from(&[("ID_FIELDS", " , ")]),
            Err(ConfigError::EmptyList { .. })
        ));
    }

    #[test]
    fn placeholder_credentials_count_as_missing() {
        let config = config_from(&[("TELEGRAM_BOT_TOKEN", "REPLACE_ME"), ("TELEGRAM_CHAT_ID", "42")]).unwrap();
        assert!(config.telegram.is_none());

        let config = config_from(&[("TELEGRAM_BOT_TOKEN", "123:abc"), ("TELEGRAM_CHAT_ID", "42")]).unwrap();
        let creds = config.telegram.unwrap();
        assert_eq!(creds.chat_id, "42");
        assert!(!format!("{:?}", creds).contains("123:abc"));
    }
}
