//! Watermark store contract

use thiserror::Error;

/// Errors from persisting the watermark.
#[derive(Debug, Error)]
pub enum WatermarkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store rejected write: {0}")]
    Rejected(String),
}

/// Result type for watermark operations
pub type WatermarkResult<T> = Result<T, WatermarkError>;

/// What `load()` found.
///
/// A corrupt record reads as absent; `corrupt` only exists for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatermarkLoad {
    pub last_sequence_id: Option<i64>,
    pub corrupt: bool,
}

impl WatermarkLoad {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn corrupt() -> Self {
        Self {
            last_sequence_id: None,
            corrupt: true,
        }
    }

    pub fn at(last_sequence_id: i64) -> Self {
        Self {
            last_sequence_id: Some(last_sequence_id),
            corrupt: false,
        }
    }

    pub fn is_absent(&self) -> bool {
        self.last_sequence_id.is_none()
    }
}

/// Durable home of the single "highest processed sequence ID" value.
///
/// Implementations must be thread-safe (Send + Sync). `load` never fails;
/// anything unreadable is reported as absent.
pub trait WatermarkStore: Send + Sync {
    fn load(&self) -> WatermarkLoad;

    /// Replace the persisted value atomically.
    fn save(&self, sequence_id: i64) -> WatermarkResult<()>;

    /// Forget the persisted value so the next run bootstraps.
    fn clear(&self) -> WatermarkResult<()>;
}
