//! Process-level errors

use crate::config::ConfigError;
use crate::notify::NotifyError;
use crate::source::SourceError;
use crate::watermark::{LockError, WatermarkError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a run before it starts, or fail an operator command.
///
/// Failures inside a run (page errors, delivery errors, a failed watermark
/// save) are reported in `RunReport` instead.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("another run is in progress (lock held on {0})")]
    AlreadyRunning(PathBuf),

    #[error("run lock error: {0}")]
    Lock(LockError),

    #[error("source setup failed: {0}")]
    Source(#[from] SourceError),

    #[error("notifier setup failed: {0}")]
    Notify(#[from] NotifyError),

    #[error("watermark error: {0}")]
    Watermark(#[from] WatermarkError),
}

impl From<LockError> for WatchError {
    fn from(e: LockError) -> Self {
        match e {
            LockError::Busy(path) => Self::AlreadyRunning(path),
            other => Self::Lock(other),
        }
    }
}
