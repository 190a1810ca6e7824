//! Capturing notifier for tests

use super::traits::{Notifier, NotifyError};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

/// Records every message it is asked to send.
///
/// Calls listed in `with_failure_on` (0-based) fail instead; failed
/// messages are still recorded as attempted.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    attempts: Mutex<Vec<String>>,
    delivered: Mutex<Vec<String>>,
    failing_calls: HashSet<usize>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure_on(mut self, call: usize) -> Self {
        self.failing_calls.insert(call);
        self
    }

    /// Every message passed to `send`
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// Messages whose `send` succeeded
    pub fn delivered(&self) -> Vec<String> {
        self.delivered.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn id(&self) -> &str {
        "recording"
    }

    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let call = {
            let mut attempts = self
                .attempts
                .lock()
                .map_err(|e| NotifyError::Internal(e.to_string()))?;
            attempts.push(text.to_string());
            attempts.len() - 1
        };
        if self.failing_calls.contains(&call) {
            return Err(NotifyError::Internal(format!("scripted failure on call {}", call)));
        }
        self.delivered
            .lock()
            .map_err(|e| NotifyError::Internal(e.to_string()))?
            .push(text.to_string());
        Ok(())
    }
}
