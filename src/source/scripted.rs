//! In-memory source for tests and dry runs

use super::traits::{RecordSource, SourceError};
use crate::record::RawRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Serves preconfigured pages in order. Pages past the script are empty.
pub struct ScriptedSource {
    page_size: usize,
    pages: Vec<Result<Vec<RawRecord>, String>>,
    delays: HashMap<u32, Duration>,
    calls: Mutex<Vec<u32>>,
}

impl ScriptedSource {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            pages: Vec::new(),
            delays: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Split `rows` into full pages of `page_size`.
    pub fn from_rows(page_size: usize, rows: Vec<RawRecord>) -> Self {
        let mut source = Self::new(page_size);
        for chunk in rows.chunks(page_size.max(1)) {
            source = source.with_page(chunk.to_vec());
        }
        source
    }

    pub fn with_page(mut self, rows: Vec<RawRecord>) -> Self {
        self.pages.push(Ok(rows));
        self
    }

    /// The next page fails with `message`.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.pages.push(Err(message.into()));
        self
    }

    /// Delay the response for `page` (1-based).
    pub fn with_delay(mut self, page: u32, delay: Duration) -> Self {
        self.delays.insert(page, delay);
        self
    }

    /// Page numbers requested so far, in order.
    pub fn calls(&self) -> Vec<u32> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl RecordSource for ScriptedSource {
    fn id(&self) -> &str {
        "scripted"
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    async fn fetch_page(&self, page: u32) -> Result<Vec<RawRecord>, SourceError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(page);
        }
        if let Some(delay) = self.delays.get(&page) {
            tokio::time::sleep(*delay).await;
        }
        let index = page.saturating_sub(1) as usize;
        match self.pages.get(index) {
            Some(Ok(rows)) => Ok(rows.clone()),
            Some(Err(message)) => Err(SourceError::Internal(message.clone())),
            None => Ok(Vec::new()),
        }
    }
}
