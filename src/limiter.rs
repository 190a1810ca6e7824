//! Per-run delivery cap
//!
//! Selection is oldest-first so a sustained backlog drains in order.
//! Withheld records are only counted: the watermark still advances past
//! them at the end of the run, which makes overflow lossy on purpose.

use crate::record::Record;

/// The outcome of applying the cap to one run's matches.
#[derive(Debug, Clone, PartialEq)]
pub struct CappedBatch {
    /// Records to deliver, ascending by `sequence_id`
    pub selected: Vec<Record>,
    /// Matches beyond the cap
    pub withheld: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryLimiter {
    max_per_run: usize,
}

impl DeliveryLimiter {
    pub fn new(max_per_run: usize) -> Self {
        Self { max_per_run }
    }

    pub fn max_per_run(&self) -> usize {
        self.max_per_run
    }

    pub fn cap(&self, mut matches: Vec<Record>) -> CappedBatch {
        matches.sort_by_key(|r| r.sequence_id);
        let withheld = matches.len().saturating_sub(self.max_per_run);
        matches.truncate(self.max_per_run);
        CappedBatch {
            selected: matches,
            withheld,
        }
    }
}
