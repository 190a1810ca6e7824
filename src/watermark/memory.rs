//! In-memory watermark for tests

use super::traits::{WatermarkError, WatermarkLoad, WatermarkResult, WatermarkStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryWatermarkStore {
    value: Mutex<WatermarkLoad>,
    fail_saves: AtomicBool,
    saves: Mutex<Vec<i64>>,
}

impl MemoryWatermarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(sequence_id: i64) -> Self {
        let store = Self::new();
        store.set(WatermarkLoad::at(sequence_id));
        store
    }

    pub fn corrupt() -> Self {
        let store = Self::new();
        store.set(WatermarkLoad::corrupt());
        store
    }

    pub fn set(&self, load: WatermarkLoad) {
        if let Ok(mut value) = self.value.lock() {
            *value = load;
        }
    }

    /// Make every subsequent `save` fail.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::Relaxed);
    }

    /// Every value successfully saved, in order.
    pub fn saves(&self) -> Vec<i64> {
        self.saves.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl WatermarkStore for MemoryWatermarkStore {
    fn load(&self) -> WatermarkLoad {
        self.value.lock().map(|v| *v).unwrap_or_else(|_| WatermarkLoad::corrupt())
    }

    fn save(&self, sequence_id: i64) -> WatermarkResult<()> {
        if self.fail_saves.load(Ordering::Relaxed) {
            return Err(WatermarkError::Rejected("configured to fail".to_string()));
        }
        self.set(WatermarkLoad::at(sequence_id));
        if let Ok(mut saves) = self.saves.lock() {
            saves.push(sequence_id);
        }
        Ok(())
    }

    fn clear(&self) -> WatermarkResult<()> {
        self.set(WatermarkLoad::absent());
        Ok(())
    }
}
