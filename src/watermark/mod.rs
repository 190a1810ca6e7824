//! Persisted "already seen" state
//!
//! The watermark is the highest sequence ID any run has processed. It is
//! the only state that survives between runs.

mod file;
mod lock;
mod memory;
mod traits;

pub use file::FileWatermarkStore;
pub use lock::{lock_path_for, LockError, RunLock};
pub use memory::MemoryWatermarkStore;
pub use traits::{WatermarkError, WatermarkLoad, WatermarkResult, WatermarkStore};
