//! JSON-file watermark with atomic replace

use super::traits::{WatermarkLoad, WatermarkResult, WatermarkStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Keys accepted when loading, newest first. `last_id` is the older layout.
const WATERMARK_KEYS: [&str; 2] = ["last_sequence_id", "last_id"];

#[derive(Debug, Serialize, Deserialize)]
struct PersistedWatermark {
    last_sequence_id: i64,
}

/// Stores `{"last_sequence_id": N}` in one small file.
///
/// Writes go to a temp file in the same directory which is fsynced and
/// then renamed over the canonical path, so readers see either the old
/// value or the new one.
#[derive(Debug, Clone)]
pub struct FileWatermarkStore {
    path: PathBuf,
}

impl FileWatermarkStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

impl WatermarkStore for FileWatermarkStore {
    fn load(&self) -> WatermarkLoad {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return WatermarkLoad::absent(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read watermark");
                return WatermarkLoad::corrupt();
            }
        };

        match decode(&raw) {
            Ok(load) => load,
            Err(reason) => {
                warn!(path = %self.path.display(), reason, "ignoring unreadable watermark");
                WatermarkLoad::corrupt()
            }
        }
    }

    fn save(&self, sequence_id: i64) -> WatermarkResult<()> {
        let dir = self.parent_dir();
        fs::create_dir_all(&dir)?;

        let body = serde_json::to_vec(&PersistedWatermark {
            last_sequence_id: sequence_id,
        })?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&body)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn clear(&self) -> WatermarkResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn decode(raw: &str) -> Result<WatermarkLoad, &'static str> {
    let value: Value = serde_json::from_str(raw).map_err(|_| "not valid JSON")?;
    let object = value.as_object().ok_or("not a JSON object")?;
    let field = WATERMARK_KEYS
        .iter()
        .find_map(|k| object.get(*k))
        .ok_or("no watermark key")?;

    match field {
        Value::Null => Ok(WatermarkLoad::absent()),
        Value::Number(n) => n.as_i64().map(WatermarkLoad::at).ok_or("watermark is not an integer"),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(WatermarkLoad::at)
            .map_err(|_| "watermark is not an integer"),
        _ => Err("watermark is not an integer"),
    }
}
