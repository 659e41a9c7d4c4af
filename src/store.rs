//! Output files.
//!
//! Every collected location is written to `<data_dir>/<country>.json` and
//! the run summary to `<data_dir>/rankings.json`. Writes go to a sibling
//! temporary file first and are renamed into place, so a crash mid-write
//! never leaves a truncated document behind.

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::is_valid_location_key;
use crate::models::{SegmentResult, Summary};

/// File stem of the summary document.
pub const SUMMARY_FILE: &str = "rankings.json";

/// Key-addressed JSON documents under the data directory.
#[derive(Debug, Clone)]
pub struct OutputStore {
    data_dir: PathBuf,
}

impl OutputStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of a location file. Rejects keys that could escape the data dir.
    pub fn location_path(&self, key: &str) -> Result<PathBuf> {
        if !is_valid_location_key(key) {
            bail!("invalid location key: '{}'", key);
        }
        Ok(self.data_dir.join(format!("{}.json", key)))
    }

    pub fn summary_path(&self) -> PathBuf {
        self.data_dir.join(SUMMARY_FILE)
    }

    pub fn write_location(&self, result: &SegmentResult) -> Result<PathBuf> {
        let path = self.location_path(&result.country)?;
        write_json_atomic(&path, result)
            .with_context(|| format!("Failed to write location file for '{}'", result.country))?;
        Ok(path)
    }

    /// Read a location file; `Ok(None)` if it has not been written yet.
    pub fn read_location(&self, key: &str) -> Result<Option<SegmentResult>> {
        read_json(&self.location_path(key)?)
    }

    pub fn write_summary(&self, summary: &Summary) -> Result<()> {
        write_json_atomic(&self.summary_path(), summary).context("Failed to write summary file")
    }

    pub fn read_summary(&self) -> Result<Option<Summary>> {
        read_json(&self.summary_path())
    }
}

/// Read and parse a JSON file; a missing file is `Ok(None)`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", path.display()));
        }
    };
    let value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Some(value))
}

/// Serialize `value` as pretty JSON and atomically replace `path` with it.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }

    let json = serde_json::to_string_pretty(value)?;
    let tmp = temp_path(path);
    std::fs::write(&tmp, json.as_bytes())
        .with_context(|| format!("Failed to write {}", tmp.display()))?;

    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("Failed to replace {}", path.display()));
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}
