//! Resumable run state.
//!
//! The checkpoint records which locations have completed during the current
//! run and, after a failure, which one was in progress. It is saved after
//! every location so an interrupted run can be resumed by simply running
//! `devrank collect` again, and removed once the summary has been written.
//!
//! ```json
//! { "version": 1, "completed": ["brazil", "chile"], "in_progress": "peru" }
//! ```
//!
//! A missing file means nothing has completed yet.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::store::{read_json, write_json_atomic};

pub const CHECKPOINT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub completed: BTreeSet<String>,
    #[serde(default)]
    pub in_progress: Option<String>,
}

fn default_version() -> u32 {
    CHECKPOINT_VERSION
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            completed: BTreeSet::new(),
            in_progress: None,
        }
    }
}

impl Checkpoint {
    pub fn is_completed(&self, key: &str) -> bool {
        self.completed.contains(key)
    }

    pub fn mark_completed(&mut self, key: &str) {
        if self.in_progress.as_deref() == Some(key) {
            self.in_progress = None;
        }
        self.completed.insert(key.to_string());
    }

    /// Record `key` as the location that failed. Replaces any earlier one.
    pub fn mark_in_progress(&mut self, key: &str) {
        self.completed.remove(key);
        self.in_progress = Some(key.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_empty() && self.in_progress.is_none()
    }
}

/// Whole-file persistence for [`Checkpoint`].
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the checkpoint, or an empty one if the file does not exist.
    ///
    /// # Errors
    ///
    /// Fails on unreadable or malformed files and on versions newer than
    /// this build understands.
    pub fn load(&self) -> Result<Checkpoint> {
        let checkpoint: Checkpoint = read_json(&self.path)
            .with_context(|| format!("Failed to load checkpoint {}", self.path.display()))?
            .unwrap_or_default();
        if checkpoint.version > CHECKPOINT_VERSION {
            bail!(
                "checkpoint {} has version {}, this build understands up to {}",
                self.path.display(),
                checkpoint.version,
                CHECKPOINT_VERSION
            );
        }
        Ok(checkpoint)
    }

    /// Overwrite the checkpoint file.
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        write_json_atomic(&self.path, checkpoint)
            .with_context(|| format!("Failed to save checkpoint {}", self.path.display()))
    }

    /// Remove the checkpoint file. Removing a missing file is not an error.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to remove checkpoint {}", self.path.display()))
            }
        }
    }
}
