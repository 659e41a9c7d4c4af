//! `devrank locations` and `devrank status`.
//!
//! Both commands are read-only: they look at the configuration, the
//! checkpoint and the output directory, and never touch the network.

use anyhow::Result;

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::config::Config;
use crate::store::OutputStore;

/// Checkpoint state of one location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationState {
    Done,
    Failed,
    Pending,
}

impl LocationState {
    pub fn of(checkpoint: &Checkpoint, key: &str) -> Self {
        if checkpoint.is_completed(key) {
            LocationState::Done
        } else if checkpoint.in_progress.as_deref() == Some(key) {
            LocationState::Failed
        } else {
            LocationState::Pending
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LocationState::Done => "done",
            LocationState::Failed => "failed",
            LocationState::Pending => "pending",
        }
    }
}

/// One row of `devrank locations`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationRow {
    pub key: String,
    pub name: String,
    pub min_followers: u32,
    pub state: LocationState,
}

pub fn location_rows(config: &Config, checkpoint: &Checkpoint) -> Vec<LocationRow> {
    config
        .locations
        .iter()
        .map(|loc| LocationRow {
            key: loc.country.clone(),
            name: loc.name.clone(),
            min_followers: loc.min_followers,
            state: LocationState::of(checkpoint, &loc.country),
        })
        .collect()
}

pub fn list_locations(config: &Config) -> Result<()> {
    let checkpoint = CheckpointStore::new(config.output.checkpoint_path()).load()?;

    println!(
        "{:<20} {:<24} {:>13} STATUS",
        "LOCATION", "NAME", "MIN FOLLOWERS"
    );
    for row in location_rows(config, &checkpoint) {
        println!(
            "{:<20} {:<24} {:>13} {}",
            row.key,
            row.name,
            row.min_followers,
            row.state.as_str()
        );
    }

    Ok(())
}

pub fn show_status(config: &Config) -> Result<()> {
    let checkpoints = CheckpointStore::new(config.output.checkpoint_path());
    let checkpoint = checkpoints.load()?;
    let store = OutputStore::new(&config.output.data_dir);

    println!("status");
    println!("  data_dir: {}", store.data_dir().display());
    if checkpoint.is_empty() {
        println!("  checkpoint: none");
    } else {
        println!("  checkpoint: {}", checkpoints.path().display());
        println!(
            "  completed: {}/{}",
            checkpoint.completed.len(),
            config.locations.len()
        );
        if let Some(key) = &checkpoint.in_progress {
            println!("  failed: {}", key);
        }
    }

    match store.read_summary()? {
        Some(summary) => {
            println!("  updated_at: {}", summary.updated_at.to_rfc3339());
            let total: usize = summary.locations.iter().map(|l| l.total_users).sum();
            println!("  locations: {}", summary.locations.len());
            println!("  users: {}", total);
            for entry in &summary.locations {
                println!("    {:<20} {}", entry.country, entry.total_users);
            }
        }
        None => println!("  summary: none"),
    }

    Ok(())
}
