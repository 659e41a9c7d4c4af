//! Collection pipeline orchestration.
//!
//! Coordinates the full collect flow for every configured location:
//! search → enrich → rank → persist, strictly one location at a time.
//!
//! # Checkpointing
//!
//! After each location the checkpoint is saved: a success adds the key to
//! the completed set, a failure records it as in progress. A failed
//! location never stops the run; the next one is attempted. Locations the
//! checkpoint already marks completed are skipped, which is how a run
//! interrupted by a crash is resumed.
//!
//! Once every location has been visited the summary is written and the
//! checkpoint is removed, whether or not some locations failed. A failed
//! location is absent from that summary.
//!
//! # Summary
//!
//! Summary entries are listed in configuration order. Locations that were
//! not collected in this run (skipped via checkpoint, or left out with
//! `--only`) contribute the counts of their existing output file, if any.
//! When nothing was collected and those counts match the summary already on
//! disk, the summary is left untouched.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::client::{GitHubClient, ProfileApi};
use crate::config::{Config, Credentials};
use crate::enrich::enrich_all;
use crate::models::{RankedRecord, SegmentResult, Segment, Summary, SummaryEntry};
use crate::progress::{CollectProgressEvent, CollectProgressReporter, NoProgress};
use crate::rank::{ranked_view, Criterion};
use crate::search::search_segment;
use crate::store::OutputStore;

/// Flags of `devrank collect`.
#[derive(Debug, Clone, Default)]
pub struct CollectOptions {
    /// Only collect these location keys (all when empty).
    pub only: Vec<String>,
    /// Ignore an existing checkpoint.
    pub fresh: bool,
    /// Search only; print hit counts and write nothing.
    pub dry_run: bool,
    /// Override `collect.max_users_per_location`.
    pub max_users: Option<usize>,
}

/// What happened during one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectReport {
    pub processed: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
    /// Completed set of the checkpoint just before it was cleared.
    pub completed: Vec<String>,
    pub summary_written: bool,
}

/// Drives the pipeline over a list of segments.
pub struct Collector {
    api: Arc<dyn ProfileApi>,
    store: OutputStore,
    checkpoints: CheckpointStore,
    page_size: usize,
    concurrency: usize,
    progress: Box<dyn CollectProgressReporter>,
}

impl Collector {
    pub fn new(config: &Config, api: Arc<dyn ProfileApi>) -> Self {
        Self {
            api,
            store: OutputStore::new(&config.output.data_dir),
            checkpoints: CheckpointStore::new(config.output.checkpoint_path()),
            page_size: config.collect.page_size,
            concurrency: config.collect.concurrency,
            progress: Box::new(NoProgress),
        }
    }

    pub fn with_progress(mut self, progress: Box<dyn CollectProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn store(&self) -> &OutputStore {
        &self.store
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    /// Run every segment in `segments` whose key is in `selected` (all when
    /// `selected` is `None`), then write the summary and clear the checkpoint.
    ///
    /// Without a selection, locations the checkpoint marks completed are
    /// skipped. Selected locations are always collected.
    ///
    /// # Errors
    ///
    /// Only checkpoint loading, summary writing, and checkpoint removal are
    /// fatal. Per-location failures are reported in [`CollectReport::failed`].
    pub async fn run(
        &self,
        segments: &[Segment],
        selected: Option<&HashSet<String>>,
        fresh: bool,
    ) -> Result<CollectReport> {
        let mut checkpoint = if fresh {
            Checkpoint::default()
        } else {
            self.checkpoints.load()?
        };
        if let Some(key) = &checkpoint.in_progress {
            tracing::info!(segment = %key, "previous run failed on this location, retrying");
        }

        let mut report = CollectReport::default();
        let mut entries = Vec::with_capacity(segments.len());

        for segment in segments {
            let wanted = selected.map_or(true, |keys| keys.contains(&segment.key));
            // An explicit selection re-collects even completed locations.
            let done = selected.is_none() && checkpoint.is_completed(&segment.key);

            if !wanted || done {
                if wanted {
                    tracing::info!(segment = %segment.key, "already completed, skipping");
                    self.progress.report(CollectProgressEvent::Skipped {
                        segment: segment.key.clone(),
                    });
                    report.skipped.push(segment.key.clone());
                }
                if let Some(entry) = self.existing_entry(segment) {
                    entries.push(entry);
                }
                continue;
            }

            match self.process_segment(segment).await {
                Ok(entry) => {
                    checkpoint.mark_completed(&segment.key);
                    self.save_checkpoint(&checkpoint);
                    entries.push(entry);
                    report.processed.push(segment.key.clone());
                }
                Err(e) => {
                    tracing::error!(segment = %segment.key, error = %format!("{:#}", e), "location failed");
                    self.progress.report(CollectProgressEvent::Failed {
                        segment: segment.key.clone(),
                        error: format!("{:#}", e),
                    });
                    checkpoint.mark_in_progress(&segment.key);
                    self.save_checkpoint(&checkpoint);
                    report.failed.push(segment.key.clone());
                }
            }
        }

        report.completed = checkpoint.completed.iter().cloned().collect();
        report.summary_written = self.write_summary(entries, report.processed.is_empty())?;
        self.checkpoints.clear()?;

        Ok(report)
    }

    /// Search, enrich, rank, and persist one location.
    pub async fn process_segment(&self, segment: &Segment) -> Result<SummaryEntry> {
        tracing::info!(segment = %segment.key, name = %segment.name, "collecting");
        self.progress.report(CollectProgressEvent::Searching {
            segment: segment.key.clone(),
        });

        let hits = search_segment(self.api.as_ref(), segment, self.page_size).await;
        tracing::info!(segment = %segment.key, hits = hits.len(), "search finished");
        self.progress.report(CollectProgressEvent::Found {
            segment: segment.key.clone(),
            hits: hits.len(),
        });

        let records = enrich_all(
            Arc::clone(&self.api),
            hits,
            self.concurrency,
            &segment.key,
            self.progress.as_ref(),
        )
        .await;

        let result = build_segment_result(segment, &records);
        let path = self.store.write_location(&result)?;
        tracing::info!(segment = %segment.key, users = result.total_users(), path = %path.display(), "saved");
        self.progress.report(CollectProgressEvent::Saved {
            segment: segment.key.clone(),
            users: result.total_users(),
        });

        Ok(SummaryEntry {
            country: segment.key.clone(),
            name: segment.name.clone(),
            total_users: result.total_users(),
        })
    }

    /// Search only, returning `(key, hit count)` per segment.
    pub async fn dry_run(&self, segments: &[Segment]) -> Vec<(String, usize)> {
        let mut counts = Vec::with_capacity(segments.len());
        for segment in segments {
            self.progress.report(CollectProgressEvent::Searching {
                segment: segment.key.clone(),
            });
            let hits = search_segment(self.api.as_ref(), segment, self.page_size).await;
            counts.push((segment.key.clone(), hits.len()));
        }
        counts
    }

    fn existing_entry(&self, segment: &Segment) -> Option<SummaryEntry> {
        match self.store.read_location(&segment.key) {
            Ok(Some(result)) => Some(SummaryEntry {
                country: segment.key.clone(),
                name: segment.name.clone(),
                total_users: result.total_users(),
            }),
            Ok(None) => {
                tracing::debug!(segment = %segment.key, "no output file, leaving out of summary");
                None
            }
            Err(e) => {
                tracing::warn!(segment = %segment.key, error = %format!("{:#}", e), "unreadable output file, leaving out of summary");
                None
            }
        }
    }

    fn save_checkpoint(&self, checkpoint: &Checkpoint) {
        if let Err(e) = self.checkpoints.save(checkpoint) {
            tracing::warn!(error = %format!("{:#}", e), "failed to save checkpoint");
        }
    }

    /// Write the summary unless nothing was collected and it would not change.
    fn write_summary(&self, locations: Vec<SummaryEntry>, nothing_collected: bool) -> Result<bool> {
        if nothing_collected {
            match self.store.read_summary() {
                Ok(Some(existing)) if existing.locations == locations => {
                    tracing::info!("summary unchanged");
                    return Ok(false);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %format!("{:#}", e), "existing summary unreadable, rewriting");
                }
            }
        }

        let summary = Summary {
            updated_at: Utc::now(),
            locations,
        };
        self.store.write_summary(&summary)?;
        tracing::info!(locations = summary.locations.len(), "summary written");
        Ok(true)
    }
}

/// Rank `records` three ways. Each view owns its records and its ranks.
pub fn build_segment_result(segment: &Segment, records: &[RankedRecord]) -> SegmentResult {
    SegmentResult {
        country: segment.key.clone(),
        name: segment.name.clone(),
        users_by_followers: ranked_view(records, Criterion::Followers),
        users_by_public_contributions: ranked_view(records, Criterion::PublicContributions),
        users_by_total_contributions: ranked_view(records, Criterion::TotalContributions),
    }
}

/// Segments to run, with the `--max-users` override applied.
///
/// # Errors
///
/// Fails if `--only` names a key that is not configured.
pub fn select_segments(config: &Config, options: &CollectOptions) -> Result<Vec<Segment>> {
    for key in &options.only {
        if config.location(key).is_none() {
            bail!("Unknown location: '{}'. Run `devrank locations` to list them.", key);
        }
    }

    let mut segments = config.segments();
    if let Some(max) = options.max_users {
        if max == 0 {
            bail!("--max-users must be >= 1");
        }
        for segment in &mut segments {
            segment.max_results = max;
        }
    }
    Ok(segments)
}

/// CLI entry point for `devrank collect`.
pub async fn run_collect(
    config: &Config,
    options: CollectOptions,
    progress: Box<dyn CollectProgressReporter>,
) -> Result<CollectReport> {
    let segments = select_segments(config, &options)?;
    let selected: Option<HashSet<String>> = if options.only.is_empty() {
        None
    } else {
        Some(options.only.iter().cloned().collect())
    };

    let credentials = Credentials::from_env(&config.github.token_env)?;
    let client = GitHubClient::new(&config.github, credentials)
        .context("Failed to build GitHub client")?;
    let collector = Collector::new(config, Arc::new(client)).with_progress(progress);

    if options.dry_run {
        let wanted: Vec<Segment> = segments
            .into_iter()
            .filter(|s| selected.as_ref().map_or(true, |keys| keys.contains(&s.key)))
            .collect();
        println!("collect (dry-run)");
        for (key, hits) in collector.dry_run(&wanted).await {
            println!("  {}: {} users found", key, hits);
        }
        return Ok(CollectReport::default());
    }

    let report = collector.run(&segments, selected.as_ref(), options.fresh).await?;

    println!("collect");
    println!("  processed: {}", list_or_dash(&report.processed));
    println!("  skipped: {}", list_or_dash(&report.skipped));
    println!("  failed: {}", list_or_dash(&report.failed));
    println!(
        "  summary: {}",
        if report.summary_written {
            "written"
        } else {
            "unchanged"
        }
    );
    if report.failed.is_empty() {
        println!("ok");
    } else {
        println!("completed with failures");
    }

    Ok(report)
}

fn list_or_dash(keys: &[String]) -> String {
    if keys.is_empty() {
        "-".to_string()
    } else {
        keys.join(", ")
    }
}
