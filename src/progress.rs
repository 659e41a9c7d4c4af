//! Collection progress reporting.
//!
//! Reports observable progress during `devrank collect` so users see which
//! location is being searched, how many profiles are left to enrich, and
//! which locations were saved, skipped, or failed. Progress is emitted on
//! **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event for a collection run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CollectProgressEvent {
    /// Paginating the search endpoint for this location.
    Searching { segment: String },
    /// Search finished with this many hits.
    Found { segment: String, hits: usize },
    /// n profiles enriched (or dropped) out of total.
    Enriching { segment: String, n: u64, total: u64 },
    /// Location file written.
    Saved { segment: String, users: usize },
    /// Already completed according to the checkpoint.
    Skipped { segment: String },
    /// Location failed; recorded in the checkpoint.
    Failed { segment: String, error: String },
}

/// Reports collection progress. Implementations write to stderr (human or JSON).
pub trait CollectProgressReporter: Send + Sync {
    fn report(&self, event: CollectProgressEvent);
}

/// Human-friendly progress on stderr: "collect brazil  enriching  12 / 100 users".
pub struct StderrProgress;

impl CollectProgressReporter for StderrProgress {
    fn report(&self, event: CollectProgressEvent) {
        let line = match &event {
            CollectProgressEvent::Searching { segment } => {
                format!("collect {}  searching...\n", segment)
            }
            CollectProgressEvent::Found { segment, hits } => {
                format!("collect {}  found {} users\n", segment, format_number(*hits as u64))
            }
            CollectProgressEvent::Enriching { segment, n, total } => {
                format!(
                    "collect {}  enriching  {} / {} users\n",
                    segment,
                    format_number(*n),
                    format_number(*total)
                )
            }
            CollectProgressEvent::Saved { segment, users } => {
                format!("collect {}  saved {} users\n", segment, format_number(*users as u64))
            }
            CollectProgressEvent::Skipped { segment } => {
                format!("collect {}  skipped (already completed)\n", segment)
            }
            CollectProgressEvent::Failed { segment, error } => {
                format!("collect {}  FAILED: {}\n", segment, error)
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl CollectProgressReporter for JsonProgress {
    fn report(&self, event: CollectProgressEvent) {
        let obj = event_json(&event);
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

fn event_json(event: &CollectProgressEvent) -> serde_json::Value {
    match event {
        CollectProgressEvent::Searching { segment } => serde_json::json!({
            "event": "progress",
            "location": segment,
            "phase": "searching"
        }),
        CollectProgressEvent::Found { segment, hits } => serde_json::json!({
            "event": "progress",
            "location": segment,
            "phase": "found",
            "hits": hits
        }),
        CollectProgressEvent::Enriching { segment, n, total } => serde_json::json!({
            "event": "progress",
            "location": segment,
            "phase": "enriching",
            "n": n,
            "total": total
        }),
        CollectProgressEvent::Saved { segment, users } => serde_json::json!({
            "event": "saved",
            "location": segment,
            "users": users
        }),
        CollectProgressEvent::Skipped { segment } => serde_json::json!({
            "event": "skipped",
            "location": segment
        }),
        CollectProgressEvent::Failed { segment, error } => serde_json::json!({
            "event": "failed",
            "location": segment,
            "error": error
        }),
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl CollectProgressReporter for NoProgress {
    fn report(&self, _event: CollectProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    /// Human progress when stderr is a TTY, otherwise off.
    Auto,
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn CollectProgressReporter> {
        let resolved = match self {
            ProgressMode::Auto if atty::is(atty::Stream::Stderr) => ProgressMode::Human,
            ProgressMode::Auto => ProgressMode::Off,
            other => *other,
        };
        match resolved {
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
            _ => Box::new(NoProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn enriching_event_json_shape() {
        let value = event_json(&CollectProgressEvent::Enriching {
            segment: "brazil".to_string(),
            n: 3,
            total: 10,
        });
        assert_eq!(value["phase"], "enriching");
        assert_eq!(value["location"], "brazil");
        assert_eq!(value["n"], 3);
        assert_eq!(value["total"], 10);
    }

    #[test]
    fn failed_event_json_carries_error() {
        let value = event_json(&CollectProgressEvent::Failed {
            segment: "peru".to_string(),
            error: "disk full".to_string(),
        });
        assert_eq!(value["event"], "failed");
        assert_eq!(value["error"], "disk full");
    }
}
