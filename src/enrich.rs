//! Profile enrichment.
//!
//! [`enrich`] turns one search hit into a [`RankedRecord`] with two
//! dependent lookups: the profile detail (a failure drops the hit) and the
//! contribution counts (a failure defaults both counts to zero).
//!
//! [`enrich_all`] runs `enrich` over a batch with at most `concurrency`
//! lookups in flight. Each hit is a task on a `JoinSet` gated by a
//! semaphore; finished tasks are drained by the single consumer loop,
//! which owns the output vector, so no lock guards the results. A task
//! that fails or panics loses only its own hit.
//!
//! Results come back in completion order and are put back into search
//! order before returning, so ties in the later ranking pass break the same
//! way on every run.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::client::ProfileApi;
use crate::models::{ContributionStats, RankedRecord, SearchHit};
use crate::progress::{CollectProgressEvent, CollectProgressReporter};

/// Enrich one hit. Returns `None` if the profile detail cannot be fetched.
pub async fn enrich(api: &dyn ProfileApi, hit: SearchHit) -> Option<RankedRecord> {
    let detail = match api.user_detail(&hit.login).await {
        Ok(detail) => detail,
        Err(e) => {
            tracing::warn!(login = %hit.login, error = %e, "failed to fetch profile, skipping");
            return None;
        }
    };

    let stats = match api.contributions(&hit.login).await {
        Ok(stats) => stats,
        Err(e) => {
            tracing::debug!(login = %hit.login, error = %e, "contributions unavailable, using zero");
            ContributionStats::default()
        }
    };

    Some(RankedRecord::merge(hit, detail, stats))
}

/// Enrich every hit with bounded parallelism.
///
/// Records keep the relative order of `hits`; dropped hits are simply absent.
pub async fn enrich_all(
    api: Arc<dyn ProfileApi>,
    hits: Vec<SearchHit>,
    concurrency: usize,
    segment: &str,
    progress: &dyn CollectProgressReporter,
) -> Vec<RankedRecord> {
    let total = hits.len();
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut set = JoinSet::new();

    for (idx, hit) in hits.into_iter().enumerate() {
        let api = Arc::clone(&api);
        let permits = Arc::clone(&permits);
        set.spawn(async move {
            // The semaphore is never closed, so acquire cannot fail.
            let _permit = permits.acquire_owned().await.ok()?;
            enrich(api.as_ref(), hit).await.map(|record| (idx, record))
        });
    }

    let mut indexed = Vec::with_capacity(total);
    let mut done: u64 = 0;
    while let Some(joined) = set.join_next().await {
        done += 1;
        match joined {
            Ok(Some(entry)) => indexed.push(entry),
            Ok(None) => {}
            Err(e) => tracing::warn!(segment, error = %e, "enrichment task failed"),
        }
        progress.report(CollectProgressEvent::Enriching {
            segment: segment.to_string(),
            n: done,
            total: total as u64,
        });
    }

    indexed.sort_by_key(|(idx, _)| *idx);
    let records: Vec<RankedRecord> = indexed.into_iter().map(|(_, record)| record).collect();

    tracing::info!(
        segment,
        enriched = records.len(),
        dropped = total - records.len(),
        "enrichment finished"
    );
    records
}
