//! Ranking of enriched records.
//!
//! A ranking is a *view*: [`rank_by`] returns a new, independently owned
//! vector sorted descending by one [`Criterion`], and [`assign_ranks`]
//! writes 1-based positions into that vector only. Views never share
//! records, so ranking by contributions cannot disturb the ranks of the
//! follower view.
//!
//! Sorting is stable: records with equal values keep their input order.

use crate::models::RankedRecord;

/// The numeric field a view is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    Followers,
    PublicContributions,
    TotalContributions,
}

impl Criterion {
    pub const ALL: [Criterion; 3] = [
        Criterion::Followers,
        Criterion::PublicContributions,
        Criterion::TotalContributions,
    ];

    pub fn value(self, record: &RankedRecord) -> u64 {
        match self {
            Criterion::Followers => record.followers,
            Criterion::PublicContributions => record.public_contributions,
            Criterion::TotalContributions => record.total_contributions,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Criterion::Followers => "followers",
            Criterion::PublicContributions => "public_contributions",
            Criterion::TotalContributions => "total_contributions",
        }
    }
}

/// Copy `records` into a new vector sorted descending by `criterion`.
///
/// Ranks are left as they were; see [`assign_ranks`].
pub fn rank_by(records: &[RankedRecord], criterion: Criterion) -> Vec<RankedRecord> {
    let mut sorted = records.to_vec();
    // `sort_by` is stable.
    sorted.sort_by(|a, b| criterion.value(b).cmp(&criterion.value(a)));
    sorted
}

/// Overwrite each record's rank with its 1-based position.
pub fn assign_ranks(view: &mut [RankedRecord]) {
    for (idx, record) in view.iter_mut().enumerate() {
        record.rank = idx + 1;
    }
}

/// Sorted and rank-assigned view.
pub fn ranked_view(records: &[RankedRecord], criterion: Criterion) -> Vec<RankedRecord> {
    let mut view = rank_by(records, criterion);
    assign_ranks(&mut view);
    view
}
