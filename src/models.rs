//! Core data models used throughout devrank.
//!
//! These types represent the search hits, profile details, and ranked
//! records that flow through the collection pipeline, and the JSON
//! documents written for each location and for the overall summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A collection target built from one `[[locations]]` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub key: String,
    pub name: String,
    /// Value placed after `location:` in the search filter.
    pub location_filter: String,
    pub min_followers: u32,
    pub max_results: usize,
}

/// Minimal search result, prior to enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchHit {
    pub login: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub avatar_url: String,
}

/// Full attributes of one user, as returned by the detail endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileDetail {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub public_repos: u64,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub twitter_username: Option<String>,
    #[serde(default)]
    pub blog: Option<String>,
}

/// Contribution counts for the current contribution year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContributionStats {
    pub public_contributions: u64,
    /// Public plus restricted (private) contributions.
    pub total_contributions: u64,
}

/// The merged, persisted unit. `rank` is 0 until a ranked view assigns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedRecord {
    pub rank: usize,
    pub username: String,
    pub name: Option<String>,
    pub avatar: String,
    pub profile_url: String,
    pub followers: u64,
    pub public_repos: u64,
    pub public_contributions: u64,
    pub total_contributions: u64,
    pub bio: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub twitter: Option<String>,
    pub blog: Option<String>,
}

impl RankedRecord {
    /// Merge a hit, its detail, and its contribution counts into one record.
    pub fn merge(hit: SearchHit, detail: ProfileDetail, stats: ContributionStats) -> Self {
        Self {
            rank: 0,
            username: hit.login,
            name: detail.name,
            avatar: hit.avatar_url,
            profile_url: hit.html_url,
            followers: detail.followers,
            public_repos: detail.public_repos,
            public_contributions: stats.public_contributions,
            total_contributions: stats.total_contributions,
            bio: detail.bio,
            company: detail.company,
            location: detail.location,
            twitter: detail.twitter_username,
            blog: detail.blog,
        }
    }
}

/// Output document for one location (`data/<country>.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentResult {
    pub country: String,
    pub name: String,
    pub users_by_followers: Vec<RankedRecord>,
    pub users_by_public_contributions: Vec<RankedRecord>,
    pub users_by_total_contributions: Vec<RankedRecord>,
}

impl SegmentResult {
    /// Number of successfully enriched users.
    pub fn total_users(&self) -> usize {
        self.users_by_followers.len()
    }
}

/// Per-location rollup in the summary file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub country: String,
    pub name: String,
    pub total_users: usize,
}

/// Output document for the whole run (`data/rankings.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub updated_at: DateTime<Utc>,
    pub locations: Vec<SummaryEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_hit_urls_and_detail_fields() {
        let hit = SearchHit {
            login: "octocat".to_string(),
            html_url: "https://github.com/octocat".to_string(),
            avatar_url: "https://avatars.example/octocat".to_string(),
        };
        let detail = ProfileDetail {
            name: Some("The Octocat".to_string()),
            followers: 42,
            public_repos: 8,
            twitter_username: Some("octo".to_string()),
            ..Default::default()
        };
        let stats = ContributionStats {
            public_contributions: 10,
            total_contributions: 25,
        };

        let record = RankedRecord::merge(hit, detail, stats);
        assert_eq!(record.rank, 0);
        assert_eq!(record.username, "octocat");
        assert_eq!(record.profile_url, "https://github.com/octocat");
        assert_eq!(record.avatar, "https://avatars.example/octocat");
        assert_eq!(record.followers, 42);
        assert_eq!(record.twitter.as_deref(), Some("octo"));
        assert_eq!(record.total_contributions, 25);
        assert!(record.bio.is_none());
    }

    #[test]
    fn detail_tolerates_nulls_and_missing_fields() {
        let detail: ProfileDetail = serde_json::from_str(
            r#"{"login":"x","name":null,"followers":3,"bio":null,"blog":""}"#,
        )
        .unwrap();
        assert_eq!(detail.followers, 3);
        assert_eq!(detail.public_repos, 0);
        assert!(detail.name.is_none());
        assert_eq!(detail.blog.as_deref(), Some(""));
    }

    #[test]
    fn record_serializes_with_output_field_names() {
        let record = RankedRecord::merge(
            SearchHit {
                login: "a".to_string(),
                html_url: String::new(),
                avatar_url: String::new(),
            },
            ProfileDetail::default(),
            ContributionStats::default(),
        );
        let value = serde_json::to_value(&record).unwrap();
        for key in [
            "rank",
            "username",
            "name",
            "avatar",
            "profile_url",
            "followers",
            "public_repos",
            "public_contributions",
            "total_contributions",
            "bio",
            "company",
            "location",
            "twitter",
            "blog",
        ] {
            assert!(value.get(key).is_some(), "missing key {}", key);
        }
    }
}
