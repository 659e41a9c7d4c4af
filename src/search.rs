//! Paginated user search for one location.
//!
//! Walks the search endpoint page by page with a
//! `location:<value> followers:>=<n>` filter until the segment's result cap
//! is reached, a page comes back empty, or a request fails. Partial results
//! are a normal outcome: whatever was accumulated before a failure is
//! returned. Rate-limit cooldowns happen inside the client, so a limited
//! page is re-requested rather than skipped.

use crate::client::ProfileApi;
use crate::models::{SearchHit, Segment};

/// Build the search filter string for a segment.
pub fn search_filter(segment: &Segment) -> String {
    format!(
        "location:{} followers:>={}",
        segment.location_filter, segment.min_followers
    )
}

/// Collect up to `segment.max_results` hits, in the order the API returns them.
///
/// The page size stays fixed for the whole walk (`min(page_size,
/// max_results)`) so page offsets line up; the last page may overshoot and
/// the result is truncated to the cap.
pub async fn search_segment(
    api: &dyn ProfileApi,
    segment: &Segment,
    page_size: usize,
) -> Vec<SearchHit> {
    let query = search_filter(segment);
    let per_page = page_size.min(segment.max_results).max(1);
    let mut hits: Vec<SearchHit> = Vec::new();
    let mut page: u32 = 1;

    while hits.len() < segment.max_results {
        match api.search_users(&query, page, per_page).await {
            Ok(items) if items.is_empty() => {
                tracing::debug!(segment = %segment.key, page, "empty page, search exhausted");
                break;
            }
            Ok(items) => {
                tracing::debug!(segment = %segment.key, page, count = items.len(), "search page");
                hits.extend(items);
                page += 1;
            }
            Err(e) => {
                tracing::warn!(
                    segment = %segment.key,
                    page,
                    error = %e,
                    "search failed, keeping {} hits",
                    hits.len()
                );
                break;
            }
        }
    }

    hits.truncate(segment.max_results);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::models::{ContributionStats, ProfileDetail};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Serves `available` users split into pages; optionally fails one page.
    struct PagedApi {
        available: usize,
        fail_page: Option<u32>,
        calls: Mutex<Vec<(u32, usize)>>,
    }

    impl PagedApi {
        fn new(available: usize) -> Self {
            Self {
                available,
                fail_page: None,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ProfileApi for PagedApi {
        async fn search_users(
            &self,
            _query: &str,
            page: u32,
            per_page: usize,
        ) -> Result<Vec<SearchHit>, ApiError> {
            self.calls.lock().unwrap().push((page, per_page));
            if self.fail_page == Some(page) {
                return Err(ApiError::RequestFailed {
                    status: 422,
                    message: "Only the first 1000 search results are available".to_string(),
                });
            }
            let start = (page as usize - 1) * per_page;
            let end = (start + per_page).min(self.available);
            Ok((start..end.max(start))
                .map(|i| SearchHit {
                    login: format!("user{}", i),
                    html_url: String::new(),
                    avatar_url: String::new(),
                })
                .collect())
        }

        async fn user_detail(&self, _login: &str) -> Result<ProfileDetail, ApiError> {
            unreachable!()
        }

        async fn contributions(&self, _login: &str) -> Result<ContributionStats, ApiError> {
            unreachable!()
        }
    }

    fn segment(max_results: usize) -> Segment {
        Segment {
            key: "peru".to_string(),
            name: "Peru".to_string(),
            location_filter: "peru".to_string(),
            min_followers: 25,
            max_results,
        }
    }

    #[test]
    fn filter_string() {
        assert_eq!(search_filter(&segment(10)), "location:peru followers:>=25");
    }

    #[tokio::test]
    async fn stops_at_cap_with_exact_count() {
        let api = PagedApi::new(1000);
        let hits = search_segment(&api, &segment(250), 100).await;
        assert_eq!(hits.len(), 250);
        assert_eq!(hits[0].login, "user0");
        assert_eq!(hits[249].login, "user249");
        assert_eq!(
            *api.calls.lock().unwrap(),
            vec![(1, 100), (2, 100), (3, 100)]
        );
    }

    #[tokio::test]
    async fn stops_on_empty_page_before_cap() {
        let api = PagedApi::new(120);
        let hits = search_segment(&api, &segment(250), 100).await;
        assert_eq!(hits.len(), 120);
        // page 2 is partial, page 3 is empty
        assert_eq!(api.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn no_duplicates_across_pages() {
        let api = PagedApi::new(1000);
        let hits = search_segment(&api, &segment(250), 100).await;
        let mut logins: Vec<_> = hits.iter().map(|h| h.login.clone()).collect();
        logins.sort();
        logins.dedup();
        assert_eq!(logins.len(), 250);
    }

    #[tokio::test]
    async fn failure_returns_partial_results() {
        let mut api = PagedApi::new(1000);
        api.fail_page = Some(2);
        let hits = search_segment(&api, &segment(250), 100).await;
        assert_eq!(hits.len(), 100);
    }

    #[tokio::test]
    async fn small_cap_shrinks_page_size() {
        let api = PagedApi::new(1000);
        let hits = search_segment(&api, &segment(30), 100).await;
        assert_eq!(hits.len(), 30);
        assert_eq!(*api.calls.lock().unwrap(), vec![(1, 30)]);
    }

    #[tokio::test]
    async fn nothing_available() {
        let api = PagedApi::new(0);
        let hits = search_segment(&api, &segment(100), 100).await;
        assert!(hits.is_empty());
    }
}
