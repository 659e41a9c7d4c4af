//! Rate-limited GitHub API client.
//!
//! [`GitHubClient`] wraps a `reqwest::Client` and applies the pacing rules
//! the GitHub API expects from a long-running batch job:
//!
//! - every successful call is followed by a fixed delay
//!   (`github.request_delay_ms`), charged per call;
//! - a rate-limit signal (HTTP 403 or 429) suspends the calling task for
//!   `github.rate_limit_cooldown_secs` and retries the *same* request;
//! - any other non-success status fails with [`ApiError::RequestFailed`]
//!   and is not retried here;
//! - transport failures surface as [`ApiError::Transport`].
//!
//! The client holds no mutable state, so one instance is shared by all
//! enrichment workers. A cooldown blocks only the task that hit it.
//!
//! The pipeline talks to the API through the [`ProfileApi`] trait so the
//! orchestrator can be driven by an in-memory implementation in tests.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::config::{Credentials, GitHubConfig};
use crate::error::ApiError;
use crate::models::{ContributionStats, ProfileDetail, SearchHit};

const CONTRIBUTIONS_QUERY: &str = r#"
query($login: String!) {
  user(login: $login) {
    contributionsCollection {
      contributionCalendar {
        totalContributions
      }
      restrictedContributionsCount
    }
  }
}
"#;

/// The three external lookups the pipeline depends on.
#[async_trait]
pub trait ProfileApi: Send + Sync {
    /// Fetch one page of the user search, sorted by followers descending.
    async fn search_users(
        &self,
        query: &str,
        page: u32,
        per_page: usize,
    ) -> Result<Vec<SearchHit>, ApiError>;

    /// Fetch the full profile of `login`.
    async fn user_detail(&self, login: &str) -> Result<ProfileDetail, ApiError>;

    /// Fetch public and total contribution counts for `login`.
    async fn contributions(&self, login: &str) -> Result<ContributionStats, ApiError>;
}

pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    graphql_url: String,
    delay: Duration,
    cooldown: Duration,
}

impl GitHubClient {
    /// Build a client from `[github]` settings and a resolved credential.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Parse`] if the token cannot be used as a header
    /// value, or [`ApiError::Transport`] if the HTTP client fails to build.
    pub fn new(config: &GitHubConfig, credentials: Credentials) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("token {}", credentials.token()))
            .map_err(|_| ApiError::Parse("API token contains invalid characters".to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github.v3+json"),
        );

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            graphql_url: config.graphql_url.clone(),
            delay: config.request_delay(),
            cooldown: config.rate_limit_cooldown(),
        })
    }

    /// Send the request produced by `build`, cooling down and re-sending on
    /// rate-limit signals, and decode a successful body as `T`.
    async fn execute<T, F>(&self, what: &str, build: F) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        F: Fn() -> reqwest::RequestBuilder,
    {
        loop {
            let resp = build().send().await?;
            match check_response(resp).await {
                Ok(resp) => {
                    let text = resp.text().await?;
                    let body = serde_json::from_str(&text)
                        .map_err(|e| ApiError::Parse(format!("{}: {}", what, e)))?;
                    tokio::time::sleep(self.delay).await;
                    return Ok(body);
                }
                Err(ApiError::RateLimited { status }) => {
                    tracing::warn!(
                        request = what,
                        status,
                        cooldown_secs = self.cooldown.as_secs_f64(),
                        "rate limit reached, waiting"
                    );
                    tokio::time::sleep(self.cooldown).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl ProfileApi for GitHubClient {
    async fn search_users(
        &self,
        query: &str,
        page: u32,
        per_page: usize,
    ) -> Result<Vec<SearchHit>, ApiError> {
        let url = format!("{}/search/users", self.api_url);
        let page = page.to_string();
        let per_page = per_page.to_string();
        let data: SearchResponse = self
            .execute("search", || {
                self.http.get(&url).query(&[
                    ("q", query),
                    ("sort", "followers"),
                    ("order", "desc"),
                    ("per_page", per_page.as_str()),
                    ("page", page.as_str()),
                ])
            })
            .await?;
        Ok(data.items)
    }

    async fn user_detail(&self, login: &str) -> Result<ProfileDetail, ApiError> {
        let url = format!("{}/users/{}", self.api_url, login);
        self.execute("user detail", || self.http.get(&url)).await
    }

    async fn contributions(&self, login: &str) -> Result<ContributionStats, ApiError> {
        let body = serde_json::json!({
            "query": CONTRIBUTIONS_QUERY,
            "variables": { "login": login },
        });
        let data: GraphQlResponse = self
            .execute("contributions", || self.http.post(&self.graphql_url).json(&body))
            .await?;
        data.into_stats()
    }
}

/// Map rate-limit and failure statuses to errors; pass successes through.
pub(crate) async fn check_response(
    resp: reqwest::Response,
) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ApiError::RateLimited {
            status: status.as_u16(),
        });
    }
    if !status.is_success() {
        return Err(ApiError::RequestFailed {
            status: status.as_u16(),
            message: resp.text().await.unwrap_or_default(),
        });
    }
    Ok(resp)
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<GraphQlData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlData {
    user: Option<GraphQlUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphQlUser {
    contributions_collection: ContributionsCollection,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContributionsCollection {
    contribution_calendar: ContributionCalendar,
    #[serde(default)]
    restricted_contributions_count: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContributionCalendar {
    #[serde(default)]
    total_contributions: u64,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

impl GraphQlResponse {
    fn into_stats(self) -> Result<ContributionStats, ApiError> {
        match self.data.and_then(|d| d.user) {
            Some(user) => {
                let collection = user.contributions_collection;
                let public = collection.contribution_calendar.total_contributions;
                Ok(ContributionStats {
                    public_contributions: public,
                    total_contributions: public + collection.restricted_contributions_count,
                })
            }
            None => {
                let message = self
                    .errors
                    .into_iter()
                    .map(|e| e.message)
                    .collect::<Vec<_>>()
                    .join("; ");
                Err(ApiError::Parse(if message.is_empty() {
                    "contributions response has no user".to_string()
                } else {
                    message
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_response(status: u16, body: &str) -> reqwest::Response {
        reqwest::Response::from(
            ::http::Response::builder()
                .status(status)
                .body(body.to_string())
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn forbidden_is_rate_limited() {
        let err = check_response(mock_response(403, "")).await.unwrap_err();
        assert!(matches!(err, ApiError::RateLimited { status: 403 }));
    }

    #[tokio::test]
    async fn too_many_requests_is_rate_limited() {
        let err = check_response(mock_response(429, "")).await.unwrap_err();
        assert!(matches!(err, ApiError::RateLimited { status: 429 }));
    }

    #[tokio::test]
    async fn server_error_is_request_failed_with_body() {
        let err = check_response(mock_response(502, "bad gateway"))
            .await
            .unwrap_err();
        match err {
            ApiError::RequestFailed { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "bad gateway");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn success_passes_through() {
        assert!(check_response(mock_response(200, "{}")).await.is_ok());
    }

    #[test]
    fn parse_search_response() {
        let data: SearchResponse = serde_json::from_str(
            r#"{
                "total_count": 2,
                "incomplete_results": false,
                "items": [
                    {"login": "torvalds", "html_url": "https://github.com/torvalds", "avatar_url": "https://a/1", "score": 1.0},
                    {"login": "gvanrossum", "html_url": "https://github.com/gvanrossum", "avatar_url": "https://a/2", "score": 1.0}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(data.items.len(), 2);
        assert_eq!(data.items[0].login, "torvalds");
        assert_eq!(data.items[1].avatar_url, "https://a/2");
    }

    #[test]
    fn search_response_without_items_is_empty() {
        let data: SearchResponse = serde_json::from_str(r#"{"total_count": 0}"#).unwrap();
        assert!(data.items.is_empty());
    }

    #[test]
    fn contributions_add_restricted_to_total() {
        let data: GraphQlResponse = serde_json::from_str(
            r#"{"data":{"user":{"contributionsCollection":{
                "contributionCalendar":{"totalContributions":120},
                "restrictedContributionsCount":30}}}}"#,
        )
        .unwrap();
        let stats = data.into_stats().unwrap();
        assert_eq!(stats.public_contributions, 120);
        assert_eq!(stats.total_contributions, 150);
    }

    #[test]
    fn contributions_null_user_is_parse_error() {
        let data: GraphQlResponse = serde_json::from_str(
            r#"{"data":{"user":null},"errors":[{"message":"Could not resolve to a User"}]}"#,
        )
        .unwrap();
        let err = data.into_stats().unwrap_err();
        assert!(err.to_string().contains("Could not resolve"));
    }

    #[test]
    fn client_builds_from_default_config() {
        let client = GitHubClient::new(&GitHubConfig::default(), Credentials::new("t"));
        assert!(client.is_ok());
    }

    #[test]
    fn client_rejects_unprintable_token() {
        let result = GitHubClient::new(&GitHubConfig::default(), Credentials::new("bad\ntoken"));
        assert!(matches!(result, Err(ApiError::Parse(_))));
    }
}
