//! Configuration parsing and validation.
//!
//! devrank is configured via a TOML file (default: `config/devrank.toml`).
//! The file lists the locations to collect, the GitHub API settings, the
//! collection limits, and where output files are written.
//!
//! # Example
//!
//! ```toml
//! [github]
//! request_delay_ms = 1500
//!
//! [collect]
//! max_users_per_location = 100
//!
//! [output]
//! data_dir = "./data"
//!
//! [[locations]]
//! country = "brazil"
//! name = "Brazil"
//! min_followers = 50
//! ```
//!
//! The API token is never read from the file. It is resolved once at startup
//! from the environment variable named by `github.token_env` (a `.env` file
//! is honoured) and handed to the client as [`Credentials`].

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::Segment;

/// Top-level configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub collect: CollectConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub locations: Vec<LocationConfig>,
}

/// `[github]`: external API endpoints and pacing.
#[derive(Debug, Deserialize, Clone)]
pub struct GitHubConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_graphql_url")]
    pub graphql_url: String,
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// Delay charged after every successful call, in milliseconds.
    #[serde(default)]
    pub request_delay_ms: Option<u64>,
    /// Same delay in (fractional) seconds. `request_delay_ms` wins if both are set.
    #[serde(default)]
    pub request_delay: Option<f64>,
    #[serde(default = "default_cooldown_secs")]
    pub rate_limit_cooldown_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            graphql_url: default_graphql_url(),
            token_env: default_token_env(),
            request_delay_ms: None,
            request_delay: None,
            rate_limit_cooldown_secs: default_cooldown_secs(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl GitHubConfig {
    pub fn request_delay(&self) -> Duration {
        match (self.request_delay_ms, self.request_delay) {
            (Some(ms), _) => Duration::from_millis(ms),
            (None, Some(secs)) => Duration::try_from_secs_f64(secs)
                .unwrap_or_else(|_| Duration::from_millis(DEFAULT_REQUEST_DELAY_MS)),
            (None, None) => Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
        }
    }

    pub fn rate_limit_cooldown(&self) -> Duration {
        Duration::from_secs(self.rate_limit_cooldown_secs)
    }
}

const DEFAULT_REQUEST_DELAY_MS: u64 = 1500;

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}
fn default_graphql_url() -> String {
    "https://api.github.com/graphql".to_string()
}
fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}
fn default_cooldown_secs() -> u64 {
    60
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    format!("devrank/{}", env!("CARGO_PKG_VERSION"))
}

/// `[collect]`: per-segment limits and enrichment parallelism.
#[derive(Debug, Deserialize, Clone)]
pub struct CollectConfig {
    #[serde(default = "default_max_users")]
    pub max_users_per_location: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            max_users_per_location: default_max_users(),
            page_size: default_page_size(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_max_users() -> usize {
    100
}
fn default_page_size() -> usize {
    100
}
fn default_concurrency() -> usize {
    5
}

/// `[output]`: where segment files, the summary, and the checkpoint live.
#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Defaults to `<data_dir>/checkpoint.json`.
    #[serde(default)]
    pub checkpoint_path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            checkpoint_path: None,
        }
    }
}

impl OutputConfig {
    pub fn checkpoint_path(&self) -> PathBuf {
        self.checkpoint_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("checkpoint.json"))
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            static_dir: None,
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

/// One `[[locations]]` entry.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LocationConfig {
    /// Location key; used in the search filter and as the output file name.
    pub country: String,
    /// Display name.
    pub name: String,
    #[serde(default)]
    pub min_followers: u32,
    /// Search filter value when it differs from the key (e.g. `"san francisco"`).
    #[serde(default)]
    pub query: Option<String>,
}

impl Config {
    /// Segments in configuration order, each carrying the global result cap.
    pub fn segments(&self) -> Vec<Segment> {
        self.locations
            .iter()
            .map(|loc| Segment {
                key: loc.country.clone(),
                name: loc.name.clone(),
                location_filter: loc.query.clone().unwrap_or_else(|| loc.country.clone()),
                min_followers: loc.min_followers,
                max_results: self.collect.max_users_per_location,
            })
            .collect()
    }

    pub fn location(&self, key: &str) -> Option<&LocationConfig> {
        self.locations.iter().find(|l| l.country == key)
    }
}

/// Whether `key` is safe to use as a file stem under the data directory.
pub fn is_valid_location_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// File stems already used in the data directory.
const RESERVED_KEYS: [&str; 2] = ["rankings", "checkpoint"];

/// Whether `key` names the summary or checkpoint file rather than a location.
pub fn is_reserved_location_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

fn validate(config: &Config) -> Result<()> {
    if config.locations.is_empty() {
        bail!("at least one [[locations]] entry is required");
    }

    let mut seen = HashSet::new();
    for loc in &config.locations {
        if !is_valid_location_key(&loc.country) {
            bail!(
                "invalid location key '{}': only letters, digits, '-' and '_' are allowed",
                loc.country
            );
        }
        if is_reserved_location_key(&loc.country) {
            bail!("location key '{}' is reserved", loc.country);
        }
        if !seen.insert(loc.country.as_str()) {
            bail!("duplicate location key '{}'", loc.country);
        }
    }

    if config.collect.max_users_per_location == 0 {
        bail!("collect.max_users_per_location must be >= 1");
    }
    if !(1..=100).contains(&config.collect.page_size) {
        bail!("collect.page_size must be in [1, 100]");
    }
    if config.collect.concurrency == 0 {
        bail!("collect.concurrency must be >= 1");
    }
    if let Some(secs) = config.github.request_delay {
        if Duration::try_from_secs_f64(secs).is_err() {
            bail!("github.request_delay must be a non-negative number of seconds");
        }
    }

    Ok(())
}

/// API credential, resolved once at startup and owned by the client.
#[derive(Clone)]
pub struct Credentials {
    token: String,
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Read the token from `var`, after loading a `.env` file if one exists.
    ///
    /// # Errors
    ///
    /// Fails if the variable is unset or blank.
    pub fn from_env(var: &str) -> Result<Self> {
        let _ = dotenvy::dotenv();
        match std::env::var(var) {
            Ok(token) if !token.trim().is_empty() => Ok(Self::new(token.trim())),
            _ => bail!("{} not found: set it in the environment or a .env file", var),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_str)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = parse(
            r#"
            [[locations]]
            country = "brazil"
            name = "Brazil"
            "#,
        )
        .unwrap();

        assert_eq!(config.collect.max_users_per_location, 100);
        assert_eq!(config.collect.concurrency, 5);
        assert_eq!(config.github.request_delay(), Duration::from_millis(1500));
        assert_eq!(config.github.rate_limit_cooldown(), Duration::from_secs(60));
        assert_eq!(
            config.output.checkpoint_path(),
            PathBuf::from("./data").join("checkpoint.json")
        );
        assert_eq!(config.locations[0].min_followers, 0);
    }

    #[test]
    fn request_delay_seconds_alias() {
        let config = parse(
            r#"
            [github]
            request_delay = 1.0

            [[locations]]
            country = "chile"
            name = "Chile"
            "#,
        )
        .unwrap();
        assert_eq!(config.github.request_delay(), Duration::from_secs(1));
    }

    #[test]
    fn request_delay_ms_wins_over_seconds() {
        let config = parse(
            r#"
            [github]
            request_delay = 2.0
            request_delay_ms = 10

            [[locations]]
            country = "chile"
            name = "Chile"
            "#,
        )
        .unwrap();
        assert_eq!(config.github.request_delay(), Duration::from_millis(10));
    }

    #[test]
    fn segments_follow_config_order_and_cap() {
        let config = parse(
            r#"
            [collect]
            max_users_per_location = 250

            [[locations]]
            country = "peru"
            name = "Peru"
            min_followers = 10

            [[locations]]
            country = "argentina"
            name = "Argentina"
            min_followers = 40
            "#,
        )
        .unwrap();

        let segments = config.segments();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].key, "peru");
        assert_eq!(segments[1].key, "argentina");
        assert_eq!(segments[1].min_followers, 40);
        assert!(segments.iter().all(|s| s.max_results == 250));
        assert_eq!(segments[0].location_filter, "peru");
    }

    #[test]
    fn query_overrides_location_filter() {
        let config = parse(
            r#"
            [[locations]]
            country = "sf"
            name = "San Francisco"
            query = "\"san francisco\""
            "#,
        )
        .unwrap();
        assert_eq!(config.segments()[0].location_filter, "\"san francisco\"");
    }

    #[test]
    fn rejects_empty_locations() {
        let err = parse("[collect]\nconcurrency = 5\n").unwrap_err();
        assert!(err.to_string().contains("locations"));
    }

    #[test]
    fn rejects_duplicate_keys() {
        let err = parse(
            r#"
            [[locations]]
            country = "peru"
            name = "Peru"

            [[locations]]
            country = "peru"
            name = "Peru again"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn rejects_path_like_keys() {
        let err = parse(
            r#"
            [[locations]]
            country = "../etc"
            name = "Nope"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid location key"));
    }

    #[test]
    fn rejects_reserved_keys() {
        let err = parse(
            r#"
            [[locations]]
            country = "rankings"
            name = "Rankings"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn rejects_oversized_page() {
        let err = parse(
            r#"
            [collect]
            page_size = 101

            [[locations]]
            country = "peru"
            name = "Peru"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("page_size"));
    }

    #[test]
    fn rejects_unrepresentable_request_delay() {
        for value in ["1e30", "-0.5"] {
            let err = parse(&format!(
                r#"
                [github]
                request_delay = {}

                [[locations]]
                country = "peru"
                name = "Peru"
                "#,
                value
            ))
            .unwrap_err();
            assert!(err.to_string().contains("request_delay"), "{}", value);
        }

        let unchecked = GitHubConfig {
            request_delay: Some(1e30),
            ..Default::default()
        };
        assert_eq!(unchecked.request_delay(), Duration::from_millis(1500));
    }

    #[test]
    fn location_key_validation() {
        assert!(is_valid_location_key("sao-paulo"));
        assert!(is_valid_location_key("new_york"));
        assert!(!is_valid_location_key(""));
        assert!(!is_valid_location_key("a/b"));
        assert!(!is_valid_location_key("a b"));
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let creds = Credentials::new("ghp_secret");
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("ghp_secret"));
        assert_eq!(creds.token(), "ghp_secret");
    }
}
