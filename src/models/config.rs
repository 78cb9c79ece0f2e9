// src/models/config.rs

//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote API connection settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Retry and pacing settings shared by every remote call
    #[serde(default)]
    pub retry: RetryConfig,

    /// Search filter for the ranking
    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub ranking: RankingConfig,

    /// Target and previous-period collections
    #[serde(default)]
    pub collections: CollectionsConfig,

    #[serde(default)]
    pub paths: PathsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration, using defaults only when the file does not exist.
    ///
    /// A file that exists but cannot be read or parsed is an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("Config not found at {:?}. Using defaults.", path);
                Ok(Self::default())
            }
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.api.user_agent.trim().is_empty() {
            return Err(AppError::validation("api.user_agent is empty"));
        }
        if self.api.timeout_secs == 0 {
            return Err(AppError::validation("api.timeout_secs must be > 0"));
        }
        url::Url::parse(&self.api.base_url)?;
        if self.retry.max_attempts == 0 {
            return Err(AppError::validation("retry.max_attempts must be > 0"));
        }
        if self.query.page_size == 0 {
            return Err(AppError::validation("query.page_size must be > 0"));
        }
        if let Some(max_rank) = self.query.max_rank {
            if max_rank < self.query.min_rank {
                return Err(AppError::validation(
                    "query.max_rank must be >= query.min_rank",
                ));
            }
        }
        if self.ranking.top_n == 0 {
            return Err(AppError::validation("ranking.top_n must be > 0"));
        }
        if self.collections.target_id == 0 || self.collections.previous_id == 0 {
            return Err(AppError::validation("collection ids must be non-zero"));
        }
        Ok(())
    }
}

/// Remote API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Retry budget and pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per request, first try included
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Base delay between attempts in milliseconds
    #[serde(default = "defaults::base_delay")]
    pub base_delay_ms: u64,

    /// Delay between consecutive requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            base_delay_ms: defaults::base_delay(),
            request_delay_ms: defaults::request_delay(),
        }
    }
}

/// Search filter for the listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Catalog category (2 = anime)
    #[serde(default = "defaults::subject_type")]
    pub subject_type: u32,

    /// Only subjects ranked strictly worse than this
    #[serde(default = "defaults::min_rank")]
    pub min_rank: u32,

    #[serde(default)]
    pub max_rank: Option<u32>,

    #[serde(default = "defaults::include_restricted")]
    pub include_restricted: bool,

    #[serde(default = "defaults::page_size")]
    pub page_size: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            subject_type: defaults::subject_type(),
            min_rank: defaults::min_rank(),
            max_rank: None,
            include_restricted: defaults::include_restricted(),
            page_size: defaults::page_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Number of items kept after the publish-order sort
    #[serde(default = "defaults::top_n")]
    pub top_n: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            top_n: defaults::top_n(),
        }
    }
}

/// Collections written to and diffed against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionsConfig {
    /// Collection receiving this period's ranking
    #[serde(default = "defaults::target_id")]
    pub target_id: u64,

    /// Last period's collection, source of the snapshot
    #[serde(default = "defaults::previous_id")]
    pub previous_id: u64,

    /// Push the rendered description (restricted list) to the target
    #[serde(default)]
    pub update_description: bool,

    #[serde(default = "defaults::title")]
    pub title: String,

    /// Lines placed above the restricted list in the description
    #[serde(default = "defaults::description_header")]
    pub description_header: Vec<String>,

    #[serde(default = "defaults::subject_url_prefix")]
    pub subject_url_prefix: String,
}

impl Default for CollectionsConfig {
    fn default() -> Self {
        Self {
            target_id: defaults::target_id(),
            previous_id: defaults::previous_id(),
            update_description: false,
            title: defaults::title(),
            description_header: defaults::description_header(),
            subject_url_prefix: defaults::subject_url_prefix(),
        }
    }
}

/// Local directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "defaults::output_dir")]
    pub output_dir: PathBuf,

    /// Captured collection snapshots (`index_{id}_*.json`)
    #[serde(default = "defaults::snapshot_dir")]
    pub snapshot_dir: PathBuf,

    /// Restricted-namespace snapshots (`ranks_*.json`)
    #[serde(default = "defaults::ranks_dir")]
    pub ranks_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_dir: defaults::output_dir(),
            snapshot_dir: defaults::snapshot_dir(),
            ranks_dir: defaults::ranks_dir(),
        }
    }
}

/// Access token for the remote API.
#[derive(Clone)]
pub struct Credentials {
    token: String,
}

impl Credentials {
    /// Environment variable holding the bearer token.
    pub const ENV_VAR: &'static str = "BANGUMI_ACCESS_TOKEN";

    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(AppError::MissingCredential(Self::ENV_VAR));
        }
        Ok(Self { token })
    }

    /// Read the token from the process environment.
    pub fn from_env() -> Result<Self> {
        let token =
            std::env::var(Self::ENV_VAR).map_err(|_| AppError::MissingCredential(Self::ENV_VAR))?;
        Self::new(token)
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("token", &"***").finish()
    }
}

mod defaults {
    use std::path::PathBuf;

    // API defaults
    pub fn base_url() -> String {
        "https://api.bgm.tv".into()
    }
    pub fn user_agent() -> String {
        "ranksync/0.1 (worst-rated ranking sync)".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Retry defaults
    pub fn max_attempts() -> u32 {
        3
    }
    pub fn base_delay() -> u64 {
        2000
    }
    pub fn request_delay() -> u64 {
        1000
    }

    // Query defaults
    pub fn subject_type() -> u32 {
        2
    }
    pub fn min_rank() -> u32 {
        9500
    }
    pub fn include_restricted() -> bool {
        true
    }
    pub fn page_size() -> usize {
        50
    }

    pub fn top_n() -> usize {
        100
    }

    // Collection defaults
    pub fn target_id() -> u64 {
        87084
    }
    pub fn previous_id() -> u64 {
        74044
    }
    pub fn title() -> String {
        "BANGUMI worst anime TOP100".into()
    }
    pub fn description_header() -> Vec<String> {
        vec![
            "Sorted by catalog rank at compile time, worst first".into(),
            "Arrows after the rank show the change against last period".into(),
            "Restricted subjects are not listed directly and appear below:".into(),
        ]
    }
    pub fn subject_url_prefix() -> String {
        "https://bgm.tv/subject/".into()
    }

    // Path defaults
    pub fn output_dir() -> PathBuf {
        PathBuf::from("output")
    }
    pub fn snapshot_dir() -> PathBuf {
        PathBuf::from("output/indices")
    }
    pub fn ranks_dir() -> PathBuf {
        PathBuf::from("output/ranks")
    }
}
