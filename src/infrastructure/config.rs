//! Configuration infrastructure
//!
//! Settings live in `<config_dir>/truestar-reviews/config.json` and can be
//! overridden per key with `TRUESTAR__<SECTION>__<KEY>` environment variables
//! (for example `TRUESTAR__FETCH__MAX_RETRIES=5`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;
use url::Url;

use super::error_reporter::Preferences;
use super::page_fetcher::FetchMode;
use super::rate_limiter::RateLimiterConfig;
use super::retry_policy::RetryPolicy;

pub const ENV_PREFIX: &str = "TRUESTAR";
pub const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scoring: ScoringConfig,
    pub fetch: FetchConfig,
    pub cache: CacheConfig,
    pub preferences: Preferences,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

/// Where sampled review pages are requested from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Review listing pages by URL
    #[default]
    Url,
    /// Marketplace AJAX paging endpoint (needs the page's CSRF token)
    Ajax,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub marketplace_base_url: String,
    pub transport: TransportKind,
    pub mode: FetchMode,
    pub stagger_delay_ms: u64,
    pub max_requests_per_window: usize,
    pub window_ms: u64,
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub request_timeout_seconds: u64,
    pub user_agent: String,
    /// Deepest page the AJAX endpoint serves
    pub max_ajax_pages: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_minutes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,
    pub json_format: bool,
    pub console_output: bool,
    pub file_output: bool,
    /// Number of log files to keep
    pub max_files: u32,
    pub auto_cleanup_logs: bool,
    /// Module-specific level overrides (e.g. "reqwest": "warn")
    pub module_filters: HashMap<String, String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::SCORING_BASE_URL.to_string(),
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            marketplace_base_url: defaults::MARKETPLACE_BASE_URL.to_string(),
            transport: TransportKind::default(),
            mode: FetchMode::default(),
            stagger_delay_ms: defaults::STAGGER_DELAY_MS,
            max_requests_per_window: defaults::MAX_REQUESTS_PER_WINDOW,
            window_ms: defaults::WINDOW_MS,
            max_retries: defaults::MAX_RETRIES,
            initial_delay_ms: defaults::INITIAL_RETRY_DELAY_MS,
            max_delay_ms: defaults::MAX_RETRY_DELAY_MS,
            request_timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            user_agent: super::http_client::DEFAULT_USER_AGENT.to_string(),
            max_ajax_pages: defaults::MAX_AJAX_PAGES,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: defaults::CACHE_TTL_MINUTES,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: false,
            console_output: true,
            file_output: false,
            max_files: defaults::LOG_MAX_FILES,
            auto_cleanup_logs: true,
            module_filters: HashMap::from([
                ("reqwest".to_string(), "warn".to_string()),
                ("hyper".to_string(), "warn".to_string()),
                ("truestar_reviews_lib".to_string(), "info".to_string()),
            ]),
        }
    }
}

impl FetchConfig {
    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.marketplace_base_url)
            .with_context(|| format!("Invalid marketplace URL: {}", self.marketplace_base_url))
    }

    pub fn rate_limiter(&self) -> RateLimiterConfig {
        RateLimiterConfig {
            max_requests: self.max_requests_per_window,
            window: Duration::from_millis(self.window_ms),
        }
    }

    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.initial_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.scoring.base_url)
            .with_context(|| format!("Invalid scoring URL: {}", self.scoring.base_url))?;
        self.fetch.base_url()?;

        ensure!(self.scoring.timeout_seconds > 0, "scoring.timeout_seconds must be > 0");
        ensure!(
            self.fetch.max_requests_per_window > 0,
            "fetch.max_requests_per_window must be > 0"
        );
        ensure!(self.fetch.window_ms > 0, "fetch.window_ms must be > 0");
        ensure!(
            self.fetch.request_timeout_seconds > 0,
            "fetch.request_timeout_seconds must be > 0"
        );
        ensure!(
            self.fetch.initial_delay_ms <= self.fetch.max_delay_ms,
            "fetch.initial_delay_ms must not exceed fetch.max_delay_ms"
        );
        ensure!(self.fetch.max_ajax_pages > 0, "fetch.max_ajax_pages must be > 0");
        ensure!(self.cache.ttl_minutes > 0, "cache.ttl_minutes must be > 0");
        Ok(())
    }
}

pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join("truestar-reviews");
        Ok(config_dir)
    }

    pub fn new() -> Result<Self> {
        Ok(Self::with_path(Self::get_config_dir()?.join("config.json")))
    }

    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the file layered with process environment overrides.
    /// Writes the defaults first when no file exists yet.
    pub async fn load_config(&self) -> Result<AppConfig> {
        self.load_with_env(None).await
    }

    /// Same as [`Self::load_config`] with an explicit environment map.
    pub async fn load_with_env(&self, env: Option<HashMap<String, String>>) -> Result<AppConfig> {
        if !fs::try_exists(&self.config_path).await.unwrap_or(false) {
            info!("🎉 First run detected - writing default configuration to {:?}", self.config_path);
            self.save_config(&AppConfig::default()).await?;
        }

        let mut environment = config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true);
        if let Some(env) = env {
            environment = environment.source(Some(env.into_iter().collect()));
        }

        let settings = config::Config::builder()
            .add_source(
                config::File::from(self.config_path.as_path())
                    .format(config::FileFormat::Json)
                    .required(false),
            )
            .add_source(environment)
            .build()
            .with_context(|| format!("Failed to read configuration {:?}", self.config_path))?;

        let config: AppConfig = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;

        info!("Loaded configuration from: {:?}", self.config_path);
        Ok(config)
    }

    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;
        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;

        info!("Saved configuration to: {:?}", self.config_path);
        Ok(())
    }

    pub async fn reset_to_defaults(&self) -> Result<AppConfig> {
        info!("🔄 Resetting configuration to defaults");
        let default_config = AppConfig::default();
        self.save_config(&default_config).await?;
        Ok(default_config)
    }
}

pub mod defaults {
    pub const SCORING_BASE_URL: &str = "https://api.truestar.pro";
    pub const MARKETPLACE_BASE_URL: &str = "https://www.amazon.com";

    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;

    /// Pause between issuances in staggered mode
    pub const STAGGER_DELAY_MS: u64 = 200;

    pub const MAX_REQUESTS_PER_WINDOW: usize = 5;
    pub const WINDOW_MS: u64 = 1000;

    pub const MAX_RETRIES: u32 = 3;
    pub const INITIAL_RETRY_DELAY_MS: u64 = 500;
    pub const MAX_RETRY_DELAY_MS: u64 = 5000;

    pub const MAX_AJAX_PAGES: u32 = 10;

    pub const CACHE_TTL_MINUTES: u64 = 60;

    pub const LOG_LEVEL: &str = "info";
    pub const LOG_MAX_FILES: u32 = 7;
}
