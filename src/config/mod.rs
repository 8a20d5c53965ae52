//! Configuration management.
//!
//! Every field has a default, so an empty or missing config file is valid.
//!
//! ```toml
//! [scholar]
//! base_url = "https://scholar.google.com"
//! language = "en"
//! pages = 1
//!
//! [network]
//! request_timeout_secs = 30
//! connect_timeout_secs = 10
//! call_timeout_secs = 90
//!
//! [retry]
//! max_attempts = 3
//! initial_delay_ms = 1000
//! max_delay_ms = 8000
//! backoff_multiplier = 2.0
//!
//! [pdf]
//! max_query_words = 20
//!
//! [export]
//! strategy = "remote"
//! ```
//!
//! Environment variables override file values, e.g. `GSCHOLAR_SCHOLAR__PAGES=2`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::RetryConfig;

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "GSCHOLAR";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scholar: ScholarConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub pdf: PdfConfig,

    #[serde(default)]
    pub export: ExportConfig,
}

/// Scholar endpoint and identity settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScholarConfig {
    /// Base URL of the search service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Browser-like User-Agent presented to the service
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Interface language (`hl` parameter)
    #[serde(default = "default_language")]
    pub language: String,

    /// Number of result pages to fetch per search
    #[serde(default = "default_pages")]
    pub pages: usize,
}

impl Default for ScholarConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            language: default_language(),
            pages: default_pages(),
        }
    }
}

fn default_base_url() -> String {
    "https://scholar.google.com".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_pages() -> usize {
    1
}

/// Timeouts for outbound requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Bound on a single HTTP attempt
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Bound on one whole network call, retries and backoff included
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            call_timeout_secs: default_call_timeout(),
        }
    }
}

impl NetworkConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_call_timeout() -> u64 {
    90
}

/// Retry/backoff settings for transient failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> u64 {
    1000
}

fn default_max_delay() -> u64 {
    8000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

/// PDF query derivation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfConfig {
    /// Cap on the number of words sent as the derived query
    #[serde(default = "default_max_query_words")]
    pub max_query_words: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            max_query_words: default_max_query_words(),
        }
    }
}

fn default_max_query_words() -> usize {
    20
}

/// How citations are rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStrategy {
    /// Fetch the service's per-format export and pass it through
    #[default]
    Remote,
    /// Reconstruct the export from parsed record fields
    Local,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub strategy: ExportStrategy,
}

impl Config {
    /// Retry policy for one network call
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.retry.max_attempts.max(1),
            initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            backoff_multiplier: self.retry.backoff_multiplier,
            max_total_time: Duration::from_secs(self.network.call_timeout_secs),
        }
    }
}

/// Load configuration from an optional file plus `GSCHOLAR_*` environment overrides
pub fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}

/// Find the config file in the default locations
pub fn find_config_file() -> Option<PathBuf> {
    let candidates = [
        dirs::config_dir().map(|dir| dir.join("gscholar").join("config.toml")),
        Some(PathBuf::from("gscholar.toml")),
    ];

    candidates.into_iter().flatten().find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scholar.base_url, "https://scholar.google.com");
        assert_eq!(config.scholar.pages, 1);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.pdf.max_query_words, 20);
        assert_eq!(config.export.strategy, ExportStrategy::Remote);
    }

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[scholar]
base_url = "http://127.0.0.1:9999"
pages = 2

[retry]
max_attempts = 5

[export]
strategy = "local"
"#
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.scholar.base_url, "http://127.0.0.1:9999");
        assert_eq!(config.scholar.pages, 2);
        assert_eq!(config.scholar.language, "en");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.export.strategy, ExportStrategy::Local);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config(Some(Path::new("/nonexistent/gscholar.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_retry_config_bounds() {
        let mut config = Config::default();
        config.retry.max_attempts = 0;
        config.network.call_timeout_secs = 12;

        let retry = config.retry_config();
        assert_eq!(retry.max_attempts, 1);
        assert_eq!(retry.max_total_time, Duration::from_secs(12));
    }
}
