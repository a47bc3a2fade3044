//! Configuration management for wdgraph
//!
//! Application settings come from a TOML file (`wdgraph.toml`) with
//! environment overrides (`WDGRAPH_*`). The country, class and project
//! documents are YAML and live in [`documents`].
//!
//! Everything is constructed once at process start and passed by reference
//! into the components that need it.

pub mod documents;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::filter::FilterConfig;
use crate::models::LanguagePriority;
use crate::utils::error::ConfigError;
use crate::utils::retry::RetryConfig;

pub use documents::{ClassConfig, ClassSpec, CountryConfig, ProjectConfig};

/// Default public SPARQL endpoint
pub const DEFAULT_ENDPOINT: &str = "https://query.wikidata.org/sparql";

/// File looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "wdgraph.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SPARQL endpoint configuration
    pub endpoint: EndpointConfig,

    /// Retry policy for transient query failures
    pub retry: RetryConfig,

    /// On-disk response cache
    pub cache: CacheConfig,

    /// Country-membership cascade batch sizes
    pub filter: FilterConfig,

    /// Pipeline inputs and outputs
    pub pipeline: PipelineConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// SPARQL endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Endpoint URL
    pub url: String,

    /// User agent string identifying this client to the endpoint operators
    pub user_agent: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Pause after every successful network call, in milliseconds
    pub courtesy_delay_ms: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ENDPOINT.to_string(),
            user_agent: format!(
                "wdgraph/{} (+https://github.com/wdgraph/wdgraph)",
                env!("CARGO_PKG_VERSION")
            ),
            timeout_secs: 120,
            courtesy_delay_ms: 120,
        }
    }
}

impl EndpointConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn courtesy_delay(&self) -> Duration {
        Duration::from_millis(self.courtesy_delay_ms)
    }
}

/// Pipeline inputs and outputs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Label languages, highest priority first
    pub label_languages: LanguagePriority,

    /// Entities per label query
    pub label_batch_size: usize,

    /// Directory holding countries.yml, classes.yml, project.yml, property_pool.yml
    pub config_dir: PathBuf,

    /// Directory holding subject lists
    pub data_dir: PathBuf,

    /// Base output directory; graphs land in `<output_dir>/<country-slug>/`
    pub output_dir: PathBuf,

    /// Seed for property sampling; entropy when absent
    pub seed: Option<u64>,

    /// Wikipedia edition required when sampling subjects
    pub wiki_lang: String,

    /// Maximum subjects per class when sampling subjects
    pub limit_per_class: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            label_languages: LanguagePriority::default(),
            label_batch_size: 200,
            config_dir: PathBuf::from("config"),
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("graphs"),
            seed: None,
            wiki_lang: String::from("es"),
            limit_per_class: 50,
        }
    }
}

impl PipelineConfig {
    pub fn countries_path(&self) -> PathBuf {
        self.config_dir.join("countries.yml")
    }

    pub fn project_path(&self) -> PathBuf {
        self.config_dir.join("project.yml")
    }

    pub fn classes_path(&self) -> PathBuf {
        self.config_dir.join("classes.yml")
    }

    pub fn property_pool_path(&self) -> PathBuf {
        self.config_dir.join("property_pool.yml")
    }

    /// `data/subjects_<slug>.csv` when present, `data/subjects.csv` otherwise
    pub fn subjects_path(&self, country_slug: &str) -> PathBuf {
        let preferred = self.data_dir.join(format!("subjects_{country_slug}.csv"));
        if preferred.exists() {
            preferred
        } else {
            self.data_dir.join("subjects.csv")
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Config {
    /// Load configuration: explicit file, else `wdgraph.toml` if present, else
    /// defaults; then environment overrides; then validation
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from defaults plus environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::Missing {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Apply `WDGRAPH_*` environment overrides
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = std::env::var("WDGRAPH_ENDPOINT") {
            self.endpoint.url = url;
        }

        if let Ok(user_agent) = std::env::var("WDGRAPH_USER_AGENT") {
            self.endpoint.user_agent = user_agent;
        }

        if let Some(timeout) = env_parse::<u64>("WDGRAPH_TIMEOUT")? {
            self.endpoint.timeout_secs = timeout;
        }

        if let Some(delay) = env_parse::<u64>("WDGRAPH_COURTESY_DELAY_MS")? {
            self.endpoint.courtesy_delay_ms = delay;
        }

        if let Some(attempts) = env_parse::<u32>("WDGRAPH_MAX_ATTEMPTS")? {
            self.retry.max_attempts = attempts;
        }

        if let Ok(dir) = std::env::var("WDGRAPH_CACHE_DIR") {
            self.cache.dir = PathBuf::from(dir);
        }

        if let Ok(langs) = std::env::var("WDGRAPH_LABEL_LANGS") {
            self.pipeline.label_languages = LanguagePriority::parse(&langs)
                .map_err(|e| ConfigError::invalid("WDGRAPH_LABEL_LANGS", e.to_string()))?;
        }

        if let Ok(format) = std::env::var("WDGRAPH_LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.endpoint.url)
            .map_err(|e| ConfigError::invalid("endpoint.url", e.to_string()))?;

        if self.endpoint.user_agent.trim().is_empty() {
            return Err(ConfigError::invalid(
                "endpoint.user_agent",
                "must not be empty",
            ));
        }

        if self.endpoint.timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "endpoint.timeout_secs",
                "must be greater than 0",
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::invalid("retry.max_attempts", "must be at least 1"));
        }

        if self.retry.backoff_factor < 1.0 {
            return Err(ConfigError::invalid(
                "retry.backoff_factor",
                "must be at least 1.0",
            ));
        }

        self.filter.validate()?;

        if self.pipeline.label_batch_size == 0 {
            return Err(ConfigError::invalid(
                "pipeline.label_batch_size",
                "must be greater than 0",
            ));
        }

        if !crate::models::is_valid_language(&self.pipeline.wiki_lang) {
            return Err(ConfigError::invalid(
                "pipeline.wiki_lang",
                format!("'{}' is not a language code", self.pipeline.wiki_lang),
            ));
        }

        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::invalid(key, format!("cannot parse '{raw}'"))),
        Err(_) => Ok(None),
    }
}
