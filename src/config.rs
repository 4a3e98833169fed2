//! Pipeline configuration.
//!
//! Settings are layered: built-in defaults, then an optional YAML file
//! (`--config`), then CLI flags and environment variables applied in
//! `main`. Credentials never live in the YAML file; they come from the
//! environment through [`crate::cli::Cli`].
//!
//! ```yaml
//! site:
//!   base_url: https://www.nhl.com
//!   index_url: https://www.nhl.com/hurricanes/news/
//!   article_prefix: /hurricanes/news/
//! http:
//!   user_agent: class-project/1.0
//!   timeout_secs: 20
//!   request_delay_ms: 1000
//! discovery:
//!   max_pages: 4
//!   max_links: 10
//! model:
//!   model: gpt-4o
//!   max_retries: 2
//! store:
//!   table: articles
//! concurrency: 1
//! data_dir: data
//! ```

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub http: HttpConfig,
    pub discovery: DiscoveryConfig,
    pub model: ModelConfig,
    pub store: StoreConfig,
    /// Upper bound on in-flight article fetches and model calls.
    pub concurrency: usize,
    /// Directory holding `raw_blob.txt` and `structured.json`.
    pub data_dir: String,
}

/// The single site section being scraped.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    pub base_url: String,
    pub index_url: String,
    /// Path prefix every article URL starts with.
    pub article_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Minimum spacing between two requests to the origin.
    pub request_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub max_pages: usize,
    pub max_links: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    /// OpenAI-compatible API root, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub table: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            http: HttpConfig::default(),
            discovery: DiscoveryConfig::default(),
            model: ModelConfig::default(),
            store: StoreConfig::default(),
            concurrency: 1,
            data_dir: "data".to_string(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.nhl.com".to_string(),
            index_url: "https://www.nhl.com/hurricanes/news/".to_string(),
            article_prefix: "/hurricanes/news/".to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "class-project/1.0".to_string(),
            timeout_secs: 20,
            request_delay_ms: 1000,
        }
    }
}

impl HttpConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_pages: 4,
            max_links: 10,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            table: "articles".to_string(),
        }
    }
}

/// Parse a YAML document into a [`Config`], filling gaps with defaults.
pub fn parse_config(yaml: &str, path: &str) -> Result<Config, ConfigError> {
    serde_yaml::from_str(yaml).map_err(|source| ConfigError::Yaml {
        path: path.to_string(),
        source,
    })
}

/// Load the configuration file, or the defaults when no path is given.
#[instrument(level = "info")]
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let Some(path) = path else {
        info!("No config file given; using defaults");
        return Ok(Config::default());
    };

    let yaml = std::fs::read_to_string(Path::new(path)).map_err(|source| ConfigError::Io {
        path: path.to_string(),
        source,
    })?;
    let config = parse_config(&yaml, path)?;
    info!(path, "Loaded configuration");
    Ok(config)
}
