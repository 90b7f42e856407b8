use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::extractors;
use crate::models::FetchStrategy;

/// Platform names that select every configured source.
pub const ALL_SOURCES_SENTINELS: [&str; 2] = ["both", "all"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub scraper: ScraperConfig,
    pub cache: CacheConfig,
    pub search: SearchConfig,
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Whole-request ceiling in seconds.
    pub request_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Per-source ceiling in seconds; a source that overruns it is reported failed.
    pub request_timeout: u64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub user_agent: String,
    pub chrome_path: Option<String>,
    /// How long the page must stay quiet before the DOM is read.
    pub network_idle_ms: u64,
    /// Requests still allowed in flight while the page counts as idle.
    pub max_inflight_requests: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: u64,
    /// Absent means entries never expire.
    pub ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Stamped onto listings scraped without a location. Empty disables it.
    pub default_location: String,
    /// Drop listings that carry no link.
    pub require_link: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceConfig {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub strategy: FetchStrategy,
    /// Search page template, `{query}` is replaced by the escaped query.
    #[serde(default)]
    pub search_url: Option<String>,
    #[serde(default)]
    pub extractor: Option<String>,
    /// Base `/api/cars` URL of another instance, for the upstream strategy.
    #[serde(default)]
    pub upstream_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// When set, logs are also written to a daily rolling file here.
    pub directory: Option<String>,
    pub file_prefix: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            scraper: ScraperConfig::default(),
            cache: CacheConfig::default(),
            search: SearchConfig::default(),
            sources: default_sources(),
            metrics: MetricsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            request_timeout: 120,
        }
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            request_timeout: 60,
            retry_attempts: 1,
            retry_delay_ms: 500,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            chrome_path: None,
            network_idle_ms: 500,
            max_inflight_requests: 2,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1000,
            ttl_seconds: None,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_location: "Addis Ababa".to_string(),
            require_link: false,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "/metrics".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            file_prefix: "carscout.log".to_string(),
        }
    }
}

fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig {
            name: "mekina".to_string(),
            display_name: Some("Mekina.net".to_string()),
            strategy: FetchStrategy::Rendered,
            search_url: Some("https://www.mekina.net/cars/search?q={query}".to_string()),
            extractor: Some("mekina".to_string()),
            upstream_url: None,
        },
        SourceConfig {
            name: "jiji".to_string(),
            display_name: Some("Jiji".to_string()),
            strategy: FetchStrategy::Unimplemented,
            search_url: None,
            extractor: None,
            upstream_url: None,
        },
    ]
}

impl ScraperConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn network_idle(&self) -> Duration {
        Duration::from_millis(self.network_idle_ms)
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_seconds.map(Duration::from_secs)
    }
}

impl SourceConfig {
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Layers an explicit file (or the `config/` directory files) and
    /// `CARSCOUT__*` environment variables over the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder();
        builder = match path {
            Some(path) => builder.add_source(File::from(path)),
            None => builder
                .add_source(File::with_name("config/default").required(false))
                .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
                .add_source(File::with_name("config/local").required(false)),
        };

        let s = builder
            .add_source(
                Environment::with_prefix("CARSCOUT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        // Hosting platforms hand the port over as plain PORT
        if let Ok(port) = env::var("PORT") {
            config.server.port = port
                .parse()
                .map_err(|_| ConfigError::Message(format!("Invalid PORT value: {}", port)))?;
        }

        if config.scraper.chrome_path.is_none() {
            config.scraper.chrome_path = env::var("CHROME_PATH").ok();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("Server port must be greater than 0".into()));
        }

        if self.server.request_timeout == 0 || self.scraper.request_timeout == 0 {
            return Err(ConfigError::Message("Timeouts must be greater than 0".into()));
        }

        if self.cache.max_entries == 0 {
            return Err(ConfigError::Message("Cache max_entries must be greater than 0".into()));
        }

        if !self.metrics.endpoint.starts_with('/') {
            return Err(ConfigError::Message("Metrics endpoint must start with '/'".into()));
        }
        if is_builtin_route(&self.metrics.endpoint) {
            return Err(ConfigError::Message(format!(
                "Metrics endpoint '{}' collides with a built-in route",
                self.metrics.endpoint
            )));
        }

        if self.sources.is_empty() {
            return Err(ConfigError::Message("At least one source must be configured".into()));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            self.validate_source(source)?;
            if !seen.insert(source.name.as_str()) {
                return Err(ConfigError::Message(format!(
                    "Duplicate source name '{}'",
                    source.name
                )));
            }
        }

        Ok(())
    }

    fn validate_source(&self, source: &SourceConfig) -> Result<(), ConfigError> {
        let name = source.name.trim();
        if name.is_empty() {
            return Err(ConfigError::Message("Source name cannot be empty".into()));
        }
        // platform selection lowercases what the client sends
        if source.name != name.to_lowercase() {
            return Err(ConfigError::Message(format!(
                "Source name '{}' must be lowercase without surrounding spaces",
                source.name
            )));
        }
        if ALL_SOURCES_SENTINELS.contains(&name) {
            return Err(ConfigError::Message(format!(
                "Source name '{}' is reserved",
                name
            )));
        }

        match source.strategy {
            FetchStrategy::Rendered | FetchStrategy::Static => {
                let template = source.search_url.as_deref().unwrap_or_default();
                if !template.contains("{query}") {
                    return Err(ConfigError::Message(format!(
                        "Source '{}' needs a search_url containing {{query}}",
                        name
                    )));
                }
                if Url::parse(&template.replace("{query}", "probe")).is_err() {
                    return Err(ConfigError::Message(format!(
                        "Source '{}' has an invalid search_url",
                        name
                    )));
                }
                let extractor = source.extractor.as_deref().unwrap_or_default();
                if !extractors::is_known(extractor) {
                    return Err(ConfigError::Message(format!(
                        "Source '{}' names unknown extractor '{}'",
                        name, extractor
                    )));
                }
            }
            FetchStrategy::Upstream => {
                let upstream = source.upstream_url.as_deref().unwrap_or_default();
                if Url::parse(upstream).is_err() {
                    return Err(ConfigError::Message(format!(
                        "Source '{}' needs a valid upstream_url",
                        name
                    )));
                }
            }
            FetchStrategy::Unimplemented => {}
        }

        Ok(())
    }
}

/// Paths the router serves regardless of configuration.
fn is_builtin_route(path: &str) -> bool {
    path == "/health" || path == "/api" || path.starts_with("/api/")
}
