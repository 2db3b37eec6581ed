use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Upstream provider and cache settings
    #[serde(default)]
    pub weather: WeatherConfig,
}

pub const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com/v1";
pub const DEFAULT_TTL_SECS: u64 = 600;
pub const DEFAULT_MAX_ENTRIES: usize = 100;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Base URL of the weather API; `/current.json` is appended
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key sent as the `key` query parameter
    #[serde(default)]
    pub api_key: String,

    /// Seconds a cached lookup stays fresh
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Maximum number of cached cities
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Upstream HTTP timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_ttl_secs() -> u64 {
    DEFAULT_TTL_SECS
}

fn default_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            ttl_secs: default_ttl_secs(),
            max_entries: default_max_entries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl WeatherConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check if an API key is set (not empty or a placeholder)
    pub fn has_api_key(&self) -> bool {
        let key = self.api_key.trim();
        !key.is_empty() && !key.starts_with("YOUR_")
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the default location is used
    /// and a template is written there if nothing exists yet.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.display().to_string()));
                }
                p.to_path_buf()
            }
            None => {
                let default_path = Self::default_path()?;
                if !default_path.exists() {
                    let config = Self::default();
                    config.save(&default_path)?;
                    tracing::info!("Wrote default config to {}", default_path.display());
                    return Ok(config);
                }
                default_path
            }
        };

        tracing::debug!("Loading config from {}", config_path.display());
        let contents = std::fs::read_to_string(&config_path)?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated(path: Option<&Path>) -> Result<(Self, ValidationResult), ConfigError> {
        let config = Self::load(path)?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()));
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        let base_url = self.validate_url(&self.weather.base_url, "weather.base_url", &mut result);
        if let Some(url) = base_url {
            validate_api_root(&url, "weather.base_url", &mut result);
        }

        if !self.weather.has_api_key() {
            result.add_error("weather.api_key", "API key is required");
        }

        if self.weather.ttl_secs == 0 {
            result.add_warning("weather.ttl_secs", "Caching disabled (0 seconds)");
        } else if self.weather.ttl_secs > 86_400 {
            result.add_warning("weather.ttl_secs", "Cache TTL is more than 24 hours");
        }

        if self.weather.max_entries == 0 {
            result.add_warning("weather.max_entries", "Caching disabled (0 entries)");
        }

        if self.weather.timeout_secs == 0 {
            result.add_error("weather.timeout_secs", "Timeout must be greater than 0");
        } else if self.weather.timeout_secs > 60 {
            result.add_warning("weather.timeout_secs", "Timeout is unusually long (>60s)");
        }

        result
    }

    /// Validate a URL field, returning the parsed URL when it is usable
    fn validate_url(
        &self,
        url_str: &str,
        field_name: &str,
        result: &mut ValidationResult,
    ) -> Option<Url> {
        match Url::parse(url_str) {
            Ok(url) => {
                // Check scheme
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                    return None;
                }

                // Check host
                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                    return None;
                }

                // Validate port if explicitly specified
                if url.port() == Some(0) {
                    result.add_error(field_name, "Port cannot be 0");
                    return None;
                }

                Some(url)
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
                None
            }
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;

        Ok(())
    }

    /// Get the default path to the configuration file
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::NoConfigDir)?
            .join("wxproxy");

        Ok(config_dir.join("config.toml"))
    }
}

/// The provider appends `/current.json` and its own query string to
/// `base_url`, so the configured value has to be the bare API root.
fn validate_api_root(url: &Url, field_name: &str, result: &mut ValidationResult) {
    let path = url.path().trim_end_matches('/');
    if path.ends_with(".json") {
        result.add_error(
            field_name,
            format!(
                "URL must be the API root (e.g. {}), not an endpoint: {}",
                DEFAULT_BASE_URL,
                url.path()
            ),
        );
    }

    // Credentials belong in weather.api_key
    if url.query().is_some() {
        result.add_error(field_name, "URL must not carry a query string");
    }

    if url.fragment().is_some() {
        result.add_warning(field_name, "URL fragment is ignored");
    }

    if url.scheme() == "http" && !is_loopback(url) {
        result.add_warning(field_name, "API key would be sent over plain http");
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
        Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}
