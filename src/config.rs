//! Pipeline configuration
//!
//! Every tunable has a default, so an empty YAML file (or no file at all)
//! yields the standard behavior. Parse fallbacks for staged fields live here
//! as explicit policy rather than inside the stagers.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub staging: StagingConfig,
    pub denormalize: DenormalizeConfig,
    pub query: QueryConfig,
}

impl Config {
    /// Load and validate a YAML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        // serde_yaml rejects an empty document; treat it as all defaults
        let config: Config = if text.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(text)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.staging.chunk_size == 0 {
            return Err(ConfigError::Invalid("staging.chunk_size must be positive".into()));
        }
        if self.denormalize.batch_size == 0 {
            return Err(ConfigError::Invalid("denormalize.batch_size must be positive".into()));
        }
        if self.denormalize.max_in_flight_lookups == 0 {
            return Err(ConfigError::Invalid(
                "denormalize.max_in_flight_lookups must be positive".into(),
            ));
        }
        if self.query.result_cap == 0 {
            return Err(ConfigError::Invalid("query.result_cap must be positive".into()));
        }
        Ok(())
    }
}

/// How raw staged fields are coerced when they fail to parse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultPolicy {
    /// Value used for numeric fields that are missing or unparseable
    pub numeric_fallback: i64,
    /// Case-insensitive tokens that parse as `true`; everything else is `false`
    pub truthy_tokens: Vec<String>,
}

impl Default for DefaultPolicy {
    fn default() -> Self {
        Self {
            numeric_fallback: 0,
            truthy_tokens: ["true", "t", "yes", "y", "1"].iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl DefaultPolicy {
    pub fn parse_int(&self, raw: Option<&str>) -> i64 {
        raw.map(str::trim)
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(self.numeric_fallback)
    }

    pub fn parse_bool(&self, raw: Option<&str>) -> bool {
        let Some(raw) = raw else {
            return false;
        };
        let raw = raw.trim();
        self.truthy_tokens.iter().any(|t| t.eq_ignore_ascii_case(raw))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    /// Rows read and written per chunk
    pub chunk_size: usize,
    /// Bibliographic generations retained after a new one is staged (including the new one)
    pub generations_kept: usize,
    pub defaults: DefaultPolicy,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 50_000,
            generations_kept: 2,
            defaults: DefaultPolicy::default(),
        }
    }
}

/// Maximum rows fetched per satellite lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupCaps {
    pub us_citations: usize,
    pub us_app_citations: usize,
    pub summary: usize,
    pub claims: usize,
    pub people: usize,
    pub cpc_classes: usize,
}

impl Default for LookupCaps {
    fn default() -> Self {
        Self {
            us_citations: 100,
            us_app_citations: 100,
            summary: 1,
            claims: 200,
            people: 100,
            cpc_classes: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DenormalizeConfig {
    /// Composite documents per bulk write
    pub batch_size: usize,
    pub caps: LookupCaps,
    /// Satellite lookups allowed in flight at once
    pub max_in_flight_lookups: usize,
    /// Timeout applied to each store call
    pub store_timeout_ms: u64,
}

impl Default for DenormalizeConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            caps: LookupCaps::default(),
            max_in_flight_lookups: 16,
            store_timeout_ms: 30_000,
        }
    }
}

impl DenormalizeConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Hard cap on hits per search
    pub result_cap: usize,
    pub store_timeout_ms: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            result_cap: 6000,
            store_timeout_ms: 10_000,
        }
    }
}

impl QueryConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}
