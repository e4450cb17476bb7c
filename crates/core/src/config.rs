use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tunable knobs for the analytics pipelines. Load order is defaults, then
/// an optional TOML file, then `VENDORSIGHT_*` environment overrides, then
/// validation.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalyticsConfig {
    pub cache: CacheConfig,
    pub recommendation: RecommendationConfig,
    pub forecast: ForecastConfig,
    pub inventory: InventoryConfig,
    pub segmentation: SegmentationConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CacheConfig {
    /// Bundle time-to-live in seconds (24h by default).
    pub ttl_secs: u64,
    /// Upper bound on one bundle computation; the per-product training loop
    /// is otherwise unbounded.
    pub compute_timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecommendationConfig {
    /// Default list length when the caller does not pass one.
    pub default_count: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ForecastConfig {
    /// Seasonal lag. The fitted model assumes a period of 12 even on daily
    /// series; change only with product-owner sign-off.
    pub seasonal_period: usize,
    pub default_horizon_days: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InventoryConfig {
    pub horizon_days: usize,
    pub boosting_rounds: usize,
    pub learning_rate: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SegmentationConfig {
    pub clusters: usize,
    pub seed: u64,
    /// Projection dimensionality for visualization, 2 or 3.
    pub components: usize,
    pub max_iterations: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig { ttl_secs: 24 * 60 * 60, compute_timeout_secs: 120 },
            recommendation: RecommendationConfig { default_count: 5 },
            forecast: ForecastConfig { seasonal_period: 12, default_horizon_days: 30 },
            inventory: InventoryConfig {
                horizon_days: 7,
                boosting_rounds: 50,
                learning_rate: 0.1,
            },
            segmentation: SegmentationConfig {
                clusters: 4,
                seed: 42,
                components: 2,
                max_iterations: 100,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

/// Partial file representation; every field optional so a config file only
/// states what it changes.
#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    cache: Option<CachePatch>,
    recommendation: Option<RecommendationPatch>,
    forecast: Option<ForecastPatch>,
    inventory: Option<InventoryPatch>,
    segmentation: Option<SegmentationPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct CachePatch {
    ttl_secs: Option<u64>,
    compute_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RecommendationPatch {
    default_count: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ForecastPatch {
    seasonal_period: Option<usize>,
    default_horizon_days: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct InventoryPatch {
    horizon_days: Option<usize>,
    boosting_rounds: Option<usize>,
    learning_rate: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct SegmentationPatch {
    clusters: Option<usize>,
    seed: Option<u64>,
    components: Option<usize>,
    max_iterations: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AnalyticsConfig {
    /// Load defaults, patched by `path` when present, then env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = path.filter(|p| p.exists()) {
            let raw = fs::read_to_string(path)
                .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
            let patch: ConfigPatch = toml::from_str(&raw)
                .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })?;
            config.apply_patch(patch);
        }

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(cache) = patch.cache {
            if let Some(ttl_secs) = cache.ttl_secs {
                self.cache.ttl_secs = ttl_secs;
            }
            if let Some(timeout) = cache.compute_timeout_secs {
                self.cache.compute_timeout_secs = timeout;
            }
        }
        if let Some(recommendation) = patch.recommendation {
            if let Some(count) = recommendation.default_count {
                self.recommendation.default_count = count;
            }
        }
        if let Some(forecast) = patch.forecast {
            if let Some(period) = forecast.seasonal_period {
                self.forecast.seasonal_period = period;
            }
            if let Some(horizon) = forecast.default_horizon_days {
                self.forecast.default_horizon_days = horizon;
            }
        }
        if let Some(inventory) = patch.inventory {
            if let Some(horizon) = inventory.horizon_days {
                self.inventory.horizon_days = horizon;
            }
            if let Some(rounds) = inventory.boosting_rounds {
                self.inventory.boosting_rounds = rounds;
            }
            if let Some(rate) = inventory.learning_rate {
                self.inventory.learning_rate = rate;
            }
        }
        if let Some(segmentation) = patch.segmentation {
            if let Some(clusters) = segmentation.clusters {
                self.segmentation.clusters = clusters;
            }
            if let Some(seed) = segmentation.seed {
                self.segmentation.seed = seed;
            }
            if let Some(components) = segmentation.components {
                self.segmentation.components = components;
            }
            if let Some(iterations) = segmentation.max_iterations {
                self.segmentation.max_iterations = iterations;
            }
        }
        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("VENDORSIGHT_CACHE_TTL_SECS") {
            self.cache.ttl_secs = parse_env("VENDORSIGHT_CACHE_TTL_SECS", &value)?;
        }
        if let Some(value) = read_env("VENDORSIGHT_CACHE_COMPUTE_TIMEOUT_SECS") {
            self.cache.compute_timeout_secs =
                parse_env("VENDORSIGHT_CACHE_COMPUTE_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("VENDORSIGHT_SEGMENTATION_CLUSTERS") {
            self.segmentation.clusters = parse_env("VENDORSIGHT_SEGMENTATION_CLUSTERS", &value)?;
        }
        if let Some(value) = read_env("VENDORSIGHT_SEGMENTATION_SEED") {
            self.segmentation.seed = parse_env("VENDORSIGHT_SEGMENTATION_SEED", &value)?;
        }
        if let Some(value) = read_env("VENDORSIGHT_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("VENDORSIGHT_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::Validation("cache.ttl_secs must be positive".into()));
        }
        if self.cache.compute_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "cache.compute_timeout_secs must be positive".into(),
            ));
        }
        if self.segmentation.clusters == 0 {
            return Err(ConfigError::Validation("segmentation.clusters must be positive".into()));
        }
        if !(2..=3).contains(&self.segmentation.components) {
            return Err(ConfigError::Validation(
                "segmentation.components must be 2 or 3".into(),
            ));
        }
        if self.forecast.seasonal_period == 0 {
            return Err(ConfigError::Validation("forecast.seasonal_period must be positive".into()));
        }
        if self.inventory.learning_rate <= 0.0 || self.inventory.learning_rate > 1.0 {
            return Err(ConfigError::Validation(
                "inventory.learning_rate must be in (0, 1]".into(),
            ));
        }
        Ok(())
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}
