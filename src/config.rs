use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants;
use crate::error::{PipelineError, Result};
use crate::pipeline::processing::quality_gate::QualityGateConfig;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub api: ApiConfig,
    pub quality: QualityConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root holding the raw/, bronze/ and silver/ layers
    pub data_root: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Name of the environment variable holding the API token
    pub api_key_env: String,
    pub request_delay_ms: u64,
    pub retry_delay_ms: u64,
    /// Attempts per page before giving up; unset retries forever
    pub max_attempts: Option<u32>,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub null_threshold: f64,
    pub min_year: i64,
    pub max_year: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: PathBuf,
    pub file_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("dataset"),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: constants::DEFAULT_API_URL.to_string(),
            api_key_env: constants::DEFAULT_API_KEY_ENV.to_string(),
            request_delay_ms: 2_000,
            retry_delay_ms: 10_000,
            max_attempts: None,
            timeout_seconds: 60,
        }
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            null_threshold: constants::NULL_ALERT_THRESHOLD,
            min_year: constants::MIN_VALID_YEAR,
            max_year: constants::MAX_VALID_YEAR,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            file_name: "pipeline.log".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file. A missing file yields the defaults; a
    /// present but malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                PipelineError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
            })?;
            Self::from_toml(&content)?
        } else {
            Self::default()
        };

        if let Ok(root) = std::env::var(constants::DATA_ROOT_ENV) {
            if !root.trim().is_empty() {
                config.storage.data_root = PathBuf::from(root);
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let q = &self.quality;
        if !(0.0..=1.0).contains(&q.null_threshold) {
            return Err(PipelineError::Config(format!(
                "quality.null_threshold must be within [0, 1], got {}",
                q.null_threshold
            )));
        }
        if q.min_year > q.max_year {
            return Err(PipelineError::Config(format!(
                "quality.min_year ({}) is greater than quality.max_year ({})",
                q.min_year, q.max_year
            )));
        }
        if self.api.max_attempts == Some(0) {
            return Err(PipelineError::Config("api.max_attempts must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl ApiConfig {
    /// API token from the configured environment variable, if set
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl From<&QualityConfig> for QualityGateConfig {
    fn from(q: &QualityConfig) -> Self {
        QualityGateConfig {
            null_threshold: q.null_threshold,
            year_range: q.min_year..=q.max_year,
            ..QualityGateConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.storage.data_root, PathBuf::from("dataset"));
        assert_eq!(config.api.request_delay_ms, 2_000);
        assert_eq!(config.quality.null_threshold, 0.05);
        assert_eq!(config.quality.max_year, 2025);
    }

    #[test]
    fn test_partial_sections_override_defaults() {
        let config = Config::from_toml(
            r#"
            [quality]
            max_year = 2030

            [api]
            max_attempts = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.quality.max_year, 2030);
        assert_eq!(config.quality.min_year, 2000);
        assert_eq!(config.api.max_attempts, Some(3));
        assert_eq!(config.api.retry_delay_ms, 10_000);
    }

    #[test]
    fn test_validate_rejects_inverted_year_range() {
        let mut config = Config::default();
        config.quality.min_year = 2030;
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.logging.file_name, "pipeline.log");
    }

    #[test]
    fn test_quality_config_maps_to_gate_config() {
        let q = QualityConfig {
            null_threshold: 0.1,
            min_year: 2010,
            max_year: 2020,
        };
        let gate: QualityGateConfig = (&q).into();
        assert_eq!(gate.null_threshold, 0.1);
        assert_eq!(gate.year_range, 2010..=2020);
    }
}
