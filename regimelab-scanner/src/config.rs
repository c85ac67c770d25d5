//! Engine-level configuration loaded from TOML.
//!
//! Everything here is optional in the file: a missing key falls back to the
//! default shown on the field.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use regimelab_core::{HierarchyConfig, RegimeThresholds};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings shared by every scan an engine runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker pool size. `None` lets rayon pick (one per core).
    pub worker_threads: Option<usize>,

    /// Deadline for requests that carry no `timeout_ms`.
    pub default_timeout_ms: Option<u64>,

    /// Composite floor applied when a request has no `min_score`.
    pub default_min_score: f64,

    /// Per-layer lookbacks.
    pub hierarchy: HierarchyConfig,

    /// Classifier thresholds.
    pub thresholds: RegimeThresholds,

    /// Directory of `<name>.toml` scan presets.
    pub presets_dir: Option<PathBuf>,

    /// Universe catalog; the built-in US catalog when absent.
    pub universe_file: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            default_timeout_ms: None,
            default_min_score: 1.0,
            hierarchy: HierarchyConfig::default(),
            thresholds: RegimeThresholds::default(),
            presets_dir: None,
            universe_file: None,
        }
    }
}

impl EngineConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_threads == Some(0) {
            return Err(ConfigError::Invalid("worker_threads must be at least 1".into()));
        }
        if self.default_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid("default_timeout_ms must be positive".into()));
        }
        if !self.default_min_score.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "default_min_score must be finite, got {}",
                self.default_min_score
            )));
        }
        for layer in regimelab_core::domain::LayerKind::ALL {
            if self.hierarchy.lookback(layer) == Some(0) {
                return Err(ConfigError::Invalid(format!("{layer} lookback must be positive")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_gives_defaults() {
        let config = EngineConfig::from_toml("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.default_min_score, 1.0);
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let config = EngineConfig::from_toml(
            r#"
            worker_threads = 4
            default_timeout_ms = 2500

            [hierarchy]
            sector_lookback = 50

            [thresholds]
            vol_upper = 0.4
            "#,
        )
        .unwrap();
        assert_eq!(config.worker_threads, Some(4));
        assert_eq!(config.hierarchy.sector_lookback, 50);
        assert_eq!(config.hierarchy.market_lookback, HierarchyConfig::default().market_lookback);
        assert!((config.thresholds.vol_upper - 0.4).abs() < 1e-12);
        assert!((config.thresholds.vol_lower - RegimeThresholds::default().vol_lower).abs() < 1e-12);
    }

    #[test]
    fn zero_workers_is_invalid() {
        let err = EngineConfig::from_toml("worker_threads = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unparseable_toml_is_a_parse_error() {
        let err = EngineConfig::from_toml("worker_threads = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn from_file_reads_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_min_score = 2.5").unwrap();
        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.default_min_score, 2.5);

        let missing = EngineConfig::from_file(Path::new("/nonexistent/regimelab.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
