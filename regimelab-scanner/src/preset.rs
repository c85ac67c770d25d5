//! Named scan presets: a built-in set and a directory of TOML files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use regimelab_core::data::ALL_UNIVERSE;
use regimelab_core::detectors::{DetectorConfig, LiquidityParams, PatternParams};
use regimelab_core::domain::{DetectorKind, LayerKind};

use crate::request::{
    RequestError, ScanMode, ScanRequest, UniverseSpec, MAX_ALIGNMENT, MIN_ALIGNMENT, MIN_FINDINGS,
    MIN_SCORE,
};

#[derive(Debug, Error)]
pub enum PresetError {
    #[error("unknown preset '{0}'")]
    NotFound(String),

    #[error("failed to read preset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse preset '{name}': {source}")]
    Parse {
        name: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("preset '{name}' is invalid: {source}")]
    Invalid {
        name: String,
        #[source]
        source: RequestError,
    },
}

pub trait PresetStore: Send + Sync {
    fn get(&self, name: &str) -> Result<ScanRequest, PresetError>;

    /// Sorted preset names.
    fn names(&self) -> Vec<String>;
}

pub const FULL_ALIGNMENT: &str = "full-alignment";
pub const DIVERGENCE_HUNTER: &str = "divergence-hunter";
pub const REGIME_TRANSITION: &str = "regime-transition";
pub const PAIRS_REVERSION: &str = "pairs-reversion";
pub const LIQUIDITY_VACUUM: &str = "liquidity-vacuum";
pub const SENTIMENT_CONTRARIAN: &str = "sentiment-contrarian";

/// Market-led weights used by most built-ins.
fn top_down_weights() -> BTreeMap<LayerKind, f64> {
    BTreeMap::from([
        (LayerKind::Temporal, 0.05),
        (LayerKind::Macro, 0.10),
        (LayerKind::Market, 0.25),
        (LayerKind::Sector, 0.20),
        (LayerKind::Industry, 0.20),
        (LayerKind::Instrument, 0.20),
    ])
}

/// Presets compiled into the binary, all over the `all` universe.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinPresets;

impl BuiltinPresets {
    fn build(name: &str) -> Option<Result<ScanRequest, RequestError>> {
        let all = || UniverseSpec::Named(ALL_UNIVERSE.to_string());
        let request = match name {
            FULL_ALIGNMENT => ScanRequest::builder(all(), ScanMode::Alignment)
                .layer_weights(top_down_weights())
                .threshold(MIN_ALIGNMENT, 6.0)
                .top_n(25)
                .build(),
            DIVERGENCE_HUNTER => ScanRequest::builder(all(), ScanMode::Divergence)
                .layer_weights(top_down_weights())
                .detector_weight(DetectorKind::CorrelationBreakdown, 0.3)
                .threshold(MAX_ALIGNMENT, 5.0)
                .top_n(25)
                .build(),
            REGIME_TRANSITION => ScanRequest::builder(all(), ScanMode::Transition)
                .layer_weights(top_down_weights())
                .threshold(MIN_SCORE, 2.0)
                .build(),
            PAIRS_REVERSION => ScanRequest::builder(all(), ScanMode::Hybrid)
                .layer_weights(top_down_weights())
                .detector_weight(DetectorKind::PairCointegration, 1.0)
                .threshold(MIN_FINDINGS, 1.0)
                .build(),
            LIQUIDITY_VACUUM => ScanRequest::builder(all(), ScanMode::Hybrid)
                .layer_weights(top_down_weights())
                .detector(DetectorConfig::LiquidityVacuum(LiquidityParams {
                    catalyst_window_days: Some(10),
                    ..LiquidityParams::default()
                }))
                .detector_weight(DetectorKind::LiquidityVacuum, 1.0)
                .threshold(MIN_FINDINGS, 1.0)
                .build(),
            SENTIMENT_CONTRARIAN => ScanRequest::builder(all(), ScanMode::Hybrid)
                .layer_weights(top_down_weights())
                .detector_weight(DetectorKind::SentimentDivergence, 1.0)
                .detector(DetectorConfig::PatternMatch(PatternParams::default()))
                .detector_weight(DetectorKind::PatternMatch, 0.3)
                .threshold(MIN_FINDINGS, 1.0)
                .build(),
            _ => return None,
        };
        Some(request)
    }
}

const BUILTIN_NAMES: [&str; 6] = [
    DIVERGENCE_HUNTER,
    FULL_ALIGNMENT,
    LIQUIDITY_VACUUM,
    PAIRS_REVERSION,
    REGIME_TRANSITION,
    SENTIMENT_CONTRARIAN,
];

impl PresetStore for BuiltinPresets {
    fn get(&self, name: &str) -> Result<ScanRequest, PresetError> {
        match Self::build(name) {
            Some(result) => result.map_err(|source| PresetError::Invalid {
                name: name.to_string(),
                source,
            }),
            None => Err(PresetError::NotFound(name.to_string())),
        }
    }

    fn names(&self) -> Vec<String> {
        BUILTIN_NAMES.iter().map(|s| s.to_string()).collect()
    }
}

/// `<dir>/<name>.toml`, each holding one serialized [`ScanRequest`].
#[derive(Debug, Clone)]
pub struct TomlPresetStore {
    dir: PathBuf,
}

impl TomlPresetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.toml"))
    }

    /// Write `request` as `<name>.toml`.
    pub fn save(&self, name: &str, request: &ScanRequest) -> Result<PathBuf, PresetError> {
        let path = self.path_for(name);
        let io_err = |source| PresetError::Io {
            path: path.clone(),
            source,
        };
        let text = toml::to_string_pretty(request)
            .map_err(|e| io_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        std::fs::create_dir_all(&self.dir).map_err(io_err)?;
        std::fs::write(&path, text).map_err(io_err)?;
        Ok(path)
    }
}

/// Parse a request from TOML text, filling default detector configs.
pub fn parse_request(name: &str, text: &str) -> Result<ScanRequest, PresetError> {
    let request: ScanRequest = toml::from_str(text).map_err(|source| PresetError::Parse {
        name: name.to_string(),
        source,
    })?;
    let request = request.with_default_detectors();
    request.validate().map_err(|source| PresetError::Invalid {
        name: name.to_string(),
        source,
    })?;
    Ok(request)
}

impl PresetStore for TomlPresetStore {
    fn get(&self, name: &str) -> Result<ScanRequest, PresetError> {
        let path = self.path_for(name);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PresetError::NotFound(name.to_string()))
            }
            Err(source) => return Err(PresetError::Io { path, source }),
        };
        parse_request(name, &text)
    }

    fn names(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect();
        names.sort();
        names
    }
}

/// Looks in each store in turn; the first store that knows a name wins.
pub struct LayeredPresets {
    stores: Vec<Box<dyn PresetStore>>,
}

impl LayeredPresets {
    pub fn new(stores: Vec<Box<dyn PresetStore>>) -> Self {
        Self { stores }
    }
}

impl PresetStore for LayeredPresets {
    fn get(&self, name: &str) -> Result<ScanRequest, PresetError> {
        for store in &self.stores {
            match store.get(name) {
                Err(PresetError::NotFound(_)) => continue,
                other => return other,
            }
        }
        Err(PresetError::NotFound(name.to_string()))
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stores.iter().flat_map(|s| s.names()).collect();
        names.sort();
        names.dedup();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn every_builtin_is_valid() {
        let store = BuiltinPresets;
        for name in store.names() {
            let request = store.get(&name).unwrap_or_else(|e| panic!("{name}: {e}"));
            assert!(request.validate().is_ok(), "{name}");
        }
    }

    #[test]
    fn builtin_names_are_sorted() {
        let names = BuiltinPresets.names();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(names.len(), 6);
    }

    #[test]
    fn hybrid_builtins_carry_detector_configs() {
        let req = BuiltinPresets.get(SENTIMENT_CONTRARIAN).unwrap();
        assert_eq!(req.mode, ScanMode::Hybrid);
        let mut kinds: Vec<_> = req.detectors.iter().map(|d| d.kind()).collect();
        kinds.sort();
        assert_eq!(kinds, vec![DetectorKind::PatternMatch, DetectorKind::SentimentDivergence]);
    }

    #[test]
    fn unknown_builtin_is_not_found() {
        assert!(matches!(BuiltinPresets.get("moonshot"), Err(PresetError::NotFound(_))));
    }

    #[test]
    fn toml_store_save_and_get() {
        let tmp = TempDir::new().unwrap();
        let store = TomlPresetStore::new(tmp.path());
        let request = BuiltinPresets.get(PAIRS_REVERSION).unwrap();
        store.save("my-pairs", &request).unwrap();

        assert_eq!(store.names(), vec!["my-pairs".to_string()]);
        assert_eq!(store.get("my-pairs").unwrap(), request);
        assert!(matches!(store.get("absent"), Err(PresetError::NotFound(_))));
    }

    #[test]
    fn toml_store_fills_default_detectors() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("breakouts.toml"),
            r#"
            mode = "hybrid"
            top_n = 5

            [universe]
            symbols = ["AAPL", "MSFT"]

            [layer_weights]
            market = 0.5
            instrument = 0.5

            [detector_weights]
            pattern-match = 1.0
            "#,
        )
        .unwrap();
        let request = TomlPresetStore::new(tmp.path()).get("breakouts").unwrap();
        assert_eq!(request.detectors, vec![DetectorConfig::default_for(DetectorKind::PatternMatch)]);
    }

    #[test]
    fn toml_store_reports_invalid_weights() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("lopsided.toml"),
            r#"
            mode = "alignment"
            top_n = 5

            [universe]
            named = "all"

            [layer_weights]
            market = 0.9
            "#,
        )
        .unwrap();
        let err = TomlPresetStore::new(tmp.path()).get("lopsided").unwrap_err();
        assert!(matches!(
            err,
            PresetError::Invalid {
                source: RequestError::LayerWeightSum(_),
                ..
            }
        ));
    }

    #[test]
    fn toml_store_reports_parse_errors() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("broken.toml"), "mode = 7").unwrap();
        assert!(matches!(
            TomlPresetStore::new(tmp.path()).get("broken"),
            Err(PresetError::Parse { .. })
        ));
    }

    #[test]
    fn layered_store_prefers_first_hit() {
        let tmp = TempDir::new().unwrap();
        let dir_store = TomlPresetStore::new(tmp.path());
        let custom = ScanRequest::builder(UniverseSpec::Named("Technology".into()), ScanMode::Alignment)
            .top_n(3)
            .build()
            .unwrap();
        dir_store.save(FULL_ALIGNMENT, &custom).unwrap();

        let layered = LayeredPresets::new(vec![Box::new(dir_store), Box::new(BuiltinPresets)]);
        assert_eq!(layered.get(FULL_ALIGNMENT).unwrap().top_n, 3);
        assert_eq!(layered.get(PAIRS_REVERSION).unwrap().mode, ScanMode::Hybrid);
        assert_eq!(layered.names().len(), 6);
    }
}
