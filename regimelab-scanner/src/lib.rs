//! RegimeLab Scanner: scan requests, the worker-pool engine, scoring,
//! ranking and presets.
//!
//! This crate builds on `regimelab-core` to provide:
//! - Validated, fingerprinted scan requests
//! - A scan engine fanning instruments out over a private rayon pool
//! - Mode-specific composite scoring, threshold filtering and ranking
//! - Built-in and TOML-directory presets
//! - Hierarchy history for transition scans

pub mod config;
pub mod engine;
pub mod history;
pub mod lifecycle;
pub mod preset;
pub mod ranking;
pub mod request;
pub mod result;
pub mod scoring;

pub use config::{ConfigError, EngineConfig};
pub use engine::{ScanEngine, ScanError};
pub use history::{HierarchyHistory, InMemoryHistory, JsonlHistory};
pub use lifecycle::{LifecycleError, ScanLifecycle, ScanPhase};
pub use preset::{BuiltinPresets, LayeredPresets, PresetError, PresetStore, TomlPresetStore};
pub use request::{RequestError, ScanMode, ScanRequest, ScanRequestBuilder, UniverseSpec};
pub use result::{ScanEntry, ScanResult, ScanStats, SkipReason, SkippedInstrument};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn engine_is_send_sync() {
        assert_send::<ScanEngine>();
        assert_sync::<ScanEngine>();
    }

    #[test]
    fn request_types_are_send_sync() {
        assert_send::<ScanRequest>();
        assert_sync::<ScanRequest>();
        assert_send::<ScanMode>();
        assert_sync::<ScanMode>();
    }

    #[test]
    fn result_types_are_send_sync() {
        assert_send::<ScanResult>();
        assert_sync::<ScanResult>();
        assert_send::<SkippedInstrument>();
        assert_sync::<SkippedInstrument>();
    }

    #[test]
    fn config_is_send_sync() {
        assert_send::<EngineConfig>();
        assert_sync::<EngineConfig>();
    }

    #[test]
    fn stores_are_send_sync() {
        assert_send::<InMemoryHistory>();
        assert_sync::<InMemoryHistory>();
        assert_send::<JsonlHistory>();
        assert_sync::<JsonlHistory>();
        assert_send::<TomlPresetStore>();
        assert_sync::<TomlPresetStore>();
    }
}
