//! RegimeLab Core: domain types, classifier, aggregator, detectors, data
//! boundary.
//!
//! This crate contains the classification pipeline:
//! - Domain types (observations, regime labels, layers, hierarchies, findings)
//! - Indicators and statistics used as classifier features
//! - RegimeClassifier with a fixed, threshold-driven rule table
//! - Temporal layer from calendar facts
//! - LayerAggregator building six-layer hierarchies
//! - Five statistical detectors behind a closed `DetectorConfig`
//! - Provider traits plus in-memory, CSV and synthetic sources

pub mod aggregator;
pub mod classifier;
pub mod data;
pub mod detectors;
pub mod domain;
pub mod indicators;
pub mod stats;
pub mod temporal;

pub use aggregator::{AggregateError, HierarchyConfig, LayerAggregator, LayerFailure};
pub use classifier::{ClassifyError, RegimeClassifier, RegimeThresholds};
pub use detectors::{DetectError, DetectorConfig, DetectorInputs, DetectorSet};
pub use temporal::{classify_temporal, CalendarFacts};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything the scan engine moves into worker
    /// threads is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Observation>();
        require_sync::<domain::Observation>();
        require_send::<domain::LayerClassification>();
        require_sync::<domain::LayerClassification>();
        require_send::<domain::RegimeHierarchy>();
        require_sync::<domain::RegimeHierarchy>();
        require_send::<domain::DetectorFinding>();
        require_sync::<domain::DetectorFinding>();
        require_send::<domain::InstrumentProfile>();
        require_sync::<domain::InstrumentProfile>();

        // Pipeline
        require_send::<RegimeClassifier>();
        require_sync::<RegimeClassifier>();
        require_send::<LayerAggregator>();
        require_sync::<LayerAggregator>();
        require_send::<DetectorSet>();
        require_sync::<DetectorSet>();
        require_send::<HierarchyConfig>();
        require_sync::<HierarchyConfig>();

        // Errors cross the result channel
        require_send::<AggregateError>();
        require_send::<DetectError>();

        // Providers
        require_send::<data::InMemoryProvider>();
        require_sync::<data::InMemoryProvider>();
        require_send::<data::CsvProvider>();
        require_sync::<data::CsvProvider>();
        require_send::<data::SyntheticProvider>();
        require_sync::<data::SyntheticProvider>();
        require_send::<data::StandardCalendar>();
        require_sync::<data::StandardCalendar>();
    }

    /// Architecture contract: detectors see providers only through the
    /// read-only traits, never the aggregator or engine state.
    #[test]
    fn detector_trait_takes_only_inputs() {
        fn _check_trait_object_builds(
            detector: &dyn detectors::Detector,
            inputs: &DetectorInputs<'_>,
        ) -> Result<Option<domain::DetectorFinding>, DetectError> {
            detector.detect(inputs)
        }
    }
}
