//! LayerAggregator: six layer classifications for one instrument combined
//! into a `RegimeHierarchy`.
//!
//! All-or-nothing: the first layer that cannot be classified fails the whole
//! hierarchy with `LayerUnavailable`, naming the layer and the cause.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::classifier::{ClassifyError, RegimeClassifier};
use crate::data::{CalendarProvider, DataError, MarketDataProvider};
use crate::domain::{
    HierarchyError, InstrumentProfile, LayerClassification, LayerKind, RegimeHierarchy,
};
use crate::temporal::classify_temporal;

/// Per-layer classification lookbacks, in observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchyConfig {
    pub macro_lookback: usize,
    pub market_lookback: usize,
    pub sector_lookback: usize,
    pub industry_lookback: usize,
    pub instrument_lookback: usize,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            macro_lookback: 120,
            market_lookback: 60,
            sector_lookback: 40,
            industry_lookback: 30,
            instrument_lookback: 20,
        }
    }
}

impl HierarchyConfig {
    /// Lookback for a series-backed layer; `None` for the temporal layer.
    pub fn lookback(&self, layer: LayerKind) -> Option<usize> {
        match layer {
            LayerKind::Temporal => None,
            LayerKind::Macro => Some(self.macro_lookback),
            LayerKind::Market => Some(self.market_lookback),
            LayerKind::Sector => Some(self.sector_lookback),
            LayerKind::Industry => Some(self.industry_lookback),
            LayerKind::Instrument => Some(self.instrument_lookback),
        }
    }
}

/// Why a single layer could not be classified.
#[derive(Debug, Error)]
pub enum LayerFailure {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Classify(#[from] ClassifyError),
}

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("no profile for '{symbol}': {source}")]
    Profile {
        symbol: String,
        #[source]
        source: DataError,
    },

    #[error("{layer} layer unavailable: {cause}")]
    LayerUnavailable { layer: LayerKind, cause: LayerFailure },

    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
}

/// Builds hierarchies from a market data provider and a calendar.
#[derive(Clone)]
pub struct LayerAggregator {
    market: Arc<dyn MarketDataProvider>,
    calendar: Arc<dyn CalendarProvider>,
    classifier: RegimeClassifier,
    config: HierarchyConfig,
}

impl std::fmt::Debug for LayerAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerAggregator")
            .field("market", &self.market.name())
            .field("classifier", &self.classifier)
            .field("config", &self.config)
            .finish()
    }
}

/// Series-backed layers in fetch order. The instrument goes first: its last
/// observation date anchors the temporal layer.
const SERIES_LAYERS: [LayerKind; 5] = [
    LayerKind::Instrument,
    LayerKind::Industry,
    LayerKind::Sector,
    LayerKind::Market,
    LayerKind::Macro,
];

impl LayerAggregator {
    pub fn new(
        market: Arc<dyn MarketDataProvider>,
        calendar: Arc<dyn CalendarProvider>,
        classifier: RegimeClassifier,
        config: HierarchyConfig,
    ) -> Self {
        Self {
            market,
            calendar,
            classifier,
            config,
        }
    }

    pub fn config(&self) -> &HierarchyConfig {
        &self.config
    }

    pub fn market(&self) -> &Arc<dyn MarketDataProvider> {
        &self.market
    }

    pub fn calendar(&self) -> &Arc<dyn CalendarProvider> {
        &self.calendar
    }

    pub fn profile(&self, symbol: &str) -> Result<InstrumentProfile, AggregateError> {
        self.market
            .profile(symbol)
            .map_err(|source| AggregateError::Profile {
                symbol: symbol.to_string(),
                source,
            })
    }

    /// Classify one series-backed layer of `profile`.
    pub fn classify_layer(
        &self,
        profile: &InstrumentProfile,
        layer: LayerKind,
    ) -> Result<LayerClassification, AggregateError> {
        let (Some(symbol), Some(lookback)) = (profile.series_symbol(layer), self.config.lookback(layer))
        else {
            let as_of = self.anchor_date(profile)?;
            return Ok(classify_temporal(&self.calendar.facts(as_of)));
        };
        let fail = |cause: LayerFailure| AggregateError::LayerUnavailable { layer, cause };
        let series = self
            .market
            .get_series(symbol, lookback)
            .map_err(|e| fail(e.into()))?;
        self.classifier
            .classify(layer, &series, lookback)
            .map_err(|e| fail(e.into()))
    }

    fn anchor_date(&self, profile: &InstrumentProfile) -> Result<chrono::NaiveDate, AggregateError> {
        Ok(self.classify_layer(profile, LayerKind::Instrument)?.as_of)
    }

    /// Build the full hierarchy for `symbol`.
    pub fn aggregate(&self, symbol: &str) -> Result<RegimeHierarchy, AggregateError> {
        let _span = tracing::debug_span!("aggregate", symbol).entered();
        let profile = self.profile(symbol)?;

        let mut layers = BTreeMap::new();
        for layer in SERIES_LAYERS {
            let classification = self.classify_layer(&profile, layer)?;
            debug!(%layer, label = %classification.primary, strength = classification.strength, "layer classified");
            layers.insert(layer, classification);
        }
        let as_of = layers[&LayerKind::Instrument].as_of;
        layers.insert(LayerKind::Temporal, classify_temporal(&self.calendar.facts(as_of)));

        let hierarchy = RegimeHierarchy::assemble(symbol, layers)?;
        debug!(
            majority = %hierarchy.majority,
            alignment = hierarchy.alignment_score,
            divergent = hierarchy.divergence_points.len(),
            "hierarchy assembled"
        );
        Ok(hierarchy)
    }
}
