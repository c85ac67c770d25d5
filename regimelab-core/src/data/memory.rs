//! In-memory provider for fixtures and embedding callers.

use std::collections::BTreeMap;

use super::provider::{trailing, DataError, MarketDataProvider, SentimentProvider};
use crate::domain::{InstrumentProfile, Observation};

#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    series: BTreeMap<String, Vec<Observation>>,
    profiles: BTreeMap<String, InstrumentProfile>,
    sentiment: BTreeMap<String, f64>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, symbol: impl Into<String>, series: Vec<Observation>) -> Self {
        self.insert_series(symbol, series);
        self
    }

    pub fn with_profile(mut self, profile: InstrumentProfile) -> Self {
        self.insert_profile(profile);
        self
    }

    pub fn with_sentiment(mut self, symbol: impl Into<String>, score: f64) -> Self {
        self.sentiment.insert(symbol.into(), score);
        self
    }

    pub fn insert_series(&mut self, symbol: impl Into<String>, series: Vec<Observation>) {
        self.series.insert(symbol.into(), series);
    }

    pub fn insert_profile(&mut self, profile: InstrumentProfile) {
        self.profiles.insert(profile.symbol.clone(), profile);
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }
}

impl MarketDataProvider for InMemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn profile(&self, symbol: &str) -> Result<InstrumentProfile, DataError> {
        self.profiles
            .get(symbol)
            .cloned()
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })
    }

    fn get_series(&self, symbol: &str, lookback: usize) -> Result<Vec<Observation>, DataError> {
        let history = self
            .series
            .get(symbol)
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })?;
        trailing(symbol, history, lookback)
    }
}

impl SentimentProvider for InMemoryProvider {
    fn aggregate_sentiment(&self, symbol: &str, _window_days: usize) -> Result<f64, DataError> {
        self.sentiment
            .get(symbol)
            .map(|s| s.clamp(-1.0, 1.0))
            .ok_or_else(|| DataError::Unavailable(format!("no sentiment for '{symbol}'")))
    }
}
