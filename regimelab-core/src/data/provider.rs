//! Collaborator traits at the data boundary and their error type.
//!
//! Providers abstract over where observations come from (in-memory fixtures,
//! a CSV directory, a deterministic synthetic generator) so the aggregator,
//! detectors and scan engine never know about storage.

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{InstrumentProfile, Observation};
use crate::temporal::CalendarFacts;

/// Structured errors for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("insufficient history for '{symbol}': need {required}, have {available}")]
    InsufficientHistory {
        symbol: String,
        required: usize,
        available: usize,
    },

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("data unavailable: {0}")]
    Unavailable(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of observation series and instrument profiles.
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Where `symbol` sits in the layer hierarchy.
    fn profile(&self, symbol: &str) -> Result<InstrumentProfile, DataError>;

    /// The most recent `lookback` observations of `symbol`, oldest first.
    fn get_series(&self, symbol: &str, lookback: usize) -> Result<Vec<Observation>, DataError>;
}

/// Calendar context for the temporal layer and catalyst lookups.
pub trait CalendarProvider: Send + Sync {
    fn facts(&self, as_of: NaiveDate) -> CalendarFacts;

    /// First scheduled catalyst for `symbol` strictly after `after`.
    fn next_catalyst(&self, symbol: &str, after: NaiveDate) -> Option<NaiveDate>;
}

/// Aggregate sentiment in [-1, 1] over the trailing `window_days`.
pub trait SentimentProvider: Send + Sync {
    fn aggregate_sentiment(&self, symbol: &str, window_days: usize) -> Result<f64, DataError>;
}

/// Trailing `lookback` observations of a full history, or
/// `InsufficientHistory` when there are fewer.
pub fn trailing(
    symbol: &str,
    history: &[Observation],
    lookback: usize,
) -> Result<Vec<Observation>, DataError> {
    if history.len() < lookback {
        return Err(DataError::InsufficientHistory {
            symbol: symbol.to_string(),
            required: lookback,
            available: history.len(),
        });
    }
    Ok(history[history.len() - lookback..].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_series;

    #[test]
    fn trailing_takes_most_recent() {
        let history = make_series(&[1.0, 2.0, 3.0, 4.0]);
        let tail = trailing("X", &history, 2).unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[1].close, 4.0);
    }

    #[test]
    fn trailing_reports_shortfall() {
        let history = make_series(&[1.0, 2.0]);
        let err = trailing("X", &history, 5).unwrap_err();
        assert!(matches!(
            err,
            DataError::InsufficientHistory {
                required: 5,
                available: 2,
                ..
            }
        ));
    }
}
