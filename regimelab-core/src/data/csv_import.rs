//! CSV directory provider.
//!
//! Layout: one `<SYMBOL>.csv` per series with header
//! `date,open,high,low,close,volume[,spread]`, plus an optional
//! `sentiment.csv` with `symbol,date,score`. Profiles come from a universe
//! catalog.
//!
//! Each series file is parsed at most once per provider (clones share the
//! parsed histories). Failed loads are not remembered.

use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use super::provider::{trailing, DataError, MarketDataProvider, SentimentProvider};
use super::universe::Universe;
use crate::domain::{InstrumentProfile, Observation};

/// File holding per-day sentiment scores for all symbols.
pub const SENTIMENT_FILE: &str = "sentiment.csv";

type SeriesCache = HashMap<String, Arc<Vec<Observation>>>;

#[derive(Debug, Clone)]
pub struct CsvProvider {
    dir: PathBuf,
    universe: Universe,
    series: Arc<RwLock<SeriesCache>>,
}

#[derive(Debug, Deserialize)]
struct SentimentRow {
    symbol: String,
    date: NaiveDate,
    score: f64,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>, universe: Universe) -> Self {
        Self {
            dir: dir.into(),
            universe,
            series: Arc::new(RwLock::new(SeriesCache::new())),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn series_path(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }

    /// Full history of `symbol`, parsed on first use.
    pub fn history(&self, symbol: &str) -> Result<Arc<Vec<Observation>>, DataError> {
        if let Some(hit) = self.series.read().ok().and_then(|c| c.get(symbol).cloned()) {
            return Ok(hit);
        }
        let loaded = Arc::new(self.load(symbol)?);
        if let Ok(mut cache) = self.series.write() {
            cache.insert(symbol.to_string(), Arc::clone(&loaded));
        }
        tracing::debug!(symbol, rows = loaded.len(), "series loaded");
        Ok(loaded)
    }

    /// Full history of `symbol` read from disk, sorted by date.
    pub fn load(&self, symbol: &str) -> Result<Vec<Observation>, DataError> {
        let path = self.series_path(symbol);
        if !path.exists() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        let mut reader = csv::Reader::from_path(&path)
            .map_err(|e| DataError::Parse(format!("{}: {e}", path.display())))?;
        let mut rows = Vec::new();
        for record in reader.deserialize::<Observation>() {
            let obs = record.map_err(|e| DataError::Parse(format!("{}: {e}", path.display())))?;
            rows.push(obs);
        }
        rows.sort_by_key(|o| o.date);
        rows.dedup_by_key(|o| o.date);
        Ok(rows)
    }
}

impl MarketDataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn profile(&self, symbol: &str) -> Result<InstrumentProfile, DataError> {
        self.universe
            .profile(symbol)
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })
    }

    fn get_series(&self, symbol: &str, lookback: usize) -> Result<Vec<Observation>, DataError> {
        let history = self.history(symbol)?;
        trailing(symbol, &history, lookback)
    }
}

impl SentimentProvider for CsvProvider {
    /// Mean score over the `window_days` calendar days ending at the
    /// symbol's latest sentiment date.
    fn aggregate_sentiment(&self, symbol: &str, window_days: usize) -> Result<f64, DataError> {
        let path = self.dir.join(SENTIMENT_FILE);
        if !path.exists() {
            return Err(DataError::Unavailable(format!(
                "no {SENTIMENT_FILE} in {}",
                self.dir.display()
            )));
        }
        let mut reader = csv::Reader::from_path(&path)
            .map_err(|e| DataError::Parse(format!("{}: {e}", path.display())))?;
        let mut rows = Vec::new();
        for record in reader.deserialize::<SentimentRow>() {
            let row = record.map_err(|e| DataError::Parse(format!("{}: {e}", path.display())))?;
            if row.symbol == symbol && row.score.is_finite() {
                rows.push(row);
            }
        }
        let Some(latest) = rows.iter().map(|r| r.date).max() else {
            return Err(DataError::Unavailable(format!("no sentiment for '{symbol}'")));
        };
        let start = latest - Duration::days(window_days as i64);
        let scores: Vec<f64> = rows
            .iter()
            .filter(|r| r.date > start)
            .map(|r| r.score)
            .collect();
        Ok(crate::stats::mean(&scores).clamp(-1.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write(dir: &Path, name: &str, body: &str) {
        let mut f = std::fs::File::create(dir.join(name)).unwrap();
        f.write_all(body.as_bytes()).unwrap();
    }

    #[test]
    fn loads_sorted_series_with_optional_spread() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "NVDA.csv",
            "date,open,high,low,close,volume,spread\n\
             2024-01-03,101,103,100,102,1100,\n\
             2024-01-02,100,102,99,101,1000,0.02\n",
        );
        let p = CsvProvider::new(dir.path(), Universe::default_us());
        let series = p.get_series("NVDA", 2).unwrap();
        assert_eq!(series[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(series[0].spread, Some(0.02));
        assert_eq!(series[1].spread, None);
        assert!(matches!(
            p.get_series("NVDA", 10),
            Err(DataError::InsufficientHistory { available: 2, .. })
        ));
    }

    #[test]
    fn series_is_parsed_once_and_shared_by_clones() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "SPY.csv",
            "date,open,high,low,close,volume\n\
             2024-01-02,100,102,99,101,1000\n\
             2024-01-03,101,103,100,102,1100\n",
        );
        let p = CsvProvider::new(dir.path(), Universe::default_us());
        let clone = p.clone();
        assert_eq!(p.get_series("SPY", 2).unwrap().len(), 2);

        // Later reads come from memory even if the file changes.
        std::fs::remove_file(dir.path().join("SPY.csv")).unwrap();
        assert_eq!(clone.get_series("SPY", 1).unwrap()[0].close, 102.0);
        assert!(matches!(p.load("SPY"), Err(DataError::SymbolNotFound { .. })));
    }

    #[test]
    fn failed_load_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let p = CsvProvider::new(dir.path(), Universe::default_us());
        assert!(p.get_series("QQQ", 1).is_err());
        write(dir.path(), "QQQ.csv", "date,open,high,low,close,volume\n2024-01-02,1,1,1,1,1\n");
        assert_eq!(p.get_series("QQQ", 1).unwrap().len(), 1);
    }

    #[test]
    fn missing_file_is_symbol_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let p = CsvProvider::new(dir.path(), Universe::default_us());
        assert!(matches!(
            p.get_series("AAPL", 5),
            Err(DataError::SymbolNotFound { .. })
        ));
    }

    #[test]
    fn malformed_row_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "BAD.csv", "date,open,high,low,close,volume\nnot-a-date,1,1,1,1,1\n");
        let p = CsvProvider::new(dir.path(), Universe::default_us());
        assert!(matches!(p.load("BAD"), Err(DataError::Parse(_))));
    }

    #[test]
    fn sentiment_averages_trailing_window() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            SENTIMENT_FILE,
            "symbol,date,score\n\
             AAPL,2024-01-01,1.0\n\
             AAPL,2024-03-01,-0.4\n\
             AAPL,2024-03-05,-0.6\n\
             MSFT,2024-03-05,0.9\n",
        );
        let p = CsvProvider::new(dir.path(), Universe::default_us());
        let s = p.aggregate_sentiment("AAPL", 20).unwrap();
        assert!((s + 0.5).abs() < 1e-12);
        assert!(p.aggregate_sentiment("GOOG", 20).is_err());
    }

    #[test]
    fn profile_from_universe() {
        let dir = tempfile::tempdir().unwrap();
        let p = CsvProvider::new(dir.path(), Universe::default_us());
        assert_eq!(p.profile("JPM").unwrap().industry, "Banks");
    }
}
