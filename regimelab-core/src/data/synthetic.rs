//! Deterministic synthetic data for development and tests.
//!
//! Every symbol gets its own seeded random walk (BLAKE3 of the symbol name
//! seeds a `StdRng`) with a symbol-specific drift and volatility. Catalog
//! members load on their parent layer's shocks so hierarchies show realistic
//! agreement: instrument → industry reference → sector reference → market.
//! Output is tagged by the provider name `synthetic`.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::provider::{DataError, MarketDataProvider, SentimentProvider};
use super::universe::Universe;
use crate::domain::{InstrumentProfile, Observation};

/// Loading on the parent layer's daily shock.
const PARENT_BETA: f64 = 0.7;

#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    universe: Universe,
    end: NaiveDate,
    history: usize,
}

fn rng_for(label: &str, symbol: &str) -> StdRng {
    let seed = blake3::hash(format!("{label}:{symbol}").as_bytes());
    StdRng::from_seed(*seed.as_bytes())
}

impl SyntheticProvider {
    /// `history` weekday observations ending on or before `end`.
    pub fn new(universe: Universe, end: NaiveDate, history: usize) -> Self {
        Self {
            universe,
            end,
            history,
        }
    }

    fn dates(&self) -> Vec<NaiveDate> {
        let mut dates = Vec::with_capacity(self.history);
        let mut current = self.end;
        while dates.len() < self.history {
            if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
                dates.push(current);
            }
            current -= Duration::days(1);
        }
        dates.reverse();
        dates
    }

    /// The layer whose shocks `symbol` loads on, if any.
    fn parent(&self, symbol: &str) -> Option<String> {
        if let Some(profile) = self.universe.profile(symbol) {
            return Some(profile.industry_reference);
        }
        if symbol == self.universe.market_reference || symbol == self.universe.macro_reference {
            return None;
        }
        for sector in self.universe.sectors.values() {
            if sector.reference == symbol {
                return Some(self.universe.market_reference.clone());
            }
        }
        self.universe.sectors.values().find_map(|sector| {
            sector
                .industries
                .values()
                .any(|i| i.reference == symbol)
                .then(|| sector.reference.clone())
        })
    }

    /// Own shocks plus the parent's, scaled by `PARENT_BETA`.
    fn returns(&self, symbol: &str, depth: usize) -> Vec<f64> {
        let mut rng = rng_for("returns", symbol);
        let drift: f64 = rng.gen_range(-0.0025..0.0025);
        let vol: f64 = rng.gen_range(0.006..0.022);
        let own: Vec<f64> = (0..self.history)
            .map(|_| drift + vol * rng.gen_range(-1.0..1.0) * 3f64.sqrt())
            .collect();

        match self.parent(symbol).filter(|_| depth < 4) {
            Some(parent) => {
                let parent_returns = self.returns(&parent, depth + 1);
                own.iter()
                    .zip(parent_returns)
                    .map(|(o, p)| PARENT_BETA * p + PARENT_BETA * o)
                    .collect()
            }
            None => own,
        }
    }

    /// Full synthetic history for any symbol.
    pub fn generate(&self, symbol: &str) -> Vec<Observation> {
        let returns = self.returns(symbol, 0);
        let mut rng = rng_for("bars", symbol);
        let mut price = rng.gen_range(20.0..400.0_f64);
        let base_volume = rng.gen_range(500_000.0..5_000_000.0_f64);

        self.dates()
            .into_iter()
            .zip(returns)
            .map(|(date, r)| {
                let open = price;
                let close = (price * (1.0 + r)).max(0.01);
                let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
                let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
                let volume = base_volume * rng.gen_range(0.6..1.4) * (1.0 + 20.0 * r.abs());
                let spread = close * rng.gen_range(0.0001..0.0006);
                price = close;
                Observation {
                    date,
                    open,
                    high,
                    low,
                    close,
                    volume,
                    spread: Some(spread),
                }
            })
            .collect()
    }
}

impl MarketDataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn profile(&self, symbol: &str) -> Result<InstrumentProfile, DataError> {
        self.universe
            .profile(symbol)
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })
    }

    fn get_series(&self, symbol: &str, lookback: usize) -> Result<Vec<Observation>, DataError> {
        if lookback > self.history {
            return Err(DataError::InsufficientHistory {
                symbol: symbol.to_string(),
                required: lookback,
                available: self.history,
            });
        }
        let history = self.generate(symbol);
        Ok(history[history.len() - lookback..].to_vec())
    }
}

impl SentimentProvider for SyntheticProvider {
    fn aggregate_sentiment(&self, symbol: &str, _window_days: usize) -> Result<f64, DataError> {
        Ok(rng_for("sentiment", symbol).gen_range(-1.0..=1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> SyntheticProvider {
        SyntheticProvider::new(
            Universe::default_us(),
            NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(),
            250,
        )
    }

    #[test]
    fn same_symbol_same_series() {
        let p = provider();
        assert_eq!(p.generate("AAPL"), p.generate("AAPL"));
        assert_ne!(p.generate("AAPL"), p.generate("MSFT"));
    }

    #[test]
    fn weekdays_only_and_ends_at_end_date() {
        let series = provider().generate("NVDA");
        assert_eq!(series.len(), 250);
        assert!(series
            .iter()
            .all(|o| !matches!(o.date.weekday(), Weekday::Sat | Weekday::Sun)));
        assert_eq!(series.last().unwrap().date, NaiveDate::from_ymd_opt(2024, 6, 28).unwrap());
        assert!(series.iter().all(Observation::is_sane));
    }

    #[test]
    fn members_track_their_industry() {
        let p = provider();
        let r = |s: &str| crate::stats::log_returns(&crate::domain::closes(&p.generate(s)));
        let corr = crate::stats::correlation(&r("NVDA"), &r("SMH")).unwrap();
        assert!(corr > 0.1, "correlation {corr}");
    }

    #[test]
    fn lookback_beyond_history_is_insufficient() {
        assert!(matches!(
            provider().get_series("AAPL", 300),
            Err(DataError::InsufficientHistory { .. })
        ));
    }

    #[test]
    fn sentiment_is_bounded_and_stable() {
        let p = provider();
        let s = p.aggregate_sentiment("AAPL", 20).unwrap();
        assert!((-1.0..=1.0).contains(&s));
        assert_eq!(s, p.aggregate_sentiment("AAPL", 20).unwrap());
    }
}
