//! Sentiment vs. price divergence.

use serde::{Deserialize, Serialize};

use super::{DetectError, Detector, DetectorInputs};
use crate::domain::{DetectorFinding, DetectorKind, FindingDetail, SentimentDirection};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentParams {
    /// Observations (and sentiment days) compared.
    pub window: usize,
    /// Return that maps to a price signal of tanh(1).
    pub price_scale: f64,
    /// Minimum `|s - p| / 2`.
    pub min_divergence: f64,
}

impl Default for SentimentParams {
    fn default() -> Self {
        Self {
            window: 20,
            price_scale: 0.05,
            min_divergence: 0.3,
        }
    }
}

/// Price signal in (-1, 1) from a fractional return.
pub fn price_signal(ret: f64, price_scale: f64) -> f64 {
    (ret / price_scale).tanh()
}

/// Direction and disagreement when sentiment and price point opposite ways.
pub fn divergence(sentiment: f64, price: f64) -> Option<(SentimentDirection, f64)> {
    let direction = if sentiment < 0.0 && price > 0.0 {
        SentimentDirection::Bullish
    } else if price < 0.0 && sentiment > 0.0 {
        SentimentDirection::Bearish
    } else {
        return None;
    };
    Some((direction, (sentiment - price).abs() / 2.0))
}

impl Detector for SentimentParams {
    fn kind(&self) -> DetectorKind {
        DetectorKind::SentimentDivergence
    }

    fn validate(&self) -> Result<(), String> {
        if self.window < 2 {
            return Err(format!("window {} must be at least 2", self.window));
        }
        if !(self.price_scale.is_finite() && self.price_scale > 0.0) {
            return Err(format!("price_scale {} must be > 0", self.price_scale));
        }
        if !(0.0..=1.0).contains(&self.min_divergence) {
            return Err(format!("min_divergence {} outside [0, 1]", self.min_divergence));
        }
        Ok(())
    }

    fn detect(&self, inputs: &DetectorInputs<'_>) -> Result<Option<DetectorFinding>, DetectError> {
        let symbol = inputs.symbol();
        let provider = inputs
            .sentiment
            .ok_or(DetectError::MissingSentimentProvider(self.kind()))?;
        let series = inputs.series(self.kind(), symbol, self.window + 1)?;
        let (Some(first), Some(last)) = (series.first(), series.last()) else {
            return Ok(None);
        };
        if first.close <= 0.0 {
            return Ok(None);
        }
        let sentiment = provider
            .aggregate_sentiment(symbol, self.window)
            .map_err(|source| DetectError::Data {
                kind: self.kind(),
                symbol: symbol.to_string(),
                source,
            })?
            .clamp(-1.0, 1.0);
        let price = price_signal(last.close / first.close - 1.0, self.price_scale);

        let Some((direction, disagreement)) = divergence(sentiment, price) else {
            return Ok(None);
        };
        if disagreement < self.min_divergence {
            return Ok(None);
        }
        Ok(Some(DetectorFinding::new(
            vec![symbol.to_string()],
            disagreement * 10.0,
            FindingDetail::SentimentDivergence {
                sentiment,
                price_signal: price,
                divergence: (price - sentiment) / 2.0,
                direction,
            },
            last.date,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{InMemoryProvider, StandardCalendar};
    use crate::detectors::tests::{profile, series_from};

    #[test]
    fn divergence_requires_opposite_signs() {
        assert!(divergence(0.5, 0.4).is_none());
        assert!(divergence(-0.5, -0.4).is_none());
        let (dir, d) = divergence(-0.6, 0.8).unwrap();
        assert_eq!(dir, SentimentDirection::Bullish);
        assert!((d - 0.7).abs() < 1e-12);
        assert_eq!(divergence(0.6, -0.2).unwrap().0, SentimentDirection::Bearish);
    }

    #[test]
    fn rising_price_with_negative_sentiment_is_bullish() {
        let closes: Vec<f64> = (0..21).map(|i| 100.0 + i as f64).collect();
        let provider = InMemoryProvider::new()
            .with_series("AAA", series_from(&closes))
            .with_sentiment("AAA", -0.7);
        let calendar = StandardCalendar::new();
        let p = profile("AAA");
        let inputs = DetectorInputs {
            profile: &p,
            market: &provider,
            calendar: &calendar,
            sentiment: Some(&provider),
        };
        let finding = SentimentParams::default().detect(&inputs).unwrap().unwrap();
        match finding.detail {
            FindingDetail::SentimentDivergence {
                direction,
                divergence,
                ..
            } => {
                assert_eq!(direction, SentimentDirection::Bullish);
                assert!(divergence > 0.0);
            }
            ref other => panic!("unexpected {other:?}"),
        }
        assert!(finding.score >= 3.0);
    }

    #[test]
    fn missing_provider_is_an_error() {
        let provider = InMemoryProvider::new().with_series("AAA", series_from(&[1.0; 21]));
        let calendar = StandardCalendar::new();
        let p = profile("AAA");
        let inputs = DetectorInputs {
            profile: &p,
            market: &provider,
            calendar: &calendar,
            sentiment: None,
        };
        assert!(matches!(
            SentimentParams::default().detect(&inputs),
            Err(DetectError::MissingSentimentProvider(_))
        ));
    }
}
