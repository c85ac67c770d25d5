//! Temporal layer: calendar facts mapped to a regime label.
//!
//! Unlike the other five layers the temporal layer has no price series. Its
//! label comes from where the as-of date sits relative to scheduled events.

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{LayerClassification, LayerKind, RegimeLabel};

/// Scheduled macro events this close (in days) dominate the temporal layer.
pub const EVENT_PROXIMITY_DAYS: u32 = 2;

/// Calendar context of a single date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarFacts {
    pub as_of: NaiveDate,
    pub weekday: Weekday,
    pub earnings_season: bool,
    /// Days until the next scheduled macro event, if one is known.
    pub days_to_macro_event: Option<u32>,
    pub month_end: bool,
    pub holiday_adjacent: bool,
}

struct Rule {
    label: RegimeLabel,
    strength: f64,
}

/// Classify the temporal layer. Rules are evaluated in priority order; the
/// first that fires is primary, the second (if any) is secondary.
pub fn classify_temporal(facts: &CalendarFacts) -> LayerClassification {
    let mut fired: Vec<Rule> = Vec::new();
    if let Some(days) = facts.days_to_macro_event.filter(|d| *d <= EVENT_PROXIMITY_DAYS) {
        fired.push(Rule {
            label: RegimeLabel::HighVolatility,
            strength: 0.8 - 0.2 * days as f64,
        });
    }
    if facts.earnings_season {
        fired.push(Rule {
            label: RegimeLabel::Expansion,
            strength: 0.6,
        });
    }
    if facts.month_end {
        fired.push(Rule {
            label: RegimeLabel::Momentum,
            strength: 0.4,
        });
    }
    if facts.holiday_adjacent {
        fired.push(Rule {
            label: RegimeLabel::LowVolatility,
            strength: 0.5,
        });
    }

    let (primary, strength, confidence) = match fired.first() {
        Some(rule) => (rule.label, rule.strength, 0.9),
        None => (RegimeLabel::Neutral, 0.3, 0.5),
    };
    let secondary = fired.get(1).map(|r| r.label);

    let mut characteristics = BTreeMap::new();
    characteristics.insert(
        "days_to_macro_event".to_string(),
        facts.days_to_macro_event.map(f64::from).unwrap_or(-1.0),
    );
    characteristics.insert("earnings_season".to_string(), flag(facts.earnings_season));
    characteristics.insert("month_end".to_string(), flag(facts.month_end));
    characteristics.insert("holiday_adjacent".to_string(), flag(facts.holiday_adjacent));
    characteristics.insert(
        "weekday".to_string(),
        facts.weekday.num_days_from_monday() as f64,
    );

    LayerClassification {
        layer: LayerKind::Temporal,
        primary,
        secondary,
        strength,
        confidence,
        characteristics,
        as_of: facts.as_of,
    }
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}
