//! Standard calendar: configurable macro-event dates, market holidays and
//! per-symbol catalysts, with a rule-based earnings season.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::provider::{CalendarProvider, DataError};
use crate::temporal::CalendarFacts;

/// Trading days at the end of a month that count as month-end.
const MONTH_END_DAYS: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandardCalendar {
    /// Scheduled macro releases (rate decisions, CPI, payrolls).
    pub macro_events: Vec<NaiveDate>,
    pub holidays: Vec<NaiveDate>,
    /// Per-symbol catalyst dates (earnings, product events).
    pub catalysts: BTreeMap<String, Vec<NaiveDate>>,
}

impl StandardCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file(path: &Path) -> Result<Self, DataError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| DataError::Parse(format!("calendar TOML: {e}")))
    }

    pub fn with_macro_event(mut self, date: NaiveDate) -> Self {
        self.macro_events.push(date);
        self
    }

    pub fn with_holiday(mut self, date: NaiveDate) -> Self {
        self.holidays.push(date);
        self
    }

    pub fn with_catalyst(mut self, symbol: impl Into<String>, date: NaiveDate) -> Self {
        self.catalysts.entry(symbol.into()).or_default().push(date);
        self
    }

    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    fn is_trading_day(&self, date: NaiveDate) -> bool {
        !is_weekend(date) && !self.is_holiday(date)
    }
}

/// Earnings season: the 10th of the first month of a quarter through the
/// 15th of the second.
pub fn is_earnings_season(date: NaiveDate) -> bool {
    match date.month() {
        1 | 4 | 7 | 10 => date.day() >= 10,
        2 | 5 | 8 | 11 => date.day() <= 15,
        _ => false,
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn prev_weekday(date: NaiveDate) -> NaiveDate {
    let mut d = date - Duration::days(1);
    while is_weekend(d) {
        d -= Duration::days(1);
    }
    d
}

fn next_weekday(date: NaiveDate) -> NaiveDate {
    let mut d = date + Duration::days(1);
    while is_weekend(d) {
        d += Duration::days(1);
    }
    d
}

impl CalendarProvider for StandardCalendar {
    fn facts(&self, as_of: NaiveDate) -> CalendarFacts {
        let days_to_macro_event = self
            .macro_events
            .iter()
            .filter(|d| **d >= as_of)
            .map(|d| (*d - as_of).num_days() as u32)
            .min();

        let mut remaining = 0usize;
        let mut d = as_of + Duration::days(1);
        while d.month() == as_of.month() {
            if self.is_trading_day(d) {
                remaining += 1;
            }
            d += Duration::days(1);
        }
        let month_end = remaining < MONTH_END_DAYS;

        let holiday_adjacent =
            self.is_holiday(prev_weekday(as_of)) || self.is_holiday(next_weekday(as_of));

        CalendarFacts {
            as_of,
            weekday: as_of.weekday(),
            earnings_season: is_earnings_season(as_of),
            days_to_macro_event,
            month_end,
            holiday_adjacent,
        }
    }

    fn next_catalyst(&self, symbol: &str, after: NaiveDate) -> Option<NaiveDate> {
        self.catalysts
            .get(symbol)?
            .iter()
            .filter(|d| **d > after)
            .min()
            .copied()
    }
}
