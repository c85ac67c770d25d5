//! Data boundary: provider traits, the universe catalog, a standard
//! calendar and three market data sources.

pub mod calendar;
pub mod csv_import;
pub mod memory;
pub mod provider;
pub mod synthetic;
pub mod universe;

pub use calendar::StandardCalendar;
pub use csv_import::CsvProvider;
pub use memory::InMemoryProvider;
pub use provider::{CalendarProvider, DataError, MarketDataProvider, SentimentProvider};
pub use synthetic::SyntheticProvider;
pub use universe::{Universe, UniverseError, ALL_UNIVERSE};
