//! Universe catalog: sector/industry organized ticker lists with the
//! reference series that represent each layer.
//!
//! Stored as TOML. Every instrument's profile is derived from where it sits
//! in the catalog, so the catalog doubles as the profile source for the CSV
//! and synthetic providers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::domain::InstrumentProfile;

/// Named universe that selects every ticker in the catalog.
pub const ALL_UNIVERSE: &str = "all";

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("read universe file: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse universe TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize universe: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Industry {
    pub reference: String,
    pub tickers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sector {
    pub reference: String,
    pub industries: BTreeMap<String, Industry>,
}

/// The complete catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    pub market_reference: String,
    pub macro_reference: String,
    pub sectors: BTreeMap<String, Sector>,
}

impl Universe {
    pub fn from_file(path: &Path) -> Result<Self, UniverseError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, UniverseError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, UniverseError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// All tickers, sector then industry order.
    pub fn all_tickers(&self) -> Vec<&str> {
        self.sectors
            .values()
            .flat_map(|s| s.industries.values())
            .flat_map(|i| i.tickers.iter().map(String::as_str))
            .collect()
    }

    pub fn sector_tickers(&self, sector: &str) -> Option<Vec<&str>> {
        self.sectors.get(sector).map(|s| {
            s.industries
                .values()
                .flat_map(|i| i.tickers.iter().map(String::as_str))
                .collect()
        })
    }

    pub fn sector_names(&self) -> Vec<&str> {
        self.sectors.keys().map(String::as_str).collect()
    }

    pub fn ticker_count(&self) -> usize {
        self.sectors
            .values()
            .flat_map(|s| s.industries.values())
            .map(|i| i.tickers.len())
            .sum()
    }

    /// Resolve a named universe: `all`, a sector name, or an industry name.
    pub fn resolve(&self, name: &str) -> Option<Vec<String>> {
        if name.eq_ignore_ascii_case(ALL_UNIVERSE) {
            return Some(self.all_tickers().into_iter().map(String::from).collect());
        }
        if let Some(tickers) = self.sector_tickers(name) {
            return Some(tickers.into_iter().map(String::from).collect());
        }
        self.sectors
            .values()
            .find_map(|s| s.industries.get(name))
            .map(|i| i.tickers.clone())
    }

    /// Names `resolve` accepts, `all` first.
    pub fn universe_names(&self) -> Vec<String> {
        let mut names = vec![ALL_UNIVERSE.to_string()];
        for (sector_name, sector) in &self.sectors {
            names.push(sector_name.clone());
            names.extend(sector.industries.keys().cloned());
        }
        names
    }

    /// Profile of a catalog member.
    pub fn profile(&self, symbol: &str) -> Option<InstrumentProfile> {
        self.sectors.iter().find_map(|(sector_name, sector)| {
            sector.industries.iter().find_map(|(industry_name, industry)| {
                industry.tickers.iter().any(|t| t == symbol).then(|| InstrumentProfile {
                    symbol: symbol.to_string(),
                    sector: sector_name.clone(),
                    industry: industry_name.clone(),
                    market_reference: self.market_reference.clone(),
                    sector_reference: sector.reference.clone(),
                    industry_reference: industry.reference.clone(),
                    macro_reference: self.macro_reference.clone(),
                })
            })
        })
    }

    /// Every reference series symbol the catalog names.
    pub fn reference_symbols(&self) -> Vec<&str> {
        let mut refs = vec![self.market_reference.as_str(), self.macro_reference.as_str()];
        for sector in self.sectors.values() {
            refs.push(&sector.reference);
            refs.extend(sector.industries.values().map(|i| i.reference.as_str()));
        }
        refs.sort_unstable();
        refs.dedup();
        refs
    }

    /// Default US equity catalog with SPDR/iShares reference ETFs.
    pub fn default_us() -> Self {
        fn industry(reference: &str, tickers: &[&str]) -> Industry {
            Industry {
                reference: reference.to_string(),
                tickers: tickers.iter().map(|t| t.to_string()).collect(),
            }
        }
        fn sector(reference: &str, industries: Vec<(&str, Industry)>) -> Sector {
            Sector {
                reference: reference.to_string(),
                industries: industries
                    .into_iter()
                    .map(|(name, i)| (name.to_string(), i))
                    .collect(),
            }
        }

        let mut sectors = BTreeMap::new();
        sectors.insert(
            "Technology".into(),
            sector(
                "XLK",
                vec![
                    ("Semiconductors", industry("SMH", &["NVDA", "AVGO", "AMD", "INTC", "QCOM"])),
                    ("Software", industry("IGV", &["MSFT", "ORCL", "CRM", "ADBE", "NOW"])),
                    ("Hardware", industry("XLK", &["AAPL", "CSCO", "DELL"])),
                ],
            ),
        );
        sectors.insert(
            "Healthcare".into(),
            sector(
                "XLV",
                vec![
                    ("Pharmaceuticals", industry("PPH", &["JNJ", "PFE", "MRK", "LLY", "ABBV"])),
                    ("Biotechnology", industry("IBB", &["AMGN", "GILD", "VRTX", "REGN"])),
                    ("Health Services", industry("IHF", &["UNH", "CVS", "CI"])),
                ],
            ),
        );
        sectors.insert(
            "Financials".into(),
            sector(
                "XLF",
                vec![
                    ("Banks", industry("KBE", &["JPM", "BAC", "WFC", "C"])),
                    ("Capital Markets", industry("KCE", &["GS", "MS", "BLK", "SCHW"])),
                    ("Payments", industry("IPAY", &["V", "MA", "AXP"])),
                ],
            ),
        );
        sectors.insert(
            "Energy".into(),
            sector(
                "XLE",
                vec![
                    ("Integrated Oil", industry("XLE", &["XOM", "CVX"])),
                    ("Exploration", industry("XOP", &["COP", "EOG", "DVN"])),
                    ("Refining", industry("CRAK", &["MPC", "PSX", "VLO"])),
                ],
            ),
        );
        sectors.insert(
            "Consumer".into(),
            sector(
                "XLP",
                vec![
                    ("Staples", industry("XLP", &["WMT", "PG", "KO", "PEP", "COST"])),
                    ("Retail", industry("XRT", &["HD", "TGT", "LOW"])),
                    ("Restaurants", industry("EATZ", &["MCD", "SBUX", "CMG"])),
                ],
            ),
        );

        Self {
            market_reference: "SPY".into(),
            macro_reference: "TLT".into(),
            sectors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_universe_has_sectors() {
        let u = Universe::default_us();
        assert!(u.sector_names().contains(&"Technology"));
        assert!(u.ticker_count() > 40);
    }

    #[test]
    fn toml_roundtrip() {
        let u = Universe::default_us();
        let parsed = Universe::from_toml(&u.to_toml().unwrap()).unwrap();
        assert_eq!(u, parsed);
    }

    #[test]
    fn resolve_named_universes() {
        let u = Universe::default_us();
        assert_eq!(u.resolve("all").unwrap().len(), u.ticker_count());
        assert!(u.resolve("Energy").unwrap().contains(&"XOM".to_string()));
        assert_eq!(u.resolve("Semiconductors").unwrap()[0], "NVDA");
        assert!(u.resolve("Crypto").is_none());
        assert_eq!(u.universe_names()[0], "all");
    }

    #[test]
    fn profile_carries_reference_series() {
        let u = Universe::default_us();
        let p = u.profile("NVDA").unwrap();
        assert_eq!(p.sector, "Technology");
        assert_eq!(p.industry, "Semiconductors");
        assert_eq!(p.sector_reference, "XLK");
        assert_eq!(p.industry_reference, "SMH");
        assert_eq!(p.market_reference, "SPY");
        assert_eq!(p.macro_reference, "TLT");
        assert!(u.profile("SPY").is_none());
    }

    #[test]
    fn reference_symbols_are_deduplicated() {
        let u = Universe::default_us();
        let refs = u.reference_symbols();
        assert_eq!(refs.iter().filter(|r| **r == "XLK").count(), 1);
        assert!(refs.contains(&"SPY"));
    }
}
