use serde::{Deserialize, Serialize};

use super::regime::LayerKind;

/// Where an instrument sits in the layer hierarchy.
///
/// Each nested layer above the instrument is represented by a reference
/// series: a broad index for the market, an index or ETF for the sector and
/// industry, a rates/commodity proxy for macro conditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentProfile {
    pub symbol: String,
    pub sector: String,
    pub industry: String,
    pub market_reference: String,
    pub sector_reference: String,
    pub industry_reference: String,
    pub macro_reference: String,
}

impl InstrumentProfile {
    /// Symbol whose series represents `layer` for this instrument.
    ///
    /// Returns `None` for the temporal layer, which is classified from
    /// calendar facts rather than a price series.
    pub fn series_symbol(&self, layer: LayerKind) -> Option<&str> {
        match layer {
            LayerKind::Temporal => None,
            LayerKind::Macro => Some(&self.macro_reference),
            LayerKind::Market => Some(&self.market_reference),
            LayerKind::Sector => Some(&self.sector_reference),
            LayerKind::Industry => Some(&self.industry_reference),
            LayerKind::Instrument => Some(&self.symbol),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> InstrumentProfile {
        InstrumentProfile {
            symbol: "NVDA".into(),
            sector: "Technology".into(),
            industry: "Semiconductors".into(),
            market_reference: "SPY".into(),
            sector_reference: "XLK".into(),
            industry_reference: "SMH".into(),
            macro_reference: "TLT".into(),
        }
    }

    #[test]
    fn series_symbol_per_layer() {
        let p = profile();
        assert_eq!(p.series_symbol(LayerKind::Instrument), Some("NVDA"));
        assert_eq!(p.series_symbol(LayerKind::Industry), Some("SMH"));
        assert_eq!(p.series_symbol(LayerKind::Sector), Some("XLK"));
        assert_eq!(p.series_symbol(LayerKind::Market), Some("SPY"));
        assert_eq!(p.series_symbol(LayerKind::Macro), Some("TLT"));
        assert_eq!(p.series_symbol(LayerKind::Temporal), None);
    }
}
