//! Ranking: best composite first, symbol ascending on ties, truncated.

use std::cmp::Ordering;

use crate::result::ScanEntry;

pub fn compare_entries(a: &ScanEntry, b: &ScanEntry) -> Ordering {
    b.composite_score
        .total_cmp(&a.composite_score)
        .then_with(|| a.instrument.cmp(&b.instrument))
}

/// Sort best first and keep at most `top_n`. Non-finite composites are
/// dropped before sorting.
pub fn rank(mut entries: Vec<ScanEntry>, top_n: usize) -> Vec<ScanEntry> {
    entries.retain(|e| e.composite_score.is_finite());
    entries.sort_by(compare_entries);
    entries.truncate(top_n);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(symbol: &str, score: f64) -> ScanEntry {
        ScanEntry {
            instrument: symbol.into(),
            composite_score: score,
            hierarchy: None,
            findings: vec![],
        }
    }

    #[test]
    fn sorted_best_first() {
        let ranked = rank(vec![entry("A", 1.0), entry("B", 3.0), entry("C", 2.0)], 10);
        let order: Vec<_> = ranked.iter().map(|e| e.instrument.as_str()).collect();
        assert_eq!(order, vec!["B", "C", "A"]);
    }

    #[test]
    fn ties_break_by_symbol() {
        let ranked = rank(vec![entry("MSFT", 5.0), entry("AAPL", 5.0), entry("GOOG", 5.0)], 10);
        let order: Vec<_> = ranked.iter().map(|e| e.instrument.as_str()).collect();
        assert_eq!(order, vec!["AAPL", "GOOG", "MSFT"]);
    }

    #[test]
    fn truncates_to_top_n() {
        let entries = (0..50).map(|i| entry(&format!("S{i:02}"), i as f64)).collect();
        let ranked = rank(entries, 10);
        assert_eq!(ranked.len(), 10);
        assert_eq!(ranked[0].instrument, "S49");
        assert_eq!(ranked[9].instrument, "S40");
    }

    #[test]
    fn nan_scores_are_dropped() {
        let ranked = rank(vec![entry("A", f64::NAN), entry("B", 1.0)], 10);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].instrument, "B");
    }

    #[test]
    fn input_order_does_not_matter() {
        let a = vec![entry("A", 2.0), entry("B", 2.0), entry("C", 1.0)];
        let mut b = a.clone();
        b.reverse();
        assert_eq!(rank(a, 3), rank(b, 3));
    }
}
