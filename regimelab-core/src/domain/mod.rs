//! Domain types for RegimeLab

pub mod finding;
pub mod hierarchy;
pub mod instrument;
pub mod observation;
pub mod regime;

pub use finding::{
    BreakdownDirection, DetectorFinding, DetectorKind, FindingDetail, SentimentDirection,
};
pub use hierarchy::{alignment_score, majority_label, HierarchyError, RegimeHierarchy};
pub use instrument::InstrumentProfile;
pub use observation::{closes, Observation};
pub use regime::{LayerClassification, LayerKind, RegimeLabel};

/// Symbol type alias
pub type Symbol = String;
