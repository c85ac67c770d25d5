//! Scan orchestration.
//!
//! One task per instrument on a private rayon pool. Tasks share nothing
//! mutable: each builds its own hierarchy and findings and sends the outcome
//! back over a channel, which the calling thread drains against the request
//! deadline. Tasks still queued when the deadline passes see the cancel flag
//! and return without touching any provider.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, info_span, warn};

use regimelab_core::aggregator::{AggregateError, LayerFailure};
use regimelab_core::classifier::ClassifyError;
use regimelab_core::data::{
    CalendarProvider, DataError, MarketDataProvider, SentimentProvider, Universe,
};
use regimelab_core::domain::{LayerKind, RegimeHierarchy};
use regimelab_core::{DetectorInputs, DetectorSet, LayerAggregator, RegimeClassifier};

use crate::config::{ConfigError, EngineConfig};
use crate::history::HierarchyHistory;
use crate::lifecycle::{LifecycleError, ScanLifecycle, ScanPhase};
use crate::ranking::rank;
use crate::request::{RequestError, ScanMode, ScanRequest, UniverseSpec};
use crate::result::{ScanEntry, ScanResult, ScanStats, SkipReason, SkippedInstrument};
use crate::scoring::{composite, passes_filters, Candidate};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] RequestError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Map an aggregation failure to the reason reported in `skipped`.
///
/// Failures on the instrument's own layer report their data cause; failures
/// on any reference layer report `LayerUnavailable`.
pub fn skip_reason(err: &AggregateError) -> SkipReason {
    match err {
        AggregateError::LayerUnavailable {
            layer: LayerKind::Instrument,
            cause,
        } => match cause {
            LayerFailure::Data(DataError::InsufficientHistory { .. })
            | LayerFailure::Classify(ClassifyError::InsufficientData { .. }) => {
                SkipReason::InsufficientData
            }
            _ => SkipReason::DataUnavailable,
        },
        AggregateError::LayerUnavailable { .. } => SkipReason::LayerUnavailable,
        AggregateError::Profile { .. } | AggregateError::Hierarchy(_) => SkipReason::DataUnavailable,
    }
}

enum Outcome {
    Ready(Candidate),
    /// Skipped after aggregation; the hierarchy is still reported as a
    /// snapshot.
    Unscored {
        hierarchy: RegimeHierarchy,
        reason: SkipReason,
        detail: String,
    },
    Skipped(SkipReason, String),
}

/// Per-scan state shared read-only by every task.
struct ScanTask {
    aggregator: LayerAggregator,
    detectors: DetectorSet,
    sentiment: Option<Arc<dyn SentimentProvider>>,
    history: Option<Arc<dyn HierarchyHistory>>,
    mode: ScanMode,
}

impl ScanTask {
    fn evaluate(&self, symbol: &str) -> Outcome {
        let hierarchy = match self.aggregator.aggregate(symbol) {
            Ok(h) => h,
            Err(e) => return Outcome::Skipped(skip_reason(&e), e.to_string()),
        };

        let previous = if self.mode == ScanMode::Transition {
            let before = hierarchy.as_of();
            match self.history.as_ref().and_then(|h| h.previous(symbol, before)) {
                Some(p) => Some(p),
                None => {
                    return Outcome::Unscored {
                        detail: format!("no hierarchy snapshot before {before}"),
                        reason: SkipReason::DataUnavailable,
                        hierarchy,
                    }
                }
            }
        } else {
            None
        };

        let findings = if self.detectors.is_empty() {
            Vec::new()
        } else {
            let profile = match self.aggregator.profile(symbol) {
                Ok(p) => p,
                Err(e) => {
                    return Outcome::Unscored {
                        hierarchy,
                        reason: SkipReason::DataUnavailable,
                        detail: e.to_string(),
                    }
                }
            };
            let inputs = DetectorInputs {
                profile: &profile,
                market: &**self.aggregator.market(),
                calendar: &**self.aggregator.calendar(),
                sentiment: self.sentiment.as_deref(),
            };
            match self.detectors.run(&inputs) {
                Ok(f) => f,
                Err(e) => {
                    return Outcome::Unscored {
                        hierarchy,
                        reason: SkipReason::DataUnavailable,
                        detail: e.to_string(),
                    }
                }
            }
        };

        debug!(
            symbol,
            alignment = hierarchy.alignment_score,
            findings = findings.len(),
            "instrument evaluated"
        );
        Outcome::Ready(Candidate {
            instrument: symbol.to_string(),
            hierarchy,
            previous,
            findings,
        })
    }
}

/// Runs scan requests. Holds no state between calls.
pub struct ScanEngine {
    config: EngineConfig,
    aggregator: LayerAggregator,
    sentiment: Option<Arc<dyn SentimentProvider>>,
    history: Option<Arc<dyn HierarchyHistory>>,
    universe: Universe,
    pool: rayon::ThreadPool,
}

impl std::fmt::Debug for ScanEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanEngine")
            .field("config", &self.config)
            .field("aggregator", &self.aggregator)
            .field("sentiment", &self.sentiment.is_some())
            .field("history", &self.history.is_some())
            .field("workers", &self.pool.current_num_threads())
            .finish()
    }
}

impl ScanEngine {
    pub fn new(
        config: EngineConfig,
        market: Arc<dyn MarketDataProvider>,
        calendar: Arc<dyn CalendarProvider>,
    ) -> Result<Self, ScanError> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads.unwrap_or(0))
            .thread_name(|i| format!("regimelab-scan-{i}"))
            .build()
            .map_err(|e| ScanError::WorkerPool(e.to_string()))?;
        let aggregator = LayerAggregator::new(
            market,
            calendar,
            RegimeClassifier::new(config.thresholds.clone()),
            config.hierarchy.clone(),
        );
        Ok(Self {
            config,
            aggregator,
            sentiment: None,
            history: None,
            universe: Universe::default_us(),
            pool,
        })
    }

    pub fn with_sentiment(mut self, sentiment: Arc<dyn SentimentProvider>) -> Self {
        self.sentiment = Some(sentiment);
        self
    }

    pub fn with_history(mut self, history: Arc<dyn HierarchyHistory>) -> Self {
        self.history = Some(history);
        self
    }

    /// Catalog used to resolve named universes.
    pub fn with_universe(mut self, universe: Universe) -> Self {
        self.universe = universe;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn aggregator(&self) -> &LayerAggregator {
        &self.aggregator
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Resolve the request universe to a de-duplicated symbol list in
    /// request order.
    pub fn resolve_universe(&self, spec: &UniverseSpec) -> Result<Vec<String>, RequestError> {
        let raw = match spec {
            UniverseSpec::Symbols(symbols) => symbols.clone(),
            UniverseSpec::Named(name) => self
                .universe
                .resolve(name)
                .ok_or_else(|| RequestError::UnknownUniverse(name.clone()))?,
        };
        let mut symbols: Vec<String> = Vec::with_capacity(raw.len());
        for s in raw {
            let s = s.trim().to_string();
            if !s.is_empty() && !symbols.contains(&s) {
                symbols.push(s);
            }
        }
        if symbols.is_empty() {
            return Err(RequestError::EmptyUniverse);
        }
        Ok(symbols)
    }

    pub fn run(&self, request: &ScanRequest) -> Result<ScanResult, ScanError> {
        let fingerprint = request.fingerprint();
        let _span = info_span!("scan", mode = %request.mode, fingerprint = &fingerprint[..12]).entered();
        let started = Instant::now();
        let mut lifecycle = ScanLifecycle::new();

        let symbols = match request
            .validate()
            .and_then(|()| self.resolve_universe(&request.universe))
        {
            Ok(symbols) => symbols,
            Err(e) => {
                lifecycle.fail();
                warn!(error = %e, "scan rejected");
                return Err(e.into());
            }
        };

        lifecycle.advance(ScanPhase::Fetching)?;
        info!(instruments = symbols.len(), workers = self.workers(), "fetching");
        let deadline = request
            .timeout_ms
            .or(self.config.default_timeout_ms)
            .map(|ms| started + Duration::from_millis(ms));
        let (outcomes, partial) = self.fetch(request, &symbols, deadline);

        lifecycle.advance(ScanPhase::Scoring)?;
        let mut stats = ScanStats {
            requested: symbols.len(),
            workers: self.workers(),
            ..ScanStats::default()
        };
        let mut skipped = Vec::new();
        let mut scored = Vec::new();
        let mut snapshots = Vec::new();
        for (symbol, outcome) in symbols.iter().zip(outcomes) {
            match outcome {
                Some(Outcome::Ready(candidate)) => {
                    snapshots.push(candidate.hierarchy.clone());
                    match composite(request, &candidate) {
                        Some(score) => scored.push(ScanEntry {
                            instrument: candidate.instrument,
                            composite_score: score,
                            hierarchy: Some(candidate.hierarchy),
                            findings: candidate.findings,
                        }),
                        None => stats.no_signal += 1,
                    }
                }
                Some(Outcome::Unscored {
                    hierarchy,
                    reason,
                    detail,
                }) => {
                    warn!(symbol = %symbol, %reason, %detail, "instrument skipped");
                    snapshots.push(hierarchy);
                    skipped.push(SkippedInstrument {
                        instrument: symbol.clone(),
                        reason,
                        detail,
                    });
                }
                Some(Outcome::Skipped(reason, detail)) => {
                    warn!(symbol = %symbol, %reason, %detail, "instrument skipped");
                    skipped.push(SkippedInstrument {
                        instrument: symbol.clone(),
                        reason,
                        detail,
                    });
                }
                None => {
                    let (reason, detail) = if partial {
                        (SkipReason::Timeout, "scan deadline passed".to_string())
                    } else {
                        (SkipReason::DataUnavailable, "worker exited without a result".to_string())
                    };
                    warn!(symbol = %symbol, %reason, "instrument skipped");
                    skipped.push(SkippedInstrument {
                        instrument: symbol.clone(),
                        reason,
                        detail,
                    });
                }
            }
        }
        stats.scored = scored.len();
        stats.skipped = skipped.len();
        info!(scored = stats.scored, skipped = stats.skipped, no_signal = stats.no_signal, "scored");

        lifecycle.advance(ScanPhase::Filtering)?;
        let before = scored.len();
        scored.retain(|e| passes_filters(e, request, self.config.default_min_score));
        stats.filtered_out = before - scored.len();

        lifecycle.advance(ScanPhase::Ranking)?;
        let results = rank(scored, request.top_n);
        stats.returned = results.len();
        stats.elapsed_ms = started.elapsed().as_millis() as u64;

        lifecycle.advance(ScanPhase::Done)?;
        info!(
            returned = stats.returned,
            filtered_out = stats.filtered_out,
            partial,
            elapsed_ms = stats.elapsed_ms,
            "scan complete"
        );

        Ok(ScanResult {
            mode: request.mode,
            results,
            skipped,
            partial,
            stats,
            fingerprint,
            snapshots,
        })
    }

    /// Fan out one task per symbol and collect outcomes by index. Returns
    /// `partial = true` when the deadline cut collection short.
    fn fetch(
        &self,
        request: &ScanRequest,
        symbols: &[String],
        deadline: Option<Instant>,
    ) -> (Vec<Option<Outcome>>, bool) {
        let task = Arc::new(ScanTask {
            aggregator: self.aggregator.clone(),
            detectors: DetectorSet::new(request.detectors.clone()),
            sentiment: self.sentiment.clone(),
            history: self.history.clone(),
            mode: request.mode,
        });
        let cancel = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel::<(usize, Outcome)>();

        for (idx, symbol) in symbols.iter().enumerate() {
            let task = Arc::clone(&task);
            let cancel = Arc::clone(&cancel);
            let tx = tx.clone();
            let symbol = symbol.clone();
            self.pool.spawn(move || {
                if cancel.load(Ordering::Relaxed) {
                    return;
                }
                let outcome = task.evaluate(&symbol);
                // The receiver is gone once the scan has timed out.
                let _ = tx.send((idx, outcome));
            });
        }
        drop(tx);

        let mut outcomes: Vec<Option<Outcome>> = symbols.iter().map(|_| None).collect();
        let mut received = 0;
        let mut partial = false;
        while received < symbols.len() {
            let next = match deadline {
                Some(deadline) => match deadline.checked_duration_since(Instant::now()) {
                    Some(left) => rx.recv_timeout(left),
                    None => Err(RecvTimeoutError::Timeout),
                },
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match next {
                Ok((idx, outcome)) => {
                    outcomes[idx] = Some(outcome);
                    received += 1;
                }
                Err(RecvTimeoutError::Timeout) => {
                    cancel.store(true, Ordering::Relaxed);
                    partial = true;
                    warn!(
                        completed = received,
                        pending = symbols.len() - received,
                        "scan deadline passed"
                    );
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        (outcomes, partial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regimelab_core::data::{InMemoryProvider, StandardCalendar, SyntheticProvider};
    use regimelab_core::domain::HierarchyError;

    fn engine() -> ScanEngine {
        let universe = Universe::default_us();
        let end = chrono::NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();
        let market = Arc::new(SyntheticProvider::new(universe, end, 300));
        ScanEngine::new(
            EngineConfig {
                worker_threads: Some(2),
                ..EngineConfig::default()
            },
            market,
            Arc::new(StandardCalendar::new()),
        )
        .unwrap()
    }

    #[test]
    fn skip_reason_separates_own_layer_from_references() {
        let own = AggregateError::LayerUnavailable {
            layer: LayerKind::Instrument,
            cause: LayerFailure::Data(DataError::InsufficientHistory {
                symbol: "X".into(),
                required: 20,
                available: 3,
            }),
        };
        assert_eq!(skip_reason(&own), SkipReason::InsufficientData);

        let own = AggregateError::LayerUnavailable {
            layer: LayerKind::Instrument,
            cause: LayerFailure::Data(DataError::Unavailable("down".into())),
        };
        assert_eq!(skip_reason(&own), SkipReason::DataUnavailable);

        let reference = AggregateError::LayerUnavailable {
            layer: LayerKind::Sector,
            cause: LayerFailure::Data(DataError::SymbolNotFound { symbol: "XLK".into() }),
        };
        assert_eq!(skip_reason(&reference), SkipReason::LayerUnavailable);

        let profile = AggregateError::Profile {
            symbol: "X".into(),
            source: DataError::SymbolNotFound { symbol: "X".into() },
        };
        assert_eq!(skip_reason(&profile), SkipReason::DataUnavailable);

        let broken = AggregateError::Hierarchy(HierarchyError::MissingLayer(LayerKind::Macro));
        assert_eq!(skip_reason(&broken), SkipReason::DataUnavailable);
    }

    #[test]
    fn named_universe_resolves_through_catalog() {
        let engine = engine();
        let symbols = engine
            .resolve_universe(&UniverseSpec::Named("Semiconductors".into()))
            .unwrap();
        assert!(symbols.contains(&"NVDA".to_string()));
        assert_eq!(
            engine.resolve_universe(&UniverseSpec::Named("Crypto".into())),
            Err(RequestError::UnknownUniverse("Crypto".into()))
        );
    }

    #[test]
    fn explicit_symbols_are_trimmed_and_deduplicated() {
        let symbols = engine()
            .resolve_universe(&UniverseSpec::Symbols(vec![
                "AAPL".into(),
                " MSFT ".into(),
                "AAPL".into(),
                "".into(),
            ]))
            .unwrap();
        assert_eq!(symbols, vec!["AAPL".to_string(), "MSFT".to_string()]);
    }

    #[test]
    fn unknown_named_universe_fails_before_fetching() {
        let request = ScanRequest::builder(UniverseSpec::Named("Crypto".into()), ScanMode::Alignment)
            .build()
            .unwrap();
        let err = engine().run(&request).unwrap_err();
        assert!(matches!(err, ScanError::InvalidRequest(RequestError::UnknownUniverse(_))));
    }

    #[test]
    fn invalid_deserialized_request_is_rejected() {
        let mut request = ScanRequest::builder(UniverseSpec::Named("all".into()), ScanMode::Alignment)
            .build()
            .unwrap();
        request.top_n = 0;
        assert!(matches!(
            engine().run(&request),
            Err(ScanError::InvalidRequest(RequestError::ZeroTopN))
        ));
    }

    #[test]
    fn zero_worker_config_is_rejected() {
        let err = ScanEngine::new(
            EngineConfig {
                worker_threads: Some(0),
                ..EngineConfig::default()
            },
            Arc::new(InMemoryProvider::new()),
            Arc::new(StandardCalendar::new()),
        )
        .unwrap_err();
        assert!(matches!(err, ScanError::Config(ConfigError::Invalid(_))));
    }

    #[test]
    fn workers_follow_config() {
        assert_eq!(engine().workers(), 2);
    }
}
