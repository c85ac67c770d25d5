//! RegimeLab CLI: regime hierarchies and multi-criteria scans.
//!
//! Commands:
//! - `scan`: run a preset or a TOML request file over a universe
//! - `hierarchy`: six-layer regime hierarchy of one symbol
//! - `classify`: classify a single layer with an explicit lookback
//! - `presets`: list available presets
//! - `universe`: list catalog universes or resolve one

mod logging;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use regimelab_core::data::{
    CalendarProvider, CsvProvider, MarketDataProvider, SentimentProvider, StandardCalendar,
    SyntheticProvider, Universe,
};
use regimelab_core::domain::{LayerClassification, LayerKind, RegimeHierarchy};
use regimelab_core::RegimeClassifier;
use regimelab_scanner::preset::parse_request;
use regimelab_scanner::{
    BuiltinPresets, EngineConfig, HierarchyHistory, JsonlHistory, LayeredPresets, PresetStore,
    ScanEngine, ScanResult, TomlPresetStore,
};

use logging::{init_logging, LogFormat};

/// Observations generated per symbol in synthetic mode.
const SYNTHETIC_HISTORY: usize = 400;

#[derive(Parser)]
#[command(
    name = "regimelab",
    about = "RegimeLab CLI: regime hierarchy classification and alignment scanning"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Engine config TOML (workers, timeouts, lookbacks, thresholds).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory of <SYMBOL>.csv files (plus optional sentiment.csv).
    #[arg(long, global = true, conflicts_with = "synthetic")]
    data_dir: Option<PathBuf>,

    /// Use deterministic synthetic data (the default without --data-dir).
    #[arg(long, global = true, default_value_t = false)]
    synthetic: bool,

    /// Last synthetic date (YYYY-MM-DD). Defaults to today.
    #[arg(long, global = true)]
    end: Option<String>,

    /// Universe catalog TOML. Defaults to the built-in US catalog.
    #[arg(long, global = true)]
    universe_file: Option<PathBuf>,

    /// Calendar TOML with macro events, holidays and catalysts.
    #[arg(long, global = true)]
    calendar: Option<PathBuf>,

    /// Print JSON instead of a table.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    /// Log level when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scan from a named preset or a TOML request file.
    Scan {
        /// Preset name (see `regimelab presets`).
        #[arg(long, conflicts_with = "request")]
        preset: Option<String>,

        /// Path to a TOML scan request.
        #[arg(long)]
        request: Option<PathBuf>,

        /// Override the request's top_n.
        #[arg(long)]
        top_n: Option<usize>,

        /// Override the request's timeout in milliseconds.
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// JSONL hierarchy history used by transition scans.
        #[arg(long)]
        history: Option<PathBuf>,

        /// Append every hierarchy built by the scan to --history, ranked or not.
        #[arg(long, default_value_t = false, requires = "history")]
        record: bool,
    },
    /// Build the six-layer regime hierarchy of one symbol.
    Hierarchy {
        symbol: String,
    },
    /// Classify one layer of a symbol with an explicit lookback.
    Classify {
        symbol: String,

        /// temporal, macro, market, sector, industry or instrument.
        #[arg(long, default_value = "instrument")]
        layer: LayerKind,

        /// Observations to classify over; the configured lookback if unset.
        #[arg(long)]
        lookback: Option<usize>,
    },
    /// List available scan presets.
    Presets,
    /// List catalog universes, or the members of one.
    Universe {
        name: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let format = if cli.global.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    init_logging(&cli.global.log_level, format)?;

    let app = App::load(&cli.global)?;
    match cli.command {
        Commands::Scan {
            preset,
            request,
            top_n,
            timeout_ms,
            history,
            record,
        } => run_scan(&app, preset, request, top_n, timeout_ms, history, record),
        Commands::Hierarchy { symbol } => run_hierarchy(&app, &symbol),
        Commands::Classify {
            symbol,
            layer,
            lookback,
        } => run_classify(&app, &symbol, layer, lookback),
        Commands::Presets => run_presets(&app),
        Commands::Universe { name } => run_universe(&app, name.as_deref()),
    }
}

/// Providers and settings shared by every command.
struct App {
    config: EngineConfig,
    universe: Universe,
    market: Arc<dyn MarketDataProvider>,
    sentiment: Arc<dyn SentimentProvider>,
    calendar: Arc<dyn CalendarProvider>,
    json: bool,
}

fn shared<P>(provider: P) -> (Arc<dyn MarketDataProvider>, Arc<dyn SentimentProvider>)
where
    P: MarketDataProvider + SentimentProvider + 'static,
{
    let provider = Arc::new(provider);
    (provider.clone(), provider)
}

impl App {
    fn load(args: &GlobalArgs) -> Result<Self> {
        let config = match &args.config {
            Some(path) => EngineConfig::from_file(path)?,
            None => EngineConfig::default(),
        };

        let universe_file = args.universe_file.as_ref().or(config.universe_file.as_ref());
        let universe = match universe_file {
            Some(path) => Universe::from_file(path)
                .with_context(|| format!("loading universe {}", path.display()))?,
            None => Universe::default_us(),
        };

        let calendar: Arc<dyn CalendarProvider> = match &args.calendar {
            Some(path) => Arc::new(
                StandardCalendar::from_file(path)
                    .with_context(|| format!("loading calendar {}", path.display()))?,
            ),
            None => Arc::new(StandardCalendar::new()),
        };

        let (market, sentiment) = match &args.data_dir {
            Some(dir) => {
                if !dir.is_dir() {
                    bail!("data directory {} does not exist", dir.display());
                }
                shared(CsvProvider::new(dir, universe.clone()))
            }
            None => {
                let end = match &args.end {
                    Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                        .with_context(|| format!("invalid --end '{s}'"))?,
                    None => chrono::Local::now().date_naive(),
                };
                shared(SyntheticProvider::new(universe.clone(), end, SYNTHETIC_HISTORY))
            }
        };
        tracing::debug!(provider = market.name(), tickers = universe.ticker_count(), "context ready");

        Ok(Self {
            config,
            universe,
            market,
            sentiment,
            calendar,
            json: args.json,
        })
    }

    fn engine(&self) -> Result<ScanEngine> {
        Ok(ScanEngine::new(
            self.config.clone(),
            Arc::clone(&self.market),
            Arc::clone(&self.calendar),
        )?
        .with_sentiment(Arc::clone(&self.sentiment))
        .with_universe(self.universe.clone()))
    }

    fn presets(&self) -> LayeredPresets {
        let mut stores: Vec<Box<dyn PresetStore>> = Vec::new();
        if let Some(dir) = &self.config.presets_dir {
            stores.push(Box::new(TomlPresetStore::new(dir)));
        }
        stores.push(Box::new(BuiltinPresets));
        LayeredPresets::new(stores)
    }

    fn print_json<T: serde::Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

fn run_scan(
    app: &App,
    preset: Option<String>,
    request_path: Option<PathBuf>,
    top_n: Option<usize>,
    timeout_ms: Option<u64>,
    history_path: Option<PathBuf>,
    record: bool,
) -> Result<()> {
    let mut request = match (preset, request_path) {
        (Some(name), None) => app.presets().get(&name)?,
        (None, Some(path)) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading request {}", path.display()))?;
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("request");
            parse_request(name, &text)?
        }
        _ => bail!("one of --preset or --request is required"),
    };
    if let Some(n) = top_n {
        request.top_n = n;
    }
    if let Some(ms) = timeout_ms {
        request.timeout_ms = Some(ms);
    }

    let history = history_path.map(JsonlHistory::new);
    let mut engine = app.engine()?;
    if let Some(h) = &history {
        engine = engine.with_history(Arc::new(h.clone()) as Arc<dyn HierarchyHistory>);
    }

    let result = engine.run(&request)?;

    if record {
        if let Some(h) = &history {
            h.append_all(&result.snapshots)
                .with_context(|| format!("recording history to {}", h.path().display()))?;
            tracing::info!(snapshots = result.snapshots.len(), path = %h.path().display(), "history recorded");
        }
    }

    if app.json {
        app.print_json(&result)
    } else {
        print_scan(&result);
        Ok(())
    }
}

fn print_scan(result: &ScanResult) {
    println!();
    println!("=== {} scan ({}) ===", result.mode, &result.fingerprint[..12]);
    println!(
        "{:<4} {:<8} {:>9} {:>9}  {:<16} {:>8}  {}",
        "#", "Symbol", "Score", "Align", "Majority", "Diverge", "Findings"
    );
    for (i, entry) in result.results.iter().enumerate() {
        let (align, majority, diverge) = match &entry.hierarchy {
            Some(h) => (
                format!("{:.2}", h.alignment_score),
                h.majority.as_str().to_string(),
                h.divergence_points.len().to_string(),
            ),
            None => ("-".into(), "-".into(), "-".into()),
        };
        let findings: Vec<String> = entry
            .findings
            .iter()
            .map(|f| format!("{}:{:.1}", f.kind(), f.score))
            .collect();
        println!(
            "{:<4} {:<8} {:>9.3} {:>9}  {:<16} {:>8}  {}",
            i + 1,
            entry.instrument,
            entry.composite_score,
            align,
            majority,
            diverge,
            findings.join(" ")
        );
    }
    if result.results.is_empty() {
        println!("(no instruments passed the filters)");
    }
    if !result.skipped.is_empty() {
        println!();
        println!("--- Skipped ({}) ---", result.skipped.len());
        for s in &result.skipped {
            println!("{:<8} {:<18} {}", s.instrument, s.reason.to_string(), s.detail);
        }
    }
    let st = &result.stats;
    println!();
    println!(
        "Requested {} | scored {} | no signal {} | filtered {} | returned {} | {} workers | {} ms",
        st.requested, st.scored, st.no_signal, st.filtered_out, st.returned, st.workers, st.elapsed_ms
    );
    if result.partial {
        println!("WARNING: deadline passed; results are partial");
    }
    println!();
}

fn run_hierarchy(app: &App, symbol: &str) -> Result<()> {
    let hierarchy = app.engine()?.aggregator().aggregate(symbol)?;
    if app.json {
        return app.print_json(&hierarchy);
    }
    print_hierarchy(&hierarchy);
    Ok(())
}

fn print_layer(c: &LayerClassification) {
    let secondary = c.secondary.map_or("-", |s| s.as_str());
    println!(
        "{:<11} {:<16} {:<16} {:>8.2} {:>10.2}  {}",
        c.layer.as_str(),
        c.primary.as_str(),
        secondary,
        c.strength,
        c.confidence,
        c.as_of
    );
}

fn print_hierarchy(h: &RegimeHierarchy) {
    println!();
    println!("=== {} regime hierarchy ===", h.instrument);
    println!(
        "{:<11} {:<16} {:<16} {:>8} {:>10}  {}",
        "Layer", "Primary", "Secondary", "Strength", "Confidence", "As of"
    );
    for layer in h.layers() {
        print_layer(layer);
    }
    println!();
    println!("Majority:   {}", h.majority);
    println!("Alignment:  {:.2} / 10", h.alignment_score);
    if !h.divergence_points.is_empty() {
        let names: Vec<&str> = h.divergence_points.iter().map(|l| l.as_str()).collect();
        println!("Divergent:  {}", names.join(", "));
    }
    println!();
}

fn run_classify(app: &App, symbol: &str, layer: LayerKind, lookback: Option<usize>) -> Result<()> {
    let engine = app.engine()?;
    let aggregator = engine.aggregator();
    let profile = aggregator.profile(symbol)?;
    let classification = match (profile.series_symbol(layer), lookback) {
        (Some(series_symbol), Some(lookback)) => {
            let series = app.market.get_series(series_symbol, lookback)?;
            RegimeClassifier::new(app.config.thresholds.clone()).classify(layer, &series, lookback)?
        }
        _ => aggregator.classify_layer(&profile, layer)?,
    };
    if app.json {
        return app.print_json(&classification);
    }
    println!();
    print_layer(&classification);
    for (name, value) in &classification.characteristics {
        println!("  {name:<18} {value:>12.4}");
    }
    println!();
    Ok(())
}

fn run_presets(app: &App) -> Result<()> {
    let store = app.presets();
    let names = store.names();
    if app.json {
        return app.print_json(&names);
    }
    for name in names {
        match store.get(&name) {
            Ok(req) => println!(
                "{name:<22} {:<11} top {:<4} {} detector(s)",
                req.mode.to_string(),
                req.top_n,
                req.detectors.len()
            ),
            Err(e) => println!("{name:<22} INVALID: {e}"),
        }
    }
    Ok(())
}

fn run_universe(app: &App, name: Option<&str>) -> Result<()> {
    match name {
        Some(name) => {
            let Some(symbols) = app.universe.resolve(name) else {
                bail!("unknown universe '{name}'");
            };
            if app.json {
                return app.print_json(&symbols);
            }
            println!("{}", symbols.join(" "));
        }
        None => {
            let names = app.universe.universe_names();
            if app.json {
                return app.print_json(&names);
            }
            for n in names {
                let count = app.universe.resolve(&n).map_or(0, |s| s.len());
                println!("{n:<24} {count:>4}");
            }
        }
    }
    Ok(())
}
