use advisor::{Advisor, AdvisorContext};
use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use configuration::Settings;
use core_types::{FeatureRecord, JournalEntry, MarketBar, StatsScope, Trade};
use features::{FeatureAggregator, FeatureError, KeywordTagger, Tagger};
use forecaster::Forecaster;
use metrics::{MetricsEngine, RiskFallback};
use patterns::{CancelToken, ModelStore};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod render;
mod sample;

/// The main entry point for the Edgewise trade analytics application.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze(args) => handle_analyze(args, cli.config).await,
        Commands::Demo(args) => handle_demo(args, cli.config).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Turns a trader's executions, journal notes, and market bars into metrics,
/// discovered setups, outcome forecasts, and recommendations.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file (defaults to ./config.toml).
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze exported trade history from JSON files.
    Analyze(AnalyzeArgs),
    /// Run the full pipeline on a deterministic generated sample corpus.
    Demo(DemoArgs),
}

#[derive(Parser)]
struct AnalyzeArgs {
    /// JSON file holding an array of trades.
    #[arg(long)]
    trades: PathBuf,

    /// JSON file holding an array of journal entries.
    #[arg(long)]
    journals: Option<PathBuf>,

    /// JSON file holding an array of market bars.
    #[arg(long)]
    bars: Option<PathBuf>,

    /// Account to compute rolling statistics for.
    #[arg(long)]
    account: String,
}

#[derive(Parser)]
struct DemoArgs {
    /// Number of sample trades to generate.
    #[arg(long, default_value_t = 120)]
    trades: usize,

    /// Seed for the sample generator.
    #[arg(long, default_value_t = 7)]
    seed: u64,
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_analyze(args: AnalyzeArgs, config: Option<String>) -> Result<()> {
    let settings = load(config)?;

    let trades: Vec<Trade> = read_json(&args.trades).context("reading trades file")?;
    let journals: Vec<JournalEntry> = match &args.journals {
        Some(path) => read_json(path).context("reading journals file")?,
        None => Vec::new(),
    };
    let bars: Vec<MarketBar> = match &args.bars {
        Some(path) => read_json(path).context("reading bars file")?,
        None => Vec::new(),
    };

    info!(
        trades = trades.len(),
        journals = journals.len(),
        bars = bars.len(),
        "loaded input files"
    );

    run_pipeline(&settings, &args.account, trades, journals, bars).await
}

async fn handle_demo(args: DemoArgs, config: Option<String>) -> Result<()> {
    let settings = load(config)?;
    let corpus = sample::generate(args.trades, args.seed);
    info!(
        trades = corpus.trades.len(),
        journals = corpus.journals.len(),
        bars = corpus.bars.len(),
        seed = args.seed,
        "generated sample corpus"
    );
    run_pipeline(
        &settings,
        sample::ACCOUNT,
        corpus.trades,
        corpus.journals,
        corpus.bars,
    )
    .await
}

/// Runs the full 1→5 pipeline: aggregate features, compute rolling stats,
/// train the cluster model, forecast the most recent trade, and generate
/// recommendations.
async fn run_pipeline(
    settings: &Settings,
    account: &str,
    trades: Vec<Trade>,
    journals: Vec<JournalEntry>,
    bars: Vec<MarketBar>,
) -> Result<()> {
    // --- 1. Feature aggregation ---
    let tagger = KeywordTagger;
    let journals: Vec<JournalEntry> = journals
        .into_iter()
        .map(|mut j| {
            // Entries that arrive untagged get the deterministic stub tagger;
            // a live deployment would have the NLP collaborator fill these.
            if j.emotion_tags.is_empty() && j.pattern_tags.is_empty() {
                let tags = tagger.tag(&j.text);
                j.emotion_tags = tags.emotion_tags;
                j.pattern_tags = tags.pattern_tags;
            }
            j
        })
        .collect();
    let journal_by_trade: HashMap<_, _> = journals
        .iter()
        .filter_map(|j| j.trade_id.map(|id| (id, j)))
        .collect();

    let aggregator = FeatureAggregator::new(settings.features.clone());
    let now = Utc::now();
    let mut records: Vec<FeatureRecord> = Vec::with_capacity(trades.len());
    for trade in &trades {
        let journal = journal_by_trade.get(&trade.id).copied();
        match aggregator.aggregate(trade, journal, &bars, now) {
            Ok(record) => records.push(record),
            Err(FeatureError::InsufficientMarketData { .. }) => {
                // Accept degraded features rather than dropping the trade.
                warn!(trade_id = %trade.id, "no bars cover the holding window; degrading");
                records.push(aggregator.aggregate_degraded(trade, journal)?);
            }
            Err(err @ FeatureError::MalformedTrade { .. }) => {
                // Quarantine malformed records instead of analyzing them.
                warn!(error = %err, "skipping malformed trade");
            }
        }
    }
    anyhow::ensure!(!records.is_empty(), "no analyzable trades in the input");

    // --- 2. Rolling statistics ---
    let engine = MetricsEngine::new(settings.metrics.clone());
    let scope = StatsScope {
        account_id: account.to_string(),
        symbol: None,
        strategy: None,
    };
    let stats = engine.compute_rolling_stats(&records, &scope);

    // --- 3. Pattern discovery (CPU-bound, run off the async thread) ---
    let store = ModelStore::new();
    let cancel = CancelToken::new();
    let clustering = settings.clustering.clone();
    let training_corpus = records.clone();
    let model = tokio::task::spawn_blocking(move || {
        patterns::train(&training_corpus, &clustering, &cancel)
    })
    .await
    .context("training task panicked")??;
    let model = store.publish(model);

    // --- 4. Forecast the most recent trade against its history ---
    let forecaster = Forecaster::new(settings.forecast.clone());
    let subject = records
        .iter()
        .max_by_key(|r| (r.execution_time(), r.trade_id))
        .context("no analyzable trades in the input")?;
    let history: Vec<FeatureRecord> = records
        .iter()
        .filter(|r| r.trade_id != subject.trade_id)
        .cloned()
        .collect();
    let forecast = forecaster.forecast(subject, &model, &history);

    // --- 5. Recommendations ---
    let advisor = Advisor::new(settings.advisor.clone());
    let recommendations = advisor.recommend(&AdvisorContext {
        stats: &stats,
        forecast: Some(&forecast),
    });

    // --- Report ---
    let trade_metrics = engine.compute_trade_metrics(subject, RiskFallback::MaeProxy)?;
    render::print_report(
        &stats,
        &model,
        subject,
        &trade_metrics,
        &forecast,
        &recommendations,
    );

    Ok(())
}

// ==============================================================================
// Helpers
// ==============================================================================

fn load(config: Option<String>) -> Result<Settings> {
    match config {
        Some(path) => configuration::load_settings_from(&path)
            .with_context(|| format!("loading configuration from {path}")),
        None => match configuration::load_settings() {
            Ok(settings) => Ok(settings),
            Err(configuration::ConfigError::LoadError(_)) => {
                info!("no config.toml found; using built-in defaults");
                Ok(Settings::default())
            }
            Err(err) => Err(err).context("loading config.toml"),
        },
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}
