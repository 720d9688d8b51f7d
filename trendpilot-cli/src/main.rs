//! Trendpilot CLI: run the decision loop and inspect its inputs and state.
//!
//! Commands:
//! - `run`: poll for new bars and trade (Alpaca, paper broker, or offline CSV)
//! - `signals`: print the signal table computed from CSV bars
//! - `state`: show the persisted bar marker, day anchor and recent orders

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use trendpilot_core::domain::Direction;
use trendpilot_core::signal::compute_signals;
use trendpilot_runner::{
    build_client, read_bars_csv, AlpacaBroker, AlpacaMarketData, BotConfig, Broker,
    CsvMarketData, Credentials, DecisionLoop, MarketData, OrderLog, PaperBroker, StateStore,
};

#[derive(Parser)]
#[command(
    name = "trendpilot",
    about = "Trendpilot: 1h/4h trend-following decision loop"
)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll for new bars and act on each one until Ctrl-C.
    Run {
        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Read bars from CSV files instead of the data API. Implies --dry-run.
        #[arg(long, default_value_t = false)]
        offline: bool,

        /// 1h bars CSV (with --offline).
        #[arg(long)]
        bars_1h: Option<PathBuf>,

        /// 4h bars CSV (with --offline).
        #[arg(long)]
        bars_4h: Option<PathBuf>,

        /// Send orders to the in-memory paper broker.
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Starting equity of the paper broker.
        #[arg(long, default_value_t = 100_000.0)]
        paper_equity: f64,
    },
    /// Print the signal table computed from CSV bars.
    Signals {
        #[arg(long)]
        bars_1h: PathBuf,

        #[arg(long)]
        bars_4h: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,

        /// Only show the last N rows.
        #[arg(long, default_value_t = 20)]
        tail: usize,
    },
    /// Show the persisted bar marker, day anchor and recent orders.
    State {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            offline,
            bars_1h,
            bars_4h,
            dry_run,
            paper_equity,
        } => {
            let config = load_config(config.as_deref())?;
            init_tracing(Some(&config.paths.log_dir), cli.verbose)?;
            let source = match (offline, bars_1h, bars_4h) {
                (true, Some(h1), Some(h4)) => BarSource::Csv { h1, h4 },
                (true, _, _) => anyhow::bail!("--offline needs both --bars-1h and --bars-4h"),
                (false, _, _) => BarSource::Alpaca,
            };
            run_loop(config, source, dry_run || offline, paper_equity).await
        }
        Commands::Signals {
            bars_1h,
            bars_4h,
            config,
            tail,
        } => {
            init_tracing(None, cli.verbose)?;
            let config = load_config(config.as_deref())?;
            print_signals(&config, &bars_1h, &bars_4h, tail)
        }
        Commands::State { config } => {
            init_tracing(None, cli.verbose)?;
            let config = load_config(config.as_deref())?;
            print_state(&config)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<BotConfig> {
    match path {
        Some(path) => BotConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(BotConfig::default()),
    }
}

/// Console output plus, when a log directory is given, an `events.log` copy
/// without ANSI colours.
fn init_tracing(log_dir: Option<&Path>, verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let path = dir.join("events.log");
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("opening {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .try_init()?;
    Ok(())
}

enum BarSource {
    Alpaca,
    Csv { h1: PathBuf, h4: PathBuf },
}

async fn run_loop(config: BotConfig, source: BarSource, paper: bool, paper_equity: f64) -> Result<()> {
    let fingerprint = config.fingerprint()?;
    info!(
        symbol = %config.instrument.symbol,
        paper_account = config.broker.paper,
        dry_run = paper,
        %fingerprint,
        "starting trendpilot"
    );

    let client = match (&source, paper) {
        (BarSource::Csv { .. }, true) => None,
        _ => {
            let credentials = Credentials::from_env()?;
            Some(build_client(&credentials)?)
        }
    };

    let data: Arc<dyn MarketData> = match (source, &client) {
        (BarSource::Csv { h1, h4 }, _) => Arc::new(CsvMarketData::hourly(h1, h4)),
        (BarSource::Alpaca, Some(client)) => Arc::new(AlpacaMarketData::new(
            client.clone(),
            &config.broker.data_url,
            config.instrument.asset_class,
        )),
        (BarSource::Alpaca, None) => anyhow::bail!("live data requires API credentials"),
    };

    let broker: Arc<dyn Broker> = match (&client, paper) {
        (Some(client), false) => Arc::new(AlpacaBroker::new(
            client.clone(),
            config.broker.trading_base_url(),
        )),
        _ => Arc::new(PaperBroker::new(paper_equity)),
    };
    info!(data = data.name(), broker = broker.name(), "collaborators ready");

    let state = StateStore::open(&config.paths.state_dir)?;
    let order_log = OrderLog::in_dir(&config.paths.log_dir);
    let mut bot = DecisionLoop::new(config, data, broker, state, order_log);
    bot.run().await;
    Ok(())
}

fn print_signals(config: &BotConfig, bars_1h: &Path, bars_4h: &Path, tail: usize) -> Result<()> {
    let h1 = read_bars_csv(bars_1h).with_context(|| format!("reading {}", bars_1h.display()))?;
    let h4 = read_bars_csv(bars_4h).with_context(|| format!("reading {}", bars_4h.display()))?;
    let rows = compute_signals(&h1, &h4, &config.strategy);

    println!(
        "{:<25} {:>10} {:>8} {:>6} {:>6} {:>8} {:>8} {:>6}  reason",
        "timestamp", "close", "atr", "1h", "4h", "adx_prev", "cmo_prev", "entry"
    );
    let start = rows.len().saturating_sub(tail);
    for row in &rows[start..] {
        let entry = match row.entry {
            Some(Direction::Long) => "LONG",
            Some(Direction::Short) => "SHORT",
            None => "-",
        };
        println!(
            "{:<25} {:>10.2} {:>8.2} {:>6} {:>6} {:>8.2} {:>8.2} {:>6}  {}",
            row.timestamp.to_rfc3339(),
            row.close,
            row.atr,
            trend_label(row.short_trend),
            trend_label(row.long_trend),
            row.adx_prev,
            row.cmo_prev,
            entry,
            row.diagnostics(&config.strategy).reason()
        );
    }
    let longs = rows.iter().filter(|r| r.entry == Some(Direction::Long)).count();
    let shorts = rows.iter().filter(|r| r.entry == Some(Direction::Short)).count();
    println!("\n{} rows, {longs} long entries, {shorts} short entries", rows.len());
    Ok(())
}

fn trend_label(trend: Option<bool>) -> &'static str {
    match trend {
        Some(true) => "up",
        Some(false) => "down",
        None => "-",
    }
}

fn print_state(config: &BotConfig) -> Result<()> {
    let state = StateStore::open(&config.paths.state_dir)?;
    println!("state dir:   {}", state.dir().display());
    match state.last_bar() {
        Some(ts) => println!("last bar:    {}", ts.to_rfc3339()),
        None => println!("last bar:    (none)"),
    }
    match state.day_anchor() {
        Some(anchor) => println!("day anchor:  {} @ {:.2}", anchor.date, anchor.equity),
        None => println!("day anchor:  (none)"),
    }

    let log = OrderLog::in_dir(&config.paths.log_dir);
    let rows = log.read_all()?;
    println!("orders:      {} in {}", rows.len(), log.path().display());
    for row in rows.iter().rev().take(5) {
        let id = if row.order_id.is_empty() { "(failed)" } else { row.order_id.as_str() };
        println!(
            "  {} {:<5} {} qty={} price={:.2} atr={:.2} {}",
            row.ts_utc.to_rfc3339(),
            row.side,
            row.symbol,
            row.qty,
            row.price,
            row.atr,
            id
        );
    }
    Ok(())
}
