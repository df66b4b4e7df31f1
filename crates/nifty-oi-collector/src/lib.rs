//! # Nifty OI Collector
//!
//! Glue around the `nifty-oi-chain` core: the NSE fetch client, the polling
//! loop with last-good-value fallback, append-only snapshot sinks, and the
//! JSON status surface.
//!
//! ## Commands
//! - `collect` - run the polling collector (sinks + optional status server)
//! - `snapshot` - one-shot fetch, print the ranked table and summary

pub mod client;
pub mod config;
pub mod observability;
pub mod poller;
pub mod server;
pub mod sink;
pub mod state;

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::{mpsc, watch, RwLock};
use tracing::{error, info, warn};

use nifty_oi_chain::{chain::resolve_expiry, normalize, ChainSummary, RankedTable, StrikeWindow};

use crate::client::{ChainSource, NseClient};
use crate::config::{CollectorConfig, SourceConfig};
use crate::observability::init_tracing;
use crate::poller::Poller;
use crate::server::{serve, ServerState};
use crate::sink::{CsvSink, JsonlSink, SnapshotSink};
use crate::state::DashboardState;

#[derive(Parser, Debug)]
#[command(name = "nifty-oi")]
#[command(about = "Nifty option-chain OI collector and snapshot tool")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the polling collector: fetch on an interval, persist snapshots,
    /// serve status
    Collect {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/collector.toml")]
        config: String,
    },

    /// One-shot fetch: print the ranked table and summary, then exit
    Snapshot {
        /// Index symbol: NIFTY, BANKNIFTY, FINNIFTY
        #[arg(long, default_value = "NIFTY")]
        symbol: String,

        /// Target expiry, e.g. 30-Jan-2026 (nearest expiry when omitted)
        #[arg(long)]
        expiry: Option<String>,

        /// Fixed-band window half-width in points
        #[arg(long, default_value_t = 500, conflicts_with = "nearest")]
        band: i64,

        /// Nearest-N window instead of the fixed band
        #[arg(long)]
        nearest: Option<usize>,

        /// Sentiment dead-zone threshold
        #[arg(long, default_value_t = 0)]
        threshold: i64,

        /// Fetch timeout in seconds
        #[arg(long, default_value_t = 8)]
        timeout_secs: u64,
    },
}

/// Main entry point for the collector binary.
pub fn run() -> anyhow::Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;
    rt.block_on(async_main())
}

async fn async_main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guards = init_tracing("nifty-oi");

    match cli.command {
        Commands::Collect { config } => collect(&config).await,
        Commands::Snapshot {
            symbol,
            expiry,
            band,
            nearest,
            threshold,
            timeout_secs,
        } => {
            let window = match nearest {
                Some(count) => StrikeWindow::NearestN { count },
                None => StrikeWindow::FixedBand { points: band },
            };
            snapshot_once(symbol, expiry, window, threshold, timeout_secs).await
        }
    }
}

/// Run the polling collector until Ctrl-C.
async fn collect(config_path: &str) -> anyhow::Result<()> {
    let config = CollectorConfig::load(config_path)?;
    info!(config = config_path, symbol = %config.source.symbol, "starting collector");

    let state = Arc::new(RwLock::new(DashboardState::default()));
    let (refresh_tx, refresh_rx) = mpsc::channel(4);
    let (stop_tx, stop_rx) = watch::channel(false);

    let mut sinks: Vec<Box<dyn SnapshotSink>> = Vec::new();
    if let Some(path) = &config.sink.csv_path {
        sinks.push(Box::new(
            CsvSink::open(path).with_context(|| format!("open csv sink {}", path.display()))?,
        ));
    }
    if let Some(path) = &config.sink.jsonl_path {
        sinks.push(Box::new(
            JsonlSink::open(path).with_context(|| format!("open jsonl sink {}", path.display()))?,
        ));
    }
    if sinks.is_empty() {
        warn!("no sinks configured, snapshots will not be persisted");
    }

    if let Some(bind) = config.server.bind {
        let server_state = ServerState {
            state: state.clone(),
            refresh_tx: refresh_tx.clone(),
        };
        let server_stop = stop_rx.clone();
        tokio::spawn(async move {
            if let Err(e) = serve(bind, server_state, server_stop).await {
                error!(error = %e, "status server failed");
            }
        });
    }

    // Ctrl-C is the external stop signal; the poller is the only required
    // cancellation point. A failed signal handler still sends stop rather
    // than leaving the collector unstoppable.
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received, stopping"),
            Err(e) => error!(error = %e, "Ctrl-C handler failed, stopping"),
        }
        let _ = stop_tx.send(true);
    });

    let client = NseClient::new(&config.source)?;
    let poller = Poller::new(client, config, state, sinks);
    poller.run(refresh_rx, stop_rx).await
}

/// One-shot fetch and print, the ad-hoc script workflow as a subcommand.
async fn snapshot_once(
    symbol: String,
    expiry: Option<String>,
    window: StrikeWindow,
    threshold: i64,
    timeout_secs: u64,
) -> anyhow::Result<()> {
    let source = SourceConfig {
        symbol,
        expiry: expiry.clone(),
        timeout_secs,
        ..SourceConfig::default()
    };
    let client = NseClient::new(&source)?;

    let chain = client.fetch().await?;
    let target = resolve_expiry(&chain, expiry.as_deref())?;
    let rows = normalize(&chain, &target)?;
    let spot = chain.spot();

    let table = RankedTable::build(&rows, spot, &window);
    let full_chain = ChainSummary::over(&rows, threshold);

    println!("{}  expiry {}  spot {:.2}", source.symbol, target, spot);
    println!("{}", table);
    println!(
        "full chain: call ΔOI {}  put ΔOI {}  net weight {}  sentiment {}",
        full_chain.total_call_change_oi,
        full_chain.total_put_change_oi,
        full_chain.net_weight,
        full_chain.sentiment
    );
    Ok(())
}
