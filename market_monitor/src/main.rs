//! Market Monitor — a terminal consumer of the simulated market engine.
//!
//! It builds an engine from a universe file (or the built-in universe), installs the
//! requested alert rules, subscribes through a bounded channel and prints every tick
//! until Ctrl+C or the `--ticks` limit.
//!
//! Usage example (CLI):
//! ```bash
//! market_monitor --universe ./universe.txt --min-delay-ms 500 --max-delay-ms 1500 \
//!     --alert AAPL:200: --alert TSLA::220 --movement-pct 5 --top 3
//! ```
//!
//! Log verbosity follows `RUST_LOG` (defaults to `info`).
#![warn(missing_docs)]
mod args;
mod report;

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use crossbeam_channel::{bounded, select};
use log::{error, info, warn};
use market_common::tickers::TickerParser;
use market_common::{FeedError, Result, TickerSpec};
use market_engine::{Engine, EngineConfig, RngSource};

use crate::args::Args;
use crate::report::{TickReport, write_json, write_text};

/// Updates buffered between the feed thread and the printer.
const UPDATE_QUEUE: usize = 64;

fn main() -> Result<(), FeedError> {
    init_logger();
    let args = Args::parse();

    let universe = load_universe(args.universe.as_deref())?;
    let mut config = EngineConfig::new(
        Duration::from_millis(args.min_delay_ms),
        Duration::from_millis(args.max_delay_ms),
    );
    if let Some(pct) = args.movement_pct {
        config = config.with_movement_alerts(pct);
    }

    let engine = match args.seed {
        Some(seed) => {
            info!("Deterministic run with seed {}", seed);
            Engine::with_config(&universe, config, RngSource::seeded(seed))?
        }
        None => Engine::with_config(&universe, config, RngSource::from_entropy())?,
    };

    for alert in &args.alerts {
        engine.set_alert_rule(&alert.symbol, alert.above, alert.below)?;
    }

    let (stop_tx, stop_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })
    .map_err(|e| FeedError::Io(io::Error::other(e.to_string())))?;

    let (updates, subscription) = engine.subscribe_channel(UPDATE_QUEUE);
    engine.start()?;
    println!("Market monitor running. Press Ctrl+C to exit.");

    let stdout = io::stdout();
    let mut seen = 0u64;
    loop {
        select! {
            recv(stop_rx) -> _ => {
                info!("Interrupted, shutting down");
                break;
            },
            recv(updates) -> msg => match msg {
                Ok(update) => {
                    let report = TickReport::new(&update, args.top);
                    let mut out = stdout.lock();
                    if args.json {
                        write_json(&mut out, &report)?;
                    } else {
                        write_text(&mut out, &report)?;
                    }
                    seen += 1;
                    if args.ticks.is_some_and(|limit| seen >= limit) {
                        info!("Reached {} ticks", seen);
                        break;
                    }
                },
                Err(e) => {
                    error!("Update channel closed: {}", e);
                    break;
                },
            }
        }
    }

    subscription.unsubscribe();
    engine.shutdown();
    Ok(())
}

fn load_universe(raw: Option<&str>) -> Result<Vec<TickerSpec>> {
    let Some(raw) = raw else {
        return Ok(TickerSpec::default_universe());
    };

    let path = normalize_path(raw);
    if !is_file_exist(&path) {
        warn!("Universe file {} not found", path.display());
        return Err(FeedError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("universe file {} not found", path.display()),
        )));
    }

    let file = File::open(&path)?;
    let specs = TickerSpec::parse_from_file(BufReader::new(file))?;
    info!("Loaded {} tickers from {}", specs.len(), path.display());
    Ok(specs)
}

/// Turns the `--universe` argument into a path, dropping surrounding whitespace and
/// one pair of double quotes.
fn normalize_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let no_quotes = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    PathBuf::from(no_quotes)
}

/// `true` when `path` names an existing regular file.
fn is_file_exist(path: &Path) -> bool {
    path.exists() && path.is_file()
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
