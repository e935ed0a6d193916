//! Rendering of tick updates for the terminal.
//!
//! Text mode prints a summary line, the top movers and any alerts. JSON mode prints
//! one `TickReport` object per line so the output can be piped into other tools.
use std::io::Write;

use market_common::{AlertEvent, MarketSummary, Result, TickerState, Trend};
use market_engine::TickUpdate;
use market_engine::analytics::{summarize, top_movers};
use serde::Serialize;

/// Everything printed for one tick.
#[derive(Debug, Serialize)]
pub struct TickReport<'a> {
    /// Tick sequence number.
    pub sequence: u64,
    /// Aggregate view of the tick.
    pub summary: MarketSummary,
    /// Largest movers of the tick.
    pub top_movers: Vec<TickerState>,
    /// Alerts raised by the tick.
    pub alerts: &'a [AlertEvent],
}

impl<'a> TickReport<'a> {
    /// Derive the report for `update`, keeping `top` movers.
    pub fn new(update: &'a TickUpdate, top: usize) -> Self {
        TickReport {
            sequence: update.snapshot.sequence(),
            summary: summarize(&update.snapshot),
            top_movers: top_movers(&update.snapshot, top),
            alerts: &update.alerts,
        }
    }
}

/// Write the report as a single JSON line.
pub fn write_json<W: Write>(out: &mut W, report: &TickReport<'_>) -> Result<()> {
    serde_json::to_writer(&mut *out, report)?;
    writeln!(out)?;
    Ok(())
}

/// Write the report as human-readable text.
pub fn write_text<W: Write>(out: &mut W, report: &TickReport<'_>) -> Result<()> {
    let s = &report.summary;
    writeln!(
        out,
        "TICK {:>5}  avg {:+.2}%  bullish {}  bearish {}  stable {}  ({} tickers)",
        report.sequence,
        s.average_change_percent,
        s.bullish_count,
        s.bearish_count,
        s.stable_count,
        s.total_tickers
    )?;
    for ticker in &report.top_movers {
        writeln!(
            out,
            "  {:<8} {:>10.2} {:>+9.2} {:>+7.2}%  vol={:<10} {}",
            ticker.symbol,
            ticker.price,
            ticker.change,
            ticker.change_percent,
            ticker.volume,
            trend_marker(ticker.trend)
        )?;
    }
    for alert in report.alerts {
        writeln!(out, "  ALERT {}", alert.describe())?;
    }
    Ok(())
}

fn trend_marker(trend: Trend) -> &'static str {
    match trend {
        Trend::Bullish => "▲",
        Trend::Bearish => "▼",
        Trend::Stable => "→",
    }
}
