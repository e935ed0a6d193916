//! Command-line arguments for the Market Monitor.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use std::str::FromStr;

use clap::Parser;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to a universe file (`SYMBOL BASE_PRICE VOLATILITY` per line).
    /// The built-in universe is used when omitted.
    #[clap(long)]
    pub universe: Option<String>,

    /// Shortest delay between ticks, in milliseconds.
    #[clap(long, default_value_t = 2000)]
    pub min_delay_ms: u64,

    /// Longest delay between ticks, in milliseconds.
    #[clap(long, default_value_t = 5000)]
    pub max_delay_ms: u64,

    /// Seed for a reproducible run.
    #[clap(long)]
    pub seed: Option<u64>,

    /// Alert rule as `SYMBOL:ABOVE:BELOW`; either level may be left empty.
    /// May be repeated.
    #[clap(long = "alert")]
    pub alerts: Vec<AlertArg>,

    /// Raise surge/plunge alerts for single-tick moves beyond this percentage.
    #[clap(long)]
    pub movement_pct: Option<f64>,

    /// Number of top movers to print per tick.
    #[clap(long, default_value_t = 5)]
    pub top: usize,

    /// Exit after this many ticks.
    #[clap(long)]
    pub ticks: Option<u64>,

    /// Print one JSON object per tick instead of text.
    #[clap(long)]
    pub json: bool,
}

/// One `--alert` value.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertArg {
    /// Symbol the rule applies to.
    pub symbol: String,
    /// Upper threshold.
    pub above: Option<f64>,
    /// Lower threshold.
    pub below: Option<f64>,
}

impl FromStr for AlertArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let symbol = parts.next().unwrap_or_default().trim();
        if symbol.is_empty() {
            return Err(format!("missing symbol in `{}`", s));
        }
        let above = parse_level(parts.next())?;
        let below = parse_level(parts.next())?;
        if parts.next().is_some() {
            return Err(format!("expected SYMBOL:ABOVE:BELOW, got `{}`", s));
        }
        if above.is_none() && below.is_none() {
            return Err(format!("`{}` sets neither an above nor a below level", s));
        }

        Ok(AlertArg {
            symbol: symbol.to_uppercase(),
            above,
            below,
        })
    }
}

fn parse_level(raw: Option<&str>) -> Result<Option<f64>, String> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => v
            .parse::<f64>()
            .map(Some)
            .map_err(|e| format!("bad level `{}`: {}", v, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_levels() {
        let arg: AlertArg = "aapl:120:80.5".parse().unwrap();
        assert_eq!(
            arg,
            AlertArg {
                symbol: "AAPL".into(),
                above: Some(120.0),
                below: Some(80.5),
            }
        );
    }

    #[test]
    fn either_level_may_be_empty() {
        let arg: AlertArg = "TSLA::200".parse().unwrap();
        assert_eq!((arg.above, arg.below), (None, Some(200.0)));
        let arg: AlertArg = "TSLA:300".parse().unwrap();
        assert_eq!((arg.above, arg.below), (Some(300.0), None));
    }

    #[test]
    fn rejects_malformed_values() {
        for bad in ["", ":1:2", "AAPL", "AAPL::", "AAPL:x:", "AAPL:1:2:3"] {
            assert!(bad.parse::<AlertArg>().is_err(), "{bad}");
        }
    }

    #[test]
    fn cli_accepts_repeated_alerts() {
        let args = Args::parse_from([
            "market_monitor",
            "--alert",
            "AAPL:200:",
            "--alert",
            "MSFT::300",
            "--seed",
            "7",
            "--ticks",
            "3",
        ]);
        assert_eq!(args.alerts.len(), 2);
        assert_eq!(args.seed, Some(7));
        assert_eq!(args.ticks, Some(3));
        assert_eq!(args.min_delay_ms, 2000);
        assert!(!args.json);
    }
}
