//! Instrument specs and helpers for describing the simulated universe.

use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::str::FromStr;

use crate::error::FeedError;

/// Built-in universe used when no universe file is supplied.
///
/// Each entry is `(symbol, base price, volatility)`.
pub const DEFAULT_UNIVERSE: &[(&str, f64, f64)] = &[
    ("AAPL", 189.5, 0.04),
    ("MSFT", 415.2, 0.03),
    ("GOOGL", 152.8, 0.05),
    ("AMZN", 178.3, 0.05),
    ("NVDA", 875.0, 0.08),
    ("META", 498.6, 0.06),
    ("TSLA", 245.1, 0.12),
    ("JPM", 196.4, 0.03),
    ("V", 281.9, 0.02),
    ("NFLX", 612.7, 0.07),
    ("CIMB", 7.42, 0.04),
    ("MAYBANK", 9.86, 0.02),
];

/// Static description of one instrument in the universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerSpec {
    /// Unique symbol.
    pub symbol: String,
    /// Price the instrument starts at.
    pub base_price: f64,
    /// Relative walk amplitude in `(0, 1]`.
    pub volatility: f64,
}

impl TickerSpec {
    /// Creates a spec from its parts. Values are validated when the engine is built.
    pub fn new(symbol: impl Into<String>, base_price: f64, volatility: f64) -> Self {
        Self {
            symbol: symbol.into(),
            base_price,
            volatility,
        }
    }

    /// Returns the built-in [`DEFAULT_UNIVERSE`] as owned specs.
    pub fn default_universe() -> Vec<TickerSpec> {
        DEFAULT_UNIVERSE
            .iter()
            .map(|(symbol, price, volatility)| TickerSpec::new(*symbol, *price, *volatility))
            .collect()
    }
}

impl FromStr for TickerSpec {
    type Err = FeedError;

    /// Parses `SYMBOL BASE_PRICE VOLATILITY`, separated by whitespace or commas.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|f| !f.is_empty())
            .collect();

        let [symbol, price, volatility] = fields.as_slice() else {
            return Err(FeedError::ParseUniverse(format!(
                "expected `SYMBOL BASE_PRICE VOLATILITY`, got `{}`",
                s.trim()
            )));
        };

        let base_price = price
            .parse::<f64>()
            .map_err(|e| FeedError::ParseUniverse(format!("bad base price `{}`: {}", price, e)))?;
        let volatility = volatility.parse::<f64>().map_err(|e| {
            FeedError::ParseUniverse(format!("bad volatility `{}`: {}", volatility, e))
        })?;

        Ok(TickerSpec::new(symbol.to_uppercase(), base_price, volatility))
    }
}

/// Trait providing file parsing for universe specs.
pub trait TickerParser {
    /// Parses specs from a buffered reader.
    ///
    /// Each non-empty line not starting with `#` is parsed as a single `TickerSpec`
    /// using `FromStr`. Returns an error naming the first line that cannot be parsed.
    fn parse_from_file<R: BufRead>(reader: R) -> Result<Vec<TickerSpec>, FeedError>;
}

impl TickerParser for TickerSpec {
    fn parse_from_file<R: BufRead>(reader: R) -> Result<Vec<Self>, FeedError> {
        let mut specs = Vec::new();

        for (index, line_result) in reader.lines().enumerate() {
            let line = line_result.map_err(FeedError::Io)?;
            let trimmed_line = line.trim();
            if trimmed_line.is_empty() || trimmed_line.starts_with('#') {
                continue;
            }

            match trimmed_line.parse::<Self>() {
                Ok(spec) => specs.push(spec),
                Err(e) => {
                    return Err(FeedError::ParseUniverse(format!("line {}: {}", index + 1, e)));
                }
            }
        }
        Ok(specs)
    }
}
