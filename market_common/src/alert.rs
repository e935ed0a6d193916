//! Alert events emitted by the engine.

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum_macros::{Display, EnumString};

/// Which condition produced an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AlertDirection {
    /// Price crossed upward through an `above` threshold.
    Above,
    /// Price crossed downward through a `below` threshold.
    Below,
    /// A single tick gained more than the configured movement percentage.
    Surge,
    /// A single tick lost more than the configured movement percentage.
    Plunge,
}

/// A fired alert. Consumers display or discard it; it has no further lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    /// Symbol the alert refers to.
    pub symbol: String,
    /// Condition that fired.
    pub direction: AlertDirection,
    /// Price threshold for `Above`/`Below`; percentage for `Surge`/`Plunge`.
    pub threshold: f64,
    /// Price at the tick that fired.
    pub price: f64,
    /// Time of the tick that fired.
    pub timestamp: DateTime<Utc>,
}

impl AlertEvent {
    /// Human-readable one-liner, e.g. `AAPL crossed above 120.00 at 122.00`.
    pub fn describe(&self) -> String {
        match self.direction {
            AlertDirection::Above => format!(
                "{} crossed above {:.2} at {:.2}",
                self.symbol, self.threshold, self.price
            ),
            AlertDirection::Below => format!(
                "{} fell below {:.2} at {:.2}",
                self.symbol, self.threshold, self.price
            ),
            AlertDirection::Surge => format!(
                "{} surged more than {:.1}% to {:.2}",
                self.symbol, self.threshold, self.price
            ),
            AlertDirection::Plunge => format!(
                "{} plummeted more than {:.1}% to {:.2}",
                self.symbol, self.threshold, self.price
            ),
        }
    }
}
