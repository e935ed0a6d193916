//! Engine timing and alerting configuration.

use std::time::Duration;

use market_common::{FeedError, Result};

/// Default lower bound of the tick interval.
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_secs(2);
/// Default upper bound of the tick interval.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(5);

/// Tunables fixed at engine construction.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Shortest wait between two ticks.
    pub min_delay: Duration,
    /// Longest wait between two ticks.
    pub max_delay: Duration,
    /// When set, emit `Surge`/`Plunge` alerts for single-tick moves larger than this
    /// many percent.
    pub movement_alert_pct: Option<f64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_delay: DEFAULT_MIN_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            movement_alert_pct: None,
        }
    }
}

impl EngineConfig {
    /// Config with the given jitter window and no movement alerts.
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            min_delay,
            max_delay,
            movement_alert_pct: None,
        }
    }

    /// Enable movement alerts at `pct` percent.
    pub fn with_movement_alerts(mut self, pct: f64) -> Self {
        self.movement_alert_pct = Some(pct);
        self
    }

    /// Reject windows and percentages the scheduler cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.min_delay > self.max_delay {
            return Err(FeedError::InvalidConfig(format!(
                "min delay {:?} exceeds max delay {:?}",
                self.min_delay, self.max_delay
            )));
        }
        if let Some(pct) = self.movement_alert_pct {
            if !pct.is_finite() || pct <= 0.0 {
                return Err(FeedError::InvalidConfig(format!(
                    "movement alert percentage must be positive, got {}",
                    pct
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn equal_bounds_are_allowed() {
        let d = Duration::from_millis(10);
        assert!(EngineConfig::new(d, d).validate().is_ok());
    }

    #[test]
    fn inverted_window_is_rejected() {
        let config = EngineConfig::new(Duration::from_secs(3), Duration::from_secs(1));
        assert!(matches!(config.validate(), Err(FeedError::InvalidConfig(_))));
    }

    #[test]
    fn non_positive_movement_pct_is_rejected() {
        let config = EngineConfig::default().with_movement_alerts(0.0);
        assert!(matches!(config.validate(), Err(FeedError::InvalidConfig(_))));
        let config = EngineConfig::default().with_movement_alerts(f64::NAN);
        assert!(config.validate().is_err());
    }
}
