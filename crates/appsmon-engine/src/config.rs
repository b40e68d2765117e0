//! Engine configuration.
//!
//! Built once by the launcher and handed to the scheduler by value.

use std::time::Duration;

use appsmon_types::AppId;
use tracing::warn;

/// Shortest interval between passes the engine accepts.
pub const MIN_INTERVAL_MS: u64 = 30_000;

/// Interval used until a valid one is configured.
pub const DEFAULT_INTERVAL_MS: u64 = 5 * 60 * 1000;

/// Passes with fewer instances than this have nothing to compare.
pub const MIN_INSTANCES: usize = 2;

/// Configuration consumed by the scheduler, collector and reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Wait between the end of one pass and the start of the next.
    pub interval: Duration,

    /// Restrict watching to a single app.
    pub app_filter: Option<AppId>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            app_filter: None,
        }
    }
}

impl MonitorConfig {
    /// Apply a configured interval.
    ///
    /// Values under [`MIN_INTERVAL_MS`] are rejected with a warning and the
    /// current interval is kept. Returns whether the value was accepted.
    pub fn apply_interval_ms(&mut self, interval_ms: u64) -> bool {
        if interval_ms < MIN_INTERVAL_MS {
            warn!(
                interval_ms,
                min_interval_ms = MIN_INTERVAL_MS,
                kept_interval_ms = self.interval_ms(),
                "Configured interval is too short, ignoring"
            );
            return false;
        }

        self.interval = Duration::from_millis(interval_ms);
        true
    }

    /// Set the app filter.
    pub fn with_app_filter(mut self, app_id: impl Into<AppId>) -> Self {
        self.app_filter = Some(app_id.into());
        self
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval.as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_interval() {
        assert_eq!(MonitorConfig::default().interval_ms(), 300_000);
    }

    #[test]
    fn test_short_interval_keeps_default() {
        let mut config = MonitorConfig::default();
        assert!(!config.apply_interval_ms(1000));
        assert_eq!(config.interval_ms(), DEFAULT_INTERVAL_MS);
    }

    #[test]
    fn test_short_interval_keeps_prior_value() {
        let mut config = MonitorConfig::default();
        assert!(config.apply_interval_ms(60_000));
        assert!(!config.apply_interval_ms(29_999));
        assert_eq!(config.interval_ms(), 60_000);
    }

    #[test]
    fn test_minimum_is_inclusive() {
        let mut config = MonitorConfig::default();
        assert!(config.apply_interval_ms(MIN_INTERVAL_MS));
        assert_eq!(config.interval, Duration::from_secs(30));
    }
}
