//! Aggregator (`monitor` command) configuration

use serde::Deserialize;
use std::time::Duration;

use crate::domain::telemetry::{DomainSelection, DomainSet};

use super::error::ValidationError;

/// Environment variable consulted when no selection is given on the command line.
pub const DOMAINS_ENV_VAR: &str = "MONITOR_DOMAINS";

/// Aggregator configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Domain selection, e.g. `0,2-4`; CLI and `MONITOR_DOMAINS` take precedence
    pub domains: Option<String>,
    /// Idle tick while waiting for the stop signal
    pub idle_poll_ms: u64,
    /// Participant name announced when joining a domain
    pub participant_name: String,
    /// Interval between simulated samples per domain
    pub simulate_interval_ms: u64,
}

impl MonitorConfig {
    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }

    pub fn simulate_interval(&self) -> Duration {
        Duration::from_millis(self.simulate_interval_ms)
    }

    /// Resolves the domains to join.
    ///
    /// The first non-blank of `cli`, `env_override` and `monitor.domains` is
    /// parsed; an absent or empty selection becomes the default set.
    pub fn domain_selection(&self, cli: Option<&str>, env_override: Option<&str>) -> DomainSelection {
        let input = [cli, env_override, self.domains.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty());
        DomainSet::parse_or_default(input)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.idle_poll_ms == 0 {
            return Err(ValidationError::InvalidIdlePoll);
        }
        if self.simulate_interval_ms == 0 {
            return Err(ValidationError::InvalidSimulateInterval);
        }
        if self.participant_name.trim().is_empty() {
            return Err(ValidationError::EmptyParticipantName);
        }
        Ok(())
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            domains: None,
            idle_poll_ms: 200,
            participant_name: "telemetry_monitor".to_string(),
            simulate_interval_ms: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.idle_poll(), Duration::from_millis(200));
        assert_eq!(config.participant_name, "telemetry_monitor");
        assert!(config.validate().is_ok());
    }

    fn ids(selection: &DomainSelection) -> Vec<u32> {
        selection.domains.iter().map(|d| d.value()).collect()
    }

    #[test]
    fn command_line_wins_over_env_and_config() {
        let config = MonitorConfig {
            domains: Some("7".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&config.domain_selection(Some("1-2"), Some("5"))), vec![1, 2]);
        assert_eq!(ids(&config.domain_selection(None, Some("5"))), vec![5]);
        assert_eq!(ids(&config.domain_selection(Some("  "), None)), vec![7]);
    }

    #[test]
    fn nothing_selected_falls_back_to_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(ids(&config.domain_selection(None, None)), vec![0, 1, 2, 3, 4, 5]);

        let selection = config.domain_selection(Some("x,3-"), None);
        assert_eq!(ids(&selection), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(selection.rejected, vec!["x".to_string(), "3-".to_string()]);
    }

    #[test]
    fn zero_intervals_are_invalid() {
        let config = MonitorConfig {
            idle_poll_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidIdlePoll));

        let config = MonitorConfig {
            simulate_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidSimulateInterval));
    }
}
