use std::time::Duration;

use devhub_azdo::config::{parse_var, ConfigError};
use devhub_azdo::poller::PollSettings;

/// Timing of the orchestrator's polling loops and delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisioningConfig {
    /// Project-creation operation polling.
    pub operation_poll: PollSettings,
    /// Default-team discovery after project creation.
    pub team_discovery: PollSettings,
    /// Wait after renaming the default team before using it.
    pub rename_propagation: Duration,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            operation_poll: PollSettings::OPERATION,
            team_discovery: PollSettings::TEAM_DISCOVERY,
            rename_propagation: Duration::from_secs(2),
        }
    }
}

impl ProvisioningConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                                   | Default |
    /// |-------------------------------------------|---------|
    /// | `PROVISION_OPERATION_POLL_INTERVAL_SECS`  | `2`     |
    /// | `PROVISION_OPERATION_POLL_MAX_ATTEMPTS`   | `30`    |
    /// | `PROVISION_TEAM_DISCOVERY_INTERVAL_SECS`  | `3`     |
    /// | `PROVISION_TEAM_DISCOVERY_MAX_ATTEMPTS`   | `10`    |
    /// | `PROVISION_RENAME_PROPAGATION_SECS`       | `2`     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let operation_poll = PollSettings::new(
            Duration::from_secs(parse_var(
                &lookup,
                "PROVISION_OPERATION_POLL_INTERVAL_SECS",
                defaults.operation_poll.interval.as_secs(),
            )?),
            parse_var(
                &lookup,
                "PROVISION_OPERATION_POLL_MAX_ATTEMPTS",
                defaults.operation_poll.max_attempts,
            )?,
        );
        let team_discovery = PollSettings::new(
            Duration::from_secs(parse_var(
                &lookup,
                "PROVISION_TEAM_DISCOVERY_INTERVAL_SECS",
                defaults.team_discovery.interval.as_secs(),
            )?),
            parse_var(
                &lookup,
                "PROVISION_TEAM_DISCOVERY_MAX_ATTEMPTS",
                defaults.team_discovery.max_attempts,
            )?,
        );
        let rename_propagation = Duration::from_secs(parse_var(
            &lookup,
            "PROVISION_RENAME_PROPAGATION_SECS",
            defaults.rename_propagation.as_secs(),
        )?);

        Ok(Self {
            operation_poll,
            team_discovery,
            rename_propagation,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn empty_environment_gives_defaults() {
        let config = ProvisioningConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, ProvisioningConfig::default());
        assert_eq!(config.operation_poll.max_attempts, 30);
        assert_eq!(config.team_discovery.interval, Duration::from_secs(3));
    }

    #[test]
    fn overrides_are_applied() {
        let config = ProvisioningConfig::from_lookup(|var| match var {
            "PROVISION_OPERATION_POLL_MAX_ATTEMPTS" => Some("5".into()),
            "PROVISION_RENAME_PROPAGATION_SECS" => Some("0".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.operation_poll.max_attempts, 5);
        assert_eq!(config.operation_poll.interval, Duration::from_secs(2));
        assert_eq!(config.rename_propagation, Duration::ZERO);
    }

    #[test]
    fn non_numeric_values_are_rejected() {
        let err = ProvisioningConfig::from_lookup(|var| {
            (var == "PROVISION_TEAM_DISCOVERY_MAX_ATTEMPTS").then(|| "ten".to_string())
        })
        .unwrap_err();
        assert_matches!(
            err,
            ConfigError::Invalid {
                var: "PROVISION_TEAM_DISCOVERY_MAX_ATTEMPTS",
                ..
            }
        );
    }
}
