use std::time::Duration;

/// Configuration for attestation polling behavior.
///
/// Controls how the orchestrator polls the attestation gateway for VAA
/// availability. Process-wide: set once when the orchestrator is built, never
/// per transaction.
///
/// # Examples
///
/// ```rust
/// use vaa_bridge::PollingConfig;
///
/// // Use defaults (80 attempts, 15 second intervals, ~20 minutes)
/// let config = PollingConfig::default();
///
/// // Customize polling behavior
/// let config = PollingConfig::default()
///     .with_max_attempts(20)
///     .with_poll_interval_secs(30);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    /// Maximum number of polling attempts before giving up.
    pub max_attempts: u32,
    /// Seconds to wait between polling attempts.
    pub poll_interval_secs: u64,
}

impl Default for PollingConfig {
    /// Creates the default polling configuration.
    ///
    /// - `max_attempts`: 80
    /// - `poll_interval_secs`: 15
    ///
    /// This results in a maximum wait time of ~20 minutes, which accommodates
    /// typical guardian attestation latency with headroom.
    fn default() -> Self {
        Self {
            max_attempts: 80,
            poll_interval_secs: 15,
        }
    }
}

impl PollingConfig {
    /// Sets the maximum number of polling attempts.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the interval between polling attempts in seconds.
    pub fn with_poll_interval_secs(mut self, secs: u64) -> Self {
        self.poll_interval_secs = secs;
        self
    }

    /// Returns the interval between polling attempts as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Returns the total maximum wait time in seconds
    /// (`max_attempts * poll_interval_secs`).
    pub fn total_timeout_secs(&self) -> u64 {
        self.max_attempts as u64 * self.poll_interval_secs
    }
}

/// Pause between records during the startup recovery sweep, to avoid
/// hammering the gateway after a restart. Not needed for correctness.
pub const RECOVERY_STAGGER: Duration = Duration::from_millis(500);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PollingConfig::default();
        assert_eq!(config.max_attempts, 80);
        assert_eq!(config.poll_interval_secs, 15);
        assert_eq!(config.total_timeout_secs(), 1200); // 20 minutes
    }

    #[test]
    fn test_builder_methods() {
        let config = PollingConfig::default()
            .with_max_attempts(3)
            .with_poll_interval_secs(1);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.total_timeout_secs(), 3);
    }

    #[test]
    fn test_config_is_copy() {
        let config = PollingConfig::default();
        let copied = config;
        assert_eq!(config, copied);
    }
}
