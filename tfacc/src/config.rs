//! Harness configuration
//!
//! One `HarnessConfig` is handed to each step runner explicitly; nothing in
//! the engine reads process-wide state after construction.

use std::time::Duration;

pub const ENV_FETCH_TIMEOUT_SECS: &str = "TFACC_FETCH_TIMEOUT_SECS";
pub const ENV_OPERATION_TIMEOUT_SECS: &str = "TFACC_OPERATION_TIMEOUT_SECS";
pub const ENV_CONSISTENCY_RETRIES: &str = "TFACC_CONSISTENCY_RETRIES";
pub const ENV_INITIAL_BACKOFF_MS: &str = "TFACC_INITIAL_BACKOFF_MS";
pub const ENV_MAX_BACKOFF_MS: &str = "TFACC_MAX_BACKOFF_MS";
pub const ENV_PARALLELISM: &str = "TFACC_PARALLELISM";

#[derive(Debug, Clone, PartialEq)]
pub struct HarnessConfig {
    /// Upper bound for a single remote state read
    pub fetch_timeout: Duration,
    /// Upper bound for a single apply, destroy or import call
    pub operation_timeout: Duration,
    /// Extra fetches allowed while waiting for the remote view to converge
    pub consistency_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Number of scenarios run concurrently by the registry
    pub parallelism: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
            operation_timeout: Duration::from_secs(300),
            consistency_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            parallelism: 1,
        }
    }
}

impl HarnessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `TFACC_*` environment variables
    ///
    /// Unset or unparsable variables keep the default value.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let fetch_timeout = env_parse::<u64>(ENV_FETCH_TIMEOUT_SECS)
            .map(Duration::from_secs)
            .unwrap_or(defaults.fetch_timeout);
        let operation_timeout = env_parse::<u64>(ENV_OPERATION_TIMEOUT_SECS)
            .map(Duration::from_secs)
            .unwrap_or(defaults.operation_timeout);

        Self {
            fetch_timeout,
            operation_timeout,
            consistency_retries: env_parse(ENV_CONSISTENCY_RETRIES)
                .unwrap_or(defaults.consistency_retries),
            initial_backoff_ms: env_parse(ENV_INITIAL_BACKOFF_MS)
                .unwrap_or(defaults.initial_backoff_ms),
            max_backoff_ms: env_parse(ENV_MAX_BACKOFF_MS).unwrap_or(defaults.max_backoff_ms),
            parallelism: env_parse::<usize>(ENV_PARALLELISM)
                .filter(|n| *n > 0)
                .unwrap_or(defaults.parallelism),
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn with_consistency_retries(mut self, retries: u32) -> Self {
        self.consistency_retries = retries;
        self
    }

    pub fn with_backoff(mut self, initial_ms: u64, max_ms: u64) -> Self {
        self.initial_backoff_ms = initial_ms;
        self.max_backoff_ms = max_ms;
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    /// Exponential backoff before re-fetch number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let delay = self
            .initial_backoff_ms
            .saturating_mul(2_u64.pow(exponent))
            .min(self.max_backoff_ms);
        Duration::from_millis(delay)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring unparsable value {:?} for {}", raw, key);
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            ENV_FETCH_TIMEOUT_SECS,
            ENV_OPERATION_TIMEOUT_SECS,
            ENV_CONSISTENCY_RETRIES,
            ENV_INITIAL_BACKOFF_MS,
            ENV_MAX_BACKOFF_MS,
            ENV_PARALLELISM,
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn default_config() {
        let config = HarnessConfig::default();
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
        assert_eq!(config.consistency_retries, 3);
        assert_eq!(config.initial_backoff_ms, 100);
        assert_eq!(config.max_backoff_ms, 10000);
        assert_eq!(config.parallelism, 1);
    }

    #[test]
    fn backoff_doubles_until_capped() {
        let config = HarnessConfig::default().with_backoff(100, 1000);
        assert_eq!(config.backoff(1), Duration::from_millis(100));
        assert_eq!(config.backoff(2), Duration::from_millis(200));
        assert_eq!(config.backoff(3), Duration::from_millis(400));
        assert_eq!(config.backoff(5), Duration::from_millis(1000));
        assert_eq!(config.backoff(64), Duration::from_millis(1000));
    }

    #[test]
    fn parallelism_is_at_least_one() {
        assert_eq!(HarnessConfig::new().with_parallelism(0).parallelism, 1);
        assert_eq!(HarnessConfig::new().with_parallelism(4).parallelism, 4);
    }

    #[test]
    #[serial]
    fn from_env_reads_overrides() {
        clear_env();
        std::env::set_var(ENV_FETCH_TIMEOUT_SECS, "5");
        std::env::set_var(ENV_CONSISTENCY_RETRIES, "7");
        std::env::set_var(ENV_PARALLELISM, "3");

        let config = HarnessConfig::from_env();
        assert_eq!(config.fetch_timeout, Duration::from_secs(5));
        assert_eq!(config.consistency_retries, 7);
        assert_eq!(config.parallelism, 3);
        assert_eq!(config.operation_timeout, Duration::from_secs(300));

        clear_env();
    }

    #[test]
    #[serial]
    fn from_env_ignores_garbage() {
        clear_env();
        std::env::set_var(ENV_FETCH_TIMEOUT_SECS, "soon");
        std::env::set_var(ENV_PARALLELISM, "0");

        let config = HarnessConfig::from_env();
        assert_eq!(config, HarnessConfig::default());

        clear_env();
    }
}
