/// Retry strategies with exponential backoff and jitter
///
/// Used by the pass executor to retry a chunk after a short write or a
/// transient I/O error. Jitter spreads retries of concurrent jobs that hit
/// the same device.
use super::classification::ErrorClass;
use crate::io::IOConfig;
use std::time::Duration;

/// Retry strategy trait
pub trait RetryStrategy: Send + Sync {
    /// Determine if retry should be attempted
    fn should_retry(&self, attempt: u32, class: ErrorClass) -> bool;

    /// Calculate delay before next retry
    fn next_delay(&self, attempt: u32) -> Duration;

    /// Retries allowed after the initial attempt
    fn max_retries(&self) -> u32;
}

/// Exponential backoff retry strategy with jitter
///
/// Implements exponential backoff: delay = base * 2^attempt
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Base delay for first retry
    base_delay: Duration,

    /// Maximum delay cap
    max_delay: Duration,

    /// Retries after the initial attempt
    max_retries: u32,

    /// Jitter factor (0.0 - 1.0) - adds randomness to delay
    jitter_factor: f64,
}

impl ExponentialBackoff {
    /// Create new exponential backoff strategy
    pub fn new(base_delay: Duration, max_delay: Duration, max_retries: u32) -> Self {
        Self {
            base_delay,
            max_delay,
            max_retries,
            jitter_factor: 0.3, // 30% jitter by default
        }
    }

    /// Create with custom jitter factor
    pub fn with_jitter(mut self, jitter_factor: f64) -> Self {
        self.jitter_factor = jitter_factor.clamp(0.0, 1.0);
        self
    }

    /// Strategy for chunk writes under the given I/O configuration
    pub fn for_writes(config: &IOConfig) -> Self {
        Self::new(
            config.retry_base_delay,
            config.retry_max_delay,
            config.max_write_retries,
        )
    }

    /// Calculate exponential delay with jitter
    fn calculate_delay(&self, attempt: u32) -> Duration {
        // Calculate exponential delay: base * 2^attempt
        let exponential_ms = self
            .base_delay
            .as_millis()
            .saturating_mul(2_u128.saturating_pow(attempt));
        let capped_ms = exponential_ms.min(self.max_delay.as_millis());

        // Add jitter: delay ± (delay * jitter_factor)
        let jitter_range = capped_ms as f64 * self.jitter_factor;
        let jitter = (rand::random::<f64>() - 0.5) * 2.0 * jitter_range;
        let final_ms = (capped_ms as f64 + jitter).max(0.0);

        Duration::from_millis(final_ms as u64)
    }
}

impl RetryStrategy for ExponentialBackoff {
    fn should_retry(&self, attempt: u32, class: ErrorClass) -> bool {
        // `attempt` counts retries already spent
        attempt < self.max_retries && class.allows_retry()
    }

    fn next_delay(&self, attempt: u32) -> Duration {
        self.calculate_delay(attempt)
    }

    fn max_retries(&self) -> u32 {
        self.max_retries
    }
}
