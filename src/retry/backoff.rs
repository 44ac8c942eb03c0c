use rand::Rng;
use std::time::Duration;
use tracing::trace;

/// Delay policy between two attempts of a throttled client call
pub trait Backoff: Send + Sync {
    /// Delay before retry number `retry` (zero based)
    fn next_delay(&self, retry: u32) -> Duration;
}

/// Exponential backoff with symmetric jitter, capped at `max_delay`
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter_factor: f64,
}

impl ExponentialBackoff {
    pub fn builder() -> ExponentialBackoffBuilder {
        ExponentialBackoffBuilder::default()
    }
}

impl Backoff for ExponentialBackoff {
    fn next_delay(&self, retry: u32) -> Duration {
        let max_ms = self.max_delay.as_millis() as f64;
        let exp = self.initial_delay.as_millis() as f64 * self.multiplier.powi(retry as i32);
        let capped = exp.min(max_ms);

        let jitter_range = capped * self.jitter_factor;
        let jitter = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };
        let delay_ms = (capped + jitter).clamp(0.0, max_ms);

        trace!(
            retry = retry,
            base_delay_ms = capped,
            jitter_ms = jitter,
            delay_ms = delay_ms,
            "Calculated backoff delay"
        );

        Duration::from_millis(delay_ms as u64)
    }
}

#[derive(Debug)]
pub struct ExponentialBackoffBuilder {
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter_factor: f64,
}

impl Default for ExponentialBackoffBuilder {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl ExponentialBackoffBuilder {
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    pub fn jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = factor.clamp(0.0, 1.0);
        self
    }

    pub fn build(self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_delay: self.initial_delay,
            max_delay: self.max_delay,
            multiplier: self.multiplier,
            jitter_factor: self.jitter_factor,
        }
    }
}

/// Constant delay, mostly useful in tests
#[derive(Debug, Clone)]
pub struct FixedBackoff {
    delay: Duration,
}

impl FixedBackoff {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Backoff for FixedBackoff {
    fn next_delay(&self, retry: u32) -> Duration {
        trace!(retry = retry, delay_ms = ?self.delay.as_millis(), "Fixed backoff delay");
        self.delay
    }
}
