//! Load test configuration.

use std::time::Duration;

use rand::Rng;

/// Lower bound of a user's send delay; a send ticker needs a non-zero period.
pub const MIN_SEND_DELAY: Duration = Duration::from_millis(1);

/// Shape of a load test run
#[derive(Debug, Clone)]
pub struct LoadTestConfig {
    /// Number of user waves
    pub stages: u32,
    pub clients_per_stage: u32,
    /// Pause between the start of two stages
    pub stage_interval: Duration,
    /// Messages a user sends before it disconnects and reconnects
    pub messages_per_connection: u32,
    /// Each user picks a fixed send delay from `[min_delay, max_delay]`
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// How often the status collector logs a summary
    pub report_interval: Duration,
    /// Stop after this long; `None` runs until Ctrl+C
    pub duration: Option<Duration>,
}

impl LoadTestConfig {
    /// Pick a send delay uniformly from `[min_delay, max_delay]`, never
    /// shorter than `MIN_SEND_DELAY`.
    pub fn random_delay(&self) -> Duration {
        let min = self.min_delay.as_millis() as u64;
        let max = self.max_delay.as_millis() as u64;
        let delay = if max <= min {
            self.min_delay
        } else {
            Duration::from_millis(rand::rng().random_range(min..=max))
        };
        delay.max(MIN_SEND_DELAY)
    }
}

impl Default for LoadTestConfig {
    fn default() -> Self {
        Self {
            stages: 14,
            clients_per_stage: 1000,
            stage_interval: Duration::from_secs(60),
            messages_per_connection: 100,
            min_delay: Duration::from_millis(300),
            max_delay: Duration::from_millis(6000),
            report_interval: Duration::from_secs(25),
            duration: None,
        }
    }
}
