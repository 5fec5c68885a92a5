use std::time::Duration;

/// What to do when the outbound ring has no room for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackpressurePolicy {
    /// Log and drop the record.
    #[default]
    Drop,
    /// Retry up to `attempts` more times, waiting `backoff` between tries,
    /// then drop.
    Retry { attempts: u32, backoff: Duration },
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub poll_interval: Duration,
    pub backpressure: BackpressurePolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            backpressure: BackpressurePolicy::Drop,
        }
    }
}

impl BridgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_backpressure(mut self, policy: BackpressurePolicy) -> Self {
        self.backpressure = policy;
        self
    }
}
