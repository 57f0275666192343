use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Per-process knobs: abort-retry delay bounds and the RNG seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessConfig {
    pub retry_min_ms: u64,
    pub retry_max_ms: u64,
    pub seed: u64,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            retry_min_ms: 1,
            retry_max_ms: 10,
            seed: 0,
        }
    }
}

impl ProcessConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Uniform delay in `[retry_min_ms, retry_max_ms]`.
    pub fn retry_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let (lo, hi) = if self.retry_min_ms <= self.retry_max_ms {
            (self.retry_min_ms, self.retry_max_ms)
        } else {
            (self.retry_max_ms, self.retry_min_ms)
        };
        Duration::from_millis(rng.gen_range(lo..=hi))
    }
}
