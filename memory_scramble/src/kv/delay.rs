//! Simulated network latency.

use std::time::Duration;

use rand::Rng;

/// Inclusive uniform delay range in milliseconds, applied once per
/// replication edge.
#[derive(Clone, Copy, Debug)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    /// Callers validate `min_ms <= max_ms` (the server config does).
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub fn sample(&self) -> Duration {
        let ms = rand::rng().random_range(self.min_ms..=self.max_ms);
        Duration::from_millis(ms)
    }

    pub async fn wait(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_stay_in_range() {
        let range = DelayRange::new(5, 10);
        for _ in 0..100 {
            let d = range.sample().as_millis() as u64;
            assert!((5..=10).contains(&d), "{d} out of range");
        }
    }

    #[test]
    fn degenerate_range_is_constant() {
        let range = DelayRange::new(7, 7);
        assert_eq!(range.sample(), Duration::from_millis(7));
    }
}
