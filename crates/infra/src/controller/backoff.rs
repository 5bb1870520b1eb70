//! Per-key retry delays for failed reconciles.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Same delay after every failure.
    Fixed,
    /// `base * 2^(failures - 1)`, capped at `max`.
    Exponential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
    pub strategy: BackoffStrategy,
}

impl Default for Backoff {
    /// 5ms doubling up to ~16 minutes.
    fn default() -> Self {
        Self::exponential(Duration::from_millis(5), Duration::from_secs(1000))
    }
}

impl Backoff {
    pub fn exponential(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            strategy: BackoffStrategy::Exponential,
        }
    }

    pub fn fixed(delay: Duration) -> Self {
        Self {
            base: delay,
            max: delay,
            strategy: BackoffStrategy::Fixed,
        }
    }

    /// Delay before retrying after the `failures`-th consecutive failure (1-indexed).
    pub fn delay_for(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }

        match self.strategy {
            BackoffStrategy::Fixed => self.base,
            BackoffStrategy::Exponential => 2u32
                .checked_pow(failures - 1)
                .and_then(|factor| self.base.checked_mul(factor))
                .map_or(self.max, |d| d.min(self.max)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_doubles_then_caps() {
        let b = Backoff::exponential(Duration::from_millis(100), Duration::from_secs(1));

        assert_eq!(b.delay_for(0), Duration::ZERO);
        assert_eq!(b.delay_for(1), Duration::from_millis(100));
        assert_eq!(b.delay_for(2), Duration::from_millis(200));
        assert_eq!(b.delay_for(4), Duration::from_millis(800));
        assert_eq!(b.delay_for(5), Duration::from_secs(1));
        assert_eq!(b.delay_for(200), Duration::from_secs(1));
    }

    #[test]
    fn fixed_is_constant() {
        let b = Backoff::fixed(Duration::from_millis(50));
        assert_eq!(b.delay_for(1), Duration::from_millis(50));
        assert_eq!(b.delay_for(9), Duration::from_millis(50));
    }
}
