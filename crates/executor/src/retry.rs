use std::time::Duration;

/// Strategy for computing the delay before a retry attempt.
///
/// Every variant clamps the computed delay so it never exceeds the
/// configured maximum.
#[derive(Debug, Clone)]
pub enum RetryStrategy {
    /// Exponential backoff: `base * multiplier^attempt`, clamped to `max`.
    Exponential {
        /// Delay before the first retry.
        base: Duration,
        /// Upper bound on the computed delay.
        max: Duration,
        /// Factor applied on each successive attempt.
        multiplier: f64,
    },
    /// Linear backoff: `base * (attempt + 1)`, clamped to `max`.
    Linear {
        /// Per-attempt increment.
        base: Duration,
        /// Upper bound on the computed delay.
        max: Duration,
    },
    /// Constant delay between every retry attempt.
    Constant {
        /// Fixed delay duration.
        delay: Duration,
    },
}

impl RetryStrategy {
    /// Compute the delay for the given zero-based `attempt` number.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            Self::Exponential {
                base,
                max,
                multiplier,
            } => {
                // `attempt` is a small retry count, far below i32::MAX.
                #[allow(clippy::cast_possible_wrap)]
                let raw = base.as_secs_f64() * multiplier.powi(attempt as i32);
                Duration::from_secs_f64(raw.min(max.as_secs_f64()))
            }
            Self::Linear { base, max } => {
                let raw = base.as_secs_f64() * f64::from(attempt + 1);
                Duration::from_secs_f64(raw.min(max.as_secs_f64()))
            }
            Self::Constant { delay } => *delay,
        }
    }
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(100),
            max: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_doubles() {
        let strategy = RetryStrategy::Exponential {
            base: Duration::from_millis(100),
            max: Duration::from_secs(60),
            multiplier: 2.0,
        };
        assert_eq!(strategy.delay_for(0), Duration::from_millis(100));
        assert_eq!(strategy.delay_for(1), Duration::from_millis(200));
        assert_eq!(strategy.delay_for(3), Duration::from_millis(800));
    }

    #[test]
    fn exponential_clamps_to_max() {
        let strategy = RetryStrategy::Exponential {
            base: Duration::from_secs(1),
            max: Duration::from_secs(4),
            multiplier: 3.0,
        };
        assert_eq!(strategy.delay_for(0), Duration::from_secs(1));
        assert_eq!(strategy.delay_for(1), Duration::from_secs(3));
        assert_eq!(strategy.delay_for(2), Duration::from_secs(4));
        assert_eq!(strategy.delay_for(20), Duration::from_secs(4));
    }

    #[test]
    fn linear_grows_per_attempt() {
        let strategy = RetryStrategy::Linear {
            base: Duration::from_millis(50),
            max: Duration::from_secs(1),
        };
        assert_eq!(strategy.delay_for(0), Duration::from_millis(50));
        assert_eq!(strategy.delay_for(1), Duration::from_millis(100));
        assert_eq!(strategy.delay_for(4), Duration::from_millis(250));
        // 50ms * 30 = 1.5s -> clamped.
        assert_eq!(strategy.delay_for(29), Duration::from_secs(1));
    }

    #[test]
    fn constant_never_changes() {
        let strategy = RetryStrategy::Constant {
            delay: Duration::from_millis(250),
        };
        for attempt in 0..8 {
            assert_eq!(strategy.delay_for(attempt), Duration::from_millis(250));
        }
    }

    #[test]
    fn default_is_capped_exponential() {
        match RetryStrategy::default() {
            RetryStrategy::Exponential {
                base,
                max,
                multiplier,
            } => {
                assert_eq!(base, Duration::from_millis(100));
                assert_eq!(max, Duration::from_secs(30));
                assert!((multiplier - 2.0).abs() < f64::EPSILON);
            }
            other => panic!("default should be Exponential, got {other:?}"),
        }
    }
}
