//! Backoff policy: decides retry delays.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Backoff policy for failed jobs.
///
/// Wire shape is `{"type": "exponential", "delay": 1000}` with the delay in
/// milliseconds, so producers written against other clients can enqueue the
/// same options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackoffPolicy {
    /// Same delay before every retry.
    Fixed {
        #[serde(rename = "delay")]
        delay_ms: u64,
    },

    /// delay * 2^(attempts - 1)
    Exponential {
        #[serde(rename = "delay")]
        delay_ms: u64,
    },
}

impl BackoffPolicy {
    pub fn fixed(delay: Duration) -> Self {
        BackoffPolicy::Fixed {
            delay_ms: delay.as_millis() as u64,
        }
    }

    pub fn exponential(delay: Duration) -> Self {
        BackoffPolicy::Exponential {
            delay_ms: delay.as_millis() as u64,
        }
    }

    /// Policy for one-shot jobs: exponential, starting at one second.
    pub fn default_one_shot() -> Self {
        Self::exponential(Duration::from_secs(1))
    }

    /// Delay before the next attempt.
    ///
    /// `attempts` is the number of attempts already made (1-indexed), so the
    /// first failure waits the base delay:
    /// - attempt 1: 1s
    /// - attempt 2: 2s
    /// - attempt 3: 4s
    pub fn next_delay(&self, attempts: u32) -> Duration {
        match *self {
            BackoffPolicy::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            BackoffPolicy::Exponential { delay_ms } => {
                let exponent = attempts.saturating_sub(1).min(20);
                Duration::from_millis(delay_ms.saturating_mul(1u64 << exponent))
            }
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::default_one_shot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_backoff_doubles() {
        let policy = BackoffPolicy::default_one_shot();

        let d1 = policy.next_delay(1);
        let d2 = policy.next_delay(2);
        let d3 = policy.next_delay(3);

        assert_eq!(d1, Duration::from_secs(1));
        assert_eq!(d2, Duration::from_secs(2));
        assert_eq!(d3, Duration::from_secs(4));
    }

    #[test]
    fn zero_attempts_uses_base_delay() {
        let policy = BackoffPolicy::exponential(Duration::from_millis(250));
        assert_eq!(policy.next_delay(0), Duration::from_millis(250));
    }

    #[test]
    fn fixed_backoff_is_flat() {
        let policy = BackoffPolicy::fixed(Duration::from_millis(500));
        assert_eq!(policy.next_delay(1), policy.next_delay(7));
    }

    #[test]
    fn wire_shape_uses_type_and_delay() {
        let json = serde_json::to_value(BackoffPolicy::default_one_shot()).unwrap();
        assert_eq!(json, serde_json::json!({"type": "exponential", "delay": 1000}));
    }
}
