use super::RetryPolicy;
use std::time::Duration;

/// 固定延迟重试策略
///
/// 默认不等待：任何失败（错误或超时）都会立即在下一个端点上重试，
/// 直到用完全部尝试次数。
#[derive(Debug, Clone)]
pub struct FixedRetryPolicy {
    max_attempts: usize,
    timeout: Duration,
    delay: Duration,
}

impl FixedRetryPolicy {
    pub fn new(max_attempts: usize, timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            timeout,
            delay: Duration::ZERO,
        }
    }

    /// 设置两次尝试之间的固定间隔
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl RetryPolicy for FixedRetryPolicy {
    fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    fn per_attempt_timeout(&self) -> Duration {
        self.timeout
    }

    fn backoff_duration(&self, _attempt: usize) -> Duration {
        self.delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;

    #[test]
    fn retries_every_error_until_max_attempts() {
        let policy = FixedRetryPolicy::new(3, Duration::from_millis(500));
        let error = RemoteError::status(400, "bad request");

        assert!(policy.should_retry(1, &error));
        assert!(policy.should_retry(2, &error));
        assert!(!policy.should_retry(3, &error));
        assert_eq!(policy.backoff_duration(1), Duration::ZERO);
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        assert_eq!(FixedRetryPolicy::new(0, Duration::from_secs(1)).max_attempts(), 1);
    }
}
