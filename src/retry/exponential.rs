use super::RetryPolicy;
use crate::error::RemoteError;
use std::time::Duration;

/// 指数退避重试策略
#[derive(Debug, Clone)]
pub struct ExponentialBackoffPolicy {
    max_attempts: usize,
    timeout: Duration,
    base_delay: Duration,
    max_delay: Duration,
    retryable_only: bool,
}

impl ExponentialBackoffPolicy {
    pub fn new(
        max_attempts: usize,
        timeout: Duration,
        base_delay: Duration,
        max_delay: Duration,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            timeout,
            base_delay,
            max_delay,
            retryable_only: false,
        }
    }

    /// 只对可重试的错误（传输失败、超时、5xx、429）重试
    pub fn retryable_only(mut self, enabled: bool) -> Self {
        self.retryable_only = enabled;
        self
    }
}

impl RetryPolicy for ExponentialBackoffPolicy {
    fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    fn per_attempt_timeout(&self) -> Duration {
        self.timeout
    }

    fn backoff_duration(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(10) as u32;
        let delay = self.base_delay.saturating_mul(1 << exponent);
        delay.min(self.max_delay)
    }

    fn should_retry(&self, attempt: usize, error: &RemoteError) -> bool {
        if attempt >= self.max_attempts {
            return false;
        }
        !self.retryable_only || error.is_retryable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_up_to_max_delay() {
        let policy = ExponentialBackoffPolicy::new(
            5,
            Duration::from_millis(500),
            Duration::from_millis(100),
            Duration::from_millis(350),
        );

        assert_eq!(policy.backoff_duration(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_duration(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_duration(3), Duration::from_millis(350));
        assert_eq!(policy.backoff_duration(40), Duration::from_millis(350));
    }

    #[test]
    fn retryable_only_stops_on_client_errors() {
        let policy = ExponentialBackoffPolicy::new(
            4,
            Duration::from_millis(500),
            Duration::from_millis(10),
            Duration::from_secs(1),
        )
        .retryable_only(true);

        assert!(!policy.should_retry(1, &RemoteError::status(404, "not found")));
        assert!(policy.should_retry(1, &RemoteError::status(503, "unavailable")));
        assert!(policy.should_retry(1, &RemoteError::Timeout(Duration::from_millis(500))));
        assert!(!policy.should_retry(4, &RemoteError::transport("reset")));
    }
}
