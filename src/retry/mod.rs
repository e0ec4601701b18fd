//! 重试模块
//!
//! - [`RetryPolicy`]：最大尝试次数、单次超时与退避间隔
//! - [`Retry`]：按策略在负载均衡选出的端点上重复调用

pub mod exponential;
pub mod fixed;
pub mod invoker;

pub use exponential::ExponentialBackoffPolicy;
pub use fixed::FixedRetryPolicy;
pub use invoker::Retry;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::error::RemoteError;

/// 重试策略 trait
pub trait RetryPolicy: Send + Sync {
    /// 最大尝试次数（至少为 1）
    fn max_attempts(&self) -> usize;

    /// 单次尝试的超时时间，从尝试开始计时
    fn per_attempt_timeout(&self) -> Duration;

    /// 第 `attempt` 次失败后、下一次尝试前的等待时间
    fn backoff_duration(&self, attempt: usize) -> Duration;

    /// 第 `attempt` 次失败后是否继续重试
    fn should_retry(&self, attempt: usize, _error: &RemoteError) -> bool {
        attempt < self.max_attempts()
    }
}

/// 退避方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    /// 不等待，立即重试
    #[default]
    None,
    /// 固定间隔
    Fixed,
    /// 指数退避
    Exponential,
}

/// 根据退避方式构建重试策略
pub fn policy_for(
    backoff: BackoffKind,
    max_attempts: usize,
    timeout: Duration,
    base_delay: Duration,
    max_delay: Duration,
) -> Arc<dyn RetryPolicy> {
    match backoff {
        BackoffKind::None => Arc::new(FixedRetryPolicy::new(max_attempts, timeout)),
        BackoffKind::Fixed => {
            Arc::new(FixedRetryPolicy::new(max_attempts, timeout).with_delay(base_delay))
        }
        BackoffKind::Exponential => Arc::new(ExponentialBackoffPolicy::new(
            max_attempts,
            timeout,
            base_delay,
            max_delay,
        )),
    }
}
