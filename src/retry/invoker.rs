//! 带重试的调用
//!
//! 每次尝试都重新读取句柄快照并由负载均衡器选择端点，因此重试可能落在
//! 另一个实例上。调用方取消时立即返回，并中止正在进行的尝试。

use std::sync::Arc;
use tokio::time;
use tracing::{debug, warn};

use crate::context::CallContext;
use crate::endpoint::{HandleSource, OperationDescriptor};
use crate::error::{ClientError, RemoteError, Result};
use crate::load_balancer::LoadBalancer;
use crate::retry::RetryPolicy;

/// 重试调用器
pub struct Retry<Req, Resp> {
    descriptor: OperationDescriptor,
    source: Arc<dyn HandleSource<Req, Resp>>,
    balancer: LoadBalancer,
    policy: Arc<dyn RetryPolicy>,
}

impl<Req, Resp> Retry<Req, Resp>
where
    Req: Clone + Send + 'static,
    Resp: Send + 'static,
{
    pub fn new(
        descriptor: OperationDescriptor,
        source: Arc<dyn HandleSource<Req, Resp>>,
        balancer: LoadBalancer,
        policy: Arc<dyn RetryPolicy>,
    ) -> Self {
        Self {
            descriptor,
            source,
            balancer,
            policy,
        }
    }

    pub fn descriptor(&self) -> &OperationDescriptor {
        &self.descriptor
    }

    /// 调用远程操作
    ///
    /// - 成功立即返回
    /// - 没有可用端点时返回 [`ClientError::NoHealthyInstances`]，不消耗剩余尝试次数
    /// - 调用方取消时返回 [`ClientError::Cancelled`]
    /// - 尝试次数用尽（或策略拒绝继续）时返回 [`ClientError::RetriesExhausted`]，
    ///   其中包含最后一次 [`ClientError::AttemptFailed`]
    pub async fn invoke(&self, ctx: &CallContext, request: Req) -> Result<Resp> {
        let max_attempts = self.policy.max_attempts().max(1);
        let timeout = self.policy.per_attempt_timeout();
        let mut attempt = 0;

        loop {
            attempt += 1;
            if ctx.is_cancelled() {
                return Err(ClientError::Cancelled);
            }

            let snapshot = self.source.current_handles();
            let handle = self.balancer.select(&snapshot)?;
            debug!(
                operation = %self.descriptor,
                instance = %handle.instance(),
                attempt = attempt,
                "Invoking endpoint"
            );

            let outcome = tokio::select! {
                biased;
                _ = ctx.cancelled() => {
                    debug!(
                        operation = %self.descriptor,
                        instance = %handle.instance(),
                        attempt = attempt,
                        "Invocation cancelled"
                    );
                    return Err(ClientError::Cancelled);
                }
                outcome = time::timeout(timeout, handle.call(request.clone())) => outcome,
            };

            let error = match outcome {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(e)) => e,
                Err(_) => RemoteError::Timeout(timeout),
            };

            warn!(
                operation = %self.descriptor,
                instance = %handle.instance(),
                attempt = attempt,
                max_attempts = max_attempts,
                error = %error,
                "Attempt failed"
            );

            let retry = attempt < max_attempts && self.policy.should_retry(attempt, &error);
            let failed = ClientError::AttemptFailed {
                attempt,
                instance: handle.instance().to_string(),
                source: error,
            };
            if !retry {
                return Err(ClientError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(failed),
                });
            }

            let delay = self.policy.backoff_duration(attempt);
            if !delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = ctx.cancelled() => return Err(ClientError::Cancelled),
                    _ = time::sleep(delay) => {}
                }
            }
        }
    }
}
