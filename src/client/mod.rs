//! 客户端门面
//!
//! 为每个声明的操作组装一条独立的调用链：
//! 实例监听 -> 端点解析 -> 负载均衡 -> 重试。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::context::CallContext;
use crate::discovery::{InstanceWatcher, Registry};
use crate::endpoint::{EndpointResolver, HandleSource, OperationDescriptor, OperationFactory};
use crate::error::{ClientError, Result};
use crate::load_balancer::{LoadBalanceStrategy, LoadBalancer};
use crate::retry::{FixedRetryPolicy, Retry, RetryPolicy};

/// 默认最大尝试次数
pub const DEFAULT_MAX_ATTEMPTS: usize = 4;

/// 默认单次尝试超时
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_millis(500);

/// 构建时等待注册中心第一次实例快照的默认时长
pub const DEFAULT_INITIAL_WAIT: Duration = Duration::from_secs(2);

/// 单个操作的调用链
struct InvocationChain<Req, Resp> {
    resolver: Arc<EndpointResolver<Req, Resp>>,
    retry: Retry<Req, Resp>,
}

/// 客户端构建器
pub struct ClientBuilder {
    service: String,
    tags: Vec<String>,
    passing_only: bool,
    policy: Arc<dyn RetryPolicy>,
    strategy: LoadBalanceStrategy,
    initial_wait: Duration,
}

impl ClientBuilder {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            tags: Vec::new(),
            passing_only: true,
            policy: Arc::new(FixedRetryPolicy::new(
                DEFAULT_MAX_ATTEMPTS,
                DEFAULT_ATTEMPT_TIMEOUT,
            )),
            strategy: LoadBalanceStrategy::RoundRobin,
            initial_wait: DEFAULT_INITIAL_WAIT,
        }
    }

    /// 从配置创建构建器（服务、标签、重试与负载均衡）
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            service: config.service.name.clone(),
            tags: config.service.tags.clone(),
            passing_only: config.service.passing_only,
            policy: config.retry.policy(),
            strategy: config.balancer.strategy,
            initial_wait: DEFAULT_INITIAL_WAIT,
        }
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn passing_only(mut self, passing_only: bool) -> Self {
        self.passing_only = passing_only;
        self
    }

    pub fn retry_policy(mut self, policy: Arc<dyn RetryPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// 使用固定策略（无退避）设置尝试次数与单次超时
    pub fn retry(mut self, max_attempts: usize, timeout: Duration) -> Self {
        self.policy = Arc::new(FixedRetryPolicy::new(max_attempts, timeout));
        self
    }

    pub fn strategy(mut self, strategy: LoadBalanceStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// 每条调用链等待第一次实例快照的最长时间，超时后以空端点集合启动
    pub fn initial_wait(mut self, wait: Duration) -> Self {
        self.initial_wait = wait;
        self
    }

    /// 构建客户端
    ///
    /// 每个操作描述独立订阅注册中心。任何一条调用链初始化失败时，
    /// 已经建立的调用链全部关闭（释放句柄并取消订阅），然后返回该错误。
    pub async fn build<Req, Resp, I>(
        self,
        registry: &dyn Registry,
        factory: Arc<dyn OperationFactory<Req, Resp>>,
        descriptors: I,
    ) -> Result<ServiceClient<Req, Resp>>
    where
        Req: Clone + Send + 'static,
        Resp: Send + 'static,
        I: IntoIterator<Item = OperationDescriptor>,
    {
        if self.service.trim().is_empty() {
            return Err(ClientError::config("service name must not be empty"));
        }

        let mut chains: HashMap<OperationDescriptor, InvocationChain<Req, Resp>> = HashMap::new();
        for descriptor in descriptors {
            if chains.contains_key(&descriptor) {
                continue;
            }

            let watcher = match InstanceWatcher::watch(
                registry,
                &self.service,
                self.tags.clone(),
                self.passing_only,
            )
            .await
            {
                Ok(watcher) => watcher,
                Err(e) => {
                    warn!(
                        service = %self.service,
                        operation = %descriptor,
                        error = %e,
                        "Failed to build invocation chain, tearing down client"
                    );
                    close_chains(chains.into_values()).await;
                    return Err(e);
                }
            };

            let resolver = Arc::new(
                EndpointResolver::start(
                    descriptor.clone(),
                    watcher,
                    factory.clone(),
                    self.initial_wait,
                )
                .await,
            );
            let source: Arc<dyn HandleSource<Req, Resp>> = resolver.clone();
            let retry = Retry::new(
                descriptor.clone(),
                source,
                LoadBalancer::new(self.strategy),
                self.policy.clone(),
            );
            info!(
                service = %self.service,
                operation = %descriptor,
                endpoints = resolver.current_handles().len(),
                "Invocation chain ready"
            );
            chains.insert(descriptor, InvocationChain { resolver, retry });
        }

        if chains.is_empty() {
            return Err(ClientError::config("no operations declared"));
        }

        Ok(ServiceClient {
            service: self.service,
            chains,
        })
    }
}

async fn close_chains<Req, Resp>(chains: impl IntoIterator<Item = InvocationChain<Req, Resp>>)
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    for chain in chains {
        chain.resolver.close().await;
    }
}

/// 服务客户端
///
/// 按操作描述分派到对应的调用链。丢弃客户端会停止全部解析器；
/// 需要等待句柄全部释放时调用 [`ServiceClient::shutdown`]。
pub struct ServiceClient<Req, Resp> {
    service: String,
    chains: HashMap<OperationDescriptor, InvocationChain<Req, Resp>>,
}

impl<Req, Resp> ServiceClient<Req, Resp>
where
    Req: Clone + Send + 'static,
    Resp: Send + 'static,
{
    /// 调用指定操作
    pub async fn invoke(
        &self,
        ctx: &CallContext,
        descriptor: &OperationDescriptor,
        request: Req,
    ) -> Result<Resp> {
        let chain = self
            .chains
            .get(descriptor)
            .ok_or_else(|| ClientError::OperationNotConfigured(descriptor.to_string()))?;
        chain.retry.invoke(ctx, request).await
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// 已声明的操作（按名称排序）
    pub fn descriptors(&self) -> Vec<&OperationDescriptor> {
        let mut descriptors: Vec<_> = self.chains.keys().collect();
        descriptors.sort();
        descriptors
    }

    /// 操作当前可用的实例
    pub fn instances(&self, descriptor: &OperationDescriptor) -> Option<Vec<String>> {
        self.chains.get(descriptor).map(|chain| {
            chain
                .resolver
                .current_handles()
                .iter()
                .map(|handle| handle.instance().to_string())
                .collect()
        })
    }

    /// 关闭全部调用链，等待句柄释放与订阅取消
    pub async fn shutdown(self) {
        info!(service = %self.service, "Shutting down service client");
        close_chains(self.chains.into_values()).await;
    }
}
