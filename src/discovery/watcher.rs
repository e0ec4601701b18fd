//! 实例监听
//!
//! 订阅注册中心，按标签和健康状态过滤实例，只在过滤后的集合发生变化时
//! 产出 [`InstanceSetChange`]。注册中心的瞬时错误不会清空已知实例。

use futures::Stream;
use std::collections::BTreeSet;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::{debug, warn};

use crate::discovery::backend::{Registry, Subscription};
use crate::discovery::instance::{InstanceFilter, InstanceSetChange};
use crate::error::{ClientError, Result};

/// 实例监听器
///
/// 实现 `futures::Stream<Item = InstanceSetChange>`。第一次成功的快照总是
/// 会产出（即使为空），之后只产出与上一次不同的集合。底层订阅结束时流结束；
/// 丢弃监听器即取消订阅。
pub struct InstanceWatcher {
    service: String,
    filter: InstanceFilter,
    subscription: Subscription,
    last: Option<BTreeSet<String>>,
}

impl InstanceWatcher {
    /// 开始监听服务实例
    ///
    /// 注册中心拒绝订阅时返回 [`ClientError::SubscribeFailed`]。
    pub async fn watch(
        registry: &dyn Registry,
        service: &str,
        tags: Vec<String>,
        passing_only: bool,
    ) -> Result<Self> {
        let filter = InstanceFilter::new(tags, passing_only);
        let subscription = registry
            .subscribe(service, &filter)
            .await
            .map_err(|e| ClientError::subscribe_failed(service, e))?;

        debug!(
            service = %service,
            tags = ?filter.tags,
            passing_only = filter.passing_only,
            "Watching service instances"
        );

        Ok(Self {
            service: service.to_string(),
            filter,
            subscription,
            last: None,
        })
    }

    /// 监听的服务名
    pub fn service(&self) -> &str {
        &self.service
    }

    /// 最近一次产出的实例集合
    pub fn current(&self) -> Option<&BTreeSet<String>> {
        self.last.as_ref()
    }
}

impl Stream for InstanceWatcher {
    type Item = InstanceSetChange;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            match Pin::new(&mut this.subscription).poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(None) => {
                    debug!(service = %this.service, "Registry subscription ended");
                    return Poll::Ready(None);
                }
                Poll::Ready(Some(Err(e))) => {
                    // 保留上一次的实例集合
                    warn!(
                        service = %this.service,
                        error = %e,
                        "Registry reported an error, keeping last known instances"
                    );
                }
                Poll::Ready(Some(Ok(entries))) => {
                    let instances = this.filter.apply(&entries);
                    if this.last.as_ref() == Some(&instances) {
                        continue;
                    }
                    debug!(
                        service = %this.service,
                        instances = instances.len(),
                        "Instance set changed"
                    );
                    this.last = Some(instances.clone());
                    return Poll::Ready(Some(InstanceSetChange::new(instances)));
                }
            }
        }
    }
}
