//! 注册中心后端抽象和实现

#[cfg(feature = "consul")]
pub mod consul;
pub mod memory;

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::discovery::instance::{InstanceFilter, RegistryEntry};
use crate::error::RegistryError;

/// 注册中心的一次推送：完整实例快照，或一次瞬时错误
pub type RegistryUpdate = Result<Vec<RegistryEntry>, RegistryError>;

/// 注册中心后端 trait
///
/// 所有注册中心后端（Consul、内存）都需要实现这个 trait。
/// 注意：由于需要动态分发（dyn），使用 async-trait
#[async_trait]
pub trait Registry: Send + Sync {
    /// 订阅服务实例变化
    ///
    /// `filter` 只是下推给注册中心的提示，后端可以忽略它；调用方仍会在本地过滤。
    /// 注册中心不可达时必须直接返回错误；订阅成功后，第一条推送应是当前的
    /// 完整实例快照，瞬时错误通过订阅流以 `Err` 的形式推送。没有及时推送
    /// 初始快照的后端，调用链以空端点集合启动。丢弃返回的 [`Subscription`]
    /// 即取消订阅。
    async fn subscribe(
        &self,
        service: &str,
        filter: &InstanceFilter,
    ) -> Result<Subscription, RegistryError>;
}

/// 订阅流（消费端）
///
/// 实现 `futures::Stream`，被丢弃时通知生产端停止推送。
pub struct Subscription {
    service: String,
    rx: mpsc::UnboundedReceiver<RegistryUpdate>,
    cancel: CancellationToken,
}

/// 订阅流（生产端），由后端持有
#[derive(Clone)]
pub struct SubscriptionFeed {
    tx: mpsc::UnboundedSender<RegistryUpdate>,
    cancel: CancellationToken,
}

impl Subscription {
    /// 创建一对单生产者、单消费者的订阅通道
    pub fn channel(service: impl Into<String>) -> (SubscriptionFeed, Subscription) {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        (
            SubscriptionFeed {
                tx,
                cancel: cancel.clone(),
            },
            Subscription {
                service: service.into(),
                rx,
                cancel,
            },
        )
    }

    /// 订阅的服务名
    pub fn service(&self) -> &str {
        &self.service
    }
}

impl Stream for Subscription {
    type Item = RegistryUpdate;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl SubscriptionFeed {
    /// 推送一次更新，订阅已关闭时返回 false
    pub fn send(&self, update: RegistryUpdate) -> bool {
        !self.is_closed() && self.tx.send(update).is_ok()
    }

    /// 订阅是否已关闭
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.tx.is_closed()
    }

    /// 等待订阅关闭
    pub async fn closed(&self) {
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = self.tx.closed() => {}
        }
    }
}
