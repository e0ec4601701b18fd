//! 内存注册中心后端
//!
//! 用于测试与静态部署：实例列表由调用方直接维护，变化实时推送给所有订阅者。

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use crate::discovery::backend::{Registry, Subscription, SubscriptionFeed};
use crate::discovery::instance::{InstanceFilter, RegistryEntry};
use crate::error::RegistryError;

/// 内存注册中心
#[derive(Clone, Default)]
pub struct MemoryRegistry {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    services: HashMap<String, Vec<RegistryEntry>>,
    feeds: HashMap<String, Vec<SubscriptionFeed>>,
    unreachable: bool,
}

impl MemoryRegistry {
    /// 创建空的内存注册中心
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建带固定实例列表的注册中心（所有实例视为健康）
    pub fn with_instances<I, S>(service: impl Into<String>, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let registry = Self::new();
        registry.set_instances(
            service,
            addresses.into_iter().map(RegistryEntry::new).collect(),
        );
        registry
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 替换服务的实例列表并推送给所有订阅者
    pub fn set_instances(&self, service: impl Into<String>, entries: Vec<RegistryEntry>) {
        let service = service.into();
        let mut inner = self.lock();
        if let Some(feeds) = inner.feeds.get_mut(&service) {
            feeds.retain(|feed| feed.send(Ok(entries.clone())));
        }
        debug!(service = %service, instances = entries.len(), "Memory registry updated");
        inner.services.insert(service, entries);
    }

    /// 向订阅者推送一次瞬时错误（实例列表保持不变）
    pub fn publish_error(&self, service: &str, error: RegistryError) {
        let mut inner = self.lock();
        if let Some(feeds) = inner.feeds.get_mut(service) {
            feeds.retain(|feed| feed.send(Err(error.clone())));
        }
    }

    /// 设置注册中心是否可达（影响后续的订阅请求）
    pub fn set_reachable(&self, reachable: bool) {
        self.lock().unreachable = !reachable;
    }

    /// 当前实例列表
    pub fn instances(&self, service: &str) -> Vec<RegistryEntry> {
        self.lock().services.get(service).cloned().unwrap_or_default()
    }

    /// 仍然存活的订阅数量
    pub fn subscriber_count(&self, service: &str) -> usize {
        let mut inner = self.lock();
        match inner.feeds.get_mut(service) {
            Some(feeds) => {
                feeds.retain(|feed| !feed.is_closed());
                feeds.len()
            }
            None => 0,
        }
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn subscribe(
        &self,
        service: &str,
        _filter: &InstanceFilter,
    ) -> Result<Subscription, RegistryError> {
        let mut inner = self.lock();
        if inner.unreachable {
            return Err(RegistryError::Unreachable(
                "memory registry is marked unreachable".to_string(),
            ));
        }

        let (feed, subscription) = Subscription::channel(service);
        let current = inner.services.get(service).cloned().unwrap_or_default();
        feed.send(Ok(current));
        inner
            .feeds
            .entry(service.to_string())
            .or_default()
            .push(feed);

        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn subscribers_receive_current_and_later_snapshots() {
        let registry = MemoryRegistry::with_instances("profilesvc", ["a:1"]);
        let mut subscription = registry
            .subscribe("profilesvc", &InstanceFilter::default())
            .await
            .expect("subscribe");

        assert_eq!(
            subscription.next().await,
            Some(Ok(vec![RegistryEntry::new("a:1")]))
        );

        registry.set_instances("profilesvc", vec![RegistryEntry::new("b:1")]);
        assert_eq!(
            subscription.next().await,
            Some(Ok(vec![RegistryEntry::new("b:1")]))
        );
    }

    #[tokio::test]
    async fn unreachable_registry_rejects_subscription() {
        let registry = MemoryRegistry::new();
        registry.set_reachable(false);

        let err = registry
            .subscribe("profilesvc", &InstanceFilter::default())
            .await
            .err();
        assert!(matches!(err, Some(RegistryError::Unreachable(_))));
    }

    #[tokio::test]
    async fn dropped_subscriptions_are_pruned() {
        let registry = MemoryRegistry::new();
        let first = registry
            .subscribe("profilesvc", &InstanceFilter::default())
            .await
            .expect("subscribe");
        let _second = registry
            .subscribe("profilesvc", &InstanceFilter::default())
            .await
            .expect("subscribe");
        assert_eq!(registry.subscriber_count("profilesvc"), 2);

        drop(first);
        assert_eq!(registry.subscriber_count("profilesvc"), 1);
    }
}
