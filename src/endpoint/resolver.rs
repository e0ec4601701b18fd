//! 端点解析
//!
//! 每个操作描述对应一个解析器：消费实例集合变化，为新出现的实例构建句柄，
//! 释放已离开实例的句柄，并以不可变快照的形式发布当前句柄集合。

use arc_swap::ArcSwap;
use futures::{Stream, StreamExt};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::discovery::InstanceSetChange;
use crate::endpoint::operation::{OperationDescriptor, OperationFactory, OperationHandle};

/// 句柄快照：按实例地址排序，读取期间不受后续更新影响
pub type HandleSnapshot<Req, Resp> = Arc<Vec<Arc<OperationHandle<Req, Resp>>>>;

/// 当前句柄集合的来源
pub trait HandleSource<Req, Resp>: Send + Sync {
    fn current_handles(&self) -> HandleSnapshot<Req, Resp>;
}

impl<Req, Resp> HandleSource<Req, Resp> for ArcSwap<Vec<Arc<OperationHandle<Req, Resp>>>>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    fn current_handles(&self) -> HandleSnapshot<Req, Resp> {
        self.load_full()
    }
}

/// 解析器状态：实例地址 -> 句柄
///
/// 每个实例至多一个句柄；条目中的实例都属于最近一次应用的实例集合。
pub struct ResolverState<Req, Resp> {
    descriptor: OperationDescriptor,
    handles: BTreeMap<String, Arc<OperationHandle<Req, Resp>>>,
}

impl<Req, Resp> ResolverState<Req, Resp> {
    pub fn new(descriptor: OperationDescriptor) -> Self {
        Self {
            descriptor,
            handles: BTreeMap::new(),
        }
    }

    /// 应用一次实例集合变化
    ///
    /// 先释放离开的实例，再为新实例构建句柄；构建失败只记录日志并跳过该实例，
    /// 下一次变化中它仍是新实例，会再次尝试。重复应用同一变化没有额外效果。
    pub async fn apply(
        &mut self,
        change: &InstanceSetChange,
        factory: &dyn OperationFactory<Req, Resp>,
    ) {
        let departed: Vec<String> = self
            .handles
            .keys()
            .filter(|instance| !change.contains(instance))
            .cloned()
            .collect();
        for instance in departed {
            if let Some(handle) = self.handles.remove(&instance) {
                handle.release();
                info!(
                    operation = %self.descriptor,
                    instance = %instance,
                    "Removed endpoint handle"
                );
            }
        }

        for instance in &change.instances {
            if self.handles.contains_key(instance) {
                continue;
            }
            match factory.build(instance, &self.descriptor).await {
                Ok(handle) => {
                    info!(
                        operation = %self.descriptor,
                        instance = %instance,
                        "Added endpoint handle"
                    );
                    self.handles.insert(instance.clone(), Arc::new(handle));
                }
                Err(e) => {
                    warn!(
                        operation = %self.descriptor,
                        instance = %instance,
                        error = %e,
                        "Failed to build endpoint handle, skipping instance"
                    );
                }
            }
        }
    }

    /// 当前句柄的有序快照
    pub fn snapshot(&self) -> Vec<Arc<OperationHandle<Req, Resp>>> {
        self.handles.values().cloned().collect()
    }

    /// 当前持有句柄的实例
    pub fn instances(&self) -> Vec<String> {
        self.handles.keys().cloned().collect()
    }

    /// 释放全部句柄
    pub fn release_all(&mut self) {
        for (_, handle) in std::mem::take(&mut self.handles) {
            handle.release();
        }
    }
}

/// 端点解析器
///
/// 后台任务独占写入句柄集合，读取方通过 [`EndpointResolver::current_handles`]
/// 获得快照，互不阻塞。关闭或丢弃解析器会停止后台任务、释放全部句柄，
/// 并丢弃变化流（从而取消注册中心订阅）。
pub struct EndpointResolver<Req, Resp> {
    descriptor: OperationDescriptor,
    handles: Arc<ArcSwap<Vec<Arc<OperationHandle<Req, Resp>>>>>,
    shutdown: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<Req, Resp> EndpointResolver<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    /// 启动解析器，后台应用全部实例集合变化
    pub fn spawn<S>(
        descriptor: OperationDescriptor,
        changes: S,
        factory: Arc<dyn OperationFactory<Req, Resp>>,
    ) -> Self
    where
        S: Stream<Item = InstanceSetChange> + Send + Unpin + 'static,
    {
        let state = ResolverState::new(descriptor.clone());
        Self::spawn_with_state(descriptor, changes, factory, state, false)
    }

    /// 启动解析器，先同步应用第一次实例集合
    ///
    /// 最多等待 `initial_wait`：期间收到第一次实例集合时，返回的句柄快照已反映
    /// 注册中心的初始实例；超时则以空快照启动，后续变化由后台任务应用。
    pub async fn start<S>(
        descriptor: OperationDescriptor,
        mut changes: S,
        factory: Arc<dyn OperationFactory<Req, Resp>>,
        initial_wait: Duration,
    ) -> Self
    where
        S: Stream<Item = InstanceSetChange> + Send + Unpin + 'static,
    {
        let mut state = ResolverState::new(descriptor.clone());
        let ended = match time::timeout(initial_wait, changes.next()).await {
            Ok(Some(change)) => {
                state.apply(&change, factory.as_ref()).await;
                false
            }
            Ok(None) => true,
            Err(_) => {
                warn!(
                    operation = %descriptor,
                    wait_ms = initial_wait.as_millis() as u64,
                    "No initial instance set received, starting without endpoints"
                );
                false
            }
        };
        Self::spawn_with_state(descriptor, changes, factory, state, ended)
    }

    fn spawn_with_state<S>(
        descriptor: OperationDescriptor,
        changes: S,
        factory: Arc<dyn OperationFactory<Req, Resp>>,
        state: ResolverState<Req, Resp>,
        ended: bool,
    ) -> Self
    where
        S: Stream<Item = InstanceSetChange> + Send + Unpin + 'static,
    {
        let handles = Arc::new(ArcSwap::from_pointee(state.snapshot()));
        let shutdown = CancellationToken::new();

        let task = tokio::spawn(Self::run(
            changes,
            factory,
            state,
            ended,
            handles.clone(),
            shutdown.clone(),
        ));

        Self {
            descriptor,
            handles,
            shutdown,
            task: Mutex::new(Some(task)),
        }
    }

    async fn run<S>(
        mut changes: S,
        factory: Arc<dyn OperationFactory<Req, Resp>>,
        mut state: ResolverState<Req, Resp>,
        mut ended: bool,
        handles: Arc<ArcSwap<Vec<Arc<OperationHandle<Req, Resp>>>>>,
        shutdown: CancellationToken,
    ) where
        S: Stream<Item = InstanceSetChange> + Send + Unpin + 'static,
    {
        let descriptor = state.descriptor.clone();

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                change = changes.next(), if !ended => match change {
                    Some(change) => {
                        state.apply(&change, factory.as_ref()).await;
                        handles.store(Arc::new(state.snapshot()));
                        debug!(
                            operation = %descriptor,
                            handles = state.handles.len(),
                            "Published endpoint snapshot"
                        );
                    }
                    None => {
                        // 变化流结束后保留现有句柄，直到解析器关闭
                        warn!(
                            operation = %descriptor,
                            "Instance change stream ended, keeping current endpoints"
                        );
                        ended = true;
                    }
                },
            }
        }

        drop(changes);
        handles.store(Arc::new(Vec::new()));
        state.release_all();
        debug!(operation = %descriptor, "Endpoint resolver stopped");
    }

    /// 操作描述
    pub fn descriptor(&self) -> &OperationDescriptor {
        &self.descriptor
    }

    /// 当前句柄快照
    pub fn current_handles(&self) -> HandleSnapshot<Req, Resp> {
        self.handles.load_full()
    }

    /// 关闭解析器并等待全部句柄释放
    pub async fn close(&self) {
        self.shutdown.cancel();
        let task = self
            .task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(operation = %self.descriptor, error = %e, "Endpoint resolver task failed");
            }
        }
    }
}

impl<Req, Resp> HandleSource<Req, Resp> for EndpointResolver<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    fn current_handles(&self) -> HandleSnapshot<Req, Resp> {
        self.handles.load_full()
    }
}

impl<Req, Resp> Drop for EndpointResolver<Req, Resp> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::operation::{factory_fn, operation_fn};
    use crate::error::ClientError;
    use std::collections::HashMap;
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::UnboundedReceiverStream;

    type Releases = Arc<Mutex<HashMap<String, usize>>>;

    /// 记录每个实例释放次数的工厂；地址为 "bad:*" 时构建失败
    fn recording_factory(
        releases: Releases,
    ) -> impl OperationFactory<String, String> + 'static {
        factory_fn(move |instance: &str, descriptor: &OperationDescriptor| {
            if instance.starts_with("bad:") {
                return Err(ClientError::build_failed(
                    descriptor.name(),
                    instance,
                    "malformed address",
                ));
            }
            let name = instance.to_string();
            let releases = releases.clone();
            let released = name.clone();
            Ok(OperationHandle::new(
                instance,
                operation_fn(move |req: String| {
                    let name = name.clone();
                    async move { Ok(format!("{}:{}", name, req)) }
                }),
            )
            .with_release(move || {
                *releases
                    .lock()
                    .unwrap()
                    .entry(released)
                    .or_insert(0) += 1;
            }))
        })
    }

    fn change(instances: &[&str]) -> InstanceSetChange {
        instances.iter().copied().collect()
    }

    fn instances_of(snapshot: &HandleSnapshot<String, String>) -> Vec<String> {
        snapshot.iter().map(|h| h.instance().to_string()).collect()
    }

    #[tokio::test]
    async fn state_converges_and_releases_departed_once() {
        let releases = Releases::default();
        let factory = recording_factory(releases.clone());
        let mut state = ResolverState::new(OperationDescriptor::from_static("GetProfile"));

        state.apply(&change(&["a:1", "b:1"]), &factory).await;
        assert_eq!(state.instances(), vec!["a:1", "b:1"]);

        state.apply(&change(&["b:1", "c:1"]), &factory).await;
        assert_eq!(state.instances(), vec!["b:1", "c:1"]);
        assert_eq!(releases.lock().unwrap().get("a:1"), Some(&1));

        // 重放同一变化：无重复句柄、无重复释放
        state.apply(&change(&["b:1", "c:1"]), &factory).await;
        assert_eq!(state.snapshot().len(), 2);
        assert_eq!(releases.lock().unwrap().get("a:1"), Some(&1));
        assert_eq!(releases.lock().unwrap().len(), 1);

        state.release_all();
        assert!(state.instances().is_empty());
        assert_eq!(releases.lock().unwrap().get("b:1"), Some(&1));
        assert_eq!(releases.lock().unwrap().get("c:1"), Some(&1));
    }

    #[tokio::test]
    async fn build_failures_skip_the_instance() {
        let factory = recording_factory(Releases::default());
        let mut state = ResolverState::new(OperationDescriptor::from_static("GetProfile"));

        state.apply(&change(&["a:1", "bad:1"]), &factory).await;
        assert_eq!(state.instances(), vec!["a:1"]);
    }

    #[tokio::test]
    async fn resolver_publishes_snapshots_and_releases_on_close() {
        let releases = Releases::default();
        let (tx, rx) = mpsc::unbounded_channel();
        let resolver = EndpointResolver::spawn(
            OperationDescriptor::from_static("GetProfile"),
            UnboundedReceiverStream::new(rx),
            Arc::new(recording_factory(releases.clone())),
        );
        assert!(resolver.current_handles().is_empty());

        let before = resolver.current_handles();
        tx.send(change(&["a:1", "b:1"])).unwrap();
        while resolver.current_handles().len() != 2 {
            tokio::task::yield_now().await;
        }
        assert_eq!(
            instances_of(&resolver.current_handles()),
            vec!["a:1", "b:1"]
        );
        // 旧快照不受更新影响
        assert!(before.is_empty());

        tx.send(change(&["b:1"])).unwrap();
        while resolver.current_handles().len() != 1 {
            tokio::task::yield_now().await;
        }
        assert_eq!(instances_of(&resolver.current_handles()), vec!["b:1"]);
        assert_eq!(releases.lock().unwrap().get("a:1"), Some(&1));

        resolver.close().await;
        assert!(resolver.current_handles().is_empty());
        assert_eq!(releases.lock().unwrap().get("b:1"), Some(&1));
        assert!(tx.is_closed());
    }

    #[tokio::test]
    async fn start_applies_first_change_before_returning() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(change(&["a:1", "b:1"])).unwrap();
        let resolver = EndpointResolver::start(
            OperationDescriptor::from_static("GetProfile"),
            UnboundedReceiverStream::new(rx),
            Arc::new(recording_factory(Releases::default())),
            Duration::from_secs(1),
        )
        .await;

        assert_eq!(
            instances_of(&resolver.current_handles()),
            vec!["a:1", "b:1"]
        );
        resolver.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn start_without_initial_change_begins_empty() {
        let (tx, rx) = mpsc::unbounded_channel();
        let resolver = EndpointResolver::start(
            OperationDescriptor::from_static("GetProfile"),
            UnboundedReceiverStream::new(rx),
            Arc::new(recording_factory(Releases::default())),
            Duration::from_millis(200),
        )
        .await;
        assert!(resolver.current_handles().is_empty());

        // 之后到达的变化仍由后台任务应用
        tx.send(change(&["a:1"])).unwrap();
        while resolver.current_handles().is_empty() {
            tokio::task::yield_now().await;
        }
        assert_eq!(instances_of(&resolver.current_handles()), vec!["a:1"]);
        resolver.close().await;
    }

    #[tokio::test]
    async fn handles_survive_end_of_change_stream() {
        let (tx, rx) = mpsc::unbounded_channel();
        let resolver = EndpointResolver::spawn(
            OperationDescriptor::from_static("GetProfile"),
            UnboundedReceiverStream::new(rx),
            Arc::new(recording_factory(Releases::default())),
        );

        tx.send(change(&["a:1"])).unwrap();
        drop(tx);
        while resolver.current_handles().is_empty() {
            tokio::task::yield_now().await;
        }
        tokio::task::yield_now().await;
        assert_eq!(instances_of(&resolver.current_handles()), vec!["a:1"]);

        resolver.close().await;
    }
}
