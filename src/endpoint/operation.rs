//! 操作描述、操作句柄与操作工厂

use async_trait::async_trait;
use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Mutex;

use crate::error::{ClientError, RemoteError};

/// 释放实例资源的回调，每个句柄至多执行一次
pub type ReleaseFn = Box<dyn FnOnce() + Send + 'static>;

/// 远程方法描述（如 "PostProfile"、"GetAddress"）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationDescriptor(Cow<'static, str>);

impl OperationDescriptor {
    /// 使用静态名称创建描述
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// 使用动态名称创建描述
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// 方法名
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for OperationDescriptor {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

/// 绑定到某个实例的可调用单元
///
/// 实现方负责编码请求、发送到实例并解码响应；调用链只把它当作
/// `request -> response` 的不透明函数。
#[async_trait]
pub trait Operation<Req, Resp>: Send + Sync {
    async fn call(&self, request: Req) -> Result<Resp, RemoteError>;
}

/// 以闭包实现的 [`Operation`]
pub struct FnOperation<F>(F);

/// 将异步闭包包装为 [`Operation`]
pub fn operation_fn<Req, Resp, F, Fut>(f: F) -> FnOperation<F>
where
    F: Fn(Req) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Resp, RemoteError>> + Send + 'static,
{
    FnOperation(f)
}

#[async_trait]
impl<Req, Resp, F, Fut> Operation<Req, Resp> for FnOperation<F>
where
    Req: Send + 'static,
    Resp: Send + 'static,
    F: Fn(Req) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Resp, RemoteError>> + Send + 'static,
{
    async fn call(&self, request: Req) -> Result<Resp, RemoteError> {
        (self.0)(request).await
    }
}

/// 操作句柄：一个 (操作描述, 实例) 对的可调用单元
///
/// 持有该实例上的资源，并通过 [`OperationHandle::release`] 释放。
pub struct OperationHandle<Req, Resp> {
    instance: String,
    operation: Box<dyn Operation<Req, Resp>>,
    release: Mutex<Option<ReleaseFn>>,
}

impl<Req, Resp> OperationHandle<Req, Resp> {
    /// 创建绑定到 `instance` 的句柄
    pub fn new<O>(instance: impl Into<String>, operation: O) -> Self
    where
        O: Operation<Req, Resp> + 'static,
    {
        Self {
            instance: instance.into(),
            operation: Box::new(operation),
            release: Mutex::new(None),
        }
    }

    /// 设置释放回调
    pub fn with_release<F>(self, release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            release: Mutex::new(Some(Box::new(release))),
            ..self
        }
    }

    /// 句柄绑定的实例地址
    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// 调用远程操作
    pub async fn call(&self, request: Req) -> Result<Resp, RemoteError> {
        self.operation.call(request).await
    }

    /// 释放实例资源，返回本次调用是否真正执行了释放回调
    pub fn release(&self) -> bool {
        let release = self
            .release
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match release {
            Some(release) => {
                release();
                true
            }
            None => false,
        }
    }
}

impl<Req, Resp> fmt::Debug for OperationHandle<Req, Resp> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationHandle")
            .field("instance", &self.instance)
            .finish_non_exhaustive()
    }
}

/// 操作工厂
///
/// 为给定的实例与操作描述准备可复用的句柄。只做准备工作，不发起远程调用；
/// 失败时调用方不会登记该句柄。
#[async_trait]
pub trait OperationFactory<Req, Resp>: Send + Sync {
    async fn build(
        &self,
        instance: &str,
        descriptor: &OperationDescriptor,
    ) -> Result<OperationHandle<Req, Resp>, ClientError>;
}

/// 以闭包实现的 [`OperationFactory`]
pub struct FactoryFn<F>(F);

/// 将同步构建闭包包装为 [`OperationFactory`]
pub fn factory_fn<Req, Resp, F>(f: F) -> FactoryFn<F>
where
    F: Fn(&str, &OperationDescriptor) -> Result<OperationHandle<Req, Resp>, ClientError>
        + Send
        + Sync,
{
    FactoryFn(f)
}

#[async_trait]
impl<Req, Resp, F> OperationFactory<Req, Resp> for FactoryFn<F>
where
    Req: Send + 'static,
    Resp: Send + 'static,
    F: Fn(&str, &OperationDescriptor) -> Result<OperationHandle<Req, Resp>, ClientError>
        + Send
        + Sync,
{
    async fn build(
        &self,
        instance: &str,
        descriptor: &OperationDescriptor,
    ) -> Result<OperationHandle<Req, Resp>, ClientError> {
        (self.0)(instance, descriptor)
    }
}
