//! 调用上下文
//!
//! 承载调用方的取消信号，贯穿整个重试调用链

use tokio_util::sync::CancellationToken;

/// 调用上下文
///
/// 克隆后共享同一个取消信号；`child()` 派生的上下文会随父上下文一起取消。
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancellation: CancellationToken,
}

impl CallContext {
    /// 创建不会被外部取消的上下文
    pub fn new() -> Self {
        Self::default()
    }

    /// 基于已有的取消令牌创建上下文
    pub fn from_token(cancellation: CancellationToken) -> Self {
        Self { cancellation }
    }

    /// 派生子上下文
    pub fn child(&self) -> Self {
        Self {
            cancellation: self.cancellation.child_token(),
        }
    }

    /// 取消调用
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// 是否已取消
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// 等待取消信号
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await
    }

    /// 获取底层取消令牌
    pub fn token(&self) -> &CancellationToken {
        &self.cancellation
    }
}
