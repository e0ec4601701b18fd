//! 错误处理模块
//!
//! 提供统一的错误分类、错误代码以及外部错误类型的转换

pub mod client_error;
pub mod code;
pub mod conversions;
pub mod remote_error;

// 重新导出公共类型
pub use client_error::{ClientError, Result};
pub use code::{ErrorCategory, ErrorCode};
pub use remote_error::{RegistryError, RemoteError};

