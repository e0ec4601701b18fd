//! 端点层：操作句柄的构建与按实例维护
//!
//! - [`operation`]：操作描述、句柄与工厂
//! - [`resolver`]：根据实例集合变化维护每个操作的句柄集合

pub mod operation;
pub mod resolver;

pub use operation::{
    FactoryFn, FnOperation, Operation, OperationDescriptor, OperationFactory, OperationHandle,
    ReleaseFn, factory_fn, operation_fn,
};
pub use resolver::{EndpointResolver, HandleSnapshot, HandleSource, ResolverState};
