//! Profile 服务的领域类型与方法表
//!
//! - [`ProfileService`]：profile 服务的方法面（每个方法对应一个远程操作）
//! - [`client::ProfileClient`]：基于服务发现的实现
//! - [`http::HttpOperationFactory`]：HTTP/JSON 传输（需要 `http` feature）

pub mod client;
#[cfg(feature = "http")]
pub mod http;

pub use client::ProfileClient;
#[cfg(feature = "http")]
pub use http::HttpOperationFactory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::context::CallContext;
use crate::endpoint::OperationDescriptor;
use crate::error::Result;

/// 用户资料
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<Address>,
}

/// 地址
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,
}

/// profile 服务的远程方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileOperation {
    PostProfile,
    GetProfile,
    PutProfile,
    PatchProfile,
    DeleteProfile,
    GetAddresses,
    GetAddress,
    PostAddress,
    DeleteAddress,
}

impl ProfileOperation {
    pub const ALL: [ProfileOperation; 9] = [
        ProfileOperation::PostProfile,
        ProfileOperation::GetProfile,
        ProfileOperation::PutProfile,
        ProfileOperation::PatchProfile,
        ProfileOperation::DeleteProfile,
        ProfileOperation::GetAddresses,
        ProfileOperation::GetAddress,
        ProfileOperation::PostAddress,
        ProfileOperation::DeleteAddress,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            ProfileOperation::PostProfile => "PostProfile",
            ProfileOperation::GetProfile => "GetProfile",
            ProfileOperation::PutProfile => "PutProfile",
            ProfileOperation::PatchProfile => "PatchProfile",
            ProfileOperation::DeleteProfile => "DeleteProfile",
            ProfileOperation::GetAddresses => "GetAddresses",
            ProfileOperation::GetAddress => "GetAddress",
            ProfileOperation::PostAddress => "PostAddress",
            ProfileOperation::DeleteAddress => "DeleteAddress",
        }
    }

    pub const fn descriptor(self) -> OperationDescriptor {
        OperationDescriptor::from_static(self.name())
    }

    pub fn from_descriptor(descriptor: &OperationDescriptor) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.name() == descriptor.name())
    }

    /// 全部方法的描述
    pub fn all_descriptors() -> Vec<OperationDescriptor> {
        Self::ALL.into_iter().map(Self::descriptor).collect()
    }
}

impl fmt::Display for ProfileOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 远程调用请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileRequest {
    PostProfile { profile: Profile },
    GetProfile { id: String },
    PutProfile { id: String, profile: Profile },
    PatchProfile { id: String, profile: Profile },
    DeleteProfile { id: String },
    GetAddresses { profile_id: String },
    GetAddress { profile_id: String, address_id: String },
    PostAddress { profile_id: String, address: Address },
    DeleteAddress { profile_id: String, address_id: String },
}

impl ProfileRequest {
    /// 请求对应的远程方法
    pub fn operation(&self) -> ProfileOperation {
        match self {
            ProfileRequest::PostProfile { .. } => ProfileOperation::PostProfile,
            ProfileRequest::GetProfile { .. } => ProfileOperation::GetProfile,
            ProfileRequest::PutProfile { .. } => ProfileOperation::PutProfile,
            ProfileRequest::PatchProfile { .. } => ProfileOperation::PatchProfile,
            ProfileRequest::DeleteProfile { .. } => ProfileOperation::DeleteProfile,
            ProfileRequest::GetAddresses { .. } => ProfileOperation::GetAddresses,
            ProfileRequest::GetAddress { .. } => ProfileOperation::GetAddress,
            ProfileRequest::PostAddress { .. } => ProfileOperation::PostAddress,
            ProfileRequest::DeleteAddress { .. } => ProfileOperation::DeleteAddress,
        }
    }
}

/// 远程调用响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileResponse {
    /// 无返回数据的成功
    Ack,
    Profile(Profile),
    Addresses(Vec<Address>),
    Address(Address),
}

/// profile 服务方法面
#[async_trait]
pub trait ProfileService: Send + Sync {
    async fn post_profile(&self, ctx: &CallContext, profile: Profile) -> Result<()>;

    async fn get_profile(&self, ctx: &CallContext, id: &str) -> Result<Profile>;

    async fn put_profile(&self, ctx: &CallContext, id: &str, profile: Profile) -> Result<()>;

    async fn patch_profile(&self, ctx: &CallContext, id: &str, profile: Profile) -> Result<()>;

    async fn delete_profile(&self, ctx: &CallContext, id: &str) -> Result<()>;

    async fn get_addresses(&self, ctx: &CallContext, profile_id: &str) -> Result<Vec<Address>>;

    async fn get_address(
        &self,
        ctx: &CallContext,
        profile_id: &str,
        address_id: &str,
    ) -> Result<Address>;

    async fn post_address(&self, ctx: &CallContext, profile_id: &str, address: Address)
    -> Result<()>;

    async fn delete_address(
        &self,
        ctx: &CallContext,
        profile_id: &str,
        address_id: &str,
    ) -> Result<()>;
}
