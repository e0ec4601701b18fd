//! profile 服务的 HTTP/JSON 传输
//!
//! 路径相对于 `http://{instance}`，路径段按 URL 规则转义。
//! 非 2xx 响应体形如 `{"error": "..."}`，成功响应体中非空的 `err` 字段同样视为远程错误。

use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::endpoint::{Operation, OperationDescriptor, OperationFactory, OperationHandle};
use crate::error::{ClientError, RemoteError};
use crate::profile::{Address, Profile, ProfileOperation, ProfileRequest, ProfileResponse};

/// HTTP 操作工厂
///
/// 构建句柄时只解析实例地址与方法，不发起网络请求。所有句柄共享同一个
/// 连接池。
#[derive(Clone)]
pub struct HttpOperationFactory {
    client: HttpClient,
}

impl HttpOperationFactory {
    /// 使用默认连接参数创建工厂
    pub fn new() -> Result<Self, ClientError> {
        let client = HttpClient::builder()
            .connect_timeout(Duration::from_secs(2))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| ClientError::config(format!("build http client: {}", e)))?;
        Ok(Self { client })
    }

    /// 使用已有的 HTTP 客户端
    pub fn with_client(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OperationFactory<ProfileRequest, ProfileResponse> for HttpOperationFactory {
    async fn build(
        &self,
        instance: &str,
        descriptor: &OperationDescriptor,
    ) -> Result<OperationHandle<ProfileRequest, ProfileResponse>, ClientError> {
        let operation = ProfileOperation::from_descriptor(descriptor).ok_or_else(|| {
            ClientError::build_failed(descriptor.name(), instance, "unknown profile operation")
        })?;
        let base = base_url(instance)
            .map_err(|reason| ClientError::build_failed(descriptor.name(), instance, reason))?;

        debug!(operation = %operation, instance = %instance, base = %base, "Built http operation");
        Ok(OperationHandle::new(
            instance,
            HttpOperation {
                client: self.client.clone(),
                base,
                operation,
            },
        ))
    }
}

/// 实例地址 -> 基础 URL（缺省 scheme 为 http，丢弃路径与查询）
fn base_url(instance: &str) -> Result<Url, String> {
    let raw = if instance.contains("://") {
        instance.to_string()
    } else {
        format!("http://{}", instance)
    };
    let mut url = Url::parse(&raw).map_err(|e| format!("invalid instance address: {}", e))?;
    if url.cannot_be_a_base() || url.host_str().is_none_or(str::is_empty) {
        return Err("instance address has no host".to_string());
    }
    url.set_path("");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// 绑定到单个实例的 HTTP 操作
struct HttpOperation {
    client: HttpClient,
    base: Url,
    operation: ProfileOperation,
}

impl HttpOperation {
    fn url(&self, segments: &[&str], trailing_slash: bool) -> Result<Url, RemoteError> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| RemoteError::Encode("instance url cannot carry a path".into()))?;
            path.clear().push("profiles").extend(segments);
            if trailing_slash {
                path.push("");
            }
        }
        Ok(url)
    }

    fn encode(
        &self,
        request: &ProfileRequest,
    ) -> Result<(Method, Url, Option<serde_json::Value>), RemoteError> {
        let (method, url, body) = match request {
            ProfileRequest::PostProfile { profile } => {
                (Method::POST, self.url(&[], true)?, Some(to_body(profile)?))
            }
            ProfileRequest::GetProfile { id } => {
                (Method::GET, self.url(&[id.as_str()], false)?, None)
            }
            ProfileRequest::PutProfile { id, profile } => {
                (Method::PUT, self.url(&[id.as_str()], false)?, Some(to_body(profile)?))
            }
            ProfileRequest::PatchProfile { id, profile } => {
                (Method::PATCH, self.url(&[id.as_str()], false)?, Some(to_body(profile)?))
            }
            ProfileRequest::DeleteProfile { id } => {
                (Method::DELETE, self.url(&[id.as_str()], false)?, None)
            }
            ProfileRequest::GetAddresses { profile_id } => (
                Method::GET,
                self.url(&[profile_id.as_str(), "addresses"], true)?,
                None,
            ),
            ProfileRequest::GetAddress {
                profile_id,
                address_id,
            } => (
                Method::GET,
                self.url(&[profile_id.as_str(), "addresses", address_id.as_str()], false)?,
                None,
            ),
            ProfileRequest::PostAddress {
                profile_id,
                address,
            } => (
                Method::POST,
                self.url(&[profile_id.as_str(), "addresses"], true)?,
                Some(to_body(address)?),
            ),
            ProfileRequest::DeleteAddress {
                profile_id,
                address_id,
            } => (
                Method::DELETE,
                self.url(&[profile_id.as_str(), "addresses", address_id.as_str()], false)?,
                None,
            ),
        };
        Ok((method, url, body))
    }
}

fn to_body<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, RemoteError> {
    serde_json::to_value(value).map_err(|e| RemoteError::Encode(e.to_string()))
}

#[async_trait]
impl Operation<ProfileRequest, ProfileResponse> for HttpOperation {
    async fn call(&self, request: ProfileRequest) -> Result<ProfileResponse, RemoteError> {
        if request.operation() != self.operation {
            return Err(RemoteError::Encode(format!(
                "{} request sent to {} endpoint",
                request.operation(),
                self.operation
            )));
        }

        let (method, url, body) = self.encode(&request)?;
        let mut builder = self.client.request(method, url);
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&bytes)
                .ok()
                .map(|body| body.error)
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
            return Err(RemoteError::status(status.as_u16(), message));
        }

        decode_response(self.operation, &bytes)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseEnvelope {
    #[serde(default)]
    profile: Option<Profile>,
    #[serde(default)]
    addresses: Option<Vec<Address>>,
    #[serde(default)]
    address: Option<Address>,
    #[serde(default)]
    err: Option<serde_json::Value>,
}

/// 解码成功响应
fn decode_response(
    operation: ProfileOperation,
    body: &[u8],
) -> Result<ProfileResponse, RemoteError> {
    let envelope: ResponseEnvelope = if body.iter().all(u8::is_ascii_whitespace) {
        ResponseEnvelope::default()
    } else {
        serde_json::from_slice(body)?
    };

    if let Some(message) = envelope.err.as_ref().and_then(error_message) {
        return Err(RemoteError::Application(message));
    }

    match operation {
        ProfileOperation::GetProfile => envelope
            .profile
            .map(ProfileResponse::Profile)
            .ok_or_else(|| RemoteError::Decode("response has no `profile` field".into())),
        ProfileOperation::GetAddresses => Ok(ProfileResponse::Addresses(
            envelope.addresses.unwrap_or_default(),
        )),
        ProfileOperation::GetAddress => envelope
            .address
            .map(ProfileResponse::Address)
            .ok_or_else(|| RemoteError::Decode("response has no `address` field".into())),
        ProfileOperation::PostProfile
        | ProfileOperation::PutProfile
        | ProfileOperation::PatchProfile
        | ProfileOperation::DeleteProfile
        | ProfileOperation::PostAddress
        | ProfileOperation::DeleteAddress => Ok(ProfileResponse::Ack),
    }
}

/// `err` 字段的文本；null、空串与空对象视为无错误
fn error_message(err: &serde_json::Value) -> Option<String> {
    match err {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Object(map) if map.is_empty() => None,
        other => Some(other.to_string()),
    }
}
