//! # soajs-transport-http
//!
//! ## 定位与职责（Why）
//! - 以 HTTP 实现 [`soajs_core::RegistryTransport`]：`GET /getRegistry` 拉取拓扑，
//!   `POST /register` 提交手动部署清单；
//! - 统一解码注册中心的应答信封，把各种失败折叠为一个 [`RegistryError::Transport`]。
//!
//! ## 信封格式（What）
//! ```json
//! { "result": true, "data": { ... }, "errors": { "details": [{ "code": 154, "message": "..." }] } }
//! ```
//! - 非 2xx、`errors.details[0]` 存在、`result` 不为 `true` 均视为失败；
//! - 成功时返回 `data`，缺失时为空对象。

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use soajs_core::{
    EnvironmentConfig, RawSnapshot, RegistrationAck, RegistrationManifest, RegistryEndpoint,
    RegistryError, RegistryResult, RegistrySelector, RegistryTransport,
};
use tracing::debug;

/// 单次请求的默认超时。
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const GET_REGISTRY_PATH: &str = "/getRegistry";
const REGISTER_PATH: &str = "/register";

/// 注册中心的基础地址（`http://host:port`）。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryAddress {
    endpoint: RegistryEndpoint,
}

impl RegistryAddress {
    /// 解析 `host:port`，端口必须为整数。
    pub fn parse(raw: &str) -> RegistryResult<Self> {
        RegistryEndpoint::parse(raw).map(Self::from)
    }

    /// 取自 `SOAJS_REGISTRY_API`；未设置时报错。
    pub fn from_environment(env: &EnvironmentConfig) -> RegistryResult<Self> {
        env.require_registry_api().cloned().map(Self::from)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.endpoint.authority())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url())
    }
}

impl From<RegistryEndpoint> for RegistryAddress {
    fn from(endpoint: RegistryEndpoint) -> Self {
        Self { endpoint }
    }
}

/// 基于 `reqwest` 的注册中心传输。
#[derive(Clone, Debug)]
pub struct HttpRegistryTransport {
    client: reqwest::Client,
    address: RegistryAddress,
}

impl HttpRegistryTransport {
    /// 使用默认 30 秒超时构造。
    pub fn new(address: RegistryAddress) -> RegistryResult<Self> {
        Self::with_timeout(address, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(address: RegistryAddress, timeout: Duration) -> RegistryResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| RegistryError::transport(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client, address })
    }

    /// 由进程环境变量构造。
    pub fn from_env() -> RegistryResult<Self> {
        let env = EnvironmentConfig::from_env()?;
        Self::new(RegistryAddress::from_environment(&env)?)
    }

    pub fn address(&self) -> &RegistryAddress {
        &self.address
    }

    async fn read(response: reqwest::Response) -> RegistryResult<Value> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| RegistryError::transport(format!("failed to read response body: {err}")))?;
        decode_envelope(status, &body)
    }
}

#[async_trait]
impl RegistryTransport for HttpRegistryTransport {
    async fn fetch(&self, selector: &RegistrySelector) -> RegistryResult<RawSnapshot> {
        let url = self.address.url(GET_REGISTRY_PATH);
        debug!(registry.selector = %selector, %url, "fetching registry");
        let response = self
            .client
            .get(&url)
            .query(&[
                ("env", selector.env_code.as_str()),
                ("serviceName", selector.service_name.as_str()),
                ("type", selector.service_type.as_str()),
            ])
            .send()
            .await
            .map_err(|err| RegistryError::transport(format!("failed to fetch registry: {err}")))?;
        Self::read(response).await.map(RawSnapshot::new)
    }

    async fn register(&self, manifest: &RegistrationManifest) -> RegistryResult<RegistrationAck> {
        let url = self.address.url(REGISTER_PATH);
        debug!(service.name = %manifest.name, %url, "registering service");
        let response = self
            .client
            .post(&url)
            .json(manifest)
            .send()
            .await
            .map_err(|err| RegistryError::transport(format!("failed to register service: {err}")))?;
        Self::read(response).await.map(RegistrationAck)
    }
}

/// 解码应答信封，成功时返回 `data`。
pub fn decode_envelope(status: u16, body: &str) -> RegistryResult<Value> {
    if !(200..300).contains(&status) {
        return Err(RegistryError::transport(format!(
            "non 2xx status code: {status} {body}"
        )));
    }

    let envelope: Value = serde_json::from_str(body)
        .map_err(|err| RegistryError::transport(format!("failed to decode JSON response: {err}")))?;

    if let Some(detail) = envelope
        .pointer("/errors/details")
        .and_then(Value::as_array)
        .and_then(|details| details.first())
    {
        return Err(RegistryError::upstream(
            scalar_text(detail.get("code")),
            scalar_text(detail.get("message")),
        ));
    }

    if envelope.get("result").and_then(Value::as_bool) != Some(true) {
        return Err(RegistryError::transport("negative result from registry"));
    }

    Ok(match envelope.get("data") {
        Some(Value::Null) | None => Value::Object(Map::new()),
        Some(data) => data.clone(),
    })
}

/// 错误码可能是数字也可能是字符串。
fn scalar_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
