use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::RegistryResult;
use crate::model::RegistrationManifest;

/// 拓扑拉取请求的定位参数。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RegistrySelector {
    pub service_name: String,
    pub env_code: String,
    pub service_type: String,
}

impl RegistrySelector {
    pub fn new(
        service_name: impl Into<String>,
        env_code: impl Into<String>,
        service_type: impl Into<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            env_code: env_code.into(),
            service_type: service_type.into(),
        }
    }
}

impl fmt::Display for RegistrySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{} ({})",
            self.service_name, self.env_code, self.service_type
        )
    }
}

/// 传输层返回的未解析快照数据（信封中的 `data` 节点）。
#[derive(Clone, Debug, PartialEq)]
pub struct RawSnapshot(Value);

impl RawSnapshot {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl From<Value> for RawSnapshot {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// 注册请求的应答（信封中的 `data` 节点，内容由注册中心决定）。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegistrationAck(pub Value);

/// 注册中心传输契约。
///
/// # 教案式说明
/// - **意图 (Why)**：核心缓存与调度器只依赖这一抽象，HTTP 之外的实现（测试替身、
///   其他协议）可以无缝替换。
/// - **契约 (What)**：
///   - `fetch`：按选择器拉取一份完整快照；任何失败（网络、非 2xx、信封报错、
///     `result != true`）统一返回 [`crate::RegistryError::Transport`]；
///   - `register`：提交手动部署清单，失败语义与 `fetch` 相同；
///   - 实现需 `Send + Sync + 'static`，以便由后台任务持有。
/// - **风险提示 (Trade-offs)**：实现自行决定超时；调度器不会为单次拉取额外设限，
///   过长的超时会推迟下一轮刷新。
#[async_trait]
pub trait RegistryTransport: Send + Sync + 'static {
    async fn fetch(&self, selector: &RegistrySelector) -> RegistryResult<RawSnapshot>;

    async fn register(&self, manifest: &RegistrationManifest) -> RegistryResult<RegistrationAck>;
}
