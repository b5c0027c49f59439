use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 租户的访问密钥材料。
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TenantKey {
    #[serde(default)]
    pub config: Map<String, Value>,
    #[serde(rename = "iKey", default)]
    pub internal: Option<String>,
    #[serde(rename = "eKey", default)]
    pub external: Option<String>,
}

/// 租户所使用的应用及其 ACL。
///
/// `package_acl`/`package_acl_all_env` 来自上下文头中独立的 `package` 节点，
/// 解析时被合并进应用。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub product: String,
    pub package: String,
    #[serde(rename = "appId", default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub acl: Option<Value>,
    #[serde(default)]
    pub acl_all_env: Option<Value>,
    #[serde(default)]
    pub package_acl: Map<String, Value>,
    #[serde(default)]
    pub package_acl_all_env: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantMain {
    pub id: String,
    pub code: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub code: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub key: TenantKey,
    #[serde(default)]
    pub roaming: Option<Value>,
    #[serde(default)]
    pub application: Option<Application>,
    #[serde(default)]
    pub profile: Option<Value>,
    #[serde(default)]
    pub main: Option<TenantMain>,
}

/// 已认证用户记录（URAC）。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    #[serde(rename = "firstName", default)]
    pub first_name: Option<String>,
    #[serde(rename = "lastName", default)]
    pub last_name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(rename = "socialLogin", default)]
    pub social_login: Option<Value>,
    #[serde(default)]
    pub tenant: Option<Tenant>,
    #[serde(default)]
    pub profile: Option<Value>,
    #[serde(default)]
    pub acl: Option<Value>,
    #[serde(rename = "acl_AllEnv", default)]
    pub acl_all_env: Option<Value>,
}

/// 调用方通告的一个可直连对端。
///
/// `latest` 标记该服务当前最新部署的版本；当 `version == latest` 时，
/// 这条记录代表“最新版”。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterconnectEntry {
    pub name: String,
    pub version: String,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub latest: Option<String>,
}

impl InterconnectEntry {
    /// 是否为该服务最新部署的版本。
    pub fn is_latest(&self) -> bool {
        self.latest.as_deref() == Some(self.version.as_str())
    }
}

/// 网关地址与可直连对端列表。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Awareness {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    #[serde(rename = "interConnect", default)]
    pub interconnect: Vec<InterconnectEntry>,
}

/// 单个入站请求携带的上下文。
///
/// # 教案式说明
/// - **意图 (Why)**：在框架边界一次性解析，之后以不可变值显式传给连接器与业务处理器，
///   核心逻辑不触碰任何框架私有的请求存储。
/// - **契约 (What)**：生命周期与请求一致；`services_config` 与 `tenant.key.config` 同源。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    pub tenant: Tenant,
    #[serde(default)]
    pub urac: Option<UserRecord>,
    #[serde(default)]
    pub services_config: Map<String, Value>,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub geo: Option<BTreeMap<String, String>>,
    pub awareness: Awareness,
}
