use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RegistryError, RegistryResult};
use crate::transport::RawSnapshot;

/// 未配置 `autoReloadRegistry` 时使用的刷新周期（毫秒）。
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 3_600_000;

/// 注册中心下发的一份完整拓扑快照。
///
/// # 教案式说明
/// - **意图 (Why)**：请求路径上的查询只读内存，快照作为不可变值在读者之间共享，
///   后台刷新只会构造新快照并整体替换，从不原地修改。
/// - **契约 (What)**：
///   - `name`、`environment`、`timeLoaded`、`serviceConfig` 为必填字段，缺失即视为格式错误；
///   - 各映射字段缺省为空；
///   - `service_type` 不来自注册中心，由管理器在发布前写入。
/// - **设计取舍 (Trade-offs)**：映射统一采用 [`BTreeMap`]，遍历顺序稳定，
///   `resource` 查询“首个命中”的结果因此可复现。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub name: String,
    pub environment: String,
    #[serde(rename = "timeLoaded")]
    pub loaded_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,
    #[serde(rename = "coreDB", default)]
    pub core_dbs: BTreeMap<String, Database>,
    #[serde(rename = "tenantMetaDB", default)]
    pub tenant_dbs: BTreeMap<String, Database>,
    #[serde(default)]
    pub services: BTreeMap<String, ServiceEntry>,
    #[serde(default)]
    pub resources: BTreeMap<String, BTreeMap<String, Resource>>,
    #[serde(default)]
    pub custom: BTreeMap<String, CustomEntry>,
    #[serde(rename = "serviceConfig")]
    pub service_config: ServiceConfig,
}

impl RegistrySnapshot {
    /// 将传输层返回的原始数据解析为快照。
    pub fn from_raw(raw: RawSnapshot) -> RegistryResult<Self> {
        serde_json::from_value(raw.into_inner())
            .map_err(|err| RegistryError::MalformedSnapshot(err.to_string()))
    }

    /// 写入服务类型并返回自身，供构造链使用。
    #[must_use]
    pub fn with_service_type(mut self, service_type: impl Into<String>) -> Self {
        self.service_type = Some(service_type.into());
        self
    }

    /// 刷新周期提示（毫秒），缺失或为 0 时取默认值。
    pub fn refresh_interval_ms(&self) -> u64 {
        self.service_config
            .awareness
            .auto_reload_registry
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_REFRESH_INTERVAL_MS)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbHost {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryLocation {
    pub l1: String,
    pub l2: String,
    pub env: String,
}

/// 数据库连接描述。
///
/// 会话库额外携带 `store`/`collection`/`stringify`/`expireAfter`。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    pub cluster: String,
    #[serde(default)]
    pub servers: Vec<DbHost>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streaming: Option<Value>,
    #[serde(
        rename = "registryLocation",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub registry_location: Option<RegistryLocation>,
    #[serde(rename = "URLParam", default, skip_serializing_if = "Option::is_none")]
    pub url_param: Option<Value>,
    #[serde(rename = "extraParam", default, skip_serializing_if = "Option::is_none")]
    pub extra_param: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stringify: Option<bool>,
    #[serde(rename = "expireAfter", default, skip_serializing_if = "Option::is_none")]
    pub expire_after: Option<i64>,
}

/// 拓扑中登记的对端服务。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub group: String,
    pub port: u16,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub category: String,
    pub created: String,
    pub author: String,
    pub locked: bool,
    pub plugged: bool,
    pub shared: bool,
    #[serde(default)]
    pub config: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomEntry {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub locked: bool,
    pub plugged: bool,
    pub shared: bool,
    #[serde(default)]
    pub value: Value,
    pub created: String,
    pub author: String,
}

/// 注册中心下发给本服务的运行参数。
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub awareness: AwarenessIntervals,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<ServicePorts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<ServiceKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logger: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<Value>,
}

/// 感知相关的周期参数，单位均为毫秒。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwarenessIntervals {
    #[serde(rename = "cacheTTL", default, skip_serializing_if = "Option::is_none")]
    pub cache_ttl: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check_interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_reload_registry: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_log_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_register_service: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePorts {
    pub controller: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_inc: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_inc: Option<u16>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceKey {
    pub algorithm: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_minimal_payload_with_defaults() {
        let raw = RawSnapshot::new(json!({
            "timeLoaded": 1_700_000_000_000_i64,
            "name": "orders",
            "environment": "dev",
            "serviceConfig": { "awareness": {} }
        }));
        let snapshot = RegistrySnapshot::from_raw(raw).expect("最小快照应可解析");
        assert!(snapshot.core_dbs.is_empty());
        assert!(snapshot.custom.is_empty());
        assert_eq!(snapshot.refresh_interval_ms(), DEFAULT_REFRESH_INTERVAL_MS);
    }

    #[test]
    fn missing_service_config_is_malformed() {
        let raw = RawSnapshot::new(json!({
            "timeLoaded": 1,
            "name": "orders",
            "environment": "dev"
        }));
        let err = RegistrySnapshot::from_raw(raw).unwrap_err();
        assert!(matches!(err, RegistryError::MalformedSnapshot(_)));
    }

    #[test]
    fn reads_refresh_hint_and_database_aliases() {
        let raw = RawSnapshot::new(json!({
            "timeLoaded": 1,
            "name": "orders",
            "environment": "dev",
            "serviceConfig": { "awareness": { "autoReloadRegistry": 5000 } },
            "coreDB": {
                "session": {
                    "name": "core_session",
                    "cluster": "c1",
                    "servers": [{ "host": "db", "port": 27017 }],
                    "registryLocation": { "l1": "coreDB", "l2": "session", "env": "dev" },
                    "expireAfter": 1_209_600_000_i64
                }
            }
        }));
        let snapshot = RegistrySnapshot::from_raw(raw).unwrap();
        assert_eq!(snapshot.refresh_interval_ms(), 5000);
        let session = &snapshot.core_dbs["session"];
        assert_eq!(session.expire_after, Some(1_209_600_000));
        assert_eq!(
            session.registry_location.as_ref().map(|loc| loc.l2.as_str()),
            Some("session")
        );
    }
}
