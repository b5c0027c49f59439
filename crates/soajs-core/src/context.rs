//! 入站请求上下文的提取。
//!
//! # 教案式说明
//! - **意图 (Why)**：网关把租户、密钥、ACL 与网格感知数据编码进一个 JSON 请求头；
//!   框架适配层只需交出原始头部，解析与合并规则全部集中在这里，保持纯数据变换。
//! - **逻辑 (How)**：
//!   1. 按名称大小写不敏感地查找 [`INJECT_HEADER`]；
//!   2. 反序列化为线上信封结构，`key` 合并进租户，`package` 的 ACL 合并进应用；
//!   3. `services_config` 取自 `key.config`。
//! - **契约 (What)**：头部缺失、为空、`null` 或 `{}` 时返回 [`ContextError::Absent`]；
//!   无法解析时返回 [`ContextError::Malformed`] 并记一条 warn 日志。
//!   两种情况都只表示“本次请求没有上下文”，调用方不应据此让请求失败。

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::ContextError;
use crate::model::{Application, Awareness, RequestContext, Tenant, TenantKey, UserRecord};

/// 携带请求上下文的头部名称（小写）。
pub const INJECT_HEADER: &str = "soajsinjectobj";

#[derive(Debug, Default, Deserialize)]
struct PackageAcl {
    #[serde(default)]
    acl: Option<Map<String, Value>>,
    #[serde(default)]
    acl_all_env: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct InjectEnvelope {
    tenant: Tenant,
    #[serde(default)]
    key: Option<TenantKey>,
    #[serde(default)]
    application: Option<Map<String, Value>>,
    #[serde(default)]
    package: Option<PackageAcl>,
    #[serde(default)]
    awareness: Option<Awareness>,
    #[serde(default)]
    urac: Option<UserRecord>,
    #[serde(default)]
    device: Option<String>,
    #[serde(default)]
    geo: Option<BTreeMap<String, String>>,
}

impl InjectEnvelope {
    fn into_context(self) -> Result<RequestContext, serde_json::Error> {
        let mut tenant = self.tenant;
        let key = self.key.unwrap_or_default();
        let services_config = key.config.clone();
        tenant.key = key;

        if let Some(mut application) = self.application.filter(|app| !app.is_empty()) {
            let package = self.package.unwrap_or_default();
            application.insert(
                "package_acl".to_owned(),
                Value::Object(package.acl.unwrap_or_default()),
            );
            application.insert(
                "package_acl_all_env".to_owned(),
                Value::Object(package.acl_all_env.unwrap_or_default()),
            );
            tenant.application = Some(serde_json::from_value::<Application>(Value::Object(
                application,
            ))?);
        }

        Ok(RequestContext {
            tenant,
            urac: self.urac,
            services_config,
            device: self.device,
            geo: self.geo,
            awareness: self.awareness.unwrap_or_default(),
        })
    }
}

impl RequestContext {
    /// 从头部集合中提取上下文，头部名称比较忽略大小写。
    pub fn from_headers<'a, I>(headers: I) -> Result<Self, ContextError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let value = headers
            .into_iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(INJECT_HEADER))
            .map(|(_, value)| value)
            .ok_or(ContextError::Absent)?;
        Self::from_header_value(value)
    }

    /// 解析单个头部值。
    pub fn from_header_value(raw: &str) -> Result<Self, ContextError> {
        if raw.trim().is_empty() {
            return Err(ContextError::Absent);
        }
        let parsed = serde_json::from_str::<Value>(raw)
            .map_err(|err| malformed(err.to_string()))?;
        let is_empty = match &parsed {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        };
        if is_empty {
            return Err(ContextError::Absent);
        }
        serde_json::from_value::<InjectEnvelope>(parsed)
            .and_then(InjectEnvelope::into_context)
            .map_err(|err| malformed(err.to_string()))
    }
}

fn malformed(message: String) -> ContextError {
    warn!(
        error.message = %message,
        "failed to parse {INJECT_HEADER} header; continuing without request context"
    );
    ContextError::Malformed(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn header() -> Value {
        json!({
            "tenant": { "id": "t1", "code": "TNT1", "main": { "id": "m1", "code": "MAIN" } },
            "key": { "iKey": "ik", "eKey": "ek", "config": { "orders": { "limit": 5 } } },
            "application": { "product": "PROD", "package": "PROD_BASIC", "appId": "a1" },
            "package": { "acl": { "orders": { "access": true } } },
            "awareness": {
                "host": "gateway", "port": 4000,
                "interConnect": [
                    { "name": "payments", "version": "2", "latest": "2", "host": "10.0.0.5", "port": 4010 }
                ]
            },
            "device": "mobile",
            "geo": { "ip": "1.2.3.4" }
        })
    }

    #[test]
    fn merges_key_and_package_acl() {
        let ctx = RequestContext::from_header_value(&header().to_string()).unwrap();
        assert_eq!(ctx.tenant.code, "TNT1");
        assert_eq!(ctx.tenant.key.external.as_deref(), Some("ek"));
        assert_eq!(ctx.services_config["orders"]["limit"], json!(5));
        let app = ctx.tenant.application.as_ref().unwrap();
        assert_eq!(app.package_acl["orders"]["access"], json!(true));
        assert!(app.package_acl_all_env.is_empty());
        assert_eq!(ctx.awareness.interconnect.len(), 1);
        assert!(ctx.awareness.interconnect[0].is_latest());
        assert_eq!(ctx.device.as_deref(), Some("mobile"));
        assert!(ctx.urac.is_none());
    }

    #[test]
    fn header_name_is_case_insensitive() {
        let raw = header().to_string();
        let headers = [("Content-Type", "application/json"), ("SoajsInjectObj", raw.as_str())];
        assert!(RequestContext::from_headers(headers).is_ok());
    }

    #[test]
    fn missing_or_empty_header_is_absent() {
        let headers: [(&str, &str); 1] = [("accept", "*/*")];
        assert_eq!(
            RequestContext::from_headers(headers).unwrap_err(),
            ContextError::Absent
        );
        for raw in ["", "  ", "null", "{}"] {
            assert_eq!(
                RequestContext::from_header_value(raw).unwrap_err(),
                ContextError::Absent
            );
        }
    }

    #[test]
    fn empty_application_is_ignored() {
        let mut value = header();
        value["application"] = json!({});
        let ctx = RequestContext::from_header_value(&value.to_string()).unwrap();
        assert!(ctx.tenant.application.is_none());
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            RequestContext::from_header_value("{not json"),
            Err(ContextError::Malformed(_))
        ));
        let missing_tenant = json!({ "key": { "eKey": "ek" } }).to_string();
        assert!(matches!(
            RequestContext::from_header_value(&missing_tenant),
            Err(ContextError::Malformed(_))
        ));
    }
}
