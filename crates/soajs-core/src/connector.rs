//! 请求期服务解析：网格直连优先，网关兜底。
//!
//! # 教案式说明
//! - **意图 (Why)**：同一租户请求在服务之间流转时，若调用方已知目标服务的直连地址，
//!   应绕过网关直接调用并原样转发上下文；否则退回网关，由网关完成鉴权与路由。
//! - **逻辑 (How)**：
//!   1. 按顺序扫描 `awareness.interConnect`，名称相等且版本匹配的首条记录胜出；
//!      未指定版本时只接受 `version == latest` 的记录；
//!   2. 命中：`host = "<host>:<port>"`，唯一头部 `soajsinjectobj` 携带完整上下文 JSON；
//!   3. 未命中：`host = "<网关host>:<网关port>/"`，目标为 `controller` 时追加
//!      `controller/` 与可选的 `v<数字版本>/`；头部仅有 `key`（外部密钥，缺失为空串）。
//! - **契约 (What)**：纯函数，不访问网络，不重试，不缓存。

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};
use tracing::debug;

use crate::context::INJECT_HEADER;
use crate::model::{InterconnectEntry, RequestContext};

/// 网关兜底时携带外部密钥的头部名称。
pub const KEY_HEADER: &str = "key";

const CONTROLLER: &str = "controller";

/// 解析结果走的路径。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionRoute {
    Mesh,
    Gateway,
}

/// 一次服务调用所需的目标地址与头部。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    /// 目标地址，网关兜底时可能带路径前缀。
    pub host: String,
    pub headers: BTreeMap<String, String>,
    pub route: ConnectionRoute,
}

impl ConnectionDescriptor {
    pub fn is_mesh(&self) -> bool {
        self.route == ConnectionRoute::Mesh
    }
}

/// 绑定到单个请求上下文的连接器。
#[derive(Clone, Copy, Debug)]
pub struct ServiceConnector<'a> {
    context: &'a RequestContext,
}

impl<'a> ServiceConnector<'a> {
    pub fn new(context: &'a RequestContext) -> Self {
        Self { context }
    }

    /// 解析到 `service` 的连接方式；`version` 为空串视同未指定。
    pub fn connect(&self, service: &str, version: Option<&str>) -> ConnectionDescriptor {
        let version = version.filter(|v| !v.is_empty());
        let descriptor = match self.find_peer(service, version) {
            Some(peer) => ConnectionDescriptor {
                host: format!("{}:{}", peer.host, peer.port),
                headers: BTreeMap::from([(INJECT_HEADER.to_owned(), self.inject_payload())]),
                route: ConnectionRoute::Mesh,
            },
            None => ConnectionDescriptor {
                host: gateway_path(
                    &self.context.awareness.host,
                    self.context.awareness.port,
                    service,
                    version,
                ),
                headers: BTreeMap::from([(
                    KEY_HEADER.to_owned(),
                    self.context.tenant.key.external.clone().unwrap_or_default(),
                )]),
                route: ConnectionRoute::Gateway,
            },
        };
        debug!(
            connect.host = %descriptor.host,
            connect.mesh = descriptor.is_mesh(),
            "resolved service connection"
        );
        descriptor
    }

    fn find_peer(&self, service: &str, version: Option<&str>) -> Option<&'a InterconnectEntry> {
        self.context
            .awareness
            .interconnect
            .iter()
            .filter(|entry| entry.name == service)
            .find(|entry| match version {
                None => entry.is_latest(),
                Some(wanted) => entry.version == wanted,
            })
    }

    /// 直连时转发的上下文 JSON。
    fn inject_payload(&self) -> String {
        let ctx = self.context;
        let application = ctx.tenant.application.as_ref();
        let (package_acl, package_acl_all_env) = application
            .map(|app| (app.package_acl.clone(), app.package_acl_all_env.clone()))
            .unwrap_or_else(|| (Map::new(), Map::new()));
        json!({
            "tenant": ctx.tenant,
            "key": {
                "iKey": ctx.tenant.key.internal,
                "eKey": ctx.tenant.key.external,
                "config": ctx.services_config,
            },
            "application": application
                .map(|app| json!(app))
                .unwrap_or_else(|| Value::Object(Map::new())),
            "package": {
                "acl": package_acl,
                "acl_all_env": package_acl_all_env,
            },
            "device": ctx.device,
            "geo": ctx.geo,
            "urac": ctx.urac,
            "awareness": ctx.awareness,
        })
        .to_string()
    }
}

/// 网关兜底路径。
///
/// 只有 `controller` 会带上服务名段；版本仅在全为 ASCII 数字时追加。
pub fn gateway_path(host: &str, port: u16, service: &str, version: Option<&str>) -> String {
    let mut path = format!("{host}:{port}/");
    if service.eq_ignore_ascii_case(CONTROLLER) {
        path.push_str(service);
        path.push('/');
        let numeric = version.filter(|v| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()));
        if let Some(version) = numeric {
            path.push('v');
            path.push_str(version);
            path.push('/');
        }
    }
    path
}
