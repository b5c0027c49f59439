use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RegistryError, RegistryResult};

const NAME_PATTERN: &str = r"^(([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9])?$";
const VERSION_PATTERN: &str = r"^[0-9]+(\.[0-9]+)?$";

fn name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(NAME_PATTERN).expect("name pattern is a valid regex"))
}

fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(VERSION_PATTERN).expect("version pattern is a valid regex"))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenancePort {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<u16>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceCommand {
    pub label: String,
    pub path: String,
    pub icon: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maintenance {
    pub port: MaintenancePort,
    pub readiness: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<Vec<MaintenanceCommand>>,
}

/// 服务声明依赖的对端（名称 + 版本）。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterconnectRequirement {
    pub name: String,
    pub version: String,
}

/// 服务自身的配置文件（通常为 `config.json`）。
///
/// # 教案式说明
/// - **意图 (Why)**：手动部署时需要把服务自身的元数据注册给网关；
///   可选字段在这里以强类型枚举出来，取代按名称动态拷贝。
/// - **契约 (What)**：字段名与配置文件保持一致（`subType`、`urac_ACL` 等），
///   [`ServiceDescriptor::validate`] 只做字段存在性与格式检查，不涉及业务语义。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    pub group: String,
    pub port: u16,
    #[serde(rename = "IP", default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(rename = "type")]
    pub service_type: String,
    pub version: String,
    #[serde(rename = "subType", default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urac: Option<bool>,
    #[serde(rename = "urac_Profile", default, skip_serializing_if = "Option::is_none")]
    pub urac_profile: Option<bool>,
    #[serde(rename = "urac_ACL", default, skip_serializing_if = "Option::is_none")]
    pub urac_acl: Option<bool>,
    #[serde(rename = "urac_Config", default, skip_serializing_if = "Option::is_none")]
    pub urac_config: Option<bool>,
    #[serde(
        rename = "urac_GroupConfig",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub urac_group_config: Option<bool>,
    #[serde(rename = "tenant_Profile", default, skip_serializing_if = "Option::is_none")]
    pub tenant_profile: Option<bool>,
    #[serde(rename = "provision_ACL", default, skip_serializing_if = "Option::is_none")]
    pub provision_acl: Option<bool>,
    #[serde(rename = "extKeyRequired", default, skip_serializing_if = "Option::is_none")]
    pub ext_key_required: Option<bool>,
    #[serde(rename = "requestTimeout", default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u32>,
    #[serde(
        rename = "requestTimeoutRenewal",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub request_timeout_renewal: Option<u32>,
    pub maintenance: Maintenance,
    #[serde(rename = "interConnect", default, skip_serializing_if = "Option::is_none")]
    pub interconnect: Option<Vec<InterconnectRequirement>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prerequisites: Option<Value>,
}

impl ServiceDescriptor {
    /// 从 JSON 文本解析服务配置并立即校验。
    pub fn from_json(text: &str) -> RegistryResult<Self> {
        let descriptor: Self = serde_json::from_str(text)
            .map_err(|err| RegistryError::invalid_field("config", err.to_string()))?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// 字段格式检查。
    ///
    /// - `name`/`group` 需匹配 `^(([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9])?$`；
    /// - `version` 需匹配 `^[0-9]+(\.[0-9]+)?$`；
    /// - `port` 必须为正数；
    /// - `maintenance.readiness` 与 `maintenance.port.type` 不可为空。
    pub fn validate(&self) -> RegistryResult<()> {
        for (field, value) in [("name", &self.name), ("group", &self.group)] {
            if !name_regex().is_match(value) {
                return Err(RegistryError::invalid_field(
                    field,
                    format!("`{value}` does not match {NAME_PATTERN}"),
                ));
            }
        }
        if !version_regex().is_match(&self.version) {
            return Err(RegistryError::invalid_field(
                "version",
                format!("`{}` does not match {VERSION_PATTERN}", self.version),
            ));
        }
        if self.port == 0 {
            return Err(RegistryError::invalid_field("port", "must be positive"));
        }
        if self.maintenance.readiness.is_empty() {
            return Err(RegistryError::invalid_field(
                "maintenance.readiness",
                "is required",
            ));
        }
        if self.maintenance.port.kind.is_empty() {
            return Err(RegistryError::invalid_field(
                "maintenance.port.type",
                "is required",
            ));
        }
        Ok(())
    }
}

/// 手动部署时提交给注册中心的注册清单。
///
/// `middleware` 恒为 `true`，标识该服务由中间件自助注册。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegistrationManifest {
    pub name: String,
    pub group: String,
    pub port: u16,
    pub ip: String,
    #[serde(rename = "type")]
    pub service_type: String,
    pub version: String,
    pub middleware: bool,
    #[serde(rename = "subType", default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urac: Option<bool>,
    #[serde(rename = "urac_Profile", default, skip_serializing_if = "Option::is_none")]
    pub urac_profile: Option<bool>,
    #[serde(rename = "urac_ACL", default, skip_serializing_if = "Option::is_none")]
    pub urac_acl: Option<bool>,
    #[serde(rename = "urac_Config", default, skip_serializing_if = "Option::is_none")]
    pub urac_config: Option<bool>,
    #[serde(
        rename = "urac_GroupConfig",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub urac_group_config: Option<bool>,
    #[serde(rename = "tenant_Profile", default, skip_serializing_if = "Option::is_none")]
    pub tenant_profile: Option<bool>,
    #[serde(rename = "provision_ACL", default, skip_serializing_if = "Option::is_none")]
    pub provision_acl: Option<bool>,
    #[serde(rename = "requestTimeout", default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u32>,
    #[serde(
        rename = "requestTimeoutRenewal",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub request_timeout_renewal: Option<u32>,
    #[serde(rename = "extKeyRequired", default, skip_serializing_if = "Option::is_none")]
    pub ext_key_required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<Maintenance>,
    #[serde(rename = "interConnect", default, skip_serializing_if = "Option::is_none")]
    pub interconnect: Option<Vec<InterconnectRequirement>>,
}

impl RegistrationManifest {
    /// 仅包含必填字段的清单。
    pub fn new(
        name: impl Into<String>,
        group: impl Into<String>,
        port: u16,
        ip: impl Into<String>,
        service_type: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
            port,
            ip: ip.into(),
            service_type: service_type.into(),
            version: version.into(),
            middleware: true,
            sub_type: None,
            description: None,
            oauth: None,
            urac: None,
            urac_profile: None,
            urac_acl: None,
            urac_config: None,
            urac_group_config: None,
            tenant_profile: None,
            provision_acl: None,
            request_timeout: None,
            request_timeout_renewal: None,
            ext_key_required: None,
            maintenance: None,
            interconnect: None,
        }
    }

    /// 从服务配置中拷贝白名单内的可选字段。
    ///
    /// 白名单固定为：`subType`、`description`、`oauth`、`urac`、`urac_Profile`、`urac_ACL`、
    /// `urac_Config`、`urac_GroupConfig`、`tenant_Profile`、`provision_ACL`、`requestTimeout`、
    /// `requestTimeoutRenewal`、`extKeyRequired`、`maintenance`、`interConnect`。
    #[must_use]
    pub fn with_optional_fields(mut self, descriptor: &ServiceDescriptor) -> Self {
        self.sub_type = descriptor.sub_type.clone();
        self.description = descriptor.description.clone();
        self.oauth = descriptor.oauth;
        self.urac = descriptor.urac;
        self.urac_profile = descriptor.urac_profile;
        self.urac_acl = descriptor.urac_acl;
        self.urac_config = descriptor.urac_config;
        self.urac_group_config = descriptor.urac_group_config;
        self.tenant_profile = descriptor.tenant_profile;
        self.provision_acl = descriptor.provision_acl;
        self.request_timeout = descriptor.request_timeout;
        self.request_timeout_renewal = descriptor.request_timeout_renewal;
        self.ext_key_required = descriptor.ext_key_required;
        self.maintenance = Some(descriptor.maintenance.clone());
        self.interconnect = descriptor.interconnect.clone();
        self
    }
}
