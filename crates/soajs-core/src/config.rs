//! 进程环境配置。
//!
//! # 教案式说明
//! - **意图 (Why)**：部署平台通过环境变量告知注册中心地址、环境代码与是否手动部署；
//!   解析集中在此处，其余模块只接触强类型值。
//! - **逻辑 (How)**：[`EnvironmentConfig::from_lookup`] 接收任意查找函数，
//!   [`EnvironmentConfig::from_env`] 只是以 `std::env::var` 作为查找函数的便捷封装，
//!   测试因此无需修改进程级环境变量。
//! - **契约 (What)**：
//!   - `SOAJS_REGISTRY_API`：`host:port`，端口必须为整数；缺失视为未配置；
//!   - `SOAJS_DEPLOY_MANUAL`：`true`/`1`/`yes`（大小写不敏感）为真，其余为假；
//!   - `SOAJS_ENV`：环境代码，缺失时为 `dev`。

use crate::error::{RegistryError, RegistryResult};

pub const REGISTRY_API_VAR: &str = "SOAJS_REGISTRY_API";
pub const DEPLOY_MANUAL_VAR: &str = "SOAJS_DEPLOY_MANUAL";
pub const ENV_CODE_VAR: &str = "SOAJS_ENV";

/// `SOAJS_ENV` 缺失时使用的环境代码。
pub const DEFAULT_ENV_CODE: &str = "dev";

/// 解析布尔开关：`true`、`1`、`yes`（忽略大小写与首尾空白）为真。
pub fn parse_flag(raw: &str) -> bool {
    let value = raw.trim();
    ["true", "1", "yes"]
        .iter()
        .any(|accepted| value.eq_ignore_ascii_case(accepted))
}

/// 注册中心的 `host:port` 地址。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryEndpoint {
    pub host: String,
    pub port: u16,
}

impl RegistryEndpoint {
    /// 解析 `host:port`；缺少冒号、主机为空或端口不是整数时报配置错误。
    pub fn parse(raw: &str) -> RegistryResult<Self> {
        let raw = raw.trim();
        let (host, port) = raw.rsplit_once(':').ok_or_else(|| {
            RegistryError::invalid_field(REGISTRY_API_VAR, format!("`{raw}` is not host:port"))
        })?;
        if host.is_empty() {
            return Err(RegistryError::invalid_field(
                REGISTRY_API_VAR,
                "host is empty",
            ));
        }
        let port = port.parse::<u16>().map_err(|_| {
            RegistryError::invalid_field(
                REGISTRY_API_VAR,
                format!("port `{port}` is not an integer"),
            )
        })?;
        Ok(Self {
            host: host.to_owned(),
            port,
        })
    }

    /// `host:port` 形式的授权段。
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 从进程环境读出的配置。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvironmentConfig {
    pub registry_api: Option<RegistryEndpoint>,
    pub deploy_manual: bool,
    pub env_code: String,
}

impl EnvironmentConfig {
    pub fn from_env() -> RegistryResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 以自定义查找函数读取配置。
    pub fn from_lookup<F>(lookup: F) -> RegistryResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let registry_api = lookup(REGISTRY_API_VAR)
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| RegistryEndpoint::parse(&raw))
            .transpose()?;
        let deploy_manual = lookup(DEPLOY_MANUAL_VAR)
            .map(|raw| parse_flag(&raw))
            .unwrap_or(false);
        let env_code = lookup(ENV_CODE_VAR)
            .map(|raw| raw.trim().to_owned())
            .filter(|code| !code.is_empty())
            .unwrap_or_else(|| DEFAULT_ENV_CODE.to_owned());
        Ok(Self {
            registry_api,
            deploy_manual,
            env_code,
        })
    }

    /// 取出注册中心地址；未配置时报错。
    pub fn require_registry_api(&self) -> RegistryResult<&RegistryEndpoint> {
        self.registry_api
            .as_ref()
            .ok_or_else(|| RegistryError::invalid_field(REGISTRY_API_VAR, "is not set"))
    }
}
