//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 为注册表缓存、后台刷新、手动注册与服务连接器提供统一的错误语义；
//! - 区分“未找到”（调用方可自行决定 HTTP 层响应）与“传输/配置失败”（通常致命）。
//!
//! ## 设计要求（What）
//! - 所有错误类型派生 `thiserror::Error`，可直接交给 `anyhow` 等上层框架；
//! - 每个变体提供稳定的点分错误码（[`RegistryError::code`]），便于日志聚合与告警。

use std::fmt;

use thiserror::Error;

/// 稳定错误码集合。
///
/// 命名遵循 `<域>.<类别>` 的点分风格，与日志字段 `error.code` 一一对应。
pub mod codes {
    pub const NOT_LOADED: &str = "registry.not_loaded";
    pub const DATABASE_NOT_FOUND: &str = "registry.database_not_found";
    pub const SERVICE_NOT_FOUND: &str = "registry.service_not_found";
    pub const RESOURCE_NOT_FOUND: &str = "registry.resource_not_found";
    pub const CUSTOM_NOT_FOUND: &str = "registry.custom_not_found";
    pub const TRANSPORT: &str = "registry.transport";
    pub const MALFORMED_SNAPSHOT: &str = "registry.malformed_snapshot";
    pub const CONFIG_VALIDATION: &str = "registry.config_validation";
    pub const REGISTRATION: &str = "registry.registration";
}

/// 自定义注册项查询未命中的两种形态。
///
/// - `Named`：按名称查询，但该名称不存在；
/// - `Empty`：未指定名称，且快照中一条自定义项都没有。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CustomMiss {
    Named(String),
    Empty,
}

impl fmt::Display for CustomMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomMiss::Named(name) => f.write_str(name),
            CustomMiss::Empty => f.write_str("none present"),
        }
    }
}

/// 注册表客户端的核心错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：聚合快照读取、拓扑拉取、手动注册等关键路径的异常，调用方可用一个
///   `match` 区分“未找到”“未加载”“传输失败”“配置无效”。
/// - **契约 (What)**：
///   - 所有变体均 `Send + Sync + 'static`，可跨任务传播；
///   - `Transport` 携带上游返回的 `code`/`message`（若存在）；
///   - `Registration` 包装导致手动注册失败的底层错误，保留错误链。
/// - **设计权衡 (Trade-offs)**：名称类上下文使用 `String` 保存，牺牲少量分配换取易读的诊断信息。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// 在任何快照发布之前读取注册表。
    #[error("registry not loaded")]
    NotLoaded,

    /// 核心库与租户元数据库中都不存在该名称。
    #[error("database not found: {0}")]
    DatabaseNotFound(String),

    #[error("service not found: {0}")]
    ServiceNotFound(String),

    /// 所有资源分类中都不存在该名称。
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("custom registry not found: {0}")]
    CustomNotFound(CustomMiss),

    /// 拓扑源拉取或注册请求失败。
    ///
    /// - **契约 (What)**：`code` 为注册中心返回的业务错误码；HTTP 层或解码失败时为 `None`。
    #[error("{}", transport_display(.code, .message))]
    Transport {
        code: Option<String>,
        message: String,
    },

    /// 拓扑源返回的数据无法解析为快照。
    #[error("malformed registry snapshot: {0}")]
    MalformedSnapshot(String),

    /// 服务清单字段在发送前即被判定无效。
    #[error("invalid configuration field `{field}`: {reason}")]
    ConfigValidation { field: String, reason: String },

    /// 手动部署注册失败，构造期致命。
    #[error("failed to register service for manual deployment: {0}")]
    Registration(Box<RegistryError>),
}

fn transport_display(code: &Option<String>, message: &str) -> String {
    match code {
        Some(code) => format!("registry error: [{code}] {message}"),
        None => format!("registry transport failure: {message}"),
    }
}

impl RegistryError {
    /// 构造不带上游错误码的传输错误。
    pub fn transport(message: impl Into<String>) -> Self {
        RegistryError::Transport {
            code: None,
            message: message.into(),
        }
    }

    /// 构造带上游错误码的传输错误。
    pub fn upstream(code: impl Into<String>, message: impl Into<String>) -> Self {
        RegistryError::Transport {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// 构造配置校验错误，`field` 使用清单中的原始字段名。
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        RegistryError::ConfigValidation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// 返回稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::NotLoaded => codes::NOT_LOADED,
            RegistryError::DatabaseNotFound(_) => codes::DATABASE_NOT_FOUND,
            RegistryError::ServiceNotFound(_) => codes::SERVICE_NOT_FOUND,
            RegistryError::ResourceNotFound(_) => codes::RESOURCE_NOT_FOUND,
            RegistryError::CustomNotFound(_) => codes::CUSTOM_NOT_FOUND,
            RegistryError::Transport { .. } => codes::TRANSPORT,
            RegistryError::MalformedSnapshot(_) => codes::MALFORMED_SNAPSHOT,
            RegistryError::ConfigValidation { .. } => codes::CONFIG_VALIDATION,
            RegistryError::Registration(_) => codes::REGISTRATION,
        }
    }

    /// 是否属于“查询未命中”一类。
    ///
    /// 框架侧调用方据此返回 404 一类的响应，而不是笼统的 500。
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RegistryError::DatabaseNotFound(_)
                | RegistryError::ServiceNotFound(_)
                | RegistryError::ResourceNotFound(_)
                | RegistryError::CustomNotFound(_)
        )
    }
}

/// 注册表操作的统一返回类型。
pub type RegistryResult<T> = Result<T, RegistryError>;

/// 请求上下文提取失败的原因。
///
/// 两者都只表示“本次请求没有可用上下文”，不会让请求本身失败。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    /// 请求未携带上下文头，或头部值为空。
    #[error("no request context header present")]
    Absent,

    /// 上下文头存在但无法解析。
    #[error("malformed request context header: {0}")]
    Malformed(String),
}
