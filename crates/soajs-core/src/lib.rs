//! # soajs-core
//!
//! ## 定位与职责（Why）
//! - 为网格内的微服务提供一份本地、可并发读取、周期刷新的部署拓扑缓存（数据库、对端服务、
//!   资源与自定义配置），请求路径上的查询不产生任何网络往返；
//! - 在请求期把“调用某个对端服务”解析为具体地址与头部：调用方已知直连地址时走网格直连，
//!   否则退回网关。
//!
//! ## 架构嵌入（Where）
//! - `transport` 声明与注册中心交互的异步契约，HTTP 实现位于 `soajs-transport-http`；
//! - `store` 以 `arc-swap` 持有当前快照，`scheduler` 负责后台刷新，`manager` 负责组装与生命周期；
//! - `context` 把网关注入的请求头解析为 [`RequestContext`]，`connector` 基于它做服务解析；
//! - `config`/`options` 承载环境变量与构造参数，`error` 集中定义错误域。
//!
//! ## 运行时要求（Trade-offs）
//! - 后台刷新基于 Tokio：[`RegistryManager::start`] 必须在 Tokio 运行时内调用；
//! - 查询与连接解析为同步纯函数，可在任意线程使用。

pub mod config;

/// 请求期服务解析。
///
/// - **意图说明 (Why)**：网格直连优先、网关兜底；
/// - **契约定位 (What)**：纯函数，不触网、不缓存。
pub mod connector;

pub mod context;

/// 错误类型与稳定错误码。
///
/// - **意图说明 (Why)**：区分“未找到”“未加载”“传输失败”“配置无效”；
/// - **风险提示 (Trade-offs)**：首次加载与手动注册失败是致命的，后台刷新失败只记日志。
pub mod error;

pub mod manager;
pub mod model;
pub mod options;
pub mod registration;
pub mod scheduler;

/// 快照存储与类型化查询。
pub mod store;

pub mod transport;

pub use config::{EnvironmentConfig, RegistryEndpoint, parse_flag};
pub use connector::{ConnectionDescriptor, ConnectionRoute, KEY_HEADER, ServiceConnector};
pub use context::INJECT_HEADER;
pub use error::{ContextError, CustomMiss, RegistryError, RegistryResult};
pub use manager::RegistryManager;
pub use model::{
    Database, RegistrationManifest, RegistrySnapshot, RequestContext, ServiceDescriptor,
};
pub use options::ManagerOptions;
pub use scheduler::{ReloadScheduler, reload_interval};
pub use store::{CustomLookup, RegistryStore};
pub use transport::{RawSnapshot, RegistrationAck, RegistrySelector, RegistryTransport};
