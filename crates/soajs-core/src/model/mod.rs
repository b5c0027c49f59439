//! 共享数据类型：拓扑快照、请求上下文与注册清单。
//!
//! - `snapshot`：注册中心下发的不可变快照及其条目；
//! - `context`：入站请求携带的租户/用户/感知数据；
//! - `manifest`：服务自身配置与手动注册清单。

pub mod context;
pub mod manifest;
pub mod snapshot;

pub use context::{
    Application, Awareness, InterconnectEntry, RequestContext, Tenant, TenantKey, TenantMain,
    UserRecord,
};
pub use manifest::{
    InterconnectRequirement, Maintenance, MaintenanceCommand, MaintenancePort,
    RegistrationManifest, ServiceDescriptor,
};
pub use snapshot::{
    AwarenessIntervals, Credentials, CustomEntry, DEFAULT_REFRESH_INTERVAL_MS, Database, DbHost,
    RegistryLocation, RegistrySnapshot, Resource, ServiceConfig, ServiceEntry, ServiceKey,
    ServicePorts,
};
