//! 手动部署时的服务自注册。

use tracing::info;

use crate::error::{RegistryError, RegistryResult};
use crate::model::RegistrationManifest;
use crate::options::ManagerOptions;
use crate::transport::{RegistrationAck, RegistryTransport};

/// 未显式给出 IP 时注册的地址。
pub const DEFAULT_SERVICE_IP: &str = "127.0.0.1";

/// 由构造参数组装注册清单。
///
/// 缺少 `port`、`group` 或 `version` 时返回以该字段命名的 [`RegistryError::ConfigValidation`]，
/// 此时不会发起任何网络请求。
pub fn build_manifest(options: &ManagerOptions) -> RegistryResult<RegistrationManifest> {
    let port = options
        .port()
        .ok_or_else(|| missing("port"))?;
    let group = options.group().ok_or_else(|| missing("group"))?;
    let version = options.version().ok_or_else(|| missing("version"))?;
    let ip = options.ip().unwrap_or(DEFAULT_SERVICE_IP);

    let manifest = RegistrationManifest::new(
        options.service_name(),
        group,
        port,
        ip,
        options.service_type(),
        version,
    );
    Ok(match options.descriptor() {
        Some(descriptor) => manifest.with_optional_fields(descriptor),
        None => manifest,
    })
}

fn missing(field: &str) -> RegistryError {
    RegistryError::invalid_field(field, "is required when manual deployment is enabled")
}

/// 组装清单并调用一次 `register`。
///
/// 传输失败被包装为 [`RegistryError::Registration`]。
pub async fn register_service(
    transport: &dyn RegistryTransport,
    options: &ManagerOptions,
) -> RegistryResult<RegistrationAck> {
    let manifest = build_manifest(options)?;
    let ack = transport
        .register(&manifest)
        .await
        .map_err(|err| RegistryError::Registration(Box::new(err)))?;
    info!(
        service.name = %manifest.name,
        service.version = %manifest.version,
        "service registered for manual deployment"
    );
    Ok(ack)
}
