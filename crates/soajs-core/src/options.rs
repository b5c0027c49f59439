use std::time::Duration;

use crate::config::EnvironmentConfig;
use crate::model::ServiceDescriptor;
use crate::transport::RegistrySelector;

/// 停止后台刷新时等待任务退出的默认上限。
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// [`crate::RegistryManager`] 的构造参数。
///
/// # 教案式说明
/// - **意图 (Why)**：把“拉谁的注册表”“是否后台刷新”“是否手动注册”以及注册所需的
///   服务元数据收拢到一个值里，构造期一次性校验。
/// - **逻辑 (How)**：链式 `with_*` 设置器，均按值消费并返回 `Self`。
/// - **契约 (What)**：
///   - 默认开启后台刷新，默认非手动部署；
///   - 手动部署时 `port`/`group`/`version` 必须可得，`ip` 缺省为 `127.0.0.1`，
///     校验推迟到 [`crate::RegistryManager::start`]。
#[derive(Clone, Debug)]
pub struct ManagerOptions {
    service_name: String,
    env_code: String,
    service_type: String,
    auto_reload: bool,
    deploy_manual: bool,
    port: Option<u16>,
    ip: Option<String>,
    group: Option<String>,
    version: Option<String>,
    descriptor: Option<ServiceDescriptor>,
    stop_timeout: Duration,
}

impl ManagerOptions {
    pub fn new(
        service_name: impl Into<String>,
        env_code: impl Into<String>,
        service_type: impl Into<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            env_code: env_code.into(),
            service_type: service_type.into(),
            auto_reload: true,
            deploy_manual: false,
            port: None,
            ip: None,
            group: None,
            version: None,
            descriptor: None,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }

    /// 以服务自身配置为种子：名称、类型、端口、分组、版本与 IP 均取自配置文件。
    pub fn from_descriptor(descriptor: ServiceDescriptor, env_code: impl Into<String>) -> Self {
        let mut options = Self::new(
            descriptor.name.clone(),
            env_code,
            descriptor.service_type.clone(),
        );
        options.port = Some(descriptor.port);
        options.group = Some(descriptor.group.clone());
        options.version = Some(descriptor.version.clone());
        options.ip = descriptor.ip.clone();
        options.descriptor = Some(descriptor);
        options
    }

    /// 套用环境变量中的环境代码与手动部署开关。
    #[must_use]
    pub fn with_environment(mut self, env: &EnvironmentConfig) -> Self {
        self.env_code = env.env_code.clone();
        self.deploy_manual = env.deploy_manual;
        self
    }

    #[must_use]
    pub fn with_auto_reload(mut self, enabled: bool) -> Self {
        self.auto_reload = enabled;
        self
    }

    #[must_use]
    pub fn with_deploy_manual(mut self, enabled: bool) -> Self {
        self.deploy_manual = enabled;
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    #[must_use]
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// 附带服务配置，注册时从中拷贝可选字段。
    #[must_use]
    pub fn with_descriptor(mut self, descriptor: ServiceDescriptor) -> Self {
        self.descriptor = Some(descriptor);
        self
    }

    #[must_use]
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn env_code(&self) -> &str {
        &self.env_code
    }

    pub fn service_type(&self) -> &str {
        &self.service_type
    }

    pub fn auto_reload(&self) -> bool {
        self.auto_reload
    }

    pub fn deploy_manual(&self) -> bool {
        self.deploy_manual
    }

    /// 端口；`0` 视同未设置。
    pub fn port(&self) -> Option<u16> {
        self.port.filter(|port| *port > 0)
    }

    pub fn ip(&self) -> Option<&str> {
        self.ip.as_deref().filter(|ip| !ip.is_empty())
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref().filter(|group| !group.is_empty())
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref().filter(|version| !version.is_empty())
    }

    pub fn descriptor(&self) -> Option<&ServiceDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn stop_timeout(&self) -> Duration {
        self.stop_timeout
    }

    /// 拉取注册表所用的选择器。
    pub fn selector(&self) -> RegistrySelector {
        RegistrySelector::new(&self.service_name, &self.env_code, &self.service_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_empty_values() {
        let options = ManagerOptions::new("orders", "dev", "service")
            .with_port(0)
            .with_group("");
        assert!(options.auto_reload());
        assert!(!options.deploy_manual());
        assert_eq!(options.port(), None);
        assert_eq!(options.group(), None);
        assert_eq!(options.stop_timeout(), DEFAULT_STOP_TIMEOUT);
        assert_eq!(options.selector().to_string(), "orders@dev (service)");
    }

    #[test]
    fn environment_overrides_env_code_and_manual_flag() {
        let env = EnvironmentConfig {
            registry_api: None,
            deploy_manual: true,
            env_code: "stg".into(),
        };
        let options = ManagerOptions::new("orders", "dev", "service").with_environment(&env);
        assert_eq!(options.env_code(), "stg");
        assert!(options.deploy_manual());
    }
}
