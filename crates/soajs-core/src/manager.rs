use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use tracing::info;

use crate::error::RegistryResult;
use crate::model::{CustomEntry, Database, RegistrySnapshot, Resource, ServiceEntry};
use crate::options::ManagerOptions;
use crate::registration;
use crate::scheduler::{ReloadScheduler, Reloader};
use crate::store::{CustomLookup, RegistryStore};
use crate::transport::RegistryTransport;

/// 注册表客户端的入口：持有传输、快照存储与后台刷新任务。
///
/// # 教案式说明
/// - **意图 (Why)**：服务启动时必须拿到一份可用拓扑，之后在后台持续追平；
///   管理器是一个普通的拥有型值，调用方决定其共享方式（通常放进 `Arc`）。
/// - **逻辑 (How)**：[`RegistryManager::start`] 依次执行
///   1. 首次拉取并发布（失败即返回错误，不会得到半初始化的管理器）；
///   2. 手动部署时组装清单并调用一次 `register`（失败同样致命）；
///   3. 开启后台刷新时启动唯一的 [`ReloadScheduler`]。
/// - **契约 (What)**：
///   - 关闭应显式调用 [`RegistryManager::shutdown`]；丢弃管理器时调度器的 `Drop`
///     仅发出停止信号作兜底，不等待任务退出；
///   - [`RegistryManager::scoped`] 保证闭包结束后（无论成败）执行关闭；
///   - 查询方法直接委托给 [`RegistryStore`]，不触网。
pub struct RegistryManager {
    options: ManagerOptions,
    reloader: Arc<Reloader>,
    scheduler: Option<ReloadScheduler>,
}

impl RegistryManager {
    /// 完成首次加载（及可选的手动注册）后返回管理器。
    ///
    /// 必须在 Tokio 运行时内调用。
    pub async fn start<T>(options: ManagerOptions, transport: Arc<T>) -> RegistryResult<Self>
    where
        T: RegistryTransport,
    {
        let transport: Arc<dyn RegistryTransport> = transport;
        let store = Arc::new(RegistryStore::new());
        let reloader = Arc::new(Reloader::new(transport, store, options.selector()));

        reloader.reload().await?;
        if let Ok(snapshot) = reloader.store().current() {
            info!(
                registry.name = %snapshot.name,
                registry.environment = %snapshot.environment,
                registry.loaded_at = snapshot.loaded_at,
                "registry loaded"
            );
        }

        if options.deploy_manual() {
            registration::register_service(reloader.transport(), &options).await?;
        }

        let scheduler = options
            .auto_reload()
            .then(|| ReloadScheduler::spawn(Arc::clone(&reloader)));

        Ok(Self {
            options,
            reloader,
            scheduler,
        })
    }

    /// 启动管理器，运行 `body`，随后总是执行关闭。
    ///
    /// 启动失败时 `body` 不会运行；`body` 的错误在关闭完成后原样返回。
    pub async fn scoped<T, F, Fut, R>(
        options: ManagerOptions,
        transport: Arc<T>,
        body: F,
    ) -> RegistryResult<R>
    where
        T: RegistryTransport,
        F: FnOnce(Arc<RegistryManager>) -> Fut,
        Fut: Future<Output = RegistryResult<R>>,
    {
        let manager = Arc::new(Self::start(options, transport).await?);
        let outcome = body(Arc::clone(&manager)).await;
        manager.shutdown().await;
        outcome
    }

    pub fn options(&self) -> &ManagerOptions {
        &self.options
    }

    /// 底层快照存储，可单独交给只读调用方。
    pub fn store(&self) -> &Arc<RegistryStore> {
        self.reloader.store()
    }

    /// 是否有后台刷新任务在运行。
    pub fn is_auto_reloading(&self) -> bool {
        self.scheduler
            .as_ref()
            .is_some_and(|scheduler| !scheduler.is_stopped())
    }

    /// 立即拉取并发布一次；与后台刷新并发时以最后一次发布为准。
    pub async fn reload(&self) -> RegistryResult<()> {
        self.reloader.reload().await
    }

    /// 停止后台刷新并等待其退出，重复调用无副作用。
    pub async fn shutdown(&self) {
        if let Some(scheduler) = &self.scheduler {
            scheduler.stop(self.options.stop_timeout()).await;
        }
    }

    pub fn current(&self) -> RegistryResult<Arc<RegistrySnapshot>> {
        self.store().current()
    }

    pub fn database(&self, name: &str) -> RegistryResult<Database> {
        self.store().database(name)
    }

    pub fn all_databases(&self) -> RegistryResult<BTreeMap<String, Database>> {
        self.store().all_databases()
    }

    pub fn service(&self, name: &str) -> RegistryResult<ServiceEntry> {
        self.store().service(name)
    }

    pub fn resource(&self, name: &str) -> RegistryResult<Resource> {
        self.store().resource(name)
    }

    pub fn custom(&self, name: Option<&str>) -> RegistryResult<CustomLookup> {
        self.store().custom(name)
    }

    pub fn custom_entry(&self, name: &str) -> RegistryResult<CustomEntry> {
        self.store().custom_entry(name)
    }
}

impl std::fmt::Debug for RegistryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryManager")
            .field("options", &self.options)
            .field("auto_reloading", &self.is_auto_reloading())
            .finish_non_exhaustive()
    }
}
