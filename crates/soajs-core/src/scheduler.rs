//! 后台刷新：周期性拉取注册表并发布新快照。
//!
//! # 教案式说明
//! - **意图 (Why)**：请求路径只读内存快照；拓扑变化由一个后台任务按注册中心下发的间隔
//!   追平，单次失败不影响正在服务的快照。
//! - **逻辑 (How)**：
//!   1. 依据当前快照计算等待间隔（[`reload_interval`]）；
//!   2. 在 `tokio::select!` 中同时等待计时器与停止信号（`watch` 通道），停止信号立即唤醒；
//!   3. 拉取、解析、打上服务类型后发布；拉取失败记 warn 日志并进入下一轮；
//!   4. 停止后完成的拉取结果直接丢弃，不再开启新一轮。
//! - **契约 (What)**：
//!   - [`ReloadScheduler::stop`] 幂等，可被任意任务并发调用；
//!   - 等待任务退出的时间受 `timeout` 约束，超时后中止任务并记 warn 日志。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::error::RegistryResult;
use crate::model::{DEFAULT_REFRESH_INTERVAL_MS, RegistrySnapshot};
use crate::store::RegistryStore;
use crate::transport::{RegistrySelector, RegistryTransport};

/// 最短刷新间隔。
pub const MIN_RELOAD_INTERVAL: Duration = Duration::from_secs(1);

/// 尚无快照时的刷新间隔。
pub const UNLOADED_RELOAD_INTERVAL: Duration = Duration::from_millis(DEFAULT_REFRESH_INTERVAL_MS);

/// 计算下一轮等待时间：`max(autoReloadRegistry / 1000, 1)` 秒；无快照时为一小时。
pub fn reload_interval(snapshot: Option<&RegistrySnapshot>) -> Duration {
    match snapshot {
        Some(snapshot) => {
            Duration::from_millis(snapshot.refresh_interval_ms()).max(MIN_RELOAD_INTERVAL)
        }
        None => UNLOADED_RELOAD_INTERVAL,
    }
}

/// 一次“拉取 → 解析 → 发布”所需的全部协作者。
///
/// 手动 `reload` 与后台任务共用同一实例，因此并发刷新时以最后一次发布为准。
pub(crate) struct Reloader {
    transport: Arc<dyn RegistryTransport>,
    store: Arc<RegistryStore>,
    selector: RegistrySelector,
}

impl Reloader {
    pub(crate) fn new(
        transport: Arc<dyn RegistryTransport>,
        store: Arc<RegistryStore>,
        selector: RegistrySelector,
    ) -> Self {
        Self {
            transport,
            store,
            selector,
        }
    }

    pub(crate) fn transport(&self) -> &dyn RegistryTransport {
        self.transport.as_ref()
    }

    pub(crate) fn store(&self) -> &Arc<RegistryStore> {
        &self.store
    }

    /// 拉取并解析快照，不发布。
    pub(crate) async fn fetch(&self) -> RegistryResult<RegistrySnapshot> {
        let raw = self.transport.fetch(&self.selector).await?;
        let snapshot = RegistrySnapshot::from_raw(raw)?;
        Ok(snapshot.with_service_type(self.selector.service_type.clone()))
    }

    /// 拉取并发布。
    pub(crate) async fn reload(&self) -> RegistryResult<()> {
        let snapshot = self.fetch().await?;
        self.store.publish(snapshot);
        Ok(())
    }
}

/// 后台刷新任务的句柄。
pub struct ReloadScheduler {
    stop_tx: watch::Sender<bool>,
    stopped: AtomicBool,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ReloadScheduler {
    /// 在当前 Tokio 运行时上启动刷新任务。
    pub(crate) fn spawn(reloader: Arc<Reloader>) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        info!(
            registry.selector = %reloader.selector,
            "registry auto-reload started"
        );
        let span = info_span!("registry_reload", registry.selector = %reloader.selector);
        let handle = tokio::spawn(run(reloader, stop_rx).instrument(span));
        Self {
            stop_tx,
            stopped: AtomicBool::new(false),
            handle: Mutex::new(Some(handle)),
        }
    }

    /// 是否已收到停止信号。
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// 只发出停止信号，不等待任务退出；返回本次调用是否为首次。
    pub fn signal_stop(&self) -> bool {
        let first = !self.stopped.swap(true, Ordering::AcqRel);
        if first {
            self.stop_tx.send_replace(true);
        }
        first
    }

    /// 发出停止信号并在 `timeout` 内等待任务退出。
    ///
    /// 重复调用直接返回；超时后中止任务。
    pub async fn stop(&self, timeout: Duration) {
        self.signal_stop();
        let handle = self.handle.lock().take();
        let Some(mut handle) = handle else {
            return;
        };
        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(Ok(())) => info!("registry auto-reload stopped"),
            Ok(Err(err)) => warn!(
                error.message = %err,
                "registry auto-reload task ended abnormally"
            ),
            Err(_) => {
                handle.abort();
                warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "registry auto-reload did not stop in time; task aborted"
                );
            }
        }
    }
}

impl Drop for ReloadScheduler {
    fn drop(&mut self) {
        self.signal_stop();
    }
}

async fn run(reloader: Arc<Reloader>, mut stop_rx: watch::Receiver<bool>) {
    loop {
        if *stop_rx.borrow() {
            break;
        }
        let current = reloader.store.current().ok();
        let interval = reload_interval(current.as_deref());
        drop(current);
        debug!(
            reload.interval_secs = interval.as_secs_f64(),
            "waiting for next registry reload"
        );

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            // 发送端被丢弃同样视为停止。
            _ = stop_rx.changed() => break,
        }
        if *stop_rx.borrow() {
            break;
        }

        match reloader.fetch().await {
            Ok(snapshot) => {
                if *stop_rx.borrow() {
                    debug!("registry reload finished after stop; result discarded");
                    break;
                }
                reloader.store.publish(snapshot);
            }
            Err(err) => {
                warn!(
                    error.code = err.code(),
                    error.message = %err,
                    "registry reload failed; keeping current snapshot"
                );
            }
        }
    }
}
