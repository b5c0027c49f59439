//! 集成测试共享的脚本化传输替身与快照样例。

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use soajs_core::{
    RawSnapshot, RegistrationAck, RegistrationManifest, RegistryError, RegistryResult,
    RegistrySelector, RegistryTransport,
};
use tokio::sync::Notify;

/// 按脚本依次返回拉取结果的传输替身。
///
/// 脚本耗尽后重复最后一次结果；`hold_from` 之后的拉取会先等待 `gate` 放行。
pub struct ScriptedTransport {
    script: Mutex<VecDeque<RegistryResult<Value>>>,
    last: Mutex<Option<RegistryResult<Value>>>,
    register_result: Mutex<RegistryResult<Value>>,
    fetch_calls: AtomicUsize,
    registered: Mutex<Vec<RegistrationManifest>>,
    selectors: Mutex<Vec<RegistrySelector>>,
    hold_from: Option<usize>,
    gate: Arc<Notify>,
}

impl ScriptedTransport {
    pub fn new(script: impl IntoIterator<Item = RegistryResult<Value>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            last: Mutex::new(None),
            register_result: Mutex::new(Ok(json!({ "registered": true }))),
            fetch_calls: AtomicUsize::new(0),
            registered: Mutex::new(Vec::new()),
            selectors: Mutex::new(Vec::new()),
            hold_from: None,
            gate: Arc::new(Notify::new()),
        }
    }

    /// 第 `index` 次（从 0 计）及之后的拉取需等待 [`Self::gate`] 放行。
    pub fn holding_from(mut self, index: usize) -> Self {
        self.hold_from = Some(index);
        self
    }

    pub fn failing_registration(self, err: RegistryError) -> Self {
        *self.register_result.lock() = Err(err);
        self
    }

    pub fn gate(&self) -> Arc<Notify> {
        Arc::clone(&self.gate)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn registered(&self) -> Vec<RegistrationManifest> {
        self.registered.lock().clone()
    }

    pub fn selectors(&self) -> Vec<RegistrySelector> {
        self.selectors.lock().clone()
    }

    fn next_response(&self) -> RegistryResult<Value> {
        let next = self.script.lock().pop_front();
        let mut last = self.last.lock();
        match next {
            Some(response) => {
                *last = Some(response.clone());
                response
            }
            None => last
                .clone()
                .unwrap_or_else(|| Err(RegistryError::transport("script exhausted"))),
        }
    }
}

#[async_trait]
impl RegistryTransport for ScriptedTransport {
    async fn fetch(&self, selector: &RegistrySelector) -> RegistryResult<RawSnapshot> {
        let index = self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.selectors.lock().push(selector.clone());
        if self.hold_from.is_some_and(|from| index >= from) {
            self.gate.notified().await;
        }
        self.next_response().map(RawSnapshot::new)
    }

    async fn register(&self, manifest: &RegistrationManifest) -> RegistryResult<RegistrationAck> {
        self.registered.lock().push(manifest.clone());
        self.register_result.lock().clone().map(RegistrationAck)
    }
}

/// 最小可解析快照；`interval_ms` 为 `None` 时不带刷新提示。
pub fn snapshot_json(name: &str, loaded_at: i64, interval_ms: Option<u64>) -> Value {
    let awareness = match interval_ms {
        Some(ms) => json!({ "autoReloadRegistry": ms }),
        None => json!({}),
    };
    json!({
        "timeLoaded": loaded_at,
        "name": name,
        "environment": "dev",
        "serviceConfig": { "awareness": awareness },
        "services": { "auth": { "group": "security", "port": 4001 } },
        "coreDB": {
            "main": { "name": "main", "cluster": "core", "servers": [{ "host": "db", "port": 27017 }] }
        }
    })
}
