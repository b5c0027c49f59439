use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tracing::debug;

use crate::error::{CustomMiss, RegistryError, RegistryResult};
use crate::model::{CustomEntry, Database, RegistrySnapshot, Resource, ServiceEntry};

/// `custom` 查询的两种结果形态。
#[derive(Clone, Debug, PartialEq)]
pub enum CustomLookup {
    /// 按名称命中的单个条目。
    Entry(CustomEntry),
    /// 未指定名称时返回的完整映射。
    All(BTreeMap<String, CustomEntry>),
}

/// `RegistryStore` 以 `ArcSwap` 持有当前快照，提供无锁读取与整体替换。
///
/// # 教案式说明
/// - **意图 (Why)**：
///   - 请求路径上的查询必须读到一份完整、自洽的快照，且不能被慢速拉取阻塞；
///   - 采用“先构造、后换指针”的发布方式：拉取与解析全部在锁外完成，发布只是一次 `store`。
/// - **逻辑 (How)**：
///   1. 内部为 [`ArcSwapOption<RegistrySnapshot>`]，`None` 表示尚未加载；
///   2. 每个查询方法先 `load_full` 一次，随后只在这份 `Arc` 上作答，
///      因此单次调用不可能混合新旧快照的字段；
///   3. 旧快照在最后一个读者释放 `Arc` 后自动回收。
/// - **契约 (What)**：
///   - `publish` 无条件成功，可与任意数量的读者并发；
///   - 并发发布时“最后一次发布者胜出”，不比较快照时间戳；
///   - 未发布前所有查询返回 [`RegistryError::NotLoaded`]。
#[derive(Debug, Default)]
pub struct RegistryStore {
    current: ArcSwapOption<RegistrySnapshot>,
}

impl RegistryStore {
    /// 构造空的存储，首次发布前不可用。
    pub fn new() -> Self {
        Self {
            current: ArcSwapOption::empty(),
        }
    }

    /// 以一份初始快照构造存储。
    pub fn with_snapshot(snapshot: RegistrySnapshot) -> Self {
        let store = Self::new();
        store.publish(snapshot);
        store
    }

    /// 发布新快照，替换当前引用。
    pub fn publish(&self, snapshot: RegistrySnapshot) {
        self.publish_arc(Arc::new(snapshot));
    }

    /// 发布已共享的快照。
    pub fn publish_arc(&self, snapshot: Arc<RegistrySnapshot>) {
        debug!(
            registry.name = %snapshot.name,
            registry.environment = %snapshot.environment,
            registry.loaded_at = snapshot.loaded_at,
            "registry snapshot published"
        );
        self.current.store(Some(snapshot));
    }

    /// 是否已有快照发布。
    pub fn is_loaded(&self) -> bool {
        self.current.load().is_some()
    }

    /// 返回当前快照。
    pub fn current(&self) -> RegistryResult<Arc<RegistrySnapshot>> {
        self.current.load_full().ok_or(RegistryError::NotLoaded)
    }

    /// 按名称查找数据库：先查核心库，再查租户元数据库。
    pub fn database(&self, name: &str) -> RegistryResult<Database> {
        let snapshot = self.current()?;
        snapshot
            .core_dbs
            .get(name)
            .or_else(|| snapshot.tenant_dbs.get(name))
            .cloned()
            .ok_or_else(|| RegistryError::DatabaseNotFound(name.to_owned()))
    }

    /// 核心库与租户元数据库的并集，同名时核心库优先。
    pub fn all_databases(&self) -> RegistryResult<BTreeMap<String, Database>> {
        let snapshot = self.current()?;
        let mut merged = snapshot.tenant_dbs.clone();
        merged.extend(
            snapshot
                .core_dbs
                .iter()
                .map(|(name, db)| (name.clone(), db.clone())),
        );
        Ok(merged)
    }

    pub fn service(&self, name: &str) -> RegistryResult<ServiceEntry> {
        let snapshot = self.current()?;
        snapshot
            .services
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::ServiceNotFound(name.to_owned()))
    }

    /// 在所有资源分类中查找名称，返回首个命中（按分类名排序）。
    pub fn resource(&self, name: &str) -> RegistryResult<Resource> {
        let snapshot = self.current()?;
        snapshot
            .resources
            .values()
            .find_map(|category| category.get(name))
            .cloned()
            .ok_or_else(|| RegistryError::ResourceNotFound(name.to_owned()))
    }

    pub fn custom_entry(&self, name: &str) -> RegistryResult<CustomEntry> {
        let snapshot = self.current()?;
        snapshot
            .custom
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::CustomNotFound(CustomMiss::Named(name.to_owned())))
    }

    /// 返回全部自定义项；一条都没有时报 `CustomMiss::Empty`。
    pub fn custom_entries(&self) -> RegistryResult<BTreeMap<String, CustomEntry>> {
        let snapshot = self.current()?;
        if snapshot.custom.is_empty() {
            return Err(RegistryError::CustomNotFound(CustomMiss::Empty));
        }
        Ok(snapshot.custom.clone())
    }

    /// 合并形态的自定义项查询。
    pub fn custom(&self, name: Option<&str>) -> RegistryResult<CustomLookup> {
        match name {
            Some(name) => self.custom_entry(name).map(CustomLookup::Entry),
            None => self.custom_entries().map(CustomLookup::All),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::RawSnapshot;
    use serde_json::{Value, json};

    fn snapshot(value: Value) -> RegistrySnapshot {
        RegistrySnapshot::from_raw(RawSnapshot::new(value)).expect("测试快照应可解析")
    }

    fn db(name: &str, cluster: &str) -> Value {
        json!({ "name": name, "cluster": cluster, "servers": [{ "host": "h", "port": 1 }] })
    }

    fn fixture() -> RegistrySnapshot {
        snapshot(json!({
            "timeLoaded": 10,
            "name": "orders",
            "environment": "dev",
            "serviceConfig": { "awareness": {} },
            "coreDB": { "main": db("main", "core-cluster") },
            "tenantMetaDB": {
                "main": db("main", "tenant-cluster"),
                "billing": db("billing", "tenant-cluster")
            },
            "services": { "auth": { "group": "security", "port": 4001 } },
            "resources": {
                "cache": {
                    "redis": {
                        "_id": "r1", "name": "redis", "type": "cache", "category": "cache",
                        "created": "dev", "author": "owner", "locked": false,
                        "plugged": true, "shared": true, "config": { "port": 6379 }
                    }
                }
            },
            "custom": {
                "flags": {
                    "_id": "c1", "name": "flags", "locked": false, "plugged": true,
                    "shared": false, "value": { "beta": true },
                    "created": "dev", "author": "owner"
                }
            }
        }))
    }

    #[test]
    fn reads_before_publish_fail_with_not_loaded() {
        let store = RegistryStore::new();
        assert!(!store.is_loaded());
        assert_eq!(store.current().unwrap_err(), RegistryError::NotLoaded);
        assert_eq!(store.service("auth").unwrap_err(), RegistryError::NotLoaded);
    }

    #[test]
    fn database_prefers_core_over_tenant() {
        let store = RegistryStore::with_snapshot(fixture());
        assert_eq!(store.database("main").unwrap().cluster, "core-cluster");
        assert_eq!(store.database("billing").unwrap().cluster, "tenant-cluster");
        assert!(matches!(
            store.database("ghost"),
            Err(RegistryError::DatabaseNotFound(name)) if name == "ghost"
        ));
    }

    #[test]
    fn all_databases_keeps_core_entry_on_collision() {
        let store = RegistryStore::with_snapshot(fixture());
        let all = store.all_databases().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["main"].cluster, "core-cluster");
    }

    #[test]
    fn resource_and_service_lookups() {
        let store = RegistryStore::with_snapshot(fixture());
        assert_eq!(store.resource("redis").unwrap().config["port"], json!(6379));
        assert!(store.resource("kafka").unwrap_err().is_not_found());
        assert_eq!(store.service("auth").unwrap().port, 4001);
        assert!(matches!(
            store.service("billing"),
            Err(RegistryError::ServiceNotFound(_))
        ));
    }

    #[test]
    fn custom_lookup_variants() {
        let store = RegistryStore::with_snapshot(fixture());
        match store.custom(None).unwrap() {
            CustomLookup::All(all) => assert_eq!(all, fixture().custom),
            other => panic!("期望完整映射，得到 {other:?}"),
        }
        assert!(matches!(
            store.custom(Some("flags")).unwrap(),
            CustomLookup::Entry(entry) if entry.value["beta"] == json!(true)
        ));
        assert_eq!(
            store.custom(Some("missing")).unwrap_err(),
            RegistryError::CustomNotFound(CustomMiss::Named("missing".into()))
        );

        let mut empty = fixture();
        empty.custom.clear();
        store.publish(empty);
        assert_eq!(
            store.custom(None).unwrap_err(),
            RegistryError::CustomNotFound(CustomMiss::Empty)
        );
    }

    #[test]
    fn publish_replaces_snapshot_and_old_arc_stays_intact() {
        let store = RegistryStore::with_snapshot(fixture());
        let before = store.current().unwrap();
        let mut next = fixture();
        next.name = "orders-v2".into();
        next.loaded_at = 20;
        store.publish(next);
        assert_eq!(before.name, "orders");
        assert_eq!(store.current().unwrap().name, "orders-v2");
    }
}
