use async_trait::async_trait;
use dashmap::DashMap;
use toastbox_core::identity::entity::Identity;
use toastbox_core::identity::error::IdentityError;
use toastbox_core::identity::port::IdentityStore;

/// # Summary
/// 基于 DashMap 的内存身份存储，用于测试与非 Windows 环境。
///
/// # Invariants
/// - 进程退出后数据丢失。
pub struct MemIdentityStore {
    records: DashMap<String, Identity>,
}

impl MemIdentityStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }
}

impl Default for MemIdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityStore for MemIdentityStore {
    async fn get(&self, id: &str) -> Result<Option<Identity>, IdentityError> {
        Ok(self.records.get(id).map(|r| r.value().clone()))
    }

    async fn put(&self, identity: &Identity) -> Result<(), IdentityError> {
        self.records.insert(identity.id.clone(), identity.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, IdentityError> {
        Ok(self.records.remove(id).is_some())
    }

    async fn list(&self) -> Result<Vec<Identity>, IdentityError> {
        let mut all: Vec<Identity> = self.records.iter().map(|r| r.value().clone()).collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }
}
