use crate::identity::entity::Identity;
use crate::identity::error::IdentityError;
use async_trait::async_trait;

/// # Summary
/// 持久化身份记录的窄存储接口 (Port)。
///
/// # Invariants
/// - 记录以 `id` 为键，作用域为当前用户，无需提权。
/// - `put` 覆盖同名记录，`delete` 对不存在的键是幂等的。
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// # Summary
    /// 按 id 查询身份记录。
    ///
    /// # Returns
    /// 存在则返回 `Some(Identity)`，否则返回 `None`。
    async fn get(&self, id: &str) -> Result<Option<Identity>, IdentityError>;

    /// # Summary
    /// 写入或覆盖身份记录。
    async fn put(&self, identity: &Identity) -> Result<(), IdentityError>;

    /// # Summary
    /// 删除身份记录。
    ///
    /// # Returns
    /// 删除了记录返回 `true`，记录本不存在返回 `false`。
    async fn delete(&self, id: &str) -> Result<bool, IdentityError>;

    /// 列出全部身份记录，按 id 排序。
    async fn list(&self) -> Result<Vec<Identity>, IdentityError>;
}
