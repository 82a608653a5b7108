use async_trait::async_trait;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::fs;
use std::path::Path;
use toastbox_core::identity::entity::Identity;
use toastbox_core::identity::error::IdentityError;
use toastbox_core::identity::port::IdentityStore;
use tracing::info;

type IdentityRow = (String, String, Option<String>, String, bool, String);

fn from_row(r: IdentityRow) -> Identity {
    Identity {
        id: r.0,
        display_name: r.1,
        icon_uri: r.2,
        icon_background: r.3,
        show_in_settings: r.4,
        activator: r.5,
    }
}

/// IdentityStore 的 SQLite 实现。
///
/// # Summary
/// 在单个 SQLite 文件中持久化身份记录，适用于没有注册表的平台或需要便携配置的场景。
///
/// # Invariants
/// * 表结构在存储实例创建时初始化。
/// * 所有操作均通过共享的 `SqlitePool` 执行。
pub struct SqliteIdentityStore {
    pool: SqlitePool,
}

impl SqliteIdentityStore {
    /// # Summary
    /// 打开指定路径的身份库。
    ///
    /// # Logic
    /// 1. 配置 SQLite 连接选项，开启 `create_if_missing`。
    /// 2. 连接到数据库并执行 DDL 初始化 `identities` 表。
    ///
    /// # Arguments
    /// * `path` - 数据库文件路径。
    ///
    /// # Returns
    /// * `Result<Self, IdentityError>` - 存储实例或数据库错误。
    pub async fn open(path: &Path) -> Result<Self, IdentityError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| IdentityError::Storage(e.to_string()))?;
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| IdentityError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS identities (
                id TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                icon_uri TEXT,
                icon_background TEXT NOT NULL,
                show_in_settings BOOLEAN NOT NULL,
                activator TEXT NOT NULL
            );
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| IdentityError::Storage(e.to_string()))?;

        info!("Opened identity store at {}", path.display());
        Ok(Self { pool })
    }
}

#[async_trait]
impl IdentityStore for SqliteIdentityStore {
    async fn get(&self, id: &str) -> Result<Option<Identity>, IdentityError> {
        let row = sqlx::query_as::<_, IdentityRow>(
            "SELECT id, display_name, icon_uri, icon_background, show_in_settings, activator \
             FROM identities WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| IdentityError::Storage(e.to_string()))?;
        Ok(row.map(from_row))
    }

    /// # Summary
    /// 保存或覆盖身份记录。
    ///
    /// # Logic
    /// 在 `identities` 表上执行 `INSERT OR REPLACE`。
    async fn put(&self, identity: &Identity) -> Result<(), IdentityError> {
        sqlx::query(
            "INSERT OR REPLACE INTO identities \
             (id, display_name, icon_uri, icon_background, show_in_settings, activator) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&identity.id)
        .bind(&identity.display_name)
        .bind(&identity.icon_uri)
        .bind(&identity.icon_background)
        .bind(identity.show_in_settings)
        .bind(&identity.activator)
        .execute(&self.pool)
        .await
        .map_err(|e| IdentityError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, IdentityError> {
        let result = sqlx::query("DELETE FROM identities WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| IdentityError::Storage(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<Identity>, IdentityError> {
        let rows = sqlx::query_as::<_, IdentityRow>(
            "SELECT id, display_name, icon_uri, icon_background, show_in_settings, activator \
             FROM identities ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| IdentityError::Storage(e.to_string()))?;
        Ok(rows.into_iter().map(from_row).collect())
    }
}
