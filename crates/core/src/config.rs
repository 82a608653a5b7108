use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 平台允许的单个图片最大字节数 (3 MiB)。
pub const DEFAULT_MAX_DOWNLOAD_BYTES: u64 = 3 * 1024 * 1024;

/// 全局应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub identity: IdentityConfig,
    pub resource: ResourceConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    // 为空时使用当前可执行文件路径
    pub default_app_id: Option<String>,
    // SQLite 身份库路径，为空时使用系统注册表 (Windows) 或内存存储
    pub store_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    // 为空时使用系统临时目录下的 toastbox 子目录
    pub cache_dir: Option<PathBuf>,
    pub max_download_bytes: u64,
    pub request_timeout_secs: u64,
    pub max_redirects: usize,
    // 图标字形的像素尺寸（不含内边距）
    pub icon_size: u32,
    // 为空时自动查找 Segoe Fluent Icons / Segoe MDL2 Assets
    pub icon_font: Option<PathBuf>,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            max_download_bytes: DEFAULT_MAX_DOWNLOAD_BYTES,
            request_timeout_secs: 10,
            max_redirects: 3,
            icon_size: 64,
            icon_font: None,
        }
    }
}

impl ResourceConfig {
    /// 解析后的缓存根目录。
    pub fn cache_root(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("toastbox"))
    }
}

impl IdentityConfig {
    /// # Summary
    /// 解析默认身份。
    ///
    /// # Logic
    /// 1. 优先使用配置中的 `default_app_id`。
    /// 2. 否则使用当前可执行文件的绝对路径，平台会把它显示为来源应用。
    /// 3. 都无法获取时退回固定名称。
    ///
    /// # Returns
    /// * 默认身份 id。
    pub fn resolve_default_app_id(&self) -> String {
        if let Some(id) = self.default_app_id.as_ref().filter(|id| !id.is_empty()) {
            return id.clone();
        }
        std::env::current_exe()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "toastbox".to_string())
    }
}
