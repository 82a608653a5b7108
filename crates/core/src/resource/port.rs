use serde::{Deserialize, Serialize};

/// 系统对比度设置。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Contrast {
    Standard,
    High,
}

/// 系统主题。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

/// # Summary
/// 系统外观信息，在下载远程图片时作为查询参数附带给服务器。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeInfo {
    pub contrast: Contrast,
    // 小写 BCP-47 语言标签，例如 en-us
    pub lang: String,
    pub theme: Theme,
}

impl ThemeInfo {
    /// # Summary
    /// 转换为平台约定的查询参数。
    ///
    /// # Returns
    /// * `ms-contrast`、`ms-lang`、`ms-theme` 三个键值对，顺序固定。
    pub fn query_params(&self) -> [(&'static str, String); 3] {
        [
            (
                "ms-contrast",
                match self.contrast {
                    Contrast::Standard => "standard",
                    Contrast::High => "high",
                }
                .to_string(),
            ),
            ("ms-lang", self.lang.clone()),
            (
                "ms-theme",
                match self.theme {
                    Theme::Light => "light",
                    Theme::Dark => "dark",
                }
                .to_string(),
            ),
        ]
    }
}

/// # Summary
/// 系统外观信息供给接口。
///
/// # Invariants
/// - 实现必须线程安全，解析器会在并发下载时调用。
pub trait ThemeProvider: Send + Sync {
    fn theme(&self) -> ThemeInfo;
}

/// # Summary
/// 固定返回同一组外观信息的供给器，用于非 Windows 环境与测试。
#[derive(Debug, Clone)]
pub struct StaticTheme(pub ThemeInfo);

impl Default for StaticTheme {
    fn default() -> Self {
        Self(ThemeInfo {
            contrast: Contrast::Standard,
            lang: "en-us".to_string(),
            theme: Theme::Light,
        })
    }
}

impl ThemeProvider for StaticTheme {
    fn theme(&self) -> ThemeInfo {
        self.0.clone()
    }
}
