use toastbox_core::resource::port::{
    Contrast, StaticTheme, Theme, ThemeInfo, ThemeProvider,
};
use tracing::debug;
use windows::System::UserProfile::GlobalizationPreferences;
use windows::UI::ViewManagement::{AccessibilitySettings, UIColorType, UISettings};

/// # Summary
/// 读取系统外观设置的主题供给器。
///
/// # Logic
/// 1. 背景色为纯黑时视为深色主题。
/// 2. 对比度取自辅助功能设置。
/// 3. 语言取用户首选语言列表的第一项，转为小写。
/// 4. 任一查询失败时退回固定的浅色 / en-us 设置。
#[derive(Debug, Clone, Copy, Default)]
pub struct WinRtTheme;

impl WinRtTheme {
    fn query() -> windows::core::Result<ThemeInfo> {
        let background = UISettings::new()?.GetColorValue(UIColorType::Background)?;
        let luminance =
            u16::from(background.R) + u16::from(background.G) + u16::from(background.B);
        let high_contrast = AccessibilitySettings::new()?.HighContrast()?;
        let languages = GlobalizationPreferences::Languages()?;
        let lang = if languages.Size()? > 0 {
            languages.GetAt(0)?.to_string_lossy().to_lowercase()
        } else {
            "en-us".to_string()
        };
        Ok(ThemeInfo {
            contrast: if high_contrast {
                Contrast::High
            } else {
                Contrast::Standard
            },
            lang,
            theme: if luminance == 0 {
                Theme::Dark
            } else {
                Theme::Light
            },
        })
    }
}

impl ThemeProvider for WinRtTheme {
    fn theme(&self) -> ThemeInfo {
        Self::query().unwrap_or_else(|e| {
            debug!("Falling back to default theme: {}", e.message());
            StaticTheme::default().theme()
        })
    }
}
