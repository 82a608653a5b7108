use crate::identity::error::IdentityError;
use serde::{Deserialize, Serialize};

/// 身份 id 的最大长度（平台限制）。
pub const MAX_IDENTITY_ID_LEN: usize = 129;

/// # Summary
/// 应用身份 (AUMID)，决定通知上显示的来源名称与图标。
///
/// # Invariants
/// - `id` 满足 [`validate_id`] 的约束。
/// - 不被任何通知持有，通知只通过 id 引用。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub display_name: String,
    // 图标文件路径或 URI
    pub icon_uri: Option<String>,
    // ARGB 十六进制，不含 '#'
    pub icon_background: String,
    pub show_in_settings: bool,
    // COM 激活器 CLSID，形如 {XXXXXXXX-...}
    pub activator: String,
}

/// # Summary
/// 校验身份 id。
///
/// # Logic
/// 1. 不能为空。
/// 2. 长度不超过 129 个字符。
/// 3. 不能包含反斜杠（会被当作注册表子键分隔符）。
///
/// # Arguments
/// * `id` - 待校验的身份 id。
///
/// # Returns
/// * 非法时返回 `IdentityError::InvalidId`。
pub fn validate_id(id: &str) -> Result<(), IdentityError> {
    if id.trim().is_empty() {
        return Err(IdentityError::InvalidId("id can't be empty".to_string()));
    }
    if id.chars().count() > MAX_IDENTITY_ID_LEN {
        return Err(IdentityError::InvalidId(format!(
            "maximum allowed characters is {}",
            MAX_IDENTITY_ID_LEN
        )));
    }
    if id.contains('\\') {
        return Err(IdentityError::InvalidId(format!(
            "\"{}\" contains a backslash",
            id
        )));
    }
    Ok(())
}
