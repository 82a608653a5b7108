use std::sync::Arc;
use toastbox_core::identity::entity::{Identity, validate_id};
use toastbox_core::identity::port::IdentityStore;
use toastbox_core::toast::error::ToastError;
use tracing::info;
use uuid::Uuid;

/// 未指定图标背景时使用的颜色（全透明）。
pub const DEFAULT_ICON_BACKGROUND: &str = "00000000";

/// 注册身份的请求。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterRequest {
    pub id: String,
    // 为空时与 id 相同
    pub display_name: Option<String>,
    pub icon_uri: Option<String>,
    // ARGB 十六进制，可带 '#'
    pub icon_background: Option<String>,
    pub show_in_settings: bool,
}

impl RegisterRequest {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            icon_uri: None,
            icon_background: None,
            show_in_settings: true,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_icon(mut self, icon_uri: impl Into<String>) -> Self {
        self.icon_uri = Some(icon_uri.into());
        self
    }

    pub fn with_icon_background(mut self, color: impl Into<String>) -> Self {
        self.icon_background = Some(color.into());
        self
    }

    pub fn hidden_from_settings(mut self) -> Self {
        self.show_in_settings = false;
        self
    }
}

/// # Summary
/// 规范化图标背景色。
///
/// # Logic
/// 1. 去掉前导 '#'。
/// 2. 6 位 RGB 补全为不透明的 ARGB。
/// 3. 结果必须是 8 位十六进制。
fn normalize_background(color: Option<&str>) -> Result<String, ToastError> {
    let Some(color) = color.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(DEFAULT_ICON_BACKGROUND.to_string());
    };
    let hex = color.trim_start_matches('#');
    let argb = if hex.len() == 6 {
        format!("FF{}", hex)
    } else {
        hex.to_string()
    };
    if argb.len() != 8 || !argb.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ToastError::validation(format!(
            "icon background \"{}\" is not an ARGB hex color",
            color
        )));
    }
    Ok(argb.to_ascii_uppercase())
}

/// # Summary
/// 应用身份 (AUMID) 管理服务。
///
/// # Invariants
/// - 重复注册同一 id 会覆盖名称与图标，并生成新的激活器 GUID。
/// - 已显示的通知不会因为重新注册而改变来源名称或图标。
pub struct IdentityManager {
    store: Arc<dyn IdentityStore>,
}

impl IdentityManager {
    pub fn new(store: Arc<dyn IdentityStore>) -> Arc<Self> {
        Arc::new(Self { store })
    }

    /// # Summary
    /// 注册或覆盖一个身份。
    ///
    /// # Logic
    /// 1. 校验 id 与图标背景色。
    /// 2. 显示名称缺省为 id。
    /// 3. 生成 `{XXXXXXXX-XXXX-...}` 形式的激活器 CLSID。
    /// 4. 写入身份存储。
    ///
    /// # Arguments
    /// * `request` - 注册请求。
    ///
    /// # Returns
    /// * 注册成功的 id。
    pub async fn register(&self, request: RegisterRequest) -> Result<String, ToastError> {
        validate_id(&request.id)?;
        let identity = Identity {
            display_name: request
                .display_name
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| request.id.clone()),
            icon_uri: request.icon_uri.filter(|uri| !uri.is_empty()),
            icon_background: normalize_background(request.icon_background.as_deref())?,
            show_in_settings: request.show_in_settings,
            activator: format!("{{{}}}", Uuid::new_v4().to_string().to_uppercase()),
            id: request.id,
        };
        self.store.put(&identity).await?;
        info!(
            "Registered identity {} as \"{}\"",
            identity.id, identity.display_name
        );
        Ok(identity.id)
    }

    /// # Summary
    /// 注销身份。
    ///
    /// # Returns
    /// * `true` - 删除了记录；`false` - 该 id 本未注册。
    pub async fn unregister(&self, id: &str) -> Result<bool, ToastError> {
        validate_id(id)?;
        let removed = self.store.delete(id).await?;
        if removed {
            info!("Unregistered identity {}", id);
        }
        Ok(removed)
    }

    pub async fn lookup(&self, id: &str) -> Result<Option<Identity>, ToastError> {
        validate_id(id)?;
        Ok(self.store.get(id).await?)
    }

    pub async fn list(&self) -> Result<Vec<Identity>, ToastError> {
        Ok(self.store.list().await?)
    }
}
