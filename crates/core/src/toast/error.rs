use crate::identity::error::IdentityError;
use crate::resource::error::ResourceError;
use thiserror::Error;

/// # Summary
/// 通知域错误枚举，覆盖校验、资源、平台提交与身份管理失败。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
/// - `Validation` 与 `Resource` 错误发生时通知绝不会被提交到平台。
#[derive(Error, Debug)]
pub enum ToastError {
    /// 元素字段组合非法或绑定占位符格式错误
    #[error("Validation error: {0}")]
    Validation(String),

    /// 资源下载或渲染失败
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    /// 平台拒绝了通知文档
    #[error("Platform error ({code:#010x}): {message}")]
    Platform { code: i32, message: String },

    /// 当前系统或会话中不存在通知服务
    #[error("Notification platform unavailable: {0}")]
    Unavailable(String),

    /// 目标通知从未显示过，无法更新或隐藏
    #[error("Toast has not been shown")]
    NotShown,

    /// 身份注册表操作失败
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),
}

impl ToastError {
    /// 构造一个校验错误。
    pub fn validation(message: impl Into<String>) -> Self {
        ToastError::Validation(message.into())
    }
}
