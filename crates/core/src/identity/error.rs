use thiserror::Error;

/// # Summary
/// 身份存储层错误枚举。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
#[derive(Error, Debug)]
pub enum IdentityError {
    /// 身份 id 为空、过长或包含非法字符
    #[error("Invalid identity id: {0}")]
    InvalidId(String),
    /// 底层存储读写失败
    #[error("Storage error: {0}")]
    Storage(String),
    /// 记录未找到
    #[error("Identity not found: {0}")]
    NotFound(String),
}
