use thiserror::Error;

/// # Summary
/// 资源解析错误枚举，覆盖 URI 解析、下载、文件写入与图标渲染。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
/// - 任何一个资源失败都会让整条通知放弃提交。
#[derive(Error, Debug)]
pub enum ResourceError {
    /// 未知 scheme 或格式错误的 URI
    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    /// 网络连接或传输错误
    #[error("Network error: {0}")]
    Network(String),

    /// 远端返回了非成功状态码
    #[error("HTTP status {status} for {uri}")]
    Status { uri: String, status: u16 },

    /// 资源超过平台允许的大小
    #[error("Resource too large: {uri} ({size} bytes, limit {limit})")]
    TooLarge { uri: String, size: u64, limit: u64 },

    /// 临时文件读写失败
    #[error("IO error: {0}")]
    Io(String),

    /// data URI 解码失败
    #[error("Decode error: {0}")]
    Decode(String),

    /// 图标字体中找不到可用字体
    #[error("Icon font not found: {0}")]
    FontNotFound(String),

    /// 图标渲染失败
    #[error("Render error: {0}")]
    Render(String),
}

impl From<std::io::Error> for ResourceError {
    fn from(value: std::io::Error) -> Self {
        ResourceError::Io(value.to_string())
    }
}
