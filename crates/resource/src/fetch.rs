use reqwest::Client;
use reqwest::redirect::Policy;
use std::time::Duration;
use toastbox_core::config::ResourceConfig;
use toastbox_core::resource::error::ResourceError;
use tracing::{debug, info};
use url::Url;

/// # Summary
/// 远程图片下载器。
///
/// # Invariants
/// - 单个响应体不超过 `max_bytes`，超出时立即中止读取。
/// - 重定向次数受配置限制。
pub struct Fetcher {
    client: Client,
    max_bytes: u64,
}

impl Fetcher {
    /// # Summary
    /// 根据资源配置构建 HTTP 客户端。
    ///
    /// # Logic
    /// 1. 安装 ring 作为 rustls 的进程级加密后端（已安装时跳过）。
    /// 2. 配置超时、重定向上限与 User-Agent。
    ///
    /// # Arguments
    /// * `config` - 资源配置。
    ///
    /// # Returns
    /// * 客户端构建失败时返回 `ResourceError::Network`。
    pub fn new(config: &ResourceConfig) -> Result<Self, ResourceError> {
        if rustls::crypto::ring::default_provider()
            .install_default()
            .is_err()
        {
            debug!("rustls crypto provider already installed");
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .redirect(Policy::limited(config.max_redirects))
            .user_agent(concat!("toastbox/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ResourceError::Network(e.to_string()))?;
        Ok(Self {
            client,
            max_bytes: config.max_download_bytes,
        })
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// # Summary
    /// 下载完整响应体。
    ///
    /// # Logic
    /// 1. 非 2xx 状态返回 `ResourceError::Status`。
    /// 2. `Content-Length` 已超限时不读取响应体。
    /// 3. 分块读取并累计大小，超限返回 `ResourceError::TooLarge`。
    ///
    /// # Arguments
    /// * `url` - 最终请求地址（已附加查询参数）。
    ///
    /// # Returns
    /// * 响应体字节。
    pub async fn fetch(&self, url: &Url) -> Result<Vec<u8>, ResourceError> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ResourceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResourceError::Status {
                uri: url.to_string(),
                status: status.as_u16(),
            });
        }
        if let Some(length) = response.content_length()
            && length > self.max_bytes
        {
            return Err(ResourceError::TooLarge {
                uri: url.to_string(),
                size: length,
                limit: self.max_bytes,
            });
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ResourceError::Network(e.to_string()))?
        {
            body.extend_from_slice(&chunk);
            let size = u64::try_from(body.len()).unwrap_or(u64::MAX);
            if size > self.max_bytes {
                return Err(ResourceError::TooLarge {
                    uri: url.to_string(),
                    size,
                    limit: self.max_bytes,
                });
            }
        }
        info!("Downloaded {} bytes from {}", body.len(), url);
        Ok(body)
    }
}
