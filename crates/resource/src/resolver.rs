use crate::fetch::Fetcher;
use crate::icon::IconRenderer;
use crate::source::{Source, classify};
use dashmap::DashMap;
use futures::future::try_join_all;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use toastbox_core::config::ResourceConfig;
use toastbox_core::resource::error::ResourceError;
use toastbox_core::resource::port::ThemeProvider;
use toastbox_core::toast::entity::Toast;
use tracing::{debug, warn};
use url::Url;

/// 单次解析的选项，来自通知设置。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    // 允许下载 http(s) 资源，关闭时远程 URI 原样保留
    pub remote: bool,
    // 下载时附带 ms-contrast / ms-lang / ms-theme
    pub query_params: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            remote: true,
            query_params: false,
        }
    }
}

impl ResolveOptions {
    pub fn for_toast(toast: &Toast) -> Self {
        Self {
            remote: toast.remote_media,
            query_params: toast.add_query_params,
        }
    }
}

/// # Summary
/// 资源解析结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedSource {
    /// 平台可以直接读取的原始值
    Unchanged(String),
    /// 本地文件（下载、解码、渲染或映射得到）
    File(PathBuf),
}

impl ResolvedSource {
    /// 写入文档的值：文件转换为 `file:///` URI，其余保持原样。
    pub fn markup_value(&self) -> String {
        match self {
            ResolvedSource::Unchanged(value) => value.clone(),
            ResolvedSource::File(path) => file_uri(path),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            ResolvedSource::File(path) => Some(path),
            ResolvedSource::Unchanged(_) => None,
        }
    }

    /// # Summary
    /// 结果对应的本地文件路径。
    ///
    /// # Logic
    /// 1. 生成的文件直接返回。
    /// 2. 原样保留的 `file:` URI 转换为路径，普通路径原样返回。
    /// 3. 未下载的远程 URI 没有本地路径。
    pub fn local_path(&self) -> Option<PathBuf> {
        match self {
            ResolvedSource::File(path) => Some(path.clone()),
            ResolvedSource::Unchanged(value) => match Url::parse(value) {
                Ok(url) if url.scheme() == "file" => url.to_file_path().ok(),
                Ok(url) if url.scheme().len() > 1 => None,
                _ => Some(PathBuf::from(value)),
            },
        }
    }
}

/// 已解析资源集合，键为原始 URI。
pub type ResolvedResources = BTreeMap<String, ResolvedSource>;

/// 将解析结果转换为文档替换表。
pub fn markup_values(resolved: &ResolvedResources) -> BTreeMap<String, String> {
    resolved
        .iter()
        .map(|(uri, source)| (uri.clone(), source.markup_value()))
        .collect()
}

/// 本地路径转换为 `file:///` URI。
pub fn file_uri(path: &Path) -> String {
    Url::from_file_path(path)
        .map(|url| url.to_string())
        .unwrap_or_else(|_| format!("file:///{}", path.to_string_lossy().replace('\\', "/")))
}

/// # Summary
/// 资源解析器，进程内共享，为每条通知创建独立的会话目录。
///
/// # Invariants
/// - 所有会话目录位于 `root` 之下。
/// - HTTP 客户端与图标字体在会话之间复用。
pub struct ResourceResolver {
    root: PathBuf,
    fetcher: Arc<Fetcher>,
    icons: Arc<IconRenderer>,
    theme: Arc<dyn ThemeProvider>,
}

impl ResourceResolver {
    /// # Summary
    /// 创建资源解析器。
    ///
    /// # Arguments
    /// * `config` - 资源配置（缓存目录、下载上限、图标字体）。
    /// * `theme` - 下载时附加查询参数所用的主题来源。
    pub fn new(
        config: &ResourceConfig,
        theme: Arc<dyn ThemeProvider>,
    ) -> Result<Self, ResourceError> {
        Ok(Self {
            root: config.cache_root(),
            fetcher: Arc::new(Fetcher::new(config)?),
            icons: Arc::new(IconRenderer::new(config.icon_font.clone(), config.icon_size)),
            theme,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// # Summary
    /// 为一条通知创建临时会话。
    ///
    /// # Logic
    /// 1. 确保缓存根目录存在。
    /// 2. 在根目录下创建随机命名的子目录，会话关闭时整体删除。
    pub fn session(&self) -> Result<ResourceSession, ResourceError> {
        std::fs::create_dir_all(&self.root)?;
        let dir = tempfile::Builder::new()
            .prefix("toast-")
            .tempdir_in(&self.root)?;
        debug!("Created resource session {}", dir.path().display());
        Ok(ResourceSession {
            path: dir.path().to_path_buf(),
            dir: Some(dir),
            fetcher: self.fetcher.clone(),
            icons: self.icons.clone(),
            theme: self.theme.clone(),
            resolved: DashMap::new(),
        })
    }
}

/// # Summary
/// 单条通知的资源会话，持有该通知生成的全部临时文件。
///
/// # Invariants
/// - 文件名为内容来源的 SHA-256，同一来源并发写入结果一致。
/// - 关闭或丢弃时删除整个目录，删除失败只记录日志。
pub struct ResourceSession {
    dir: Option<TempDir>,
    path: PathBuf,
    fetcher: Arc<Fetcher>,
    icons: Arc<IconRenderer>,
    theme: Arc<dyn ThemeProvider>,
    resolved: DashMap<String, ResolvedSource>,
}

impl ResourceSession {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// # Summary
    /// 解析单个资源 URI。
    ///
    /// # Logic
    /// 1. 命中会话缓存时直接返回。
    /// 2. 本地路径原样返回；映射 URI 返回映射后的路径。
    /// 3. 远程资源在允许时下载，`data:` 解码，`icon://` 渲染，结果写入会话目录。
    ///    下载与 `data:` 内容都受同一个字节上限约束。
    ///
    /// # Arguments
    /// * `uri` - 原始资源 URI。
    /// * `options` - 解析选项。
    ///
    /// # Returns
    /// * 解析结果，失败时返回对应的 `ResourceError`。
    pub async fn resolve(
        &self,
        uri: &str,
        options: &ResolveOptions,
    ) -> Result<ResolvedSource, ResourceError> {
        if let Some(hit) = self.resolved.get(uri) {
            return Ok(hit.value().clone());
        }
        let resolved = match classify(uri)? {
            Source::Local => ResolvedSource::Unchanged(uri.to_string()),
            Source::Mapped(path) => ResolvedSource::File(path),
            Source::Remote(_) if !options.remote => ResolvedSource::Unchanged(uri.to_string()),
            Source::Remote(mut url) => {
                if options.query_params {
                    let theme = self.theme.theme();
                    let mut pairs = url.query_pairs_mut();
                    for (key, value) in theme.query_params() {
                        pairs.append_pair(key, &value);
                    }
                }
                let key = url.to_string();
                let bytes = self.fetcher.fetch(&url).await?;
                ResolvedSource::File(self.write(&key, &bytes).await?)
            }
            Source::Inline(bytes) => {
                let size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
                let limit = self.fetcher.max_bytes();
                if size > limit {
                    let label = uri.split_once(',').map_or(uri, |(head, _)| head);
                    return Err(ResourceError::TooLarge {
                        uri: label.to_string(),
                        size,
                        limit,
                    });
                }
                ResolvedSource::File(self.write(uri, &bytes).await?)
            }
            Source::Icon(spec) => {
                let png = self.icons.render(&spec).await?;
                ResolvedSource::File(self.write(uri, &png).await?)
            }
        };
        self.resolved.insert(uri.to_string(), resolved.clone());
        Ok(resolved)
    }

    /// # Summary
    /// 并发解析多个 URI，任一失败则整体失败。
    pub async fn resolve_all<'a, I>(
        &self,
        uris: I,
        options: &ResolveOptions,
    ) -> Result<ResolvedResources, ResourceError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let tasks = uris.into_iter().map(|uri| async move {
            self.resolve(uri, options)
                .await
                .map(|source| (uri.to_string(), source))
        });
        Ok(try_join_all(tasks).await?.into_iter().collect())
    }

    /// # Summary
    /// 导入调用方提供的媒体字节，返回会话内的文件路径。
    pub async fn import(&self, bytes: &[u8]) -> Result<PathBuf, ResourceError> {
        let digest = hex::encode(Sha256::digest(bytes));
        self.write(&digest, bytes).await
    }

    /// 删除会话目录。
    pub fn close(mut self) {
        self.cleanup();
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> Result<PathBuf, ResourceError> {
        let path = self.path.join(hex::encode(Sha256::digest(key.as_bytes())));
        tokio::fs::write(&path, bytes).await?;
        debug!("Stored {} bytes at {}", bytes.len(), path.display());
        Ok(path)
    }

    fn cleanup(&mut self) {
        self.resolved.clear();
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            match dir.close() {
                Ok(()) => debug!("Removed resource session {}", path.display()),
                Err(e) => warn!("Failed to remove resource session {}: {}", path.display(), e),
            }
        }
    }
}

impl Drop for ResourceSession {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toastbox_core::resource::port::StaticTheme;

    fn resolver(root: &Path) -> ResourceResolver {
        let config = ResourceConfig {
            cache_dir: Some(root.to_path_buf()),
            ..ResourceConfig::default()
        };
        ResourceResolver::new(&config, Arc::new(StaticTheme::default())).unwrap()
    }

    #[tokio::test]
    async fn test_local_and_remote_disabled_are_unchanged() {
        let root = tempfile::tempdir().unwrap();
        let session = resolver(root.path()).session().unwrap();
        let options = ResolveOptions {
            remote: false,
            query_params: false,
        };
        assert_eq!(
            session.resolve("C:\\a.png", &options).await.unwrap(),
            ResolvedSource::Unchanged("C:\\a.png".to_string())
        );
        assert_eq!(
            session
                .resolve("https://example.com/a.png", &options)
                .await
                .unwrap()
                .markup_value(),
            "https://example.com/a.png"
        );
    }

    #[tokio::test]
    async fn test_import_and_close_removes_files() {
        let root = tempfile::tempdir().unwrap();
        let session = resolver(root.path()).session().unwrap();
        let dir = session.path().to_path_buf();
        let path = session.import(b"RIFF....WAVE").await.unwrap();
        assert!(path.starts_with(&dir));
        assert_eq!(std::fs::read(&path).unwrap(), b"RIFF....WAVE");

        session.close();
        assert!(!dir.exists());
        assert!(!path.exists());
    }

    #[test]
    fn test_local_path() {
        let file = std::env::temp_dir().join("ding.wav");
        assert_eq!(
            ResolvedSource::File(file.clone()).local_path(),
            Some(file.clone())
        );
        assert_eq!(
            ResolvedSource::Unchanged("sounds/ding.wav".to_string()).local_path(),
            Some(PathBuf::from("sounds/ding.wav"))
        );
        assert_eq!(
            ResolvedSource::Unchanged(file_uri(&file)).local_path(),
            Some(file)
        );
        assert_eq!(
            ResolvedSource::Unchanged("https://example.com/ding.wav".to_string()).local_path(),
            None
        );
    }

    #[test]
    fn test_file_uri() {
        let path = std::env::temp_dir().join("a b.png");
        let uri = file_uri(&path);
        assert!(uri.starts_with("file:///"));
        assert!(uri.ends_with("a%20b.png"));
    }
}
