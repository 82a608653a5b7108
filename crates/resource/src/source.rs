use crate::icon::IconSpec;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::PathBuf;
use toastbox_core::resource::error::ResourceError;
use url::Url;

/// # Summary
/// 资源 URI 的分类结果。
///
/// # Invariants
/// - 分类只做语法解析，不触碰网络或文件系统。
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// 本地路径或 `file:` URI，原样交给平台
    Local,
    /// http(s) 远程图片
    Remote(Url),
    /// `ms-appx:` / `ms-appdata:` 映射出的本地文件
    Mapped(PathBuf),
    /// `data:` URI 解码后的内容
    Inline(Vec<u8>),
    /// `icon://` 图标字体字形
    Icon(IconSpec),
}

/// # Summary
/// 解析资源 URI。
///
/// # Logic
/// 1. 没有 scheme，或 scheme 只有一个字符（Windows 盘符）时视为本地路径。
/// 2. 按 scheme 分派：`file`、`http(s)`、`ms-appx`、`ms-appdata`、`data`、`icon`。
/// 3. 其他 scheme 返回 `ResourceError::InvalidUri`。
///
/// # Arguments
/// * `uri` - 元素中的原始资源字符串。
///
/// # Returns
/// * 分类后的 `Source`。
pub fn classify(uri: &str) -> Result<Source, ResourceError> {
    let trimmed = uri.trim();
    if trimmed.is_empty() {
        return Err(ResourceError::InvalidUri("empty resource uri".to_string()));
    }
    let Some((scheme, rest)) = split_scheme(trimmed) else {
        return Ok(Source::Local);
    };

    match scheme.to_ascii_lowercase().as_str() {
        "file" => Ok(Source::Local),
        "http" | "https" => Url::parse(trimmed)
            .map(Source::Remote)
            .map_err(|e| ResourceError::InvalidUri(format!("{}: {}", uri, e))),
        "ms-appx" => {
            let cwd = std::env::current_dir()?;
            Ok(Source::Mapped(join_relative(cwd, strip_slashes(rest))))
        }
        "ms-appdata" => app_data_path(strip_slashes(rest))
            .map(Source::Mapped)
            .ok_or_else(|| ResourceError::InvalidUri(format!("Unknown app data location: \"{}\"", uri))),
        "data" => decode_data(rest).map(Source::Inline),
        "icon" => IconSpec::parse(strip_slashes(rest)).map(Source::Icon),
        _ => Err(ResourceError::InvalidUri(format!(
            "Unknown or invalid URI: \"{}\"",
            uri
        ))),
    }
}

fn split_scheme(uri: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = uri.split_once(':')?;
    let valid = scheme.len() > 1
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some((scheme, rest))
}

fn strip_slashes(rest: &str) -> &str {
    rest.trim_start_matches('/')
}

fn join_relative(base: PathBuf, relative: &str) -> PathBuf {
    relative
        .split(['/', '\\'])
        .filter(|part| !part.is_empty())
        .fold(base, |path, part| path.join(part))
}

/// `local/`、`roaming/`、`temp/` 分别映射到用户的本地、漫游与临时应用数据目录。
fn app_data_path(rest: &str) -> Option<PathBuf> {
    let env_dir = |name: &str| std::env::var_os(name).map(PathBuf::from);
    if let Some(p) = rest.strip_prefix("local/") {
        return env_dir("LOCALAPPDATA").map(|d| join_relative(d, p));
    }
    if let Some(p) = rest.strip_prefix("roaming/") {
        return env_dir("APPDATA").map(|d| join_relative(d, p));
    }
    if let Some(p) = rest.strip_prefix("temp/") {
        return env_dir("LOCALAPPDATA").map(|d| join_relative(d.join("Temp"), p));
    }
    None
}

fn decode_data(rest: &str) -> Result<Vec<u8>, ResourceError> {
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| ResourceError::Decode("data uri is missing ','".to_string()))?;
    if !meta.split(';').any(|part| part.eq_ignore_ascii_case("base64")) {
        return Err(ResourceError::Decode(
            "data uri must be base64 encoded".to_string(),
        ));
    }
    STANDARD
        .decode(payload.trim())
        .map_err(|e| ResourceError::Decode(e.to_string()))
}
