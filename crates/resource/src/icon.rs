use ab_glyph::{Font, FontRef, PxScale, ScaleFont};
use image::{ImageFormat, Pixel, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use toastbox_core::resource::error::ResourceError;
use tokio::sync::OnceCell;
use tracing::debug;

const DEFAULT_FOREGROUND: [u8; 4] = [0, 0, 0, 255];
const DEFAULT_BACKGROUND: [u8; 4] = [0, 0, 0, 0];
const MAX_CANVAS: u32 = 1024;

// Windows 11 自带 Fluent，Windows 10 自带 MDL2
const ICON_FONT_FILES: [&str; 2] = ["SegoeIcons.ttf", "segmdl2.ttf"];

/// # Summary
/// `icon://<hex>?foreground=..&background=..&padding=..` 描述的字形图标。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconSpec {
    pub codepoint: char,
    pub foreground: [u8; 4],
    pub background: [u8; 4],
    pub padding: u32,
}

impl IconSpec {
    /// # Summary
    /// 解析去掉 scheme 后的图标 URI。
    ///
    /// # Logic
    /// 1. 路径部分是十六进制码点，允许 `U+` / `0x` 前缀。
    /// 2. 查询参数不按片段拆分，`#RRGGBB` 可以不转义。
    ///
    /// # Arguments
    /// * `rest` - `icon://` 之后的部分。
    ///
    /// # Returns
    /// * 解析失败返回 `ResourceError::InvalidUri`。
    pub fn parse(rest: &str) -> Result<Self, ResourceError> {
        let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
        let hex_value = path.trim_end_matches('/');
        let hex_value = hex_value
            .strip_prefix("U+")
            .or_else(|| hex_value.strip_prefix("u+"))
            .or_else(|| hex_value.strip_prefix("0x"))
            .unwrap_or(hex_value);
        let codepoint = u32::from_str_radix(hex_value, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| {
                ResourceError::InvalidUri(format!(
                    "Icon uri path needs to be a hexadecimal code point: \"{}\"",
                    rest
                ))
            })?;

        let mut spec = IconSpec {
            codepoint,
            foreground: DEFAULT_FOREGROUND,
            background: DEFAULT_BACKGROUND,
            padding: 0,
        };
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "foreground" => spec.foreground = parse_color(&value)?,
                "background" => spec.background = parse_color(&value)?,
                "padding" => {
                    spec.padding = value.parse().map_err(|_| {
                        ResourceError::InvalidUri(format!("Invalid icon padding \"{}\"", value))
                    })?
                }
                _ => {}
            }
        }
        Ok(spec)
    }
}

/// 解析 `#RRGGBB` 或 `#RRGGBBAA`。
pub fn parse_color(value: &str) -> Result<[u8; 4], ResourceError> {
    let digits = value.trim().trim_start_matches('#');
    let bytes = hex::decode(digits)
        .map_err(|e| ResourceError::InvalidUri(format!("Invalid color \"{}\": {}", value, e)))?;
    match bytes.as_slice() {
        [r, g, b] => Ok([*r, *g, *b, 255]),
        [r, g, b, a] => Ok([*r, *g, *b, *a]),
        _ => Err(ResourceError::InvalidUri(format!(
            "Color must be #RRGGBB or #RRGGBBAA, got \"{}\"",
            value
        ))),
    }
}

/// # Summary
/// 从图标字体渲染 PNG。字体文件在首次使用时读取并在进程内复用。
pub struct IconRenderer {
    configured: Option<PathBuf>,
    size: u32,
    font: OnceCell<Arc<Vec<u8>>>,
}

impl IconRenderer {
    pub fn new(configured: Option<PathBuf>, size: u32) -> Self {
        Self {
            configured,
            size,
            font: OnceCell::new(),
        }
    }

    /// # Summary
    /// 渲染图标为 PNG 字节。
    ///
    /// # Logic
    /// 1. 懒加载字体文件。
    /// 2. 在阻塞线程池中光栅化，避免占用异步工作线程。
    pub async fn render(&self, spec: &IconSpec) -> Result<Vec<u8>, ResourceError> {
        let font = self
            .font
            .get_or_try_init(|| async {
                let path = self.locate()?;
                debug!("Loading icon font from {}", path.display());
                tokio::fs::read(&path)
                    .await
                    .map(Arc::new)
                    .map_err(|e| ResourceError::FontNotFound(format!("{}: {}", path.display(), e)))
            })
            .await?
            .clone();
        let spec = spec.clone();
        let size = self.size;
        tokio::task::spawn_blocking(move || rasterize(&spec, &font, size))
            .await
            .map_err(|e| ResourceError::Render(e.to_string()))?
    }

    fn locate(&self) -> Result<PathBuf, ResourceError> {
        if let Some(path) = &self.configured {
            return if path.is_file() {
                Ok(path.clone())
            } else {
                Err(ResourceError::FontNotFound(path.display().to_string()))
            };
        }
        let mut dirs = Vec::new();
        if let Some(windir) = std::env::var_os("WINDIR") {
            dirs.push(PathBuf::from(windir).join("Fonts"));
        }
        if let Some(local) = std::env::var_os("LOCALAPPDATA") {
            dirs.push(
                PathBuf::from(local)
                    .join("Microsoft")
                    .join("Windows")
                    .join("Fonts"),
            );
        }
        ICON_FONT_FILES
            .iter()
            .flat_map(|file| dirs.iter().map(move |dir| dir.join(file)))
            .find(|path| path.is_file())
            .ok_or_else(|| {
                ResourceError::FontNotFound("Couldn't find an available icon font".to_string())
            })
    }
}

// 像素坐标与覆盖率之间的浮点换算
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn rasterize(spec: &IconSpec, font_data: &[u8], size: u32) -> Result<Vec<u8>, ResourceError> {
    let font =
        FontRef::try_from_slice(font_data).map_err(|e| ResourceError::Render(e.to_string()))?;
    let glyph_id = font.glyph_id(spec.codepoint);
    if glyph_id.0 == 0 {
        return Err(ResourceError::Render(format!(
            "Icon font has no glyph for U+{:04X}",
            u32::from(spec.codepoint)
        )));
    }
    let canvas = size
        .checked_add(spec.padding)
        .filter(|c| *c > 0 && *c <= MAX_CANVAS)
        .ok_or_else(|| ResourceError::Render(format!("Icon size must be within {} px", MAX_CANVAS)))?;

    // 字形比画布宽时缩小字号
    let mut scale = size as f32;
    let advance = font.as_scaled(PxScale::from(scale)).h_advance(glyph_id);
    if advance > scale {
        scale = (scale - (advance - scale) / 2.0 - (size / 12) as f32).max(1.0);
    }
    let outlined = font
        .outline_glyph(glyph_id.with_scale(scale))
        .ok_or_else(|| ResourceError::Render("Icon glyph has no outline".to_string()))?;
    let bounds = outlined.px_bounds();
    let left = ((canvas as f32 - bounds.width()) / 2.0).floor() as i64;
    let top = ((canvas as f32 - bounds.height()) / 2.0).floor() as i64;

    let [r, g, b, a] = spec.foreground;
    let mut image = RgbaImage::from_pixel(canvas, canvas, Rgba(spec.background));
    outlined.draw(|x, y, coverage| {
        let (Ok(px), Ok(py)) = (
            u32::try_from(left + i64::from(x)),
            u32::try_from(top + i64::from(y)),
        ) else {
            return;
        };
        if px >= canvas || py >= canvas {
            return;
        }
        let alpha = (f32::from(a) * coverage.clamp(0.0, 1.0)).round() as u8;
        image.get_pixel_mut(px, py).blend(&Rgba([r, g, b, alpha]));
    });

    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| ResourceError::Render(e.to_string()))?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_icon_spec() {
        let spec = IconSpec::parse("E710?foreground=%23FFFFFF&background=#0078D4CC&padding=8").unwrap();
        assert_eq!(spec.codepoint, '\u{E710}');
        assert_eq!(spec.foreground, [255, 255, 255, 255]);
        assert_eq!(spec.background, [0x00, 0x78, 0xD4, 0xCC]);
        assert_eq!(spec.padding, 8);

        let spec = IconSpec::parse("U+E83F").unwrap();
        assert_eq!(spec.foreground, DEFAULT_FOREGROUND);
        assert_eq!(spec.background, DEFAULT_BACKGROUND);
    }

    #[test]
    fn test_parse_icon_spec_errors() {
        assert!(IconSpec::parse("xyz").is_err());
        assert!(IconSpec::parse("E710?foreground=red").is_err());
        assert!(IconSpec::parse("E710?padding=-1").is_err());
        assert!(IconSpec::parse("D800").is_err());
    }

    // 单个方形字形，映射到 U+E700 与 'A'，外框 (100,100)-(900,900)，unitsPerEm 1000
    fn square_font() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/square.ttf")
    }

    #[tokio::test]
    async fn test_render_glyph_with_colors_and_padding() {
        let renderer = IconRenderer::new(Some(square_font()), 64);
        let spec =
            IconSpec::parse("E700?foreground=#FFFFFF&background=#F7630C&padding=16").unwrap();
        let png = renderer.render(&spec).await.unwrap();

        let image = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(image.dimensions(), (80, 80));
        assert_eq!(image.get_pixel(0, 0).0, [0xF7, 0x63, 0x0C, 0xFF]);
        assert_eq!(image.get_pixel(79, 79).0, [0xF7, 0x63, 0x0C, 0xFF]);
        assert_eq!(image.get_pixel(40, 40).0, [0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[tokio::test]
    async fn test_render_default_colors_keep_transparent_corners() {
        let renderer = IconRenderer::new(Some(square_font()), 32);
        let png = renderer.render(&IconSpec::parse("41").unwrap()).await.unwrap();

        let image = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(image.dimensions(), (32, 32));
        assert_eq!(image.get_pixel(0, 0).0, DEFAULT_BACKGROUND);
        assert_eq!(image.get_pixel(16, 16).0, DEFAULT_FOREGROUND);
    }

    #[tokio::test]
    async fn test_render_errors() {
        let renderer = IconRenderer::new(Some(square_font()), 64);
        assert!(matches!(
            renderer.render(&IconSpec::parse("E701").unwrap()).await,
            Err(ResourceError::Render(_))
        ));

        let oversized = IconRenderer::new(Some(square_font()), MAX_CANVAS);
        assert!(matches!(
            oversized.render(&IconSpec::parse("E700?padding=1").unwrap()).await,
            Err(ResourceError::Render(_))
        ));
        assert!(
            oversized
                .render(&IconSpec::parse("E700").unwrap())
                .await
                .is_ok()
        );

        let empty = IconRenderer::new(Some(square_font()), 0);
        assert!(matches!(
            empty.render(&IconSpec::parse("E700").unwrap()).await,
            Err(ResourceError::Render(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_configured_font() {
        let renderer = IconRenderer::new(Some(PathBuf::from("/definitely/missing.ttf")), 64);
        let spec = IconSpec::parse("E710").unwrap();
        assert!(matches!(
            renderer.render(&spec).await,
            Err(ResourceError::FontNotFound(_))
        ));
    }
}
