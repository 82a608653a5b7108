use serde::{Deserialize, Deserializer, Serialize};

/// # Summary
/// 通知内容元素，按插入顺序决定渲染布局。
///
/// # Invariants
/// - `Group` 只能包含 `Subgroup`，`Subgroup` 只能包含 `Text` 与 `Image`。
/// - 字段组合的合法性由 markup 层在序列化前统一校验。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Text(Text),
    Image(Image),
    Progress(Progress),
    Button(Button),
    Header(Header),
    Input(Input),
    Select(Select),
    Group(Group),
}

/// 元素在文档中所属的区域。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementSection {
    // <visual><binding> 内
    Visual,
    // <actions> 内
    Action,
    // <toast> 下的 <header>
    Header,
}

impl Element {
    pub fn section(&self) -> ElementSection {
        match self {
            Element::Text(_) | Element::Image(_) | Element::Progress(_) | Element::Group(_) => {
                ElementSection::Visual
            }
            Element::Button(_) | Element::Input(_) | Element::Select(_) => ElementSection::Action,
            Element::Header(_) => ElementSection::Header,
        }
    }

    /// 元素类型名，与 JSON 中的 `type` 字段一致。
    pub fn name(&self) -> &'static str {
        match self {
            Element::Text(_) => "text",
            Element::Image(_) => "image",
            Element::Progress(_) => "progress",
            Element::Button(_) => "button",
            Element::Header(_) => "header",
            Element::Input(_) => "input",
            Element::Select(_) => "select",
            Element::Group(_) => "group",
        }
    }
}

macro_rules! impl_into_element {
    ($($ty:ident),*) => {
        $(impl From<$ty> for Element {
            fn from(value: $ty) -> Self {
                Element::$ty(value)
            }
        })*
    };
}

impl_into_element!(Text, Image, Progress, Button, Header, Input, Select, Group);

/// # Summary
/// 文本元素。`content` 支持绑定占位符。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub content: String,
    pub id: Option<u32>,
    // 仅在 group/subgroup 内生效
    pub style: Option<TextStyle>,
    pub align: Option<TextAlign>,
    // 显示在通知底部的归属文本
    #[serde(default)]
    pub attribution: bool,
    // 仅在 INCOMING_CALL 场景中生效
    #[serde(default)]
    pub center: bool,
    pub max_lines: Option<u32>,
    pub min_lines: Option<u32>,
}

impl Text {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_style(mut self, style: TextStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.align = Some(align);
        self
    }

    pub fn attribution(mut self) -> Self {
        self.attribution = true;
        self
    }

    pub fn centered(mut self) -> Self {
        self.center = true;
        self
    }

    pub fn with_max_lines(mut self, lines: u32) -> Self {
        self.max_lines = Some(lines);
        self
    }

    pub fn with_min_lines(mut self, lines: u32) -> Self {
        self.min_lines = Some(lines);
        self
    }
}

/// # Summary
/// 图片元素。`source` 是资源 URI，提交前由资源解析器转换为本地文件。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub source: String,
    pub id: Option<u32>,
    pub alt: Option<String>,
    pub placement: Option<ImagePlacement>,
    // 裁剪为圆形
    #[serde(default)]
    pub circle: bool,
}

impl Image {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        self.alt = Some(alt.into());
        self
    }

    pub fn with_placement(mut self, placement: ImagePlacement) -> Self {
        self.placement = Some(placement);
        self
    }

    pub fn circle(mut self) -> Self {
        self.circle = true;
        self
    }
}

/// 进度条不确定状态（加载动画）在文档中的取值。
pub const PROGRESS_INDETERMINATE: &str = "indeterminate";

/// # Summary
/// 进度条元素，所有字段均支持绑定占位符。
///
/// # Invariants
/// - 字面量 `value` 必须是 `[0, 1]` 区间的小数或 `indeterminate`。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    #[serde(deserialize_with = "progress_value")]
    pub value: String,
    pub status: Option<String>,
    pub title: Option<String>,
    // 替代默认百分比文本
    pub display_value: Option<String>,
}

impl Progress {
    /// 使用字面量或占位符（如 `{progress}`）创建进度条。
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    /// 使用 `[0, 1]` 区间的小数创建进度条，`-1` 表示不确定状态。
    pub fn fraction(value: f64) -> Self {
        if value < 0.0 {
            Self::indeterminate()
        } else {
            Self::new(value.to_string())
        }
    }

    pub fn indeterminate() -> Self {
        Self::new(PROGRESS_INDETERMINATE)
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_display_value(mut self, display_value: impl Into<String>) -> Self {
        self.display_value = Some(display_value.into());
        self
    }
}

// JSON 中的进度值既可能是数字也可能是字符串
fn progress_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(n) if n < 0.0 => PROGRESS_INDETERMINATE.to_string(),
        Raw::Number(n) => n.to_string(),
        Raw::Text(s) => s,
    })
}

/// # Summary
/// 按钮元素。
///
/// # Invariants
/// - `input_id` 若存在，必须指向同一通知中的 `Input` 或 `Select`。
/// - `protocol` 为真时 `arguments` 应为可启动的 URI。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Button {
    pub content: String,
    pub arguments: String,
    // 放入右上角上下文菜单而非按钮栏
    #[serde(default)]
    pub context_menu: bool,
    pub icon: Option<String>,
    pub input_id: Option<String>,
    pub style: Option<ButtonStyle>,
    pub tooltip: Option<String>,
    #[serde(default)]
    pub protocol: bool,
}

impl Button {
    pub fn new(content: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            arguments: arguments.into(),
            ..Self::default()
        }
    }

    pub fn context_menu(mut self) -> Self {
        self.context_menu = true;
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_input(mut self, input_id: impl Into<String>) -> Self {
        self.input_id = Some(input_id.into());
        self
    }

    pub fn with_style(mut self, style: ButtonStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    pub fn protocol(mut self) -> Self {
        self.protocol = true;
        self
    }
}

/// # Summary
/// 操作中心分组标题。相同 `id` 的通知显示在同一标题下。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub id: String,
    pub title: String,
    pub arguments: String,
}

impl Header {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            arguments: arguments.into(),
        }
    }
}

/// 文本输入框。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Input {
    pub id: String,
    pub placeholder: Option<String>,
    pub title: Option<String>,
    pub default: Option<String>,
}

impl Input {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// # Summary
/// 下拉选择框。
///
/// # Invariants
/// - `options` 非空且 id 唯一，按插入顺序渲染。
/// - `default` 若存在，必须是某个选项的 id。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Select {
    pub id: String,
    pub options: Vec<SelectOption>,
    pub title: Option<String>,
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub id: String,
    pub content: String,
}

impl Select {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn option(mut self, id: impl Into<String>, content: impl Into<String>) -> Self {
        self.options.push(SelectOption {
            id: id.into(),
            content: content.into(),
        });
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// # Summary
/// 列布局分组，每个 `Subgroup` 渲染为一列。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub subgroups: Vec<Subgroup>,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, subgroup: Subgroup) -> Self {
        self.subgroups.push(subgroup);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subgroup {
    pub elements: Vec<Element>,
}

impl Subgroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, element: impl Into<Element>) -> Self {
        self.elements.push(element.into());
        self
    }
}

/// 自适应文本样式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextStyle {
    Default,
    Caption,
    CaptionSubtle,
    Body,
    BodySubtle,
    Base,
    BaseSubtle,
    Subtitle,
    SubtitleSubtle,
    Title,
    TitleSubtle,
    TitleNumeral,
    Subheader,
    SubheaderSubtle,
    SubheaderNumeral,
    Header,
    HeaderSubtle,
    HeaderNumeral,
}

impl TextStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextStyle::Default => "default",
            TextStyle::Caption => "caption",
            TextStyle::CaptionSubtle => "captionSubtle",
            TextStyle::Body => "body",
            TextStyle::BodySubtle => "bodySubtle",
            TextStyle::Base => "base",
            TextStyle::BaseSubtle => "baseSubtle",
            TextStyle::Subtitle => "subtitle",
            TextStyle::SubtitleSubtle => "subtitleSubtle",
            TextStyle::Title => "title",
            TextStyle::TitleSubtle => "titleSubtle",
            TextStyle::TitleNumeral => "titleNumeral",
            TextStyle::Subheader => "subheader",
            TextStyle::SubheaderSubtle => "subheaderSubtle",
            TextStyle::SubheaderNumeral => "subheaderNumeral",
            TextStyle::Header => "header",
            TextStyle::HeaderSubtle => "headerSubtle",
            TextStyle::HeaderNumeral => "headerNumeral",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Auto,
    Left,
    Center,
    Right,
}

impl TextAlign {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextAlign::Auto => "auto",
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ButtonStyle {
    Success,
    Critical,
}

impl ButtonStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ButtonStyle::Success => "Success",
            ButtonStyle::Critical => "Critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImagePlacement {
    // 左侧应用图标位置
    Logo,
    // 顶部横幅大图
    Hero,
}

impl ImagePlacement {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImagePlacement::Logo => "appLogoOverride",
            ImagePlacement::Hero => "hero",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_from_json() {
        let json = r#"[
            {"type": "text", "content": "Hello", "style": "baseSubtle"},
            {"type": "progress", "value": 0.25, "status": "Loading"},
            {"type": "progress", "value": -1},
            {"type": "select", "id": "s", "options": [{"id": "a", "content": "A"}], "default": "a"}
        ]"#;
        let elements: Vec<Element> = serde_json::from_str(json).unwrap();

        assert_eq!(
            elements[0],
            Element::Text(Text::new("Hello").with_style(TextStyle::BaseSubtle))
        );
        match &elements[1] {
            Element::Progress(p) => assert_eq!(p.value, "0.25"),
            other => panic!("unexpected element: {:?}", other),
        }
        match &elements[2] {
            Element::Progress(p) => assert_eq!(p.value, PROGRESS_INDETERMINATE),
            other => panic!("unexpected element: {:?}", other),
        }
        assert_eq!(elements[3].section(), ElementSection::Action);
    }

    #[test]
    fn test_progress_fraction() {
        assert_eq!(Progress::fraction(0.5).value, "0.5");
        assert_eq!(Progress::fraction(-1.0).value, PROGRESS_INDETERMINATE);
    }
}
