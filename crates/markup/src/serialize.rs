use crate::node::XmlNode;
use crate::validate::validate;
use chrono::SecondsFormat;
use std::collections::BTreeMap;
use toastbox_core::toast::element::{
    Button, Element, ElementSection, Group, Header, Image, Input, Progress, Select, Text,
};
use toastbox_core::toast::entity::Toast;
use toastbox_core::toast::error::ToastError;
use tracing::debug;

/// 进度条缺少状态文本时的占位值，schema 要求 `status` 属性必须存在。
const EMPTY_STATUS: &str = " ";
const DEFAULT_BASE_URI: &str = "file:///";

/// 序列化选项。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerializeOptions {
    // 强制静音，即使通知指定了系统声音
    pub mute_sound: bool,
}

/// 文档中引用的资源 URI。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    pub uri: String,
}

/// # Summary
/// 已校验、待渲染的通知文档。
///
/// # Invariants
/// - 可见元素与操作元素各自保持输入顺序，每个元素恰好对应一个节点。
/// - `resources` 按首次出现顺序去重。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markup {
    root: XmlNode,
    resources: Vec<ResourceRef>,
    custom_sound: Option<String>,
}

impl Markup {
    pub fn root(&self) -> &XmlNode {
        &self.root
    }

    pub fn resources(&self) -> &[ResourceRef] {
        &self.resources
    }

    /// 需要由宿主播放的自定义声音 URI（非系统声音）。
    pub fn custom_sound(&self) -> Option<&str> {
        self.custom_sound.as_deref()
    }

    /// `<binding>` 下的可见节点数。
    pub fn visual_count(&self) -> usize {
        self.root
            .find("binding")
            .map(|b| b.children.len())
            .unwrap_or(0)
    }

    /// `<actions>` 下的节点数。
    pub fn action_count(&self) -> usize {
        self.root
            .find("actions")
            .map(|a| a.children.len())
            .unwrap_or(0)
    }

    /// 元素节点总数（可见、操作与标题）。
    pub fn node_count(&self) -> usize {
        let headers = self
            .root
            .children
            .iter()
            .filter(|c| c.tag == "header")
            .count();
        self.visual_count() + self.action_count() + headers
    }

    /// # Summary
    /// 渲染为 XML 文本。
    ///
    /// # Arguments
    /// * `resolved` - 原始资源 URI 到文档中实际使用值的映射，缺失的资源保留原值。
    pub fn render(&self, resolved: &BTreeMap<String, String>) -> String {
        let mut out = String::new();
        self.root
            .write_to(&mut out, &|uri| resolved.get(uri).cloned());
        out
    }

    /// 不替换资源直接渲染。
    pub fn to_xml(&self) -> String {
        self.render(&BTreeMap::new())
    }
}

/// # Summary
/// 将通知序列化为 toast XML 文档树。
///
/// # Logic
/// 1. 先执行完整校验，任何违规直接返回，不产生文档。
/// 2. 按区域分拣元素：标题放在 `<toast>` 下首位，可见元素进入 `<visual><binding>`，
///    输入与按钮进入 `<actions>`（为空时省略）。
/// 3. 追加 `<audio>`：系统声音写入 `src`，静音、无声音或自定义声音时 `silent="true"`。
/// 4. 收集 `src` / `imageUri` 资源。
///
/// # Arguments
/// * `toast` - 待序列化的通知。
/// * `options` - 序列化选项。
///
/// # Returns
/// * 成功返回 `Markup`，校验失败返回 `ToastError::Validation`。
pub fn serialize(toast: &Toast, options: &SerializeOptions) -> Result<Markup, ToastError> {
    validate(toast)?;

    let mut headers = Vec::new();
    let mut visuals = Vec::new();
    let mut actions = Vec::new();
    let mut button_style = false;

    for element in &toast.elements {
        let node = element_node(element);
        match element.section() {
            ElementSection::Header => headers.push(node),
            ElementSection::Visual => visuals.push(node),
            ElementSection::Action => {
                if let Element::Button(button) = element {
                    button_style |= button.style.is_some();
                }
                actions.push(node);
            }
        }
    }

    let binding = visuals
        .into_iter()
        .fold(XmlNode::new("binding").attr("template", Some("ToastGeneric")), |b, n| {
            b.child(n)
        });
    let visual = XmlNode::new("visual")
        .attr(
            "baseUri",
            Some(toast.base_uri.as_deref().unwrap_or(DEFAULT_BASE_URI)),
        )
        .child(binding);

    let mut root = XmlNode::new("toast")
        .attr("launch", toast.arguments.as_deref())
        .attr("duration", toast.duration.map(|d| d.as_str()))
        .attr("scenario", toast.scenario.map(|s| s.as_str()))
        .attr(
            "displayTimestamp",
            toast
                .timestamp
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)),
        )
        .flag("useButtonStyle", button_style);
    for header in headers {
        root = root.child(header);
    }
    root = root.child(visual);
    if !actions.is_empty() {
        root = root.child(actions.into_iter().fold(XmlNode::new("actions"), |a, n| a.child(n)));
    }

    let system_sound = toast.sound.as_ref().filter(|s| s.is_system());
    let custom_sound = toast
        .sound
        .as_ref()
        .filter(|s| !s.is_system())
        .map(|s| s.uri());
    let silent = options.mute_sound || system_sound.is_none();
    root = root.child(
        XmlNode::new("audio")
            .attr("src", system_sound.map(|s| s.uri()))
            .flag("silent", silent)
            .flag("loop", toast.sound_loop),
    );

    let mut uris = Vec::new();
    root.resource_uris(&mut uris);
    let mut resources: Vec<ResourceRef> = Vec::with_capacity(uris.len());
    for uri in uris {
        if !resources.iter().any(|r| r.uri == uri) {
            resources.push(ResourceRef {
                uri: uri.to_string(),
            });
        }
    }

    debug!(
        "Serialized toast with {} elements and {} resources",
        toast.elements.len(),
        resources.len()
    );
    Ok(Markup {
        root,
        resources,
        custom_sound: if options.mute_sound {
            None
        } else {
            custom_sound
        },
    })
}

fn element_node(element: &Element) -> XmlNode {
    match element {
        Element::Text(text) => text_node(text),
        Element::Image(image) => image_node(image),
        Element::Progress(progress) => progress_node(progress),
        Element::Button(button) => button_node(button),
        Element::Header(header) => header_node(header),
        Element::Input(input) => input_node(input),
        Element::Select(select) => select_node(select),
        Element::Group(group) => group_node(group),
    }
}

fn text_node(text: &Text) -> XmlNode {
    XmlNode::new("text")
        .attr("id", text.id)
        .attr("placement", text.attribution.then_some("attribution"))
        .flag("hint-callScenarioCenterAlign", text.center)
        .attr("hint-align", text.align.map(|a| a.as_str()))
        .attr("hint-style", text.style.map(|s| s.as_str()))
        .attr("hint-maxLines", text.max_lines)
        .attr("hint-minLines", text.min_lines)
        .text(text.content.clone())
}

fn image_node(image: &Image) -> XmlNode {
    XmlNode::new("image")
        .attr("id", image.id)
        .resource("src", Some(image.source.as_str()))
        .attr("alt", image.alt.as_deref())
        .attr("placement", image.placement.map(|p| p.as_str()))
        .attr("hint-crop", image.circle.then_some("circle"))
}

fn progress_node(progress: &Progress) -> XmlNode {
    XmlNode::new("progress")
        .attr("title", progress.title.as_deref())
        .attr("value", Some(&progress.value))
        .attr(
            "status",
            Some(
                progress
                    .status
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .unwrap_or(EMPTY_STATUS),
            ),
        )
        .attr("valueStringOverride", progress.display_value.as_deref())
}

fn button_node(button: &Button) -> XmlNode {
    XmlNode::new("action")
        .attr("content", Some(&button.content))
        .attr("arguments", Some(&button.arguments))
        .attr(
            "activationType",
            Some(if button.protocol { "protocol" } else { "foreground" }),
        )
        .attr("placement", button.context_menu.then_some("contextMenu"))
        .resource("imageUri", button.icon.as_deref())
        .attr("hint-inputId", button.input_id.as_deref())
        .attr("hint-buttonStyle", button.style.map(|s| s.as_str()))
        .attr("hint-toolTip", button.tooltip.as_deref())
}

fn header_node(header: &Header) -> XmlNode {
    XmlNode::new("header")
        .attr("id", Some(&header.id))
        .attr("title", Some(&header.title))
        .attr("arguments", Some(&header.arguments))
        .attr("activationType", Some("foreground"))
}

fn input_node(input: &Input) -> XmlNode {
    XmlNode::new("input")
        .attr("type", Some("text"))
        .attr("id", Some(&input.id))
        .attr("title", input.title.as_deref())
        .attr("placeHolderContent", input.placeholder.as_deref())
        .attr("defaultInput", input.default.as_deref())
}

fn select_node(select: &Select) -> XmlNode {
    select.options.iter().fold(
        XmlNode::new("input")
            .attr("type", Some("selection"))
            .attr("id", Some(&select.id))
            .attr("title", select.title.as_deref())
            .attr("defaultInput", select.default.as_deref()),
        |node, option| {
            node.child(
                XmlNode::new("selection")
                    .attr("id", Some(&option.id))
                    .attr("content", Some(&option.content)),
            )
        },
    )
}

fn group_node(group: &Group) -> XmlNode {
    group.subgroups.iter().fold(XmlNode::new("group"), |node, subgroup| {
        node.child(
            subgroup
                .elements
                .iter()
                .fold(XmlNode::new("subgroup"), |sub, element| {
                    sub.child(element_node(element))
                }),
        )
    })
}
