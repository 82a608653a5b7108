/// # Summary
/// XML 属性。`resource` 为真的属性值是资源 URI，渲染时替换为本地文件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub name: &'static str,
    pub value: String,
    pub resource: bool,
}

/// # Summary
/// 轻量的 XML 节点树，只覆盖 toast schema 需要的子集。
///
/// # Invariants
/// - 属性按添加顺序输出，值为 `None` 的属性不会被添加。
/// - 文本与属性值在输出时统一转义。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlNode {
    pub tag: &'static str,
    pub attrs: Vec<Attr>,
    pub text: Option<String>,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            attrs: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// 添加可选属性，`None` 时跳过。
    pub fn attr<T: ToString>(mut self, name: &'static str, value: Option<T>) -> Self {
        if let Some(value) = value {
            self.attrs.push(Attr {
                name,
                value: value.to_string(),
                resource: false,
            });
        }
        self
    }

    /// 布尔标记属性，仅在为真时输出 `"true"`。
    pub fn flag(self, name: &'static str, on: bool) -> Self {
        self.attr(name, on.then_some("true"))
    }

    /// 资源属性，渲染时按解析结果替换。
    pub fn resource(mut self, name: &'static str, uri: Option<&str>) -> Self {
        if let Some(uri) = uri {
            self.attrs.push(Attr {
                name,
                value: uri.to_string(),
                resource: true,
            });
        }
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn child(mut self, child: XmlNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// 深度优先查找第一个指定标签的节点。
    pub fn find(&self, tag: &str) -> Option<&XmlNode> {
        if self.tag == tag {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(tag))
    }

    /// 深度优先遍历全部资源属性值。
    pub fn resource_uris<'a>(&'a self, out: &mut Vec<&'a str>) {
        for attr in self.attrs.iter().filter(|a| a.resource) {
            out.push(&attr.value);
        }
        for child in &self.children {
            child.resource_uris(out);
        }
    }

    /// # Summary
    /// 输出 XML 文本。
    ///
    /// # Arguments
    /// * `out` - 输出缓冲。
    /// * `resolve` - 资源属性的替换函数，返回 `None` 时保留原值。
    pub fn write_to(&self, out: &mut String, resolve: &dyn Fn(&str) -> Option<String>) {
        out.push('<');
        out.push_str(self.tag);
        for attr in &self.attrs {
            let value = if attr.resource {
                resolve(&attr.value).unwrap_or_else(|| attr.value.clone())
            } else {
                attr.value.clone()
            };
            out.push(' ');
            out.push_str(attr.name);
            out.push_str("=\"");
            out.push_str(&escape(&value, true));
            out.push('"');
        }
        if self.text.is_none() && self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        if let Some(text) = &self.text {
            out.push_str(&escape(text, false));
        }
        for child in &self.children {
            child.write_to(out, resolve);
        }
        out.push_str("</");
        out.push_str(self.tag);
        out.push('>');
    }
}

/// XML 转义，属性值额外转义引号。
pub fn escape(value: &str, attribute: bool) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' if attribute => escaped.push_str("&quot;"),
            '\'' if attribute => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
