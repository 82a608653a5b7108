use crate::toast::error::ToastError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 绑定占位符的起止分隔符。
pub const BINDING_OPEN: char = '{';
pub const BINDING_CLOSE: char = '}';

/// # Summary
/// 绑定表：键名到当前字符串值的映射，在显示与更新时提交给平台。
///
/// # Invariants
/// - 所有值在写入时即转换为字符串，平台只接受字符串数据。
/// - 未被任何元素引用的键会被平台忽略。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bindings(BTreeMap<String, String>);

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入一个绑定值，已存在的键会被覆盖。
    pub fn set(&mut self, key: impl Into<String>, value: impl ToString) -> &mut Self {
        self.0.insert(key.into(), value.to_string());
        self
    }

    /// 链式构造版本的 [`Bindings::set`]。
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// # Summary
    /// 将另一张绑定表合并进来。
    ///
    /// # Logic
    /// 1. 逐项覆盖写入，`other` 中的值优先。
    ///
    /// # Arguments
    /// * `other` - 新的绑定值。
    pub fn merge(&mut self, other: &Bindings) {
        for (k, v) in other.iter() {
            self.0.insert(k.to_string(), v.to_string());
        }
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for Bindings {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut bindings = Bindings::new();
        for (k, v) in iter {
            bindings.set(k, v);
        }
        bindings
    }
}

/// # Summary
/// 解析“绑定或类型化字面量”字段（如进度值）中的绑定占位符。
///
/// 普通文本不经过这里：文本中的花括号是字面量，平台只替换整体为 `{key}` 的值。
///
/// # Logic
/// 1. 既不以 `{` 开头也不以 `}` 结尾的值视为字面量，返回 `None`。
/// 2. 形如 `{key}` 且 key 非空、不含空白与花括号的值返回 `Some(key)`。
/// 3. 其余情况（只有一侧分隔符、空键等）视为格式错误。
///
/// # Arguments
/// * `value` - 元素字段的原始字符串。
///
/// # Returns
/// * `Ok(Some(key))` - 合法占位符。
/// * `Ok(None)` - 字面量。
/// * `Err(ToastError::Validation)` - 占位符格式错误。
pub fn placeholder_key(value: &str) -> Result<Option<&str>, ToastError> {
    let opens = value.starts_with(BINDING_OPEN);
    let closes = value.ends_with(BINDING_CLOSE);
    if !opens && !closes {
        return Ok(None);
    }
    let inner = value
        .strip_prefix(BINDING_OPEN)
        .and_then(|v| v.strip_suffix(BINDING_CLOSE))
        .ok_or_else(|| {
            ToastError::validation(format!("Malformed binding placeholder: \"{}\"", value))
        })?;
    let valid = !inner.is_empty()
        && !inner
            .chars()
            .any(|c| c.is_whitespace() || c == BINDING_OPEN || c == BINDING_CLOSE);
    if !valid {
        return Err(ToastError::validation(format!(
            "Malformed binding placeholder: \"{}\"",
            value
        )));
    }
    Ok(Some(inner))
}
