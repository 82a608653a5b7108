use std::collections::HashSet;
use toastbox_core::toast::binding::placeholder_key;
use toastbox_core::toast::element::{
    Button, Element, PROGRESS_INDETERMINATE, Progress, Select, Subgroup,
};
use toastbox_core::toast::entity::Toast;
use toastbox_core::toast::error::ToastError;

/// 按钮栏最多显示的按钮数（不含上下文菜单项）。
pub const MAX_BUTTONS: usize = 5;
/// 最多允许的输入框与下拉框总数。
pub const MAX_INPUTS: usize = 5;

/// # Summary
/// 校验通知的元素与字段组合。
///
/// # Logic
/// 1. 收集所有输入框 / 下拉框 id，检查非空与唯一。
/// 2. 逐个校验元素自身字段；只有进度值这类“绑定或数值”字段检查占位符格式，
///    文本字段中的花括号一律按字面量处理。
/// 3. 检查按钮引用的 `input_id` 存在、标题唯一、数量上限。
///
/// # Arguments
/// * `toast` - 待校验的通知。
///
/// # Returns
/// * 第一个违反的规则对应的 `ToastError::Validation`。
pub fn validate(toast: &Toast) -> Result<(), ToastError> {
    let mut input_ids = HashSet::new();
    for element in &toast.elements {
        let id = match element {
            Element::Input(input) => &input.id,
            Element::Select(select) => &select.id,
            _ => continue,
        };
        if id.is_empty() {
            return Err(ToastError::validation(format!(
                "{} element requires an id",
                element.name()
            )));
        }
        if !input_ids.insert(id.as_str()) {
            return Err(ToastError::validation(format!("Duplicate input id \"{}\"", id)));
        }
    }
    if input_ids.len() > MAX_INPUTS {
        return Err(ToastError::validation(format!(
            "At most {} inputs are allowed, got {}",
            MAX_INPUTS,
            input_ids.len()
        )));
    }

    let mut headers = 0;
    let mut buttons = 0;
    for element in &toast.elements {
        match element {
            Element::Text(_) => {}
            Element::Image(image) => {
                if image.source.trim().is_empty() {
                    return Err(ToastError::validation("image element requires a source"));
                }
            }
            Element::Progress(progress) => validate_progress(progress)?,
            Element::Button(button) => {
                validate_button(button, &input_ids)?;
                if !button.context_menu {
                    buttons += 1;
                }
            }
            Element::Header(header) => {
                headers += 1;
                if header.id.is_empty() {
                    return Err(ToastError::validation("header element requires an id"));
                }
            }
            Element::Input(_) => {}
            Element::Select(select) => validate_select(select)?,
            Element::Group(group) => {
                if group.subgroups.is_empty() {
                    return Err(ToastError::validation(
                        "group element requires at least one subgroup",
                    ));
                }
                for subgroup in &group.subgroups {
                    validate_subgroup(subgroup)?;
                }
            }
        }
    }

    if headers > 1 {
        return Err(ToastError::validation("Only one header element is allowed"));
    }
    if buttons > MAX_BUTTONS {
        return Err(ToastError::validation(format!(
            "At most {} buttons are allowed, got {}",
            MAX_BUTTONS, buttons
        )));
    }
    Ok(())
}

fn validate_progress(progress: &Progress) -> Result<(), ToastError> {
    if placeholder_key(&progress.value)?.is_none() && progress.value != PROGRESS_INDETERMINATE {
        let valid = progress
            .value
            .parse::<f64>()
            .map(|v| (0.0..=1.0).contains(&v))
            .unwrap_or(false);
        if !valid {
            return Err(ToastError::validation(format!(
                "Progress value must be between 0 and 1, \"{}\" or a binding, got \"{}\"",
                PROGRESS_INDETERMINATE, progress.value
            )));
        }
    }
    Ok(())
}

fn validate_button(button: &Button, input_ids: &HashSet<&str>) -> Result<(), ToastError> {
    if button.content.is_empty() && button.icon.is_none() && button.tooltip.is_none() {
        return Err(ToastError::validation(
            "button element requires content, an icon or a tooltip",
        ));
    }
    if let Some(input_id) = &button.input_id {
        if !input_ids.contains(input_id.as_str()) {
            return Err(ToastError::validation(format!(
                "Button \"{}\" references unknown input \"{}\"",
                button.content, input_id
            )));
        }
        if button.context_menu {
            return Err(ToastError::validation(
                "Context menu buttons can't be placed beside an input",
            ));
        }
    }
    Ok(())
}

fn validate_select(select: &Select) -> Result<(), ToastError> {
    if select.options.is_empty() {
        return Err(ToastError::validation(format!(
            "Select \"{}\" requires at least one option",
            select.id
        )));
    }
    let mut seen = HashSet::new();
    for option in &select.options {
        if !seen.insert(option.id.as_str()) {
            return Err(ToastError::validation(format!(
                "Select \"{}\" has duplicate option \"{}\"",
                select.id, option.id
            )));
        }
    }
    if let Some(default) = &select.default
        && !seen.contains(default.as_str())
    {
        return Err(ToastError::validation(format!(
            "Select \"{}\" default \"{}\" is not one of its options",
            select.id, default
        )));
    }
    Ok(())
}

fn validate_subgroup(subgroup: &Subgroup) -> Result<(), ToastError> {
    for element in &subgroup.elements {
        match element {
            Element::Text(_) => {}
            Element::Image(image) => {
                if image.source.trim().is_empty() {
                    return Err(ToastError::validation("image element requires a source"));
                }
            }
            other => {
                return Err(ToastError::validation(format!(
                    "Subgroups may only contain text and image elements, got {}",
                    other.name()
                )));
            }
        }
    }
    Ok(())
}
