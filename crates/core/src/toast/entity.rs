use crate::toast::binding::Bindings;
use crate::toast::element::Element;
use crate::toast::error::ToastError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// # Summary
/// 通知聚合根：有序元素序列加通知级设置。
///
/// # Invariants
/// - 提交后的文档不可变，之后只能通过绑定表更新声明过占位符的字段。
/// - `update()` 需要 `tag`，平台按 (tag, group) 定位已显示的通知。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Toast {
    pub elements: Vec<Element>,
    // 点击通知本体时回传给应用的启动参数
    pub arguments: Option<String>,
    pub duration: Option<Duration>,
    // 覆盖平台默认的显示时间戳
    pub timestamp: Option<DateTime<Utc>>,
    pub scenario: Option<Scenario>,
    pub group: Option<String>,
    pub tag: Option<String>,
    // false 时静默放入操作中心
    pub show_popup: bool,
    // 相对路径图片的基准 URI
    pub base_uri: Option<String>,
    pub sound: Option<Sound>,
    pub sound_loop: bool,
    // 允许 http(s) 图片源
    pub remote_media: bool,
    // 下载远程图片时附带 ms-contrast / ms-lang / ms-theme 查询参数
    pub add_query_params: bool,
    pub expiration: Option<DateTime<Utc>>,
    // 为空时使用全局默认身份
    pub app_id: Option<String>,
}

impl Default for Toast {
    fn default() -> Self {
        Self {
            elements: Vec::new(),
            arguments: None,
            duration: None,
            timestamp: None,
            scenario: None,
            group: None,
            tag: None,
            show_popup: true,
            base_uri: None,
            sound: Some(Sound::Default),
            sound_loop: false,
            remote_media: true,
            add_query_params: false,
            expiration: None,
            app_id: None,
        }
    }
}

impl Toast {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Summary
    /// 从 JSON 文本构造通知。
    ///
    /// # Logic
    /// 1. 使用 serde 反序列化，缺省字段取 `Default` 中的值。
    ///
    /// # Arguments
    /// * `json` - 包含 `elements` 数组及通知设置的 JSON。
    ///
    /// # Returns
    /// * 解析失败时返回 `ToastError::Validation`。
    pub fn from_json(json: &str) -> Result<Self, ToastError> {
        serde_json::from_str(json).map_err(|e| ToastError::Validation(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, ToastError> {
        serde_json::to_string(self).map_err(|e| ToastError::Validation(e.to_string()))
    }

    pub fn push(&mut self, element: impl Into<Element>) -> &mut Self {
        self.elements.push(element.into());
        self
    }

    /// 链式添加元素。
    pub fn with(mut self, element: impl Into<Element>) -> Self {
        self.elements.push(element.into());
        self
    }

    pub fn remove(&mut self, index: usize) -> Option<Element> {
        (index < self.elements.len()).then(|| self.elements.remove(index))
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn with_arguments(mut self, arguments: impl Into<String>) -> Self {
        self.arguments = Some(arguments.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_scenario(mut self, scenario: Scenario) -> Self {
        self.scenario = Some(scenario);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_sound(mut self, sound: Option<Sound>) -> Self {
        self.sound = sound;
        self
    }

    pub fn looping(mut self) -> Self {
        self.sound_loop = true;
        self
    }

    pub fn silent_popup(mut self) -> Self {
        self.show_popup = false;
        self
    }

    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }

    pub fn with_query_params(mut self) -> Self {
        self.add_query_params = true;
        self
    }

    pub fn local_media_only(mut self) -> Self {
        self.remote_media = false;
        self
    }

    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = Some(expiration);
        self
    }

    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Duration {
    Short,
    Long,
}

impl Duration {
    pub fn as_str(&self) -> &'static str {
        match self {
            Duration::Short => "short",
            Duration::Long => "long",
        }
    }
}

/// 通知场景，影响默认声音、超时与是否预展开。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Scenario {
    Reminder,
    Alarm,
    IncomingCall,
    Urgent,
}

impl Scenario {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Reminder => "reminder",
            Scenario::Alarm => "alarm",
            Scenario::IncomingCall => "incomingCall",
            Scenario::Urgent => "urgent",
        }
    }
}

const WINSOUND_PREFIX: &str = "ms-winsoundevent:";

/// # Summary
/// 通知声音。系统声音由平台播放，`Custom` 为任意文件或 URI，由宿主自行播放。
///
/// # Invariants
/// - 循环声音编号范围为 1..=10。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Sound {
    Default,
    Im,
    Mail,
    Reminder,
    Sms,
    LoopingAlarm(u8),
    LoopingCall(u8),
    Custom(String),
}

impl Sound {
    /// 平台识别的 URI 字符串。
    pub fn uri(&self) -> String {
        let looping = |name: &str, n: u8| {
            if n <= 1 {
                format!("{}Notification.Looping.{}", WINSOUND_PREFIX, name)
            } else {
                format!("{}Notification.Looping.{}{}", WINSOUND_PREFIX, name, n)
            }
        };
        match self {
            Sound::Default => format!("{}Notification.Default", WINSOUND_PREFIX),
            Sound::Im => format!("{}Notification.IM", WINSOUND_PREFIX),
            Sound::Mail => format!("{}Notification.Mail", WINSOUND_PREFIX),
            Sound::Reminder => format!("{}Notification.Reminder", WINSOUND_PREFIX),
            Sound::Sms => format!("{}Notification.SMS", WINSOUND_PREFIX),
            Sound::LoopingAlarm(n) => looping("Alarm", *n),
            Sound::LoopingCall(n) => looping("Call", *n),
            Sound::Custom(uri) => uri.clone(),
        }
    }

    /// 是否为平台内置的系统声音。
    pub fn is_system(&self) -> bool {
        !matches!(self, Sound::Custom(uri) if !uri.starts_with(WINSOUND_PREFIX))
    }
}

impl From<Sound> for String {
    fn from(value: Sound) -> Self {
        value.uri()
    }
}

impl From<String> for Sound {
    fn from(value: String) -> Self {
        let Some(name) = value.strip_prefix(WINSOUND_PREFIX) else {
            return Sound::Custom(value);
        };
        let looping = |rest: &str| -> Option<u8> {
            if rest.is_empty() {
                Some(1)
            } else {
                rest.parse::<u8>().ok().filter(|n| (2..=10).contains(n))
            }
        };
        let parsed = match name {
            "Notification.Default" => Some(Sound::Default),
            "Notification.IM" => Some(Sound::Im),
            "Notification.Mail" => Some(Sound::Mail),
            "Notification.Reminder" => Some(Sound::Reminder),
            "Notification.SMS" => Some(Sound::Sms),
            _ => {
                if let Some(rest) = name.strip_prefix("Notification.Looping.Alarm") {
                    looping(rest).map(Sound::LoopingAlarm)
                } else if let Some(rest) = name.strip_prefix("Notification.Looping.Call") {
                    looping(rest).map(Sound::LoopingCall)
                } else {
                    None
                }
            }
        };
        parsed.unwrap_or(Sound::Custom(value))
    }
}

/// # Summary
/// 平台给出的关闭原因，数值与 WinRT `ToastDismissalReason` 一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DismissReason {
    UserCanceled,
    ApplicationHidden,
    TimedOut,
}

impl DismissReason {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(DismissReason::UserCanceled),
            1 => Some(DismissReason::ApplicationHidden),
            2 => Some(DismissReason::TimedOut),
            _ => None,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            DismissReason::UserCanceled => 0,
            DismissReason::ApplicationHidden => 1,
            DismissReason::TimedOut => 2,
        }
    }
}

/// 系统勿扰模式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationMode {
    Unrestricted,
    PriorityOnly,
    AlarmsOnly,
    FeatureNotAvailable,
}

/// 某个身份的通知开关状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationSetting {
    Enabled,
    DisabledForApplication,
    DisabledForUser,
    DisabledByGroupPolicy,
    DisabledByManifest,
}

/// # Summary
/// 已提交通知的句柄，用于更新、隐藏与历史删除。
///
/// # Invariants
/// - `id` 由分发器生成，进程内唯一。
/// - `app_id` 为提交时实际使用的身份。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToastHandle {
    pub id: Uuid,
    pub app_id: String,
    pub tag: Option<String>,
    pub group: Option<String>,
}

impl fmt::Display for ToastHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (app={}, tag={}, group={})",
            self.id,
            self.app_id,
            self.tag.as_deref().unwrap_or("-"),
            self.group.as_deref().unwrap_or("-")
        )
    }
}

/// # Summary
/// 通知的终态结果，每个已提交的通知恰好产生一个。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    /// 用户点击了通知或按钮
    Activated {
        arguments: String,
        // 输入框 / 下拉框 id 到用户输入值
        inputs: BTreeMap<String, String>,
        data: Bindings,
    },
    /// 通知被关闭
    Dismissed { reason: DismissReason, data: Bindings },
    /// 平台渲染或投递失败
    Failed { code: i32 },
}

impl Outcome {
    pub fn is_dismissed(&self) -> bool {
        matches!(self, Outcome::Dismissed { .. })
    }

    pub fn is_activated(&self) -> bool {
        matches!(self, Outcome::Activated { .. })
    }

    pub fn arguments(&self) -> Option<&str> {
        match self {
            Outcome::Activated { arguments, .. } => Some(arguments),
            _ => None,
        }
    }
}

/// 绑定更新结果，数值含义与 WinRT `NotificationUpdateResult` 一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateStatus {
    Succeeded,
    Failed,
    NotFound,
}
