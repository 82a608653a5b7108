use crate::toast::binding::Bindings;
use crate::toast::entity::{
    DismissReason, NotificationMode, NotificationSetting, ToastHandle, UpdateStatus,
};
use crate::toast::error::ToastError;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// # Summary
/// 提交给平台的完整通知请求。
///
/// # Invariants
/// - `document` 已完成资源替换，所有图片源均指向本地文件。
#[derive(Debug, Clone)]
pub struct Submission {
    pub handle: ToastHandle,
    // 完整的 toast XML 文档
    pub document: String,
    // 初始绑定数据
    pub data: Bindings,
    pub show_popup: bool,
    pub expiration: Option<DateTime<Utc>>,
    // 自定义声音的本地文件，由平台适配器在显示时播放
    pub sound: Option<PathBuf>,
    pub sound_loop: bool,
}

/// # Summary
/// 平台回传的终态事件。
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformEvent {
    Activated {
        arguments: String,
        inputs: BTreeMap<String, String>,
        // 平台侧该通知当前的绑定数据
        data: Bindings,
    },
    Dismissed {
        reason: DismissReason,
        data: Bindings,
    },
    Failed {
        code: i32,
    },
}

/// # Summary
/// 单次解析的终态槽位，平台监听器通过它把第一个终态事件交给等待方。
///
/// # Invariants
/// - 只有第一次 `deliver` 生效，之后的事件被记录并丢弃。
/// - 克隆的槽位共享同一个发送端，可同时交给多个平台回调。
#[derive(Clone)]
pub struct TerminalSlot {
    handle: ToastHandle,
    sender: Arc<Mutex<Option<oneshot::Sender<PlatformEvent>>>>,
}

impl TerminalSlot {
    /// # Summary
    /// 为一个通知创建终态槽位与对应的接收端。
    ///
    /// # Arguments
    /// * `handle` - 通知句柄，仅用于日志。
    ///
    /// # Returns
    /// * `(TerminalSlot, Receiver)` - 槽位交给平台，接收端由分发器等待。
    pub fn channel(handle: ToastHandle) -> (Self, oneshot::Receiver<PlatformEvent>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                handle,
                sender: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    /// # Summary
    /// 投递终态事件。
    ///
    /// # Logic
    /// 1. 取出发送端；若已被取走说明终态已送达，记录警告后丢弃本次事件。
    /// 2. 发送事件；接收端已关闭（调用方放弃等待）时仅记录调试日志。
    ///
    /// # Returns
    /// * `true` - 本次事件成为该通知的终态。
    pub fn deliver(&self, event: PlatformEvent) -> bool {
        let sender = match self.sender.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match sender {
            Some(tx) => {
                if tx.send(event).is_err() {
                    debug!("Terminal event for {} arrived after caller gave up", self.handle);
                }
                true
            }
            None => {
                warn!("Ignoring extra terminal event for {}: {:?}", self.handle, event);
                false
            }
        }
    }

    /// 终态是否已经送达。
    pub fn is_resolved(&self) -> bool {
        match self.sender.lock() {
            Ok(guard) => guard.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }

    pub fn handle(&self) -> &ToastHandle {
        &self.handle
    }
}

impl fmt::Debug for TerminalSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerminalSlot")
            .field("handle", &self.handle)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// # Summary
/// 平台监听器注册的守卫，析构时注销底层监听器。
pub struct ListenerGuard {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl ListenerGuard {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// 不持有任何监听器的守卫。
    pub fn noop() -> Self {
        Self { release: None }
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for ListenerGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerGuard")
            .field("armed", &self.release.is_some())
            .finish()
    }
}

/// # Summary
/// 系统通知服务的端口。
///
/// # Invariants
/// - 实现必须是 `Send` 和 `Sync`，平台回调可能来自任意线程。
/// - 渲染、投递、持久化均由平台完成，实现只做数据编组。
pub trait ToastPlatform: Send + Sync {
    /// # Summary
    /// 提交通知并注册终态监听器。
    ///
    /// # Logic
    /// 1. 加载 XML 文档并创建平台通知对象。
    /// 2. 注册激活 / 关闭 / 失败回调，回调均通过 `slot` 投递。
    /// 3. 显示通知。
    ///
    /// # Arguments
    /// * `submission` - 已渲染完成的通知请求。
    /// * `slot` - 单次解析的终态槽位。
    ///
    /// # Returns
    /// * 成功返回监听器守卫；平台拒绝文档时返回 `ToastError::Platform`。
    fn submit(
        &self,
        submission: Submission,
        slot: TerminalSlot,
    ) -> Result<ListenerGuard, ToastError>;

    /// # Summary
    /// 按 (tag, group) 就地更新已显示通知的绑定数据。
    fn update(&self, handle: &ToastHandle, data: &Bindings) -> Result<UpdateStatus, ToastError>;

    /// 请求从屏幕上移除通知。
    fn hide(&self, handle: &ToastHandle) -> Result<(), ToastError>;

    /// 从操作中心历史中删除单条通知。
    fn remove_from_history(
        &self,
        tag: &str,
        group: Option<&str>,
        app_id: &str,
    ) -> Result<(), ToastError>;

    /// 删除某个分组下的全部通知。
    fn remove_group(&self, group: &str, app_id: &str) -> Result<(), ToastError>;

    /// 清空某个身份的全部通知。
    fn clear_history(&self, app_id: &str) -> Result<(), ToastError>;

    /// 查询某个身份的通知开关。通知服务不存在时返回 `ToastError::Unavailable`。
    fn setting(&self, app_id: &str) -> Result<NotificationSetting, ToastError>;

    /// 查询系统勿扰模式。
    fn mode(&self) -> Result<NotificationMode, ToastError>;
}
