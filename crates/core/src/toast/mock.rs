use crate::toast::binding::Bindings;
use crate::toast::entity::{
    DismissReason, NotificationMode, NotificationSetting, ToastHandle, UpdateStatus,
};
use crate::toast::error::ToastError;
use crate::toast::port::{ListenerGuard, PlatformEvent, Submission, TerminalSlot, ToastPlatform};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

struct LiveToast {
    handle: ToastHandle,
    slot: TerminalSlot,
    data: Bindings,
}

/// # Summary
/// 测试用的内存平台实现。
///
/// # Invariants
/// - 记录所有提交请求与每个通知当前生效的绑定数据。
/// - 通知进入终态后即从活跃表移除，之后的 update 返回 `NotFound`。
pub struct MockPlatform {
    available: AtomicBool,
    // 非空时，提交后立即以该错误码失败
    fail_code: Mutex<Option<i32>>,
    reject: AtomicBool,
    submissions: Mutex<Vec<Submission>>,
    live: DashMap<Uuid, LiveToast>,
    listeners: Arc<AtomicUsize>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            fail_code: Mutex::new(None),
            reject: AtomicBool::new(false),
            submissions: Mutex::new(Vec::new()),
            live: DashMap::new(),
            listeners: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 模拟不存在通知服务的系统。
    pub fn unavailable() -> Self {
        let platform = Self::new();
        platform.available.store(false, Ordering::SeqCst);
        platform
    }

    /// 之后的提交在显示后立即以 `code` 失败。
    pub fn fail_with(&self, code: i32) {
        if let Ok(mut guard) = self.fail_code.lock() {
            *guard = Some(code);
        }
    }

    /// 之后的提交被平台直接拒绝。
    pub fn reject_submissions(&self) {
        self.reject.store(true, Ordering::SeqCst);
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    pub fn last_submission(&self) -> Option<Submission> {
        self.submissions().pop()
    }

    /// 某个通知在平台侧当前生效的绑定数据。
    pub fn effective_data(&self, id: &Uuid) -> Option<Bindings> {
        self.live.get(id).map(|t| t.data.clone())
    }

    /// 当前仍注册着的监听器数量。
    pub fn active_listeners(&self) -> usize {
        self.listeners.load(Ordering::SeqCst)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// # Summary
    /// 向某个通知投递平台事件。
    ///
    /// # Logic
    /// 1. 终态事件会把通知从活跃表中移除。
    /// 2. 事件中的数据使用平台侧当前绑定数据。
    ///
    /// # Returns
    /// * `true` - 事件成为该通知的终态。
    pub fn fire(&self, id: &Uuid, event: PlatformEvent) -> bool {
        match self.live.remove(id) {
            Some((_, toast)) => toast.slot.deliver(event),
            None => false,
        }
    }

    pub fn activate(&self, id: &Uuid, arguments: &str, inputs: &[(&str, &str)]) -> bool {
        let data = self.effective_data(id).unwrap_or_default();
        let inputs: BTreeMap<String, String> = inputs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.fire(
            id,
            PlatformEvent::Activated {
                arguments: arguments.to_string(),
                inputs,
                data,
            },
        )
    }

    pub fn dismiss(&self, id: &Uuid, reason: DismissReason) -> bool {
        let data = self.effective_data(id).unwrap_or_default();
        self.fire(id, PlatformEvent::Dismissed { reason, data })
    }

    fn matches(handle: &ToastHandle, tag: &str, group: Option<&str>, app_id: &str) -> bool {
        handle.app_id == app_id
            && handle.tag.as_deref() == Some(tag)
            && handle.group.as_deref() == group
    }

    fn ensure_available(&self) -> Result<(), ToastError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ToastError::Unavailable("mock platform is offline".to_string()))
        }
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl ToastPlatform for MockPlatform {
    fn submit(
        &self,
        submission: Submission,
        slot: TerminalSlot,
    ) -> Result<ListenerGuard, ToastError> {
        self.ensure_available()?;
        if self.reject.load(Ordering::SeqCst) {
            return Err(ToastError::Platform {
                code: -1,
                message: "document rejected".to_string(),
            });
        }
        let id = submission.handle.id;
        if let Ok(mut list) = self.submissions.lock() {
            list.push(submission.clone());
        }
        self.live.insert(
            id,
            LiveToast {
                handle: submission.handle,
                slot,
                data: submission.data,
            },
        );

        self.listeners.fetch_add(1, Ordering::SeqCst);
        let listeners = self.listeners.clone();
        let guard = ListenerGuard::new(move || {
            listeners.fetch_sub(1, Ordering::SeqCst);
        });

        let fail_code = self.fail_code.lock().ok().and_then(|c| *c);
        if let Some(code) = fail_code {
            self.fire(&id, PlatformEvent::Failed { code });
        }
        Ok(guard)
    }

    fn update(&self, handle: &ToastHandle, data: &Bindings) -> Result<UpdateStatus, ToastError> {
        self.ensure_available()?;
        let Some(tag) = handle.tag.as_deref() else {
            return Ok(UpdateStatus::NotFound);
        };
        for mut entry in self.live.iter_mut() {
            if Self::matches(&entry.handle, tag, handle.group.as_deref(), &handle.app_id) {
                entry.data.merge(data);
                return Ok(UpdateStatus::Succeeded);
            }
        }
        Ok(UpdateStatus::NotFound)
    }

    fn hide(&self, handle: &ToastHandle) -> Result<(), ToastError> {
        self.ensure_available()?;
        self.dismiss(&handle.id, DismissReason::ApplicationHidden);
        Ok(())
    }

    fn remove_from_history(
        &self,
        tag: &str,
        group: Option<&str>,
        app_id: &str,
    ) -> Result<(), ToastError> {
        self.ensure_available()?;
        self.live
            .retain(|_, t| !Self::matches(&t.handle, tag, group, app_id));
        Ok(())
    }

    fn remove_group(&self, group: &str, app_id: &str) -> Result<(), ToastError> {
        self.ensure_available()?;
        self.live.retain(|_, t| {
            !(t.handle.app_id == app_id && t.handle.group.as_deref() == Some(group))
        });
        Ok(())
    }

    fn clear_history(&self, app_id: &str) -> Result<(), ToastError> {
        self.ensure_available()?;
        self.live.retain(|_, t| t.handle.app_id != app_id);
        Ok(())
    }

    fn setting(&self, _app_id: &str) -> Result<NotificationSetting, ToastError> {
        self.ensure_available()?;
        Ok(NotificationSetting::Enabled)
    }

    fn mode(&self) -> Result<NotificationMode, ToastError> {
        self.ensure_available()?;
        Ok(NotificationMode::Unrestricted)
    }
}
