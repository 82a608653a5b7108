use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use toastbox_core::config::IdentityConfig;
use toastbox_core::toast::binding::Bindings;
use toastbox_core::toast::entity::{
    DismissReason, NotificationMode, NotificationSetting, Outcome, Toast, ToastHandle,
    UpdateStatus,
};
use toastbox_core::toast::error::ToastError;
use toastbox_core::toast::port::{
    ListenerGuard, PlatformEvent, Submission, TerminalSlot, ToastPlatform,
};
use toastbox_markup::{SerializeOptions, serialize};
use toastbox_resource::{
    ResolveOptions, ResolvedSource, ResourceResolver, ResourceSession, markup_values,
};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// 单次提交的选项。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitOptions {
    // 静音本次显示，不修改通知本身的声音设置
    pub mute_sound: bool,
}

/// # Summary
/// 通知分发服务，负责序列化、资源解析、提交以及终态转发。
///
/// # Invariants
/// - 校验或资源解析失败时通知绝不会提交到平台。
/// - 每个提交成功的通知恰好产生一个 `Outcome`。
/// - 默认身份在构造时解析一次，之后不再变化。
pub struct Toaster {
    // 系统通知服务
    platform: Arc<dyn ToastPlatform>,
    // 图片与声音资源解析
    resolver: Arc<ResourceResolver>,
    // 通知未指定身份时使用
    default_app_id: String,
}

impl Toaster {
    /// # Summary
    /// 创建分发服务。
    ///
    /// # Arguments
    /// * `platform` - 平台适配器。
    /// * `resolver` - 资源解析器。
    /// * `identity` - 身份配置，用于解析默认身份。
    ///
    /// # Returns
    /// * `Arc<Toaster>`，可在任务之间共享。
    pub fn new(
        platform: Arc<dyn ToastPlatform>,
        resolver: Arc<ResourceResolver>,
        identity: &IdentityConfig,
    ) -> Arc<Self> {
        let default_app_id = identity.resolve_default_app_id();
        info!("Toaster ready, default app id: {}", default_app_id);
        Arc::new(Self {
            platform,
            resolver,
            default_app_id,
        })
    }

    pub fn default_app_id(&self) -> &str {
        &self.default_app_id
    }

    fn app_id_or_default<'a>(&'a self, app_id: Option<&'a str>) -> &'a str {
        app_id.filter(|id| !id.is_empty()).unwrap_or(&self.default_app_id)
    }

    pub async fn submit(&self, toast: &Toast, data: Bindings) -> Result<PendingToast, ToastError> {
        self.submit_with(toast, data, SubmitOptions::default()).await
    }

    /// # Summary
    /// 提交通知，返回等待终态的句柄。
    ///
    /// # Logic
    /// 1. 查询身份的通知开关，平台不存在时立即失败。
    /// 2. 校验并序列化为文档树。
    /// 3. 在新的资源会话中并发解析图片与自定义声音，任一失败则放弃提交。
    /// 4. 用解析结果渲染最终 XML，注册终态槽位后提交给平台。
    /// 5. 平台拒绝文档时不返回错误，而是返回已以 `Failed { code }` 结束的句柄；
    ///    平台不可用仍立即返回 `Unavailable`。
    ///
    /// # Arguments
    /// * `toast` - 通知内容与设置。
    /// * `data` - 初始绑定数据。
    /// * `options` - 本次提交的选项。
    ///
    /// # Returns
    /// * `PendingToast` - 已提交的通知，持有监听器与临时文件直到终态。
    pub async fn submit_with(
        &self,
        toast: &Toast,
        data: Bindings,
        options: SubmitOptions,
    ) -> Result<PendingToast, ToastError> {
        let app_id = self.app_id_or_default(toast.app_id.as_deref()).to_string();
        let setting = self.platform.setting(&app_id)?;
        if setting != NotificationSetting::Enabled {
            warn!("Notifications for {} are {:?}, toast may not be displayed", app_id, setting);
        }

        let markup = serialize(
            toast,
            &SerializeOptions {
                mute_sound: options.mute_sound,
            },
        )?;

        let session = self.resolver.session()?;
        let resolve_options = ResolveOptions::for_toast(toast);
        let sound_options = ResolveOptions {
            query_params: false,
            ..resolve_options
        };
        let images = session.resolve_all(
            markup.resources().iter().map(|r| r.uri.as_str()),
            &resolve_options,
        );
        let sound = async {
            match markup.custom_sound() {
                Some(uri) => session.resolve(uri, &sound_options).await.map(Some),
                None => Ok(None),
            }
        };
        let (resolved, sound) = tokio::try_join!(images, sound)?;
        let document = markup.render(&markup_values(&resolved));
        let sound = sound.and_then(|source| Self::sound_path(&source));

        let handle = ToastHandle {
            id: Uuid::new_v4(),
            app_id,
            tag: toast.tag.clone(),
            group: toast.group.clone(),
        };
        let (slot, rx) = TerminalSlot::channel(handle.clone());
        let submission = Submission {
            handle: handle.clone(),
            document,
            data,
            show_popup: toast.show_popup,
            expiration: toast.expiration,
            sound,
            sound_loop: toast.sound_loop,
        };
        let guard = match self.platform.submit(submission, slot.clone()) {
            Ok(guard) => {
                info!(
                    "Submitted toast {} with {} resource(s)",
                    handle,
                    resolved.len()
                );
                guard
            }
            Err(ToastError::Platform { code, message }) => {
                warn!("Platform rejected toast {}: {}", handle, message);
                slot.deliver(PlatformEvent::Failed { code });
                ListenerGuard::noop()
            }
            Err(e) => return Err(e),
        };

        Ok(PendingToast {
            handle,
            rx,
            guard,
            session,
            platform: self.platform.clone(),
        })
    }

    fn sound_path(source: &ResolvedSource) -> Option<PathBuf> {
        let path = source.local_path();
        if path.is_none() {
            warn!(
                "Custom sound {} is not a local file, skipping playback",
                source.markup_value()
            );
        }
        path
    }

    /// 提交并等待终态。
    pub async fn show(&self, toast: &Toast, data: Bindings) -> Result<Outcome, ToastError> {
        Ok(self.submit(toast, data).await?.outcome().await)
    }

    /// # Summary
    /// 提交并在限定时间内等待终态。
    ///
    /// # Logic
    /// 超时后隐藏通知、清理临时文件，返回 `Dismissed(TimedOut)`。
    pub async fn show_with_timeout(
        &self,
        toast: &Toast,
        data: Bindings,
        timeout: Duration,
    ) -> Result<Outcome, ToastError> {
        Ok(self.submit(toast, data).await?.outcome_within(timeout).await)
    }

    /// # Summary
    /// 按 (tag, group) 就地更新已显示通知的绑定数据。
    ///
    /// # Arguments
    /// * `handle` - 提交时得到的句柄，必须带有 tag。
    /// * `data` - 要合并的绑定数据。
    ///
    /// # Returns
    /// * `UpdateStatus::NotFound` - 通知已被用户关闭或从历史中删除。
    pub fn update(&self, handle: &ToastHandle, data: &Bindings) -> Result<UpdateStatus, ToastError> {
        if handle.tag.as_deref().is_none_or(str::is_empty) {
            return Err(ToastError::validation(
                "toast must have a tag to be updated",
            ));
        }
        let status = self.platform.update(handle, data)?;
        debug!("Updated {} with {} binding(s): {:?}", handle, data.len(), status);
        Ok(status)
    }

    /// 与 [`Toaster::update`] 相同，但通知不存在或更新失败时返回错误。
    pub fn update_strict(&self, handle: &ToastHandle, data: &Bindings) -> Result<(), ToastError> {
        match self.update(handle, data)? {
            UpdateStatus::Succeeded => Ok(()),
            UpdateStatus::NotFound => Err(ToastError::NotShown),
            UpdateStatus::Failed => Err(ToastError::Platform {
                code: 1,
                message: format!("update of {} failed", handle),
            }),
        }
    }

    /// 从屏幕上移除通知，等待方随后收到 `Dismissed(ApplicationHidden)`。
    pub fn hide(&self, handle: &ToastHandle) -> Result<(), ToastError> {
        self.platform.hide(handle)?;
        debug!("Requested hide of {}", handle);
        Ok(())
    }

    /// 操作中心历史，`app_id` 为空时使用默认身份。
    pub fn history<'a>(&'a self, app_id: Option<&'a str>) -> History<'a> {
        History {
            platform: self.platform.as_ref(),
            app_id: self.app_id_or_default(app_id),
        }
    }

    /// 某个身份的通知是否处于开启状态。
    pub fn is_enabled(&self, app_id: Option<&str>) -> Result<bool, ToastError> {
        let setting = self.platform.setting(self.app_id_or_default(app_id))?;
        Ok(setting == NotificationSetting::Enabled)
    }

    pub fn notification_mode(&self) -> Result<NotificationMode, ToastError> {
        self.platform.mode()
    }
}

/// 绑定到某个身份的操作中心历史。
pub struct History<'a> {
    platform: &'a dyn ToastPlatform,
    app_id: &'a str,
}

impl History<'_> {
    pub fn app_id(&self) -> &str {
        self.app_id
    }

    /// # Summary
    /// 删除句柄对应的历史通知。
    ///
    /// # Returns
    /// * 句柄没有 tag 时返回校验错误，平台无法定位这类通知。
    pub fn remove(&self, handle: &ToastHandle) -> Result<(), ToastError> {
        let Some(tag) = handle.tag.as_deref().filter(|t| !t.is_empty()) else {
            return Err(ToastError::validation(
                "toast must have a tag to be removed from history",
            ));
        };
        self.platform
            .remove_from_history(tag, handle.group.as_deref(), &handle.app_id)
    }

    pub fn remove_tag(&self, tag: &str, group: Option<&str>) -> Result<(), ToastError> {
        self.platform.remove_from_history(tag, group, self.app_id)
    }

    pub fn remove_group(&self, group: &str) -> Result<(), ToastError> {
        self.platform.remove_group(group, self.app_id)
    }

    pub fn clear(&self) -> Result<(), ToastError> {
        info!("Clearing notification history of {}", self.app_id);
        self.platform.clear_history(self.app_id)
    }
}

/// # Summary
/// 已提交、尚未进入终态的通知。
///
/// # Invariants
/// - 持有平台监听器守卫与资源会话，析构时二者一并释放。
/// - 终态只能被消费一次（`outcome` 取得所有权）。
pub struct PendingToast {
    handle: ToastHandle,
    rx: oneshot::Receiver<PlatformEvent>,
    guard: ListenerGuard,
    session: ResourceSession,
    platform: Arc<dyn ToastPlatform>,
}

impl PendingToast {
    pub fn handle(&self) -> &ToastHandle {
        &self.handle
    }

    /// 本通知临时文件所在目录，终态后被删除。
    pub fn resource_dir(&self) -> &Path {
        self.session.path()
    }

    /// # Summary
    /// 等待终态事件。
    ///
    /// # Logic
    /// 1. 等待平台投递的第一个终态事件。
    /// 2. 槽位在未投递时被平台丢弃（例如从历史中删除），视为应用隐藏。
    /// 3. 注销监听器并删除临时文件。
    pub async fn outcome(mut self) -> Outcome {
        let event = (&mut self.rx).await.ok();
        self.finish(event)
    }

    /// # Summary
    /// 在限定时间内等待终态。
    ///
    /// # Logic
    /// 1. 时间内收到终态时与 [`PendingToast::outcome`] 相同。
    /// 2. 超时后请求隐藏通知，隐藏失败只记录日志。
    /// 3. 清理资源并返回 `Dismissed(TimedOut)`，数据取隐藏时平台回传的绑定。
    pub async fn outcome_within(mut self, timeout: Duration) -> Outcome {
        match tokio::time::timeout(timeout, &mut self.rx).await {
            Ok(event) => self.finish(event.ok()),
            Err(_) => {
                info!("Toast {} timed out after {:?}", self.handle, timeout);
                if let Err(e) = self.platform.hide(&self.handle) {
                    warn!("Failed to hide timed out toast {}: {}", self.handle, e);
                }
                let data = match self.rx.try_recv() {
                    Ok(
                        PlatformEvent::Activated { data, .. }
                        | PlatformEvent::Dismissed { data, .. },
                    ) => data,
                    _ => Bindings::new(),
                };
                self.close();
                Outcome::Dismissed {
                    reason: DismissReason::TimedOut,
                    data,
                }
            }
        }
    }

    fn finish(self, event: Option<PlatformEvent>) -> Outcome {
        let outcome = match event {
            Some(PlatformEvent::Activated {
                arguments,
                inputs,
                data,
            }) => {
                info!("Toast {} activated with \"{}\"", self.handle, arguments);
                Outcome::Activated {
                    arguments,
                    inputs,
                    data,
                }
            }
            Some(PlatformEvent::Dismissed { reason, data }) => {
                info!("Toast {} dismissed: {:?}", self.handle, reason);
                Outcome::Dismissed { reason, data }
            }
            Some(PlatformEvent::Failed { code }) => {
                error!("Toast {} failed with code {:#010x}", self.handle, code);
                Outcome::Failed { code }
            }
            None => {
                debug!("Toast {} left the platform without a terminal event", self.handle);
                Outcome::Dismissed {
                    reason: DismissReason::ApplicationHidden,
                    data: Bindings::new(),
                }
            }
        };
        self.close();
        outcome
    }

    fn close(self) {
        let PendingToast {
            handle,
            guard,
            session,
            ..
        } = self;
        drop(guard);
        session.close();
        debug!("Released listeners and resources of {}", handle);
    }
}
