use crate::shell::{play_sound, stop_sound};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use toastbox_core::toast::binding::Bindings;
use toastbox_core::toast::entity::{
    DismissReason, NotificationMode, NotificationSetting, ToastHandle, UpdateStatus,
};
use toastbox_core::toast::error::ToastError;
use toastbox_core::toast::port::{
    ListenerGuard, PlatformEvent, Submission, TerminalSlot, ToastPlatform,
};
use tracing::{debug, info, warn};
use uuid::Uuid;
use windows::Data::Xml::Dom::XmlDocument;
use windows::Foundation::{
    DateTime as WinDateTime, IPropertyValue, IReference, PropertyValue, TypedEventHandler,
};
use windows::UI::Notifications::{
    NotificationData, NotificationSetting as WinSetting, NotificationUpdateResult,
    ToastActivatedEventArgs, ToastDismissedEventArgs, ToastFailedEventArgs, ToastNotification,
    ToastNotificationManager, ToastNotificationMode, ToastNotifier,
};
use windows::core::{HSTRING, IInspectable, Interface};

// 1601-01-01 到 1970-01-01 之间的秒数
const EPOCH_DIFFERENCE_SECS: i64 = 11_644_473_600;
// WinRT DateTime 以 100ns 为单位
const TICKS_PER_SEC: i64 = 10_000_000;

fn hs(value: &str) -> HSTRING {
    HSTRING::from(value)
}

fn platform_error(e: windows::core::Error) -> ToastError {
    ToastError::Platform {
        code: e.code().0,
        message: e.message().to_string(),
    }
}

fn to_win_datetime(value: &DateTime<Utc>) -> WinDateTime {
    WinDateTime {
        UniversalTime: (value.timestamp() + EPOCH_DIFFERENCE_SECS) * TICKS_PER_SEC
            + i64::from(value.timestamp_subsec_nanos() / 100),
    }
}

fn notification_data(data: &Bindings, sequence: u32) -> windows::core::Result<NotificationData> {
    let payload = NotificationData::new()?;
    let values = payload.Values()?;
    for (key, value) in data.iter() {
        values.Insert(&hs(key), &hs(value))?;
    }
    payload.SetSequenceNumber(sequence)?;
    Ok(payload)
}

/// 读取激活参数中的输入框 / 下拉框值。
fn user_inputs(args: &ToastActivatedEventArgs) -> BTreeMap<String, String> {
    let mut inputs = BTreeMap::new();
    let Ok(values) = args.UserInput() else {
        return inputs;
    };
    let Ok(iter) = values.First() else {
        return inputs;
    };
    while iter.HasCurrent().unwrap_or(false) {
        if let Ok(pair) = iter.Current() {
            let key = pair.Key().map(|k| k.to_string_lossy()).unwrap_or_default();
            let value = pair
                .Value()
                .and_then(|v| v.cast::<IPropertyValue>())
                .and_then(|v| v.GetString())
                .map(|v| v.to_string_lossy())
                .unwrap_or_default();
            inputs.insert(key, value);
        }
        if !iter.MoveNext().unwrap_or(false) {
            break;
        }
    }
    inputs
}

struct LiveToast {
    handle: ToastHandle,
    toast: ToastNotification,
    // 初始数据与之后成功的更新合并后的结果
    data: Bindings,
}

type LiveToasts = Arc<DashMap<Uuid, LiveToast>>;

fn current_data(live: &LiveToasts, id: &Uuid) -> Bindings {
    live.get(id).map(|t| t.data.clone()).unwrap_or_default()
}

/// # Summary
/// 基于 WinRT `ToastNotifier` 的平台实现。
///
/// # Invariants
/// - 每条已显示的通知在 `live` 中登记，直到监听器守卫释放。
/// - 绑定数据的序号单调递增，平台只接受序号更大的更新。
pub struct WinRtPlatform {
    live: LiveToasts,
    sequence: AtomicU32,
}

impl WinRtPlatform {
    pub fn new() -> Self {
        Self {
            live: Arc::new(DashMap::new()),
            sequence: AtomicU32::new(0),
        }
    }

    fn next_sequence(&self) -> u32 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn notifier(app_id: &str) -> Result<ToastNotifier, ToastError> {
        ToastNotificationManager::CreateToastNotifierWithId(&hs(app_id)).map_err(|e| {
            ToastError::Unavailable(format!("no notifier for {}: {}", app_id, e.message()))
        })
    }

    fn build(submission: &Submission, sequence: u32) -> Result<ToastNotification, ToastError> {
        let xml = XmlDocument::new().map_err(platform_error)?;
        xml.LoadXml(&hs(&submission.document))
            .map_err(platform_error)?;
        let toast = ToastNotification::CreateToastNotification(&xml).map_err(platform_error)?;

        if let Some(tag) = &submission.handle.tag {
            toast.SetTag(&hs(tag)).map_err(platform_error)?;
        }
        if let Some(group) = &submission.handle.group {
            toast.SetGroup(&hs(group)).map_err(platform_error)?;
        }
        toast
            .SetSuppressPopup(!submission.show_popup)
            .map_err(platform_error)?;
        if let Some(expiration) = &submission.expiration {
            let value = PropertyValue::CreateDateTime(to_win_datetime(expiration))
                .and_then(|v| v.cast::<IReference<WinDateTime>>())
                .map_err(platform_error)?;
            toast.SetExpirationTime(&value).map_err(platform_error)?;
        }
        if !submission.data.is_empty() {
            let data = notification_data(&submission.data, sequence).map_err(platform_error)?;
            toast.SetData(&data).map_err(platform_error)?;
        }
        Ok(toast)
    }

    /// # Summary
    /// 注册三个终态回调，全部通过同一个槽位投递。
    ///
    /// # Returns
    /// * 三个事件注册令牌：激活、关闭、失败。
    fn attach(
        &self,
        toast: &ToastNotification,
        id: Uuid,
        slot: &TerminalSlot,
    ) -> Result<[i64; 3], ToastError> {
        let activated = {
            let slot = slot.clone();
            let live = self.live.clone();
            toast
                .Activated(&TypedEventHandler::<ToastNotification, IInspectable>::new(
                    move |_, args| {
                        let args = args.ok()?.cast::<ToastActivatedEventArgs>()?;
                        slot.deliver(PlatformEvent::Activated {
                            arguments: args.Arguments()?.to_string_lossy(),
                            inputs: user_inputs(&args),
                            data: current_data(&live, &id),
                        });
                        Ok(())
                    },
                ))
                .map_err(platform_error)?
        };
        let dismissed = {
            let slot = slot.clone();
            let live = self.live.clone();
            toast
                .Dismissed(&TypedEventHandler::<
                    ToastNotification,
                    ToastDismissedEventArgs,
                >::new(move |_, args| {
                    let code = args.ok()?.Reason()?.0;
                    slot.deliver(PlatformEvent::Dismissed {
                        reason: DismissReason::from_code(code)
                            .unwrap_or(DismissReason::UserCanceled),
                        data: current_data(&live, &id),
                    });
                    Ok(())
                }))
                .map_err(platform_error)?
        };
        let failed = {
            let slot = slot.clone();
            toast
                .Failed(&TypedEventHandler::<ToastNotification, ToastFailedEventArgs>::new(
                    move |_, args| {
                        let code = args.ok()?.ErrorCode()?.0;
                        slot.deliver(PlatformEvent::Failed { code });
                        Ok(())
                    },
                ))
                .map_err(platform_error)?
        };
        Ok([activated, dismissed, failed])
    }

    fn detach(toast: &ToastNotification, tokens: [i64; 3]) {
        let [activated, dismissed, failed] = tokens;
        let results = [
            toast.RemoveActivated(activated),
            toast.RemoveDismissed(dismissed),
            toast.RemoveFailed(failed),
        ];
        for result in results {
            if let Err(e) = result {
                debug!("Failed to remove toast listener: {}", e.message());
            }
        }
    }

    fn matches(handle: &ToastHandle, tag: &str, group: Option<&str>, app_id: &str) -> bool {
        handle.app_id == app_id
            && handle.tag.as_deref() == Some(tag)
            && handle.group.as_deref() == group
    }
}

impl Default for WinRtPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl ToastPlatform for WinRtPlatform {
    /// # Summary
    /// 显示通知并注册终态回调。
    ///
    /// # Logic
    /// 1. 创建通知器，失败视为平台不可用。
    /// 2. 加载 XML 并设置 tag / group / 弹出 / 过期时间 / 绑定数据。
    /// 3. 注册回调并登记到活跃表后显示；显示失败时撤销注册。
    /// 4. 有自定义声音时由本进程播放。
    fn submit(
        &self,
        submission: Submission,
        slot: TerminalSlot,
    ) -> Result<ListenerGuard, ToastError> {
        let notifier = Self::notifier(&submission.handle.app_id)?;
        let toast = Self::build(&submission, self.next_sequence())?;
        let id = submission.handle.id;
        let tokens = self.attach(&toast, id, &slot)?;

        self.live.insert(
            id,
            LiveToast {
                handle: submission.handle.clone(),
                toast: toast.clone(),
                data: submission.data,
            },
        );
        if let Err(e) = notifier.Show(&toast) {
            Self::detach(&toast, tokens);
            self.live.remove(&id);
            return Err(platform_error(e));
        }

        let has_sound = submission.sound.is_some();
        if let Some(path) = &submission.sound {
            play_sound(path, submission.sound_loop);
        }
        info!("Showing toast {}", submission.handle);

        let live = self.live.clone();
        Ok(ListenerGuard::new(move || {
            Self::detach(&toast, tokens);
            live.remove(&id);
            if has_sound {
                stop_sound();
            }
        }))
    }

    fn update(&self, handle: &ToastHandle, data: &Bindings) -> Result<UpdateStatus, ToastError> {
        let Some(tag) = handle.tag.as_deref() else {
            return Ok(UpdateStatus::NotFound);
        };
        let notifier = Self::notifier(&handle.app_id)?;
        let payload = notification_data(data, self.next_sequence()).map_err(platform_error)?;
        let result = match handle.group.as_deref() {
            Some(group) => notifier.UpdateWithTagAndGroup(&payload, &hs(tag), &hs(group)),
            None => notifier.UpdateWithTag(&payload, &hs(tag)),
        }
        .map_err(platform_error)?;

        if result == NotificationUpdateResult::Succeeded {
            for mut entry in self.live.iter_mut() {
                if Self::matches(&entry.handle, tag, handle.group.as_deref(), &handle.app_id) {
                    entry.data.merge(data);
                }
            }
            Ok(UpdateStatus::Succeeded)
        } else if result == NotificationUpdateResult::NotificationNotFound {
            Ok(UpdateStatus::NotFound)
        } else {
            Ok(UpdateStatus::Failed)
        }
    }

    fn hide(&self, handle: &ToastHandle) -> Result<(), ToastError> {
        let Some(toast) = self.live.get(&handle.id).map(|t| t.toast.clone()) else {
            debug!("Toast {} is no longer live, nothing to hide", handle);
            return Ok(());
        };
        stop_sound();
        Self::notifier(&handle.app_id)?
            .Hide(&toast)
            .map_err(platform_error)
    }

    fn remove_from_history(
        &self,
        tag: &str,
        group: Option<&str>,
        app_id: &str,
    ) -> Result<(), ToastError> {
        let history = ToastNotificationManager::History().map_err(platform_error)?;
        history
            .RemoveGroupedTagWithId(&hs(tag), &hs(group.unwrap_or_default()), &hs(app_id))
            .map_err(platform_error)
    }

    fn remove_group(&self, group: &str, app_id: &str) -> Result<(), ToastError> {
        let history = ToastNotificationManager::History().map_err(platform_error)?;
        history
            .RemoveGroupWithId(&hs(group), &hs(app_id))
            .map_err(platform_error)
    }

    fn clear_history(&self, app_id: &str) -> Result<(), ToastError> {
        let history = ToastNotificationManager::History().map_err(platform_error)?;
        history.ClearWithId(&hs(app_id)).map_err(platform_error)
    }

    fn setting(&self, app_id: &str) -> Result<NotificationSetting, ToastError> {
        let setting = Self::notifier(app_id)?
            .Setting()
            .map_err(platform_error)?;
        Ok(if setting == WinSetting::Enabled {
            NotificationSetting::Enabled
        } else if setting == WinSetting::DisabledForApplication {
            NotificationSetting::DisabledForApplication
        } else if setting == WinSetting::DisabledForUser {
            NotificationSetting::DisabledForUser
        } else if setting == WinSetting::DisabledByGroupPolicy {
            NotificationSetting::DisabledByGroupPolicy
        } else {
            NotificationSetting::DisabledByManifest
        })
    }

    fn mode(&self) -> Result<NotificationMode, ToastError> {
        let mode = match ToastNotificationManager::GetDefault().and_then(|m| m.NotificationMode())
        {
            Ok(mode) => mode,
            Err(e) => {
                warn!("Notification mode unavailable: {}", e.message());
                return Ok(NotificationMode::FeatureNotAvailable);
            }
        };
        Ok(if mode == ToastNotificationMode::Unrestricted {
            NotificationMode::Unrestricted
        } else if mode == ToastNotificationMode::PriorityOnly {
            NotificationMode::PriorityOnly
        } else {
            NotificationMode::AlarmsOnly
        })
    }
}
