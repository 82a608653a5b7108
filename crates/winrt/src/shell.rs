use std::iter::once;
use std::path::Path;
use toastbox_core::toast::error::ToastError;
use tracing::{debug, info, warn};
use windows::Win32::Media::Audio::{
    PlaySoundW, SND_ASYNC, SND_FILENAME, SND_LOOP, SND_NODEFAULT, SND_PURGE,
};
use windows::Win32::UI::Shell::SetCurrentProcessExplicitAppUserModelID;
use windows::core::PCWSTR;

fn wide(value: &str) -> Vec<u16> {
    value.encode_utf16().chain(once(0)).collect()
}

/// # Summary
/// 设置当前进程的显式身份 (AUMID)。
///
/// # Logic
/// 任务栏分组与未指定身份的通知都会归属到该 id。
pub fn set_process_app_id(app_id: &str) -> Result<(), ToastError> {
    let id = wide(app_id);
    // SAFETY: id 以 NUL 结尾且在调用期间有效
    unsafe { SetCurrentProcessExplicitAppUserModelID(PCWSTR(id.as_ptr())) }.map_err(|e| {
        ToastError::Platform {
            code: e.code().0,
            message: e.message().to_string(),
        }
    })?;
    info!("Process app id set to {}", app_id);
    Ok(())
}

/// 异步播放自定义声音文件，平台的 `<audio>` 只支持系统声音。
pub(crate) fn play_sound(path: &Path, looping: bool) {
    let file = wide(&path.to_string_lossy());
    let mut flags = SND_FILENAME | SND_NODEFAULT | SND_ASYNC;
    if looping {
        flags |= SND_LOOP;
    }
    // SAFETY: file 以 NUL 结尾；SND_ASYNC 下系统会复制路径
    let played = unsafe { PlaySoundW(PCWSTR(file.as_ptr()), None, flags) };
    if played.as_bool() {
        debug!("Playing {} (loop={})", path.display(), looping);
    } else {
        warn!("Failed to play custom sound {}", path.display());
    }
}

/// 停止当前进程正在播放的声音。
pub(crate) fn stop_sound() {
    // SAFETY: 空路径配合 SND_PURGE 表示停止播放
    let stopped = unsafe { PlaySoundW(PCWSTR::null(), None, SND_PURGE) };
    if !stopped.as_bool() {
        debug!("No sound to stop");
    }
}
