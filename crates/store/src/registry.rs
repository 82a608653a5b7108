use async_trait::async_trait;
use std::iter::once;
use toastbox_core::identity::entity::Identity;
use toastbox_core::identity::error::IdentityError;
use toastbox_core::identity::port::IdentityStore;
use tracing::{debug, info};
use windows::Win32::Foundation::{ERROR_FILE_NOT_FOUND, ERROR_NO_MORE_ITEMS, WIN32_ERROR};
use windows::Win32::System::Registry::{
    HKEY, HKEY_CURRENT_USER, REG_DWORD, REG_EXPAND_SZ, REG_SZ, REG_VALUE_TYPE, RRF_NOEXPAND,
    RRF_RT_REG_DWORD, RRF_RT_REG_EXPAND_SZ, RRF_RT_REG_SZ, RegCloseKey, RegDeleteTreeW,
    RegEnumKeyW, RegGetValueW, RegOpenKeyW, RegSetKeyValueW,
};
use windows::core::PCWSTR;

/// 每个身份一个子键，作用域为当前用户。
const BASE_KEY: &str = r"SOFTWARE\Classes\AppUserModelId";

const DISPLAY_NAME: &str = "DisplayName";
const ICON_URI: &str = "IconUri";
const ICON_BACKGROUND: &str = "IconBackgroundColor";
const CUSTOM_ACTIVATOR: &str = "CustomActivator";
const SHOW_IN_SETTINGS: &str = "ShowInSettings";

fn wide(value: &str) -> Vec<u16> {
    value.encode_utf16().chain(once(0)).collect()
}

fn subkey(id: &str) -> Vec<u16> {
    wide(&format!(r"{}\{}", BASE_KEY, id))
}

fn storage_error(status: WIN32_ERROR, context: &str) -> IdentityError {
    IdentityError::Storage(format!(
        "{}: {}",
        context,
        windows::core::Error::from_hresult(status.to_hresult()).message()
    ))
}

/// # Summary
/// Windows 注册表身份存储。
///
/// # Invariants
/// - 记录写在 `HKCU\SOFTWARE\Classes\AppUserModelId\<id>` 下，无需管理员权限。
/// - 只有带 `CustomActivator` 值的子键被视为本存储管理的身份。
pub struct RegistryIdentityStore;

impl RegistryIdentityStore {
    pub fn new() -> Self {
        Self
    }

    fn set_string(
        key: &[u16],
        name: &str,
        value: &str,
        kind: REG_VALUE_TYPE,
    ) -> Result<(), IdentityError> {
        let name_w = wide(name);
        let data = wide(value);
        let size = u32::try_from(data.len() * 2)
            .map_err(|_| IdentityError::Storage(format!("{} is too long", name)))?;
        // SAFETY: 所有缓冲区在调用期间有效且以 NUL 结尾
        let status = unsafe {
            RegSetKeyValueW(
                HKEY_CURRENT_USER,
                PCWSTR(key.as_ptr()),
                PCWSTR(name_w.as_ptr()),
                kind.0,
                Some(data.as_ptr().cast()),
                size,
            )
        };
        status.ok().map_err(|_| storage_error(status, name))
    }

    fn set_dword(key: &[u16], name: &str, value: u32) -> Result<(), IdentityError> {
        let name_w = wide(name);
        let size = u32::try_from(std::mem::size_of::<u32>()).unwrap_or(4);
        // SAFETY: 同上
        let status = unsafe {
            RegSetKeyValueW(
                HKEY_CURRENT_USER,
                PCWSTR(key.as_ptr()),
                PCWSTR(name_w.as_ptr()),
                REG_DWORD.0,
                Some((&raw const value).cast()),
                size,
            )
        };
        status.ok().map_err(|_| storage_error(status, name))
    }

    fn get_string(key: &[u16], name: &str) -> Result<Option<String>, IdentityError> {
        let name_w = wide(name);
        let flags = RRF_RT_REG_SZ | RRF_RT_REG_EXPAND_SZ | RRF_NOEXPAND;
        let mut size = 0u32;
        // SAFETY: 第一次调用只查询所需字节数
        let status = unsafe {
            RegGetValueW(
                HKEY_CURRENT_USER,
                PCWSTR(key.as_ptr()),
                PCWSTR(name_w.as_ptr()),
                flags,
                None,
                None,
                Some(&raw mut size),
            )
        };
        if status == ERROR_FILE_NOT_FOUND {
            return Ok(None);
        }
        status.ok().map_err(|_| storage_error(status, name))?;

        let units = usize::try_from(size).unwrap_or(0).div_ceil(2);
        let mut buffer = vec![0u16; units.max(1)];
        // SAFETY: buffer 至少有 size 字节
        let status = unsafe {
            RegGetValueW(
                HKEY_CURRENT_USER,
                PCWSTR(key.as_ptr()),
                PCWSTR(name_w.as_ptr()),
                flags,
                None,
                Some(buffer.as_mut_ptr().cast()),
                Some(&raw mut size),
            )
        };
        status.ok().map_err(|_| storage_error(status, name))?;
        let len = buffer.iter().position(|c| *c == 0).unwrap_or(buffer.len());
        Ok(Some(String::from_utf16_lossy(&buffer[..len])))
    }

    fn get_dword(key: &[u16], name: &str) -> Result<Option<u32>, IdentityError> {
        let name_w = wide(name);
        let mut value = 0u32;
        let mut size = u32::try_from(std::mem::size_of::<u32>()).unwrap_or(4);
        // SAFETY: value 为 4 字节缓冲
        let status = unsafe {
            RegGetValueW(
                HKEY_CURRENT_USER,
                PCWSTR(key.as_ptr()),
                PCWSTR(name_w.as_ptr()),
                RRF_RT_REG_DWORD,
                None,
                Some((&raw mut value).cast()),
                Some(&raw mut size),
            )
        };
        if status == ERROR_FILE_NOT_FOUND {
            return Ok(None);
        }
        status.ok().map_err(|_| storage_error(status, name))?;
        Ok(Some(value))
    }

    fn read(id: &str) -> Result<Option<Identity>, IdentityError> {
        let key = subkey(id);
        let Some(activator) = Self::get_string(&key, CUSTOM_ACTIVATOR)? else {
            return Ok(None);
        };
        Ok(Some(Identity {
            id: id.to_string(),
            display_name: Self::get_string(&key, DISPLAY_NAME)?.unwrap_or_else(|| id.to_string()),
            icon_uri: Self::get_string(&key, ICON_URI)?.filter(|uri| !uri.is_empty()),
            icon_background: Self::get_string(&key, ICON_BACKGROUND)?
                .unwrap_or_else(|| "00000000".to_string()),
            show_in_settings: Self::get_dword(&key, SHOW_IN_SETTINGS)?.unwrap_or(1) != 0,
            activator,
        }))
    }

    fn subkey_names() -> Result<Vec<String>, IdentityError> {
        let base = wide(BASE_KEY);
        let mut hkey = HKEY::default();
        // SAFETY: hkey 在成功后由 RegCloseKey 释放
        let status = unsafe { RegOpenKeyW(HKEY_CURRENT_USER, PCWSTR(base.as_ptr()), &mut hkey) };
        if status == ERROR_FILE_NOT_FOUND {
            return Ok(Vec::new());
        }
        status.ok().map_err(|_| storage_error(status, BASE_KEY))?;

        let mut names = Vec::new();
        let mut index = 0u32;
        let result = loop {
            // 子键名最长 255 个字符
            let mut buffer = [0u16; 256];
            // SAFETY: buffer 长度随切片传入
            let status = unsafe { RegEnumKeyW(hkey, index, Some(&mut buffer)) };
            if status == ERROR_NO_MORE_ITEMS {
                break Ok(());
            }
            if status.is_err() {
                break Err(storage_error(status, BASE_KEY));
            }
            let len = buffer.iter().position(|c| *c == 0).unwrap_or(buffer.len());
            names.push(String::from_utf16_lossy(&buffer[..len]));
            index += 1;
        };
        // SAFETY: hkey 由 RegOpenKeyW 打开
        let closed = unsafe { RegCloseKey(hkey) };
        if closed.is_err() {
            debug!("RegCloseKey failed: {:?}", closed);
        }
        result.map(|()| names)
    }
}

impl Default for RegistryIdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityStore for RegistryIdentityStore {
    async fn get(&self, id: &str) -> Result<Option<Identity>, IdentityError> {
        Self::read(id)
    }

    /// # Summary
    /// 写入身份子键。
    ///
    /// # Logic
    /// 1. `DisplayName` 以 REG_EXPAND_SZ 写入，其余字符串为 REG_SZ。
    /// 2. 没有图标时写入空串覆盖旧值，读取时视为无图标。
    /// 3. `ShowInSettings` 为 DWORD。
    async fn put(&self, identity: &Identity) -> Result<(), IdentityError> {
        let key = subkey(&identity.id);
        Self::set_string(&key, DISPLAY_NAME, &identity.display_name, REG_EXPAND_SZ)?;
        Self::set_string(&key, ICON_URI, identity.icon_uri.as_deref().unwrap_or(""), REG_SZ)?;
        Self::set_string(&key, ICON_BACKGROUND, &identity.icon_background, REG_SZ)?;
        Self::set_string(&key, CUSTOM_ACTIVATOR, &identity.activator, REG_SZ)?;
        Self::set_dword(&key, SHOW_IN_SETTINGS, u32::from(identity.show_in_settings))?;
        info!("Wrote identity {} to registry", identity.id);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, IdentityError> {
        let key = subkey(id);
        // SAFETY: key 以 NUL 结尾
        let status = unsafe { RegDeleteTreeW(HKEY_CURRENT_USER, PCWSTR(key.as_ptr())) };
        if status == ERROR_FILE_NOT_FOUND {
            return Ok(false);
        }
        status.ok().map_err(|_| storage_error(status, id))?;
        info!("Removed identity {} from registry", id);
        Ok(true)
    }

    async fn list(&self) -> Result<Vec<Identity>, IdentityError> {
        let mut all = Vec::new();
        for name in Self::subkey_names()? {
            if let Some(identity) = Self::read(&name)? {
                all.push(identity);
            }
        }
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }
}
