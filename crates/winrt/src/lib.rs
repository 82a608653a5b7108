//! Windows 通知平台适配器，仅在 Windows 上编译。
#![cfg(windows)]

pub mod platform;
pub mod shell;
pub mod theme;

pub use platform::WinRtPlatform;
pub use shell::set_process_app_id;
pub use theme::WinRtTheme;
