//! 应用身份 (AUMID) 记录的存储适配器。
pub mod mem;
pub mod sqlite;

#[cfg(windows)]
pub mod registry;
