//! 应用服务层：通知分发与身份管理。

pub mod identity;
pub mod toaster;

pub use identity::{IdentityManager, RegisterRequest};
pub use toaster::{History, PendingToast, SubmitOptions, Toaster};
