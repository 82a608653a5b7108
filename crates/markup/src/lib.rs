//! 通知内容的校验与 toast XML 序列化。

pub mod node;
pub mod serialize;
pub mod validate;

pub use serialize::{Markup, ResourceRef, SerializeOptions, serialize};
pub use validate::validate;
