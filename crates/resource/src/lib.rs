//! 通知图片与声音资源的解析：下载、解码、图标渲染以及按通知划分的临时目录。
pub mod fetch;
pub mod icon;
pub mod resolver;
pub mod source;

pub use resolver::{
    ResolveOptions, ResolvedResources, ResolvedSource, ResourceResolver, ResourceSession,
    file_uri, markup_values,
};
