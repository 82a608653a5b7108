//! 通知领域的实体、端口 (Port) 与错误定义。
//!
//! 所有适配器 crate 仅依赖本 crate 中的 Trait，具体实现在应用层注入。

pub mod config;

pub mod toast {
    pub mod binding;
    pub mod element;
    pub mod entity;
    pub mod error;
    pub mod port;

    #[cfg(feature = "test-utils")]
    pub mod mock;
}

pub mod resource {
    pub mod error;
    pub mod port;
}

pub mod identity {
    pub mod entity;
    pub mod error;
    pub mod port;
}
