#![deny(clippy::expect_used, clippy::unwrap_used)]

//! The connection core of a document database client: the ready-state machine,
//! connect parameter resolution and the per-connection collection and model caches.
//! 文档数据库客户端的连接核心：就绪状态机、连接参数解析以及每个连接的集合与模型缓存。

pub mod base;
pub mod collection;
pub mod completion;
pub mod config;
pub mod connection;
pub mod driver;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod params;

#[cfg(test)]
pub mod test_utils;

pub use base::Base;
pub use collection::Collection;
pub use completion::Completion;
pub use config::Config;
pub use connection::Connection;
pub use driver::{Driver, DriverError};
pub use error::{ConfigurationError, Error, Result};
pub use lifecycle::{LifecycleEvent, ReadyState};
pub use model::{BaseModel, Document, Model, ModelConstructor, ModelInstance};
pub use params::{Auth, ConnectParams, ConnectTarget};
