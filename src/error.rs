//! 定义了库中所有可能的错误类型。
//! Defines all possible error types in the library.

use crate::{driver::DriverError, lifecycle::ReadyState};
use thiserror::Error;

/// Errors raised while resolving connection parameters, before any state change.
/// 解析连接参数时产生的错误，发生在任何状态变更之前。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The resolved hostname was empty.
    /// 解析后的主机名为空。
    #[error("Please provide a valid hostname")]
    MissingHost,

    /// The resolved database name was empty.
    /// 解析后的数据库名为空。
    #[error("Please provide a database to connect to")]
    MissingDatabase,

    /// The connection string could not be parsed as a URI at all.
    /// 连接字符串完全无法解析为URI。
    #[error("invalid connection uri `{uri}`: {reason}")]
    InvalidUri { uri: String, reason: url::ParseError },
}

/// The primary error type for the connection core.
/// 连接核心的主要错误类型。
#[derive(Debug, Error)]
pub enum Error {
    /// `open` or `close` was requested from a state that does not allow it.
    /// 在不允许的状态下请求了 `open` 或 `close`。
    #[error("{message}")]
    InvalidState {
        message: &'static str,
        state: ReadyState,
    },

    /// Hostname or database name missing after parameter resolution.
    /// 参数解析后缺少主机名或数据库名。
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The driver reported a failure while opening or closing.
    /// 驱动在打开或关闭时报告了失败。
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// No base definition is registered under this model name.
    /// 该模型名下没有注册基础定义。
    #[error("Schema hasn't been registered for model \"{0}\"")]
    UnknownModel(String),

    /// The model has no instance method with this name.
    #[error("model \"{model}\" has no method \"{method}\"")]
    UnknownMethod { model: String, method: String },

    /// The model has no static with this name.
    #[error("model \"{model}\" has no static \"{name}\"")]
    UnknownStatic { model: String, name: String },

    /// The registry owning the base model definitions was dropped.
    /// 持有基础模型定义的注册表已被释放。
    #[error("the owning model registry has been dropped")]
    BaseDropped,

    /// The connection a model or collection was bound to no longer exists.
    /// 模型或集合所绑定的连接已不存在。
    #[error("the owning connection has been dropped")]
    ConnectionDropped,

    /// The task driving an open or close went away without reporting.
    /// 驱动打开或关闭的任务在报告结果前消失。
    #[error("Internal channel is broken")]
    ChannelClosed,

    /// `open` or `close` was called outside a tokio runtime, so the driver call
    /// could not be started. The ready state was left untouched.
    /// 在tokio运行时之外调用了 `open` 或 `close`，驱动调用无法启动。就绪状态未被改变。
    #[error("no tokio runtime available to run the driver call")]
    NoRuntime,
}

impl Error {
    pub(crate) fn already_open(state: ReadyState) -> Self {
        Self::InvalidState {
            message: "connection already open or opening",
            state,
        }
    }

    pub(crate) fn not_open(state: ReadyState) -> Self {
        Self::InvalidState {
            message: "connection not open",
            state,
        }
    }

    pub(crate) fn still_closing(state: ReadyState) -> Self {
        Self::InvalidState {
            message: "connection is still closing",
            state,
        }
    }
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        use std::io::ErrorKind;
        match err {
            Error::InvalidState { state, .. } if state == ReadyState::Connected => {
                std::io::Error::new(ErrorKind::AlreadyExists, err)
            }
            Error::InvalidState { .. } => std::io::Error::new(ErrorKind::NotConnected, err),
            Error::Configuration(e) => std::io::Error::new(ErrorKind::InvalidInput, e),
            Error::Driver(e) => std::io::Error::other(e),
            Error::UnknownModel(_) | Error::UnknownMethod { .. } | Error::UnknownStatic { .. } => {
                std::io::Error::new(ErrorKind::NotFound, err)
            }
            Error::BaseDropped | Error::ConnectionDropped | Error::NoRuntime => {
                std::io::Error::other(err)
            }
            Error::ChannelClosed => ErrorKind::BrokenPipe.into(),
        }
    }
}
