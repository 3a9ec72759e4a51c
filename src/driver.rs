//! Traits for abstracting over the database driver that performs the real I/O.
use crate::params::ConnectParams;
use async_trait::async_trait;
use std::error::Error as StdError;
use thiserror::Error;

/// A failure reported by a driver while opening or closing a session.
///
/// The connection core never inspects it; it is handed back to the caller verbatim.
///
/// 驱动在打开或关闭会话时报告的失败。连接核心不会检查它，而是原样交还给调用者。
#[derive(Debug, Error)]
#[error("driver error: {message}")]
pub struct DriverError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl DriverError {
    /// Creates a driver error carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a driver error wrapping an underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<std::io::Error> for DriverError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(err.to_string(), err)
    }
}

/// An asynchronous database driver session.
///
/// This trait allows for abstracting over the underlying driver implementation,
/// enabling scripted drivers for testing or other purposes. Each call must
/// complete exactly once.
///
/// 异步数据库驱动会话接口。
///
/// 此trait允许对底层驱动实现进行抽象，从而可以为测试或其他目的提供脚本化驱动。
/// 每次调用必须恰好完成一次。
#[async_trait]
pub trait Driver: Send + Sync + 'static {
    /// Opens a session using the resolved parameters.
    async fn open(&self, params: &ConnectParams) -> Result<(), DriverError>;

    /// Closes the session opened by the last successful `open`.
    async fn close(&self) -> Result<(), DriverError>;
}
