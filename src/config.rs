//! 定义了连接和模型注册表的可配置参数。
//! Defines configurable parameters for connections and the model registry.

/// The port used when neither the explicit arguments nor the URI name one.
/// 当显式参数和URI都未指定端口时使用的端口。
pub const DEFAULT_PORT: u16 = 27017;

/// A structure containing all configurable parameters for a connection.
///
/// 包含所有连接可配置参数的结构体。
#[derive(Debug, Clone)]
pub struct Config {
    /// The port used when a connect target does not carry one.
    /// 连接目标未携带端口时使用的端口。
    pub default_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_port: DEFAULT_PORT,
        }
    }
}
