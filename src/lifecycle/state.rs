//! Defines the ready state of a connection.
//!
//! 定义连接的就绪状态。

use std::fmt;

/// The lifecycle status of a connection. The discriminants are the public
/// numeric codes and never change.
///
/// 连接的生命周期状态。判别值即公开的数字代码，永不改变。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ReadyState {
    /// No session. The only state from which a connection may be opened.
    /// 无会话。唯一可以打开连接的状态。
    #[default]
    Disconnected = 0,

    /// The driver reported a successful open.
    /// 驱动报告打开成功。
    Connected = 1,

    /// An open was accepted and the driver is working on it.
    /// 打开请求已被接受，驱动正在处理。
    Connecting = 2,

    /// A close was accepted and the driver is working on it.
    /// 关闭请求已被接受，驱动正在处理。
    Disconnecting = 3,
}

impl ReadyState {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Disconnected),
            1 => Some(Self::Connected),
            2 => Some(Self::Connecting),
            3 => Some(Self::Disconnecting),
            _ => None,
        }
    }

    /// 获取状态的字符串表示（用于日志）
    /// Gets the string representation of the state (for logging)
    pub fn name(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Connecting => "connecting",
            Self::Disconnecting => "disconnecting",
        }
    }
}

impl TryFrom<u8> for ReadyState {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or(code)
    }
}

impl From<ReadyState> for u8 {
    fn from(state: ReadyState) -> Self {
        state.code()
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for state in [
            ReadyState::Disconnected,
            ReadyState::Connected,
            ReadyState::Connecting,
            ReadyState::Disconnecting,
        ] {
            assert_eq!(ReadyState::try_from(state.code()), Ok(state));
        }
        assert_eq!(ReadyState::try_from(4), Err(4));
    }

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(u8::from(ReadyState::Disconnected), 0);
        assert_eq!(u8::from(ReadyState::Connected), 1);
        assert_eq!(u8::from(ReadyState::Connecting), 2);
        assert_eq!(u8::from(ReadyState::Disconnecting), 3);
        assert_eq!(ReadyState::default(), ReadyState::Disconnected);
        assert_eq!(ReadyState::Disconnecting.to_string(), "disconnecting");
    }
}
