//! 连接状态验证逻辑模块
//! Connection State Validation Logic Module
//!
//! 该模块负责就绪状态的转换验证以及打开/关闭的前置条件检查。
//!
//! This module handles ready state transition validation and the
//! preconditions of open and close.

use super::state::ReadyState;

/// 状态验证器，负责所有状态相关的验证和检查逻辑
/// State validator responsible for all state-related validation and check logic
pub struct StateValidator;

impl StateValidator {
    /// 验证状态转换是否合法
    /// Validate if state transition is legal
    pub fn is_valid_transition(current_state: ReadyState, new_state: ReadyState) -> bool {
        use ReadyState::*;

        matches!(
            (current_state, new_state),
            (Disconnected, Connecting)
                | (Connecting, Connected)
                // 打开失败后回到Disconnected，以便重试
                // A failed open falls back to Disconnected so it can be retried
                | (Connecting, Disconnected)
                | (Connected, Disconnecting)
                | (Disconnecting, Disconnected)
        )
    }

    /// 检查是否可以开始打开连接
    /// Check if an open may be started
    pub fn can_open(state: ReadyState) -> bool {
        state == ReadyState::Disconnected
    }

    /// 检查是否可以开始关闭连接
    /// Check if a close may be started
    pub fn can_close(state: ReadyState) -> bool {
        state == ReadyState::Connected
    }

    /// 检查连接是否处于活跃状态
    /// Check if connection is in active state
    pub fn is_active(state: ReadyState) -> bool {
        matches!(state, ReadyState::Connected | ReadyState::Connecting)
    }

    /// 检查是否有驱动操作正在进行
    /// Check if a driver operation is in flight
    pub fn is_transitional(state: ReadyState) -> bool {
        matches!(state, ReadyState::Connecting | ReadyState::Disconnecting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReadyState::*;

    const ALL: [ReadyState; 4] = [Disconnected, Connected, Connecting, Disconnecting];

    #[test]
    fn test_valid_transitions() {
        assert!(StateValidator::is_valid_transition(Disconnected, Connecting));
        assert!(StateValidator::is_valid_transition(Connecting, Connected));
        assert!(StateValidator::is_valid_transition(Connecting, Disconnected));
        assert!(StateValidator::is_valid_transition(Connected, Disconnecting));
        assert!(StateValidator::is_valid_transition(Disconnecting, Disconnected));
    }

    #[test]
    fn test_invalid_transitions() {
        // 不能跳过中间状态
        assert!(!StateValidator::is_valid_transition(Disconnected, Connected));
        assert!(!StateValidator::is_valid_transition(Connected, Disconnected));
        // 关闭失败后不能悄悄回到Connected
        assert!(!StateValidator::is_valid_transition(Disconnecting, Connected));
        // 同状态转换无效
        for state in ALL {
            assert!(!StateValidator::is_valid_transition(state, state));
        }
    }

    #[test]
    fn test_open_close_preconditions() {
        for state in ALL {
            assert_eq!(StateValidator::can_open(state), state == Disconnected);
            assert_eq!(StateValidator::can_close(state), state == Connected);
        }
    }

    #[test]
    fn test_activity_checks() {
        assert!(StateValidator::is_active(Connected));
        assert!(StateValidator::is_active(Connecting));
        assert!(!StateValidator::is_active(Disconnected));
        assert!(!StateValidator::is_active(Disconnecting));

        assert!(StateValidator::is_transitional(Connecting));
        assert!(StateValidator::is_transitional(Disconnecting));
        assert!(!StateValidator::is_transitional(Connected));
    }
}
