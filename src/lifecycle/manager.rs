//! 连接生命周期管理器 - 统一管理连接的完整生命周期
//! Connection Lifecycle Manager - Unified management of connection lifecycle
//!
//! 该模块把打开和关闭拆成"开始"和"完成"两步：开始步骤同步地验证并转换状态，
//! 完成步骤在驱动报告结果后执行。
//!
//! This module splits open and close into a begin step, which validates and
//! moves the state synchronously, and a finish step, which runs once the driver
//! has reported.

use super::{
    state::ReadyState,
    transitions::{self, EventListener, StateTransitionExecutor},
    validation::StateValidator,
};
use crate::{
    driver::DriverError,
    error::{Error, Result},
};
use std::sync::atomic::AtomicU8;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// 默认的生命周期管理器实现
/// Default lifecycle manager implementation
#[derive(Debug)]
pub struct LifecycleManager {
    /// 连接ID，用于日志记录
    /// Connection ID for logging
    cid: u32,
    /// 当前就绪状态
    /// Current ready state
    state: AtomicU8,
    /// 状态转换执行器
    /// State transition executor
    transition_executor: StateTransitionExecutor,
    /// 每次转换后广播的状态，供等待者使用
    /// State broadcast after every transition, for waiters
    state_watch: watch::Sender<ReadyState>,
}

impl LifecycleManager {
    /// 创建新的生命周期管理器
    /// Create a new lifecycle manager
    pub fn new(cid: u32) -> Self {
        Self {
            cid,
            state: AtomicU8::new(ReadyState::Disconnected.code()),
            transition_executor: StateTransitionExecutor::new(cid),
            state_watch: watch::Sender::new(ReadyState::Disconnected),
        }
    }

    /// 获取连接ID
    /// Gets the connection ID
    pub fn connection_id(&self) -> u32 {
        self.cid
    }

    /// 获取当前状态
    /// Get current state
    pub fn ready_state(&self) -> ReadyState {
        transitions::load(&self.state)
    }

    /// 检查连接是否处于活跃状态
    /// Check if connection is in active state
    pub fn is_active(&self) -> bool {
        StateValidator::is_active(self.ready_state())
    }

    /// 等待进行中的打开结束，返回此时的状态。不在Connecting时立即返回。
    ///
    /// Waits until an in-flight open has settled and returns the state it left
    /// behind. Returns at once when the state is not Connecting.
    pub async fn settle_open(&self) -> ReadyState {
        let mut states = self.state_watch.subscribe();
        match states.wait_for(|state| *state != ReadyState::Connecting).await {
            Ok(state) => *state,
            Err(_) => self.ready_state(),
        }
    }

    /// 开始打开：Disconnected -> Connecting，并发布 `opening`。
    ///
    /// Begin an open: Disconnected -> Connecting, publishing `opening`.
    /// `on_commit` runs once the open is accepted, before the event.
    pub fn begin_open<F: FnOnce()>(&self, on_commit: F) -> Result<()> {
        self.transition(ReadyState::Disconnected, ReadyState::Connecting, on_commit)
            .map_err(Error::already_open)
    }

    /// 完成打开。成功时进入Connected并发布 `open`；失败时回到Disconnected以便重试。
    ///
    /// Finish an open. Success moves to Connected and publishes `open`; failure
    /// falls back to Disconnected so the caller may retry.
    pub fn finish_open(&self, outcome: std::result::Result<(), DriverError>) -> Result<()> {
        match outcome {
            Ok(()) => {
                self.transition(ReadyState::Connecting, ReadyState::Connected, || {})
                    .map_err(|state| Error::InvalidState {
                        message: "connection state changed while opening",
                        state,
                    })?;
                info!(cid = self.cid, "Connection opened");
                Ok(())
            }
            Err(err) => {
                warn!(cid = self.cid, error = %err, "Driver failed to open connection");
                let _ = self.transition(ReadyState::Connecting, ReadyState::Disconnected, || {});
                Err(err.into())
            }
        }
    }

    /// 开始关闭：Connected -> Disconnecting。
    /// Begin a close: Connected -> Disconnecting.
    pub fn begin_close(&self) -> Result<()> {
        self.transition(ReadyState::Connected, ReadyState::Disconnecting, || {})
            .map_err(Error::not_open)
    }

    /// 完成关闭。失败时保持在Disconnecting，而不是悄悄回到Connected。
    ///
    /// Finish a close. On failure the state stays Disconnecting rather than
    /// silently reverting to Connected.
    pub fn finish_close(&self, outcome: std::result::Result<(), DriverError>) -> Result<()> {
        match outcome {
            Ok(()) => {
                self.transition(ReadyState::Disconnecting, ReadyState::Disconnected, || {})
                    .map_err(|state| Error::InvalidState {
                        message: "connection state changed while closing",
                        state,
                    })?;
                info!(cid = self.cid, "Connection closed");
                Ok(())
            }
            Err(err) => {
                warn!(
                    cid = self.cid,
                    error = %err,
                    "Driver failed to close connection, staying in disconnecting"
                );
                Err(err.into())
            }
        }
    }

    /// 注册事件监听器
    /// Register event listener
    pub fn register_event_listener(&self, listener: EventListener) {
        self.transition_executor.register_event_listener(listener);
    }

    /// 移除所有事件监听器
    /// Remove all event listeners
    pub fn clear_event_listeners(&self) {
        self.transition_executor.clear_event_listeners();
    }

    fn transition<F: FnOnce()>(
        &self,
        from: ReadyState,
        to: ReadyState,
        on_commit: F,
    ) -> std::result::Result<(), ReadyState> {
        debug!(
            cid = self.cid,
            current_state = %self.ready_state(),
            target_state = %to,
            "Attempting state transition"
        );
        self.transition_executor
            .execute_transition(&self.state, from, to, on_commit)?;
        // 在发送方的锁内重新读取，晚到的广播不会覆盖更新的状态
        self.state_watch.send_if_modified(|seen| {
            let current = transitions::load(&self.state);
            let changed = *seen != current;
            *seen = current;
            changed
        });
        Ok(())
    }
}
