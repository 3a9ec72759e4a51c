//! 连接状态转换逻辑模块
//! Connection State Transition Logic Module
//!
//! 该模块负责执行就绪状态的原子转换，并向已注册的监听器发布生命周期事件。
//!
//! This module executes atomic ready state transitions and publishes lifecycle
//! events to the registered listeners.

use super::{state::ReadyState, validation::StateValidator};
use parking_lot::RwLock;
use std::sync::{
    Arc,
    atomic::{AtomicU8, Ordering},
};
use tracing::{trace, warn};

/// 生命周期事件类型
/// Lifecycle event types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// 打开请求已被接受，驱动开始工作
    /// An open was accepted and handed to the driver
    Opening,
    /// 连接已打开
    /// The connection is open
    Open,
    /// 连接已关闭
    /// The connection is closed
    Close,
}

impl LifecycleEvent {
    /// The wire name of the event as subscribers know it.
    pub fn name(self) -> &'static str {
        match self {
            Self::Opening => "opening",
            Self::Open => "open",
            Self::Close => "close",
        }
    }

    /// 返回进入某状态时应发布的事件
    /// Returns the event published when a transition lands in `to`
    fn for_transition(from: ReadyState, to: ReadyState) -> Option<Self> {
        match (from, to) {
            (_, ReadyState::Connecting) => Some(Self::Opening),
            (_, ReadyState::Connected) => Some(Self::Open),
            (ReadyState::Disconnecting, ReadyState::Disconnected) => Some(Self::Close),
            _ => None,
        }
    }
}

/// 事件监听器类型定义
/// Event listener type definition
pub type EventListener = Box<dyn Fn(&LifecycleEvent) + Send + Sync>;

type SharedListener = Arc<dyn Fn(&LifecycleEvent) + Send + Sync>;

/// 状态转换执行器，负责执行状态转换和相关的事件处理
/// State transition executor responsible for executing state transitions and related event handling
pub struct StateTransitionExecutor {
    /// 连接ID，用于日志记录
    /// Connection ID for logging
    cid: u32,
    /// 事件监听器列表
    /// List of event listeners
    event_listeners: RwLock<Vec<SharedListener>>,
}

impl std::fmt::Debug for StateTransitionExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateTransitionExecutor")
            .field("cid", &self.cid)
            .field("event_listeners_count", &self.listener_count())
            .finish()
    }
}

impl StateTransitionExecutor {
    /// 创建新的状态转换执行器
    /// Create a new state transition executor
    pub fn new(cid: u32) -> Self {
        Self {
            cid,
            event_listeners: RwLock::new(Vec::new()),
        }
    }

    /// 执行状态转换
    ///
    /// 仅当 `cell` 当前持有 `from` 时才会写入 `to`。失败时返回实际状态。
    /// `on_commit` 在新状态写入之后、事件发布之前运行。
    ///
    /// Execute state transition
    ///
    /// `to` is only written if `cell` currently holds `from`; on refusal the
    /// actual state is returned. `on_commit` runs after the new state is stored
    /// and before the event is published, so listeners observe both.
    pub fn execute_transition<F>(
        &self,
        cell: &AtomicU8,
        from: ReadyState,
        to: ReadyState,
        on_commit: F,
    ) -> Result<(), ReadyState>
    where
        F: FnOnce(),
    {
        if !StateValidator::is_valid_transition(from, to) {
            warn!(
                cid = self.cid,
                current_state = %from,
                attempted_state = %to,
                "Invalid state transition attempted"
            );
            return Err(load(cell));
        }

        if let Err(actual) =
            cell.compare_exchange(from.code(), to.code(), Ordering::AcqRel, Ordering::Acquire)
        {
            let actual = ReadyState::from_code(actual).unwrap_or_default();
            trace!(
                cid = self.cid,
                expected = %from,
                actual = %actual,
                "State changed underneath transition"
            );
            return Err(actual);
        }

        trace!(cid = self.cid, from = %from, to = %to, "State transition executed");
        on_commit();

        if let Some(event) = LifecycleEvent::for_transition(from, to) {
            self.trigger_event(event);
        }
        Ok(())
    }

    /// 注册事件监听器
    /// Register event listener
    pub fn register_event_listener(&self, listener: EventListener) {
        self.event_listeners.write().push(Arc::from(listener));
    }

    /// 移除所有事件监听器
    /// Remove all event listeners
    pub fn clear_event_listeners(&self) {
        self.event_listeners.write().clear();
    }

    pub fn listener_count(&self) -> usize {
        self.event_listeners.read().len()
    }

    /// 触发生命周期事件
    ///
    /// 监听器在锁外运行，因此可以注册或移除监听器；这些变更从下一个事件开始生效。
    ///
    /// Trigger lifecycle event
    ///
    /// Listeners run outside the lock, so they may register or clear listeners;
    /// such changes apply from the next event on.
    pub fn trigger_event(&self, event: LifecycleEvent) {
        trace!(cid = self.cid, event = event.name(), "Publishing lifecycle event");
        let listeners = self.event_listeners.read().clone();
        for listener in &listeners {
            listener(&event);
        }
    }
}

pub(super) fn load(cell: &AtomicU8) -> ReadyState {
    ReadyState::from_code(cell.load(Ordering::Acquire)).unwrap_or_default()
}
