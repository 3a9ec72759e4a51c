//! 连接生命周期管理模块
//! Connection Lifecycle Management Module
//!
//! 该模块提供连接生命周期的统一管理，包括就绪状态、状态验证、转换逻辑和事件发布。
//!
//! This module provides unified connection lifecycle management, including the
//! ready state, state validation, transition logic and event publication.

mod manager;
mod state;
mod transitions;
mod validation;

pub use manager::LifecycleManager;
pub use state::ReadyState;
pub use transitions::{EventListener, LifecycleEvent, StateTransitionExecutor};
pub use validation::StateValidator;
