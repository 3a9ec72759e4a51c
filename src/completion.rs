//! The outcome of an `open` or `close` request.
//!
//! 一次 `open` 或 `close` 请求的结果。

use crate::error::{Error, Result};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::{runtime::Handle, sync::oneshot};

enum CompletionState {
    /// Settled before any I/O, e.g. a request refused because of the ready state.
    Settled(Option<Result<()>>),
    /// Waiting for the task that drives the driver call.
    Pending {
        receiver: oneshot::Receiver<Result<()>>,
        runtime: Handle,
    },
}

/// Resolves exactly once with the outcome of an accepted request, or
/// immediately with the error of a refused one.
///
/// Dropping a `Completion` discards the outcome; the request itself still runs
/// to the end.
///
/// 对已接受的请求恰好解析一次，对被拒绝的请求立即解析为错误。
/// 丢弃 `Completion` 会丢弃结果，但请求本身仍会执行完毕。
#[must_use = "the outcome of the request is lost if the completion is dropped"]
pub struct Completion {
    state: CompletionState,
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            CompletionState::Settled(_) => "settled",
            CompletionState::Pending { .. } => "pending",
        };
        f.debug_struct("Completion").field("state", &state).finish()
    }
}

impl Completion {
    pub(crate) fn settled(result: Result<()>) -> Self {
        Self {
            state: CompletionState::Settled(Some(result)),
        }
    }

    /// Creates a pending completion and the sender that settles it. Callbacks
    /// attached with [`on_complete`](Self::on_complete) run on `runtime`.
    pub(crate) fn pending(runtime: Handle) -> (Self, oneshot::Sender<Result<()>>) {
        let (tx, rx) = oneshot::channel();
        let completion = Self {
            state: CompletionState::Pending {
                receiver: rx,
                runtime,
            },
        };
        (completion, tx)
    }

    /// True if the outcome was known when the request returned.
    pub fn is_settled(&self) -> bool {
        matches!(self.state, CompletionState::Settled(_))
    }

    /// Hands the outcome to `callback`.
    ///
    /// A settled completion calls it synchronously, before this method returns;
    /// a pending one calls it from a task on the runtime that accepted the request.
    pub fn on_complete<F>(self, callback: F)
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        match self.state {
            CompletionState::Settled(result) => {
                callback(result.unwrap_or(Err(Error::ChannelClosed)));
            }
            CompletionState::Pending { receiver, runtime } => {
                runtime.spawn(async move {
                    callback(receiver.await.unwrap_or(Err(Error::ChannelClosed)));
                });
            }
        }
    }
}

impl Future for Completion {
    type Output = Result<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            CompletionState::Settled(result) => {
                Poll::Ready(result.take().unwrap_or(Err(Error::ChannelClosed)))
            }
            CompletionState::Pending { receiver, .. } => Pin::new(receiver)
                .poll(cx)
                .map(|received| received.unwrap_or(Err(Error::ChannelClosed))),
        }
    }
}
