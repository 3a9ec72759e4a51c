//! 定义了单个逻辑数据库连接。
//! Defines a single logical database connection.
//!
//! A [`Connection`] owns its ready state, the parameters of its last accepted
//! open, and two caches: collection handles and connection-bound model
//! constructors. Driver I/O runs on spawned tokio tasks; callers observe the
//! outcome through the returned [`Completion`] and through lifecycle events.

use crate::{
    base::Base,
    collection::{Collection, CollectionRegistry},
    completion::Completion,
    config::Config,
    driver::Driver,
    error::{Error, Result},
    lifecycle::{EventListener, LifecycleManager, ReadyState, StateValidator},
    model::{Model, ModelRegistry},
    params::{ConnectParams, ConnectTarget},
};
use parking_lot::RwLock;
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

/// Represents a single logical connection to a document database.
///
/// Created empty and `Disconnected` by [`Base::connection`].
///
/// 代表一个到文档数据库的逻辑连接。由 [`Base::connection`] 创建，初始为空且处于 `Disconnected`。
pub struct Connection {
    lifecycle: Arc<LifecycleManager>,
    driver: Arc<dyn Driver>,
    config: Config,
    /// Parameters of the last accepted open.
    /// 最近一次被接受的打开请求的参数。
    params: RwLock<Option<ConnectParams>>,
    collections: CollectionRegistry,
    models: ModelRegistry,
    base: Weak<Base>,
    this: Weak<Connection>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("cid", &self.id())
            .field("ready_state", &self.ready_state())
            .field("params", &*self.params.read())
            .field("collections", &self.collections.len())
            .finish()
    }
}

impl Connection {
    pub(crate) fn new(
        cid: u32,
        base: Weak<Base>,
        driver: Arc<dyn Driver>,
        config: Config,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            lifecycle: Arc::new(LifecycleManager::new(cid)),
            driver,
            config,
            params: RwLock::new(None),
            collections: CollectionRegistry::default(),
            models: ModelRegistry::default(),
            base,
            this: this.clone(),
        })
    }

    /// 获取连接ID
    /// Gets the connection ID
    pub fn id(&self) -> u32 {
        self.lifecycle.connection_id()
    }

    pub fn ready_state(&self) -> ReadyState {
        self.lifecycle.ready_state()
    }

    /// The owning registry, if it is still alive.
    pub fn base(&self) -> Option<Arc<Base>> {
        self.base.upgrade()
    }

    /// The resolved parameters of the last accepted open.
    pub fn params(&self) -> Option<ConnectParams> {
        self.params.read().clone()
    }

    pub fn host(&self) -> Option<String> {
        self.params.read().as_ref().map(|p| p.host.clone())
    }

    pub fn port(&self) -> Option<u16> {
        self.params.read().as_ref().map(|p| p.port)
    }

    /// The database name.
    pub fn name(&self) -> Option<String> {
        self.params.read().as_ref().map(|p| p.database.clone())
    }

    pub fn user(&self) -> Option<String> {
        self.params.read().as_ref().and_then(|p| p.user().map(str::to_owned))
    }

    pub fn pass(&self) -> Option<String> {
        self.params.read().as_ref().and_then(|p| p.pass().map(str::to_owned))
    }

    /// Opens the connection.
    ///
    /// `target` is either a URI (`&str`, `String`) or explicit
    /// `(host, database)` / `(host, database, port)` parts.
    ///
    /// A missing hostname or database name is returned synchronously as
    /// `Err(Error::Configuration)`, before any state change or I/O. Otherwise the
    /// returned [`Completion`] carries the outcome: already settled with
    /// `InvalidState` unless the connection is `Disconnected`, already settled
    /// with `NoRuntime` when called outside a tokio runtime, or pending on the
    /// driver. On success the state is `Connected` and `open` has been published
    /// before the completion resolves; on driver failure the state falls back to
    /// `Disconnected`.
    ///
    /// 打开连接。配置错误同步返回；其余结果通过返回的 [`Completion`] 传递。
    pub fn open(&self, target: impl Into<ConnectTarget>) -> Result<Completion> {
        let target = target.into();
        let cid = self.id();

        let state = self.ready_state();
        if !StateValidator::can_open(state) {
            debug!(cid, state = %state, "Rejecting open of unclosed connection");
            return Ok(Completion::settled(Err(Error::already_open(state))));
        }

        let params = ConnectParams::resolve(&target, &self.config)?;

        let Ok(runtime) = Handle::try_current() else {
            warn!(cid, "Rejecting open outside a tokio runtime");
            return Ok(Completion::settled(Err(Error::NoRuntime)));
        };

        if let Err(err) = self.lifecycle.begin_open(|| {
            *self.params.write() = Some(params.clone());
        }) {
            debug!(cid, error = %err, "Open lost the race to another request");
            return Ok(Completion::settled(Err(err)));
        }

        info!(
            cid,
            host = %params.host,
            port = params.port,
            database = %params.database,
            authenticated = params.auth.is_some(),
            "Opening connection"
        );

        let (completion, tx) = Completion::pending(runtime.clone());
        let lifecycle = Arc::clone(&self.lifecycle);
        let driver = Arc::clone(&self.driver);
        runtime.spawn(async move {
            let outcome = driver.open(&params).await;
            let _ = tx.send(lifecycle.finish_open(outcome));
        });
        Ok(completion)
    }

    /// Closes the connection.
    ///
    /// The returned [`Completion`] is already settled with `InvalidState` unless
    /// the connection is `Connected`, or with `NoRuntime` when called outside a
    /// tokio runtime. On success the state is `Disconnected` and `close` has been
    /// published before the completion resolves; on driver failure the state
    /// stays `Disconnecting`.
    ///
    /// 关闭连接。
    pub fn close(&self) -> Completion {
        let state = self.ready_state();
        if !StateValidator::can_close(state) {
            debug!(cid = self.id(), state = %state, "Rejecting close of unopened connection");
            return Completion::settled(Err(Error::not_open(state)));
        }

        let Ok(runtime) = Handle::try_current() else {
            warn!(cid = self.id(), "Rejecting close outside a tokio runtime");
            return Completion::settled(Err(Error::NoRuntime));
        };
        start_close(&self.lifecycle, &self.driver, &runtime)
    }

    /// Closes the connection once an open in flight has settled.
    ///
    /// A connection left `Disconnected` (never opened, or the open failed)
    /// resolves `Ok` without touching the driver; otherwise this behaves like
    /// [`close`](Self::close) issued after the open finished.
    ///
    /// 在进行中的打开结束后关闭连接。
    pub(crate) fn close_once_opened(&self) -> Completion {
        let Ok(runtime) = Handle::try_current() else {
            warn!(cid = self.id(), "Rejecting close outside a tokio runtime");
            return Completion::settled(Err(Error::NoRuntime));
        };

        let (completion, tx) = Completion::pending(runtime.clone());
        let lifecycle = Arc::clone(&self.lifecycle);
        let driver = Arc::clone(&self.driver);
        runtime.clone().spawn(async move {
            let outcome = match lifecycle.settle_open().await {
                ReadyState::Disconnected => Ok(()),
                _ => start_close(&lifecycle, &driver, &runtime).await,
            };
            let _ = tx.send(outcome);
        });
        completion
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle.is_active()
    }

    /// Retrieves a collection handle, creating and caching it on first use.
    /// Works in every ready state.
    ///
    /// 获取集合句柄，首次使用时创建并缓存。在任何就绪状态下都可用。
    pub fn collection(&self, name: &str) -> Arc<Collection> {
        self.collections.get_or_create(name, &self.this)
    }

    pub fn collection_names(&self) -> Vec<String> {
        self.collections.names()
    }

    /// Retrieves the model constructor bound to this connection, deriving it from
    /// the owning registry's base definition on first use.
    ///
    /// 获取绑定到此连接的模型构造器，首次使用时从所属注册表的基础定义派生。
    pub fn model(&self, name: &str) -> Result<Arc<Model>> {
        self.models.get_or_bind(name, &self.this, |name| {
            let base = self.base.upgrade().ok_or(Error::BaseDropped)?;
            base.base_model(name)
                .ok_or_else(|| Error::UnknownModel(name.to_owned()))
        })
    }

    pub fn model_names(&self) -> Vec<String> {
        self.models.names()
    }

    /// 注册事件监听器
    /// Register event listener
    pub fn register_event_listener(&self, listener: EventListener) {
        self.lifecycle.register_event_listener(listener);
    }

    /// 移除所有事件监听器
    /// Remove all event listeners
    pub fn clear_event_listeners(&self) {
        self.lifecycle.clear_event_listeners();
    }
}

fn start_close(
    lifecycle: &Arc<LifecycleManager>,
    driver: &Arc<dyn Driver>,
    runtime: &Handle,
) -> Completion {
    let cid = lifecycle.connection_id();
    if let Err(err) = lifecycle.begin_close() {
        debug!(cid, error = %err, "Rejecting close of unopened connection");
        return Completion::settled(Err(err));
    }

    info!(cid, "Closing connection");
    let (completion, tx) = Completion::pending(runtime.clone());
    let lifecycle = Arc::clone(lifecycle);
    let driver = Arc::clone(driver);
    runtime.spawn(async move {
        let outcome = driver.close().await;
        let _ = tx.send(lifecycle.finish_close(outcome));
    });
    completion
}
