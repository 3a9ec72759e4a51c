//! The owning registry of base model definitions and of the connections built on them.
//!
//! 基础模型定义及基于它们创建的连接的所属注册表。

use crate::{
    completion::Completion,
    config::Config,
    connection::Connection,
    driver::Driver,
    error::Error,
    lifecycle::ReadyState,
    model::BaseModel,
};
use dashmap::{DashMap, mapref::entry::Entry};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Owns the master model definitions and the connections created from it.
///
/// Connections only hold a weak reference back, so dropping the registry does
/// not keep them from resolving already cached models.
///
/// 持有主模型定义以及由它创建的连接。连接只持有指回注册表的弱引用。
pub struct Base {
    config: Config,
    models: DashMap<String, BaseModel>,
    connections: DashMap<u32, Arc<Connection>>,
    this: Weak<Base>,
}

impl std::fmt::Debug for Base {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Base")
            .field("config", &self.config)
            .field("models", &self.model_names())
            .field("connections", &self.connections.len())
            .finish()
    }
}

impl Base {
    pub fn new() -> Arc<Self> {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            config,
            models: DashMap::new(),
            connections: DashMap::new(),
            this: this.clone(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registers a base definition under its name, returning the one it replaced.
    ///
    /// Connections that already bound the old definition keep their constructor.
    pub fn define(&self, model: BaseModel) -> Option<BaseModel> {
        debug!(model = model.name(), "Defining base model");
        self.models.insert(model.name().to_owned(), model)
    }

    pub fn base_model(&self, name: &str) -> Option<BaseModel> {
        self.models.get(name).map(|entry| entry.value().clone())
    }

    pub fn model_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.models.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Creates an empty, `Disconnected` connection driven by `driver`.
    pub fn connection(&self, driver: Arc<dyn Driver>) -> Arc<Connection> {
        loop {
            let cid = rand::random::<u32>();
            if let Entry::Vacant(slot) = self.connections.entry(cid) {
                let connection =
                    Connection::new(cid, self.this.clone(), driver, self.config.clone());
                slot.insert(Arc::clone(&connection));
                info!(cid, "Connection created");
                return connection;
            }
        }
    }

    pub fn get_connection(&self, cid: u32) -> Option<Arc<Connection>> {
        self.connections.get(&cid).map(|entry| Arc::clone(entry.value()))
    }

    pub fn connections(&self) -> Vec<Arc<Connection>> {
        self.connections
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Forgets a connection and closes its driver session.
    ///
    /// A `Disconnected` connection is dropped from the registry and the returned
    /// completion is settled `Ok`. An open connection is closed, and one that is
    /// still opening is closed once the open settles; the completion carries the
    /// outcome of that close. A connection that is `Disconnecting` (a close in
    /// flight, or one that failed) stays registered and the completion is
    /// settled with `InvalidState`. `None` if `cid` is unknown.
    ///
    /// 丢弃一个连接并关闭其驱动会话。正在关闭的连接不会被丢弃。
    pub fn discard(&self, cid: u32) -> Option<Completion> {
        let connection = self.get_connection(cid)?;
        let state = connection.ready_state();
        if state == ReadyState::Disconnecting {
            warn!(cid, "Refusing to discard a connection that is still closing");
            return Some(Completion::settled(Err(Error::still_closing(state))));
        }

        self.connections.remove(&cid);
        info!(cid, state = %state, "Discarding connection");
        match state {
            ReadyState::Disconnected => Some(Completion::settled(Ok(()))),
            _ => Some(connection.close_once_opened()),
        }
    }
}
