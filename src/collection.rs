//! Per-connection cache of collection handles.
//!
//! 每个连接的集合句柄缓存。

use crate::connection::Connection;
use dashmap::{DashMap, mapref::entry::Entry};
use std::sync::{Arc, Weak};
use tracing::trace;

/// An opaque handle naming one collection of the owning connection's database.
///
/// The handle exists independently of the connection's ready state; operations
/// issued through it are the driver's concern.
///
/// 指向所属连接数据库中某个集合的不透明句柄。
#[derive(Debug)]
pub struct Collection {
    name: String,
    connection: Weak<Connection>,
}

impl Collection {
    fn new(name: String, connection: Weak<Connection>) -> Self {
        Self { name, connection }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The owning connection, if it is still alive.
    pub fn connection(&self) -> Option<Arc<Connection>> {
        self.connection.upgrade()
    }

    /// `database.collection`, once the owning connection knows its database name.
    pub fn namespace(&self) -> Option<String> {
        let connection = self.connection()?;
        let database = connection.name()?;
        Some(format!("{database}.{}", self.name))
    }
}

/// 集合注册表：名称到句柄的缓存，缺失时创建。
/// Collection registry: a cache-or-create map from name to handle.
#[derive(Debug, Default)]
pub(crate) struct CollectionRegistry {
    collections: DashMap<String, Arc<Collection>>,
}

impl CollectionRegistry {
    /// Returns the cached handle for `name`, creating it bound to `owner` on a miss.
    /// The slot is filled under the shard lock, so concurrent first access still
    /// yields one instance.
    pub(crate) fn get_or_create(&self, name: &str, owner: &Weak<Connection>) -> Arc<Collection> {
        if let Some(existing) = self.collections.get(name) {
            trace!(collection = name, "Collection cache hit");
            return Arc::clone(existing.value());
        }

        match self.collections.entry(name.to_owned()) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                trace!(collection = name, "Creating collection handle");
                let handle = Arc::new(Collection::new(name.to_owned(), owner.clone()));
                Arc::clone(entry.insert(handle).value())
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn get(&self, name: &str) -> Option<Arc<Collection>> {
        self.collections.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub(crate) fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.collections.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub(crate) fn len(&self) -> usize {
        self.collections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_name_same_handle() {
        let registry = CollectionRegistry::default();
        let owner = Weak::new();

        let first = registry.get_or_create("users", &owner);
        let second = registry.get_or_create("users", &owner);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_names_distinct_handles() {
        let registry = CollectionRegistry::default();
        let owner = Weak::new();

        let users = registry.get_or_create("users", &owner);
        let posts = registry.get_or_create("posts", &owner);
        assert!(!Arc::ptr_eq(&users, &posts));
        assert_eq!(users.name(), "users");
        assert_eq!(posts.name(), "posts");
        assert_eq!(registry.names(), vec!["posts".to_string(), "users".to_string()]);
    }

    #[test]
    fn test_dangling_owner() {
        let registry = CollectionRegistry::default();
        let handle = registry.get_or_create("users", &Weak::new());
        assert!(handle.connection().is_none());
        assert!(handle.namespace().is_none());
        assert!(registry.get("users").is_some());
        assert!(registry.get("posts").is_none());
    }

    #[test]
    fn test_concurrent_first_access_yields_one_handle() {
        let registry = Arc::new(CollectionRegistry::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.get_or_create("users", &Weak::new()))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for handle in &results[1..] {
            assert!(Arc::ptr_eq(&results[0], handle));
        }
    }
}
