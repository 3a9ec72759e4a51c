//! 模型定义、连接绑定的模型构造器以及每个连接的模型缓存。
//! Model definitions, connection-bound model constructors and the per-connection
//! model cache.
//!
//! A [`BaseModel`] is the connection-independent template registered on a
//! [`Base`](crate::base::Base). [`Connection::model`](crate::connection::Connection::model)
//! derives a [`Model`] from it: the bound constructor embeds the base definition,
//! carries its own copy of every static, and binds each instance it produces to
//! its connection. Both implement [`ModelConstructor`], so a bound model can be
//! used anywhere the base definition is accepted.

use crate::{
    collection::Collection,
    connection::Connection,
    error::{Error, Result},
};
use dashmap::{DashMap, mapref::entry::Entry};
use serde_json::Value;
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Weak},
};
use tracing::{debug, trace};

/// The field map of a single model instance.
pub type Document = serde_json::Map<String, Value>;

/// Runs on every freshly constructed instance.
pub type Initializer = Arc<dyn Fn(&mut ModelInstance) -> Result<()> + Send + Sync>;

/// An instance-level capability of a model.
pub type Method = Arc<dyn Fn(&ModelInstance, &[Value]) -> Result<Value> + Send + Sync>;

/// A class-level capability of a model. It receives the constructor it was
/// invoked through, so a static called on a bound model sees that model's
/// connection.
pub type StaticFn = Arc<dyn Fn(&dyn ModelConstructor, &[Value]) -> Result<Value> + Send + Sync>;

/// 模型构造器的公共接口，基础定义和绑定模型都实现它
/// The constructor contract shared by base definitions and bound models.
pub trait ModelConstructor: Send + Sync {
    fn model_name(&self) -> &str;

    fn collection_name(&self) -> &str;

    /// The connection instances are bound to, `None` for a base definition.
    fn db(&self) -> Option<Arc<Connection>>;

    /// Creates an instance from `document` and runs the model's initializer on it.
    fn construct(&self, document: Document) -> Result<ModelInstance>;

    /// Names of every static callable through this constructor.
    fn static_names(&self) -> Vec<&str>;

    fn call_static(&self, name: &str, args: &[Value]) -> Result<Value>;
}

struct Definition {
    name: String,
    collection: String,
    initializer: Option<Initializer>,
    methods: HashMap<String, Method>,
    statics: HashMap<String, StaticFn>,
}

/// The connection-independent definition of a named model.
///
/// Cheap to clone; clones share the same definition.
///
/// 与连接无关的命名模型定义。克隆开销很小，克隆体共享同一份定义。
#[derive(Clone)]
pub struct BaseModel {
    inner: Arc<Definition>,
}

impl fmt::Debug for BaseModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseModel")
            .field("name", &self.inner.name)
            .field("collection", &self.inner.collection)
            .field("methods", &self.inner.methods.keys().collect::<Vec<_>>())
            .field("statics", &self.inner.statics.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl BaseModel {
    pub fn builder(name: impl Into<String>) -> BaseModelBuilder {
        BaseModelBuilder {
            name: name.into(),
            collection: None,
            initializer: None,
            methods: HashMap::new(),
            statics: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.inner.methods.contains_key(name)
    }

    pub fn method_names(&self) -> Vec<&str> {
        sorted_keys(&self.inner.methods)
    }

    /// 创建实例：先绑定连接，再运行初始化器
    /// Creates an instance, binding `db` before the initializer runs.
    fn instantiate(&self, document: Document, db: Option<Arc<Connection>>) -> Result<ModelInstance> {
        let mut instance = ModelInstance {
            model: self.clone(),
            document,
            db,
        };
        if let Some(init) = &self.inner.initializer {
            init(&mut instance)?;
        }
        Ok(instance)
    }

    fn static_fn(&self, name: &str) -> Option<&StaticFn> {
        self.inner.statics.get(name)
    }
}

impl ModelConstructor for BaseModel {
    fn model_name(&self) -> &str {
        &self.inner.name
    }

    fn collection_name(&self) -> &str {
        &self.inner.collection
    }

    fn db(&self) -> Option<Arc<Connection>> {
        None
    }

    fn construct(&self, document: Document) -> Result<ModelInstance> {
        self.instantiate(document, None)
    }

    fn static_names(&self) -> Vec<&str> {
        sorted_keys(&self.inner.statics)
    }

    fn call_static(&self, name: &str, args: &[Value]) -> Result<Value> {
        let f = self.static_fn(name).ok_or_else(|| Error::UnknownStatic {
            model: self.inner.name.clone(),
            name: name.to_owned(),
        })?;
        f(self, args)
    }
}

/// Assembles a [`BaseModel`].
pub struct BaseModelBuilder {
    name: String,
    collection: Option<String>,
    initializer: Option<Initializer>,
    methods: HashMap<String, Method>,
    statics: HashMap<String, StaticFn>,
}

impl BaseModelBuilder {
    /// Overrides the collection name, which otherwise is the lowercased model name.
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.collection = Some(name.into());
        self
    }

    pub fn init<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut ModelInstance) -> Result<()> + Send + Sync + 'static,
    {
        self.initializer = Some(Arc::new(f));
        self
    }

    pub fn method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&ModelInstance, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Arc::new(f));
        self
    }

    pub fn static_fn<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&dyn ModelConstructor, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.statics.insert(name.into(), Arc::new(f));
        self
    }

    pub fn build(self) -> BaseModel {
        let collection = self
            .collection
            .unwrap_or_else(|| self.name.to_lowercase());
        BaseModel {
            inner: Arc::new(Definition {
                name: self.name,
                collection,
                initializer: self.initializer,
                methods: self.methods,
                statics: self.statics,
            }),
        }
    }
}

/// A model constructor bound to one connection.
///
/// 绑定到某个连接的模型构造器。
pub struct Model {
    base: BaseModel,
    statics: HashMap<String, StaticFn>,
    connection: Weak<Connection>,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.base.name())
            .field("statics", &self.static_names())
            .field("bound", &(self.connection.strong_count() > 0))
            .finish()
    }
}

impl Model {
    fn bind(base: &BaseModel, connection: Weak<Connection>) -> Self {
        Self {
            base: base.clone(),
            statics: base.inner.statics.clone(),
            connection,
        }
    }

    /// The base definition this constructor delegates to.
    pub fn base(&self) -> &BaseModel {
        &self.base
    }

    /// The collection handle of this model on the bound connection.
    pub fn collection(&self) -> Result<Arc<Collection>> {
        let connection = self.connection.upgrade().ok_or(Error::ConnectionDropped)?;
        Ok(connection.collection(self.base.collection_name()))
    }
}

impl ModelConstructor for Model {
    fn model_name(&self) -> &str {
        self.base.name()
    }

    fn collection_name(&self) -> &str {
        self.base.collection_name()
    }

    fn db(&self) -> Option<Arc<Connection>> {
        self.connection.upgrade()
    }

    fn construct(&self, document: Document) -> Result<ModelInstance> {
        let connection = self.connection.upgrade().ok_or(Error::ConnectionDropped)?;
        self.base.instantiate(document, Some(connection))
    }

    fn static_names(&self) -> Vec<&str> {
        sorted_keys(&self.statics)
    }

    fn call_static(&self, name: &str, args: &[Value]) -> Result<Value> {
        let f = self.statics.get(name).ok_or_else(|| Error::UnknownStatic {
            model: self.base.name().to_owned(),
            name: name.to_owned(),
        })?;
        f(self, args)
    }
}

/// A single document produced by a model constructor.
///
/// 由模型构造器产生的单个文档实例。
#[derive(Clone)]
pub struct ModelInstance {
    model: BaseModel,
    document: Document,
    db: Option<Arc<Connection>>,
}

impl fmt::Debug for ModelInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelInstance")
            .field("model", &self.model.name())
            .field("document", &self.document)
            .field("db", &self.db.as_ref().map(|db| db.id()))
            .finish()
    }
}

impl ModelInstance {
    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// The connection this instance is bound to, `None` when it was constructed
    /// straight from a base definition.
    pub fn db(&self) -> Option<&Arc<Connection>> {
        self.db.as_ref()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.document.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.document.insert(field.into(), value.into());
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    /// Invokes an instance method of the model.
    pub fn call(&self, method: &str, args: &[Value]) -> Result<Value> {
        let f = self
            .model
            .inner
            .methods
            .get(method)
            .ok_or_else(|| Error::UnknownMethod {
                model: self.model.name().to_owned(),
                method: method.to_owned(),
            })?;
        f(self, args)
    }

    /// The collection handle of this instance's model on its connection.
    pub fn collection(&self) -> Result<Arc<Collection>> {
        let db = self.db.as_ref().ok_or(Error::ConnectionDropped)?;
        Ok(db.collection(self.model.collection_name()))
    }
}

/// 模型注册表：每个连接的模型名到绑定构造器的缓存
/// Model registry: the per-connection cache from model name to bound constructor.
#[derive(Debug, Default)]
pub(crate) struct ModelRegistry {
    models: DashMap<String, Arc<Model>>,
}

impl ModelRegistry {
    /// Returns the cached constructor for `name`, or binds `lookup`'s base
    /// definition to `owner` on a miss. The slot is filled under the shard lock.
    pub(crate) fn get_or_bind<F>(
        &self,
        name: &str,
        owner: &Weak<Connection>,
        lookup: F,
    ) -> Result<Arc<Model>>
    where
        F: FnOnce(&str) -> Result<BaseModel>,
    {
        if let Some(existing) = self.models.get(name) {
            trace!(model = name, "Model cache hit");
            return Ok(Arc::clone(existing.value()));
        }

        match self.models.entry(name.to_owned()) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let base = lookup(name)?;
                debug!(
                    model = name,
                    statics = base.inner.statics.len(),
                    "Binding model to connection"
                );
                let model = Arc::new(Model::bind(&base, owner.clone()));
                Ok(Arc::clone(entry.insert(model).value()))
            }
        }
    }

    pub(crate) fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.models.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

fn sorted_keys<V>(map: &HashMap<String, V>) -> Vec<&str> {
    let mut keys: Vec<_> = map.keys().map(String::as_str).collect();
    keys.sort_unstable();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_model() -> BaseModel {
        BaseModel::builder("User")
            .init(|user| {
                if user.get("role").is_none() {
                    user.set("role", "member");
                }
                Ok(())
            })
            .method("greet", |user, _| {
                let name = user.get("name").and_then(Value::as_str).unwrap_or("stranger");
                Ok(Value::from(format!("hello, {name}")))
            })
            .static_fn("describe", |ctor, _| {
                Ok(json!({ "model": ctor.model_name(), "bound": ctor.db().is_some() }))
            })
            .build()
    }

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => Document::new(),
        }
    }

    #[test]
    fn test_builder_defaults() {
        let model = user_model();
        assert_eq!(model.name(), "User");
        assert_eq!(model.collection_name(), "user");
        assert_eq!(model.method_names(), vec!["greet"]);
        assert_eq!(model.static_names(), vec!["describe"]);

        let named = BaseModel::builder("Post").collection("articles").build();
        assert_eq!(named.collection_name(), "articles");
    }

    #[test]
    fn test_base_construct_runs_initializer() {
        let model = user_model();
        let user = model.construct(doc(json!({ "name": "alice" }))).unwrap();
        assert_eq!(user.model_name(), "User");
        assert_eq!(user.get("role"), Some(&json!("member")));
        assert!(user.db().is_none());
        assert_eq!(user.call("greet", &[]).unwrap(), json!("hello, alice"));
    }

    #[test]
    fn test_initializer_error_propagates() {
        let model = BaseModel::builder("Strict")
            .init(|_| Err(Error::UnknownModel("Strict".into())))
            .build();
        assert!(model.construct(Document::new()).is_err());
    }

    #[test]
    fn test_unknown_method_and_static() {
        let model = user_model();
        let user = model.construct(Document::new()).unwrap();
        assert!(matches!(
            user.call("missing", &[]),
            Err(Error::UnknownMethod { .. })
        ));
        assert!(matches!(
            model.call_static("missing", &[]),
            Err(Error::UnknownStatic { .. })
        ));
    }

    #[test]
    fn test_base_static_sees_no_db() {
        let model = user_model();
        let described = model.call_static("describe", &[]).unwrap();
        assert_eq!(described, json!({ "model": "User", "bound": false }));
    }

    #[test]
    fn test_bound_model_copies_statics() {
        let base = user_model();
        let model = Model::bind(&base, Weak::new());
        assert_eq!(model.static_names(), base.static_names());
        assert_eq!(model.model_name(), "User");
        assert_eq!(model.collection_name(), "user");
    }

    #[test]
    fn test_bound_model_without_connection() {
        let model = Model::bind(&user_model(), Weak::new());
        assert!(matches!(
            model.construct(Document::new()),
            Err(Error::ConnectionDropped)
        ));
        assert!(matches!(model.collection(), Err(Error::ConnectionDropped)));
    }

    #[test]
    fn test_registry_lookup_failure_is_not_cached() {
        let registry = ModelRegistry::default();
        let result = registry.get_or_bind("Ghost", &Weak::new(), |name| {
            Err(Error::UnknownModel(name.to_owned()))
        });
        assert!(matches!(result, Err(Error::UnknownModel(name)) if name == "Ghost"));
        assert!(registry.names().is_empty());
    }

    #[test]
    fn test_registry_returns_same_constructor() {
        let registry = ModelRegistry::default();
        let base = user_model();
        let first = registry
            .get_or_bind("User", &Weak::new(), |_| Ok(base.clone()))
            .unwrap();
        let second = registry
            .get_or_bind("User", &Weak::new(), |_| panic!("must hit the cache"))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.names(), vec!["User".to_string()]);
    }
}
