//! 集合（Collection）
//!
//! 有序且去重的模型列表：以模型 `Uid` 为键的登记表保证同一模型最多出现一次，
//! 并维护集合级属性（筛选/查询状态）与分页游标。
//! 集合只登记模型，不拥有其生命周期；模型侧仅记录集合的 `Uid`。
//!
use crate::attributes::{Attributes, defaults_deep, get_path, set_path};
use crate::error::{ModelError, ModelResult, TransportError};
use crate::http::{Body, Params, Request, RequestOptions, Response, Routes, Transport};
use crate::model::{Model, ModelDefinition};
use crate::options::CollectionOptions;
use crate::resource::{Action, Lifecycle, Resource, error_message};
use crate::status::{Activity, Status, StatusCell};
use crate::validation::ErrorBag;
use crate::value::to_display_string;
use crate::value_object::Uid;
use async_trait::async_trait;
use futures_util::future::join_all;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

/// 未启用分页
pub const NO_PAGE: Option<u64> = None;

/// 已翻到最后一页
pub const LAST_PAGE: u64 = 0;

/// 集合定义：模型类型、路由、选项与生命周期钩子
#[async_trait]
pub trait CollectionDefinition: Send + Sync + Sized + 'static {
    const TYPE: &'static str;

    type Model: ModelDefinition;

    /// 集合内模型使用的定义
    fn model(&self) -> Self::Model;

    /// 集合级属性的默认值
    fn defaults(&self) -> Attributes {
        Attributes::new()
    }

    fn routes(&self) -> Routes {
        Routes::new()
    }

    fn options(&self) -> CollectionOptions {
        CollectionOptions::default()
    }

    fn fetch_query(&self, _collection: &Collection<Self>) -> Params {
        Params::new()
    }

    /// 批量保存的数据，默认为每个模型的保存数据组成的数组
    fn save_data(&self, collection: &Collection<Self>) -> Value {
        Value::Array(
            collection
                .models()
                .iter()
                .map(|model| model.definition().save_data(model))
                .collect(),
        )
    }

    fn on_add(&self, _collection: &Collection<Self>, _model: &Model<Self::Model>) {}
    fn on_remove(&self, _collection: &Collection<Self>, _model: &Model<Self::Model>) {}

    async fn on_fetch(&self, _collection: &Collection<Self>) -> ModelResult<()> {
        Ok(())
    }
    fn on_fetch_success(&self, _collection: &Collection<Self>, _response: &Response) {}
    fn on_fetch_failure(&self, _collection: &Collection<Self>, _error: &ModelError) {}

    async fn on_save(&self, _collection: &Collection<Self>) -> ModelResult<()> {
        Ok(())
    }
    fn on_save_success(&self, _collection: &Collection<Self>, _response: &Response) {}
    fn on_save_failure(&self, _collection: &Collection<Self>, _error: &ModelError) {}

    async fn on_delete(&self, _collection: &Collection<Self>) -> ModelResult<()> {
        Ok(())
    }
    fn on_delete_success(&self, _collection: &Collection<Self>, _response: &Response) {}
    fn on_delete_failure(&self, _collection: &Collection<Self>, _error: &ModelError) {}

    fn on_response_error(&self, collection: &Collection<Self>, error: &ModelError) {
        warn!(
            uid = %collection.uid(),
            error = %error,
            message = %collection.response_error_message(error),
            "response error"
        );
    }
}

struct CollectionState<M: ModelDefinition> {
    models: Vec<Model<M>>,
    registry: HashSet<Uid>,
    attributes: Attributes,
    page: Option<u64>,
    errors: ErrorBag,
}

struct CollectionInner<C: CollectionDefinition> {
    definition: Arc<C>,
    model_definition: Arc<C::Model>,
    options: CollectionOptions,
    resource: Resource,
    status: StatusCell,
    state: RwLock<CollectionState<C::Model>>,
}

/// 集合句柄
pub struct Collection<C: CollectionDefinition> {
    inner: Arc<CollectionInner<C>>,
}

impl<C: CollectionDefinition> Clone for Collection<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: CollectionDefinition> fmt::Debug for Collection<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("type", &C::TYPE)
            .field("uid", self.uid())
            .field("len", &self.len())
            .field("page", &self.get_page())
            .field("status", &self.status())
            .finish()
    }
}

impl<C: CollectionDefinition> Collection<C> {
    pub fn new(definition: C, transport: Arc<dyn Transport>) -> Self {
        Self::with_models(definition, transport, Vec::new(), Attributes::new())
    }

    /// 以初始模型与集合属性创建；属性深度覆盖定义的默认值
    pub fn with_models(
        definition: C,
        transport: Arc<dyn Transport>,
        models: Vec<Model<C::Model>>,
        attributes: Attributes,
    ) -> Self {
        Self::from_shared(Arc::new(definition), transport, models, attributes)
    }

    fn from_shared(
        definition: Arc<C>,
        transport: Arc<dyn Transport>,
        models: Vec<Model<C::Model>>,
        attributes: Attributes,
    ) -> Self {
        let model_definition = Arc::new(definition.model());
        let options = definition.options();
        let resource = Resource::new(C::TYPE, definition.routes(), transport);
        let attributes = defaults_deep(attributes, &definition.defaults());

        let collection = Self {
            inner: Arc::new(CollectionInner {
                definition,
                model_definition,
                options,
                resource,
                status: StatusCell::default(),
                state: RwLock::new(CollectionState {
                    models: Vec::new(),
                    registry: HashSet::new(),
                    attributes,
                    page: NO_PAGE,
                    errors: ErrorBag::default(),
                }),
            }),
        };
        collection.add_all(&models);
        collection
    }

    fn read(&self) -> RwLockReadGuard<'_, CollectionState<C::Model>> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CollectionState<C::Model>> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn uid(&self) -> &Uid {
        self.inner.resource.uid()
    }

    pub fn definition(&self) -> &C {
        &self.inner.definition
    }

    pub fn options(&self) -> &CollectionOptions {
        &self.inner.options
    }

    pub fn resource(&self) -> &Resource {
        &self.inner.resource
    }

    pub fn status(&self) -> Status {
        self.inner.status.snapshot()
    }

    pub fn clear_state(&self) {
        self.inner.status.clear();
    }

    // ---- 成员 ----

    /// 创建一个登记了本集合的新模型（不加入集合）
    pub fn create_model(&self, attributes: Attributes) -> Model<C::Model> {
        let model = Model::from_shared(
            Arc::clone(&self.inner.model_definition),
            Arc::clone(self.inner.resource.transport()),
            attributes,
        );
        model.register_collection(self.uid());
        model
    }

    pub fn models(&self) -> Vec<Model<C::Model>> {
        self.read().models.clone()
    }

    pub fn model_at(&self, index: usize) -> Option<Model<C::Model>> {
        self.read().models.get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().models.is_empty()
    }

    pub fn contains(&self, model: &Model<C::Model>) -> bool {
        self.read().registry.contains(model.uid())
    }

    pub fn index_of(&self, model: &Model<C::Model>) -> Option<usize> {
        self.read()
            .models
            .iter()
            .position(|item| item.uid() == model.uid())
    }

    /// 加入模型；已登记的模型被忽略
    pub fn add(&self, model: &Model<C::Model>) {
        let inserted = {
            let mut state = self.write();
            if state.registry.insert(model.uid().clone()) {
                state.models.push(model.clone());
                true
            } else {
                false
            }
        };

        if inserted {
            model.register_collection(self.uid());
            self.definition().on_add(self, model);
        }
    }

    pub fn add_all<'a, I>(&self, models: I)
    where
        I: IntoIterator<Item = &'a Model<C::Model>>,
    {
        for model in models {
            self.add(model);
        }
    }

    /// 移除模型；不在集合中时什么也不做
    pub fn remove(&self, model: &Model<C::Model>) {
        let removed = {
            let mut state = self.write();
            match state.models.iter().position(|item| item.uid() == model.uid()) {
                Some(index) => {
                    let removed = state.models.remove(index);
                    state.registry.remove(removed.uid());
                    Some(removed)
                }
                None => None,
            }
        };

        if let Some(removed) = removed {
            self.definition().on_remove(self, &removed);
        }
    }

    pub fn remove_all<'a, I>(&self, models: I)
    where
        I: IntoIterator<Item = &'a Model<C::Model>>,
    {
        for model in models {
            self.remove(model);
        }
    }

    /// 按下标移除；下标无效属于误用，返回 `InvalidIndex`
    pub fn remove_at(&self, index: usize) -> ModelResult<Model<C::Model>> {
        let removed = {
            let mut state = self.write();
            let len = state.models.len();
            if index >= len {
                return Err(ModelError::InvalidIndex { index, len });
            }
            let removed = state.models.remove(index);
            state.registry.remove(removed.uid());
            removed
        };

        self.definition().on_remove(self, &removed);
        Ok(removed)
    }

    /// 清空模型，每个被移除的模型仍会触发 `on_remove`
    pub fn clear_models(&self) {
        let removed = {
            let mut state = self.write();
            state.registry.clear();
            std::mem::take(&mut state.models)
        };

        for model in &removed {
            self.definition().on_remove(self, model);
        }
    }

    pub fn clear(&self) {
        self.clear_models();
        self.clear_state();
    }

    /// 以相同的模型与属性创建新集合（模型句柄共享）
    pub fn duplicate(&self) -> Self {
        Self::from_shared(
            Arc::clone(&self.inner.definition),
            Arc::clone(self.inner.resource.transport()),
            self.models(),
            self.attributes(),
        )
    }

    pub fn to_json(&self) -> Value {
        Value::Array(self.read().models.iter().map(Model::to_json).collect())
    }

    // ---- 集合属性 ----

    pub fn attributes(&self) -> Attributes {
        self.read().attributes.clone()
    }

    pub fn get(&self, path: &str) -> Option<Value> {
        get_path(&self.read().attributes, path).cloned()
    }

    pub fn get_or(&self, path: &str, fallback: Value) -> Value {
        self.get(path).unwrap_or(fallback)
    }

    /// 集合属性没有变换管道，直接写入
    pub fn set(&self, path: &str, value: impl Into<Value>) {
        set_path(&mut self.write().attributes, path, value.into());
    }

    pub fn set_many(&self, values: Attributes) {
        let mut state = self.write();
        for (path, value) in values {
            set_path(&mut state.attributes, &path, value);
        }
    }

    // ---- 分页 ----

    /// 设置分页游标，`NO_PAGE` 关闭分页
    pub fn page(&self, page: Option<u64>) -> &Self {
        self.write().page = page;
        self
    }

    pub fn get_page(&self) -> Option<u64> {
        self.read().page
    }

    pub fn is_paginated(&self) -> bool {
        self.get_page() != NO_PAGE
    }

    pub fn is_last_page(&self) -> bool {
        self.get_page() == Some(LAST_PAGE)
    }

    // ---- 校验与错误 ----

    /// 并发校验全部模型，所有模型都会被校验
    pub async fn validate(&self) -> bool {
        let models = self.models();
        join_all(models.iter().map(|model| model.validate()))
            .await
            .into_iter()
            .all(|valid| valid)
    }

    /// 每个键为 `下标.属性` 的首条错误
    pub fn errors(&self) -> BTreeMap<String, String> {
        self.read().errors.first_messages()
    }

    pub fn all_errors(&self) -> BTreeMap<String, Vec<String>> {
        self.read().errors.all().clone()
    }

    pub fn has_errors(&self) -> bool {
        !self.read().errors.is_empty()
    }

    pub fn set_errors(&self, errors: BTreeMap<String, Vec<String>>) {
        self.write().errors.replace(errors);
    }

    pub fn clear_errors(&self) {
        self.write().errors.clear();
    }

    pub fn response_error_message(&self, error: &ModelError) -> String {
        error_message(error, self.options().use_response_error_message)
    }

    // ---- 路由 ----

    pub fn route(&self, action: &str) -> Option<&str> {
        self.inner.resource.route(action)
    }

    /// 路由参数：集合属性加上 `page`
    pub fn route_parameters(&self) -> Params {
        let state = self.read();
        let mut params = state.attributes.clone();
        params.insert(
            "page".to_string(),
            state.page.map(Value::from).unwrap_or(Value::Null),
        );
        params
    }

    pub fn url(&self, action: &str) -> String {
        self.inner.resource.url(action, &self.route_parameters())
    }

    // ---- 请求 ----

    pub async fn fetch(&self) -> ModelResult<Response> {
        self.fetch_with(RequestOptions::default()).await
    }

    /// 拉取模型；分页集合已到最后一页时不发送请求，直接返回 `LastPage`
    pub async fn fetch_with(&self, options: RequestOptions) -> ModelResult<Response> {
        if self.is_last_page() {
            debug!(uid = %self.uid(), "fetch skipped on last page");
            return Err(ModelError::LastPage);
        }
        let _loading = self.inner.status.begin(Activity::Loading);

        let collection_options = self.options();
        let mut params = self.definition().fetch_query(self);
        if let Some(page) = self.get_page() {
            params.insert(collection_options.page_parameter.clone(), Value::from(page));
            if let Some(per_page) = collection_options.per_page {
                params.insert(
                    collection_options.per_page_parameter.clone(),
                    Value::from(per_page),
                );
            }
        }

        let request = Request::builder()
            .method(collection_options.methods.fetch)
            .url(self.url("fetch"))
            .params(params)
            .headers(collection_options.headers.for_action(Action::Fetch))
            .build()
            .with_overrides(options);

        self.inner
            .resource
            .execute(Action::Fetch, request, &Fetching { collection: self })
            .await
    }

    pub async fn save(&self) -> ModelResult<Response> {
        self.save_with(RequestOptions::default()).await
    }

    /// 批量保存：与模型相同的在途保护，先校验全部模型
    pub async fn save_with(&self, options: RequestOptions) -> ModelResult<Response> {
        let _saving = self
            .inner
            .status
            .begin_save(self.uid().as_str(), || self.check_valid())?;

        let request = Request::builder()
            .method(self.options().methods.save)
            .url(self.url("save"))
            .data(Body::Json(self.definition().save_data(self)))
            .headers(self.options().headers.for_action(Action::Save))
            .build()
            .with_overrides(options);

        self.inner
            .resource
            .execute(Action::Save, request, &Saving { collection: self })
            .await
    }

    fn check_valid(&self) -> ModelResult<()> {
        let mut errors = BTreeMap::new();
        for (index, model) in self.models().iter().enumerate() {
            if !model.validate_now() {
                errors.extend(
                    model
                        .errors()
                        .into_iter()
                        .map(|(attribute, message)| (format!("{index}.{attribute}"), message)),
                );
            }
        }

        if errors.is_empty() {
            return Ok(());
        }
        debug!(uid = %self.uid(), ?errors, "save rejected by validation");
        Err(ModelError::Validation { errors })
    }

    pub async fn delete(&self) -> ModelResult<Response> {
        self.delete_with(RequestOptions::default()).await
    }

    /// 批量删除：标识列表放在请求体中，或按分隔符拼接放入查询参数
    pub async fn delete_with(&self, options: RequestOptions) -> ModelResult<Response> {
        let _deleting = self.inner.status.begin(Activity::Deleting);

        let models = self.models();
        let identifiers: Vec<Value> = models.iter().filter_map(Model::identifier).collect();

        let mut params = Params::new();
        let data = if self.options().use_delete_body {
            Body::Json(Value::Array(identifiers))
        } else {
            let joined = identifiers
                .iter()
                .map(to_display_string)
                .collect::<Vec<_>>()
                .join(&self.options().delimiter);
            params.insert(
                self.inner.model_definition.options().identifier,
                Value::String(joined),
            );
            Body::Empty
        };

        let request = Request::builder()
            .method(self.options().methods.delete)
            .url(self.url("delete"))
            .data(data)
            .params(params)
            .headers(self.options().headers.for_action(Action::Delete))
            .build()
            .with_overrides(options);

        self.inner
            .resource
            .execute(
                Action::Delete,
                request,
                &Deleting {
                    collection: self,
                    deleted: &models,
                },
            )
            .await
    }

    /// 传输失败置 `fatal` 并（按需）通知 `on_response_error`
    fn on_fatal(&self, error: &ModelError) {
        if !matches!(error, ModelError::Transport(_)) {
            return;
        }
        self.inner.status.set_fatal(true);
        if self.options().auto_catch {
            self.definition().on_response_error(self, error);
        }
    }

    /// 响应体中的模型列表：数组本身或对象的 `data` 数组
    fn models_from(&self, response: &Response) -> ModelResult<Vec<Model<C::Model>>> {
        let invalid = || -> ModelError {
            TransportError::InvalidResponse {
                response: response.clone(),
            }
            .into()
        };

        let items = match response.body() {
            Some(Value::Array(items)) => items,
            Some(Value::Object(body)) => body
                .get("data")
                .and_then(Value::as_array)
                .ok_or_else(invalid)?,
            _ => return Err(invalid()),
        };

        items
            .iter()
            .map(|item| match item {
                Value::Object(attributes) => Ok(self.create_model(attributes.clone())),
                _ => Err(invalid()),
            })
            .collect()
    }
}

struct Fetching<'a, C: CollectionDefinition> {
    collection: &'a Collection<C>,
}

#[async_trait]
impl<'a, C: CollectionDefinition> Lifecycle for Fetching<'a, C> {
    async fn before(&self) -> ModelResult<()> {
        self.collection.definition().on_fetch(self.collection).await
    }

    fn succeeded(&self, response: &Response) -> ModelResult<()> {
        let collection = self.collection;
        let models = collection.models_from(response)?;

        match collection.get_page() {
            Some(page) => {
                if models.is_empty() {
                    collection.page(Some(LAST_PAGE));
                } else {
                    collection.page(Some(page + 1));
                    collection.add_all(&models);
                }
            }
            None => {
                collection.clear_models();
                collection.add_all(&models);
            }
        }

        collection.definition().on_fetch_success(collection, response);
        Ok(())
    }

    fn failed(&self, error: ModelError) -> ModelError {
        self.collection.on_fatal(&error);
        self.collection
            .definition()
            .on_fetch_failure(self.collection, &error);
        error
    }
}

struct Saving<'a, C: CollectionDefinition> {
    collection: &'a Collection<C>,
}

#[async_trait]
impl<'a, C: CollectionDefinition> Lifecycle for Saving<'a, C> {
    async fn before(&self) -> ModelResult<()> {
        self.collection.definition().on_save(self.collection).await
    }

    fn succeeded(&self, response: &Response) -> ModelResult<()> {
        self.collection.clear_errors();
        for model in self.collection.models() {
            model.clear_errors();
            model.sync();
        }
        self.collection
            .definition()
            .on_save_success(self.collection, response);
        Ok(())
    }

    fn failed(&self, error: ModelError) -> ModelError {
        let validation_status = self.collection.options().validation_error_status;
        let error = match error {
            ModelError::Transport(transport) if transport.status() == Some(validation_status) => {
                let errors = transport
                    .response()
                    .map(Response::validation_errors)
                    .unwrap_or_default();
                self.collection.set_errors(errors);
                ModelError::Validation {
                    errors: self.collection.errors(),
                }
            }
            error => {
                self.collection.on_fatal(&error);
                error
            }
        };
        self.collection
            .definition()
            .on_save_failure(self.collection, &error);
        error
    }
}

struct Deleting<'a, C: CollectionDefinition> {
    collection: &'a Collection<C>,
    deleted: &'a [Model<C::Model>],
}

#[async_trait]
impl<'a, C: CollectionDefinition> Lifecycle for Deleting<'a, C> {
    async fn before(&self) -> ModelResult<()> {
        self.collection.definition().on_delete(self.collection).await
    }

    fn succeeded(&self, response: &Response) -> ModelResult<()> {
        self.collection.remove_all(self.deleted);
        self.collection
            .definition()
            .on_delete_success(self.collection, response);
        Ok(())
    }

    fn failed(&self, error: ModelError) -> ModelError {
        self.collection.on_fatal(&error);
        self.collection
            .definition()
            .on_delete_failure(self.collection, &error);
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;
    use crate::options::ModelOptions;
    use crate::testing::ScriptedTransport;
    use crate::validation::{ValidationRules, rules};
    use serde_json::json;
    use std::sync::Mutex;

    fn attrs(value: Value) -> Attributes {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    struct Task;

    impl ModelDefinition for Task {
        const TYPE: &'static str = "Task";

        fn validation(&self) -> ValidationRules {
            ValidationRules::new().with("title", [rules::required()])
        }

        fn options(&self) -> ModelOptions {
            ModelOptions {
                identifier: "key".to_string(),
                ..ModelOptions::default()
            }
        }
    }

    #[derive(Default)]
    struct Tasks {
        use_delete_body: bool,
        per_page: Option<u64>,
        removed: Arc<Mutex<Vec<Uid>>>,
    }

    impl CollectionDefinition for Tasks {
        const TYPE: &'static str = "Tasks";
        type Model = Task;

        fn model(&self) -> Task {
            Task
        }

        fn routes(&self) -> Routes {
            Routes::new()
                .with("fetch", "/projects/:project/tasks")
                .with("save", "/projects/:project/tasks")
                .with("delete", "/projects/:project/tasks")
        }

        fn options(&self) -> CollectionOptions {
            CollectionOptions {
                use_delete_body: self.use_delete_body,
                per_page: self.per_page,
                ..CollectionOptions::default()
            }
        }

        fn on_remove(&self, _collection: &Collection<Self>, model: &Model<Task>) {
            self.removed.lock().unwrap().push(model.uid().clone());
        }
    }

    fn tasks(transport: Arc<ScriptedTransport>) -> Collection<Tasks> {
        let collection = Collection::new(
            Tasks {
                use_delete_body: true,
                ..Tasks::default()
            },
            transport,
        );
        collection.set("project", 7);
        collection
    }

    fn task(collection: &Collection<Tasks>, value: Value) -> Model<Task> {
        collection.create_model(attrs(value))
    }

    // 测试重复加入同一模型只保留一份
    #[test]
    fn add_is_idempotent() {
        let collection = tasks(ScriptedTransport::new());
        let model = task(&collection, json!({ "title": "a" }));

        collection.add(&model);
        collection.add(&model);
        collection.add_all([&model, &model.clone()]);

        assert_eq!(collection.len(), 1);
        assert!(collection.contains(&model));
        assert!(model.has_collection(collection.uid()));
        assert_eq!(collection.index_of(&model), Some(0));
    }

    #[test]
    fn create_model_registers_without_adding() {
        let collection = tasks(ScriptedTransport::new());
        let model = task(&collection, json!({ "title": "a" }));
        assert!(model.has_collection(collection.uid()));
        assert!(collection.is_empty());
    }

    // 测试移除不存在的模型为空操作，存在的模型只触发一次移除钩子
    #[test]
    fn remove_absent_is_noop() {
        let collection = tasks(ScriptedTransport::new());
        let kept = task(&collection, json!({ "title": "a" }));
        let stranger = task(&collection, json!({ "title": "b" }));
        collection.add(&kept);

        collection.remove(&stranger);
        assert_eq!(collection.len(), 1);
        assert!(collection.definition().removed.lock().unwrap().is_empty());

        collection.remove(&kept);
        collection.remove(&kept);
        assert!(collection.is_empty());
        assert!(!collection.contains(&kept));
        assert_eq!(
            *collection.definition().removed.lock().unwrap(),
            vec![kept.uid().clone()]
        );
    }

    #[test]
    fn remove_at_invalid_index_is_an_error() {
        let collection = tasks(ScriptedTransport::new());
        let err = collection.remove_at(3).unwrap_err();
        assert!(matches!(err, ModelError::InvalidIndex { index: 3, len: 0 }));

        let model = task(&collection, json!({ "title": "a" }));
        collection.add(&model);
        let removed = collection.remove_at(0).unwrap();
        assert!(removed.ptr_eq(&model));
        assert!(collection.is_empty());
    }

    #[test]
    fn clear_notifies_every_model() {
        let collection = tasks(ScriptedTransport::new());
        let a = task(&collection, json!({ "title": "a" }));
        let b = task(&collection, json!({ "title": "b" }));
        collection.add_all([&a, &b]);

        collection.clear();
        assert!(collection.is_empty());
        assert!(!collection.contains(&a));
        assert_eq!(collection.definition().removed.lock().unwrap().len(), 2);
        assert!(collection.status().is_idle());
    }

    #[test]
    fn pagination_markers() {
        let collection = tasks(ScriptedTransport::new());
        assert!(!collection.is_paginated());
        assert!(!collection.is_last_page());

        assert!(collection.page(Some(LAST_PAGE)).is_last_page());
        assert!(collection.is_paginated());

        collection.page(Some(2));
        assert!(!collection.is_last_page());
        assert_eq!(collection.route_parameters()["page"], json!(2));
        assert_eq!(collection.route_parameters()["project"], json!(7));
    }

    #[test]
    fn duplicate_shares_models_and_attributes() {
        let collection = tasks(ScriptedTransport::new());
        let model = task(&collection, json!({ "title": "a" }));
        collection.add(&model);

        let copy = collection.duplicate();
        assert_ne!(copy.uid(), collection.uid());
        assert_eq!(copy.len(), 1);
        assert!(copy.model_at(0).unwrap().ptr_eq(&model));
        assert_eq!(copy.get("project"), Some(json!(7)));
        assert_eq!(copy.to_json(), json!([{ "title": "a" }]));
    }

    // 测试集合校验覆盖全部模型
    #[tokio::test]
    async fn validate_checks_every_model() {
        let collection = tasks(ScriptedTransport::new());
        let a = task(&collection, json!({ "title": "" }));
        let b = task(&collection, json!({ "title": null }));
        let c = task(&collection, json!({ "title": "ok" }));
        collection.add_all([&a, &b, &c]);

        assert!(!collection.validate().await);
        assert!(a.has_error("title"));
        assert!(b.has_error("title"));
        assert!(!c.has_errors());
    }

    #[tokio::test]
    async fn paginated_fetch_appends_then_marks_last_page() {
        let transport = ScriptedTransport::new();
        transport
            .ok(200, json!([{ "key": 1, "title": "a" }]))
            .ok(200, json!({ "data": [{ "key": 2, "title": "b" }] }))
            .ok(200, json!([]));
        let collection = tasks(transport.clone());
        collection.page(Some(1));

        collection.fetch().await.unwrap();
        let request = transport.last();
        assert_eq!(request.method(), HttpMethod::Get);
        assert_eq!(request.url(), "/projects/7/tasks");
        assert_eq!(request.params()["page"], json!(1));
        assert_eq!(collection.get_page(), Some(2));

        collection.fetch().await.unwrap();
        assert_eq!(transport.last().params()["page"], json!(2));
        assert_eq!(collection.len(), 2);

        collection.fetch().await.unwrap();
        assert!(collection.is_last_page());
        assert_eq!(collection.len(), 2);
        assert!(collection.model_at(1).unwrap().has_collection(collection.uid()));
    }

    // 测试到达最后一页后不再发送拉取请求
    #[tokio::test]
    async fn fetch_on_last_page_is_refused() {
        let transport = ScriptedTransport::new();
        transport
            .ok(200, json!([{ "key": 1, "title": "a" }]))
            .ok(200, json!([]))
            .ok(200, json!([{ "key": 9, "title": "late" }]));
        let collection = tasks(transport.clone());
        collection.page(Some(1));

        collection.fetch().await.unwrap();
        collection.fetch().await.unwrap();
        assert!(collection.is_last_page());

        let err = collection.fetch().await.unwrap_err();
        assert!(err.is_last_page());
        assert_eq!(transport.requests().len(), 2);
        assert_eq!(collection.len(), 1);
        assert!(collection.is_last_page());
        assert!(collection.status().is_idle());

        // 重新翻页后可以继续拉取
        collection.page(Some(1));
        collection.fetch().await.unwrap();
        assert_eq!(transport.requests().len(), 3);
        assert_eq!(collection.len(), 2);
    }

    #[tokio::test]
    async fn per_page_is_sent_with_paginated_fetch() {
        let transport = ScriptedTransport::new();
        transport.ok(200, json!([])).ok(200, json!([]));
        let collection = Collection::new(
            Tasks {
                per_page: Some(25),
                ..Tasks::default()
            },
            transport.clone(),
        );
        collection.set("project", 7);

        collection.fetch().await.unwrap();
        assert!(!transport.last().params().contains_key("per_page"));

        collection.page(Some(3));
        collection.fetch().await.unwrap();
        let request = transport.last();
        assert_eq!(request.params()["page"], json!(3));
        assert_eq!(request.params()["per_page"], json!(25));
    }

    // 测试集合的 fatal 在拉取与删除成功后仍保留，直到下一次保存
    #[tokio::test]
    async fn fatal_sticks_until_next_save() {
        let transport = ScriptedTransport::new();
        transport
            .fail(500, json!({}))
            .ok(200, json!([{ "key": 1, "title": "a" }]))
            .ok(200, json!({}))
            .ok(200, json!({}));
        let collection = tasks(transport);

        collection.save().await.unwrap_err();
        assert!(collection.status().fatal);

        collection.fetch().await.unwrap();
        assert_eq!(collection.len(), 1);
        assert!(collection.status().fatal);

        collection.delete().await.unwrap();
        assert!(collection.status().fatal);

        collection.save().await.unwrap();
        assert!(!collection.status().fatal);
    }

    #[tokio::test]
    async fn unpaginated_fetch_replaces_models() {
        let transport = ScriptedTransport::new();
        transport.ok(200, json!([{ "key": 9, "title": "fresh" }]));
        let collection = tasks(transport.clone());
        let stale = task(&collection, json!({ "key": 1, "title": "stale" }));
        collection.add(&stale);

        collection.fetch().await.unwrap();
        assert!(!transport.last().params().contains_key("page"));
        assert_eq!(collection.len(), 1);
        assert!(!collection.contains(&stale));
        assert_eq!(collection.model_at(0).unwrap().get("key"), Some(json!(9)));
        assert_eq!(collection.definition().removed.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn save_sends_every_model_and_syncs() {
        let transport = ScriptedTransport::new();
        transport.ok(200, json!({}));
        let collection = tasks(transport.clone());
        let a = task(&collection, json!({ "key": 1, "title": "a" }));
        let b = task(&collection, json!({ "title": "b" }));
        collection.add_all([&a, &b]);
        a.set("title", "changed");

        collection.save().await.unwrap();

        let request = transport.last();
        assert_eq!(request.method(), HttpMethod::Post);
        assert_eq!(
            request.data().as_json(),
            Some(&json!([{ "key": 1, "title": "changed" }, { "title": "b" }]))
        );
        assert_eq!(a.changed(), None);
        assert!(!collection.status().saving);
    }

    #[tokio::test]
    async fn save_rejects_invalid_models_without_dispatch() {
        let transport = ScriptedTransport::new();
        let collection = tasks(transport.clone());
        let a = task(&collection, json!({ "title": "a" }));
        let b = task(&collection, json!({ "title": "" }));
        collection.add_all([&a, &b]);

        let err = collection.save().await.unwrap_err();
        assert_eq!(
            err.validation_errors().unwrap()["1.title"],
            "This field is required"
        );
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn save_failure_statuses() {
        let transport = ScriptedTransport::new();
        transport
            .fail(422, json!({ "errors": { "0.title": "taken" } }))
            .fail(503, json!({}));
        let collection = tasks(transport);
        collection.add(&task(&collection, json!({ "title": "a" })));

        let err = collection.save().await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(collection.errors()["0.title"], "taken");
        assert!(!collection.status().fatal);

        let err = collection.save().await.unwrap_err();
        assert_eq!(err.response().map(Response::status), Some(503));
        assert!(collection.status().fatal);
    }

    #[tokio::test]
    async fn delete_sends_identifiers_in_body() {
        let transport = ScriptedTransport::new();
        transport.ok(200, json!({}));
        let collection = tasks(transport.clone());
        let a = task(&collection, json!({ "key": 1, "title": "a" }));
        let b = task(&collection, json!({ "key": 2, "title": "b" }));
        collection.add_all([&a, &b]);

        collection.delete().await.unwrap();

        let request = transport.last();
        assert_eq!(request.method(), HttpMethod::Delete);
        assert_eq!(request.data().as_json(), Some(&json!([1, 2])));
        assert!(collection.is_empty());
        assert!(!collection.status().deleting);
    }

    #[tokio::test]
    async fn delete_sends_identifiers_in_query() {
        let transport = ScriptedTransport::new();
        transport.ok(200, json!({}));
        let collection = Collection::new(Tasks::default(), transport.clone());
        let a = collection.create_model(attrs(json!({ "key": 1, "title": "a" })));
        let b = collection.create_model(attrs(json!({ "key": "x y", "title": "b" })));
        collection.add_all([&a, &b]);

        collection.delete().await.unwrap();

        let request = transport.last();
        assert_eq!(request.params()["key"], json!("1,x y"));
        assert!(request.data().is_empty());
        assert_eq!(request.url(), "/projects/:project/tasks");
    }
}
