//! 模型（Model）
//!
//! 组合属性存储、变换管道、校验引擎与请求协调，表示一个可远程同步的资源实例。
//! 实体的差异（默认值、变换、规则、路由、选项与钩子）由 `ModelDefinition` 提供，
//! `Model<D>` 本身是共享句柄：`Clone` 得到指向同一实例的句柄，
//! 需要独立副本时使用 `duplicate`。
//!
use crate::attributes::{AttributeStore, Attributes};
use crate::error::{ModelError, ModelResult, TransportError};
use crate::http::{Body, FormData, Params, Request, RequestOptions, Response, Routes, Transport, build_url};
use crate::mutation::{MutationPipeline, Mutations};
use crate::options::ModelOptions;
use crate::resource::{Action, Lifecycle, Resource, error_message};
use crate::status::{Activity, Status, StatusCell};
use crate::validation::{ErrorBag, ValidationEngine, ValidationRules};
use crate::value::is_truthy;
use crate::value_object::Uid;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

/// 模型定义：描述一类实体的默认值、变换、校验、路由、选项与生命周期钩子
///
/// 除 `TYPE` 外全部有默认实现。钩子在锁外调用，可以安全地回调模型的公开方法。
#[async_trait]
pub trait ModelDefinition: Send + Sync + Sized + 'static {
    /// 实体类型名，用作实例标识前缀
    const TYPE: &'static str;

    fn defaults(&self) -> Attributes {
        Attributes::new()
    }

    fn mutations(&self) -> Mutations {
        Mutations::new()
    }

    fn validation(&self) -> ValidationRules {
        ValidationRules::new()
    }

    fn routes(&self) -> Routes {
        Routes::new()
    }

    fn options(&self) -> ModelOptions {
        ModelOptions::default()
    }

    /// 保存时发送的数据，默认为全部当前属性
    fn save_data(&self, model: &Model<Self>) -> Value {
        Value::Object(model.attributes())
    }

    fn fetch_query(&self, _model: &Model<Self>) -> Params {
        Params::new()
    }

    fn delete_body(&self, _model: &Model<Self>) -> Body {
        Body::Empty
    }

    // ---- fetch ----
    async fn on_fetch(&self, _model: &Model<Self>) -> ModelResult<()> {
        Ok(())
    }
    fn on_fetch_success(&self, _model: &Model<Self>, _response: &Response) {}
    fn on_fetch_failure(&self, _model: &Model<Self>, _error: &ModelError) {}

    // ---- save ----
    async fn on_save(&self, _model: &Model<Self>) -> ModelResult<()> {
        Ok(())
    }
    fn on_save_success(&self, _model: &Model<Self>, _response: &Response) {}
    fn on_save_failure(&self, _model: &Model<Self>, _error: &ModelError) {}

    // ---- delete ----
    async fn on_delete(&self, _model: &Model<Self>) -> ModelResult<()> {
        Ok(())
    }
    fn on_delete_success(&self, _model: &Model<Self>, _response: &Response) {}
    fn on_delete_failure(&self, _model: &Model<Self>, _error: &ModelError) {}

    /// 致命失败的旁路通知（`auto_catch` 开启时），不改变返回给调用方的错误
    fn on_response_error(&self, model: &Model<Self>, error: &ModelError) {
        warn!(
            uid = %model.uid(),
            error = %error,
            message = %model.response_error_message(error),
            "response error"
        );
    }
}

struct ModelState {
    store: AttributeStore,
    errors: ErrorBag,
    collections: BTreeSet<Uid>,
}

struct ModelInner<D> {
    definition: Arc<D>,
    options: ModelOptions,
    resource: Resource,
    validator: ValidationEngine,
    status: StatusCell,
    state: RwLock<ModelState>,
}

/// 模型句柄
pub struct Model<D: ModelDefinition> {
    inner: Arc<ModelInner<D>>,
}

impl<D: ModelDefinition> Clone for Model<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: ModelDefinition> fmt::Debug for Model<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("type", &D::TYPE)
            .field("uid", self.uid())
            .field("attributes", &self.attributes())
            .field("status", &self.status())
            .finish()
    }
}

impl<D: ModelDefinition> Model<D> {
    /// 以初始属性创建模型；初始属性深度覆盖定义的默认值，并作为首个快照
    pub fn new(definition: D, transport: Arc<dyn Transport>, attributes: Attributes) -> Self {
        Self::from_shared(Arc::new(definition), transport, attributes)
    }

    pub(crate) fn from_shared(
        definition: Arc<D>,
        transport: Arc<dyn Transport>,
        attributes: Attributes,
    ) -> Self {
        let options = definition.options();
        let pipeline = MutationPipeline::compile(definition.mutations());
        let validator = ValidationEngine::new(definition.validation());
        let resource = Resource::new(D::TYPE, definition.routes(), transport);

        let mut store = AttributeStore::new(pipeline);
        store.assign(attributes, &definition.defaults());

        Self {
            inner: Arc::new(ModelInner {
                definition,
                options,
                resource,
                validator,
                status: StatusCell::default(),
                state: RwLock::new(ModelState {
                    store,
                    errors: ErrorBag::default(),
                    collections: BTreeSet::new(),
                }),
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, ModelState> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ModelState> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn uid(&self) -> &Uid {
        self.inner.resource.uid()
    }

    pub fn definition(&self) -> &D {
        &self.inner.definition
    }

    pub fn options(&self) -> &ModelOptions {
        &self.inner.options
    }

    pub fn resource(&self) -> &Resource {
        &self.inner.resource
    }

    pub fn status(&self) -> Status {
        self.inner.status.snapshot()
    }

    /// 两个句柄是否指向同一实例
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ---- 属性 ----

    pub fn attributes(&self) -> Attributes {
        self.read().store.attributes().clone()
    }

    pub fn reference(&self) -> Attributes {
        self.read().store.reference().clone()
    }

    pub fn get(&self, path: &str) -> Option<Value> {
        self.read().store.get(path).cloned()
    }

    pub fn get_or(&self, path: &str, fallback: Value) -> Value {
        self.get(path).unwrap_or(fallback)
    }

    pub fn saved(&self, path: &str) -> Option<Value> {
        self.read().store.saved(path).cloned()
    }

    pub fn saved_or(&self, path: &str, fallback: Value) -> Value {
        self.saved(path).unwrap_or(fallback)
    }

    pub fn set(&self, path: &str, value: impl Into<Value>) {
        self.write().store.set(path, value.into());
    }

    pub fn set_many(&self, values: Attributes) {
        self.write().store.set_many(values);
    }

    pub fn unset(&self, path: &str) -> Option<Value> {
        self.write().store.unset(path)
    }

    /// 全部恢复为快照
    pub fn reset(&self) {
        self.write().store.reset();
    }

    pub fn reset_paths<I, S>(&self, paths: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.write().store.reset_paths(paths);
    }

    pub fn sync(&self) {
        self.write().store.sync();
    }

    /// 与快照不同的属性；无变化时为 `None`
    pub fn changed(&self) -> Option<Vec<String>> {
        self.read().store.changed()
    }

    /// 以默认值补全后同时替换当前状态与快照
    pub fn assign(&self, attributes: Attributes) -> Attributes {
        let defaults = self.definition().defaults();
        self.write().store.assign(attributes, &defaults).clone()
    }

    /// 标识属性为假值时视为新建
    pub fn is_new(&self) -> bool {
        !self
            .read()
            .store
            .get(&self.options().identifier)
            .is_some_and(is_truthy)
    }

    /// 标识属性的值（仅在为真值时返回）
    pub fn identifier(&self) -> Option<Value> {
        self.get(&self.options().identifier)
            .filter(is_truthy)
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.attributes())
    }

    /// 基于当前属性的深拷贝创建新模型，不继承任何集合登记
    pub fn duplicate(&self) -> Self {
        Self::from_shared(
            Arc::clone(&self.inner.definition),
            Arc::clone(self.inner.resource.transport()),
            self.attributes(),
        )
    }

    // ---- 校验 ----

    pub fn validate_attribute(&self, attribute: &str) -> bool {
        let mut guard = self.write();
        let ModelState { store, errors, .. } = &mut *guard;
        self.inner
            .validator
            .validate_attribute(attribute, store.get(attribute), errors)
    }

    /// 校验全部当前属性
    pub async fn validate(&self) -> bool {
        self.validate_now()
    }

    /// 只校验给定属性；其它属性的错误保持不变
    pub fn validate_only<I, S>(&self, attributes: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<String> = attributes
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect();

        let mut guard = self.write();
        let ModelState { store, errors, .. } = &mut *guard;
        let store = &*store;
        self.inner.validator.validate_all(
            names.iter().map(String::as_str),
            |attribute| store.get(attribute),
            errors,
        )
    }

    pub(crate) fn validate_now(&self) -> bool {
        let mut guard = self.write();
        let ModelState { store, errors, .. } = &mut *guard;
        let store = &*store;
        self.inner.validator.validate_all(
            store.attributes().keys().map(String::as_str),
            |attribute| store.get(attribute),
            errors,
        )
    }

    // ---- 错误 ----

    /// 每个属性的首条错误
    pub fn errors(&self) -> BTreeMap<String, String> {
        self.read().errors.first_messages()
    }

    pub fn all_errors(&self) -> BTreeMap<String, Vec<String>> {
        self.read().errors.all().clone()
    }

    pub fn error(&self, attribute: &str) -> Option<String> {
        self.read().errors.first(attribute).map(str::to_string)
    }

    pub fn has_errors(&self) -> bool {
        !self.read().errors.is_empty()
    }

    pub fn has_error(&self, attribute: &str) -> bool {
        self.read().errors.has(attribute)
    }

    pub fn set_errors(&self, errors: BTreeMap<String, Vec<String>>) {
        self.write().errors.replace(errors);
    }

    /// 空列表表示移除该属性的错误
    pub fn set_attribute_errors(&self, attribute: &str, messages: Vec<String>) {
        self.write().errors.set_attribute(attribute, messages);
    }

    pub fn clear_errors(&self) {
        self.write().errors.clear();
    }

    /// 面向用户的错误提示
    pub fn response_error_message(&self, error: &ModelError) -> String {
        error_message(error, self.options().use_response_error_message)
    }

    // ---- 状态与集合登记 ----

    pub fn clear_state(&self) {
        self.inner.status.clear();
    }

    pub fn register_collection(&self, collection: &Uid) {
        self.write().collections.insert(collection.clone());
    }

    pub fn has_collection(&self, collection: &Uid) -> bool {
        self.read().collections.contains(collection)
    }

    pub fn collections(&self) -> Vec<Uid> {
        self.read().collections.iter().cloned().collect()
    }

    // ---- 路由 ----

    pub fn route(&self, action: &str) -> Option<&str> {
        self.inner.resource.route(action)
    }

    /// 路由参数：`{identifier: 当前标识值}`
    pub fn route_parameters(&self) -> Params {
        let identifier = &self.options().identifier;
        let mut params = Params::new();
        params.insert(
            identifier.clone(),
            self.get(identifier).unwrap_or(Value::Null),
        );
        params
    }

    pub fn url(&self, action: &str) -> String {
        self.inner.resource.url(action, &self.route_parameters())
    }

    /// 保存使用的 URL：依次尝试 create/update 与 save 路由
    fn save_url(&self) -> String {
        let action = if self.is_new() { "create" } else { "update" };
        self.inner
            .resource
            .routes()
            .first_of(&[action, "save"])
            .map(|template| build_url(template, &self.route_parameters()))
            .unwrap_or_default()
    }

    // ---- 请求 ----

    pub async fn fetch(&self) -> ModelResult<Response> {
        self.fetch_with(RequestOptions::default()).await
    }

    pub async fn fetch_with(&self, options: RequestOptions) -> ModelResult<Response> {
        let _loading = self.inner.status.begin(Activity::Loading);

        let request = Request::builder()
            .method(self.options().methods.fetch)
            .url(self.url("fetch"))
            .params(self.definition().fetch_query(self))
            .headers(self.options().headers.for_action(Action::Fetch))
            .build()
            .with_overrides(options);

        self.inner
            .resource
            .execute(Action::Fetch, request, &Fetching { model: self })
            .await
    }

    pub async fn save(&self) -> ModelResult<Response> {
        self.save_with(RequestOptions::default()).await
    }

    pub async fn save_with(&self, options: RequestOptions) -> ModelResult<Response> {
        self.persist(options, false).await
    }

    /// 与保存相同，但数据以 multipart 表单发送
    pub async fn upload(&self) -> ModelResult<Response> {
        self.upload_with(RequestOptions::default()).await
    }

    pub async fn upload_with(&self, options: RequestOptions) -> ModelResult<Response> {
        self.persist(options, true).await
    }

    async fn persist(&self, options: RequestOptions, upload: bool) -> ModelResult<Response> {
        let _saving = self
            .inner
            .status
            .begin_save(self.uid().as_str(), || self.check_valid())?;

        let method = if self.is_new() {
            self.options().methods.create
        } else if self.options().patch {
            self.options().methods.patch
        } else {
            self.options().methods.update
        };

        let mut request = Request::builder()
            .method(method)
            .url(self.save_url())
            .data(Body::Json(self.definition().save_data(self)))
            .headers(self.options().headers.for_action(Action::Save))
            .build()
            .with_overrides(options);

        if upload {
            if let Body::Json(data) = request.data() {
                let form = FormData::from_value(data);
                request.set_data(Body::Form(form));
            }
            request.remove_header("Content-Type");
        }

        self.inner
            .resource
            .execute(Action::Save, request, &Saving { model: self })
            .await
    }

    fn check_valid(&self) -> ModelResult<()> {
        if self.validate_now() {
            return Ok(());
        }
        let errors = self.errors();
        debug!(uid = %self.uid(), ?errors, "save rejected by validation");
        Err(ModelError::Validation { errors })
    }

    pub async fn delete(&self) -> ModelResult<Response> {
        self.delete_with(RequestOptions::default()).await
    }

    pub async fn delete_with(&self, options: RequestOptions) -> ModelResult<Response> {
        let _deleting = self.inner.status.begin(Activity::Deleting);

        let request = Request::builder()
            .method(self.options().methods.delete)
            .url(self.url("delete"))
            .data(self.definition().delete_body(self))
            .headers(self.options().headers.for_action(Action::Delete))
            .build()
            .with_overrides(options);

        self.inner
            .resource
            .execute(Action::Delete, request, &Deleting { model: self })
            .await
    }

    /// 传输失败置 `fatal` 并（按需）通知 `on_response_error`；其它错误不处理
    fn on_fatal(&self, error: &ModelError) {
        if !matches!(error, ModelError::Transport(_)) {
            return;
        }
        self.inner.status.set_fatal(true);
        if self.options().auto_catch {
            self.definition().on_response_error(self, error);
        }
    }
}

struct Fetching<'a, D: ModelDefinition> {
    model: &'a Model<D>,
}

#[async_trait]
impl<'a, D: ModelDefinition> Lifecycle for Fetching<'a, D> {
    async fn before(&self) -> ModelResult<()> {
        self.model.definition().on_fetch(self.model).await
    }

    fn succeeded(&self, response: &Response) -> ModelResult<()> {
        let Some(Value::Object(attributes)) = response.body() else {
            return Err(TransportError::InvalidResponse {
                response: response.clone(),
            }
            .into());
        };
        self.model.assign(attributes.clone());
        self.model.definition().on_fetch_success(self.model, response);
        Ok(())
    }

    fn failed(&self, error: ModelError) -> ModelError {
        self.model.on_fatal(&error);
        self.model.definition().on_fetch_failure(self.model, &error);
        error
    }
}

struct Saving<'a, D: ModelDefinition> {
    model: &'a Model<D>,
}

#[async_trait]
impl<'a, D: ModelDefinition> Lifecycle for Saving<'a, D> {
    async fn before(&self) -> ModelResult<()> {
        self.model.definition().on_save(self.model).await
    }

    fn succeeded(&self, response: &Response) -> ModelResult<()> {
        self.model.clear_errors();
        self.model.sync();
        self.model.definition().on_save_success(self.model, response);
        Ok(())
    }

    fn failed(&self, error: ModelError) -> ModelError {
        let validation_status = self.model.options().validation_error_status;
        let error = match error {
            ModelError::Transport(transport) if transport.status() == Some(validation_status) => {
                let errors = transport
                    .response()
                    .map(Response::validation_errors)
                    .unwrap_or_default();
                self.model.set_errors(errors);
                let errors = self.model.errors();
                debug!(uid = %self.model.uid(), ?errors, "server rejected attributes");
                ModelError::Validation { errors }
            }
            error => {
                self.model.on_fatal(&error);
                error
            }
        };
        self.model.definition().on_save_failure(self.model, &error);
        error
    }
}

struct Deleting<'a, D: ModelDefinition> {
    model: &'a Model<D>,
}

#[async_trait]
impl<'a, D: ModelDefinition> Lifecycle for Deleting<'a, D> {
    async fn before(&self) -> ModelResult<()> {
        self.model.definition().on_delete(self.model).await
    }

    fn succeeded(&self, response: &Response) -> ModelResult<()> {
        self.model.clear_errors();
        self.model.definition().on_delete_success(self.model, response);
        Ok(())
    }

    fn failed(&self, error: ModelError) -> ModelError {
        self.model.on_fatal(&error);
        self.model.definition().on_delete_failure(self.model, &error);
        error
    }
}
