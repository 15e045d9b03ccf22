//! 模型与集合的选项
//!
//! 选项为公开字段的普通结构体，手写 `Default`，并支持以 JSON 加载（缺省字段取默认值）。
//!
use crate::error::{ModelError, ModelResult};
use crate::http::{Headers, HttpMethod, merge_headers};
use crate::resource::Action;
use serde::{Deserialize, Serialize};

/// 各动作使用的 HTTP 方法
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodOptions {
    pub fetch: HttpMethod,
    pub save: HttpMethod,
    pub update: HttpMethod,
    pub create: HttpMethod,
    pub patch: HttpMethod,
    pub delete: HttpMethod,
}

impl Default for MethodOptions {
    fn default() -> Self {
        Self {
            fetch: HttpMethod::Get,
            save: HttpMethod::Post,
            update: HttpMethod::Put,
            create: HttpMethod::Post,
            patch: HttpMethod::Patch,
            delete: HttpMethod::Delete,
        }
    }
}

/// 请求头：`common` 作用于所有动作，其余按动作叠加（动作头优先）
///
/// `Accept`/`Content-Type: application/json` 始终作为最底层存在；叠加时请求头名忽略大小写。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderOptions {
    pub common: Headers,
    pub fetch: Headers,
    pub save: Headers,
    pub delete: Headers,
}

impl HeaderOptions {
    pub fn for_action(&self, action: Action) -> Headers {
        let mut headers = Headers::new();
        headers.insert("Accept".to_string(), "application/json".to_string());
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        merge_headers(&mut headers, self.common.clone());

        let overlay = match action {
            Action::Fetch => &self.fetch,
            Action::Save => &self.save,
            Action::Delete => &self.delete,
        };
        merge_headers(&mut headers, overlay.clone());
        headers
    }
}

/// 模型选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelOptions {
    /// 用于判断“新建/已持久化”的标识属性
    pub identifier: String,
    pub methods: MethodOptions,
    /// 更新时使用 PATCH 而不是 PUT
    pub patch: bool,
    /// 该状态码的失败被解释为服务端校验失败
    pub validation_error_status: u16,
    /// 致命失败时自动调用 `on_response_error`
    pub auto_catch: bool,
    /// 错误提示优先使用响应体中的 `message`
    pub use_response_error_message: bool,
    pub headers: HeaderOptions,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            identifier: "id".to_string(),
            methods: MethodOptions::default(),
            patch: false,
            validation_error_status: 422,
            auto_catch: true,
            use_response_error_message: true,
            headers: HeaderOptions::default(),
        }
    }
}

impl ModelOptions {
    pub fn from_json(json: &str) -> ModelResult<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.check()?;
        Ok(options)
    }

    pub fn check(&self) -> ModelResult<()> {
        if self.identifier.is_empty() {
            return Err(ModelError::invalid_option("identifier", "must not be empty"));
        }
        check_status(self.validation_error_status)
    }
}

/// 集合选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionOptions {
    pub methods: MethodOptions,
    pub validation_error_status: u16,
    pub auto_catch: bool,
    pub use_response_error_message: bool,
    /// 分页时携带当前页的查询参数名
    pub page_parameter: String,
    /// 每页条数；给出时分页拉取同时携带 `per_page_parameter`
    pub per_page: Option<u64>,
    pub per_page_parameter: String,
    /// 批量删除时把标识列表放在请求体中，否则放在查询参数中
    pub use_delete_body: bool,
    /// 查询参数中多个标识的分隔符
    pub delimiter: String,
    pub headers: HeaderOptions,
}

impl Default for CollectionOptions {
    fn default() -> Self {
        Self {
            methods: MethodOptions::default(),
            validation_error_status: 422,
            auto_catch: true,
            use_response_error_message: true,
            page_parameter: "page".to_string(),
            per_page: None,
            per_page_parameter: "per_page".to_string(),
            use_delete_body: true,
            delimiter: ",".to_string(),
            headers: HeaderOptions::default(),
        }
    }
}

impl CollectionOptions {
    pub fn from_json(json: &str) -> ModelResult<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.check()?;
        Ok(options)
    }

    pub fn check(&self) -> ModelResult<()> {
        if self.page_parameter.is_empty() {
            return Err(ModelError::invalid_option("page_parameter", "must not be empty"));
        }
        if self.per_page == Some(0) {
            return Err(ModelError::invalid_option("per_page", "must be positive"));
        }
        if self.per_page.is_some() && self.per_page_parameter.is_empty() {
            return Err(ModelError::invalid_option(
                "per_page_parameter",
                "must not be empty",
            ));
        }
        check_status(self.validation_error_status)
    }
}

fn check_status(status: u16) -> ModelResult<()> {
    if !(100..=599).contains(&status) {
        return Err(ModelError::invalid_option(
            "validation_error_status",
            format!("{status} is not an HTTP status code"),
        ));
    }
    Ok(())
}
