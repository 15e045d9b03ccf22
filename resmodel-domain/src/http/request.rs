use super::HttpMethod;
use crate::value::to_display_string;
use bon::Builder;
use serde_json::Value;
use std::collections::BTreeMap;

/// 查询参数
pub type Params = serde_json::Map<String, Value>;

/// 请求/响应头；键按原样保存，查找时由调用方决定是否忽略大小写
pub type Headers = BTreeMap<String, String>;

/// 逐项合并请求头，名称忽略大小写相同的旧项被替换
pub(crate) fn merge_headers(
    target: &mut Headers,
    extra: impl IntoIterator<Item = (String, String)>,
) {
    for (name, value) in extra {
        target.retain(|key, _| !key.eq_ignore_ascii_case(&name));
        target.insert(name, value);
    }
}

/// 请求体
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    #[default]
    Empty,
    Json(Value),
    /// multipart 表单（上传）
    Form(FormData),
}

impl Body {
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Body::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_form(&self) -> Option<&FormData> {
        match self {
            Body::Form(form) => Some(form),
            _ => None,
        }
    }
}

/// 表单字段列表（保持追加顺序，允许同名字段）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    fields: Vec<(String, String)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    /// 将对象的每个顶层键转换为一个表单字段；
    /// 字符串原样写入，对象与数组写入其 JSON 文本，其余标量写入其字符串形式
    pub fn from_value(value: &Value) -> Self {
        let mut form = Self::new();
        if let Some(map) = value.as_object() {
            for (name, value) in map {
                let text = match value {
                    Value::Object(_) | Value::Array(_) => value.to_string(),
                    other => to_display_string(other),
                };
                form.append(name.clone(), text);
            }
        }
        form
    }
}

/// 传输层请求描述
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct Request {
    method: HttpMethod,
    #[builder(into)]
    url: String,
    #[builder(default)]
    data: Body,
    #[builder(default)]
    params: Params,
    #[builder(default)]
    headers: Headers,
}

impl Request {
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn data(&self) -> &Body {
        &self.data
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// 忽略大小写读取请求头
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// 查询参数的字符串形式（null 参数被忽略）
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| (key.clone(), to_display_string(value)))
            .collect()
    }

    /// 用调用方的覆盖项生成最终请求：
    /// `method`/`url`/`data` 给出即替换，`params`/`headers` 逐键合并且调用方优先；
    /// 请求头名忽略大小写
    pub fn with_overrides(mut self, options: RequestOptions) -> Self {
        if let Some(method) = options.method {
            self.method = method;
        }
        if let Some(url) = options.url {
            self.url = url;
        }
        if let Some(data) = options.data {
            self.data = data;
        }
        if let Some(params) = options.params {
            self.params.extend(params);
        }
        if let Some(headers) = options.headers {
            merge_headers(&mut self.headers, headers);
        }
        self
    }

    pub(crate) fn set_data(&mut self, data: Body) {
        self.data = data;
    }

    pub(crate) fn remove_header(&mut self, name: &str) {
        self.headers.retain(|key, _| !key.eq_ignore_ascii_case(name));
    }
}

/// 单次调用的请求覆盖项
#[derive(Debug, Clone, Default, PartialEq, Builder)]
pub struct RequestOptions {
    pub method: Option<HttpMethod>,
    #[builder(into)]
    pub url: Option<String>,
    pub data: Option<Body>,
    pub params: Option<Params>,
    pub headers: Option<Headers>,
}
