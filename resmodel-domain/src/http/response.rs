use super::Headers;
use crate::validation::ErrorBag;
use bon::Builder;
use serde_json::Value;
use std::collections::BTreeMap;

/// 传输层响应
///
/// `body` 为 `None` 表示响应体缺失（未定义），与 `Some(Value::Null)` 区分。
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct Response {
    status: u16,
    #[builder(default)]
    headers: Headers,
    body: Option<Value>,
}

impl Response {
    /// 携带 JSON 响应体的快捷构造
    pub fn json(status: u16, body: Value) -> Self {
        Self::builder().status(status).body(body).build()
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn into_body(self) -> Option<Value> {
        self.body
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 响应体存在即视为有效
    pub fn is_valid(&self) -> bool {
        self.body.is_some()
    }

    /// 从 `body.errors` 中读取服务端字段错误
    pub fn validation_errors(&self) -> BTreeMap<String, Vec<String>> {
        self.body
            .as_ref()
            .and_then(|body| body.get("errors"))
            .map(ErrorBag::parse_server_errors)
            .unwrap_or_default()
    }
}
