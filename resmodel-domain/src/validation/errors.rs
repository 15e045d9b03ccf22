use serde_json::Value;
use std::collections::BTreeMap;

/// 属性错误集合：属性名 -> 有序错误信息列表
///
/// 对外默认只暴露每个属性的第一条信息（`first_messages`），完整列表仍在内部保留。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorBag {
    messages: BTreeMap<String, Vec<String>>,
}

impl ErrorBag {
    /// 完整替换某个属性的错误；空列表表示移除
    pub fn set_attribute(&mut self, attribute: &str, messages: Vec<String>) {
        if messages.is_empty() {
            self.messages.remove(attribute);
        } else {
            self.messages.insert(attribute.to_string(), messages);
        }
    }

    /// 整体替换
    pub fn replace(&mut self, messages: BTreeMap<String, Vec<String>>) {
        self.messages = messages
            .into_iter()
            .filter(|(_, list)| !list.is_empty())
            .collect();
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn has(&self, attribute: &str) -> bool {
        self.messages.contains_key(attribute)
    }

    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.messages
            .get(attribute)
            .and_then(|list| list.first())
            .map(String::as_str)
    }

    pub fn messages(&self, attribute: &str) -> Option<&[String]> {
        self.messages.get(attribute).map(Vec::as_slice)
    }

    /// 每个属性折叠为第一条信息
    pub fn first_messages(&self) -> BTreeMap<String, String> {
        self.messages
            .iter()
            .map(|(attribute, list)| {
                let first = list.first().cloned().unwrap_or_default();
                (attribute.clone(), first)
            })
            .collect()
    }

    pub fn all(&self) -> &BTreeMap<String, Vec<String>> {
        &self.messages
    }

    /// 解析服务端返回的错误映射：每个属性可以是字符串或字符串列表
    pub fn parse_server_errors(errors: &Value) -> BTreeMap<String, Vec<String>> {
        let Some(map) = errors.as_object() else {
            return BTreeMap::new();
        };

        map.iter()
            .map(|(attribute, value)| {
                let list = match value {
                    Value::Array(items) => items
                        .iter()
                        .map(|item| match item {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect(),
                    Value::String(s) => vec![s.clone()],
                    Value::Null => Vec::new(),
                    other => vec![other.to_string()],
                };
                (attribute.clone(), list)
            })
            .collect()
    }
}
