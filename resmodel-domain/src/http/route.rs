use super::Params;
use crate::value::to_display_string;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// URL 组件编码集：保留字母数字与 `-_.!~*'()`
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// 动作名（fetch/save/create/update/delete 等）到 URL 模板的映射
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Routes(BTreeMap<String, String>);

impl Routes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, action: impl Into<String>, template: impl Into<String>) -> Self {
        self.0.insert(action.into(), template.into());
        self
    }

    /// 已配置且非空的模板
    pub fn get(&self, action: &str) -> Option<&str> {
        self.0
            .get(action)
            .map(String::as_str)
            .filter(|template| !template.is_empty())
    }

    /// 依次尝试多个动作，返回第一个已配置的模板
    pub fn first_of(&self, actions: &[&str]) -> Option<&str> {
        actions.iter().find_map(|action| self.get(action))
    }

    /// 动作的最终 URL；未配置时为空字符串
    pub fn url(&self, action: &str, params: &Params) -> String {
        self.get(action)
            .map(|template| build_url(template, params))
            .unwrap_or_default()
    }
}

/// 用参数替换模板中的 `:name` 占位符
///
/// 占位符名为 `:` 之后最长的字母、数字与下划线序列，按完整名称匹配参数。
/// 每个参数只替换第一处出现，值按 URL 组件编码；未提供的占位符保留原样。
pub fn build_url(template: &str, params: &Params) -> String {
    let mut url = String::with_capacity(template.len());
    let mut used = HashSet::new();
    let mut rest = template;

    while let Some(colon) = rest.find(':') {
        url.push_str(&rest[..colon]);
        let after = &rest[colon + 1..];
        let len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        let name = &after[..len];

        match params.get(name) {
            Some(value) if !name.is_empty() && used.insert(name) => {
                url.extend(utf8_percent_encode(&to_display_string(value), COMPONENT));
            }
            _ => {
                url.push(':');
                url.push_str(name);
            }
        }
        rest = &after[len..];
    }
    url.push_str(rest);
    url
}
