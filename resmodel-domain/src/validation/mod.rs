//! 校验（validation）
//!
//! - `Rule`：`(value, attribute) -> Ok(()) | Err(message)` 的规则函数，可用 `and` 串联；
//! - `ValidationRules`：属性名 -> 有序规则列表；
//! - `ValidationEngine`：逐属性执行全部规则（不在首个失败处短路），
//!   把失败信息写入 `ErrorBag` 并返回是否通过；
//! - `rules`/`locale`：内置规则与本地化文案。
//!
mod errors;
pub mod locale;
pub mod rules;

pub use errors::ErrorBag;

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// 规则函数：通过返回 `Ok(())`，失败返回错误信息
pub type RuleFn = Arc<dyn Fn(&Value, &str) -> Result<(), String> + Send + Sync>;

/// 单条校验规则
#[derive(Clone)]
pub struct Rule {
    check: RuleFn,
}

impl Rule {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value, &str) -> Result<(), String> + Send + Sync + 'static,
    {
        Self { check: Arc::new(f) }
    }

    pub fn check(&self, value: &Value, attribute: &str) -> Result<(), String> {
        (self.check)(value, attribute)
    }

    /// 串联规则：前一条失败时直接返回其错误，否则继续执行下一条
    pub fn and(self, next: Rule) -> Rule {
        Rule::new(move |value, attribute| {
            self.check(value, attribute)?;
            next.check(value, attribute)
        })
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Rule")
    }
}

/// 规则声明集合：属性名 -> 有序规则列表
#[derive(Debug, Clone, Default)]
pub struct ValidationRules {
    rules: BTreeMap<String, Vec<Rule>>,
}

impl ValidationRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为属性追加规则
    pub fn with<I>(mut self, attribute: impl Into<String>, rules: I) -> Self
    where
        I: IntoIterator<Item = Rule>,
    {
        self.rules.entry(attribute.into()).or_default().extend(rules);
        self
    }

    pub fn rules_for(&self, attribute: &str) -> &[Rule] {
        self.rules.get(attribute).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// 校验引擎
#[derive(Debug, Clone, Default)]
pub struct ValidationEngine {
    rules: ValidationRules,
}

impl ValidationEngine {
    pub fn new(rules: ValidationRules) -> Self {
        Self { rules }
    }

    /// 校验单个属性：执行全部规则并收集所有失败信息，完整替换该属性的错误。
    /// 没有规则的属性总是通过，且不会触碰其已有错误。
    pub fn validate_attribute(
        &self,
        attribute: &str,
        value: Option<&Value>,
        errors: &mut ErrorBag,
    ) -> bool {
        let rules = self.rules.rules_for(attribute);
        if rules.is_empty() {
            return true;
        }

        let value = value.unwrap_or(&Value::Null);
        let messages: Vec<String> = rules
            .iter()
            .filter_map(|rule| rule.check(value, attribute).err())
            .collect();

        let valid = messages.is_empty();
        errors.set_attribute(attribute, messages);
        valid
    }

    /// 校验一组属性，返回全部结果的与；未访问到的属性保留原有错误
    pub fn validate_all<'a, I, F>(&self, attributes: I, lookup: F, errors: &mut ErrorBag) -> bool
    where
        I: IntoIterator<Item = &'a str>,
        F: Fn(&str) -> Option<&'a Value>,
    {
        let mut valid = true;
        for attribute in attributes {
            if !self.validate_attribute(attribute, lookup(attribute), errors) {
                valid = false;
            }
        }
        valid
    }
}
