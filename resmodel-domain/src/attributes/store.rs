use super::{Attributes, get_path, set_path, unset_path};
use crate::mutation::MutationPipeline;
use serde_json::Value;

/// 单个实体的属性存储
///
/// - `attributes`：当前工作状态；
/// - `reference`：最近一次同步（保存成功）时的快照。
///
/// 两者互为独立副本，只有 `sync`/`reset`/`assign` 会在两者之间复制；
/// 所有写入都先经过变换管道再落入 `attributes`。
#[derive(Debug, Clone, Default)]
pub struct AttributeStore {
    attributes: Attributes,
    reference: Attributes,
    pipeline: MutationPipeline,
}

impl AttributeStore {
    pub fn new(pipeline: MutationPipeline) -> Self {
        Self {
            attributes: Attributes::new(),
            reference: Attributes::new(),
            pipeline,
        }
    }

    /// 以默认值深度补全初始属性（已有键优先），同时作为当前状态与快照
    pub fn assign(&mut self, initial: Attributes, defaults: &Attributes) -> &Attributes {
        let merged = defaults_deep(initial, defaults);
        self.reference = merged.clone();
        self.attributes = merged;
        &self.attributes
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn reference(&self) -> &Attributes {
        &self.reference
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        get_path(&self.attributes, path)
    }

    pub fn saved(&self, path: &str) -> Option<&Value> {
        get_path(&self.reference, path)
    }

    /// 写入单个路径（经过变换）
    pub fn set(&mut self, path: &str, value: Value) {
        let value = self.pipeline.apply(path, value);
        set_path(&mut self.attributes, path, value);
    }

    /// 批量写入，每个键单独经过变换
    pub fn set_many(&mut self, values: Attributes) {
        for (path, value) in values {
            self.set(&path, value);
        }
    }

    pub fn unset(&mut self, path: &str) -> Option<Value> {
        unset_path(&mut self.attributes, path)
    }

    /// 整体恢复为快照的副本
    pub fn reset(&mut self) {
        self.attributes = self.reference.clone();
    }

    /// 按路径恢复：快照中存在则重新写入（经过变换），否则删除该路径
    pub fn reset_paths<I, S>(&mut self, paths: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for path in paths {
            let path = path.as_ref();
            match self.saved(path).cloned() {
                Some(value) => self.set(path, value),
                None => {
                    self.unset(path);
                }
            }
        }
    }

    /// 以当前状态的副本覆盖快照；仅在确认持久化成功后调用
    pub fn sync(&mut self) {
        self.reference = self.attributes.clone();
    }

    /// 与快照不同的顶层属性；无变化时返回 `None`
    pub fn changed(&self) -> Option<Vec<String>> {
        let mut changed: Vec<String> = self
            .attributes
            .iter()
            .filter(|(key, value)| self.reference.get(key.as_str()) != Some(*value))
            .map(|(key, _)| key.clone())
            .collect();

        changed.extend(
            self.reference
                .keys()
                .filter(|key| !self.attributes.contains_key(key.as_str()))
                .cloned(),
        );

        (!changed.is_empty()).then_some(changed)
    }
}

/// 深度补全：仅为 `target` 中缺失的键填入默认值，两侧皆为对象时递归
pub fn defaults_deep(mut target: Attributes, defaults: &Attributes) -> Attributes {
    fill_missing(&mut target, defaults);
    target
}

fn fill_missing(target: &mut Attributes, defaults: &Attributes) {
    for (key, default) in defaults {
        if !target.contains_key(key) {
            target.insert(key.clone(), default.clone());
            continue;
        }
        if let (Some(Value::Object(inner)), Value::Object(default_inner)) =
            (target.get_mut(key), default)
        {
            fill_missing(inner, default_inner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::{Mutation, Mutations};
    use serde_json::json;

    fn attrs(value: Value) -> Attributes {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn store() -> AttributeStore {
        let pipeline = MutationPipeline::compile(Mutations::new().with(
            "name",
            Mutation::one(|v| match v {
                Value::String(s) => Value::String(s.trim().to_string()),
                other => other,
            }),
        ));
        let mut store = AttributeStore::new(pipeline);
        store.assign(
            attrs(json!({ "name": "alice", "address": { "city": "Paris" } })),
            &attrs(json!({ "active": true, "address": { "city": "Nowhere", "zip": "000" } })),
        );
        store
    }

    #[test]
    fn assign_merges_defaults_deeply() {
        let store = store();
        assert_eq!(
            Value::Object(store.attributes().clone()),
            json!({
                "name": "alice",
                "active": true,
                "address": { "city": "Paris", "zip": "000" }
            })
        );
        assert_eq!(store.attributes(), store.reference());
        assert_eq!(store.changed(), None);
    }

    #[test]
    fn set_routes_through_pipeline_and_marks_dirty() {
        let mut store = store();
        store.set("name", json!("  bob  "));
        assert_eq!(store.get("name"), Some(&json!("bob")));
        assert_eq!(store.saved("name"), Some(&json!("alice")));
        assert_eq!(store.changed(), Some(vec!["name".to_string()]));
    }

    #[test]
    fn nested_write_reports_top_level_key() {
        let mut store = store();
        store.set("address.city", json!("Lyon"));
        assert_eq!(store.changed(), Some(vec!["address".to_string()]));
        assert_eq!(store.saved("address.city"), Some(&json!("Paris")));
    }

    #[test]
    fn removed_key_is_reported_as_changed() {
        let mut store = store();
        store.unset("active");
        assert_eq!(store.changed(), Some(vec!["active".to_string()]));
    }

    #[test]
    fn reset_all_restores_reference() {
        let mut store = store();
        store.set("name", json!("carol"));
        store.set("extra", json!(1));
        store.reset();
        assert_eq!(store.attributes(), store.reference());
        assert_eq!(store.changed(), None);
    }

    #[test]
    fn reset_paths_only_touches_given_paths() {
        let mut store = store();
        store.set("name", json!("carol"));
        store.set("active", json!(false));
        store.set("extra", json!(1));
        store.reset_paths(["name", "extra"]);

        assert_eq!(store.get("name"), Some(&json!("alice")));
        assert_eq!(store.get("extra"), None);
        assert_eq!(store.get("active"), Some(&json!(false)));
        assert_eq!(store.changed(), Some(vec!["active".to_string()]));
    }

    #[test]
    fn sync_clears_dirty_state() {
        let mut store = store();
        store.set("name", json!("dave"));
        store.sync();
        assert_eq!(store.changed(), None);
        assert_eq!(store.saved("name"), Some(&json!("dave")));

        // 快照与当前状态互相独立
        store.set("name", json!("erin"));
        assert_eq!(store.saved("name"), Some(&json!("dave")));
    }

    #[test]
    fn set_many_mutates_each_key() {
        let mut store = store();
        store.set_many(attrs(json!({ "name": " zed ", "age": 30 })));
        assert_eq!(store.get("name"), Some(&json!("zed")));
        assert_eq!(store.get("age"), Some(&json!(30)));
    }

    #[test]
    fn defaults_do_not_override_explicit_null() {
        let merged = defaults_deep(attrs(json!({ "a": null })), &attrs(json!({ "a": 1, "b": 2 })));
        assert_eq!(Value::Object(merged), json!({ "a": null, "b": 2 }));
    }
}
