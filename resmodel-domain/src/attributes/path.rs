use super::Attributes;
use serde_json::Value;
use tracing::warn;

// 路径规则：若根映射中存在与路径完全相同的键则直接使用该键，
// 否则按 `.` 拆分逐级查找；数字段可用于索引数组。

/// 单次写入时数组最多补齐的元素个数
const MAX_ARRAY_GROWTH: usize = 1024;

/// 按点路径读取
pub fn get_path<'a>(root: &'a Attributes, path: &str) -> Option<&'a Value> {
    if let Some(value) = root.get(path) {
        return Some(value);
    }

    let mut segments = path.split('.');
    let mut current = root.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn get_path_mut<'a>(root: &'a mut Attributes, path: &str) -> Option<&'a mut Value> {
    if root.contains_key(path) {
        return root.get_mut(path);
    }

    let mut segments = path.split('.');
    let mut current = root.get_mut(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get_mut(segment)?,
            Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// 按点路径写入，缺失的中间节点以对象补齐，标量中间节点会被覆盖
///
/// 数组下标越出当前长度过多（或溢出）时放弃本次写入。
pub fn set_path(root: &mut Attributes, path: &str, value: Value) {
    if root.contains_key(path) || !path.contains('.') {
        root.insert(path.to_string(), value);
        return;
    }

    let mut segments = path.split('.');
    let Some(first) = segments.next() else {
        return;
    };
    let mut current = root.entry(first.to_string()).or_insert(Value::Null);
    for segment in segments {
        let Some(child) = child_mut(current, segment) else {
            warn!(path, segment, "array index out of reach, write skipped");
            return;
        };
        current = child;
    }
    *current = value;
}

/// 按点路径删除，返回被删除的值
pub fn unset_path(root: &mut Attributes, path: &str) -> Option<Value> {
    if root.contains_key(path) || !path.contains('.') {
        return root.remove(path);
    }

    let (parent, last) = path.rsplit_once('.')?;
    match get_path_mut(root, parent)? {
        Value::Object(map) => map.remove(last),
        _ => None,
    }
}

fn child_mut<'a>(node: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match (node, segment.parse::<usize>().ok()) {
        (Value::Array(items), Some(index)) => {
            if index >= items.len() {
                if index - items.len() >= MAX_ARRAY_GROWTH {
                    return None;
                }
                items.resize(index.checked_add(1)?, Value::Null);
            }
            items.get_mut(index)
        }
        (Value::Object(map), _) => Some(map.entry(segment.to_string()).or_insert(Value::Null)),
        (other, _) => {
            *other = Value::Object(Attributes::new());
            child_mut(other, segment)
        }
    }
}
