//! 属性存储（attributes）
//!
//! 单个实体的当前属性与已保存快照（reference），支持：
//! - 点路径读写（`path`）；
//! - 写入时经过变换管道；
//! - 重置、同步与脏检查（`AttributeStore`）；
//! - 以默认值做深度补全（`defaults_deep`）。
//!
mod path;
mod store;

pub use path::{get_path, set_path, unset_path};
pub use store::{AttributeStore, defaults_deep};

/// 属性映射：属性名 -> 值
pub type Attributes = serde_json::Map<String, serde_json::Value>;
