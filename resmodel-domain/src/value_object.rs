//! 值对象（Value Object）
//!
//! 无标识、以值相等为准的对象。
//!

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 资源实例标识（Uid）
///
/// 在模型或集合构造时生成，生命周期内保持不变；
/// 集合的去重登记表与模型的集合登记都以它为键，而不是以对象引用为键。
///
/// # 示例
///
/// ```
/// use resmodel_domain::value_object::Uid;
///
/// let a = Uid::generate("user");
/// let b = Uid::generate("user");
/// assert!(a.as_str().starts_with("user-"));
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Uid(String);

impl Uid {
    /// 以类型名为前缀生成新的标识
    pub fn generate(kind: &str) -> Self {
        Self(format!("{kind}-{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Uid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Uid {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Uid {
    fn from(value: String) -> Self {
        Self(value)
    }
}
