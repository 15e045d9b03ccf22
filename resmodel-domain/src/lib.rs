//! 远程资源模型基础库（resmodel-domain）
//!
//! 为客户端数据层提供 active-record 风格的通用构件：
//! - 属性存储（`attributes`）：当前值与已保存快照、点路径读写、脏检查与重置；
//! - 变换管道（`mutation`）：按属性编译的写入变换链；
//! - 校验（`validation`）：按属性的规则列表、错误集合、内置规则与本地化文案；
//! - 请求协调（`http` 与 `resource`）：请求描述、传输边界与动作生命周期钩子；
//! - 模型（`model`）与集合（`collection`）：组合上述能力，负责保存/拉取/删除与成员登记。
//!
//! 本 crate 不绑定具体 HTTP 实现，仅定义 `Transport` 协议，
//! 由上层（例如 `resmodel-transport`）提供内存或真实网络实现并注入。
//!
//! 典型用法：
//! 1. 为实体实现 `ModelDefinition`（默认值、变换、校验规则、路由、选项与钩子）；
//! 2. 选择一个 `Transport` 实现并以 `Arc` 注入；
//! 3. 通过 `Model::get/set` 修改属性，调用 `save/fetch/delete` 与远端同步；
//! 4. 使用 `Collection` 维护有序且去重的模型列表与分页游标。
//!
pub mod attributes;
pub mod collection;
pub mod error;
pub mod http;
pub mod model;
pub mod mutation;
pub mod options;
pub mod resource;
pub mod status;
#[cfg(test)]
mod testing;
pub mod validation;
pub mod value;
pub mod value_object;

pub use attributes::{AttributeStore, Attributes};
pub use collection::{Collection, CollectionDefinition, LAST_PAGE, NO_PAGE};
pub use error::{ModelError, ModelResult, TransportError};
pub use http::{Body, FormData, HttpMethod, Request, RequestOptions, Response, Routes, Transport};
pub use model::{Model, ModelDefinition};
pub use options::{CollectionOptions, HeaderOptions, MethodOptions, ModelOptions};
pub use status::Status;
pub use value_object::Uid;
