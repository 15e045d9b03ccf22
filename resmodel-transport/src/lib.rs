//! 传输实现（resmodel-transport）
//!
//! 为 `resmodel_domain::Transport` 提供具体实现：
//! - `InMemoryTransport`：按 (方法, URL) 注册的内存处理器，附带请求记录，用于测试、演示与本地开发；
//! - `ReqwestTransport`：基于 reqwest 的真实 HTTP 传输（需开启 `reqwest` feature）。
//!
pub mod inmemory_transport;
#[cfg(feature = "reqwest")]
pub mod reqwest_transport;

pub use inmemory_transport::InMemoryTransport;
#[cfg(feature = "reqwest")]
pub use reqwest_transport::ReqwestTransport;
