//! 请求描述与传输边界（http）
//!
//! 定义与具体 HTTP 实现无关的请求/响应描述、路由模板与 `Transport` 协议：
//! - `Request`：`{method, url, data, params, headers}`；
//! - `Response`：`{status, headers, body}`，body 为 `None` 表示未定义；
//! - `Routes`：动作名 -> URL 模板（`:name` 占位符）；
//! - `Transport`：异步发送请求，返回成功响应或 `TransportError`。
//!
mod method;
mod request;
mod response;
mod route;
mod transport;

pub use method::HttpMethod;
pub use request::{Body, FormData, Headers, Params, Request, RequestOptions};
pub(crate) use request::merge_headers;
pub use response::Response;
pub use route::{Routes, build_url};
pub use transport::Transport;
