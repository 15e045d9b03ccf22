use super::{Request, Response};
use crate::error::TransportError;
use async_trait::async_trait;
use std::sync::Arc;

/// 请求发送协议
///
/// 实现方负责真正的网络 I/O；非 2xx 响应应以 `TransportError::Response` 返回，
/// 并保留原始响应以便上层读取状态码与错误体。
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response, TransportError>;
}

#[async_trait]
impl<T> Transport for Arc<T>
where
    T: Transport + ?Sized,
{
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        (**self).send(request).await
    }
}
