use async_trait::async_trait;
use dashmap::DashMap;
use resmodel_domain::http::{HttpMethod, Request, Response, Transport};
use resmodel_domain::TransportError;
use serde_json::{Value, json};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

type HandlerFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

type HandlerFn = Arc<dyn Fn(Request) -> HandlerFuture + Send + Sync>;

/// 基于内存的 Transport 实现
/// - 以 (方法, URL) 注册处理器，URL 不含查询参数
/// - 记录收到的每个请求，便于测试断言
/// - 未注册的路由返回 404，非 2xx 响应以 `TransportError::Response` 返回
#[derive(Default)]
pub struct InMemoryTransport {
    routes: DashMap<(HttpMethod, String), HandlerFn>,
    journal: Mutex<Vec<Request>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册异步处理器；同一路由重复注册时覆盖
    pub fn route<F, Fut>(&self, method: HttpMethod, url: impl Into<String>, handler: F)
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        let f: HandlerFn = Arc::new(move |request| -> HandlerFuture { Box::pin(handler(request)) });
        self.routes.insert((method, url.into()), f);
    }

    /// 注册固定响应
    pub fn respond(&self, method: HttpMethod, url: impl Into<String>, status: u16, body: Value) {
        let response = Response::json(status, body);
        self.route(method, url, move |_| {
            let response = response.clone();
            async move { response }
        });
    }

    /// 移除路由，返回是否存在
    pub fn unroute(&self, method: HttpMethod, url: &str) -> bool {
        self.routes.remove(&(method, url.to_string())).is_some()
    }

    pub fn requests(&self) -> Vec<Request> {
        self.journal().clone()
    }

    pub fn last_request(&self) -> Option<Request> {
        self.journal().last().cloned()
    }

    pub fn clear_requests(&self) {
        self.journal().clear();
    }

    fn journal(&self) -> MutexGuard<'_, Vec<Request>> {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        self.journal().push(request.clone());

        let key = (request.method(), request.url().to_string());
        let Some(handler) = self.routes.get(&key).map(|h| h.clone()) else {
            debug!(method = %key.0, url = %key.1, "no route registered");
            return Err(TransportError::Response {
                response: Response::json(
                    404,
                    json!({ "message": format!("no route for {} {}", key.0, key.1) }),
                ),
            });
        };

        let response = (handler)(request).await;
        if response.is_success() {
            Ok(response)
        } else {
            Err(TransportError::Response { response })
        }
    }
}
