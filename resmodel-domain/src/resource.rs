//! 可请求资源（Resource）
//!
//! 模型与集合共享的请求能力：实例标识、路由表与传输实现。
//! 一次动作的执行顺序为：前置钩子 -> 发送 -> 有效性检查 -> 成功/失败处理，
//! 具体处理由调用方通过 `Lifecycle` 提供。
//!
use crate::error::{ModelError, ModelResult, TransportError};
use crate::http::{Params, Request, Response, Routes, Transport};
use crate::value_object::Uid;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// 生命周期动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Fetch,
    Save,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Fetch => "fetch",
            Action::Save => "save",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单次动作的处理逻辑
#[async_trait]
pub(crate) trait Lifecycle: Send + Sync {
    /// 发送前执行，可异步；失败时不发送
    async fn before(&self) -> ModelResult<()> {
        Ok(())
    }

    fn succeeded(&self, response: &Response) -> ModelResult<()>;

    /// 将失败映射为最终返回给调用方的错误
    fn failed(&self, error: ModelError) -> ModelError;
}

/// 面向用户的错误提示：按需优先取响应体中的 `message`
pub(crate) fn error_message(error: &ModelError, use_response_message: bool) -> String {
    error
        .response_message()
        .filter(|_| use_response_message)
        .map(str::to_string)
        .unwrap_or_else(|| "An error occurred".to_string())
}

/// 模型与集合共享的请求能力
#[derive(Clone)]
pub struct Resource {
    uid: Uid,
    routes: Routes,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("uid", &self.uid)
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

impl Resource {
    pub fn new(kind: &str, routes: Routes, transport: Arc<dyn Transport>) -> Self {
        Self {
            uid: Uid::generate(kind),
            routes,
            transport,
        }
    }

    pub fn uid(&self) -> &Uid {
        &self.uid
    }

    pub fn routes(&self) -> &Routes {
        &self.routes
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// 已配置的路由模板
    pub fn route(&self, action: &str) -> Option<&str> {
        self.routes.get(action)
    }

    /// 动作的最终 URL；未配置路由时为空字符串
    pub fn url(&self, action: &str, params: &Params) -> String {
        self.routes.url(action, params)
    }

    /// 发送请求并做最小有效性检查（响应体必须存在）
    pub async fn send(&self, request: Request) -> ModelResult<Response> {
        let response = self.transport.send(request).await?;
        if !response.is_valid() {
            return Err(TransportError::InvalidResponse { response }.into());
        }
        Ok(response)
    }

    pub(crate) async fn execute(
        &self,
        action: Action,
        request: Request,
        lifecycle: &dyn Lifecycle,
    ) -> ModelResult<Response> {
        if let Err(err) = lifecycle.before().await {
            debug!(uid = %self.uid, %action, error = %err, "request cancelled by hook");
            return Err(lifecycle.failed(err));
        }

        debug!(
            uid = %self.uid,
            %action,
            method = %request.method(),
            url = request.url(),
            "dispatching request"
        );

        let outcome = match self.send(request).await {
            Ok(response) => lifecycle.succeeded(&response).map(|_| response),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(response) => {
                debug!(uid = %self.uid, %action, status = response.status(), "request succeeded");
                Ok(response)
            }
            Err(err) => {
                let err = lifecycle.failed(err);
                if matches!(err, ModelError::Transport(_)) {
                    warn!(uid = %self.uid, %action, error = %err, "request failed");
                } else {
                    debug!(uid = %self.uid, %action, error = %err, "request rejected");
                }
                Err(err)
            }
        }
    }
}
