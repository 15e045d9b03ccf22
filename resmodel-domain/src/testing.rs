//! 单元测试用的脚本化传输：按顺序返回预设结果并记录收到的请求
use crate::error::TransportError;
use crate::http::{Request, Response, Transport};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Default)]
pub(crate) struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<Response, TransportError>>>,
    requests: Mutex<Vec<Request>>,
    hold: Option<Arc<Notify>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 每个请求都等待一次 `notify_one` 后才返回
    pub(crate) fn held(gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            hold: Some(gate),
            ..Self::default()
        })
    }

    pub(crate) fn ok(&self, status: u16, body: Value) -> &Self {
        self.push(Ok(Response::json(status, body)))
    }

    pub(crate) fn fail(&self, status: u16, body: Value) -> &Self {
        self.push(Err(TransportError::Response {
            response: Response::json(status, body),
        }))
    }

    pub(crate) fn push(&self, reply: Result<Response, TransportError>) -> &Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub(crate) fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn last(&self) -> Request {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        self.requests.lock().unwrap().push(request);
        if let Some(gate) = &self.hold {
            gate.notified().await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::request("no scripted reply")))
    }
}
