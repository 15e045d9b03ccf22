//! 统一错误定义
//!
//! 区分几类失败：校验失败（可重试）、并发冲突与末页拉取（本地立即拒绝）、
//! 传输失败（致命，保留原始原因）与编程错误（误用，例如无效下标）。
//!
use crate::http::Response;
use std::collections::BTreeMap;
use thiserror::Error;

/// 传输边界返回的失败结果
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// 请求未得到可用响应（连接失败、超时、编码失败等）
    #[error("request error: {reason}")]
    Request {
        reason: String,
        response: Option<Response>,
    },
    /// 收到非成功状态码的响应
    #[error("response error: status={}", .response.status())]
    Response { response: Response },
    /// 响应体未定义，视为无效响应
    #[error("invalid response: status={}, body is undefined", .response.status())]
    InvalidResponse { response: Response },
}

impl TransportError {
    pub fn request(reason: impl Into<String>) -> Self {
        TransportError::Request {
            reason: reason.into(),
            response: None,
        }
    }

    pub fn response(&self) -> Option<&Response> {
        match self {
            TransportError::Request { response, .. } => response.as_ref(),
            TransportError::Response { response } => Some(response),
            TransportError::InvalidResponse { response } => Some(response),
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.response().map(Response::status)
    }
}

/// 统一错误类型
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ModelError {
    // --- 校验 ---
    #[error("validation failed: {errors:?}")]
    Validation { errors: BTreeMap<String, String> },

    // --- 并发 ---
    #[error("conflict: {reason}")]
    Conflict { reason: String },

    // --- 分页 ---
    #[error("collection already fetched its last page")]
    LastPage,

    // --- 传输（致命） ---
    #[error(transparent)]
    Transport(#[from] TransportError),

    // --- 误用 ---
    #[error("invalid index: index={index}, len={len}")]
    InvalidIndex { index: usize, len: usize },
    #[error("invalid method: {0}")]
    InvalidMethod(String),
    #[error("invalid option `{name}`: {reason}")]
    InvalidOption { name: String, reason: String },

    // --- 钩子/序列化 ---
    #[error("hook failed: {reason}")]
    Hook { reason: String },
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
}

impl ModelError {
    pub fn conflict(reason: impl Into<String>) -> Self {
        ModelError::Conflict {
            reason: reason.into(),
        }
    }

    pub fn hook(reason: impl Into<String>) -> Self {
        ModelError::Hook {
            reason: reason.into(),
        }
    }

    pub fn invalid_option(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ModelError::InvalidOption {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ModelError::Validation { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ModelError::Conflict { .. })
    }

    pub fn is_last_page(&self) -> bool {
        matches!(self, ModelError::LastPage)
    }

    /// 校验失败时携带的（每个属性的首条）错误信息
    pub fn validation_errors(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            ModelError::Validation { errors } => Some(errors),
            _ => None,
        }
    }

    /// 若失败来自传输边界，返回其携带的响应
    pub fn response(&self) -> Option<&Response> {
        match self {
            ModelError::Transport(err) => err.response(),
            _ => None,
        }
    }

    /// 响应体中的 `message` 字段（若有）
    pub fn response_message(&self) -> Option<&str> {
        self.response()?.body()?.get("message")?.as_str()
    }
}

/// 统一 Result 类型别名
pub type ModelResult<T> = Result<T, ModelError>;
