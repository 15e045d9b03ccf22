use async_trait::async_trait;
use resmodel_domain::TransportError;
use resmodel_domain::http::{Body, Headers, HttpMethod, Request, Response, Transport};
use serde_json::Value;
use tracing::debug;

/// 基于 reqwest 的 Transport 实现
/// - 相对 URL 拼接在 `base_url` 之后
/// - JSON 请求体按 JSON 发送，表单请求体按 multipart 发送
/// - 响应体为空时解码为空字符串，非 JSON 文本解码为字符串
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    }
}

fn method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
        HttpMethod::Head => reqwest::Method::HEAD,
        HttpMethod::Options => reqwest::Method::OPTIONS,
    }
}

fn decode(text: &str) -> Value {
    if text.is_empty() {
        return Value::String(String::new());
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        let url = self.resolve(request.url());
        let mut builder = self
            .client
            .request(method(request.method()), &url)
            .query(&request.query_pairs());

        for (key, value) in request.headers() {
            builder = builder.header(key, value);
        }

        builder = match request.data() {
            Body::Empty => builder,
            Body::Json(value) => builder.json(value),
            Body::Form(form) => {
                let multipart = form
                    .fields()
                    .iter()
                    .fold(reqwest::multipart::Form::new(), |acc, (name, value)| {
                        acc.text(name.clone(), value.clone())
                    });
                builder.multipart(multipart)
            }
        };

        debug!(method = %request.method(), url = %url, "sending http request");
        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::request(e.to_string()))?;

        let status = response.status().as_u16();
        let mut headers = Headers::new();
        for (key, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(key.as_str().to_string(), value.to_string());
            }
        }

        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Request {
                reason: e.to_string(),
                response: Some(Response::builder().status(status).headers(headers.clone()).build()),
            })?;

        let response = Response::builder()
            .status(status)
            .headers(headers)
            .body(decode(&text))
            .build();

        if response.is_success() {
            Ok(response)
        } else {
            Err(TransportError::Response { response })
        }
    }
}
