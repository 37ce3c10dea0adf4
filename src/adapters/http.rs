use crate::domain::ports::{ApiRequest, ApiResponse, HttpMethod, HttpTransport, TransportError};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;

/// `HttpTransport` backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

/// Connection-level failures (refused, reset, closed mid-response) map to
/// `Connect` so the retry policy treats them as transient.
fn map_reqwest_error(error: reqwest::Error, timeout: Duration) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(timeout)
    } else if error.is_connect() || error.is_request() || error.is_body() {
        TransportError::Connect(error.to_string())
    } else {
        TransportError::Other(error.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
            HttpMethod::Put => self.client.put(&request.url),
            HttpMethod::Patch => self.client.patch(&request.url),
        };

        builder = builder.timeout(request.timeout);

        if let Some(token) = &request.bearer_token {
            builder = builder.bearer_auth(token);
        }

        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone());
        }

        tracing::debug!("📡 {} {}", request.method, request.url);

        let response = builder
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, request.timeout))?;

        let status = response.status().as_u16();
        tracing::debug!("📡 {} {} -> HTTP {}", request.method, request.url, status);

        let body = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(e, request.timeout))?;

        Ok(ApiResponse { status, body })
    }
}
