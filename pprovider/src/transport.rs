//! Outbound JSON-over-HTTP transport shared by every provider adapter.
//!
//! ```rust
//! use pprovider::HttpRequest;
//! use serde_json::json;
//!
//! let request = HttpRequest::new("https://api.openai.com/v1/chat/completions", json!({}))
//!     .with_header("Authorization", "Bearer sk-live-123");
//!
//! assert_eq!(request.header("Authorization"), Some("Bearer sk-live-123"));
//! assert!(!format!("{request:?}").contains("sk-live-123"));
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::{ProviderError, ProviderFuture};

pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

impl HttpRequest {
    pub fn new(url: impl Into<String>, body: Value) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            url: url.into(),
            headers,
            body,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

impl std::fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let header_names = self.headers.keys().collect::<Vec<_>>();
        f.debug_struct("HttpRequest")
            .field("url", &self.url)
            .field("headers", &header_names)
            .field("body", &self.body)
            .finish()
    }
}

pub trait HttpTransport: Send + Sync + std::fmt::Debug {
    /// POSTs `request.body` and returns the decoded JSON of a 2xx response.
    fn post_json<'a>(&'a self, request: HttpRequest)
    -> ProviderFuture<'a, Result<Value, ProviderError>>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ProviderError::configuration(format!("http client: {err}")))?;
        Ok(Self { client })
    }

    pub fn with_default_timeout() -> Result<Self, ProviderError> {
        Self::new(DEFAULT_PROVIDER_TIMEOUT)
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    async fn parse_error(response: Response) -> ProviderError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::error!(status = status.as_u16(), body = %body, "provider returned an error status");

        let message = extract_error_message(&body)
            .unwrap_or_else(|| format!("request failed with status {status}"));
        error_for_status(status, message)
    }
}

impl HttpTransport for ReqwestTransport {
    fn post_json<'a>(
        &'a self,
        request: HttpRequest,
    ) -> ProviderFuture<'a, Result<Value, ProviderError>> {
        Box::pin(async move {
            let mut builder = self.client.post(&request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }

            let response = builder.json(&request.body).send().await.map_err(|err| {
                if err.is_timeout() {
                    ProviderError::timeout(err.to_string())
                } else {
                    ProviderError::transport(err.to_string())
                }
            })?;

            if !response.status().is_success() {
                return Err(Self::parse_error(response).await);
            }

            let body = response.text().await.map_err(|err| {
                if err.is_timeout() {
                    ProviderError::timeout(err.to_string())
                } else {
                    ProviderError::transport(err.to_string())
                }
            })?;

            serde_json::from_str(&body).map_err(|err| {
                tracing::error!(error = %err, body = %body, "provider returned a non-json body");
                ProviderError::malformed_response(format!("response body is not json: {err}"))
            })
        })
    }
}

pub(crate) fn error_for_status(status: StatusCode, message: String) -> ProviderError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::authentication(message),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::rate_limited(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            ProviderError::timeout(message)
        }
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ProviderError::invalid_request(message)
        }
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => {
            ProviderError::unavailable(message)
        }
        _ => ProviderError::transport(message),
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<ApiErrorEnvelope>(body).ok()?;
    Some(parsed.error.message)
}
