//! HTTP transport used for the single batch round-trip.
//!
//! The transaction layer only needs "send a request, get status, headers and
//! body text back". [`HttpSender`] is that seam; [`ReqwestSender`] is the
//! default implementation. Request signing, retries and similar pipeline
//! concerns belong to whatever sender the caller plugs in.

use crate::common::HttpError;
use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;

/// An outgoing HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    /// Header names and values in insertion order.
    pub headers: Vec<(String, String)>,
    pub body: String,
    /// Permit plain `http://` targets such as local emulators.
    pub allow_insecure_connection: bool,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Vec::new(),
            body: String::new(),
            allow_insecure_connection: false,
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A received HTTP response with its body decoded as text.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Capability to put one request on the wire.
///
/// Implementations must return `Ok` for every response the server produced,
/// whatever its status; `Err` is reserved for transport failures.
#[async_trait]
pub trait HttpSender: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

/// [`HttpSender`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestSender {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestSender {
    pub fn new(timeout: Duration) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| HttpError::ClientCreation {
                reason: e.to_string(),
            })?;

        Ok(Self { client, timeout })
    }

    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    fn build_headers(request: &HttpRequest) -> Result<HeaderMap, HttpError> {
        let mut headers = HeaderMap::with_capacity(request.headers.len());
        for (name, value) in &request.headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| HttpError::RequestFailed {
                    url: request.url.clone(),
                    reason: format!("Invalid header name '{name}': {e}"),
                })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|e| HttpError::RequestFailed {
                    url: request.url.clone(),
                    reason: format!("Invalid value for header '{name}': {e}"),
                })?;
            headers.insert(header_name, header_value);
        }
        Ok(headers)
    }
}

#[async_trait]
impl HttpSender for ReqwestSender {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        if !request.allow_insecure_connection && request.url.starts_with("http://") {
            return Err(HttpError::InsecureConnection { url: request.url });
        }

        let method =
            Method::from_bytes(request.method.as_bytes()).map_err(|e| HttpError::RequestFailed {
                url: request.url.clone(),
                reason: format!("Invalid method '{}': {e}", request.method),
            })?;
        let headers = Self::build_headers(&request)?;

        log::debug!("Sending {} {}", request.method, request.url);

        let pending = self
            .client
            .request(method, &request.url)
            .headers(headers)
            .body(request.body)
            .send();

        let response = tokio::time::timeout(self.timeout, pending)
            .await
            .map_err(|_| HttpError::Timeout {
                url: request.url.clone(),
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|e| HttpError::RequestFailed {
                url: request.url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response
            .text()
            .await
            .map_err(|e| HttpError::InvalidResponse {
                expected: "UTF-8 response body".to_string(),
                actual: e.to_string(),
            })?;

        log::debug!("Received HTTP {} from {}", status, request.url);

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
