//! HTTP transport abstraction.
//!
//! Clients never talk to reqwest directly. They build an [`HttpRequest`] and
//! hand it to an [`HttpTransport`], which only fails for network level
//! problems: a 4xx or 5xx answer is still a successful [`HttpResponse`] and
//! its interpretation is left to the provider.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, DATE, USER_AGENT};
use serde::de::DeserializeOwned;

use super::{ProviderError, Result};
use crate::config::TransportSettings;

/// HTTP methods used by the mail APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

/// An outgoing HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Request method.
    pub method: Method,
    /// Absolute URL including the query string.
    pub url: String,
    /// Extra request headers.
    pub headers: HeaderMap,
    /// JSON body, if any.
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    /// Creates a `GET` request.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Creates a `POST` request without a body.
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Sets the JSON body.
    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Adds a header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// A received HTTP response, whatever its status.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Raw response body.
    pub body: Bytes,
}

impl HttpResponse {
    /// Returns whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns a header value as a string, if present and visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| ProviderError::InvalidResponse(format!("parse response: {}", e)))
    }

    /// Returns the body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parses the `Date` header (RFC 7231 IMF-fixdate).
    pub fn date(&self) -> Result<DateTime<Utc>> {
        let value = self
            .header(DATE.as_str())
            .ok_or_else(|| ProviderError::InvalidResponse("missing Date header".to_string()))?;

        DateTime::parse_from_rfc2822(value)
            .map(|date| date.with_timezone(&Utc))
            .map_err(|e| ProviderError::InvalidResponse(format!("invalid Date header {:?}: {}", value, e)))
    }
}

/// Executes HTTP requests on behalf of a mail client.
///
/// Implementations must only return an error when no HTTP response was
/// received at all (DNS, TLS, connection reset, timeout).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends the request and returns the response.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// [`HttpTransport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with default settings.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Creates a transport from explicit settings.
    pub fn with_settings(settings: &TransportSettings) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&settings.user_agent)
                .map_err(|e| ProviderError::InvalidRequest(format!("invalid user agent: {}", e)))?,
        );

        let mut builder = reqwest::Client::builder().default_headers(default_headers);
        if let Some(timeout) = settings.timeout() {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(Self { client })
    }

    /// Wraps an existing reqwest client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let HttpRequest {
            method,
            url,
            mut headers,
            body,
        } = request;

        let builder = match method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };

        let builder = match body {
            Some(json) => builder.headers(headers).json(&json),
            None if method == Method::Post => {
                headers.insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
                builder.headers(headers)
            }
            None => builder.headers(headers),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Test helpers shared by the provider modules.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use reqwest::header::DATE;

    pub(crate) fn json_response(status: u16, body: serde_json::Value) -> HttpResponse {
        HttpResponse {
            status,
            headers: HeaderMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    pub(crate) fn empty_response(status: u16) -> HttpResponse {
        HttpResponse {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub(crate) fn dated_response(status: u16, date: &'static str) -> HttpResponse {
        let mut headers = HeaderMap::new();
        headers.insert(DATE, HeaderValue::from_static(date));
        HttpResponse {
            status,
            headers,
            body: Bytes::from_static(b"{}"),
        }
    }

    pub(crate) fn bearer(request: &HttpRequest) -> Option<&str> {
        request
            .headers
            .get(reqwest::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
    }
}
