use std::fmt;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde_json::Value;

use crate::error::{AppError, Result};

pub mod auth;
pub mod http;
#[cfg(test)]
pub(crate) mod scripted;

pub use auth::{request_extraction_session, request_stream_session, Credentials};
pub use http::HttpTransport;

/// Executes one request against a remote service.
///
/// Implementations must report network-level trouble as [`AppError::Transport`] and leave
/// interpretation of the answer to the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ServiceRequest) -> Result<ServiceResponse>;
}

/// Base URI plus the token obtained from the authentication collaborator.
///
/// Shared read-only between jobs; nothing in the crate mutates or refreshes it.
#[derive(Clone)]
pub struct Session {
    base_uri: String,
    token: String,
    expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Session {
    pub fn new(base_uri: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            token: token.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: chrono::DateTime<chrono::Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.expires_at
    }

    /// Join a service path onto the base URI.
    pub fn endpoint(&self, path: &str) -> String {
        join_url(&self.base_uri, path)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_uri", &self.base_uri)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[derive(Debug, Clone)]
pub struct ServiceRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ServiceRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url, None)
    }

    pub fn post_json(url: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, url, Some(body))
    }

    fn new(method: Method, url: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            query: Vec::new(),
            body,
        }
    }

    pub fn header(mut self, name: HeaderName, value: &str) -> Result<Self> {
        let value = HeaderValue::from_str(value).map_err(|_| {
            AppError::InvalidState(format!("header `{name}` has a value that cannot be sent"))
        })?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }
}

/// Headers of a service answer plus a body that is only read on demand.
pub struct ServiceResponse {
    pub http_status: StatusCode,
    pub headers: HeaderMap,
    body: ResponseBody,
}

enum ResponseBody {
    Live(reqwest::Response),
    Buffered(Vec<u8>),
}

impl ServiceResponse {
    pub(crate) fn live(response: reqwest::Response) -> Self {
        Self {
            http_status: response.status(),
            headers: response.headers().clone(),
            body: ResponseBody::Live(response),
        }
    }

    /// Build a response whose body is already in memory.
    pub fn buffered(http_status: StatusCode, headers: HeaderMap, body: impl Into<Vec<u8>>) -> Self {
        Self {
            http_status,
            headers,
            body: ResponseBody::Buffered(body.into()),
        }
    }

    /// Header value as text; an absent header reads as `None`.
    pub fn header_str(&self, name: &str) -> Result<Option<&str>> {
        match self.headers.get(name) {
            Some(value) => value
                .to_str()
                .map(Some)
                .map_err(|_| AppError::malformed(format!("header `{name}` is not valid text"))),
            None => Ok(None),
        }
    }

    pub async fn bytes(self) -> Result<Vec<u8>> {
        match self.body {
            ResponseBody::Live(response) => Ok(response.bytes().await?.to_vec()),
            ResponseBody::Buffered(bytes) => Ok(bytes),
        }
    }

    pub async fn text(self) -> Result<String> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl fmt::Debug for ServiceResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceResponse")
            .field("http_status", &self.http_status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_paths_without_doubling_slashes() {
        let session = Session::new("https://dss.example.com/", "t0k3n");
        assert_eq!(
            session.endpoint("/RestApi/v1/Extractions/ExtractWithNotes"),
            "https://dss.example.com/RestApi/v1/Extractions/ExtractWithNotes"
        );
    }

    #[test]
    fn session_debug_hides_token() {
        let session = Session::new("https://dss.example.com", "very-secret");
        assert!(!format!("{session:?}").contains("very-secret"));
    }

    #[test]
    fn rejects_unsendable_header_values() {
        let err = ServiceRequest::get("https://dss.example.com")
            .header(reqwest::header::AUTHORIZATION, "Token bad\nvalue")
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn buffered_body_reads_back() {
        let response = ServiceResponse::buffered(StatusCode::OK, HeaderMap::new(), "payload");
        assert_eq!(response.header_str("Status").unwrap(), None);
        assert_eq!(response.text().await.unwrap(), "payload");
    }
}
