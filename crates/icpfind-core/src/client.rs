//! Search backend client and wire types.
//!
//! The retrieval engine talks to the backend only through [`SearchBackend`],
//! so tests can drive it with scripted responses. [`QuakeClient`] is the
//! production implementation over `reqwest`.

use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Path of the service search endpoint, relative to the base URL.
pub const SEARCH_PATH: &str = "/api/v3/search/quake_service";
/// Header carrying the API token.
pub const TOKEN_HEADER: &str = "X-QuakeToken";

/// Longest body excerpt quoted in protocol errors.
const BODY_EXCERPT_CHARS: usize = 200;

/// One page request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchRequest {
    /// Query string in the backend's search syntax.
    pub query: String,
    /// Offset of the first result. Always 0: exclusions drive paging.
    pub start: u32,
    /// Page size.
    pub size: u32,
    /// Ask the backend to bypass its result cache.
    pub ignore_cache: bool,
    /// Restrict to the latest scan only.
    pub latest: bool,
}

impl SearchRequest {
    /// First-page request for `query` with `size` results.
    pub fn first_page(query: impl Into<String>, size: u32) -> Self {
        Self {
            query: query.into(),
            start: 0,
            size,
            ignore_cache: true,
            latest: false,
        }
    }
}

/// API status code. The backend uses integers for success and prefixed
/// strings (`u3007`, `q3005`, ...) for most failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiCode {
    /// Numeric code; `0` is success.
    Int(i64),
    /// String code such as `u3007`.
    Text(String),
}

impl Default for ApiCode {
    fn default() -> Self {
        Self::Int(-1)
    }
}

impl fmt::Display for ApiCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// How a response's status code must be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiStatus {
    /// Results are usable.
    Success,
    /// Account has no credits left; do not retry.
    QuotaExhausted,
    /// Too many requests; back off and repeat the same page.
    RateLimited,
    /// Query syntax error or backend internal failure.
    QueryRejected,
    /// Anything else.
    Other,
}

impl ApiCode {
    /// Classify this code.
    pub fn status(&self) -> ApiStatus {
        let text = match self {
            Self::Int(0) => return ApiStatus::Success,
            Self::Int(_) => return ApiStatus::Other,
            Self::Text(s) => s.trim(),
        };
        match text {
            "0" => ApiStatus::Success,
            "u3007" => ApiStatus::QuotaExhausted,
            "q3005" | "u3005" => ApiStatus::RateLimited,
            t if t.starts_with("u3015") || t.starts_with('q') => ApiStatus::QueryRejected,
            _ => ApiStatus::Other,
        }
    }
}

/// Response envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    /// Status code; missing codes count as failure.
    #[serde(default)]
    pub code: ApiCode,
    /// Human-readable status message.
    #[serde(default)]
    pub message: Option<String>,
    /// Result items; a list on success.
    #[serde(default)]
    pub data: Value,
    /// Pagination metadata.
    #[serde(default)]
    pub meta: Option<Meta>,
}

/// Response metadata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Meta {
    /// Pagination block.
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// Pagination block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pagination {
    /// Total matches for the query, across all pages.
    #[serde(default)]
    pub total: Option<u64>,
}

impl SearchResponse {
    /// Total matches reported by the backend, 0 when absent.
    pub fn total(&self) -> u64 {
        self.meta
            .as_ref()
            .and_then(|m| m.pagination.as_ref())
            .and_then(|p| p.total)
            .unwrap_or(0)
    }

    /// Status message, or a placeholder.
    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or("no message")
    }

    /// Result items of a successful response.
    ///
    /// `null` or a missing field is an empty page; any other non-list value
    /// is a protocol error.
    pub fn items(&self) -> Result<&[Value]> {
        match &self.data {
            Value::Array(items) => Ok(items),
            Value::Null => Ok(&[]),
            other => Err(Error::Protocol(format!(
                "expected 'data' to be a list, got {}",
                json_kind(other)
            ))),
        }
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// A search backend the retrieval engine can page through.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Issue one page request and return the decoded envelope.
    ///
    /// Implementations map transport failures to [`Error::Network`] or
    /// [`Error::Timeout`] and undecodable bodies to [`Error::Protocol`]. API
    /// status codes are returned as data, not errors.
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse>;
}

/// HTTP client for the Quake search API.
pub struct QuakeClient {
    client: Client,
    endpoint: String,
    token: String,
    timeout: Duration,
}

impl QuakeClient {
    /// Create a client for `base_url` authenticating with `token`.
    pub fn new(base_url: &str, token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(Error::Config("API token is empty".into()));
        }
        HeaderValue::from_str(&token)
            .map_err(|_| Error::Config("API token contains invalid header characters".into()))?;

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("icpfind/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .build()
            .map_err(Error::Network)?;

        Ok(Self {
            client,
            endpoint: format!("{}{SEARCH_PATH}", base_url.trim_end_matches('/')),
            token,
            timeout,
        })
    }

    /// Full search endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout(format!(
                "no response from {} within {}s",
                self.endpoint,
                self.timeout.as_secs_f64()
            ))
        } else {
            Error::Network(err)
        }
    }
}

#[async_trait]
impl SearchBackend for QuakeClient {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        debug!(size = request.size, "POST {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .header(TOKEN_HEADER, &self.token)
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let status_error = response.error_for_status_ref().err();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        match serde_json::from_str::<SearchResponse>(&body) {
            // An error status with a success envelope is not trustworthy.
            Ok(envelope) if envelope.code.status() == ApiStatus::Success => match status_error {
                Some(err) => Err(Error::Network(err)),
                None => Ok(envelope),
            },
            Ok(envelope) => Ok(envelope),
            Err(_) if status_error.is_some() => {
                Err(status_error.map_or_else(|| Error::Protocol(body.clone()), Error::Network))
            },
            Err(e) => {
                let excerpt: String = body.chars().take(BODY_EXCERPT_CHARS).collect();
                Err(Error::Protocol(format!(
                    "invalid JSON response (HTTP {status}): {e}; body starts with: {excerpt}"
                )))
            },
        }
    }
}
