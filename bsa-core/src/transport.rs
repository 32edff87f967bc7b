//! HTTP transport with a uniform response envelope
//!
//! Every call resolves to an [`ApiResponse`]; network failures and error
//! statuses are folded into `ok = false` plus a [`Problem`] code instead of
//! surfacing as Rust errors. The original request travels with the response
//! so interceptors can replay it.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::models::ListQuery;

/// HTTP verbs used by the admin API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(m: Method) -> Self {
        match m {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A request relative to the configured base URL
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Relative path, e.g. `v1/product/p1`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn query(mut self, query: &ListQuery) -> Self {
        self.query = query.pairs().to_vec();
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Set a header, replacing any previous value (names compare case-insensitively)
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(existing) = self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            existing.1 = value;
        } else {
            self.headers.push((name, value));
        }
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn bearer_token(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {}", token))
    }
}

/// Transport-level failure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Problem {
    None,
    ClientError,
    ServerError,
    TimeoutError,
    ConnectionError,
    NetworkError,
    UnknownError,
}

impl Problem {
    /// Classify an HTTP status
    pub fn from_status(status: u16) -> Self {
        match status {
            200..=299 => Problem::None,
            400..=499 => Problem::ClientError,
            500..=599 => Problem::ServerError,
            _ => Problem::UnknownError,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Problem::None => "NONE",
            Problem::ClientError => "CLIENT_ERROR",
            Problem::ServerError => "SERVER_ERROR",
            Problem::TimeoutError => "TIMEOUT_ERROR",
            Problem::ConnectionError => "CONNECTION_ERROR",
            Problem::NetworkError => "NETWORK_ERROR",
            Problem::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response envelope shared by every call
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub ok: bool,
    /// HTTP status, absent when no response arrived
    pub status: Option<u16>,
    pub data: Option<Value>,
    pub problem: Problem,
    /// The request that produced this response
    pub request: ApiRequest,
}

impl ApiResponse {
    /// Response for a received HTTP status
    pub fn from_status(request: ApiRequest, status: u16, data: Option<Value>) -> Self {
        let problem = Problem::from_status(status);
        Self {
            ok: problem == Problem::None,
            status: Some(status),
            data,
            problem,
            request,
        }
    }

    /// Response for a request that never got an answer
    pub fn failed(request: ApiRequest, problem: Problem) -> Self {
        Self {
            ok: false,
            status: None,
            data: None,
            problem,
            request,
        }
    }

    /// Structured server error code (`{"error": "..."}`)
    pub fn error_code(&self) -> Option<&str> {
        self.data.as_ref()?.get("error")?.as_str()
    }

    /// Field-level violations (`{"objects": [...]}`)
    pub fn error_objects(&self) -> Option<Vec<String>> {
        let objects = self.data.as_ref()?.get("objects")?.as_array()?;
        Some(
            objects
                .iter()
                .filter_map(|o| o.as_str().map(String::from))
                .collect(),
        )
    }
}

/// Black-box request transport
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute a request. Never fails: problems are reported in the envelope.
    async fn execute(&self, request: ApiRequest) -> ApiResponse;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport. `timeout` of `None` keeps the reqwest default.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: normalize_base_url(base_url),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> ApiResponse {
        let url = self.url_for(&request.path);
        let mut builder = self.client.request(request.method.into(), &url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let resp = match builder.send().await {
            Ok(resp) => resp,
            Err(e) => {
                let problem = classify_error(&e);
                debug!(method = %request.method, path = %request.path, %problem, "Request failed");
                return ApiResponse::failed(request, problem);
            }
        };

        let status = resp.status().as_u16();
        let data = match resp.bytes().await {
            Ok(bytes) if !bytes.is_empty() => serde_json::from_slice(&bytes).ok(),
            Ok(_) => None,
            Err(e) => {
                let problem = classify_error(&e);
                debug!(method = %request.method, path = %request.path, %problem, "Reading body failed");
                return ApiResponse::failed(request, problem);
            }
        };

        debug!(method = %request.method, path = %request.path, status, "Request completed");
        ApiResponse::from_status(request, status, data)
    }
}

fn classify_error(e: &reqwest::Error) -> Problem {
    if e.is_timeout() {
        Problem::TimeoutError
    } else if e.is_connect() {
        Problem::ConnectionError
    } else if e.is_request() || e.is_body() || e.is_decode() {
        Problem::NetworkError
    } else {
        Problem::UnknownError
    }
}

fn normalize_base_url(base_url: &str) -> String {
    format!("{}/", base_url.trim_end_matches('/'))
}
