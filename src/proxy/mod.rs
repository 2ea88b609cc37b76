//! Forwarding of browser requests to the recommendation backend.
//!
//! Requests keep their method, JSON body and `Cookie` header; responses come
//! back with the backend's status, JSON body and every `Set-Cookie` header.
//! Nothing is retried.

mod sanitize;

pub use sanitize::scrub_non_finite;

use axum::{
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use crate::errors::{AppError, GENERIC_UPSTREAM_MESSAGE};

/// How a backend status is turned into the proxy's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayPolicy {
    /// Status and body are relayed unchanged, errors included.
    Verbatim,
    /// Any non-2xx status becomes a generic 500.
    RequireSuccess,
}

/// A request to be replayed against the backend.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    cookie: Option<HeaderValue>,
    body: Option<Value>,
    scrub_non_finite: bool,
}

impl ForwardRequest {
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            query: Vec::new(),
            cookie: None,
            body: None,
            scrub_non_finite: false,
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    /// Carry over the inbound `Cookie` header, if any.
    pub fn cookies_from(mut self, headers: &HeaderMap) -> Self {
        self.cookie = headers.get(header::COOKIE).cloned();
        self
    }

    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Rewrite bare `NaN`/`Infinity` tokens in the response to `null`.
    pub fn scrub_non_finite(mut self) -> Self {
        self.scrub_non_finite = true;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// The backend's answer, ready to be relayed.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Value,
    pub set_cookies: Vec<HeaderValue>,
}

impl UpstreamResponse {
    /// Apply a relay policy, failing with a generic upstream error where required.
    pub fn apply(self, policy: RelayPolicy) -> Result<Self, AppError> {
        match policy {
            RelayPolicy::Verbatim => Ok(self),
            RelayPolicy::RequireSuccess if self.status.is_success() => Ok(self),
            RelayPolicy::RequireSuccess => {
                tracing::error!("Backend responded with status: {}", self.status);
                Err(AppError::Upstream(GENERIC_UPSTREAM_MESSAGE.to_string()))
            }
        }
    }
}

impl IntoResponse for UpstreamResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        let headers = response.headers_mut();
        for cookie in self.set_cookies {
            headers.append(header::SET_COOKIE, cookie);
        }
        response
    }
}

/// HTTP forwarder bound to one backend origin.
#[derive(Debug, Clone)]
pub struct Upstream {
    client: reqwest::Client,
    base_url: String,
}

impl Upstream {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Send the request once and parse the backend's JSON answer.
    pub async fn send(&self, request: ForwardRequest) -> Result<UpstreamResponse, AppError> {
        let url = format!("{}{}", self.base_url, request.path);
        tracing::debug!("Forwarding {} {}", request.method, url);

        let mut builder = self
            .client
            .request(request.method, &url)
            .header(header::CONTENT_TYPE, "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(cookie) = request.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let set_cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .cloned()
            .collect();

        let text = response.text().await?;
        let body = if request.scrub_non_finite {
            serde_json::from_str(&scrub_non_finite(&text))?
        } else {
            serde_json::from_str(&text)?
        };

        Ok(UpstreamResponse {
            status,
            body,
            set_cookies,
        })
    }
}
