//! Transport collaborator and request descriptors
//!
//! The resolver never talks HTTP directly: request sources are turned into a
//! [`TransportRequest`] and handed to a host-provided [`Transport`].
//! [`HttpTransport`] is the default `reqwest` implementation.

use crate::error::{BrowserError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default timeout of [`HttpTransport`]
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// Declarative request configuration
///
/// A base configuration is merged with the per-route one: scalar fields set
/// by the route win, header and query maps are merged key by key.
/// `path` may contain `{name}` placeholders replaced by route parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl RequestConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Overlays `other` on top of `self`
    pub fn merge(&self, other: &RequestConfig) -> RequestConfig {
        let mut headers = self.headers.clone();
        headers.extend(other.headers.clone());
        let mut query = self.query.clone();
        query.extend(other.query.clone());

        RequestConfig {
            method: other.method.or(self.method),
            base_url: other.base_url.clone().or_else(|| self.base_url.clone()),
            path: other.path.clone().or_else(|| self.path.clone()),
            headers,
            query,
            body: other.body.clone().or_else(|| self.body.clone()),
        }
    }

    /// Builds the concrete request for a navigated path
    ///
    /// Without an explicit `path`, the navigated path (query string removed)
    /// is used. Query parameters of the navigated path are forwarded, the
    /// configured ones taking precedence.
    ///
    /// Fails when `base_url` is not an absolute URL.
    pub fn to_transport_request(
        &self,
        navigated_path: &str,
        params: &HashMap<String, String>,
        path_query: &HashMap<String, String>,
    ) -> Result<TransportRequest> {
        let path = match &self.path {
            Some(template) => substitute_params(template, params),
            None => crate::router::path_only(navigated_path).to_string(),
        };

        let url = match &self.base_url {
            Some(base) => join_url(base, &path)
                .map_err(|e| {
                    BrowserError::Configuration(format!("invalid base URL '{}': {}", base, e))
                })?
                .into(),
            None => path,
        };

        let mut query: BTreeMap<String, String> = path_query
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        query.extend(self.query.clone());

        Ok(TransportRequest {
            method: self.method.unwrap_or_default(),
            url,
            headers: self.headers.clone(),
            query,
            body: self.body.clone(),
        })
    }
}

/// A concrete request handed to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub body: Option<String>,
}

/// Raw response of the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Host-provided transport
///
/// An `Err` means no response was obtained (connection refused, timeout...).
/// Non-2xx responses are returned as `Ok` and classified by the resolver.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: TransportRequest) -> anyhow::Result<TransportResponse>;
}

/// `reqwest`-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pmobrowser/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: TransportRequest) -> anyhow::Result<TransportResponse> {
        debug!(method = request.method.as_str(), url = %request.url, "Executing request");

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
            HttpMethod::Put => self.client.put(&request.url),
            HttpMethod::Patch => self.client.patch(&request.url),
            HttpMethod::Delete => self.client.delete(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        debug!(status, bytes = body.len(), "Response received");
        Ok(TransportResponse { status, body })
    }
}

fn substitute_params(template: &str, params: &HashMap<String, String>) -> String {
    let mut result = template.to_string();
    for (name, value) in params {
        result = result.replace(
            &format!("{{{}}}", name),
            &urlencoding::encode(value),
        );
    }
    result
}

/// Resolves `path` below `base`, keeping any path prefix of `base`
///
/// An absolute `path` replaces `base` entirely.
pub(crate) fn join_url(base: &str, path: &str) -> std::result::Result<Url, url::ParseError> {
    let base = Url::parse(&format!("{}/", base.trim_end_matches('/')))?;
    base.join(path.trim_start_matches('/'))
}
