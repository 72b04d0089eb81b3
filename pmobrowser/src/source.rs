//! Content sources attached to routes
//!
//! A route resolves to a [`BrowserSource`]: a precomputed node, a host
//! callback, or a request descriptor executed through the [`Transport`].
//!
//! [`Transport`]: crate::transport::Transport

use crate::models::ResolvedTrack;
use crate::transport::RequestConfig;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Context handed to a source when a path is resolved
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteRequest {
    /// Normalized path being resolved (query string included)
    pub path: String,
    /// Parameters bound by the route pattern
    pub params: HashMap<String, String>,
    /// Decoded query parameters of the path
    pub query: HashMap<String, String>,
}

impl RouteRequest {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// What a host callback hands back
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackResponse {
    /// The resolved content node
    Content(ResolvedTrack),
    /// A failure the host wants displayed to the user
    Error(String),
}

impl From<ResolvedTrack> for CallbackResponse {
    fn from(node: ResolvedTrack) -> Self {
        CallbackResponse::Content(node)
    }
}

/// Host-supplied asynchronous resolver for a route
///
/// Returning `Ok(CallbackResponse::Error(..))` surfaces as a callback error
/// carrying the message; returning `Err(..)` surfaces as an unknown error.
///
/// Any `Fn(RouteRequest) -> impl Future<Output = anyhow::Result<CallbackResponse>>`
/// closure implements this trait.
#[async_trait]
pub trait BrowserCallback: Send + Sync {
    async fn resolve(&self, request: RouteRequest) -> anyhow::Result<CallbackResponse>;
}

#[async_trait]
impl<F, Fut> BrowserCallback for F
where
    F: Fn(RouteRequest) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<CallbackResponse>> + Send + 'static,
{
    async fn resolve(&self, request: RouteRequest) -> anyhow::Result<CallbackResponse> {
        (self)(request).await
    }
}

/// How the content of a route is produced
#[derive(Clone)]
pub enum BrowserSource {
    /// Precomputed node, returned as-is
    Static(ResolvedTrack),
    /// Asynchronous host callback
    Callback(Arc<dyn BrowserCallback>),
    /// Remote request, merged with the base request configuration
    Request(RequestConfig),
}

impl BrowserSource {
    /// Wraps a closure or any [`BrowserCallback`] implementation
    pub fn callback<C>(callback: C) -> Self
    where
        C: BrowserCallback + 'static,
    {
        BrowserSource::Callback(Arc::new(callback))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BrowserSource::Static(_) => "static",
            BrowserSource::Callback(_) => "callback",
            BrowserSource::Request(_) => "request",
        }
    }
}

impl From<ResolvedTrack> for BrowserSource {
    fn from(node: ResolvedTrack) -> Self {
        BrowserSource::Static(node)
    }
}

impl From<RequestConfig> for BrowserSource {
    fn from(config: RequestConfig) -> Self {
        BrowserSource::Request(config)
    }
}

impl fmt::Debug for BrowserSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserSource::Static(node) => f.debug_tuple("Static").field(&node.url).finish(),
            BrowserSource::Callback(_) => f.write_str("Callback(..)"),
            BrowserSource::Request(config) => f.debug_tuple("Request").field(config).finish(),
        }
    }
}
