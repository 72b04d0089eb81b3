//! Content source resolver
//!
//! Turns a path into a [`ResolvedTrack`]:
//!
//! 1. cache lookup on the normalized path;
//! 2. route matching (falling back to `__default__`);
//! 3. source resolution (static node, callback or transport request);
//! 4. post-processing: every playable-only child receives a contextual URL
//!    built from the resolving path, then children are indexed by URL.
//!
//! Concurrent resolutions of the same uncached path share one fetch. A path
//! invalidated while its fetch is in flight starts a new fetch for later
//! callers; the superseded fetch is neither joined nor written to the cache.
//! Search results skip step 4's rewriting: they may come from several
//! parents, so no single parent path can serve as their context.

use crate::cache::BrowserCache;
use crate::config::{BrowserConfig, RouteTable, TABS_ROUTE};
use crate::contextual_url;
use crate::error::{BrowserError, Result};
use crate::models::{ResolvedTrack, Track};
use crate::router::{self, RouteMatch};
use crate::source::{BrowserSource, CallbackResponse, RouteRequest};
use crate::transport::{RequestConfig, Transport};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

type SharedResolution = Shared<BoxFuture<'static, Result<ResolvedTrack>>>;

/// A fetch in progress, tagged so that a stale one can be recognized
struct InFlight {
    id: u64,
    resolution: SharedResolution,
}

/// Path resolution pipeline shared by navigation, search and queue expansion
pub struct ContentResolver {
    routes: RouteTable,
    base_request: RequestConfig,
    transport: Option<Arc<dyn Transport>>,
    cache: BrowserCache,
    in_flight: Mutex<HashMap<String, InFlight>>,
    next_fetch_id: AtomicU64,
}

impl ContentResolver {
    pub fn new(config: &BrowserConfig, cache: BrowserCache) -> Self {
        Self {
            routes: config.routes.clone(),
            base_request: config.request.clone(),
            transport: config.transport.clone(),
            cache,
            in_flight: Mutex::new(HashMap::new()),
            next_fetch_id: AtomicU64::new(0),
        }
    }

    pub fn cache(&self) -> &BrowserCache {
        &self.cache
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Resolves `path`, cache first
    ///
    /// The contextual suffix of `path` is ignored. Synthetic search paths are
    /// resolved through the `__search__` source only.
    pub async fn resolve_path(self: &Arc<Self>, path: &str) -> Result<ResolvedTrack> {
        let key = BrowserCache::key_for(path);

        if let Some(node) = self.cache.resolved(&key) {
            debug!(path = %key, "Content found in cache");
            return Ok(node);
        }

        let resolution = {
            let mut in_flight = self.in_flight();
            match in_flight.get(&key) {
                Some(pending) => {
                    debug!(path = %key, "Joining in-flight resolution");
                    pending.resolution.clone()
                }
                None => {
                    let id = self.next_fetch_id.fetch_add(1, Ordering::Relaxed);
                    let resolution = Arc::clone(self)
                        .fetch_and_store(key.clone(), id)
                        .boxed()
                        .shared();
                    in_flight.insert(
                        key.clone(),
                        InFlight {
                            id,
                            resolution: resolution.clone(),
                        },
                    );
                    resolution
                }
            }
        };

        resolution.await
    }

    /// Resolves the `__search__` source for `query`
    ///
    /// The result is cached under the synthetic search path so that later
    /// lookups for that path are answered without querying again.
    pub async fn resolve_search(self: &Arc<Self>, query: &str) -> Result<ResolvedTrack> {
        self.resolve_path(&router::search_path(query)).await
    }

    /// Resolves the `__tabs__` source, cached under its route key
    ///
    /// Playable-only tabs get a contextual URL with `__tabs__` as parent.
    pub async fn resolve_tabs(self: &Arc<Self>) -> Result<Vec<Track>> {
        let node = self.resolve_path(TABS_ROUTE).await?;
        Ok(node.children.unwrap_or_default())
    }

    /// Forgets the cached content of `path`
    ///
    /// A fetch of `path` still in flight is detached: callers arriving
    /// afterwards start a new one and its result is not cached.
    pub fn invalidate_path(&self, path: &str) {
        let key = BrowserCache::key_for(path);
        let mut in_flight = self.in_flight();
        if in_flight.remove(&key).is_some() {
            debug!(path = %key, "Detaching in-flight resolution");
        }
        self.cache.invalidate_path(&key);
    }

    /// Resolves a source into a node, without any post-processing
    pub async fn resolve_source(
        &self,
        source: &BrowserSource,
        request: &RouteRequest,
    ) -> Result<ResolvedTrack> {
        match source {
            BrowserSource::Static(node) => Ok(node.clone()),
            BrowserSource::Callback(callback) => match callback.resolve(request.clone()).await {
                Ok(CallbackResponse::Content(node)) => Ok(node),
                Ok(CallbackResponse::Error(message)) => Err(BrowserError::Callback(message)),
                Err(e) => Err(BrowserError::Unknown(e.to_string())),
            },
            BrowserSource::Request(config) => self.execute_request(config, request).await,
        }
    }

    async fn fetch_and_store(self: Arc<Self>, key: String, id: u64) -> Result<ResolvedTrack> {
        let result = self.fetch(&key).await;

        let mut in_flight = self.in_flight();
        if in_flight.get(&key).is_some_and(|pending| pending.id == id) {
            in_flight.remove(&key);
            if let Ok(node) = &result {
                self.cache.store_resolved(&key, node.clone());
            }
        } else {
            debug!(path = %key, "Resolution invalidated while in flight, not cached");
        }

        result
    }

    async fn fetch(&self, key: &str) -> Result<ResolvedTrack> {
        if router::is_search_path(key) {
            return self.fetch_search(key).await;
        }

        let (found, source) = if key == TABS_ROUTE {
            let source = self
                .routes
                .tabs()
                .ok_or_else(|| BrowserError::ContentNotFound(key.to_string()))?;
            (None, source)
        } else {
            self.routes
                .lookup(key)
                .ok_or_else(|| BrowserError::ContentNotFound(key.to_string()))?
        };

        let request = route_request(key, found);
        debug!(path = %key, kind = source.kind(), "Resolving content");

        let node = self.resolve_source(source, &request).await?;
        let node = self.attach_context(key, node);
        self.cache.index_tracks(node.children());
        Ok(node)
    }

    async fn fetch_search(&self, key: &str) -> Result<ResolvedTrack> {
        let source = self
            .routes
            .search()
            .ok_or_else(|| BrowserError::ContentNotFound(key.to_string()))?;

        let query = router::search_query(key).unwrap_or_default();
        let mut request = route_request(key, None);
        request.params.insert("q".to_string(), query.clone());
        debug!(query = %query, "Resolving search");

        let mut node = self.resolve_source(source, &request).await?;
        node.url = key.to_string();
        let children = take_valid_children(&mut node);
        self.cache.index_tracks(&children);
        node.children = Some(children);
        Ok(node)
    }

    async fn execute_request(
        &self,
        config: &RequestConfig,
        request: &RouteRequest,
    ) -> Result<ResolvedTrack> {
        let transport = self.transport.as_ref().ok_or_else(|| {
            BrowserError::Configuration("request source without transport".to_string())
        })?;

        let merged = self.base_request.merge(config);
        let transport_request =
            merged.to_transport_request(&request.path, &request.params, &request.query)?;

        let response = transport
            .execute(transport_request)
            .await
            .map_err(|e| BrowserError::Network(e.to_string()))?;

        if !response.is_success() {
            warn!(path = %request.path, status = response.status, "Request failed");
            return Err(BrowserError::from_status_code(response.status));
        }

        serde_json::from_slice::<ResolvedTrack>(&response.body)
            .map_err(|e| BrowserError::InvalidContent(e.to_string()))
    }

    /// Sets the node identity and gives every playable-only child a
    /// contextual URL; invalid children are dropped.
    fn attach_context(&self, key: &str, mut node: ResolvedTrack) -> ResolvedTrack {
        node.url = key.to_string();

        if node.children.is_none() {
            return node;
        }

        let children = take_valid_children(&mut node)
            .into_iter()
            .map(|mut child| {
                if child.url.is_none() {
                    if let Some(src) = child.src.as_deref() {
                        child.url = Some(contextual_url::build(key, src));
                    }
                }
                child
            })
            .collect();

        node.children = Some(children);
        node
    }

    fn in_flight(&self) -> MutexGuard<'_, HashMap<String, InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn route_request(path: &str, found: Option<RouteMatch>) -> RouteRequest {
    RouteRequest {
        path: path.to_string(),
        params: found.map(|m| m.params).unwrap_or_default(),
        query: router::query_params(path),
    }
}

fn take_valid_children(node: &mut ResolvedTrack) -> Vec<Track> {
    let children = node.children.take().unwrap_or_default();
    children
        .into_iter()
        .filter(|child| {
            let valid = child.is_valid();
            if !valid {
                warn!(path = %node.url, title = %child.title, "Dropping child without url or src");
            }
            valid
        })
        .collect()
}
