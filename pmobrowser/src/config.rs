//! Browser configuration
//!
//! [`BrowserConfig`] gathers everything the navigation core needs: the route
//! table, the collaborators supplied by the host and the tunables coming from
//! `pmoconfig` (see [`BrowserConfigExt`](crate::config_ext::BrowserConfigExt)).
//!
//! # Example
//!
//! ```
//! use pmobrowser::{BrowserConfig, ResolvedTrack, Track};
//!
//! let config = BrowserConfig::builder()
//!     .route(
//!         "/",
//!         ResolvedTrack::new("/", "Home")
//!             .with_children(vec![Track::browsable("Artists", "/artists")]),
//!     )
//!     .route("/artists", ResolvedTrack::new("/artists", "Artists"))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.routes.len(), 2);
//! ```

use crate::artwork::{ArtworkConfig, ArtworkTransformer};
use crate::cache::CacheSettings;
use crate::error::{BrowserError, Result};
use crate::favorites::FavoriteStore;
use crate::router::{RouteMatch, RoutePattern, find_best_match};
use crate::source::BrowserSource;
use crate::transport::{RequestConfig, Transport};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Route key holding the tabs source
pub const TABS_ROUTE: &str = "__tabs__";
/// Route key holding the search source
pub const SEARCH_ROUTE: &str = "__search__";
/// Route key holding the fallback source
pub const DEFAULT_ROUTE: &str = "__default__";

/// Compiled route table
///
/// The special keys are kept apart and never take part in matching.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<(RoutePattern, BrowserSource)>,
    tabs: Option<BrowserSource>,
    search: Option<BrowserSource>,
    fallback: Option<BrowserSource>,
}

impl RouteTable {
    /// Builds a table from `(key, source)` entries
    ///
    /// Two patterns matching exactly the same paths (same shape, whatever the
    /// parameter names) are rejected: their precedence would be undefined.
    pub fn from_entries<I, K>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, BrowserSource)>,
        K: AsRef<str>,
    {
        let mut table = RouteTable::default();
        let mut shapes: HashMap<String, String> = HashMap::new();

        for (key, source) in entries {
            let key = key.as_ref();
            match key {
                TABS_ROUTE => table.tabs = Some(source),
                SEARCH_ROUTE => table.search = Some(source),
                DEFAULT_ROUTE => table.fallback = Some(source),
                pattern => {
                    let compiled = RoutePattern::parse(pattern)?;
                    if let Some(existing) = shapes.insert(compiled.shape(), pattern.to_string()) {
                        return Err(BrowserError::Configuration(format!(
                            "duplicate route pattern '{}' (conflicts with '{}')",
                            pattern, existing
                        )));
                    }
                    debug!(pattern, kind = source.kind(), "Route registered");
                    table.routes.push((compiled, source));
                }
            }
        }

        Ok(table)
    }

    /// Finds the source for `path`, with the matched pattern and parameters
    ///
    /// Falls back to the `__default__` source with no parameters.
    pub fn lookup(&self, path: &str) -> Option<(Option<RouteMatch>, &BrowserSource)> {
        let best = find_best_match(path, self.routes.iter().map(|(pattern, _)| pattern));

        match best {
            Some(found) => self
                .routes
                .iter()
                .find(|(pattern, _)| pattern.as_str() == found.pattern)
                .map(|(_, source)| (Some(found), source)),
            None => self.fallback.as_ref().map(|source| (None, source)),
        }
    }

    pub fn tabs(&self) -> Option<&BrowserSource> {
        self.tabs.as_ref()
    }

    pub fn search(&self) -> Option<&BrowserSource> {
        self.search.as_ref()
    }

    pub fn fallback(&self) -> Option<&BrowserSource> {
        self.fallback.as_ref()
    }

    /// Number of matchable routes
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Artwork transformer and its settings
#[derive(Clone)]
pub struct ArtworkSettings {
    pub transformer: Arc<dyn ArtworkTransformer>,
    pub config: ArtworkConfig,
}

/// Complete configuration of a browser
#[derive(Clone)]
pub struct BrowserConfig {
    pub routes: RouteTable,
    /// Base request merged under every request source
    pub request: RequestConfig,
    pub transport: Option<Arc<dyn Transport>>,
    pub favorites: Option<Arc<dyn FavoriteStore>>,
    pub artwork: Option<ArtworkSettings>,
    /// Queue only the selected track instead of its playable siblings
    pub single_track: bool,
    pub cache: CacheSettings,
    /// Path navigated by `NavigationController::start`
    pub initial_path: String,
}

impl BrowserConfig {
    pub fn builder() -> BrowserConfigBuilder {
        BrowserConfigBuilder::default()
    }
}

/// Builder for [`BrowserConfig`]
pub struct BrowserConfigBuilder {
    entries: Vec<(String, BrowserSource)>,
    request: RequestConfig,
    transport: Option<Arc<dyn Transport>>,
    favorites: Option<Arc<dyn FavoriteStore>>,
    artwork: Option<ArtworkSettings>,
    single_track: bool,
    cache: CacheSettings,
    initial_path: String,
}

impl Default for BrowserConfigBuilder {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            request: RequestConfig::default(),
            transport: None,
            favorites: None,
            artwork: None,
            single_track: false,
            cache: CacheSettings::default(),
            initial_path: "/".to_string(),
        }
    }
}

impl BrowserConfigBuilder {
    /// Adds a route; `__tabs__`, `__search__` and `__default__` are accepted
    pub fn route(mut self, key: impl Into<String>, source: impl Into<BrowserSource>) -> Self {
        self.entries.push((key.into(), source.into()));
        self
    }

    pub fn tabs(self, source: impl Into<BrowserSource>) -> Self {
        self.route(TABS_ROUTE, source)
    }

    pub fn search(self, source: impl Into<BrowserSource>) -> Self {
        self.route(SEARCH_ROUTE, source)
    }

    pub fn default_source(self, source: impl Into<BrowserSource>) -> Self {
        self.route(DEFAULT_ROUTE, source)
    }

    pub fn request(mut self, request: RequestConfig) -> Self {
        self.request = request;
        self
    }

    /// Sets the base URL of the base request, keeping its other fields
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.request.base_url = Some(base_url.into());
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn favorites(mut self, store: Arc<dyn FavoriteStore>) -> Self {
        self.favorites = Some(store);
        self
    }

    pub fn artwork(mut self, transformer: Arc<dyn ArtworkTransformer>, config: ArtworkConfig) -> Self {
        self.artwork = Some(ArtworkSettings {
            transformer,
            config,
        });
        self
    }

    pub fn single_track(mut self, single_track: bool) -> Self {
        self.single_track = single_track;
        self
    }

    pub fn cache(mut self, cache: CacheSettings) -> Self {
        self.cache = cache;
        self
    }

    pub fn initial_path(mut self, path: impl Into<String>) -> Self {
        self.initial_path = path.into();
        self
    }

    pub(crate) fn has_transport(&self) -> bool {
        self.transport.is_some()
    }

    /// Validates the route table and builds the configuration
    ///
    /// A request source without a transport is a configuration error.
    pub fn build(self) -> Result<BrowserConfig> {
        let uses_requests = self
            .entries
            .iter()
            .any(|(_, source)| matches!(source, BrowserSource::Request(_)));
        if uses_requests && self.transport.is_none() {
            return Err(BrowserError::Configuration(
                "request sources need a transport".to_string(),
            ));
        }

        let routes = RouteTable::from_entries(self.entries)?;

        Ok(BrowserConfig {
            routes,
            request: self.request,
            transport: self.transport,
            favorites: self.favorites,
            artwork: self.artwork,
            single_track: self.single_track,
            cache: self.cache,
            initial_path: self.initial_path,
        })
    }
}
