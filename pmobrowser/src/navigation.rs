//! Navigation controller
//!
//! Owns the published navigation state (current path, content, tabs, error)
//! and sequences concurrent `navigate()` calls.
//!
//! Every call allocates a sequence number and immediately publishes the new
//! path with cleared content. Once resolution completes, its result is only
//! published if no newer `navigate()` started in the meantime; otherwise it
//! is dropped without mutating state or notifying anyone (last navigate
//! wins). In-flight work is not cancelled, only discarded.

use crate::artwork::{ArtworkTarget, ArtworkTransformer};
use crate::cache::{BrowserCache, CacheStats};
use crate::config::{ArtworkSettings, BrowserConfig};
use crate::error::{BrowserError, NavigationError, Result};
use crate::events::{BrowserEvent, BrowserEventBus};
use crate::favorites::{FavoriteStore, overlay_favorites};
use crate::models::{ResolvedTrack, Track};
use crate::queue::{ExpandedQueue, QueueExpander};
use crate::resolver::ContentResolver;
use crate::router::normalize_path;
use crossbeam_channel::Receiver;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Published navigation state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationState {
    pub path: String,
    pub content: Option<ResolvedTrack>,
    pub tabs: Option<Vec<Track>>,
    pub navigation_error: Option<NavigationError>,
    /// Incremented once per `navigate()` call
    pub navigation_sequence: u64,
}

/// What happened to a `navigate()` call
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationOutcome {
    /// The content was published
    Applied(ResolvedTrack),
    /// A newer navigation started; the result was discarded
    Superseded,
}

impl NavigationOutcome {
    pub fn content(&self) -> Option<&ResolvedTrack> {
        match self {
            NavigationOutcome::Applied(node) => Some(node),
            NavigationOutcome::Superseded => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, NavigationOutcome::Superseded)
    }
}

/// Everything derived from one configuration
struct BrowserContext {
    resolver: Arc<ContentResolver>,
    queue: QueueExpander,
    favorites: Option<Arc<dyn FavoriteStore>>,
    artwork: Option<ArtworkSettings>,
    initial_path: String,
}

impl BrowserContext {
    fn new(config: BrowserConfig) -> Self {
        let cache = BrowserCache::with_settings(config.cache);
        let resolver = Arc::new(ContentResolver::new(&config, cache));
        let queue = QueueExpander::new(Arc::clone(&resolver), config.single_track);

        Self {
            resolver,
            queue,
            favorites: config.favorites,
            artwork: config.artwork,
            initial_path: normalize_path(&config.initial_path),
        }
    }

    fn overlay_favorites(&self, tracks: &mut [Track]) {
        if let Some(store) = &self.favorites {
            overlay_favorites(tracks, store.as_ref());
        }
    }
}

/// Navigation controller
pub struct NavigationController {
    context: RwLock<Arc<BrowserContext>>,
    state: Mutex<NavigationState>,
    events: BrowserEventBus,
}

impl NavigationController {
    pub fn new(config: BrowserConfig) -> Self {
        info!(
            routes = config.routes.len(),
            single_track = config.single_track,
            "Configuring browser"
        );

        Self {
            context: RwLock::new(Arc::new(BrowserContext::new(config))),
            state: Mutex::new(NavigationState::default()),
            events: BrowserEventBus::new(),
        }
    }

    // ============= State & notifications =============

    /// Subscribes to change notifications
    pub fn subscribe(&self) -> Receiver<BrowserEvent> {
        self.events.subscribe()
    }

    /// Snapshot of the published state
    pub fn state(&self) -> NavigationState {
        self.lock_state().clone()
    }

    pub fn path(&self) -> String {
        self.lock_state().path.clone()
    }

    pub fn content(&self) -> Option<ResolvedTrack> {
        self.lock_state().content.clone()
    }

    pub fn tabs(&self) -> Option<Vec<Track>> {
        self.lock_state().tabs.clone()
    }

    pub fn navigation_error(&self) -> Option<NavigationError> {
        self.lock_state().navigation_error.clone()
    }

    pub fn navigation_sequence(&self) -> u64 {
        self.lock_state().navigation_sequence
    }

    // ============= Navigation =============

    /// Navigates to the configured initial path
    pub async fn start(&self) -> Result<NavigationOutcome> {
        let initial_path = self.context().initial_path.clone();
        self.navigate(&initial_path).await
    }

    /// Navigates to `path` and publishes its content
    ///
    /// Returns `Ok(Superseded)` when a newer navigation started before this
    /// one completed, whether it succeeded or failed. Errors of the current
    /// navigation are published and returned.
    pub async fn navigate(&self, path: &str) -> Result<NavigationOutcome> {
        let path = normalize_path(path);
        let context = self.context();
        let seq = self.begin(&path);
        debug!(path = %path, seq, "Navigation started");

        match context.resolver.resolve_path(&path).await {
            Ok(node) => self.apply(&context, seq, node).await,
            Err(error) => self.fail(seq, &path, error),
        }
    }

    /// Invalidates the cached content of `path` and reloads it if displayed
    ///
    /// Returns `None` when `path` is not the current path.
    pub async fn notify_content_changed(&self, path: &str) -> Result<Option<NavigationOutcome>> {
        let key = BrowserCache::key_for(path);
        self.context().resolver.invalidate_path(&key);
        debug!(path = %key, "Content changed");

        let current = self.path();
        if !current.is_empty() && BrowserCache::key_for(&current) == key {
            self.navigate(&current).await.map(Some)
        } else {
            Ok(None)
        }
    }

    /// Reloads the current path, bypassing its cached content
    pub async fn refresh(&self) -> Result<Option<NavigationOutcome>> {
        let current = self.path();
        self.notify_content_changed(&current).await
    }

    /// Replaces routes and collaborators
    ///
    /// Caches start empty, tabs are reset and navigations still in flight
    /// are discarded.
    pub fn reconfigure(&self, config: BrowserConfig) {
        info!(routes = config.routes.len(), "Reconfiguring browser");
        let context = Arc::new(BrowserContext::new(config));
        *self
            .context
            .write()
            .unwrap_or_else(PoisonError::into_inner) = context;

        let mut state = self.lock_state();
        state.navigation_sequence += 1;
        if state.content.take().is_some() {
            self.events.broadcast(BrowserEvent::ContentChanged(None));
        }
        if state.tabs.take().is_some() {
            self.events.broadcast(BrowserEvent::TabsChanged(None));
        }
        if state.navigation_error.take().is_some() {
            self.events
                .broadcast(BrowserEvent::NavigationErrorChanged(None));
        }
    }

    // ============= Lookups (no state mutation) =============

    /// Resolves `path` cache first, without touching the published state
    pub async fn resolve(&self, path: &str) -> Result<ResolvedTrack> {
        let context = self.context();
        let mut node = context.resolver.resolve_path(path).await?;
        if let Some(children) = node.children.as_mut() {
            context.overlay_favorites(children);
        }
        Ok(node)
    }

    /// Searches through the `__search__` source
    ///
    /// Failures and a missing search source yield no results.
    ///
    /// ```
    /// use pmobrowser::{
    ///     BrowserConfig, BrowserSource, CallbackResponse, NavigationController, ResolvedTrack,
    ///     RouteRequest, Track,
    /// };
    ///
    /// # tokio_test::block_on(async {
    /// let config = BrowserConfig::builder()
    ///     .search(BrowserSource::callback(|request: RouteRequest| async move {
    ///         let query = request.param("q").unwrap_or_default().to_string();
    ///         Ok::<_, anyhow::Error>(CallbackResponse::Content(
    ///             ResolvedTrack::new("", "Results")
    ///                 .with_children(vec![Track::playable(query, "hit.mp3")]),
    ///         ))
    ///     }))
    ///     .build()
    ///     .unwrap();
    ///
    /// let controller = NavigationController::new(config);
    /// let results = controller.search("blue").await;
    /// assert_eq!(results[0].title, "blue");
    /// # });
    /// ```
    pub async fn search(&self, query: &str) -> Vec<Track> {
        let context = self.context();
        if context.resolver.routes().search().is_none() {
            debug!(query, "No search source configured");
            return Vec::new();
        }

        match context.resolver.resolve_search(query).await {
            Ok(node) => {
                let mut results = node.children.unwrap_or_default();
                context.overlay_favorites(&mut results);
                debug!(query, results = results.len(), "Search completed");
                results
            }
            Err(e) => {
                warn!(query, error = %e, "Search failed");
                Vec::new()
            }
        }
    }

    /// Resolves and publishes the tabs
    pub async fn load_tabs(&self) -> Result<Vec<Track>> {
        let context = self.context();
        let tabs = context.resolver.resolve_tabs().await?;
        self.publish_tabs(tabs.clone(), None);
        Ok(tabs)
    }

    /// Cached content of `path`, contextual suffix ignored
    pub fn cached_resolved_track(&self, path: &str) -> Option<ResolvedTrack> {
        self.context().resolver.cache().resolved(path)
    }

    /// Cached track by `url`, contextual URL or `src` (search results)
    pub fn cached_track(&self, id: &str) -> Option<Track> {
        self.context().resolver.cache().track(id)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.context().resolver.cache().stats()
    }

    /// Rebuilds the playback queue a contextual URL belongs to
    pub async fn expand_queue_from_contextual_url(&self, url: &str) -> Option<ExpandedQueue> {
        let context = self.context();
        let mut queue = context.queue.expand(url).await?;
        context.overlay_favorites(&mut queue.tracks);
        Some(queue)
    }

    // ============= Internals =============

    fn context(&self) -> Arc<BrowserContext> {
        Arc::clone(&self.context.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn lock_state(&self) -> MutexGuard<'_, NavigationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, seq: u64) -> bool {
        self.lock_state().navigation_sequence == seq
    }

    /// Allocates a sequence and publishes the loading state
    fn begin(&self, path: &str) -> u64 {
        let mut state = self.lock_state();
        state.navigation_sequence += 1;

        if state.path != path {
            state.path = path.to_string();
            self.events
                .broadcast(BrowserEvent::PathChanged(path.to_string()));
        }
        if state.content.take().is_some() {
            self.events.broadcast(BrowserEvent::ContentChanged(None));
        }
        if state.navigation_error.take().is_some() {
            self.events
                .broadcast(BrowserEvent::NavigationErrorChanged(None));
        }

        state.navigation_sequence
    }

    async fn apply(
        &self,
        context: &BrowserContext,
        seq: u64,
        mut node: ResolvedTrack,
    ) -> Result<NavigationOutcome> {
        if !self.is_current(seq) {
            debug!(seq, "Discarding superseded navigation");
            return Ok(NavigationOutcome::Superseded);
        }

        if let Some(children) = node.children.as_mut() {
            context.overlay_favorites(children);
        }

        if let Some(artwork) = &context.artwork {
            if !self.transform_artwork(seq, artwork, &mut node).await {
                debug!(seq, "Discarding superseded navigation after artwork");
                return Ok(NavigationOutcome::Superseded);
            }
        }

        {
            let mut state = self.lock_state();
            if state.navigation_sequence != seq {
                debug!(seq, "Discarding superseded navigation");
                return Ok(NavigationOutcome::Superseded);
            }
            state.content = Some(node.clone());
            self.events
                .broadcast(BrowserEvent::ContentChanged(Some(node.clone())));
        }
        info!(path = %node.url, seq, children = node.children().len(), "Navigation applied");

        if context.resolver.routes().tabs().is_some() && self.tabs().is_none() {
            match context.resolver.resolve_tabs().await {
                Ok(tabs) => self.publish_tabs(tabs, Some(seq)),
                Err(e) => warn!(error = %e, "Failed to load tabs"),
            }
        }

        Ok(NavigationOutcome::Applied(node))
    }

    /// Returns `false` as soon as the navigation is superseded
    async fn transform_artwork(
        &self,
        seq: u64,
        artwork: &ArtworkSettings,
        node: &mut ResolvedTrack,
    ) -> bool {
        let transformer: &dyn ArtworkTransformer = artwork.transformer.as_ref();

        if !self.is_current(seq) {
            return false;
        }
        let source = transformer
            .resolve(ArtworkTarget::Node(node), &artwork.config)
            .await;
        if !self.is_current(seq) {
            return false;
        }
        if source.is_some() {
            node.artwork_source = source;
        }

        if let Some(children) = node.children.as_mut() {
            for child in children.iter_mut() {
                if !self.is_current(seq) {
                    return false;
                }
                let source = transformer
                    .resolve(ArtworkTarget::Track(child), &artwork.config)
                    .await;
                if !self.is_current(seq) {
                    return false;
                }
                if source.is_some() {
                    child.artwork_source = source;
                }
            }
        }

        true
    }

    /// Publishes `tabs` unless they are unchanged or, when `seq` is given,
    /// that navigation has been superseded
    fn publish_tabs(&self, tabs: Vec<Track>, seq: Option<u64>) {
        let mut state = self.lock_state();
        if seq.is_some_and(|seq| state.navigation_sequence != seq) {
            debug!(?seq, "Discarding tabs of superseded navigation");
            return;
        }
        if state.tabs.as_ref() == Some(&tabs) {
            return;
        }
        state.tabs = Some(tabs.clone());
        self.events.broadcast(BrowserEvent::TabsChanged(Some(tabs)));
    }

    fn fail(&self, seq: u64, path: &str, error: BrowserError) -> Result<NavigationOutcome> {
        let mut state = self.lock_state();
        if state.navigation_sequence != seq {
            debug!(seq, path, error = %error, "Discarding superseded navigation failure");
            return Ok(NavigationOutcome::Superseded);
        }

        warn!(path, seq, error = %error, "Navigation failed");
        let navigation_error = NavigationError::from(&error);
        if state.content.take().is_some() {
            self.events.broadcast(BrowserEvent::ContentChanged(None));
        }
        state.navigation_error = Some(navigation_error.clone());
        self.events
            .broadcast(BrowserEvent::NavigationErrorChanged(Some(navigation_error)));

        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NavigationErrorCode;

    fn controller() -> NavigationController {
        let config = BrowserConfig::builder()
            .route(
                "/",
                ResolvedTrack::new("", "Home")
                    .with_children(vec![Track::browsable("Albums", "/albums")]),
            )
            .route(
                "/albums",
                ResolvedTrack::new("", "Albums").with_children(vec![Track::playable("A", "a.mp3")]),
            )
            .build()
            .unwrap();
        NavigationController::new(config)
    }

    #[tokio::test]
    async fn test_navigate_publishes_content() {
        let controller = controller();
        let events = controller.subscribe();

        let outcome = controller.navigate("/albums").await.unwrap();
        assert_eq!(outcome.content().unwrap().title, "Albums");

        let state = controller.state();
        assert_eq!(state.path, "/albums");
        assert_eq!(state.navigation_sequence, 1);
        assert_eq!(state.content.unwrap().url, "/albums");

        assert_eq!(
            events.try_recv().unwrap(),
            BrowserEvent::PathChanged("/albums".to_string())
        );
        assert!(matches!(
            events.try_recv().unwrap(),
            BrowserEvent::ContentChanged(Some(_))
        ));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_start_uses_initial_path() {
        let controller = controller();
        controller.start().await.unwrap();
        assert_eq!(controller.path(), "/");
        assert_eq!(controller.content().unwrap().title, "Home");
    }

    #[tokio::test]
    async fn test_error_is_published_then_cleared() {
        let controller = controller();
        let error = controller.navigate("/missing").await.unwrap_err();
        assert!(matches!(error, BrowserError::ContentNotFound(_)));
        assert_eq!(
            controller.navigation_error().unwrap().code,
            NavigationErrorCode::ContentNotFoundError
        );
        assert!(controller.content().is_none());

        controller.navigate("/albums").await.unwrap();
        assert!(controller.navigation_error().is_none());
    }

    #[tokio::test]
    async fn test_resolve_does_not_touch_state() {
        let controller = controller();
        let node = controller.resolve("/albums").await.unwrap();
        assert_eq!(node.title, "Albums");
        assert_eq!(controller.navigation_sequence(), 0);
        assert!(controller.content().is_none());
        assert!(controller.cached_resolved_track("/albums").is_some());
        assert!(controller
            .cached_track("/albums?__trackId=a.mp3")
            .is_some());
    }

    #[tokio::test]
    async fn test_search_without_source_is_empty() {
        let controller = controller();
        assert!(controller.search("jazz").await.is_empty());
    }

    #[test]
    fn test_tabs_of_superseded_navigation_are_dropped() {
        let controller = controller();
        let events = controller.subscribe();
        let stale = controller.begin("/albums");
        controller.begin("/");
        while events.try_recv().is_ok() {}

        controller.publish_tabs(vec![Track::browsable("Albums", "/albums")], Some(stale));
        assert!(controller.tabs().is_none());
        assert!(events.try_recv().is_err());

        let current = controller.navigation_sequence();
        controller.publish_tabs(vec![Track::browsable("Albums", "/albums")], Some(current));
        assert_eq!(controller.tabs().unwrap().len(), 1);
        assert!(matches!(
            events.try_recv().unwrap(),
            BrowserEvent::TabsChanged(Some(_))
        ));
    }

    #[tokio::test]
    async fn test_playable_tabs_get_contextual_urls() {
        let config = BrowserConfig::builder()
            .tabs(ResolvedTrack::new("", "Tabs").with_children(vec![
                Track::browsable("Albums", "/albums"),
                Track::playable("Live", "live.mp3"),
            ]))
            .build()
            .unwrap();
        let controller = NavigationController::new(config);

        let tabs = controller.load_tabs().await.unwrap();
        assert_eq!(tabs[0].url.as_deref(), Some("/albums"));
        assert_eq!(tabs[1].url.as_deref(), Some("__tabs__?__trackId=live.mp3"));

        let queue = controller
            .expand_queue_from_contextual_url("__tabs__?__trackId=live.mp3")
            .await
            .unwrap();
        assert_eq!(queue.selected().unwrap().title, "Live");
        assert!(controller
            .cached_track("__tabs__?__trackId=live.mp3")
            .is_some());
    }
}
