//! Tests d'intégration du contrôleur de navigation

use async_trait::async_trait;
use pmobrowser::router::search_path;
use pmobrowser::{
    ArtworkConfig, ArtworkSource, ArtworkTarget, ArtworkTransformer, BrowserConfig, BrowserError,
    BrowserEvent, BrowserSource, CallbackResponse, MemoryFavoriteStore, NavigationController,
    NavigationErrorCode, ResolvedTrack, RouteRequest, Track,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Source bloquée jusqu'à ce que `gate` soit notifié
fn gated(gate: Arc<Notify>, title: &'static str, fail: bool) -> BrowserSource {
    BrowserSource::callback(move |_request: RouteRequest| {
        let gate = gate.clone();
        async move {
            gate.notified().await;
            if fail {
                Ok::<_, anyhow::Error>(CallbackResponse::Error(format!("{} failed", title)))
            } else {
                Ok(CallbackResponse::Content(ResolvedTrack::new("", title)))
            }
        }
    })
}

/// Source comptant ses appels, le titre porte le numéro d'appel
fn counting(calls: Arc<AtomicUsize>, prefix: &'static str) -> BrowserSource {
    BrowserSource::callback(move |_request: RouteRequest| {
        let calls = calls.clone();
        async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok::<_, anyhow::Error>(CallbackResponse::Content(
                ResolvedTrack::new("", format!("{} {}", prefix, n))
                    .with_children(vec![Track::playable("Item", format!("{}-{}.mp3", prefix, n))]),
            ))
        }
    })
}

async fn wait_for_sequence(controller: &NavigationController, seq: u64) {
    while controller.navigation_sequence() < seq {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_last_navigation_wins() {
    let gate = Arc::new(Notify::new());
    let config = BrowserConfig::builder()
        .route("/a", gated(gate.clone(), "A", false))
        .route("/b", ResolvedTrack::new("", "B"))
        .build()
        .unwrap();
    let controller = Arc::new(NavigationController::new(config));
    let events = controller.subscribe();

    let slow = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.navigate("/a").await })
    };
    wait_for_sequence(&controller, 1).await;

    let outcome = controller.navigate("/b").await.unwrap();
    assert_eq!(outcome.content().unwrap().title, "B");

    gate.notify_one();
    let stale = slow.await.unwrap().unwrap();
    assert!(stale.is_superseded());

    let state = controller.state();
    assert_eq!(state.path, "/b");
    assert_eq!(state.content.unwrap().title, "B");
    assert_eq!(state.navigation_sequence, 2);

    let received: Vec<BrowserEvent> = events.try_iter().collect();
    assert_eq!(
        received,
        vec![
            BrowserEvent::PathChanged("/a".to_string()),
            BrowserEvent::PathChanged("/b".to_string()),
            BrowserEvent::ContentChanged(Some(outcome.content().unwrap().clone())),
        ]
    );
}

#[tokio::test]
async fn test_stale_failure_is_not_published() {
    let gate = Arc::new(Notify::new());
    let config = BrowserConfig::builder()
        .route("/a", gated(gate.clone(), "A", true))
        .route("/b", ResolvedTrack::new("", "B"))
        .build()
        .unwrap();
    let controller = Arc::new(NavigationController::new(config));

    let slow = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.navigate("/a").await })
    };
    wait_for_sequence(&controller, 1).await;
    controller.navigate("/b").await.unwrap();

    gate.notify_one();
    assert!(slow.await.unwrap().unwrap().is_superseded());
    assert!(controller.navigation_error().is_none());
    assert_eq!(controller.content().unwrap().title, "B");
}

#[tokio::test]
async fn test_missing_route_publishes_not_found() {
    let config = BrowserConfig::builder()
        .route("/", ResolvedTrack::new("", "Home"))
        .build()
        .unwrap();
    let controller = NavigationController::new(config);
    controller.navigate("/").await.unwrap();

    let error = controller.navigate("/nowhere").await.unwrap_err();
    assert!(error.is_not_found());

    let state = controller.state();
    assert_eq!(state.path, "/nowhere");
    assert!(state.content.is_none());
    let published = state.navigation_error.unwrap();
    assert_eq!(published.code, NavigationErrorCode::ContentNotFoundError);
    assert_eq!(published.status_code, None);
}

#[tokio::test]
async fn test_callback_error_is_published() {
    let config = BrowserConfig::builder()
        .route(
            "/offline",
            BrowserSource::callback(|_request: RouteRequest| async {
                Ok::<_, anyhow::Error>(CallbackResponse::Error("Sign in first".to_string()))
            }),
        )
        .build()
        .unwrap();
    let controller = NavigationController::new(config);

    let error = controller.navigate("/offline").await.unwrap_err();
    assert_eq!(error, BrowserError::Callback("Sign in first".to_string()));

    let published = controller.navigation_error().unwrap();
    assert_eq!(published.code, NavigationErrorCode::CallbackError);
    assert_eq!(published.message, "Sign in first");
}

#[tokio::test]
async fn test_most_specific_route_is_used() {
    let config = BrowserConfig::builder()
        .route(
            "/artists/{id}",
            BrowserSource::callback(|request: RouteRequest| async move {
                let id = request.param("id").unwrap_or_default().to_string();
                Ok::<_, anyhow::Error>(CallbackResponse::Content(ResolvedTrack::new(
                    "",
                    format!("Artist {}", id),
                )))
            }),
        )
        .route("/artists/popular", ResolvedTrack::new("", "Popular"))
        .route(
            "/files/**",
            BrowserSource::callback(|request: RouteRequest| async move {
                let tail = request.param("tail").unwrap_or_default().to_string();
                Ok::<_, anyhow::Error>(CallbackResponse::Content(ResolvedTrack::new("", tail)))
            }),
        )
        .build()
        .unwrap();
    let controller = NavigationController::new(config);

    let popular = controller.navigate("/artists/popular").await.unwrap();
    assert_eq!(popular.content().unwrap().title, "Popular");

    let artist = controller.navigate("/artists/42").await.unwrap();
    assert_eq!(artist.content().unwrap().title, "Artist 42");

    let files = controller.navigate("/files/music/jazz").await.unwrap();
    assert_eq!(files.content().unwrap().title, "music/jazz");
}

#[tokio::test]
async fn test_search_is_cached_under_synthetic_path() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let config = BrowserConfig::builder()
        .search(BrowserSource::callback(move |request: RouteRequest| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                let query = request.param("q").unwrap_or_default().to_string();
                Ok::<_, anyhow::Error>(CallbackResponse::Content(
                    ResolvedTrack::new("", format!("Results for {}", query)).with_children(vec![
                        Track::playable("So What", "so-what.mp3"),
                        Track::browsable("Kind of Blue", "/albums/kind-of-blue"),
                    ]),
                ))
            }
        }))
        .build()
        .unwrap();
    let controller = NavigationController::new(config);

    let results = controller.search("miles davis").await;
    assert_eq!(results.len(), 2);
    // Search results keep their own identifiers
    assert_eq!(results[0].url, None);
    assert_eq!(results[0].src.as_deref(), Some("so-what.mp3"));

    let again = controller.search("miles davis").await;
    assert_eq!(again, results);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let cached = controller
        .cached_resolved_track(&search_path("miles davis"))
        .unwrap();
    assert_eq!(cached.title, "Results for miles davis");
    assert!(controller.cached_track("so-what.mp3").is_some());
    assert!(controller.cached_track("/albums/kind-of-blue").is_some());

    // The published state is untouched
    assert_eq!(controller.navigation_sequence(), 0);
}

#[tokio::test]
async fn test_search_failure_yields_no_results() {
    let config = BrowserConfig::builder()
        .search(BrowserSource::callback(|_request: RouteRequest| async {
            Err::<CallbackResponse, _>(anyhow::anyhow!("index offline"))
        }))
        .build()
        .unwrap();
    let controller = NavigationController::new(config);

    assert!(controller.search("anything").await.is_empty());
    assert!(controller.navigation_error().is_none());
}

#[tokio::test]
async fn test_tabs_are_loaded_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let config = BrowserConfig::builder()
        .route("/", ResolvedTrack::new("", "Home"))
        .route("/library", ResolvedTrack::new("", "Library"))
        .tabs(BrowserSource::callback(move |_request: RouteRequest| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(CallbackResponse::Content(
                    ResolvedTrack::new("", "Tabs").with_children(vec![
                        Track::browsable("Home", "/"),
                        Track::browsable("Library", "/library"),
                    ]),
                ))
            }
        }))
        .build()
        .unwrap();
    let controller = NavigationController::new(config);
    let events = controller.subscribe();

    controller.start().await.unwrap();
    controller.navigate("/library").await.unwrap();

    let tabs = controller.tabs().unwrap();
    assert_eq!(tabs.len(), 2);
    assert_eq!(tabs[1].url.as_deref(), Some("/library"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let tab_events = events
        .try_iter()
        .filter(|event| matches!(event, BrowserEvent::TabsChanged(_)))
        .count();
    assert_eq!(tab_events, 1);
}

#[tokio::test]
async fn test_notify_content_changed_reloads_current_path() {
    let calls = Arc::new(AtomicUsize::new(0));
    let config = BrowserConfig::builder()
        .route("/live", counting(calls.clone(), "Live"))
        .route("/other", counting(Arc::new(AtomicUsize::new(0)), "Other"))
        .build()
        .unwrap();
    let controller = NavigationController::new(config);

    controller.navigate("/live").await.unwrap();
    controller.navigate("/live").await.unwrap();
    assert_eq!(controller.content().unwrap().title, "Live 1");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let reloaded = controller
        .notify_content_changed("/live")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.content().unwrap().title, "Live 2");
    assert_eq!(controller.content().unwrap().title, "Live 2");

    // Another path is only invalidated
    controller.resolve("/other").await.unwrap();
    assert!(controller.notify_content_changed("/other").await.unwrap().is_none());
    assert!(controller.cached_resolved_track("/other").is_none());
    assert_eq!(controller.path(), "/live");

    controller.refresh().await.unwrap();
    assert_eq!(controller.content().unwrap().title, "Live 3");
}

#[tokio::test]
async fn test_favorites_are_overlaid() {
    let config = BrowserConfig::builder()
        .route(
            "/album",
            ResolvedTrack::new("", "Album").with_children(vec![
                Track::playable("A", "a.mp3"),
                Track::playable("B", "b.mp3"),
                Track {
                    favorited: Some(false),
                    ..Track::playable("C", "c.mp3")
                },
            ]),
        )
        .favorites(Arc::new(MemoryFavoriteStore::with_favorites(["a.mp3", "c.mp3"])))
        .build()
        .unwrap();
    let controller = NavigationController::new(config);

    controller.navigate("/album").await.unwrap();
    let content = controller.content().unwrap();
    let favorited: Vec<_> = content.children().iter().map(|t| t.favorited).collect();
    assert_eq!(favorited, vec![Some(true), Some(false), Some(false)]);
}

#[tokio::test]
async fn test_reconfigure_resets_state() {
    let first = BrowserConfig::builder()
        .route("/", ResolvedTrack::new("", "Old home"))
        .build()
        .unwrap();
    let controller = NavigationController::new(first);
    controller.navigate("/").await.unwrap();
    assert!(controller.cached_resolved_track("/").is_some());

    let second = BrowserConfig::builder()
        .route("/", ResolvedTrack::new("", "New home"))
        .build()
        .unwrap();
    controller.reconfigure(second);

    assert!(controller.content().is_none());
    assert!(controller.cached_resolved_track("/").is_none());
    assert_eq!(controller.navigation_sequence(), 2);

    controller.refresh().await.unwrap();
    assert_eq!(controller.content().unwrap().title, "New home");
}

#[tokio::test]
async fn test_content_changed_during_fetch_is_not_overwritten() {
    let gate = Arc::new(Notify::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let live = {
        let gate = gate.clone();
        let calls = calls.clone();
        BrowserSource::callback(move |_request: RouteRequest| {
            let gate = gate.clone();
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                // Only the first fetch is held back
                if n == 1 {
                    gate.notified().await;
                }
                Ok::<_, anyhow::Error>(CallbackResponse::Content(ResolvedTrack::new(
                    "",
                    format!("Live {}", n),
                )))
            }
        })
    };
    let config = BrowserConfig::builder().route("/live", live).build().unwrap();
    let controller = Arc::new(NavigationController::new(config));

    let slow = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.navigate("/live").await })
    };
    while calls.load(Ordering::SeqCst) < 1 {
        tokio::task::yield_now().await;
    }

    let outcome = controller
        .notify_content_changed("/live")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcome.content().unwrap().title, "Live 2");

    gate.notify_one();
    assert!(slow.await.unwrap().unwrap().is_superseded());

    assert_eq!(controller.content().unwrap().title, "Live 2");
    assert_eq!(
        controller.cached_resolved_track("/live").unwrap().title,
        "Live 2"
    );

    controller.navigate("/live").await.unwrap();
    assert_eq!(controller.content().unwrap().title, "Live 2");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

/// Transformer bloqué sur l'artwork "A" jusqu'à ce que `gate` soit notifié
struct GatedArtwork {
    gate: Notify,
    blocked: AtomicBool,
}

#[async_trait]
impl ArtworkTransformer for GatedArtwork {
    async fn resolve(
        &self,
        target: ArtworkTarget<'_>,
        _config: &ArtworkConfig,
    ) -> Option<ArtworkSource> {
        let artwork = target.artwork()?.to_string();
        if artwork == "A" {
            self.blocked.store(true, Ordering::SeqCst);
            self.gate.notified().await;
        }
        Some(ArtworkSource {
            uri: format!("art://{}", artwork),
            headers: BTreeMap::new(),
        })
    }
}

fn with_artwork(title: &str, artwork: &str, child_artwork: &str) -> ResolvedTrack {
    ResolvedTrack {
        artwork: Some(artwork.to_string()),
        ..ResolvedTrack::new("", title).with_children(vec![Track {
            artwork: Some(child_artwork.to_string()),
            ..Track::playable(format!("{} 1", title), format!("{}1.mp3", child_artwork))
        }])
    }
}

#[tokio::test]
async fn test_navigation_superseded_during_artwork_is_discarded() {
    let transformer = Arc::new(GatedArtwork {
        gate: Notify::new(),
        blocked: AtomicBool::new(false),
    });
    let config = BrowserConfig::builder()
        .route("/a", with_artwork("A", "A", "a1"))
        .route("/b", with_artwork("B", "B", "b1"))
        .artwork(transformer.clone(), ArtworkConfig::default())
        .build()
        .unwrap();
    let controller = Arc::new(NavigationController::new(config));
    let events = controller.subscribe();

    let slow = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.navigate("/a").await })
    };
    while !transformer.blocked.load(Ordering::SeqCst) {
        tokio::task::yield_now().await;
    }

    let outcome = controller.navigate("/b").await.unwrap();
    assert_eq!(outcome.content().unwrap().title, "B");

    transformer.gate.notify_one();
    assert!(slow.await.unwrap().unwrap().is_superseded());

    let content = controller.content().unwrap();
    assert_eq!(content.title, "B");
    assert_eq!(content.artwork_source.as_ref().unwrap().uri, "art://B");
    assert_eq!(
        content.children()[0].artwork_source.as_ref().unwrap().uri,
        "art://b1"
    );

    let published_a = events.try_iter().any(|event| {
        matches!(event, BrowserEvent::ContentChanged(Some(node)) if node.title == "A")
    });
    assert!(!published_a);
}
