//! Navigation dans un petit catalogue en mémoire
//!
//! Usage:
//! ```bash
//! cargo run -p pmobrowser --example catalog_demo
//! RUST_LOG=pmobrowser=debug cargo run -p pmobrowser --example catalog_demo
//! ```

use pmobrowser::{
    BrowserConfig, BrowserEvent, BrowserSource, CallbackResponse, NavigationController,
    ArtworkConfig, QueryArtworkTransformer, ResolvedTrack, RouteRequest, Track,
};
use pmoconfig::get_config;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn album(id: &str) -> ResolvedTrack {
    let track = |n: u32| Track {
        artwork: Some(format!("/covers/{}.jpg", id)),
        duration: Some(180.0 + f64::from(n)),
        ..Track::playable(format!("Track {}", n), format!("{}-{}.flac", id, n))
    };
    ResolvedTrack::new("", format!("Album {}", id))
        .with_children(vec![track(1), track(2), track(3)])
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_config();
    let level = config.get_log_min_level()?.to_lowercase();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .init();

    let browser = BrowserConfig::builder()
        .route(
            "/",
            ResolvedTrack::new("", "Home").with_children(vec![
                Track::browsable("Albums", "/albums"),
                Track::browsable("Radio", "/radio"),
            ]),
        )
        .route(
            "/albums",
            ResolvedTrack::new("", "Albums").with_children(vec![
                Track::browsable("Album 1", "/albums/1"),
                Track::browsable("Album 2", "/albums/2"),
            ]),
        )
        .route(
            "/albums/{id}",
            BrowserSource::callback(|request: RouteRequest| async move {
                let id = request.param("id").unwrap_or("0").to_string();
                Ok::<_, anyhow::Error>(CallbackResponse::Content(album(&id)))
            }),
        )
        .search(BrowserSource::callback(|request: RouteRequest| async move {
            let query = request.param("q").unwrap_or_default().to_lowercase();
            let results = album("1")
                .children
                .unwrap_or_default()
                .into_iter()
                .filter(|track| track.title.to_lowercase().contains(&query))
                .collect();
            Ok::<_, anyhow::Error>(CallbackResponse::Content(
                ResolvedTrack::new("", "Results").with_children(results),
            ))
        }))
        .artwork(
            Arc::new(QueryArtworkTransformer),
            ArtworkConfig {
                base_url: Some("https://img.example.com".to_string()),
                width: Some(300),
                ..Default::default()
            },
        )
        .with_settings(&config)?
        .build()?;

    let controller = NavigationController::new(browser);
    let events = controller.subscribe();

    controller.start().await?;
    controller.navigate("/albums/1").await?;

    if let Some(content) = controller.content() {
        println!("== {} ({})", content.title, content.url);
        for track in content.children() {
            let artwork = track
                .artwork_source
                .as_ref()
                .map(|source| source.uri.as_str())
                .unwrap_or("-");
            println!(
                "  {:<10} {:<35} {}",
                track.title,
                track.url.as_deref().unwrap_or("-"),
                artwork
            );
        }
    }

    if let Err(e) = controller.navigate("/radio").await {
        println!("\n/radio: {}", e);
    }

    let queue = controller
        .expand_queue_from_contextual_url("/albums/1?__trackId=1-2.flac")
        .await;
    if let Some(queue) = queue {
        println!("\nQueue ({} tracks), starting at #{}", queue.tracks.len(), queue.selected_index);
    }

    let results = controller.search("track 3").await;
    println!("\nSearch 'track 3': {} result(s)", results.len());

    println!("\nEvents:");
    for event in events.try_iter() {
        match event {
            BrowserEvent::PathChanged(path) => println!("  path    -> {}", path),
            BrowserEvent::ContentChanged(content) => println!(
                "  content -> {}",
                content.map(|c| c.title).unwrap_or_else(|| "(loading)".to_string())
            ),
            BrowserEvent::TabsChanged(tabs) => {
                println!("  tabs    -> {}", tabs.map(|t| t.len()).unwrap_or(0))
            }
            BrowserEvent::NavigationErrorChanged(error) => println!(
                "  error   -> {}",
                error.map(|e| e.message).unwrap_or_else(|| "(cleared)".to_string())
            ),
        }
    }

    println!("\nCache: {:?}", controller.cache_stats());
    Ok(())
}
