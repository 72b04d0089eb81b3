//! # pmobrowser - Navigation dans un catalogue audio pour PMOMusic
//!
//! Cette crate fournit le cœur de navigation d'un navigateur de contenu
//! audio : les hôtes déclarent des routes (`/artists/{id}`, `/files/**`),
//! chaque route est servie par une source (contenu statique, callback ou
//! requête HTTP) et le contrôleur de navigation publie le contenu courant.
//!
//! ## Vue d'ensemble
//!
//! - Routage par motifs avec départage par spécificité
//! - URLs contextuelles (`/album/1?__trackId=a.mp3`) : une piste jouable
//!   garde la trace du dossier d'où elle a été choisie
//! - Caches bornés des nœuds résolus et des pistes (moka)
//! - Navigation concurrente : seule la dernière navigation est publiée
//! - Recherche mise en cache sous `/__search?q=...`
//! - Reconstruction d'une file de lecture depuis une URL contextuelle
//!
//! ## Structure des modules
//!
//! ```text
//! pmobrowser/
//! ├── src/
//! │   ├── lib.rs              # Module principal (ce fichier)
//! │   ├── router.rs           # Motifs de routes et spécificité
//! │   ├── contextual_url.rs   # Codec des URLs contextuelles
//! │   ├── source.rs           # Sources de contenu (statique, callback, requête)
//! │   ├── transport.rs        # Requêtes déclaratives et transport HTTP
//! │   ├── resolver.rs         # Résolution des chemins (cache + single-flight)
//! │   ├── cache.rs            # Caches bornés
//! │   ├── navigation.rs       # Contrôleur de navigation
//! │   ├── queue.rs            # Expansion de file de lecture
//! │   ├── artwork.rs          # Transformation des pochettes
//! │   ├── favorites.rs        # Favoris
//! │   ├── events.rs           # Notifications
//! │   ├── config.rs           # Configuration du navigateur
//! │   ├── config_ext.rs       # Extension pmoconfig
//! │   └── error.rs            # Gestion des erreurs
//! ```
//!
//! ## Utilisation
//!
//! ```rust
//! use pmobrowser::{BrowserConfig, NavigationController, ResolvedTrack, Track};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = BrowserConfig::builder()
//!         .route(
//!             "/albums/{id}",
//!             ResolvedTrack::new("", "Album").with_children(vec![
//!                 Track::playable("Intro", "intro.mp3"),
//!                 Track::playable("Outro", "outro.mp3"),
//!             ]),
//!         )
//!         .build()?;
//!
//!     let controller = NavigationController::new(config);
//!     controller.navigate("/albums/42").await?;
//!
//!     let content = controller.content().expect("content published");
//!     assert_eq!(content.children()[1].url.as_deref(), Some("/albums/42?__trackId=outro.mp3"));
//!
//!     let queue = controller
//!         .expand_queue_from_contextual_url("/albums/42?__trackId=outro.mp3")
//!         .await
//!         .expect("queue expanded");
//!     assert_eq!(queue.selected_index, 1);
//!     Ok(())
//! }
//! ```

pub mod artwork;
pub mod cache;
pub mod config;
pub mod config_ext;
pub mod contextual_url;
pub mod error;
pub mod events;
pub mod favorites;
pub mod models;
pub mod navigation;
pub mod queue;
pub mod resolver;
pub mod router;
pub mod source;
pub mod transport;

pub use artwork::{ArtworkConfig, ArtworkTarget, ArtworkTransformer, QueryArtworkTransformer};
pub use cache::{BrowserCache, CacheSettings, CacheStats};
pub use config::{BrowserConfig, BrowserConfigBuilder, RouteTable};
pub use config_ext::BrowserConfigExt;
pub use error::{BrowserError, NavigationError, NavigationErrorCode, Result};
pub use events::BrowserEvent;
pub use favorites::{FavoriteStore, MemoryFavoriteStore};
pub use models::{ArtworkSource, ResolvedTrack, Track};
pub use navigation::{NavigationController, NavigationOutcome, NavigationState};
pub use queue::ExpandedQueue;
pub use router::{RouteMatch, RoutePattern, find_best_match};
pub use source::{BrowserCallback, BrowserSource, CallbackResponse, RouteRequest};
pub use transport::{
    HttpMethod, HttpTransport, RequestConfig, Transport, TransportRequest, TransportResponse,
};
