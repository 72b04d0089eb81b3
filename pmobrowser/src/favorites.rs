//! Favorite state overlay

use crate::models::Track;
use std::collections::HashSet;
use std::sync::RwLock;

/// Host-provided favorite lookup, keyed by track `src`
pub trait FavoriteStore: Send + Sync {
    fn is_favorited(&self, src: &str) -> bool;
}

/// Sets `favorited` on playable tracks that do not carry an explicit value
pub fn overlay_favorites(tracks: &mut [Track], store: &dyn FavoriteStore) {
    for track in tracks.iter_mut() {
        if track.favorited.is_some() {
            continue;
        }
        if let Some(src) = track.src.as_deref() {
            track.favorited = Some(store.is_favorited(src));
        }
    }
}

/// In-memory favorite store
#[derive(Debug, Default)]
pub struct MemoryFavoriteStore {
    favorites: RwLock<HashSet<String>>,
}

impl MemoryFavoriteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_favorites<I, S>(favorites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            favorites: RwLock::new(favorites.into_iter().map(Into::into).collect()),
        }
    }

    pub fn set_favorited(&self, src: &str, favorited: bool) {
        let mut favorites = self
            .favorites
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if favorited {
            favorites.insert(src.to_string());
        } else {
            favorites.remove(src);
        }
    }
}

impl FavoriteStore for MemoryFavoriteStore {
    fn is_favorited(&self, src: &str) -> bool {
        self.favorites
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(src)
    }
}
