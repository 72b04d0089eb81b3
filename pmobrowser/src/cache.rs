//! Cache en mémoire des contenus résolus
//!
//! Ce module fournit `BrowserCache`, qui mémorise :
//!
//! - les nœuds résolus, indexés par chemin normalisé (suffixe contextuel retiré) ;
//! - les pistes, indexées par identifiant (`url` propre ou URL contextuelle).
//!
//! Les deux caches sont bornés en nombre d'entrées et peuvent expirer (TTL).
//! Les lectures sont synchrones : les contrôleurs externes interrogent le cache
//! depuis des callbacks qui ne doivent pas bloquer.

use crate::contextual_url::strip_track_id;
use crate::models::{ResolvedTrack, Track};
use crate::router::normalize_path;
use moka::sync::Cache as MokaCache;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Nombre maximal de chemins résolus par défaut
pub const DEFAULT_MAX_PATHS: u64 = 256;

/// Nombre maximal de pistes indexées par défaut
pub const DEFAULT_MAX_TRACKS: u64 = 4096;

/// Limites des caches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// Capacité du cache des nœuds résolus
    pub max_paths: u64,
    /// Capacité du cache des pistes
    pub max_tracks: u64,
    /// Durée de vie des entrées (`None` : pas d'expiration)
    pub ttl: Option<Duration>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_paths: DEFAULT_MAX_PATHS,
            max_tracks: DEFAULT_MAX_TRACKS,
            ttl: None,
        }
    }
}

/// Cache des nœuds résolus et des pistes
#[derive(Clone)]
pub struct BrowserCache {
    /// Nœuds résolus (chemin normalisé → nœud)
    resolved: MokaCache<String, ResolvedTrack>,
    /// Pistes (identifiant → piste)
    tracks: MokaCache<String, Track>,
}

impl BrowserCache {
    /// Crée un cache avec les limites par défaut
    pub fn new() -> Self {
        Self::with_settings(CacheSettings::default())
    }

    /// Crée un cache avec des limites spécifiques
    pub fn with_settings(settings: CacheSettings) -> Self {
        let mut resolved = MokaCache::builder().max_capacity(settings.max_paths);
        let mut tracks = MokaCache::builder().max_capacity(settings.max_tracks);

        if let Some(ttl) = settings.ttl {
            resolved = resolved.time_to_live(ttl);
            tracks = tracks.time_to_live(ttl);
        }

        Self {
            resolved: resolved.build(),
            tracks: tracks.build(),
        }
    }

    /// Clé de cache d'un chemin
    pub fn key_for(path: &str) -> String {
        normalize_path(&strip_track_id(path))
    }

    // ============ Nœuds résolus ============

    /// Récupère le nœud résolu d'un chemin
    pub fn resolved(&self, path: &str) -> Option<ResolvedTrack> {
        let key = Self::key_for(path);
        let hit = self.resolved.get(&key);
        debug!(path = %key, hit = hit.is_some(), "Resolved cache lookup");
        hit
    }

    /// Mémorise le nœud résolu d'un chemin
    pub fn store_resolved(&self, path: &str, node: ResolvedTrack) {
        self.resolved.insert(Self::key_for(path), node);
    }

    /// Invalide le nœud résolu d'un chemin
    pub fn invalidate_path(&self, path: &str) {
        self.resolved.invalidate(&Self::key_for(path));
    }

    // ============ Pistes ============

    /// Récupère une piste par identifiant
    pub fn track(&self, id: &str) -> Option<Track> {
        self.tracks.get(id)
    }

    /// Indexe des pistes par leur identifiant
    ///
    /// Les pistes sans identifiant sont ignorées.
    pub fn index_tracks<'a, I>(&self, tracks: I)
    where
        I: IntoIterator<Item = &'a Track>,
    {
        for track in tracks {
            if let Some(id) = track.identifier() {
                self.tracks.insert(id.to_string(), track.clone());
            }
        }
    }

    // ============ Maintenance ============

    /// Vide les deux caches
    pub fn clear(&self) {
        self.resolved.invalidate_all();
        self.tracks.invalidate_all();
    }

    /// Retourne des statistiques sur le cache
    pub fn stats(&self) -> CacheStats {
        self.resolved.run_pending_tasks();
        self.tracks.run_pending_tasks();

        CacheStats {
            resolved_count: self.resolved.entry_count(),
            tracks_count: self.tracks.entry_count(),
        }
    }
}

impl Default for BrowserCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistiques du cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Nombre de nœuds résolus en cache
    pub resolved_count: u64,
    /// Nombre de pistes indexées
    pub tracks_count: u64,
}
