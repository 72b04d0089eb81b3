//! Extension pour intégrer le navigateur dans pmoconfig
//!
//! Ce module fournit le trait `BrowserConfigExt` qui ajoute à
//! `pmoconfig::Config` les réglages du navigateur, rangés sous `browser` :
//!
//! ```yaml
//! browser:
//!   initial_path: /
//!   single_track: false
//!   cache:
//!     max_paths: 256
//!     max_tracks: 4096
//!     ttl_secs: 0        # 0 : pas d'expiration
//!   request:
//!     base_url: https://api.example.com
//!     timeout_secs: 30
//! ```
//!
//! Les getters persistent automatiquement les valeurs par défaut dans la
//! configuration si elles n'existent pas encore.
//!
//! # Exemple
//!
//! ```no_run
//! use pmoconfig::get_config;
//! use pmobrowser::{BrowserConfig, ResolvedTrack};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = BrowserConfig::builder()
//!     .route("/", ResolvedTrack::new("/", "Home"))
//!     .with_settings(&get_config())?
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use crate::cache::{CacheSettings, DEFAULT_MAX_PATHS, DEFAULT_MAX_TRACKS};
use crate::config::BrowserConfigBuilder;
use crate::transport::{DEFAULT_TIMEOUT_SECS, HttpTransport};
use anyhow::Result;
use pmoconfig::Config;
use serde_yaml::{Number, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Chemin initial par défaut
pub const DEFAULT_INITIAL_PATH: &str = "/";

/// Trait d'extension pour gérer la configuration du navigateur dans pmoconfig
pub trait BrowserConfigExt {
    // ========================================================================
    // Navigation
    // ========================================================================

    /// Chemin navigué au démarrage (default: `/`)
    fn get_browser_initial_path(&self) -> Result<String>;

    fn set_browser_initial_path(&self, path: &str) -> Result<()>;

    /// File de lecture réduite à la piste choisie (default: `false`)
    fn get_browser_single_track(&self) -> Result<bool>;

    fn set_browser_single_track(&self, single_track: bool) -> Result<()>;

    // ========================================================================
    // Cache
    // ========================================================================

    /// Nombre maximal de chemins résolus gardés en cache (default: 256)
    fn get_browser_cache_max_paths(&self) -> Result<u64>;

    fn set_browser_cache_max_paths(&self, max_paths: u64) -> Result<()>;

    /// Nombre maximal de pistes indexées (default: 4096)
    fn get_browser_cache_max_tracks(&self) -> Result<u64>;

    fn set_browser_cache_max_tracks(&self, max_tracks: u64) -> Result<()>;

    /// Durée de vie des entrées en secondes, `0` pour ne jamais expirer
    fn get_browser_cache_ttl_secs(&self) -> Result<u64>;

    fn set_browser_cache_ttl_secs(&self, ttl_secs: u64) -> Result<()>;

    /// Limites des caches regroupées
    fn get_browser_cache_settings(&self) -> Result<CacheSettings> {
        let ttl = match self.get_browser_cache_ttl_secs()? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Ok(CacheSettings {
            max_paths: self.get_browser_cache_max_paths()?,
            max_tracks: self.get_browser_cache_max_tracks()?,
            ttl,
        })
    }

    // ========================================================================
    // Requêtes
    // ========================================================================

    /// URL de base des sources `request`
    ///
    /// # Returns
    ///
    /// `None` si aucune URL n'est configurée (pas de valeur par défaut).
    fn get_browser_base_url(&self) -> Result<Option<String>>;

    fn set_browser_base_url(&self, base_url: &str) -> Result<()>;

    /// Timeout des requêtes HTTP en secondes (default: 30)
    fn get_browser_request_timeout_secs(&self) -> Result<u64>;

    fn set_browser_request_timeout_secs(&self, timeout_secs: u64) -> Result<()>;
}

impl BrowserConfigExt for Config {
    fn get_browser_initial_path(&self) -> Result<String> {
        match self.get_value(&["browser", "initial_path"]) {
            Ok(Value::String(path)) if !path.is_empty() => Ok(path),
            _ => {
                self.set_browser_initial_path(DEFAULT_INITIAL_PATH)?;
                Ok(DEFAULT_INITIAL_PATH.to_string())
            }
        }
    }

    fn set_browser_initial_path(&self, path: &str) -> Result<()> {
        self.set_value(&["browser", "initial_path"], Value::String(path.to_string()))
    }

    fn get_browser_single_track(&self) -> Result<bool> {
        match self.get_value(&["browser", "single_track"]) {
            Ok(Value::Bool(b)) => Ok(b),
            _ => {
                self.set_browser_single_track(false)?;
                Ok(false)
            }
        }
    }

    fn set_browser_single_track(&self, single_track: bool) -> Result<()> {
        self.set_value(&["browser", "single_track"], Value::Bool(single_track))
    }

    fn get_browser_cache_max_paths(&self) -> Result<u64> {
        get_u64_or_default(self, &["browser", "cache", "max_paths"], DEFAULT_MAX_PATHS)
    }

    fn set_browser_cache_max_paths(&self, max_paths: u64) -> Result<()> {
        self.set_value(
            &["browser", "cache", "max_paths"],
            Value::Number(Number::from(max_paths)),
        )
    }

    fn get_browser_cache_max_tracks(&self) -> Result<u64> {
        get_u64_or_default(self, &["browser", "cache", "max_tracks"], DEFAULT_MAX_TRACKS)
    }

    fn set_browser_cache_max_tracks(&self, max_tracks: u64) -> Result<()> {
        self.set_value(
            &["browser", "cache", "max_tracks"],
            Value::Number(Number::from(max_tracks)),
        )
    }

    fn get_browser_cache_ttl_secs(&self) -> Result<u64> {
        get_u64_or_default(self, &["browser", "cache", "ttl_secs"], 0)
    }

    fn set_browser_cache_ttl_secs(&self, ttl_secs: u64) -> Result<()> {
        self.set_value(
            &["browser", "cache", "ttl_secs"],
            Value::Number(Number::from(ttl_secs)),
        )
    }

    fn get_browser_base_url(&self) -> Result<Option<String>> {
        match self.get_value(&["browser", "request", "base_url"]) {
            Ok(Value::String(url)) if !url.is_empty() => Ok(Some(url)),
            _ => Ok(None),
        }
    }

    fn set_browser_base_url(&self, base_url: &str) -> Result<()> {
        self.set_value(
            &["browser", "request", "base_url"],
            Value::String(base_url.to_string()),
        )
    }

    fn get_browser_request_timeout_secs(&self) -> Result<u64> {
        get_u64_or_default(
            self,
            &["browser", "request", "timeout_secs"],
            DEFAULT_TIMEOUT_SECS,
        )
    }

    fn set_browser_request_timeout_secs(&self, timeout_secs: u64) -> Result<()> {
        self.set_value(
            &["browser", "request", "timeout_secs"],
            Value::Number(Number::from(timeout_secs)),
        )
    }
}

/// Lit un entier positif, ou persiste et renvoie `default`
fn get_u64_or_default(config: &Config, path: &[&str], default: u64) -> Result<u64> {
    if let Ok(Value::Number(n)) = config.get_value(path) {
        if let Some(value) = n.as_u64() {
            return Ok(value);
        }
    }
    config.set_value(path, Value::Number(Number::from(default)))?;
    Ok(default)
}

impl BrowserConfigBuilder {
    /// Applique les réglages `browser` de pmoconfig
    ///
    /// Quand une URL de base est configurée et qu'aucun transport n'a été
    /// fourni, un [`HttpTransport`] utilisant le timeout configuré est
    /// installé.
    pub fn with_settings(self, config: &Config) -> Result<Self> {
        let mut builder = self
            .cache(config.get_browser_cache_settings()?)
            .single_track(config.get_browser_single_track()?)
            .initial_path(config.get_browser_initial_path()?);

        if let Some(base_url) = config.get_browser_base_url()? {
            debug!(base_url = %base_url, "Using configured base URL");
            builder = builder.base_url(base_url);

            if !builder.has_transport() {
                let timeout = Duration::from_secs(config.get_browser_request_timeout_secs()?);
                builder = builder.transport(Arc::new(HttpTransport::with_timeout(timeout)?));
            }
        }

        Ok(builder)
    }
}
