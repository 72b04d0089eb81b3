//! Artwork transformation applied after content is fetched
//!
//! The controller asks an [`ArtworkTransformer`] for the artwork source of the
//! resolved node and of each child. [`QueryArtworkTransformer`] is the
//! built-in implementation: it resolves relative artwork against a base URL
//! and appends the configured size and query parameters.

use crate::models::{ArtworkSource, ResolvedTrack, Track};
use crate::transport::join_url;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use url::Url;

/// Artwork settings shared by every transformation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtworkConfig {
    /// Base URL for relative artwork paths
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Extra query parameters added to every artwork URL
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query: BTreeMap<String, String>,
    /// Headers the image loader must send
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// What the artwork is requested for
#[derive(Debug, Clone, Copy)]
pub enum ArtworkTarget<'a> {
    Node(&'a ResolvedTrack),
    Track(&'a Track),
}

impl ArtworkTarget<'_> {
    pub fn artwork(&self) -> Option<&str> {
        match self {
            ArtworkTarget::Node(node) => node.artwork.as_deref(),
            ArtworkTarget::Track(track) => track.artwork.as_deref(),
        }
    }
}

/// Host-provided artwork resolution
#[async_trait]
pub trait ArtworkTransformer: Send + Sync {
    /// Returns the artwork source to display, or `None` to leave it unset
    async fn resolve(
        &self,
        target: ArtworkTarget<'_>,
        config: &ArtworkConfig,
    ) -> Option<ArtworkSource>;
}

/// Appends size and query parameters to the artwork URL
///
/// Relative artwork is resolved against `base_url`; without one it is left
/// unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryArtworkTransformer;

#[async_trait]
impl ArtworkTransformer for QueryArtworkTransformer {
    async fn resolve(
        &self,
        target: ArtworkTarget<'_>,
        config: &ArtworkConfig,
    ) -> Option<ArtworkSource> {
        let artwork = target.artwork()?;

        let parsed = match (Url::parse(artwork), &config.base_url) {
            (Ok(url), _) => Ok(url),
            (Err(url::ParseError::RelativeUrlWithoutBase), Some(base)) => join_url(base, artwork),
            (Err(e), _) => Err(e),
        };
        let mut url = match parsed {
            Ok(url) => url,
            Err(e) => {
                debug!(artwork, error = %e, "Artwork is not a usable URL");
                return None;
            }
        };

        let mut params: Vec<(&str, String)> = config
            .query
            .iter()
            .map(|(k, v)| (k.as_str(), v.clone()))
            .collect();
        if let Some(width) = config.width {
            params.push(("width", width.to_string()));
        }
        if let Some(height) = config.height {
            params.push(("height", height.to_string()));
        }
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        let uri = String::from(url);

        Some(ArtworkSource {
            uri,
            headers: config.headers.clone(),
        })
    }
}
