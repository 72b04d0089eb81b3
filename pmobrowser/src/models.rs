//! Content model shared by the router, the resolver and the controller.
//!
//! A [`Track`] is either browsable (`url`), playable (`src`) or both.
//! A [`ResolvedTrack`] is the content node obtained by resolving a path.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resolved artwork location, produced by an artwork transformer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtworkSource {
    pub uri: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

/// A browsable and/or playable entry of the catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Navigation target. Present means browsable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Media identifier. Present means playable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork_source: Option<ArtworkSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    /// Duration in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `None` defers to the favorite store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorited: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_title: Option<String>,
}

impl Track {
    /// Creates a browsable-only entry
    pub fn browsable(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Creates a playable-only entry
    pub fn playable(title: impl Into<String>, src: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            src: Some(src.into()),
            ..Default::default()
        }
    }

    pub fn is_browsable(&self) -> bool {
        self.url.is_some()
    }

    pub fn is_playable(&self) -> bool {
        self.src.is_some()
    }

    /// A track must carry at least one of `url` or `src`
    pub fn is_valid(&self) -> bool {
        self.is_browsable() || self.is_playable()
    }

    /// Identifier under which the track is indexed, if any
    pub fn identifier(&self) -> Option<&str> {
        self.url.as_deref().or(self.src.as_deref())
    }
}

/// Content node obtained by resolving a path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTrack {
    /// Identity of the node, equal to the resolved path
    #[serde(default)]
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork_source: Option<ArtworkSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Track>>,
}

impl ResolvedTrack {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_children(mut self, children: Vec<Track>) -> Self {
        self.children = Some(children);
        self
    }

    /// Children as a slice, empty when the node has none
    pub fn children(&self) -> &[Track] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Playable children only, in their original order
    pub fn playable_children(&self) -> Vec<Track> {
        self.children()
            .iter()
            .filter(|track| track.is_playable())
            .cloned()
            .collect()
    }
}
