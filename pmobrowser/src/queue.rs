//! Queue expansion from a contextual URL
//!
//! External controllers hand back a single identifier for the item to play.
//! When that identifier is a contextual URL, its parent node is resolved
//! again (cache first) and the playable siblings become the playback queue.
//!
//! Expansion never touches the published navigation state, so it can be
//! called speculatively. Failures yield `None`: callers fall back to loading
//! the single track.

use crate::contextual_url;
use crate::models::Track;
use crate::resolver::ContentResolver;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Playback queue rebuilt from a contextual URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedQueue {
    pub tracks: Vec<Track>,
    pub selected_index: usize,
}

impl ExpandedQueue {
    pub fn selected(&self) -> Option<&Track> {
        self.tracks.get(self.selected_index)
    }
}

/// Why an expansion gave up
#[derive(Debug, Error)]
enum ExpansionFailure {
    #[error("URL carries no track identifier")]
    NotContextual,
    #[error("parent could not be resolved: {0}")]
    Unresolved(#[from] crate::error::BrowserError),
    #[error("parent has no children")]
    NoChildren,
    #[error("parent has no playable children")]
    NothingPlayable,
    #[error("track is not among the parent's playable children")]
    TrackNotFound,
}

/// Rebuilds playback queues from contextual URLs
pub struct QueueExpander {
    resolver: Arc<ContentResolver>,
    single_track: bool,
}

impl QueueExpander {
    pub fn new(resolver: Arc<ContentResolver>, single_track: bool) -> Self {
        Self {
            resolver,
            single_track,
        }
    }

    /// Expands `contextual_url` into its playable siblings and selected index
    pub async fn expand(&self, contextual_url: &str) -> Option<ExpandedQueue> {
        match self.try_expand(contextual_url).await {
            Ok(queue) => {
                debug!(
                    url = %contextual_url,
                    tracks = queue.tracks.len(),
                    selected = queue.selected_index,
                    "Queue expanded"
                );
                Some(queue)
            }
            Err(reason) => {
                debug!(url = %contextual_url, reason = %reason, "Queue expansion skipped");
                None
            }
        }
    }

    async fn try_expand(&self, url: &str) -> Result<ExpandedQueue, ExpansionFailure> {
        let track_id =
            contextual_url::extract_track_id(url).ok_or(ExpansionFailure::NotContextual)?;
        let parent_path = contextual_url::strip_track_id(url);

        let parent = self.resolver.resolve_path(&parent_path).await?;
        if parent.children().is_empty() {
            return Err(ExpansionFailure::NoChildren);
        }

        let playable = parent.playable_children();
        if playable.is_empty() {
            return Err(ExpansionFailure::NothingPlayable);
        }

        let index = playable
            .iter()
            .position(|track| track.src.as_deref() == Some(track_id.as_str()))
            .ok_or(ExpansionFailure::TrackNotFound)?;

        if self.single_track {
            let selected = playable.into_iter().nth(index).into_iter().collect();
            return Ok(ExpandedQueue {
                tracks: selected,
                selected_index: 0,
            });
        }

        Ok(ExpandedQueue {
            tracks: playable,
            selected_index: index,
        })
    }
}
