//! # Track Snapshot
//!
//! Display fields for one track, resolved fresh for every load. The three
//! lookups run concurrently and are joined before anything is published: a
//! failure in any of them, or a missing file path, aborts the whole load.

use bridge_traits::media::{MediaIndex, TrackId};
use bridge_traits::BridgeError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, instrument};

use crate::error::{PlaybackError, Result};

const UNKNOWN_ARTIST: &str = "Unknown artist";

/// Resolved display fields for one track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSnapshot {
    pub id: TrackId,
    pub path: String,
    pub display_name: Option<String>,
    pub artist_name: Option<String>,
}

impl TrackSnapshot {
    /// Display name, or the file name when the index has none.
    pub fn title(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| {
                Path::new(&self.path)
                    .file_name()
                    .and_then(|name| name.to_str())
                    .unwrap_or(&self.path)
            })
    }

    pub fn subtitle(&self) -> &str {
        self.artist_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_ARTIST)
    }
}

/// Resolves a snapshot with three concurrent lookups.
#[instrument(skip(index), fields(track_id = %id))]
pub async fn resolve(index: &dyn MediaIndex, id: TrackId) -> Result<TrackSnapshot> {
    let lookup = |source: BridgeError| PlaybackError::MetadataLookup {
        track_id: id,
        source,
    };

    let (path, display_name, artist_name) = futures::try_join!(
        async { index.data_path(id).await.map_err(lookup) },
        async { index.display_name(id).await.map_err(lookup) },
        async { index.artist_name(id).await.map_err(lookup) },
    )?;

    let path = path.ok_or(PlaybackError::MetadataNotFound {
        track_id: id,
        field: "data_path",
    })?;

    debug!(
        has_display_name = display_name.is_some(),
        has_artist = artist_name.is_some(),
        "Track snapshot resolved"
    );

    Ok(TrackSnapshot {
        id,
        path,
        display_name,
        artist_name,
    })
}
