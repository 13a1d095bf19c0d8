//! Media index bridge.
//!
//! The host's media index (MediaStore on Android, the library database on
//! desktop) enumerates audio files and resolves per-track display fields. The
//! core treats it as a read-only, side-effect-free collaborator: every call is
//! an independent lookup and results are never cached by the bridge.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Opaque key into the host media index.
///
/// Identifiers are assigned by the host and never generated by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(i64);

impl TrackId {
    /// Wrap a raw media-index key.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw media-index key.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for TrackId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order in which the media index enumerates tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Most recently added files follow older ones.
    DateAdded,
    /// Alphabetical by file display name.
    #[default]
    DisplayName,
}

impl SortOrder {
    /// Every order, in the sequence a picker should list them.
    pub const ALL: [SortOrder; 2] = [SortOrder::DateAdded, SortOrder::DisplayName];

    /// User-facing label for sort pickers.
    pub fn label(self) -> &'static str {
        match self {
            SortOrder::DateAdded => "Date added",
            SortOrder::DisplayName => "Name",
        }
    }

    /// Column/key name hosts can map onto their query API.
    pub fn column(self) -> &'static str {
        match self {
            SortOrder::DateAdded => "date_added",
            SortOrder::DisplayName => "display_name",
        }
    }
}

/// Read-only access to the host media index.
///
/// Lookups return `Ok(None)` when the identifier is unknown or the column is
/// unset, so callers can tell "not found" apart from a genuinely blank value.
/// Transport-level failures (cursor errors, revoked storage access) are
/// reported as `Err`.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::media::{MediaIndex, SortOrder};
///
/// async fn first_title(index: &dyn MediaIndex) -> Result<Option<String>> {
///     let ids = index.list_tracks(SortOrder::DisplayName).await?;
///     match ids.first() {
///         Some(id) => index.display_name(*id).await,
///         None => Ok(None),
///     }
/// }
/// ```
#[async_trait]
pub trait MediaIndex: Send + Sync {
    /// Enumerate every audio track in the requested order.
    async fn list_tracks(&self, order: SortOrder) -> Result<Vec<TrackId>>;

    /// Absolute file path of the track's audio data.
    async fn data_path(&self, id: TrackId) -> Result<Option<String>>;

    /// File display name (title shown in lists and the notification).
    async fn display_name(&self, id: TrackId) -> Result<Option<String>>;

    /// Album name.
    async fn album_name(&self, id: TrackId) -> Result<Option<String>>;

    /// Artist name.
    async fn artist_name(&self, id: TrackId) -> Result<Option<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sort_is_display_name() {
        assert_eq!(SortOrder::default(), SortOrder::DisplayName);
        assert_eq!(SortOrder::ALL.len(), 2);
        assert_eq!(SortOrder::DateAdded.label(), "Date added");
        assert_eq!(SortOrder::DisplayName.column(), "display_name");
    }

    #[test]
    fn track_id_serializes_as_plain_integer() {
        let id = TrackId::new(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        assert_eq!(serde_json::from_str::<TrackId>("7").unwrap(), TrackId::from(7));
        assert_eq!(id.to_string(), "42");
    }
}
