//! Browsing list and next-track computation.

use bridge_traits::media::TrackId;
use std::sync::Arc;

use crate::error::{PlaybackError, Result};

/// Ordered track identifiers produced by one sort-order query.
///
/// Cheap to clone; the list is replaced wholesale on reload and never mutated
/// in place.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BrowsingList {
    ids: Arc<[TrackId]>,
}

impl BrowsingList {
    pub fn new(ids: Vec<TrackId>) -> Self {
        Self { ids: ids.into() }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[TrackId] {
        &self.ids
    }

    pub fn get(&self, index: usize) -> Option<TrackId> {
        self.ids.get(index).copied()
    }

    /// Index of the first occurrence of `id`.
    pub fn position(&self, id: TrackId) -> Option<usize> {
        self.ids.iter().position(|candidate| *candidate == id)
    }

    pub fn contains(&self, id: TrackId) -> bool {
        self.position(id).is_some()
    }

    /// The track after `current`, wrapping to the front at the end.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::EmptyBrowsingList`] when there is nothing to advance to
    /// - [`PlaybackError::TrackNotInBrowsingList`] when `current` is not listed
    pub fn next_after(&self, current: TrackId) -> Result<TrackId> {
        if self.ids.is_empty() {
            return Err(PlaybackError::EmptyBrowsingList);
        }

        let index = self
            .position(current)
            .ok_or(PlaybackError::TrackNotInBrowsingList(current))?;

        Ok(self.ids[(index + 1) % self.ids.len()])
    }
}

impl From<Vec<TrackId>> for BrowsingList {
    fn from(ids: Vec<TrackId>) -> Self {
        Self::new(ids)
    }
}

impl FromIterator<TrackId> for BrowsingList {
    fn from_iter<I: IntoIterator<Item = TrackId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}
