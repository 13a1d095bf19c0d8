//! # Session View-State Coordinator
//!
//! UI-facing state for the browsing and now-playing screens:
//!
//! - the browsing list for the selected sort order, with an explicit
//!   `Loading` sentinel distinct from an empty result
//! - the track the user asked to play, as a single-consumption event
//! - position and duration, as single-consumption events fed by the binding
//!   controller's tick
//! - next-track computation against the loaded browsing list
//!
//! Metadata lookups go straight to the media index: one query per call, no
//! batching or caching.

use bridge_traits::media::{MediaIndex, SortOrder, TrackId};
use bridge_traits::BridgeError;
use core_async::sync::watch;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::browsing::BrowsingList;
use crate::error::{PlaybackError, Result};
use crate::event::{EventCell, EventSubscription, ReplayPolicy};

/// Load state of the browsing list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BrowsingListState {
    #[default]
    NotLoaded,
    Loading,
    Loaded(BrowsingList),
    Failed {
        message: String,
    },
}

impl BrowsingListState {
    pub fn list(&self) -> Option<&BrowsingList> {
        match self {
            BrowsingListState::Loaded(list) => Some(list),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, BrowsingListState::Loading)
    }
}

/// Playback order selector shown on the now-playing screen.
///
/// Only cycles the selection; advancing always follows list order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayMode {
    #[default]
    RepeatAll,
    RepeatOne,
    Shuffle,
}

impl PlayMode {
    pub fn next(self) -> Self {
        match self {
            PlayMode::RepeatAll => PlayMode::RepeatOne,
            PlayMode::RepeatOne => PlayMode::Shuffle,
            PlayMode::Shuffle => PlayMode::RepeatAll,
        }
    }
}

pub struct SessionCoordinator {
    index: Arc<dyn MediaIndex>,
    list: watch::Sender<BrowsingListState>,
    current: EventCell<TrackId>,
    position: EventCell<Duration>,
    duration: EventCell<Duration>,
    play_mode: Mutex<PlayMode>,
}

impl SessionCoordinator {
    pub fn new(index: Arc<dyn MediaIndex>) -> Self {
        let (list, _) = watch::channel(BrowsingListState::NotLoaded);
        Self {
            index,
            list,
            current: EventCell::new(),
            position: EventCell::new(),
            duration: EventCell::new(),
            play_mode: Mutex::new(PlayMode::default()),
        }
    }

    // ------------------------------------------------------------------------
    // Play intents
    // ------------------------------------------------------------------------

    /// Publishes a new "currently playing" event for `id`.
    ///
    /// Returns the event's sequence number.
    pub fn on_play_music(&self, id: TrackId) -> u64 {
        let sequence = self.current.publish(id);
        debug!(track_id = %id, sequence, "Play intent recorded");
        sequence
    }

    /// Advances to the track after the current one and publishes it.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::BrowsingListNotLoaded`] while the list is loading or failed
    /// - [`PlaybackError::EmptyBrowsingList`] when the loaded list is empty
    /// - [`PlaybackError::NoActiveSession`] when nothing was played yet
    /// - [`PlaybackError::TrackNotInBrowsingList`] when the current track was
    ///   dropped by a reload
    pub fn on_play_next_music(&self) -> Result<TrackId> {
        let list = self
            .browsing_list()
            .ok_or(PlaybackError::BrowsingListNotLoaded)?;
        if list.is_empty() {
            return Err(PlaybackError::EmptyBrowsingList);
        }

        let current = self
            .current
            .peek_value()
            .ok_or(PlaybackError::NoActiveSession)?;
        let next = list.next_after(current)?;
        self.on_play_music(next);
        Ok(next)
    }

    /// The most recently requested track, without consuming its event.
    pub fn current_track(&self) -> Option<TrackId> {
        self.current.peek_value()
    }

    pub fn subscribe_current(&self, policy: ReplayPolicy) -> EventSubscription<TrackId> {
        self.current.subscribe(policy)
    }

    // ------------------------------------------------------------------------
    // Metadata lookups
    // ------------------------------------------------------------------------

    pub async fn display_name(&self, id: TrackId) -> Result<Option<String>> {
        self.index
            .display_name(id)
            .await
            .map_err(|source| lookup_error(id, source))
    }

    pub async fn album_name(&self, id: TrackId) -> Result<Option<String>> {
        self.index
            .album_name(id)
            .await
            .map_err(|source| lookup_error(id, source))
    }

    /// File path of the track.
    pub async fn data_path(&self, id: TrackId) -> Result<Option<String>> {
        self.index
            .data_path(id)
            .await
            .map_err(|source| lookup_error(id, source))
    }

    pub async fn artist_name(&self, id: TrackId) -> Result<Option<String>> {
        self.index
            .artist_name(id)
            .await
            .map_err(|source| lookup_error(id, source))
    }

    // ------------------------------------------------------------------------
    // Browsing list
    // ------------------------------------------------------------------------

    /// Reloads the browsing list for `order`.
    ///
    /// The list reads as [`BrowsingListState::Loading`] until the query
    /// completes. Overlapping reloads are not serialized: whichever finishes
    /// last is what the list shows.
    #[instrument(skip(self))]
    pub async fn on_load_musics_list(&self, order: SortOrder) -> Result<BrowsingList> {
        self.list.send_replace(BrowsingListState::Loading);

        match self.index.list_tracks(order).await {
            Ok(ids) => {
                let list = BrowsingList::new(ids);
                debug!(tracks = list.len(), "Browsing list loaded");
                self.list
                    .send_replace(BrowsingListState::Loaded(list.clone()));
                Ok(list)
            }
            Err(e) => {
                warn!(error = %e, "Browsing list query failed");
                self.list.send_replace(BrowsingListState::Failed {
                    message: e.to_string(),
                });
                Err(PlaybackError::Bridge(e))
            }
        }
    }

    pub fn browsing_list(&self) -> Option<BrowsingList> {
        self.list.borrow().list().cloned()
    }

    pub fn list_state(&self) -> BrowsingListState {
        self.list.borrow().clone()
    }

    pub fn subscribe_list(&self) -> watch::Receiver<BrowsingListState> {
        self.list.subscribe()
    }

    // ------------------------------------------------------------------------
    // Progress
    // ------------------------------------------------------------------------

    /// Publishes fresh position and duration events.
    pub fn publish_progress(&self, position: Duration, duration: Duration) {
        self.position.publish(position);
        self.duration.publish(duration);
    }

    pub fn subscribe_position(&self, policy: ReplayPolicy) -> EventSubscription<Duration> {
        self.position.subscribe(policy)
    }

    pub fn subscribe_duration(&self, policy: ReplayPolicy) -> EventSubscription<Duration> {
        self.duration.subscribe(policy)
    }

    // ------------------------------------------------------------------------
    // Play mode
    // ------------------------------------------------------------------------

    pub fn play_mode(&self) -> PlayMode {
        *self.play_mode.lock()
    }

    pub fn cycle_play_mode(&self) -> PlayMode {
        let mut mode = self.play_mode.lock();
        *mode = mode.next();
        *mode
    }
}

fn lookup_error(track_id: TrackId, source: BridgeError) -> PlaybackError {
    PlaybackError::MetadataLookup { track_id, source }
}

impl std::fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCoordinator")
            .field("list", &*self.list.borrow())
            .field("current", &self.current_track())
            .field("play_mode", &self.play_mode())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use core_async::time::sleep;

    struct StaticIndex {
        tracks: Vec<TrackId>,
        delay: Duration,
    }

    impl StaticIndex {
        fn new(raw: &[i64]) -> Self {
            Self {
                tracks: raw.iter().copied().map(TrackId::new).collect(),
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl MediaIndex for StaticIndex {
        async fn list_tracks(&self, _order: SortOrder) -> BridgeResult<Vec<TrackId>> {
            sleep(self.delay).await;
            Ok(self.tracks.clone())
        }

        async fn data_path(&self, id: TrackId) -> BridgeResult<Option<String>> {
            Ok(self.tracks.contains(&id).then(|| format!("/music/{id}.mp3")))
        }

        async fn display_name(&self, id: TrackId) -> BridgeResult<Option<String>> {
            Ok(self.tracks.contains(&id).then(|| format!("Track {id}")))
        }

        async fn album_name(&self, _id: TrackId) -> BridgeResult<Option<String>> {
            Err(BridgeError::QueryFailed("album column missing".to_string()))
        }

        async fn artist_name(&self, _id: TrackId) -> BridgeResult<Option<String>> {
            Ok(None)
        }
    }

    #[core_async::test]
    async fn next_wraps_around_loaded_list() {
        let coordinator = SessionCoordinator::new(Arc::new(StaticIndex::new(&[10, 20, 30])));
        coordinator
            .on_load_musics_list(SortOrder::DisplayName)
            .await
            .unwrap();

        coordinator.on_play_music(TrackId::new(30));
        assert_eq!(coordinator.on_play_next_music().unwrap(), TrackId::new(10));
        assert_eq!(coordinator.current_track(), Some(TrackId::new(10)));
    }

    #[core_async::test]
    async fn empty_list_is_guarded() {
        let coordinator = SessionCoordinator::new(Arc::new(StaticIndex::new(&[])));
        coordinator
            .on_load_musics_list(SortOrder::DateAdded)
            .await
            .unwrap();
        coordinator.on_play_music(TrackId::new(1));

        assert!(matches!(
            coordinator.on_play_next_music(),
            Err(PlaybackError::EmptyBrowsingList)
        ));
    }

    #[test]
    fn next_requires_loaded_list_and_current_track() {
        let coordinator = SessionCoordinator::new(Arc::new(StaticIndex::new(&[1])));
        assert!(matches!(
            coordinator.on_play_next_music(),
            Err(PlaybackError::BrowsingListNotLoaded)
        ));
    }

    #[core_async::test]
    async fn next_without_current_track_is_no_session() {
        let coordinator = SessionCoordinator::new(Arc::new(StaticIndex::new(&[1, 2])));
        coordinator
            .on_load_musics_list(SortOrder::DisplayName)
            .await
            .unwrap();
        assert!(matches!(
            coordinator.on_play_next_music(),
            Err(PlaybackError::NoActiveSession)
        ));
    }

    #[core_async::test(start_paused)]
    async fn loading_sentinel_is_visible_during_query() {
        let index = StaticIndex {
            tracks: vec![TrackId::new(5)],
            delay: Duration::from_millis(20),
        };
        let coordinator = Arc::new(SessionCoordinator::new(Arc::new(index)));
        let mut states = coordinator.subscribe_list();

        let loader = Arc::clone(&coordinator);
        let load = core_async::task::spawn(async move {
            loader.on_load_musics_list(SortOrder::DisplayName).await
        });

        states.changed().await.unwrap();
        assert!(states.borrow_and_update().is_loading());

        let list = load.await.unwrap().unwrap();
        assert_eq!(list.ids(), &[TrackId::new(5)]);
        assert_eq!(coordinator.list_state(), BrowsingListState::Loaded(list));
    }

    #[test]
    fn late_observer_does_not_see_consumed_intent() {
        let coordinator = SessionCoordinator::new(Arc::new(StaticIndex::new(&[1])));
        coordinator.on_play_music(TrackId::new(1));

        let mut first = coordinator.subscribe_current(ReplayPolicy::SkipDelivered);
        assert_eq!(first.try_next(), Some(TrackId::new(1)));

        let mut rotated = coordinator.subscribe_current(ReplayPolicy::SkipDelivered);
        assert_eq!(rotated.try_next(), None);

        let mut replay = coordinator.subscribe_current(ReplayPolicy::Always);
        assert_eq!(replay.try_next(), Some(TrackId::new(1)));
    }

    #[core_async::test]
    async fn lookups_pass_through_not_found_and_errors() {
        let coordinator = SessionCoordinator::new(Arc::new(StaticIndex::new(&[4])));
        assert_eq!(
            coordinator.display_name(TrackId::new(4)).await.unwrap(),
            Some("Track 4".to_string())
        );
        assert_eq!(coordinator.data_path(TrackId::new(9)).await.unwrap(), None);
        assert_eq!(coordinator.artist_name(TrackId::new(4)).await.unwrap(), None);
        assert!(coordinator
            .album_name(TrackId::new(4))
            .await
            .unwrap_err()
            .is_transient());
    }

    #[test]
    fn progress_events_are_single_consumption() {
        let coordinator = SessionCoordinator::new(Arc::new(StaticIndex::new(&[])));
        let mut position = coordinator.subscribe_position(ReplayPolicy::SkipDelivered);
        coordinator.publish_progress(Duration::from_secs(3), Duration::from_secs(200));

        assert_eq!(position.try_next(), Some(Duration::from_secs(3)));
        assert_eq!(position.try_next(), None);

        let mut duration = coordinator.subscribe_duration(ReplayPolicy::SkipDelivered);
        assert_eq!(duration.try_next(), Some(Duration::from_secs(200)));
    }

    #[test]
    fn play_mode_cycles() {
        let coordinator = SessionCoordinator::new(Arc::new(StaticIndex::new(&[])));
        assert_eq!(coordinator.play_mode(), PlayMode::RepeatAll);
        assert_eq!(coordinator.cycle_play_mode(), PlayMode::RepeatOne);
        assert_eq!(coordinator.cycle_play_mode(), PlayMode::Shuffle);
        assert_eq!(coordinator.cycle_play_mode(), PlayMode::RepeatAll);
    }
}
