#![cfg(feature = "desktop-shims")]

use async_trait::async_trait;
use bridge_traits::audio::{AudioOutput, AudioStream};
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::media::{SortOrder, TrackId};
use bridge_traits::permission::{Permission, PermissionGate, PermissionStatus};
use core_async::sync::CancellationToken;
use core_async::time::{timeout, Duration};
use core_playback::{BindingStatus, BrowsingListState, PlaybackError, ServiceState, SessionConfig};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, PlaybackEvent, Receiver};
use core_service::{
    CoreError, DirectoryMediaIndex, GrantedPermissionGate, PlayerCore, TracingForegroundHost,
};
use mockall::mock;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Output whose streams are prepared as soon as they are opened.
struct InstantOutput;

#[derive(Default)]
struct InstantStream {
    playing: AtomicBool,
}

#[async_trait]
impl AudioOutput for InstantOutput {
    async fn open(&self, _path: &Path) -> BridgeResult<Arc<dyn AudioStream>> {
        Ok(Arc::new(InstantStream::default()))
    }
}

#[async_trait]
impl AudioStream for InstantStream {
    async fn prepared(&self) -> BridgeResult<()> {
        Ok(())
    }

    fn start(&self) -> BridgeResult<()> {
        self.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&self) -> BridgeResult<()> {
        self.playing.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn seek(&self, _position: Duration) -> BridgeResult<()> {
        Ok(())
    }

    fn stop(&self) -> BridgeResult<()> {
        self.playing.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn release(&self) {}

    fn position(&self) -> Duration {
        Duration::ZERO
    }

    fn duration(&self) -> Duration {
        Duration::from_secs(240)
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

mock! {
    Gate {}

    #[async_trait]
    impl PermissionGate for Gate {
        fn is_required(&self, permission: Permission) -> bool;
        async fn request(&self, permission: Permission) -> BridgeResult<PermissionStatus>;
    }
}

fn music_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    for name in ["Artist/Album/one.mp3", "Artist/Album/two.mp3"] {
        let path = dir.path().join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"audio").unwrap();
    }
    dir
}

fn config(dir: &TempDir, gate: Arc<dyn PermissionGate>) -> CoreConfig {
    CoreConfig::builder()
        .media_index(Arc::new(DirectoryMediaIndex::new(dir.path())))
        .audio_output(Arc::new(InstantOutput))
        .foreground_host(Arc::new(TracingForegroundHost::new()))
        .permission_gate(gate)
        .build()
        .unwrap()
}

async fn wait_for_started(events: &mut Receiver<CoreEvent>, id: TrackId) {
    timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(CoreEvent::Playback(PlaybackEvent::Started { track_id, .. })) =
                events.recv().await
            {
                if track_id == id {
                    return;
                }
            }
        }
    })
    .await
    .expect("track never started");
}

#[core_async::test]
async fn test_bootstrap_rejects_invalid_session_config() {
    let dir = music_dir();
    let session = SessionConfig::default().with_tick_interval(Duration::ZERO);

    let result = PlayerCore::bootstrap(
        config(&dir, Arc::new(GrantedPermissionGate::new())),
        session,
    );
    assert!(matches!(
        result,
        Err(CoreError::Playback(PlaybackError::Config(_)))
    ));
}

#[core_async::test]
async fn test_library_permission_denied() {
    let dir = music_dir();
    let mut gate = MockGate::new();
    gate.expect_is_required().return_const(true);
    gate.expect_request()
        .withf(|permission| *permission == Permission::ReadMediaLibrary)
        .times(1)
        .returning(|_| Ok(PermissionStatus::Denied));

    let core =
        PlayerCore::bootstrap(config(&dir, Arc::new(gate)), SessionConfig::default()).unwrap();
    let error = core.load_library(SortOrder::DisplayName).await.unwrap_err();

    assert!(matches!(
        error,
        CoreError::PermissionDenied(Permission::ReadMediaLibrary)
    ));
    assert!(error.is_user_actionable());
    assert_eq!(core.coordinator().list_state(), BrowsingListState::NotLoaded);
}

#[core_async::test]
async fn test_next_before_library_is_precondition_error() {
    let dir = music_dir();
    let core = PlayerCore::bootstrap(
        config(&dir, Arc::new(GrantedPermissionGate::new())),
        SessionConfig::default(),
    )
    .unwrap();

    let error = core.play_next().unwrap_err();
    assert!(matches!(
        error,
        CoreError::Playback(PlaybackError::BrowsingListNotLoaded)
    ));
    assert!(error.is_user_actionable());
    assert!(matches!(
        core.pause_resume().await,
        Err(CoreError::Playback(PlaybackError::NoActiveSession))
    ));
    assert!(core.stop().await.is_ok());
}

#[core_async::test]
async fn test_play_through_desktop_shims() {
    let dir = music_dir();
    let core = PlayerCore::bootstrap(
        config(&dir, Arc::new(GrantedPermissionGate::new())),
        SessionConfig::default(),
    )
    .unwrap();
    let mut events = core.subscribe_events();
    let controller = core.spawn_controller(CancellationToken::new());

    let list = core.load_library(SortOrder::DisplayName).await.unwrap();
    assert_eq!(list.len(), 2);
    let first = list.get(0).unwrap();

    core.play(first);
    wait_for_started(&mut events, first).await;

    let status = core.status().await.unwrap();
    assert_eq!(status.state, ServiceState::Playing);
    assert_eq!(status.browsing_len, 2);
    assert_eq!(
        status.track.as_ref().and_then(|track| track.display_name.as_deref()),
        Some("one.mp3")
    );
    let mut binding = controller.subscribe_status();
    timeout(
        Duration::from_secs(5),
        binding.wait_for(|status| {
            matches!(status, BindingStatus::Starting { track_id, .. } if *track_id == first)
        }),
    )
    .await
    .unwrap()
    .unwrap();

    let second = core.play_next().unwrap();
    assert_eq!(second, list.get(1).unwrap());
    wait_for_started(&mut events, second).await;

    assert!(!core.pause_resume().await.unwrap());
    core.stop().await.unwrap();
    assert!(core.status().await.is_none());

    controller.shutdown().await.unwrap();
}
