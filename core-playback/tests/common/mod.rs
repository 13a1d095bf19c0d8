//! Hand-written bridge fakes with controllable latencies.
//!
//! Timing assertions rely on the paused runtime clock, so every timestamp here
//! is a `core_async::time::Instant`.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::audio::{AudioOutput, AudioStream};
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::media::{MediaIndex, SortOrder, TrackId};
use bridge_traits::notification::{ForegroundHost, RenderedNotification};
use bridge_traits::permission::{Permission, PermissionGate, PermissionStatus};
use core_async::sync::watch;
use core_async::time::{sleep, timeout, Duration, Instant};
use core_playback::{
    NotificationPresenter, ServiceConnector, ServiceDeps, SessionConfig, UiPresence,
};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent, Receiver};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// Media index
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct Latency {
    pub path: Duration,
    pub name: Duration,
    pub artist: Duration,
}

impl Latency {
    pub fn millis(path: u64, name: u64, artist: u64) -> Self {
        Self {
            path: Duration::from_millis(path),
            name: Duration::from_millis(name),
            artist: Duration::from_millis(artist),
        }
    }
}

#[derive(Debug, Clone)]
struct FakeTrack {
    path: Option<String>,
    name: Option<String>,
    artist: Option<String>,
    latency: Option<Latency>,
}

#[derive(Debug, Default)]
pub struct FakeMediaIndex {
    order: Vec<TrackId>,
    tracks: HashMap<TrackId, FakeTrack>,
    latency: Latency,
    lookups: Mutex<Vec<(&'static str, TrackId, Instant)>>,
}

impl FakeMediaIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a fully described track at `/music/<id>.mp3`.
    pub fn with_track(mut self, raw: i64) -> Self {
        let id = TrackId::new(raw);
        self.order.push(id);
        self.tracks.insert(
            id,
            FakeTrack {
                path: Some(format!("/music/{raw}.mp3")),
                name: Some(format!("Track {raw}")),
                artist: Some("Artist".to_string()),
                latency: None,
            },
        );
        self
    }

    /// Adds a track the index knows nothing about except its id.
    pub fn with_pathless_track(mut self, raw: i64) -> Self {
        let id = TrackId::new(raw);
        self.order.push(id);
        self.tracks.insert(
            id,
            FakeTrack {
                path: None,
                name: None,
                artist: None,
                latency: None,
            },
        );
        self
    }

    pub fn with_latency(mut self, latency: Latency) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_track_latency(mut self, raw: i64, latency: Latency) -> Self {
        if let Some(track) = self.tracks.get_mut(&TrackId::new(raw)) {
            track.latency = Some(latency);
        }
        self
    }

    /// Field lookups in completion order.
    pub fn lookups(&self) -> Vec<(&'static str, TrackId, Instant)> {
        self.lookups.lock().clone()
    }

    fn latency_for(&self, id: TrackId) -> Latency {
        self.tracks
            .get(&id)
            .and_then(|track| track.latency)
            .unwrap_or(self.latency)
    }

    async fn field(
        &self,
        field: &'static str,
        id: TrackId,
        delay: Duration,
        read: impl Fn(&FakeTrack) -> Option<String>,
    ) -> BridgeResult<Option<String>> {
        sleep(delay).await;
        self.lookups.lock().push((field, id, Instant::now()));
        Ok(self.tracks.get(&id).and_then(read))
    }
}

#[async_trait]
impl MediaIndex for FakeMediaIndex {
    async fn list_tracks(&self, order: SortOrder) -> BridgeResult<Vec<TrackId>> {
        let mut ids = self.order.clone();
        if order == SortOrder::DisplayName {
            ids.sort();
        }
        Ok(ids)
    }

    async fn data_path(&self, id: TrackId) -> BridgeResult<Option<String>> {
        let delay = self.latency_for(id).path;
        self.field("path", id, delay, |track| track.path.clone())
            .await
    }

    async fn display_name(&self, id: TrackId) -> BridgeResult<Option<String>> {
        let delay = self.latency_for(id).name;
        self.field("name", id, delay, |track| track.name.clone())
            .await
    }

    async fn album_name(&self, _id: TrackId) -> BridgeResult<Option<String>> {
        Ok(None)
    }

    async fn artist_name(&self, id: TrackId) -> BridgeResult<Option<String>> {
        let delay = self.latency_for(id).artist;
        self.field("artist", id, delay, |track| track.artist.clone())
            .await
    }
}

// ============================================================================
// Audio output
// ============================================================================

/// One entry per call the engine made on the output or its streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioCall {
    Open(String),
    Prepared(String),
    Start(String),
    Pause(String),
    Stop(String),
    Release(String),
}

pub type AudioLog = Arc<Mutex<Vec<(AudioCall, Instant)>>>;

pub struct FakeAudioOutput {
    log: AudioLog,
    prepare_delay: Duration,
    duration: Duration,
    failing_open: Vec<String>,
    failing_prepare: Vec<String>,
}

impl FakeAudioOutput {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            prepare_delay: Duration::ZERO,
            duration: Duration::from_secs(180),
            failing_open: Vec::new(),
            failing_prepare: Vec::new(),
        }
    }

    /// `open` rejects this path after logging the attempt.
    pub fn with_failing_open(mut self, path: &str) -> Self {
        self.failing_open.push(path.to_string());
        self
    }

    /// Streams for this path report a failure instead of becoming prepared.
    pub fn with_failing_prepare(mut self, path: &str) -> Self {
        self.failing_prepare.push(path.to_string());
        self
    }

    pub fn with_prepare_delay(mut self, delay: Duration) -> Self {
        self.prepare_delay = delay;
        self
    }

    pub fn log(&self) -> Vec<(AudioCall, Instant)> {
        self.log.lock().clone()
    }

    pub fn calls(&self) -> Vec<AudioCall> {
        self.log.lock().iter().map(|(call, _)| call.clone()).collect()
    }

    pub fn time_of(&self, wanted: &AudioCall) -> Option<Instant> {
        self.log
            .lock()
            .iter()
            .find(|(call, _)| call == wanted)
            .map(|(_, at)| *at)
    }
}

#[async_trait]
impl AudioOutput for FakeAudioOutput {
    async fn open(&self, path: &Path) -> BridgeResult<Arc<dyn AudioStream>> {
        let path = path.display().to_string();
        self.log
            .lock()
            .push((AudioCall::Open(path.clone()), Instant::now()));
        if self.failing_open.contains(&path) {
            return Err(BridgeError::OperationFailed(format!("cannot open {path}")));
        }
        Ok(Arc::new(FakeStream {
            fails_prepare: self.failing_prepare.contains(&path),
            path,
            log: Arc::clone(&self.log),
            prepare_delay: self.prepare_delay,
            duration: self.duration,
            playing: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            clock: Mutex::new(StreamClock::default()),
        }))
    }
}

#[derive(Default)]
struct StreamClock {
    base: Duration,
    started_at: Option<Instant>,
}

impl StreamClock {
    fn position(&self) -> Duration {
        self.base + self.started_at.map_or(Duration::ZERO, |at| at.elapsed())
    }
}

struct FakeStream {
    path: String,
    log: AudioLog,
    prepare_delay: Duration,
    fails_prepare: bool,
    duration: Duration,
    playing: AtomicBool,
    stopped: AtomicBool,
    clock: Mutex<StreamClock>,
}

impl FakeStream {
    fn record(&self, call: AudioCall) {
        self.log.lock().push((call, Instant::now()));
    }
}

#[async_trait]
impl AudioStream for FakeStream {
    async fn prepared(&self) -> BridgeResult<()> {
        sleep(self.prepare_delay).await;
        if self.fails_prepare {
            return Err(BridgeError::OperationFailed(format!(
                "decoder rejected {}",
                self.path
            )));
        }
        self.record(AudioCall::Prepared(self.path.clone()));
        Ok(())
    }

    fn start(&self) -> BridgeResult<()> {
        let mut clock = self.clock.lock();
        clock.started_at = Some(Instant::now());
        self.playing.store(true, Ordering::SeqCst);
        self.record(AudioCall::Start(self.path.clone()));
        Ok(())
    }

    fn pause(&self) -> BridgeResult<()> {
        let mut clock = self.clock.lock();
        clock.base = clock.position();
        clock.started_at = None;
        self.playing.store(false, Ordering::SeqCst);
        self.record(AudioCall::Pause(self.path.clone()));
        Ok(())
    }

    fn seek(&self, position: Duration) -> BridgeResult<()> {
        let mut clock = self.clock.lock();
        clock.base = position;
        if clock.started_at.is_some() {
            clock.started_at = Some(Instant::now());
        }
        Ok(())
    }

    fn stop(&self) -> BridgeResult<()> {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return Err(BridgeError::InvalidState("already stopped".to_string()));
        }
        self.playing.store(false, Ordering::SeqCst);
        self.record(AudioCall::Stop(self.path.clone()));
        Ok(())
    }

    fn release(&self) {
        self.record(AudioCall::Release(self.path.clone()));
    }

    fn position(&self) -> Duration {
        self.clock.lock().position().min(self.duration)
    }

    fn duration(&self) -> Duration {
        self.duration
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Foreground host
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ForegroundCall {
    Start {
        id: u32,
        notification: RenderedNotification,
    },
    Stop {
        remove_notification: bool,
    },
}

#[derive(Debug, Default)]
pub struct RecordingForegroundHost {
    calls: Mutex<Vec<ForegroundCall>>,
}

impl RecordingForegroundHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ForegroundCall> {
        self.calls.lock().clone()
    }

    pub fn is_foreground(&self) -> bool {
        matches!(self.calls.lock().last(), Some(ForegroundCall::Start { .. }))
    }

    pub fn last_notification(&self) -> Option<RenderedNotification> {
        self.calls
            .lock()
            .iter()
            .rev()
            .find_map(|call| match call {
                ForegroundCall::Start { notification, .. } => Some(notification.clone()),
                ForegroundCall::Stop { .. } => None,
            })
    }
}

#[async_trait]
impl ForegroundHost for RecordingForegroundHost {
    async fn start_foreground(
        &self,
        notification_id: u32,
        notification: RenderedNotification,
    ) -> BridgeResult<()> {
        self.calls.lock().push(ForegroundCall::Start {
            id: notification_id,
            notification,
        });
        Ok(())
    }

    async fn stop_foreground(&self, remove_notification: bool) -> BridgeResult<()> {
        self.calls
            .lock()
            .push(ForegroundCall::Stop { remove_notification });
        Ok(())
    }
}

// ============================================================================
// Permission gate
// ============================================================================

pub struct FixedPermissionGate {
    status: PermissionStatus,
    requests: AtomicUsize,
}

impl FixedPermissionGate {
    pub fn new(status: PermissionStatus) -> Self {
        Self {
            status,
            requests: AtomicUsize::new(0),
        }
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionGate for FixedPermissionGate {
    fn is_required(&self, permission: Permission) -> bool {
        permission == Permission::ForegroundService
    }

    async fn request(&self, _permission: Permission) -> BridgeResult<PermissionStatus> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.status)
    }
}

/// Gate whose prompts stay open until the test answers them.
pub struct PendingPermissionGate {
    answer: watch::Sender<Option<PermissionStatus>>,
    requests: AtomicUsize,
}

impl PendingPermissionGate {
    pub fn new() -> Self {
        let (answer, _) = watch::channel(None);
        Self {
            answer,
            requests: AtomicUsize::new(0),
        }
    }

    /// Answers every open prompt and any later one.
    pub fn answer(&self, status: PermissionStatus) {
        self.answer.send_replace(Some(status));
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionGate for PendingPermissionGate {
    fn is_required(&self, permission: Permission) -> bool {
        permission == Permission::ForegroundService
    }

    async fn request(&self, _permission: Permission) -> BridgeResult<PermissionStatus> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let mut answer = self.answer.subscribe();
        let status = *answer
            .wait_for(|status| status.is_some())
            .await
            .map_err(|_| BridgeError::NotAvailable("permission dialog closed".to_string()))?;
        Ok(status.unwrap_or(PermissionStatus::Denied))
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub index: Arc<FakeMediaIndex>,
    pub output: Arc<FakeAudioOutput>,
    pub foreground: Arc<RecordingForegroundHost>,
    pub bus: EventBus,
    pub connector: Arc<ServiceConnector>,
    pub config: SessionConfig,
}

impl Harness {
    pub fn new(index: FakeMediaIndex, output: FakeAudioOutput) -> Self {
        let index = Arc::new(index);
        let output = Arc::new(output);
        let foreground = Arc::new(RecordingForegroundHost::new());
        let bus = EventBus::new(64);
        let config = SessionConfig::default();

        let deps = ServiceDeps {
            index: index.clone(),
            output: output.clone(),
            foreground: foreground.clone(),
            presenter: Arc::new(NotificationPresenter::new(None, &config)),
            bus: bus.clone(),
            config: config.clone(),
            ui: UiPresence::new(),
        };

        Self {
            index,
            output,
            foreground,
            bus,
            connector: Arc::new(ServiceConnector::new(deps)),
            config,
        }
    }
}

/// Waits for the first playback event matching `predicate`.
///
/// Panics after five (virtual) seconds so a broken flow fails instead of
/// hanging.
pub async fn wait_for_playback<F>(events: &mut Receiver<CoreEvent>, predicate: F) -> PlaybackEvent
where
    F: Fn(&PlaybackEvent) -> bool,
{
    timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(CoreEvent::Playback(event)) if predicate(&event) => return event,
                Ok(_) => continue,
                Err(e) => panic!("event bus closed: {e}"),
            }
        }
    })
    .await
    .expect("timed out waiting for playback event")
}

pub fn is_started(raw: i64) -> impl Fn(&PlaybackEvent) -> bool {
    move |event| matches!(event, PlaybackEvent::Started { track_id } if track_id.get() == raw)
}
