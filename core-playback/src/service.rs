//! # Playback Session Service
//!
//! The service owns the [`PlaybackEngine`] and the loaded track. It runs as a
//! single actor task: commands arrive through a bounded mailbox, metadata
//! lookups and the engine's prepared signal report back through an internal
//! completion channel, and `Stop`/`Next` control signals come from the
//! [`EventBus`].
//!
//! ## State Machine
//!
//! ```text
//! Idle --play_music--> Loading --snapshot + prepared--> Prepared --start--> Playing <--> Paused
//!                          ^                                                   |
//!                          +------------- play_music / Next -------------------+
//! any --Stop--> Terminated (foreground exited, actor gone)
//! ```
//!
//! Every load is tagged with a generation. Completions carrying an older
//! generation are discarded, so a slow lookup for a track the user already
//! skipped can never start playing. A load that fails before reaching the
//! engine hands the session back to the track still loaded there.
//!
//! ## Usage
//!
//! ```ignore
//! let connector = ServiceConnector::new(deps);
//! let handle = connector.ensure_running();
//! let generation = handle.play_music(TrackId::new(7), list).await?;
//! ```

use bridge_traits::audio::AudioOutput;
use bridge_traits::media::{MediaIndex, TrackId};
use bridge_traits::notification::{ControlSignal, ForegroundHost};
use core_async::sync::{mpsc, oneshot};
use core_async::task;
use core_async::time::as_millis_u64;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent, Receiver, RecvError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::browsing::BrowsingList;
use crate::config::SessionConfig;
use crate::engine::{EnginePhase, PlaybackEngine};
use crate::error::{PlaybackError, Result};
use crate::notification::NotificationPresenter;
use crate::snapshot::{self, TrackSnapshot};

// ============================================================================
// Public Types
// ============================================================================

/// Lifecycle state of the session service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    Idle,
    Loading,
    Prepared,
    Playing,
    Paused,
    Terminated,
}

impl ServiceState {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceState::Idle => "idle",
            ServiceState::Loading => "loading",
            ServiceState::Prepared => "prepared",
            ServiceState::Playing => "playing",
            ServiceState::Paused => "paused",
            ServiceState::Terminated => "terminated",
        }
    }

    fn from_engine(phase: EnginePhase) -> Self {
        match phase {
            EnginePhase::Idle => ServiceState::Idle,
            EnginePhase::Preparing => ServiceState::Loading,
            EnginePhase::Prepared => ServiceState::Prepared,
            EnginePhase::Playing => ServiceState::Playing,
            EnginePhase::Paused => ServiceState::Paused,
        }
    }
}

/// Point-in-time view of the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatus {
    pub state: ServiceState,
    /// Generation of the most recent load cycle.
    pub generation: u64,
    /// Track most recently requested.
    pub target: Option<TrackId>,
    /// Track whose snapshot is loaded in the engine.
    pub track: Option<TrackSnapshot>,
    pub is_playing: bool,
    pub ui_attached: bool,
    pub browsing_len: usize,
}

/// Position and duration of the loaded track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub position: Duration,
    pub duration: Duration,
}

// ============================================================================
// UI Presence
// ============================================================================

/// Counts attached UI hosts.
///
/// While at least one UI is attached, the service leaves `Next` to the UI's
/// coordinator instead of advancing on its own.
#[derive(Debug, Clone, Default)]
pub struct UiPresence {
    attached: Arc<AtomicUsize>,
}

impl UiPresence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self) -> UiAttachment {
        self.attached.fetch_add(1, Ordering::AcqRel);
        UiAttachment {
            attached: Arc::clone(&self.attached),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire) > 0
    }
}

/// Marks a UI as attached until dropped.
#[derive(Debug)]
pub struct UiAttachment {
    attached: Arc<AtomicUsize>,
}

impl Drop for UiAttachment {
    fn drop(&mut self) {
        self.attached.fetch_sub(1, Ordering::AcqRel);
    }
}

// ============================================================================
// Dependencies
// ============================================================================

/// Everything a service instance needs.
#[derive(Clone)]
pub struct ServiceDeps {
    pub index: Arc<dyn MediaIndex>,
    pub output: Arc<dyn AudioOutput>,
    pub foreground: Arc<dyn ForegroundHost>,
    pub presenter: Arc<NotificationPresenter>,
    pub bus: EventBus,
    pub config: SessionConfig,
    pub ui: UiPresence,
}

// ============================================================================
// Mailbox
// ============================================================================

enum Command {
    PlayMusic {
        track_id: TrackId,
        list: BrowsingList,
        reply: oneshot::Sender<u64>,
    },
    PauseResume {
        reply: oneshot::Sender<Result<bool>>,
    },
    Seek {
        position: Duration,
        reply: oneshot::Sender<Result<()>>,
    },
    Status {
        reply: oneshot::Sender<ServiceStatus>,
    },
    Progress {
        reply: oneshot::Sender<Result<Progress>>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
}

enum Completion {
    SnapshotResolved {
        generation: u64,
        result: Result<TrackSnapshot>,
    },
    EnginePrepared {
        generation: u64,
        result: Result<()>,
    },
}

// ============================================================================
// Handle
// ============================================================================

/// Binding to a running service.
#[derive(Clone)]
pub struct ServiceHandle {
    commands: mpsc::Sender<Command>,
    ui: UiPresence,
}

impl ServiceHandle {
    /// Starts a fresh load cycle for `track_id`, replacing the browsing list.
    ///
    /// Returns the generation assigned to the load.
    pub async fn play_music(&self, track_id: TrackId, list: BrowsingList) -> Result<u64> {
        self.request(|reply| Command::PlayMusic {
            track_id,
            list,
            reply,
        })
        .await
    }

    /// Toggles playback. Returns the new playing flag.
    pub async fn pause_resume(&self) -> Result<bool> {
        self.request(|reply| Command::PauseResume { reply }).await?
    }

    pub async fn seek(&self, position: Duration) -> Result<()> {
        self.request(|reply| Command::Seek { position, reply }).await?
    }

    pub async fn status(&self) -> Result<ServiceStatus> {
        self.request(|reply| Command::Status { reply }).await
    }

    pub async fn progress(&self) -> Result<Progress> {
        self.request(|reply| Command::Progress { reply }).await?
    }

    /// Stops output, exits the foreground and terminates the service.
    ///
    /// Returns once the actor has exited.
    pub async fn stop(&self) -> Result<()> {
        self.request(|reply| Command::Stop { reply }).await?;
        self.commands.closed().await;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    pub fn attach_ui(&self) -> UiAttachment {
        self.ui.attach()
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| PlaybackError::ServiceNotRunning)?;
        response.await.map_err(|_| PlaybackError::ServiceNotRunning)
    }
}

impl std::fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("running", &self.is_running())
            .finish()
    }
}

// ============================================================================
// Connector
// ============================================================================

/// Starts the service on demand and hands out handles to it.
///
/// Starting and binding are one step: [`ensure_running`](Self::ensure_running)
/// either returns the live handle or spawns a new actor and returns its
/// handle, under one lock.
pub struct ServiceConnector {
    deps: ServiceDeps,
    generations: Arc<AtomicU64>,
    current: Mutex<Option<ServiceHandle>>,
}

impl ServiceConnector {
    pub fn new(deps: ServiceDeps) -> Self {
        Self {
            deps,
            generations: Arc::new(AtomicU64::new(0)),
            current: Mutex::new(None),
        }
    }

    /// The running service, if any.
    pub fn current(&self) -> Option<ServiceHandle> {
        self.current
            .lock()
            .as_ref()
            .filter(|handle| handle.is_running())
            .cloned()
    }

    /// Returns the running service, starting one first if needed.
    ///
    /// Must be called from within the async runtime.
    pub fn ensure_running(&self) -> ServiceHandle {
        let mut current = self.current.lock();
        if let Some(handle) = current.as_ref().filter(|handle| handle.is_running()) {
            return handle.clone();
        }

        let handle = spawn_service(self.deps.clone(), Arc::clone(&self.generations));
        *current = Some(handle.clone());
        handle
    }

    pub fn attach_ui(&self) -> UiAttachment {
        self.deps.ui.attach()
    }

    pub fn ui(&self) -> &UiPresence {
        &self.deps.ui
    }

    pub fn bus(&self) -> &EventBus {
        &self.deps.bus
    }
}

impl std::fmt::Debug for ServiceConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConnector")
            .field("running", &self.current().is_some())
            .field("ui_attached", &self.deps.ui.is_attached())
            .finish()
    }
}

fn spawn_service(deps: ServiceDeps, generations: Arc<AtomicU64>) -> ServiceHandle {
    let (commands, mailbox) = mpsc::channel(deps.config.command_buffer.max(1));
    let (completions, completion_rx) = mpsc::unbounded_channel();
    // Subscribe before spawning so a signal raised right after start is seen.
    let controls = deps.bus.subscribe();

    let handle = ServiceHandle {
        commands,
        ui: deps.ui.clone(),
    };

    let actor = SessionActor {
        engine: PlaybackEngine::new(Arc::clone(&deps.output)),
        index: deps.index,
        foreground: deps.foreground,
        presenter: deps.presenter,
        bus: deps.bus,
        notification_id: deps.config.notification_id,
        ui: deps.ui,
        generations,
        completions,
        state: ServiceState::Idle,
        generation: 0,
        loaded_generation: 0,
        held_prepared: None,
        target: None,
        list: BrowsingList::default(),
        track: None,
    };
    task::spawn(actor.run(mailbox, completion_rx, controls));

    handle
}

// ============================================================================
// Actor
// ============================================================================

struct SessionActor {
    engine: PlaybackEngine,
    index: Arc<dyn MediaIndex>,
    foreground: Arc<dyn ForegroundHost>,
    presenter: Arc<NotificationPresenter>,
    bus: EventBus,
    notification_id: u32,
    ui: UiPresence,
    generations: Arc<AtomicU64>,
    completions: mpsc::UnboundedSender<Completion>,
    state: ServiceState,
    generation: u64,
    /// Cycle that owns the stream currently held by the engine.
    loaded_generation: u64,
    /// Prepared signal for the loaded stream that arrived while a newer
    /// lookup was still pending.
    held_prepared: Option<Result<()>>,
    target: Option<TrackId>,
    list: BrowsingList,
    track: Option<TrackSnapshot>,
}

impl SessionActor {
    async fn run(
        mut self,
        mut mailbox: mpsc::Receiver<Command>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
        mut controls: Receiver<CoreEvent>,
    ) {
        info!("Playback service started");

        loop {
            let flow = tokio::select! {
                command = mailbox.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        debug!("All service handles dropped");
                        self.shutdown().await;
                        ControlFlow::Break(())
                    }
                },
                Some(completion) = completions.recv() => {
                    self.handle_completion(completion).await;
                    ControlFlow::Continue(())
                }
                event = controls.recv() => match event {
                    Ok(CoreEvent::Control(signal)) => self.handle_control(signal).await,
                    Ok(CoreEvent::Playback(_)) => ControlFlow::Continue(()),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Control signal subscriber lagged");
                        ControlFlow::Continue(())
                    }
                    Err(RecvError::Closed) => {
                        self.shutdown().await;
                        ControlFlow::Break(())
                    }
                },
            };

            if flow.is_break() {
                break;
            }
        }

        info!("Playback service terminated");
    }

    async fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::PlayMusic {
                track_id,
                list,
                reply,
            } => {
                self.list = list;
                let generation = self.begin_load(track_id);
                let _ = reply.send(generation);
            }
            Command::PauseResume { reply } => {
                let result = self.pause_resume().await;
                let _ = reply.send(result);
            }
            Command::Seek { position, reply } => {
                let result = self.seek(position);
                let _ = reply.send(result);
            }
            Command::Status { reply } => {
                let _ = reply.send(self.status());
            }
            Command::Progress { reply } => {
                let _ = reply.send(self.progress());
            }
            Command::Stop { reply } => {
                self.shutdown().await;
                let _ = reply.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    async fn handle_control(&mut self, signal: ControlSignal) -> ControlFlow<()> {
        match signal {
            ControlSignal::Stop => {
                info!("Stop requested from notification");
                self.shutdown().await;
                ControlFlow::Break(())
            }
            ControlSignal::Next => {
                if self.ui.is_attached() {
                    debug!("Next left to the attached UI");
                } else {
                    self.advance();
                }
                ControlFlow::Continue(())
            }
        }
    }

    async fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::SnapshotResolved { generation, result } => {
                if generation != self.generation {
                    debug!(generation, current = self.generation, "Discarding stale snapshot");
                    return;
                }
                match result {
                    Ok(snapshot) => self.load_engine(generation, snapshot).await,
                    Err(e) => {
                        self.report(self.target, &e);
                        self.restore_loaded().await;
                    }
                }
            }
            Completion::EnginePrepared { generation, result } => {
                if generation != self.loaded_generation {
                    debug!(generation, loaded = self.loaded_generation, "Discarding stale prepared signal");
                    return;
                }
                if generation != self.generation {
                    debug!(generation, current = self.generation, "Holding prepared signal");
                    self.held_prepared = Some(result);
                    return;
                }
                self.on_prepared(generation, result).await;
            }
        }
    }

    /// Falls back to the cycle the engine is still working on after a newer
    /// lookup failed.
    async fn restore_loaded(&mut self) {
        self.target = self.track.as_ref().map(|track| track.id);
        if self.track.is_some() {
            self.generation = self.loaded_generation;
        }
        self.state = ServiceState::from_engine(self.engine.phase());

        if let Some(result) = self.held_prepared.take() {
            debug!(generation = self.generation, "Resuming held prepared signal");
            self.on_prepared(self.generation, result).await;
        }
    }

    async fn on_prepared(&mut self, generation: u64, result: Result<()>) {
        if let Err(e) = result.and_then(|()| self.start_output(generation)) {
            self.report(self.track.as_ref().map(|track| track.id), &e);
            self.engine.stop();
            self.loaded_generation = 0;
            self.track = None;
            self.state = ServiceState::Idle;
            self.leave_foreground().await;
            return;
        }
        self.post_foreground(true).await;
    }

    /// Tags a new load cycle and starts resolving the track's metadata.
    #[instrument(skip(self), fields(generation = tracing::field::Empty))]
    fn begin_load(&mut self, track_id: TrackId) -> u64 {
        let generation = self.generations.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::Span::current().record("generation", generation);

        self.generation = generation;
        self.target = Some(track_id);
        self.state = ServiceState::Loading;
        info!(track_id = %track_id, "Load cycle started");
        self.emit(PlaybackEvent::Loading {
            generation,
            track_id,
        });

        let index = Arc::clone(&self.index);
        let completions = self.completions.clone();
        task::spawn(async move {
            let result = snapshot::resolve(index.as_ref(), track_id).await;
            let _ = completions.send(Completion::SnapshotResolved { generation, result });
        });

        generation
    }

    async fn load_engine(&mut self, generation: u64, snapshot: TrackSnapshot) {
        let completions = self.completions.clone();
        let loaded = self
            .engine
            .play(Path::new(&snapshot.path), move |result| {
                let _ = completions.send(Completion::EnginePrepared { generation, result });
            })
            .await;

        // The previous stream is released either way.
        self.held_prepared = None;
        if let Err(e) = loaded {
            self.report(Some(snapshot.id), &e);
            self.loaded_generation = 0;
            self.track = None;
            self.state = ServiceState::Idle;
            self.leave_foreground().await;
            return;
        }

        debug!(track_id = %snapshot.id, generation, "Engine preparing");
        self.loaded_generation = generation;
        self.track = Some(snapshot);
        self.post_foreground(false).await;
    }

    fn start_output(&mut self, generation: u64) -> Result<()> {
        let track_id = self.loaded_track()?;

        self.engine.mark_prepared()?;
        self.state = ServiceState::Prepared;
        self.engine.start()?;
        self.state = ServiceState::Playing;

        let duration_ms = as_millis_u64(self.engine.duration()?);
        info!(track_id = %track_id, generation, duration_ms, "Track prepared");
        self.emit(PlaybackEvent::Prepared {
            generation,
            track_id,
            duration_ms,
        });
        self.emit(PlaybackEvent::Started { track_id });
        Ok(())
    }

    /// Id of the track the engine holds, which lags `target` while loading.
    fn loaded_track(&self) -> Result<TrackId> {
        self.track
            .as_ref()
            .map(|track| track.id)
            .ok_or(PlaybackError::NoActiveSession)
    }

    async fn pause_resume(&mut self) -> Result<bool> {
        let track_id = self.loaded_track()?;
        let playing = self.engine.pause_resume()?;
        let position_ms = as_millis_u64(self.engine.position()?);

        if playing {
            self.state = ServiceState::Playing;
            self.emit(PlaybackEvent::Resumed {
                track_id,
                position_ms,
            });
        } else {
            self.state = ServiceState::Paused;
            self.emit(PlaybackEvent::Paused {
                track_id,
                position_ms,
            });
        }

        self.post_foreground(playing).await;
        Ok(playing)
    }

    fn seek(&mut self, position: Duration) -> Result<()> {
        let track_id = self.loaded_track()?;
        self.engine.seek(position)?;
        self.emit(PlaybackEvent::PositionChanged {
            track_id,
            position_ms: as_millis_u64(position),
            duration_ms: as_millis_u64(self.engine.duration()?),
        });
        Ok(())
    }

    fn advance(&mut self) {
        let Some(current) = self.target else {
            self.report(None, &PlaybackError::NoActiveSession);
            return;
        };

        match self.list.next_after(current) {
            Ok(next) => {
                debug!(from = %current, to = %next, "Advancing to next track");
                self.begin_load(next);
            }
            Err(e) => self.report(Some(current), &e),
        }
    }

    fn status(&self) -> ServiceStatus {
        ServiceStatus {
            state: self.state,
            generation: self.generation,
            target: self.target,
            track: self.track.clone(),
            is_playing: self.engine.is_playing().unwrap_or(false),
            ui_attached: self.ui.is_attached(),
            browsing_len: self.list.len(),
        }
    }

    fn progress(&self) -> Result<Progress> {
        Ok(Progress {
            position: self.engine.position()?,
            duration: self.engine.duration()?,
        })
    }

    async fn post_foreground(&self, is_playing: bool) {
        let Some(snapshot) = &self.track else {
            return;
        };

        let notification = match self.presenter.create(snapshot, is_playing).await {
            Ok(notification) => notification,
            Err(e) => {
                warn!(error = %e, "Failed to render playback notification");
                return;
            }
        };

        if let Err(e) = self
            .foreground
            .start_foreground(self.notification_id, notification)
            .await
        {
            warn!(error = %e, "Failed to enter foreground");
        }
    }

    async fn leave_foreground(&self) {
        if let Err(e) = self.foreground.stop_foreground(true).await {
            warn!(error = %e, "Failed to exit foreground");
        }
    }

    async fn shutdown(&mut self) {
        let track_id = self.track.as_ref().map(|track| track.id).or(self.target);

        let outcome = self.engine.stop();
        debug!(?outcome, "Output stopped");
        self.leave_foreground().await;

        self.state = ServiceState::Terminated;
        self.track = None;
        self.emit(PlaybackEvent::Stopped { track_id });
        self.emit(PlaybackEvent::Terminated);
    }

    fn report(&self, track_id: Option<TrackId>, error: &PlaybackError) {
        warn!(
            track_id = ?track_id.map(TrackId::get),
            state = self.state.as_str(),
            error = %error,
            "Playback error"
        );
        self.emit(PlaybackEvent::Error {
            track_id,
            message: error.to_string(),
            recoverable: error.is_transient(),
        });
    }

    fn emit(&self, event: PlaybackEvent) {
        self.bus.emit(CoreEvent::Playback(event)).ok();
    }
}
