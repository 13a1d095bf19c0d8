//! # Playback Binding Controller
//!
//! Glue between the now-playing screen and the session service:
//!
//! 1. Observes the coordinator's "currently playing" events (each genuinely
//!    new event once).
//! 2. Requests the foreground-audio permission when the platform needs it;
//!    a denial publishes [`BindingStatus::Blocked`]. The prompt runs off the
//!    loop, and a newer intent replaces a prompt still waiting for an answer.
//! 3. Starts or binds the service and calls `play_music` on it.
//! 4. Polls position and duration on a fixed tick while a track is prepared,
//!    publishing them into the coordinator.
//!
//! The controller counts as an attached UI for its whole lifetime, so the
//! service leaves `Next` to it.

use bridge_traits::media::TrackId;
use bridge_traits::notification::ControlSignal;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::permission::{ensure_granted, Permission, PermissionGate, PermissionStatus};
use core_async::sync::{mpsc, watch, CancellationToken};
use core_async::task::{self, AbortHandle};
use core_async::time::{interval, MissedTickBehavior};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent, RecvError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use crate::coordinator::SessionCoordinator;
use crate::error::PlaybackError;
use crate::event::ReplayPolicy;
use crate::format::format_elapsed;
use crate::service::{ServiceConnector, UiAttachment};

/// What the controller last did with a play intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingStatus {
    Idle,
    /// `play_music` was accepted by the service.
    Starting { track_id: TrackId, generation: u64 },
    /// The start path waits for a runtime permission the user denied.
    Blocked {
        track_id: TrackId,
        permission: Permission,
    },
    Failed {
        track_id: Option<TrackId>,
        message: String,
    },
}

/// Answer to a permission prompt started for one play intent.
struct PermissionAnswer {
    prompt: u64,
    track_id: TrackId,
    outcome: BridgeResult<PermissionStatus>,
}

struct PendingPrompt {
    id: u64,
    task: AbortHandle,
}

impl PendingPrompt {
    fn cancel(self) {
        self.task.abort();
    }
}

pub struct PlaybackBindingController {
    coordinator: Arc<SessionCoordinator>,
    connector: Arc<ServiceConnector>,
    permissions: Option<Arc<dyn PermissionGate>>,
    bus: EventBus,
    tick_interval: Duration,
    status: watch::Sender<BindingStatus>,
    _attachment: UiAttachment,
}

impl PlaybackBindingController {
    pub fn new(
        coordinator: Arc<SessionCoordinator>,
        connector: Arc<ServiceConnector>,
        permissions: Option<Arc<dyn PermissionGate>>,
        tick_interval: Duration,
    ) -> Self {
        let (status, _) = watch::channel(BindingStatus::Idle);
        Self {
            bus: connector.bus().clone(),
            _attachment: connector.attach_ui(),
            coordinator,
            connector,
            permissions,
            tick_interval,
            status,
        }
    }

    pub fn status(&self) -> BindingStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<BindingStatus> {
        self.status.subscribe()
    }

    /// Runs the binding loop until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        let mut intents = self.coordinator.subscribe_current(ReplayPolicy::SkipDelivered);
        let mut events = self.bus.subscribe();
        let mut ticker: Option<CancellationToken> = None;
        let (answer_tx, mut answers) = mpsc::unbounded_channel();
        let mut prompt: Option<PendingPrompt> = None;
        let mut prompts = 0u64;

        info!("Playback binding controller started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                intent = intents.next() => match intent {
                    Some(track_id) => match &self.permissions {
                        Some(gate) => {
                            if let Some(previous) = prompt.take() {
                                debug!(prompt = previous.id, "Superseding pending permission prompt");
                                previous.cancel();
                            }
                            prompts += 1;
                            prompt = Some(spawn_prompt(prompts, track_id, gate, &answer_tx));
                        }
                        None => self.bind(track_id).await,
                    },
                    None => break,
                },
                Some(answer) = answers.recv() => {
                    if prompt.as_ref().map(|pending| pending.id) != Some(answer.prompt) {
                        debug!(prompt = answer.prompt, "Ignoring superseded permission answer");
                        continue;
                    }
                    prompt = None;
                    self.on_permission(answer.track_id, answer.outcome).await;
                }
                event = events.recv() => match event {
                    Ok(CoreEvent::Playback(PlaybackEvent::Prepared { generation, .. })) => {
                        debug!(generation, "Track prepared, restarting progress tick");
                        stop_ticker(&mut ticker);
                        ticker = Some(self.spawn_ticker(&cancel));
                    }
                    Ok(CoreEvent::Playback(PlaybackEvent::Stopped { .. }))
                    | Ok(CoreEvent::Playback(PlaybackEvent::Terminated))
                    | Ok(CoreEvent::Control(ControlSignal::Stop)) => {
                        stop_ticker(&mut ticker);
                    }
                    Ok(CoreEvent::Control(ControlSignal::Next)) => self.advance(),
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Controller event subscriber lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        stop_ticker(&mut ticker);
        if let Some(pending) = prompt.take() {
            pending.cancel();
        }
        info!("Playback binding controller stopped");
    }

    async fn on_permission(&self, track_id: TrackId, outcome: BridgeResult<PermissionStatus>) {
        match outcome {
            Ok(status) if status.is_granted() => self.bind(track_id).await,
            Ok(_) => self.block(track_id, Permission::ForegroundService),
            Err(e) => self.fail(Some(track_id), &PlaybackError::Bridge(e)),
        }
    }

    /// Starts or binds the service and hands it the track.
    async fn bind(&self, track_id: TrackId) {
        let list = self.coordinator.browsing_list().unwrap_or_default();
        let handle = self.connector.ensure_running();
        match handle.play_music(track_id, list).await {
            Ok(generation) => {
                debug!(track_id = %track_id, generation, "Play request accepted");
                self.status.send_replace(BindingStatus::Starting {
                    track_id,
                    generation,
                });
            }
            Err(e) => self.fail(Some(track_id), &e),
        }
    }

    fn advance(&self) {
        match self.coordinator.on_play_next_music() {
            Ok(next) => debug!(track_id = %next, "Next requested from notification"),
            Err(e) => self.fail(self.coordinator.current_track(), &e),
        }
    }

    fn block(&self, track_id: TrackId, permission: Permission) {
        warn!(track_id = %track_id, ?permission, "Blocked: permission required");
        let denied = PlaybackError::PermissionDenied(format!("{permission:?}"));

        self.status.send_replace(BindingStatus::Blocked {
            track_id,
            permission,
        });
        self.bus
            .emit(
                PlaybackEvent::PermissionBlocked {
                    track_id,
                    permission: format!("{permission:?}"),
                }
                .into(),
            )
            .ok();
        self.bus
            .emit(
                PlaybackEvent::Error {
                    track_id: Some(track_id),
                    message: denied.to_string(),
                    recoverable: false,
                }
                .into(),
            )
            .ok();
    }

    fn fail(&self, track_id: Option<TrackId>, error: &PlaybackError) {
        warn!(error = %error, "Playback binding failed");
        self.status.send_replace(BindingStatus::Failed {
            track_id,
            message: error.to_string(),
        });
    }

    fn spawn_ticker(&self, cancel: &CancellationToken) -> CancellationToken {
        let token = cancel.child_token();
        let stop = token.clone();
        let connector = Arc::clone(&self.connector);
        let coordinator = Arc::clone(&self.coordinator);
        let period = self.tick_interval;

        task::spawn(async move {
            let mut ticks = interval(period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = ticks.tick() => {
                        let Some(handle) = connector.current() else {
                            break;
                        };
                        match handle.progress().await {
                            Ok(progress) => {
                                coordinator.publish_progress(progress.position, progress.duration);
                                trace!(elapsed = %format_elapsed(progress.position), "Progress tick");
                            }
                            Err(PlaybackError::ServiceNotRunning) => break,
                            Err(e) => debug!(error = %e, "Progress unavailable"),
                        }
                    }
                }
            }
        });

        token
    }
}

fn spawn_prompt(
    id: u64,
    track_id: TrackId,
    gate: &Arc<dyn PermissionGate>,
    answers: &mpsc::UnboundedSender<PermissionAnswer>,
) -> PendingPrompt {
    let gate = Arc::clone(gate);
    let answers = answers.clone();
    let handle = task::spawn(async move {
        let outcome = ensure_granted(gate.as_ref(), Permission::ForegroundService).await;
        let _ = answers.send(PermissionAnswer {
            prompt: id,
            track_id,
            outcome,
        });
    });

    PendingPrompt {
        id,
        task: handle.abort_handle(),
    }
}

fn stop_ticker(ticker: &mut Option<CancellationToken>) {
    if let Some(token) = ticker.take() {
        token.cancel();
    }
}

impl std::fmt::Debug for PlaybackBindingController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackBindingController")
            .field("status", &*self.status.borrow())
            .field("tick_interval", &self.tick_interval)
            .finish()
    }
}
