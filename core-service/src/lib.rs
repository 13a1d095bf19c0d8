//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (media index, audio
//! output, foreground service, notification channels, permission prompts)
//! into the playback core. Desktop apps typically enable the `desktop-shims`
//! feature (which depends on `bridge-desktop`) so a logging foreground host is
//! injected when none is given.
//!
//! ```ignore
//! use core_async::sync::CancellationToken;
//! use core_playback::SessionConfig;
//! use core_runtime::config::CoreConfig;
//! use core_service::PlayerCore;
//!
//! let config = CoreConfig::builder()
//!     .media_index(index)
//!     .audio_output(output)
//!     .build()?;
//! let core = PlayerCore::bootstrap(config, SessionConfig::default())?;
//! let controller = core.spawn_controller(CancellationToken::new());
//!
//! let list = core.load_library(SortOrder::DisplayName).await?;
//! if let Some(first) = list.get(0) {
//!     core.play(first);
//! }
//! ```

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::media::{SortOrder, TrackId};
use bridge_traits::permission::{ensure_granted, Permission, PermissionGate};
use core_async::sync::{watch, CancellationToken};
use core_async::task::{self, JoinHandle};
use core_playback::{
    BindingStatus, BrowsingList, NotificationPresenter, PlaybackBindingController, PlaybackError,
    ServiceConnector, ServiceDeps, ServiceStatus, SessionConfig, SessionCoordinator,
    ThumbnailCache, UiPresence,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, Receiver};
use tracing::{debug, info, instrument};

/// Primary façade exposed to host applications.
pub struct PlayerCore {
    bus: EventBus,
    coordinator: Arc<SessionCoordinator>,
    connector: Arc<ServiceConnector>,
    permissions: Option<Arc<dyn PermissionGate>>,
    session: SessionConfig,
}

impl PlayerCore {
    /// Validate both configurations and wire the playback core together.
    ///
    /// Nothing is spawned here; the session service starts on the first play
    /// request and the binding loop starts with [`spawn_controller`].
    ///
    /// [`spawn_controller`]: PlayerCore::spawn_controller
    pub fn bootstrap(config: CoreConfig, session: SessionConfig) -> Result<Self> {
        config.validate()?;
        session.validate()?;

        let bus = EventBus::new(config.event_buffer_size);

        let mut presenter = NotificationPresenter::new(config.notification_host.clone(), &session);
        if config.features.enable_notification_artwork {
            if let Some(loader) = &config.thumbnail_loader {
                presenter = presenter.with_thumbnails(Arc::new(ThumbnailCache::new(
                    Arc::clone(loader),
                    session.thumbnail_cache_entries,
                    session.thumbnail_cache_bytes,
                )));
            }
        }

        let coordinator = Arc::new(SessionCoordinator::new(Arc::clone(&config.media_index)));
        let connector = Arc::new(ServiceConnector::new(ServiceDeps {
            index: Arc::clone(&config.media_index),
            output: Arc::clone(&config.audio_output),
            foreground: Arc::clone(&config.foreground_host),
            presenter: Arc::new(presenter),
            bus: bus.clone(),
            config: session.clone(),
            ui: UiPresence::new(),
        }));

        info!(
            event_buffer_size = config.event_buffer_size,
            artwork = config.features.enable_notification_artwork,
            "Player core bootstrapped"
        );

        Ok(Self {
            bus,
            coordinator,
            connector,
            permissions: config.permission_gate.clone(),
            session,
        })
    }

    pub fn coordinator(&self) -> &Arc<SessionCoordinator> {
        &self.coordinator
    }

    pub fn connector(&self) -> &Arc<ServiceConnector> {
        &self.connector
    }

    pub fn events(&self) -> &EventBus {
        &self.bus
    }

    pub fn subscribe_events(&self) -> Receiver<CoreEvent> {
        self.bus.subscribe()
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.session
    }

    /// Start the binding loop relaying play intents to the session service.
    ///
    /// Must be called from within the async runtime. The loop runs until
    /// `cancel` fires or [`ControllerHandle::shutdown`] is called.
    pub fn spawn_controller(&self, cancel: CancellationToken) -> ControllerHandle {
        let controller = PlaybackBindingController::new(
            Arc::clone(&self.coordinator),
            Arc::clone(&self.connector),
            self.permissions.clone(),
            self.session.tick_interval,
        );
        let status = controller.subscribe_status();
        let task = task::spawn(controller.run(cancel.clone()));

        ControllerHandle {
            cancel,
            task,
            status,
        }
    }

    /// Ask for library access if needed, then (re)load the browsing list.
    #[instrument(skip(self))]
    pub async fn load_library(&self, order: SortOrder) -> Result<BrowsingList> {
        if let Some(gate) = &self.permissions {
            let status = ensure_granted(gate.as_ref(), Permission::ReadMediaLibrary).await?;
            if !status.is_granted() {
                return Err(CoreError::PermissionDenied(Permission::ReadMediaLibrary));
            }
        }

        let list = self.coordinator.on_load_musics_list(order).await?;
        debug!(tracks = list.len(), "Library loaded");
        Ok(list)
    }

    /// Request playback of `track_id`. Returns the intent's sequence number.
    pub fn play(&self, track_id: TrackId) -> u64 {
        self.coordinator.on_play_music(track_id)
    }

    /// Request the track after the current one.
    pub fn play_next(&self) -> Result<TrackId> {
        Ok(self.coordinator.on_play_next_music()?)
    }

    /// Toggle pause; returns whether audio is playing afterwards.
    pub async fn pause_resume(&self) -> Result<bool> {
        Ok(self.running()?.pause_resume().await?)
    }

    pub async fn seek(&self, position: Duration) -> Result<()> {
        Ok(self.running()?.seek(position).await?)
    }

    /// Snapshot of the running session, or `None` when no service runs.
    pub async fn status(&self) -> Option<ServiceStatus> {
        self.connector.current()?.status().await.ok()
    }

    /// Stop playback and tear the service down. A no-op when nothing runs.
    pub async fn stop(&self) -> Result<()> {
        match self.connector.current() {
            Some(handle) => match handle.stop().await {
                Ok(()) | Err(PlaybackError::ServiceNotRunning) => Ok(()),
                Err(e) => Err(e.into()),
            },
            None => Ok(()),
        }
    }

    fn running(&self) -> Result<core_playback::ServiceHandle> {
        self.connector
            .current()
            .ok_or(CoreError::Playback(PlaybackError::NoActiveSession))
    }
}

impl std::fmt::Debug for PlayerCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerCore")
            .field("connector", &self.connector)
            .field("has_permission_gate", &self.permissions.is_some())
            .field("session", &self.session)
            .finish()
    }
}

/// A running binding loop.
pub struct ControllerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    status: watch::Receiver<BindingStatus>,
}

impl ControllerHandle {
    pub fn status(&self) -> BindingStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<BindingStatus> {
        self.status.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the loop and wait for it to exit.
    pub async fn shutdown(self) -> Result<()> {
        self.cancel.cancel();
        self.task
            .await
            .map_err(|e| CoreError::TaskFailed(e.to_string()))
    }
}

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop::{
    ChannelNotificationHost, DirectoryMediaIndex, GrantedPermissionGate, TracingForegroundHost,
};
