//! # Playback Session Module
//!
//! Coordinates "what is currently playing" for the music player core.
//!
//! ## Overview
//!
//! This module handles:
//! - The playback engine wrapping the host's opaque audio output
//! - The session service actor: load cycles, foreground notification, Stop/Next
//! - The view-state coordinator feeding the browsing and now-playing screens
//! - The binding controller relaying play intents and polling progress
//! - Notification rendering with a bounded artwork cache
//!
//! ## Components
//!
//! ```text
//! UI intent ──> SessionCoordinator ──(single-consumption event)──> PlaybackBindingController
//!                      ^                                                  │
//!                      │ publish_progress                                 │ play_music
//!                      │                                                  v
//!               progress tick <──── Prepared (EventBus) ──── session service ──> PlaybackEngine
//! ```

pub mod artwork;
pub mod browsing;
pub mod config;
pub mod controller;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod event;
pub mod format;
pub mod notification;
pub mod service;
pub mod snapshot;

pub use artwork::ThumbnailCache;
pub use browsing::BrowsingList;
pub use config::SessionConfig;
pub use controller::{BindingStatus, PlaybackBindingController};
pub use coordinator::{BrowsingListState, PlayMode, SessionCoordinator};
pub use engine::{EnginePhase, PlaybackEngine, StopOutcome};
pub use error::{PlaybackError, Result};
pub use event::{Event, EventCell, EventSubscription, ReplayPolicy};
pub use format::format_elapsed;
pub use notification::NotificationPresenter;
pub use service::{
    Progress, ServiceConnector, ServiceDeps, ServiceHandle, ServiceState, ServiceStatus,
    UiAttachment, UiPresence,
};
pub use snapshot::TrackSnapshot;
