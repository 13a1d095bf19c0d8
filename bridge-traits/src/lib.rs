//! # Host Bridge Traits
//!
//! Platform abstraction traits that each host (Android, iOS, desktop) must
//! implement for the playback core.
//!
//! ## Overview
//!
//! The core owns playback-session state and coordination; everything that
//! touches a platform API sits behind one of these traits. Each trait is the
//! narrowest surface the core needs from the host.
//!
//! ## Traits
//!
//! ### Media
//! - [`MediaIndex`](media::MediaIndex) - Enumerate tracks, resolve display fields
//! - [`AudioOutput`](audio::AudioOutput) / [`AudioStream`](audio::AudioStream) - Opaque native player
//! - [`ThumbnailLoader`](thumbnail::ThumbnailLoader) - Embedded artwork decoding
//!
//! ### Platform Integration
//! - [`NotificationHost`](notification::NotificationHost) - Notification channels
//! - [`ForegroundHost`](notification::ForegroundHost) - Keep the process alive while playing
//! - [`PermissionGate`](permission::PermissionGate) - Runtime permission prompts
//!
//! ### Utilities
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with a descriptive error when a required capability is
//! missing:
//!
//! ```ignore
//! use core_runtime::error::Error;
//!
//! let audio_output = config.audio_output
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "AudioOutput".to_string(),
//!         message: "Inject the platform's native player adapter.".to_string(),
//!     })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors, keep messages actionable, and report a
//! native "already stopped"-style rejection as
//! [`BridgeError::InvalidState`](error::BridgeError::InvalidState) so the core
//! can tolerate it.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync`: the session actor, metadata
//! lookups and the tick loop run as separate tasks.

pub mod audio;
pub mod error;
pub mod logging;
pub mod media;
pub mod notification;
pub mod permission;
pub mod thumbnail;

pub use error::BridgeError;

// Re-export commonly used types
pub use audio::{AudioOutput, AudioStream};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use media::{MediaIndex, SortOrder, TrackId};
pub use notification::{
    ChannelImportance, ControlSignal, ForegroundHost, NotificationAction, NotificationChannel,
    NotificationHost, RenderedNotification,
};
pub use permission::{ensure_granted, Permission, PermissionGate, PermissionStatus};
pub use thumbnail::{Thumbnail, ThumbnailLoader};
