//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `MediaIndex` over a local music directory using `tokio::fs`
//! - `ForegroundHost` that logs the now-playing notification via `tracing`
//! - `NotificationHost` keeping an in-memory channel registry
//! - `PermissionGate` that grants everything (desktop has no runtime prompts)
//!
//! Audio output is left to the host application.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{DirectoryMediaIndex, GrantedPermissionGate};
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .media_index(Arc::new(DirectoryMediaIndex::music_dir()?))
//!     .audio_output(Arc::new(MyAudioOutput::new()))
//!     .permission_gate(Arc::new(GrantedPermissionGate::new()))
//!     .build()?;
//! ```

mod media;
mod notification;
mod permission;

pub use media::DirectoryMediaIndex;
pub use notification::{ChannelNotificationHost, TracingForegroundHost};
pub use permission::GrantedPermissionGate;
