//! # Session Configuration
//!
//! Tunables for the playback session service, its notification and the
//! binding controller's progress tick.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{PlaybackError, Result};

/// Playback session configuration.
///
/// Every field has a serde default, so a host can ship a partial JSON/TOML
/// document and get sensible values for the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Interval between position polls while a track is prepared.
    ///
    /// Default: 1 second.
    #[serde(default = "default_tick_interval")]
    pub tick_interval: Duration,

    /// Slot of the persistent playback notification.
    ///
    /// Default: 1.
    #[serde(default = "default_notification_id")]
    pub notification_id: u32,

    /// Notification channel id registered on platforms that need channels.
    #[serde(default = "default_channel_id")]
    pub channel_id: String,

    /// User-visible channel name.
    #[serde(default = "default_channel_name")]
    pub channel_name: String,

    /// Host resource name of the notification's small icon.
    #[serde(default = "default_small_icon")]
    pub small_icon: String,

    /// Capacity of the service's command mailbox.
    ///
    /// Default: 32 commands.
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,

    /// Maximum number of cached notification thumbnails (hits and misses).
    ///
    /// Default: 64 entries.
    #[serde(default = "default_thumbnail_cache_entries")]
    pub thumbnail_cache_entries: usize,

    /// Byte budget for decoded thumbnails held by the cache.
    ///
    /// Default: 8 MiB.
    #[serde(default = "default_thumbnail_cache_bytes")]
    pub thumbnail_cache_bytes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval: default_tick_interval(),
            notification_id: default_notification_id(),
            channel_id: default_channel_id(),
            channel_name: default_channel_name(),
            small_icon: default_small_icon(),
            command_buffer: default_command_buffer(),
            thumbnail_cache_entries: default_thumbnail_cache_entries(),
            thumbnail_cache_bytes: default_thumbnail_cache_bytes(),
        }
    }
}

impl SessionConfig {
    /// Override the progress tick interval.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Override the notification slot.
    pub fn with_notification_id(mut self, id: u32) -> Self {
        self.notification_id = id;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval.is_zero() {
            return Err(PlaybackError::Config(
                "tick_interval must be > 0".to_string(),
            ));
        }

        if self.channel_id.trim().is_empty() {
            return Err(PlaybackError::Config(
                "channel_id cannot be empty".to_string(),
            ));
        }

        if self.command_buffer == 0 {
            return Err(PlaybackError::Config(
                "command_buffer must be > 0".to_string(),
            ));
        }

        if self.thumbnail_cache_entries == 0 {
            return Err(PlaybackError::Config(
                "thumbnail_cache_entries must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_tick_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_notification_id() -> u32 {
    1
}

fn default_channel_id() -> String {
    "core_playback.session".to_string()
}

fn default_channel_name() -> String {
    "Music playback".to_string()
}

fn default_small_icon() -> String {
    "ic_music".to_string()
}

fn default_command_buffer() -> usize {
    32
}

fn default_thumbnail_cache_entries() -> usize {
    64
}

fn default_thumbnail_cache_bytes() -> usize {
    8 * 1024 * 1024
}
