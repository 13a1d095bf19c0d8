//! Notification and foreground-service bridges.
//!
//! A playback session is kept alive by a single persistent notification. The
//! core renders the notification content; the host owns the actual system
//! surface and translates taps on the notification's controls back into
//! [`ControlSignal`]s.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{error::Result, thumbnail::Thumbnail};

/// Payload-less control intents raised from the notification.
///
/// Receivers re-derive everything else (current track, browsing list) from
/// the playback session itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlSignal {
    /// Stop playback and tear the session down.
    Stop,
    /// Advance to the next track in the browsing list.
    Next,
}

impl ControlSignal {
    /// Stable action name, suitable for platform intent filters.
    pub fn action_name(self) -> &'static str {
        match self {
            ControlSignal::Stop => "Stop",
            ControlSignal::Next => "Next",
        }
    }
}

/// Importance level for a notification channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelImportance {
    Low,
    Default,
    #[default]
    High,
}

/// Channel registration data for platforms that group notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationChannel {
    pub id: String,
    pub name: String,
    pub importance: ChannelImportance,
}

/// A tappable region on the notification layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationAction {
    /// Signal the host must deliver when this region is tapped.
    pub signal: ControlSignal,
    /// Accessible label for the control.
    pub label: String,
    /// Distinct request code so platform intents don't collapse into one.
    pub request_code: u32,
}

/// Fully rendered notification content.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedNotification {
    pub channel_id: String,
    pub small_icon: String,
    /// Primary line (track display name).
    pub title: String,
    /// Secondary line (artist name).
    pub subtitle: String,
    pub thumbnail: Option<Thumbnail>,
    pub actions: Vec<NotificationAction>,
    pub is_playing: bool,
    /// Ongoing notifications cannot be swiped away while the session lives.
    pub ongoing: bool,
}

impl RenderedNotification {
    /// Look up the action wired to `signal`.
    pub fn action(&self, signal: ControlSignal) -> Option<&NotificationAction> {
        self.actions.iter().find(|action| action.signal == signal)
    }
}

/// Host notification manager.
#[async_trait]
pub trait NotificationHost: Send + Sync {
    /// Whether the running platform version requires explicit channels.
    fn requires_channels(&self) -> bool;

    /// Register a channel. Registering the same id twice must be a no-op.
    async fn create_channel(&self, channel: &NotificationChannel) -> Result<()>;
}

/// Host side of the background playback service's process lifecycle.
///
/// # Platform Support
///
/// - **Android**: `Service.startForeground` / `stopForeground`
/// - **iOS**: audio background mode plus Now Playing info
/// - **Desktop**: usually a tray entry or a no-op
#[async_trait]
pub trait ForegroundHost: Send + Sync {
    /// Post (or replace) the persistent notification in slot
    /// `notification_id` and keep the process in the foreground.
    async fn start_foreground(
        &self,
        notification_id: u32,
        notification: RenderedNotification,
    ) -> Result<()>;

    /// Leave the foreground, optionally removing the notification.
    async fn stop_foreground(&self, remove_notification: bool) -> Result<()>;
}
