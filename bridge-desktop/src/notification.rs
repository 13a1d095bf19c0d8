//! Notification and foreground shims for desktop.
//!
//! Desktop processes are never killed for running in the background, so the
//! foreground host only records and logs what a mobile host would display.

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    notification::{ForegroundHost, NotificationChannel, NotificationHost, RenderedNotification},
};
use core_async::sync::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Foreground host that logs the persistent notification through `tracing`.
pub struct TracingForegroundHost {
    foreground: AtomicBool,
    current: RwLock<Option<(u32, RenderedNotification)>>,
}

impl TracingForegroundHost {
    pub fn new() -> Self {
        Self {
            foreground: AtomicBool::new(false),
            current: RwLock::new(None),
        }
    }

    pub fn is_foreground(&self) -> bool {
        self.foreground.load(Ordering::SeqCst)
    }

    /// The notification currently shown, with its slot id.
    pub async fn current(&self) -> Option<(u32, RenderedNotification)> {
        self.current.read().await.clone()
    }
}

impl Default for TracingForegroundHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ForegroundHost for TracingForegroundHost {
    async fn start_foreground(
        &self,
        notification_id: u32,
        notification: RenderedNotification,
    ) -> Result<()> {
        info!(
            notification_id,
            title = %notification.title,
            subtitle = %notification.subtitle,
            is_playing = notification.is_playing,
            "Now playing"
        );
        *self.current.write().await = Some((notification_id, notification));
        self.foreground.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop_foreground(&self, remove_notification: bool) -> Result<()> {
        debug!(remove_notification, "Leaving foreground");
        if remove_notification {
            *self.current.write().await = None;
        }
        self.foreground.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory channel registry.
pub struct ChannelNotificationHost {
    requires_channels: bool,
    channels: RwLock<HashMap<String, NotificationChannel>>,
}

impl ChannelNotificationHost {
    /// A registry that asks the core to register its channel.
    pub fn new() -> Self {
        Self::with_channels_required(true)
    }

    pub fn with_channels_required(requires_channels: bool) -> Self {
        Self {
            requires_channels,
            channels: RwLock::new(HashMap::new()),
        }
    }

    pub async fn channel(&self, id: &str) -> Option<NotificationChannel> {
        self.channels.read().await.get(id).cloned()
    }

    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }
}

impl Default for ChannelNotificationHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationHost for ChannelNotificationHost {
    fn requires_channels(&self) -> bool {
        self.requires_channels
    }

    async fn create_channel(&self, channel: &NotificationChannel) -> Result<()> {
        let mut channels = self.channels.write().await;
        if channels.contains_key(&channel.id) {
            return Ok(());
        }
        debug!(channel_id = %channel.id, name = %channel.name, "Registered notification channel");
        channels.insert(channel.id.clone(), channel.clone());
        Ok(())
    }
}
