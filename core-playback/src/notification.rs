//! # Notification Presenter
//!
//! Renders the persistent playback notification: title, artist, optional
//! artwork, and two tap targets wired to [`ControlSignal::Stop`] and
//! [`ControlSignal::Next`]. The host turns taps back into control signals on
//! the event bus.

use bridge_traits::notification::{
    ChannelImportance, ControlSignal, NotificationAction, NotificationChannel, NotificationHost,
    RenderedNotification,
};
use core_async::sync::OnceCell;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::artwork::ThumbnailCache;
use crate::config::SessionConfig;
use crate::error::Result;
use crate::snapshot::TrackSnapshot;

/// Request code of the Stop tap target.
pub const STOP_REQUEST_CODE: u32 = 1;
/// Request code of the Next tap target.
pub const NEXT_REQUEST_CODE: u32 = 0;

pub struct NotificationPresenter {
    host: Option<Arc<dyn NotificationHost>>,
    thumbnails: Option<Arc<ThumbnailCache>>,
    channel: NotificationChannel,
    small_icon: String,
    channel_registered: OnceCell<()>,
}

impl NotificationPresenter {
    pub fn new(host: Option<Arc<dyn NotificationHost>>, config: &SessionConfig) -> Self {
        Self {
            host,
            thumbnails: None,
            channel: NotificationChannel {
                id: config.channel_id.clone(),
                name: config.channel_name.clone(),
                importance: ChannelImportance::High,
            },
            small_icon: config.small_icon.clone(),
            channel_registered: OnceCell::new(),
        }
    }

    /// Attach artwork to rendered notifications.
    pub fn with_thumbnails(mut self, cache: Arc<ThumbnailCache>) -> Self {
        self.thumbnails = Some(cache);
        self
    }

    pub fn channel(&self) -> &NotificationChannel {
        &self.channel
    }

    /// Renders the notification for `snapshot`.
    ///
    /// Registers the notification channel on first use when the host needs
    /// channels. A failed registration is retried on the next call.
    #[instrument(skip(self, snapshot), fields(track_id = %snapshot.id))]
    pub async fn create(
        &self,
        snapshot: &TrackSnapshot,
        is_playing: bool,
    ) -> Result<RenderedNotification> {
        self.ensure_channel().await?;

        let thumbnail = match &self.thumbnails {
            Some(cache) => cache.get_or_load(&snapshot.path).await,
            None => None,
        };

        Ok(RenderedNotification {
            channel_id: self.channel.id.clone(),
            small_icon: self.small_icon.clone(),
            title: snapshot.title().to_string(),
            subtitle: snapshot.subtitle().to_string(),
            thumbnail,
            actions: vec![
                action(ControlSignal::Stop, STOP_REQUEST_CODE),
                action(ControlSignal::Next, NEXT_REQUEST_CODE),
            ],
            is_playing,
            ongoing: true,
        })
    }

    async fn ensure_channel(&self) -> Result<()> {
        let Some(host) = &self.host else {
            return Ok(());
        };
        if !host.requires_channels() {
            return Ok(());
        }

        self.channel_registered
            .get_or_try_init(|| async {
                host.create_channel(&self.channel).await?;
                debug!(channel_id = %self.channel.id, "Notification channel registered");
                Ok::<(), crate::error::PlaybackError>(())
            })
            .await?;
        Ok(())
    }
}

fn action(signal: ControlSignal, request_code: u32) -> NotificationAction {
    NotificationAction {
        signal,
        label: signal.action_name().to_string(),
        request_code,
    }
}

impl std::fmt::Debug for NotificationPresenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationPresenter")
            .field("channel", &self.channel)
            .field("has_host", &self.host.is_some())
            .field("has_thumbnails", &self.thumbnails.is_some())
            .finish()
    }
}
