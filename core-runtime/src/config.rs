//! # Core Configuration Module
//!
//! Builder-based configuration holding the host bridges the playback core
//! needs, validated fail-fast before anything is spawned.
//!
//! ## Required Dependencies
//!
//! - `MediaIndex` - Track enumeration and metadata lookups
//! - `AudioOutput` - Native player allocation
//! - `ForegroundHost` - Keeps the process alive while a track is loaded
//!
//! ## Optional Dependencies
//!
//! - `NotificationHost` - Channel registration (absent: channels not required)
//! - `PermissionGate` - Runtime permission prompts (absent: nothing to ask)
//! - `ThumbnailLoader` - Embedded artwork for the notification
//!
//! When the `desktop-shims` feature is enabled, a logging-only
//! `ForegroundHost` is injected if none is provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .media_index(Arc::new(MyMediaStore))
//!     .audio_output(Arc::new(MyPlayerFactory))
//!     .foreground_host(Arc::new(MyService))
//!     .permission_gate(Arc::new(MyPermissionPrompt))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{
    AudioOutput, ForegroundHost, MediaIndex, NotificationHost, PermissionGate, ThumbnailLoader,
};
use std::sync::Arc;

/// Largest accepted event bus buffer.
const MAX_EVENT_BUFFER_SIZE: usize = 10_000;

/// Host bridges and runtime settings for the playback core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Track enumeration and metadata lookups (required)
    pub media_index: Arc<dyn MediaIndex>,

    /// Native player factory (required)
    pub audio_output: Arc<dyn AudioOutput>,

    /// Foreground service host (required)
    pub foreground_host: Arc<dyn ForegroundHost>,

    /// Notification channel registration (optional)
    pub notification_host: Option<Arc<dyn NotificationHost>>,

    /// Runtime permission prompt (optional)
    pub permission_gate: Option<Arc<dyn PermissionGate>>,

    /// Embedded artwork decoder (optional)
    pub thumbnail_loader: Option<Arc<dyn ThumbnailLoader>>,

    /// Event bus buffer size
    pub event_buffer_size: usize,

    /// Feature flags
    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("media_index", &"MediaIndex { ... }")
            .field("audio_output", &"AudioOutput { ... }")
            .field("foreground_host", &"ForegroundHost { ... }")
            .field(
                "notification_host",
                &self
                    .notification_host
                    .as_ref()
                    .map(|_| "NotificationHost { ... }"),
            )
            .field(
                "permission_gate",
                &self
                    .permission_gate
                    .as_ref()
                    .map(|_| "PermissionGate { ... }"),
            )
            .field(
                "thumbnail_loader",
                &self
                    .thumbnail_loader
                    .as_ref()
                    .map(|_| "ThumbnailLoader { ... }"),
            )
            .field("event_buffer_size", &self.event_buffer_size)
            .field("features", &self.features)
            .finish()
    }
}

/// Feature flags control optional functionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureFlags {
    /// Show track artwork in the playback notification (requires ThumbnailLoader)
    pub enable_notification_artwork: bool,
}

impl CoreConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Event buffer size is within `1..=10_000`
    /// - Feature flags are consistent with available bridges
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {}",
                MAX_EVENT_BUFFER_SIZE
            )));
        }

        if self.features.enable_notification_artwork && self.thumbnail_loader.is_none() {
            return Err(Error::Config(
                "Notification artwork enabled but no ThumbnailLoader provided. \
                 Disable the feature or inject a ThumbnailLoader implementation."
                    .to_string(),
            ));
        }

        Ok(())
    }
}

fn media_index_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "MediaIndex".to_string(),
        message: "MediaIndex implementation is required to list tracks and resolve metadata. \
                 Android: wrap the MediaStore audio query. \
                 Desktop: use bridge_desktop::DirectoryMediaIndex."
            .to_string(),
    }
}

fn audio_output_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "AudioOutput".to_string(),
        message: "AudioOutput implementation is required for playback. \
                 Inject the platform's native player adapter."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn foreground_host_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "ForegroundHost".to_string(),
        message: "ForegroundHost implementation is required to keep playback alive. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default TracingForegroundHost. \
                 Android: wrap the playback Service's startForeground/stopForeground."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_foreground_host() -> Result<Arc<dyn ForegroundHost>> {
    use bridge_desktop::TracingForegroundHost;

    let host: Arc<dyn ForegroundHost> = Arc::new(TracingForegroundHost::new());
    Ok(host)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_foreground_host() -> Result<Arc<dyn ForegroundHost>> {
    Err(foreground_host_missing_error())
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    media_index: Option<Arc<dyn MediaIndex>>,
    audio_output: Option<Arc<dyn AudioOutput>>,
    foreground_host: Option<Arc<dyn ForegroundHost>>,
    notification_host: Option<Arc<dyn NotificationHost>>,
    permission_gate: Option<Arc<dyn PermissionGate>>,
    thumbnail_loader: Option<Arc<dyn ThumbnailLoader>>,
    event_buffer_size: Option<usize>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    /// Sets the media index implementation (required).
    pub fn media_index(mut self, index: Arc<dyn MediaIndex>) -> Self {
        self.media_index = Some(index);
        self
    }

    /// Sets the audio output implementation (required).
    pub fn audio_output(mut self, output: Arc<dyn AudioOutput>) -> Self {
        self.audio_output = Some(output);
        self
    }

    /// Sets the foreground host implementation (required unless
    /// `desktop-shims` provides one).
    pub fn foreground_host(mut self, host: Arc<dyn ForegroundHost>) -> Self {
        self.foreground_host = Some(host);
        self
    }

    /// Sets the notification host implementation (optional).
    pub fn notification_host(mut self, host: Arc<dyn NotificationHost>) -> Self {
        self.notification_host = Some(host);
        self
    }

    /// Sets the permission gate implementation (optional).
    pub fn permission_gate(mut self, gate: Arc<dyn PermissionGate>) -> Self {
        self.permission_gate = Some(gate);
        self
    }

    /// Sets the thumbnail loader implementation (optional).
    pub fn thumbnail_loader(mut self, loader: Arc<dyn ThumbnailLoader>) -> Self {
        self.thumbnail_loader = Some(loader);
        self
    }

    /// Sets the event bus buffer size.
    ///
    /// Default: 100 events
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Enables or disables artwork in the playback notification.
    ///
    /// Requires a `ThumbnailLoader` to be provided.
    ///
    /// Default: false
    pub fn enable_notification_artwork(mut self, enabled: bool) -> Self {
        self.features.enable_notification_artwork = enabled;
        self
    }

    /// Sets all feature flags at once.
    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when a required bridge is absent
    /// - [`Error::Config`] when a value is out of range or a feature flag
    ///   lacks its bridge
    pub fn build(self) -> Result<CoreConfig> {
        let media_index = self.media_index.ok_or_else(media_index_missing_error)?;
        let audio_output = self.audio_output.ok_or_else(audio_output_missing_error)?;

        let foreground_host = match self.foreground_host {
            Some(host) => host,
            None => provide_default_foreground_host()?,
        };

        let config = CoreConfig {
            media_index,
            audio_output,
            foreground_host,
            notification_host: self.notification_host,
            permission_gate: self.permission_gate,
            thumbnail_loader: self.thumbnail_loader,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            features: self.features,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{AudioStream, RenderedNotification, SortOrder, Thumbnail, TrackId};
    use std::path::Path;

    struct StubIndex;

    #[async_trait]
    impl MediaIndex for StubIndex {
        async fn list_tracks(&self, _order: SortOrder) -> BridgeResult<Vec<TrackId>> {
            Ok(Vec::new())
        }

        async fn data_path(&self, _id: TrackId) -> BridgeResult<Option<String>> {
            Ok(None)
        }

        async fn display_name(&self, _id: TrackId) -> BridgeResult<Option<String>> {
            Ok(None)
        }

        async fn album_name(&self, _id: TrackId) -> BridgeResult<Option<String>> {
            Ok(None)
        }

        async fn artist_name(&self, _id: TrackId) -> BridgeResult<Option<String>> {
            Ok(None)
        }
    }

    struct StubOutput;

    #[async_trait]
    impl AudioOutput for StubOutput {
        async fn open(&self, _path: &Path) -> BridgeResult<Arc<dyn AudioStream>> {
            Err(bridge_traits::BridgeError::NotAvailable(
                "no audio device".to_string(),
            ))
        }
    }

    struct StubForeground;

    #[async_trait]
    impl ForegroundHost for StubForeground {
        async fn start_foreground(
            &self,
            _notification_id: u32,
            _notification: RenderedNotification,
        ) -> BridgeResult<()> {
            Ok(())
        }

        async fn stop_foreground(&self, _remove_notification: bool) -> BridgeResult<()> {
            Ok(())
        }
    }

    struct StubThumbnails;

    #[async_trait]
    impl ThumbnailLoader for StubThumbnails {
        async fn load(&self, _path: &str) -> BridgeResult<Option<Thumbnail>> {
            Ok(None)
        }
    }

    fn complete_builder() -> CoreConfigBuilder {
        CoreConfig::builder()
            .media_index(Arc::new(StubIndex))
            .audio_output(Arc::new(StubOutput))
            .foreground_host(Arc::new(StubForeground))
    }

    #[test]
    fn test_builder_requires_media_index() {
        let result = CoreConfig::builder()
            .audio_output(Arc::new(StubOutput))
            .foreground_host(Arc::new(StubForeground))
            .build();

        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("MediaIndex"));
        assert!(err_msg.contains("list tracks"));
    }

    #[test]
    fn test_builder_requires_audio_output() {
        let result = CoreConfig::builder()
            .media_index(Arc::new(StubIndex))
            .foreground_host(Arc::new(StubForeground))
            .build();

        assert!(matches!(
            result,
            Err(Error::CapabilityMissing { ref capability, .. }) if capability == "AudioOutput"
        ));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_foreground_host() {
        let result = CoreConfig::builder()
            .media_index(Arc::new(StubIndex))
            .audio_output(Arc::new(StubOutput))
            .build();

        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("ForegroundHost"));
        assert!(err_msg.contains("desktop-shims"));
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_builder_injects_desktop_foreground_host() {
        let result = CoreConfig::builder()
            .media_index(Arc::new(StubIndex))
            .audio_output(Arc::new(StubOutput))
            .build();

        assert!(result.is_ok());
    }

    #[test]
    fn test_builder_with_all_required_fields() {
        let config = complete_builder().build().unwrap();

        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert!(config.notification_host.is_none());
        assert!(config.permission_gate.is_none());
        assert!(config.thumbnail_loader.is_none());
        assert_eq!(config.features, FeatureFlags::default());
    }

    #[test]
    fn test_validate_rejects_zero_event_buffer() {
        let result = complete_builder().event_buffer_size(0).build();
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("must be greater than 0"));
    }

    #[test]
    fn test_validate_rejects_excessive_event_buffer() {
        let result = complete_builder().event_buffer_size(50_000).build();
        assert!(result.unwrap_err().to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_validate_artwork_requires_thumbnail_loader() {
        let result = complete_builder().enable_notification_artwork(true).build();

        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("Notification artwork enabled"));
        assert!(err_msg.contains("ThumbnailLoader"));
    }

    #[test]
    fn test_artwork_with_thumbnail_loader() {
        let config = complete_builder()
            .thumbnail_loader(Arc::new(StubThumbnails))
            .enable_notification_artwork(true)
            .build()
            .unwrap();

        assert!(config.features.enable_notification_artwork);
        assert!(config.thumbnail_loader.is_some());
    }

    #[test]
    fn test_debug_hides_bridges() {
        let config = complete_builder().build().unwrap();
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("MediaIndex { ... }"));
        assert!(rendered.contains("permission_gate: None"));
    }

    #[test]
    fn test_config_is_cloneable() {
        let config = complete_builder().event_buffer_size(64).build().unwrap();
        let cloned = config.clone();
        assert_eq!(cloned.event_buffer_size, 64);
        assert!(Arc::ptr_eq(&cloned.media_index, &config.media_index));
    }
}
