//! Audio output bridge.
//!
//! Wraps the platform's media pipeline (MediaPlayer, AVPlayer, a cpal sink)
//! as an opaque, scarce resource. The core opens at most one [`AudioStream`]
//! at a time and always releases the previous one before opening another.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;

/// Factory for native playback resources.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Allocate a native player for `path` and begin preparing it.
    ///
    /// Preparation continues asynchronously; await
    /// [`AudioStream::prepared`] before calling [`AudioStream::start`].
    async fn open(&self, path: &Path) -> Result<Arc<dyn AudioStream>>;
}

/// A single prepared-or-preparing native player.
///
/// Control calls are synchronous because native players answer them
/// immediately; only readiness is asynchronous.
#[async_trait]
pub trait AudioStream: Send + Sync {
    /// Resolves once the native resource reports it is ready to start.
    ///
    /// Implementations must resolve at most once per stream; a released
    /// stream may resolve with an error or never.
    async fn prepared(&self) -> Result<()>;

    /// Start or resume output.
    fn start(&self) -> Result<()>;

    /// Pause output, keeping the resource.
    fn pause(&self) -> Result<()>;

    /// Jump to an absolute position.
    fn seek(&self, position: Duration) -> Result<()>;

    /// Halt output. Native players may reject this with
    /// [`BridgeError::InvalidState`](crate::error::BridgeError::InvalidState)
    /// when already stopped.
    fn stop(&self) -> Result<()>;

    /// Free the native resource. The stream must not be used afterwards.
    fn release(&self);

    /// Current playback offset.
    fn position(&self) -> Duration;

    /// Total length of the loaded source.
    fn duration(&self) -> Duration;

    /// Whether audio is currently being rendered.
    fn is_playing(&self) -> bool;
}
