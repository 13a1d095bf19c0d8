//! # Playback Engine
//!
//! Wraps the host's opaque audio output. The engine holds at most one
//! [`AudioStream`] and always releases it before opening the next one.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle --play--> Preparing --prepared--> Prepared --start--> Playing <--> Paused
//!   ^                                                                 |
//!   +------------------------------ stop -----------------------------+
//! ```
//!
//! Output is only started after the stream reports it is prepared. The engine
//! is owned by the session actor, so none of its methods take locks.

use bridge_traits::audio::{AudioOutput, AudioStream};
use bridge_traits::BridgeError;
use core_async::task::{self, AbortHandle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{PlaybackError, Result};

/// Where the engine is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    Idle,
    Preparing,
    Prepared,
    Playing,
    Paused,
}

impl EnginePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            EnginePhase::Idle => "idle",
            EnginePhase::Preparing => "preparing",
            EnginePhase::Prepared => "prepared",
            EnginePhase::Playing => "playing",
            EnginePhase::Paused => "paused",
        }
    }
}

/// Result of [`PlaybackEngine::stop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// A stream was held and has been released.
    Released,
    /// Nothing was held; the call was a no-op.
    AlreadyStopped,
}

pub struct PlaybackEngine {
    output: Arc<dyn AudioOutput>,
    stream: Option<Arc<dyn AudioStream>>,
    phase: EnginePhase,
    prepared_watcher: Option<AbortHandle>,
}

impl PlaybackEngine {
    pub fn new(output: Arc<dyn AudioOutput>) -> Self {
        Self {
            output,
            stream: None,
            phase: EnginePhase::Idle,
            prepared_watcher: None,
        }
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn is_loaded(&self) -> bool {
        self.stream.is_some()
    }

    /// Releases any held stream, opens `path` and starts preparing it.
    ///
    /// `on_prepared` runs exactly once, from a spawned task, when the stream
    /// reports ready or fails to prepare. It does not run if the engine moves
    /// on to another track (or stops) first.
    pub async fn play<F>(&mut self, path: &Path, on_prepared: F) -> Result<()>
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        self.release_current();

        let stream = self
            .output
            .open(path)
            .await
            .map_err(|e| PlaybackError::AudioDevice(e.to_string()))?;

        let watched = Arc::clone(&stream);
        let watcher = task::spawn(async move {
            let result = watched
                .prepared()
                .await
                .map_err(|e| PlaybackError::AudioDevice(e.to_string()));
            on_prepared(result);
        });

        self.prepared_watcher = Some(watcher.abort_handle());
        self.stream = Some(stream);
        self.phase = EnginePhase::Preparing;
        Ok(())
    }

    /// Records that the held stream finished preparing.
    pub fn mark_prepared(&mut self) -> Result<()> {
        self.require_stream()?;
        match self.phase {
            EnginePhase::Preparing => {
                self.phase = EnginePhase::Prepared;
                self.prepared_watcher = None;
                Ok(())
            }
            other => Err(PlaybackError::NotPrepared(other.as_str())),
        }
    }

    /// Starts output. Only valid once prepared.
    pub fn start(&mut self) -> Result<()> {
        let stream = self.require_stream()?;
        match self.phase {
            EnginePhase::Prepared | EnginePhase::Paused => {
                stream
                    .start()
                    .map_err(|e| PlaybackError::AudioDevice(e.to_string()))?;
                self.phase = EnginePhase::Playing;
                Ok(())
            }
            EnginePhase::Playing => Ok(()),
            other => Err(PlaybackError::NotPrepared(other.as_str())),
        }
    }

    /// Toggles output on the stream's current playing flag.
    ///
    /// Returns the new playing flag.
    pub fn pause_resume(&mut self) -> Result<bool> {
        let stream = self.require_stream()?;
        if self.phase == EnginePhase::Preparing {
            return Err(PlaybackError::NotPrepared(self.phase.as_str()));
        }

        if stream.is_playing() {
            stream.pause()?;
            self.phase = EnginePhase::Paused;
            Ok(false)
        } else {
            self.start()?;
            Ok(true)
        }
    }

    pub fn seek(&mut self, position: Duration) -> Result<()> {
        let stream = self.require_stream()?;
        if self.phase == EnginePhase::Preparing {
            return Err(PlaybackError::NotPrepared(self.phase.as_str()));
        }
        stream.seek(position)?;
        Ok(())
    }

    /// Halts output and releases the stream. Safe to call repeatedly.
    pub fn stop(&mut self) -> StopOutcome {
        if self.stream.is_none() {
            debug!("Stop requested with no stream held");
            return StopOutcome::AlreadyStopped;
        }
        self.release_current();
        StopOutcome::Released
    }

    pub fn position(&self) -> Result<Duration> {
        Ok(self.require_stream()?.position())
    }

    pub fn duration(&self) -> Result<Duration> {
        Ok(self.require_stream()?.duration())
    }

    pub fn is_playing(&self) -> Result<bool> {
        Ok(self.require_stream()?.is_playing())
    }

    fn require_stream(&self) -> Result<Arc<dyn AudioStream>> {
        self.stream
            .as_ref()
            .map(Arc::clone)
            .ok_or(PlaybackError::NoActiveSession)
    }

    fn release_current(&mut self) {
        if let Some(watcher) = self.prepared_watcher.take() {
            watcher.abort();
        }

        let Some(stream) = self.stream.take() else {
            return;
        };

        match stream.stop() {
            Ok(()) => {}
            Err(BridgeError::InvalidState(reason)) => {
                debug!(reason = %reason, "Stream already stopped");
            }
            Err(e) => {
                warn!(error = %e, "Failed to stop stream, releasing anyway");
            }
        }
        stream.release();
        self.phase = EnginePhase::Idle;
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.release_current();
    }
}

impl std::fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("phase", &self.phase)
            .field("loaded", &self.stream.is_some())
            .finish()
    }
}
