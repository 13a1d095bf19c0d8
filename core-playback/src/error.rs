//! # Playback Error Types
//!
//! Error taxonomy for the playback session: precondition violations, metadata
//! resolution failures and platform/bridge failures are kept distinct so
//! callers can decide whether to retry, surface a message, or ignore.

use bridge_traits::error::BridgeError;
use bridge_traits::media::TrackId;
use thiserror::Error;

/// Errors that can occur during playback session operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Precondition Errors
    // ========================================================================
    /// No audio resource is held, or no track has been selected yet.
    #[error("No active playback session")]
    NoActiveSession,

    /// Advancing was requested against an empty browsing list.
    #[error("Browsing list is empty")]
    EmptyBrowsingList,

    /// The current track is not an element of the browsing list.
    #[error("Track {0} is not in the browsing list")]
    TrackNotInBrowsingList(TrackId),

    /// The browsing list is still loading or failed to load.
    #[error("Browsing list has not been loaded")]
    BrowsingListNotLoaded,

    /// The engine was asked to start or seek before its resource was ready.
    #[error("Playback engine is not prepared (phase: {0})")]
    NotPrepared(&'static str),

    // ========================================================================
    // Metadata Errors
    // ========================================================================
    /// A required metadata field does not exist for the track.
    #[error("Metadata not found for track {track_id}: {field}")]
    MetadataNotFound {
        track_id: TrackId,
        field: &'static str,
    },

    /// The media index query itself failed.
    #[error("Metadata lookup failed for track {track_id}: {source}")]
    MetadataLookup {
        track_id: TrackId,
        #[source]
        source: BridgeError,
    },

    // ========================================================================
    // Platform Errors
    // ========================================================================
    /// The user declined a runtime permission the start path needs.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The playback service actor is not running (never started or exited).
    #[error("Playback service is not running")]
    ServiceNotRunning,

    /// Native audio output failed to open, prepare or start.
    #[error("Audio device error: {0}")]
    AudioDevice(String),

    /// Any other host bridge failure.
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// Session configuration is invalid.
    #[error("Invalid session configuration: {0}")]
    Config(String),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` if the caller violated a precondition. These are
    /// programming or UI-state errors, not failures of the platform.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            PlaybackError::NoActiveSession
                | PlaybackError::EmptyBrowsingList
                | PlaybackError::TrackNotInBrowsingList(_)
                | PlaybackError::BrowsingListNotLoaded
                | PlaybackError::NotPrepared(_)
        )
    }

    /// Returns `true` if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlaybackError::MetadataLookup { .. }
                | PlaybackError::AudioDevice(_)
                | PlaybackError::Bridge(BridgeError::QueryFailed(_))
                | PlaybackError::Bridge(BridgeError::Io(_))
        )
    }

    /// Returns `true` if the requested metadata simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PlaybackError::MetadataNotFound { .. })
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
