//! # Event Bus System
//!
//! Process-wide typed event bus built on `tokio::sync::broadcast`. It carries
//! two families of events:
//!
//! - **Control signals** ([`ControlSignal`]): payload-less user intents raised
//!   by notification affordances (`Stop`, `Next`).
//! - **Playback events** ([`PlaybackEvent`]): the session service's lifecycle
//!   protocol (`Loading`, `Prepared`, `Started`, `Paused`, `Resumed`,
//!   `Stopped`, `Terminated`, `Error`, ...).
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   Control(Stop/Next)  ┌───────────┐
//! │ Notification ├──────────────────────>│           │   subscribe   ┌─────────┐
//! └──────────────┘                       │ EventBus  ├──────────────>│ Service │
//!                                        │ (broadcast│               └─────────┘
//! ┌──────────────┐   Playback(Prepared)  │  channel) │   subscribe   ┌────────────┐
//! │   Service    ├──────────────────────>│           ├──────────────>│ Controller │
//! └──────────────┘                       └───────────┘               └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{ControlSignal, CoreEvent, EventBus};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(CoreEvent::Control(ControlSignal::Next)).ok();
//! assert_eq!(rx.recv().await.unwrap(), CoreEvent::Control(ControlSignal::Next));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; keep going.
//! - **`RecvError::Closed`**: every sender is gone; treat as shutdown.
//!
//! Emitting with no subscribers returns `Err(SendError)`. Publishers on this
//! bus treat that as "nobody is listening" and ignore it.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use bridge_traits::notification::ControlSignal;
use bridge_traits::media::TrackId;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// User intent raised from outside the UI (notification buttons).
    Control(ControlSignal),
    /// Session lifecycle event emitted by the playback service.
    Playback(PlaybackEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Control(ControlSignal::Stop) => "Stop requested",
            CoreEvent::Control(ControlSignal::Next) => "Next track requested",
            CoreEvent::Playback(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Playback(PlaybackEvent::PermissionBlocked { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::Prepared { .. })
            | CoreEvent::Playback(PlaybackEvent::Terminated) => EventSeverity::Info,
            CoreEvent::Control(_) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }

    /// Returns the playback event if this is one.
    pub fn as_playback(&self) -> Option<&PlaybackEvent> {
        match self {
            CoreEvent::Playback(event) => Some(event),
            CoreEvent::Control(_) => None,
        }
    }

    /// Returns the control signal if this is one.
    pub fn as_control(&self) -> Option<ControlSignal> {
        match self {
            CoreEvent::Control(signal) => Some(*signal),
            CoreEvent::Playback(_) => None,
        }
    }
}

impl From<ControlSignal> for CoreEvent {
    fn from(signal: ControlSignal) -> Self {
        CoreEvent::Control(signal)
    }
}

impl From<PlaybackEvent> for CoreEvent {
    fn from(event: PlaybackEvent) -> Self {
        CoreEvent::Playback(event)
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Lifecycle events emitted by the playback session service.
///
/// `generation` tags one load cycle. Receivers compare it against the latest
/// generation they know about and drop anything older.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A new load cycle began; metadata is being resolved.
    Loading {
        generation: u64,
        track_id: TrackId,
    },
    /// The engine reported ready and output has been started.
    Prepared {
        generation: u64,
        track_id: TrackId,
        /// Track duration (milliseconds).
        duration_ms: u64,
    },
    /// Output started.
    Started { track_id: TrackId },
    /// Playback paused.
    Paused {
        track_id: TrackId,
        /// Position when paused (milliseconds).
        position_ms: u64,
    },
    /// Playback resumed after pause.
    Resumed {
        track_id: TrackId,
        /// Position when resumed (milliseconds).
        position_ms: u64,
    },
    /// Output stopped and released.
    Stopped { track_id: Option<TrackId> },
    /// Playback position changed (seek or tick).
    PositionChanged {
        track_id: TrackId,
        position_ms: u64,
        duration_ms: u64,
    },
    /// The start path is blocked until the user grants a runtime permission.
    PermissionBlocked {
        track_id: TrackId,
        /// Name of the missing permission.
        permission: String,
    },
    /// The service left the foreground and its actor exited.
    Terminated,
    /// Playback error occurred.
    Error {
        track_id: Option<TrackId>,
        /// Human-readable error message.
        message: String,
        /// Whether retrying the same request may succeed.
        recoverable: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::Loading { .. } => "Track loading",
            PlaybackEvent::Prepared { .. } => "Track prepared",
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Resumed { .. } => "Playback resumed",
            PlaybackEvent::Stopped { .. } => "Playback stopped",
            PlaybackEvent::PositionChanged { .. } => "Playback position changed",
            PlaybackEvent::PermissionBlocked { .. } => "Blocked: permission required",
            PlaybackEvent::Terminated => "Playback service terminated",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }

    /// Returns the load-cycle generation carried by the event, if any.
    pub fn generation(&self) -> Option<u64> {
        match self {
            PlaybackEvent::Loading { generation, .. }
            | PlaybackEvent::Prepared { generation, .. } => Some(*generation),
            _ => None,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Clone it to get another producer; every `subscribe()` creates an
/// independent receiver that sees events emitted after the call.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// A subscriber that falls behind by more than `capacity` events receives
    /// `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Raises a control signal.
    pub fn signal(&self, signal: ControlSignal) -> Result<usize, SendError<CoreEvent>> {
        self.emit(CoreEvent::Control(signal))
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(16);
/// let controls = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Control(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function to this stream.
    ///
    /// Only events that match the filter will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
