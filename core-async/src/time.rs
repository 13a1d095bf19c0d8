//! Time-related abstractions.
//!
//! `Instant` is Tokio's instant rather than `std::time::Instant`: it follows
//! the runtime clock, so it stays consistent with `sleep` when a test pauses
//! and auto-advances time.
//!
//! # Examples
//!
//! ```rust
//! use core_async::time::{sleep, Duration, Instant};
//!
//! async fn example() {
//!     let start = Instant::now();
//!     sleep(Duration::from_millis(5)).await;
//!     assert!(start.elapsed() >= Duration::from_millis(5));
//! }
//! ```

pub use tokio::time::{
    interval, interval_at, sleep, sleep_until, timeout, Instant, Interval, MissedTickBehavior,
    Sleep, Timeout,
};

pub use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Converts a duration to whole milliseconds, saturating at `u64::MAX`.
pub fn as_millis_u64(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
