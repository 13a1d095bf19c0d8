//! Runtime seam for the now-playing core.
//!
//! Every `core-*` and `bridge-*` crate reaches the executor through this crate
//! instead of depending on Tokio directly, so the playback actor, metadata
//! lookups and tick loops all agree on one set of primitives.
//!
//! # Modules
//!
//! - `task`: Task spawning and execution
//! - `time`: Sleep, intervals and a pause-aware `Instant`
//! - `sync`: Channels, locks, cells and cancellation
//! - `runtime`: `block_on` helpers used by the attribute macros
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//! use core_async::time::{sleep, Duration};
//!
//! async fn example() {
//!     let handle = task::spawn(async {
//!         sleep(Duration::from_millis(10)).await;
//!         42
//!     });
//!     assert_eq!(handle.await.unwrap(), 42);
//! }
//! ```

// Re-export the async entry-point/test macros so downstream crates never need
// direct Tokio dependencies.
pub use core_async_macros::{main, test};

pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use task::spawn;
pub use time::{sleep, Duration, Instant};
