//! Task spawning and execution.
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//!
//! async fn example() {
//!     let handle = task::spawn(async { 42 });
//!     assert_eq!(handle.await.unwrap(), 42);
//!
//!     let blocking = task::spawn_blocking(|| 7);
//!     assert_eq!(blocking.await.unwrap(), 7);
//! }
//! ```

pub use tokio::task::{spawn_blocking, yield_now, AbortHandle, JoinError, JoinHandle};

/// Spawns a new asynchronous task on the ambient Tokio runtime.
///
/// The spawned task may run on a different thread. Must be called from within
/// a runtime context (an async fn driven by Tokio, or `runtime::block_on`).
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::task::spawn(future)
}

/// Result type for task operations.
pub type Result<T> = std::result::Result<T, JoinError>;
