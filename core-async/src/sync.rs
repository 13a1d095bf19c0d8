//! Synchronization primitives.
//!
//! All primitives are async-aware Tokio types and are `Send + Sync`, so they
//! can be shared between the session actor, spawned lookups and tick loops.
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::{watch, Mutex};
//!
//! async fn example() {
//!     let mutex = Mutex::new(42);
//!     *mutex.lock().await += 1;
//!
//!     let (tx, rx) = watch::channel(0u32);
//!     tx.send_replace(7);
//!     assert_eq!(*rx.borrow(), 7);
//! }
//! ```

pub use tokio::sync::{
    broadcast, mpsc, oneshot, watch, Barrier, Mutex, MutexGuard, Notify, OnceCell, RwLock,
    RwLockReadGuard, RwLockWriteGuard, Semaphore, SemaphorePermit,
};

pub use tokio_util::sync::{CancellationToken, DropGuard};
