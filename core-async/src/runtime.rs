//! Runtime utilities that wrap Tokio's runtime primitives so that downstream
//! crates never need to depend on Tokio directly.

pub use tokio::runtime::{Builder, Handle, Runtime};

/// Runs the provided future to completion on a fresh current-thread runtime.
pub fn block_on<F>(future: F) -> F::Output
where
    F: std::future::Future,
{
    Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("core_async::runtime::block_on: failed to build Tokio runtime")
        .block_on(future)
}

/// Runs the provided future on a current-thread runtime whose clock starts
/// paused. Timers auto-advance whenever the runtime is otherwise idle, which
/// makes latency-ordering tests deterministic.
pub fn block_on_paused<F>(future: F) -> F::Output
where
    F: std::future::Future,
{
    Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .expect("core_async::runtime::block_on_paused: failed to build Tokio runtime")
        .block_on(future)
}
