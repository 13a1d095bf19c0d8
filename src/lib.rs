//! Workspace umbrella crate.
//!
//! Exposes the playback core behind one dependency. With the default
//! `desktop-shims` feature, `core-service` is pulled in together with the
//! desktop bridge implementations, so a host only needs to supply an
//! `AudioOutput`.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;
