//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the playback core:
//! - Logging and tracing infrastructure
//! - Configuration management (host bridge injection)
//! - Process-wide typed event bus
//!
//! ## Overview
//!
//! Every other core crate depends on this one for its logging conventions,
//! for the [`CoreConfig`](config::CoreConfig) that carries host bridges, and
//! for the [`EventBus`](events::EventBus) carrying control signals and
//! playback lifecycle events.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
