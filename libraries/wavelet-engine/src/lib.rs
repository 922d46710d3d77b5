//! Wavelet Player - Playback Engine Adapter
//!
//! Presents a stable command/event interface over an opaque playback engine
//! whose construction is asynchronous and may fail or never complete.
//!
//! The engine itself (audio decode/output plus the OS remote-control session)
//! is a black box behind the [`MediaEngine`] trait; platform integrations
//! provide it through an [`EngineConnector`]. The [`EngineAdapter`] owns the
//! connection lifecycle:
//!
//! - `initialize()` is idempotent and never blocks; readiness is observable
//! - a failed connection leaves the adapter in query-returns-defaults mode
//!   where every command is a silent no-op
//! - `release()` cancels a pending connection and detaches the handle, and is
//!   safe to call repeatedly
//!
//! Engine events arrive over a single-consumer channel in production order so
//! the session controller applies them without reordering.

mod adapter;
mod engine;
mod error;
mod events;

pub use adapter::EngineAdapter;
pub use engine::{EngineConnection, EngineConnector, EngineItem, MediaEngine};
pub use error::{EngineError, Result};
pub use events::{EngineEvent, TransportState};
