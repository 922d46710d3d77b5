//! Wavelet Player - Playback Session
//!
//! The session controller is the single owner of the mutable "now playing"
//! state. It mediates between three independently-changing sources of truth:
//!
//! - the playback engine's internal position/track pointer, arriving as
//!   asynchronous [`EngineEvent`](wavelet_engine::EngineEvent)s
//! - the UI's optimistic scrubbing state (the three-phase seek protocol)
//! - the durable queue and playback-state mirrors in `wavelet-storage`
//!
//! Commands update live state synchronously and mirror into storage with
//! fire-and-forget background writes; engine events apply in production
//! order; the position ticker samples the engine while a user scrub is not
//! in progress. On the first engine-ready signal the controller restores the
//! previous session from the durable records, and on dispose it persists the
//! current track and position.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wavelet_engine::{EngineAdapter, EngineConnector};
//! use wavelet_session::SessionController;
//!
//! # async fn example(connector: Arc<dyn EngineConnector>) -> Result<(), Box<dyn std::error::Error>> {
//! let pool = wavelet_storage::create_pool("sqlite://wavelet.db").await?;
//! wavelet_storage::run_migrations(&pool).await?;
//!
//! let adapter = EngineAdapter::new(connector);
//! let controller = SessionController::spawn(adapter, pool);
//!
//! let mut is_playing = controller.state().watch_is_playing();
//! controller.toggle_play_pause();
//! # Ok(())
//! # }
//! ```

mod controller;
mod state;
mod ticker;

pub use controller::SessionController;
pub use state::{LiveState, SessionState};
pub use ticker::TICK_INTERVAL;
