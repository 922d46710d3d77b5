//! Wavelet Player Core
//!
//! Platform-agnostic core types, traits, and error handling for Wavelet Player.
//!
//! This crate provides the foundational building blocks used across the
//! storage, engine, and session layers:
//! - **Domain Types**: `Track`, `QueueEntry`, `PlaybackRecord`, `Playlist`
//! - **Collaborator Traits**: `MediaIndexer`
//! - **Error Handling**: Unified `CoreError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use wavelet_core::types::{Track, TrackId, RepeatMode};
//!
//! let track = Track::new(TrackId::new("42"), "My Favorite Song", "content://media/42");
//! assert_eq!(track.title, "My Favorite Song");
//!
//! // Repeat cycles Off -> All -> One -> Off
//! assert_eq!(RepeatMode::Off.cycled(), RepeatMode::All);
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod progress;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use progress::ProgressThrottle;
pub use traits::{MediaIndexer, ScanProgressFn};
pub use types::{
    PlaybackRecord, Playlist, PlaylistId, QueueEntry, RepeatMode, Track, TrackId,
};
