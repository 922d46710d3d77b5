//! Domain types for Wavelet Player

mod ids;
mod playlist;
mod session;
mod track;

pub use ids::{PlaylistId, TrackId};
pub use playlist::Playlist;
pub use session::{PlaybackRecord, QueueEntry, RepeatMode};
pub use track::Track;
