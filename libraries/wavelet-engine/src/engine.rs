//! Opaque engine interface
//!
//! Platform integrations implement these traits; everything above them treats
//! the engine as a black box.

use crate::error::Result;
use crate::events::EngineEvent;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use wavelet_core::types::{RepeatMode, Track, TrackId};

/// Queue item handed to the engine: playable locator plus display metadata
///
/// The metadata rides along so the engine's remote-control session can render
/// the notification/lock-screen surface without calling back into the library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineItem {
    /// Track identifier, echoed back in engine events
    pub id: TrackId,

    /// Playable locator
    pub uri: String,

    /// Track title
    pub title: String,

    /// Artist name
    pub artist: String,

    /// Album name
    pub album: String,

    /// Artwork locator (optional)
    pub artwork_uri: Option<String>,
}

impl From<&Track> for EngineItem {
    fn from(track: &Track) -> Self {
        Self {
            id: track.id.clone(),
            uri: track.uri.clone(),
            title: track.title.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            artwork_uri: track.artwork_uri.clone(),
        }
    }
}

/// The opaque playback engine capability
///
/// Commands are applied to the engine's own internal queue and transport;
/// state resulting from them is reported back through [`EngineEvent`]s.
/// Queries reflect the engine's live state, not a cached guess.
pub trait MediaEngine: Send {
    /// Replace the engine queue, prepare `start_index` at `start_ms`
    fn set_items(&mut self, items: Vec<EngineItem>, start_index: usize, start_ms: u64);

    /// Start or resume playback
    fn play(&mut self);

    /// Pause playback
    fn pause(&mut self);

    /// Whether the engine is currently playing
    fn is_playing(&self) -> bool;

    /// Seek to an absolute position in the current item
    fn seek_to(&mut self, position_ms: u64);

    /// Advance to the next item
    fn seek_to_next(&mut self);

    /// Return to the previous item
    fn seek_to_previous(&mut self);

    /// Jump to the item at `index` with zero offset
    fn seek_to_item(&mut self, index: usize);

    /// Append an item to the end of the engine queue
    fn append_item(&mut self, item: EngineItem);

    /// Insert an item at `index`
    fn insert_item(&mut self, index: usize, item: EngineItem);

    /// Remove the item at `index`
    fn remove_item(&mut self, index: usize);

    /// Move the item at `from` to `to`
    fn move_item(&mut self, from: usize, to: usize);

    /// Clear the engine queue
    fn clear_items(&mut self);

    /// Set the repeat mode
    fn set_repeat_mode(&mut self, mode: RepeatMode);

    /// Enable or disable shuffle
    fn set_shuffle(&mut self, enabled: bool);

    /// Set the playback speed multiplier
    fn set_speed(&mut self, speed: f32);

    /// Current playback position in milliseconds
    fn position_ms(&self) -> u64;

    /// Index of the currently active item
    fn current_index(&self) -> usize;

    /// Number of items in the engine queue
    fn item_count(&self) -> usize;
}

/// A live engine handle plus its event stream
pub struct EngineConnection {
    /// The engine handle
    pub engine: Box<dyn MediaEngine>,

    /// Events, in production order
    pub events: mpsc::UnboundedReceiver<EngineEvent>,
}

/// Asynchronous engine factory
///
/// Connecting may take arbitrarily long and may fail; the adapter tolerates
/// both without surfacing errors to callers.
#[async_trait]
pub trait EngineConnector: Send + Sync {
    /// Establish a connection to the engine
    async fn connect(&self) -> Result<EngineConnection>;
}
