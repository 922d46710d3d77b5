//! Engine events
//!
//! Events emitted at the engine boundary as they occur, each triggering
//! exactly one session-controller state update. Delivery preserves the order
//! the engine produced them.

use serde::{Deserialize, Serialize};
use wavelet_core::types::RepeatMode;

/// Transport readiness reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportState {
    /// The current item is prepared; duration is now known
    Ready {
        /// Duration of the current item in milliseconds
        duration_ms: u64,
    },

    /// Playback reached the end of the queue
    Ended,
}

/// Events emitted by the playback engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// Play/pause state changed (including hardware media-key input)
    IsPlayingChanged {
        /// Whether the engine is now playing
        is_playing: bool,
    },

    /// The active item in the engine queue changed
    ///
    /// Covers manual skips, queue jumps, and the engine's own auto-advance;
    /// the reason is irrelevant to the contract.
    ActiveItemChanged {
        /// Index of the new active item
        index: usize,
    },

    /// Transport state changed
    TransportChanged {
        /// The new transport state
        state: TransportState,
    },

    /// Repeat mode changed at the engine
    RepeatModeChanged {
        /// The new repeat mode
        mode: RepeatMode,
    },

    /// Shuffle flag changed at the engine
    ShuffleChanged {
        /// Whether shuffle is now enabled
        enabled: bool,
    },

    /// Playback speed changed at the engine
    SpeedChanged {
        /// The new speed multiplier
        speed: f32,
    },
}
