/// Playback session types: repeat mode, durable queue entries, and the
/// singleton playback record used for cross-restart recovery.
use crate::types::TrackId;
use serde::{Deserialize, Serialize};

/// Repeat mode for playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Off,
    All,
    One,
}

impl RepeatMode {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::All => "all",
            Self::One => "one",
        }
    }

    /// Parse from string
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "off" => Some(Self::Off),
            "all" => Some(Self::All),
            "one" => Some(Self::One),
            _ => None,
        }
    }

    /// The next mode in the toggle cycle: Off -> All -> One -> Off
    #[must_use]
    pub fn cycled(self) -> Self {
        match self {
            Self::Off => Self::All,
            Self::All => Self::One,
            Self::One => Self::Off,
        }
    }
}

impl std::fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of the durable play queue
///
/// Positions within the queue are a contiguous zero-based sequence with no
/// gaps or duplicates after any mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Track this entry points at
    pub track_id: TrackId,

    /// Zero-based position in the queue
    pub position: i64,

    /// When the entry was inserted (Unix epoch seconds)
    pub added_at: i64,
}

/// Durable snapshot of the playback session - exactly one logical row
///
/// Created once lazily if absent; thereafter only updated, never deleted.
/// Used only for cross-restart recovery, never as the runtime source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackRecord {
    /// Current track (if any)
    pub current_track_id: Option<TrackId>,

    /// Current position in milliseconds
    pub position_ms: u64,

    /// Repeat mode
    pub repeat_mode: RepeatMode,

    /// Whether shuffle is enabled
    pub shuffle_enabled: bool,

    /// Playback speed multiplier (positive, typically 0.25-4.0)
    pub speed: f32,

    /// Last update timestamp (Unix epoch seconds)
    pub updated_at: i64,
}

impl Default for PlaybackRecord {
    fn default() -> Self {
        Self {
            current_track_id: None,
            position_ms: 0,
            repeat_mode: RepeatMode::Off,
            shuffle_enabled: false,
            speed: 1.0,
            updated_at: 0,
        }
    }
}
