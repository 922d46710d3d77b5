/// Playlist domain type
use crate::types::PlaylistId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User-created playlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    /// Unique playlist identifier
    pub id: PlaylistId,

    /// Display name
    pub name: String,

    /// Number of tracks currently in the playlist
    pub track_count: i64,

    /// When the playlist was created
    pub created_at: DateTime<Utc>,

    /// When the playlist was last modified
    pub updated_at: DateTime<Utc>,
}

impl Playlist {
    /// Create a new empty playlist
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: PlaylistId::generate(),
            name: name.into(),
            track_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
