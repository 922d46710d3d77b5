/// Track domain type
use crate::types::TrackId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Audio track
///
/// Immutable once scanned; the whole library is replaced wholesale on rescans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Unique track identifier from the device content index
    pub id: TrackId,

    /// Playable locator (content URI)
    pub uri: String,

    /// Track title
    pub title: String,

    /// Artist name
    pub artist: String,

    /// Album name
    pub album: String,

    /// Track duration in milliseconds
    pub duration_ms: u64,

    /// File path on disk
    pub file_path: PathBuf,

    /// MIME type of the audio file
    pub mime_type: String,

    /// File size in bytes
    pub size_bytes: u64,

    /// Track number in album
    pub track_number: Option<u32>,

    /// Release year
    pub year: Option<u32>,

    /// When the file was added to the device
    pub added_at: DateTime<Utc>,

    /// When the file was last modified
    pub modified_at: DateTime<Utc>,

    /// Artwork locator (optional)
    pub artwork_uri: Option<String>,
}

impl Track {
    /// Create a new track with minimal metadata
    pub fn new(id: TrackId, title: impl Into<String>, uri: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            uri: uri.into(),
            title: title.into(),
            artist: String::new(),
            album: String::new(),
            duration_ms: 0,
            file_path: PathBuf::new(),
            mime_type: "audio/*".to_string(),
            size_bytes: 0,
            track_number: None,
            year: None,
            added_at: now,
            modified_at: now,
            artwork_uri: None,
        }
    }

    /// Get the track duration as a Duration
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Duration formatted as `m:ss` for display
    pub fn formatted_duration(&self) -> String {
        let total_seconds = self.duration_ms / 1000;
        format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
    }
}
