/// Collaborator traits for Wavelet Player
///
/// The session core consumes these at their interface boundary; concrete
/// implementations live with the platform integration.
use crate::error::Result;
use crate::types::Track;
use async_trait::async_trait;

/// Progress callback for media index scans: `(processed, total)`
pub type ScanProgressFn = Box<dyn Fn(usize, usize) + Send + Sync>;

/// Media indexing collaborator
///
/// Scans the device content index and returns the full set of track records.
/// The session layer only ever consumes the resulting records by id, never
/// re-scans.
#[async_trait]
pub trait MediaIndexer: Send + Sync {
    /// Scan the device for audio files
    ///
    /// `on_progress` is invoked as `(processed, total)` while the scan runs;
    /// implementations should throttle emission (see
    /// [`ProgressThrottle`](crate::progress::ProgressThrottle)).
    ///
    /// # Errors
    /// Returns an error if the content index cannot be queried.
    async fn scan(&self, on_progress: ScanProgressFn) -> Result<Vec<Track>>;
}
