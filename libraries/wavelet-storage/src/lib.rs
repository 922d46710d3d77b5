//! Wavelet Player Storage
//!
//! `SQLite` database layer for Wavelet Player.
//!
//! This crate provides persistent storage for the scanned track library, the
//! play queue, the singleton playback-state record, and playlists.
//!
//! # Architecture
//!
//! - **Vertical Slicing**: Each feature owns its own queries and logic
//! - **Durable Mirrors**: The queue and playback-state tables are written only
//!   by the session controller, as whole-row / whole-queue replacements, so a
//!   crash never leaves a torn queue
//! - **Read-Anywhere**: Library reads (tracks, playlists) need no coordination
//!   with the writer
//!
//! # Example
//!
//! ```rust,no_run
//! use wavelet_storage::{create_pool, run_migrations, queue};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool("sqlite://wavelet.db").await?;
//! run_migrations(&pool).await?;
//!
//! let tracks = queue::get_tracks(&pool).await?;
//! # Ok(())
//! # }
//! ```

mod error;

// Vertical slices
pub mod playback_state;
pub mod playlists;
pub mod queue;
pub mod tracks;

pub use error::StorageError;

use sqlx::sqlite::SqlitePool;

/// Run database migrations
///
/// Migrations are embedded in the binary for reliability across different
/// execution contexts. This should be called once when the application starts.
///
/// # Errors
///
/// Returns an error if a migration statement fails to execute
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), StorageError> {
    const MIGRATIONS: &[&str] = &[
        include_str!("../migrations/20250612000001_create_tracks.sql"),
        include_str!("../migrations/20250612000002_create_queue_items.sql"),
        include_str!("../migrations/20250612000003_create_queue_items_track_index.sql"),
        include_str!("../migrations/20250612000004_create_playback_state.sql"),
        include_str!("../migrations/20250612000005_create_playlists.sql"),
        include_str!("../migrations/20250612000006_create_playlist_tracks.sql"),
    ];

    for migration in MIGRATIONS {
        sqlx::query(migration)
            .execute(pool)
            .await
            .map_err(|e| StorageError::Migration(e.to_string()))?;
    }

    Ok(())
}

/// Create a new `SQLite` pool
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string (e.g., `<sqlite://wavelet.db>`)
///
/// # Errors
///
/// Returns an error if the connection fails
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
    use std::str::FromStr;

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}
