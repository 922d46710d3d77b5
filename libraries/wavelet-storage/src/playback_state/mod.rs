//! Singleton playback-state record
//!
//! Exactly one logical row (id = 1) holding the session snapshot used for
//! cross-restart recovery. Created once lazily, then only updated.

use crate::StorageError;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use wavelet_core::types::{PlaybackRecord, RepeatMode, TrackId};

type Result<T> = std::result::Result<T, StorageError>;

/// Ensure the singleton row exists
///
/// Race-safe: concurrent callers cannot create a second row.
pub async fn ensure_exists(pool: &SqlitePool) -> Result<()> {
    let now = Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO playback_state (id, updated_at) VALUES (1, ?) \
         ON CONFLICT(id) DO NOTHING",
    )
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get the playback record, if one has been created
pub async fn get(pool: &SqlitePool) -> Result<Option<PlaybackRecord>> {
    let row = sqlx::query(
        "SELECT current_track_id, position_ms, repeat_mode, shuffle_enabled, speed, updated_at \
         FROM playback_state WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| PlaybackRecord {
        current_track_id: r
            .get::<Option<String>, _>("current_track_id")
            .map(TrackId::new),
        position_ms: r.get::<i64, _>("position_ms").max(0) as u64,
        repeat_mode: RepeatMode::from_str(&r.get::<String, _>("repeat_mode"))
            .unwrap_or(RepeatMode::Off),
        shuffle_enabled: r.get::<i64, _>("shuffle_enabled") != 0,
        speed: r.get::<f64, _>("speed") as f32,
        updated_at: r.get("updated_at"),
    }))
}

/// Update the recorded current track
pub async fn update_current_track(pool: &SqlitePool, track_id: Option<&TrackId>) -> Result<()> {
    sqlx::query("UPDATE playback_state SET current_track_id = ?, updated_at = ? WHERE id = 1")
        .bind(track_id.map(TrackId::as_str))
        .bind(Utc::now().timestamp())
        .execute(pool)
        .await?;
    Ok(())
}

/// Update the recorded position
pub async fn update_position(pool: &SqlitePool, position_ms: u64) -> Result<()> {
    sqlx::query("UPDATE playback_state SET position_ms = ?, updated_at = ? WHERE id = 1")
        .bind(position_ms as i64)
        .bind(Utc::now().timestamp())
        .execute(pool)
        .await?;
    Ok(())
}

/// Update the recorded repeat mode
pub async fn update_repeat_mode(pool: &SqlitePool, mode: RepeatMode) -> Result<()> {
    sqlx::query("UPDATE playback_state SET repeat_mode = ?, updated_at = ? WHERE id = 1")
        .bind(mode.as_str())
        .bind(Utc::now().timestamp())
        .execute(pool)
        .await?;
    Ok(())
}

/// Update the recorded shuffle flag
pub async fn update_shuffle(pool: &SqlitePool, enabled: bool) -> Result<()> {
    sqlx::query("UPDATE playback_state SET shuffle_enabled = ?, updated_at = ? WHERE id = 1")
        .bind(i64::from(enabled))
        .bind(Utc::now().timestamp())
        .execute(pool)
        .await?;
    Ok(())
}

/// Update the recorded playback speed
pub async fn update_speed(pool: &SqlitePool, speed: f32) -> Result<()> {
    sqlx::query("UPDATE playback_state SET speed = ?, updated_at = ? WHERE id = 1")
        .bind(f64::from(speed))
        .bind(Utc::now().timestamp())
        .execute(pool)
        .await?;
    Ok(())
}
