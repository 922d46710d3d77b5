//! Playlist storage
//!
//! User-created playlists with an ordered member list. Member positions follow
//! the same contiguous zero-based discipline as the play queue.

use crate::StorageError;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use wavelet_core::types::{Playlist, PlaylistId, Track, TrackId};

type Result<T> = std::result::Result<T, StorageError>;

/// Create a new playlist
pub async fn create(pool: &SqlitePool, name: &str) -> Result<Playlist> {
    let playlist = Playlist::new(name);

    sqlx::query("INSERT INTO playlists (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)")
        .bind(playlist.id.as_str())
        .bind(&playlist.name)
        .bind(playlist.created_at.timestamp())
        .bind(playlist.updated_at.timestamp())
        .execute(pool)
        .await?;

    Ok(playlist)
}

/// Rename a playlist
pub async fn rename(pool: &SqlitePool, id: &PlaylistId, new_name: &str) -> Result<()> {
    let result = sqlx::query("UPDATE playlists SET name = ?, updated_at = ? WHERE id = ?")
        .bind(new_name)
        .bind(Utc::now().timestamp())
        .bind(id.as_str())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StorageError::not_found("Playlist", id.as_str()));
    }
    Ok(())
}

/// Delete a playlist; returns whether one existed
pub async fn delete(pool: &SqlitePool, id: &PlaylistId) -> Result<bool> {
    let result = sqlx::query("DELETE FROM playlists WHERE id = ?")
        .bind(id.as_str())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Get all playlists ordered by name, with live track counts
pub async fn get_all(pool: &SqlitePool) -> Result<Vec<Playlist>> {
    let rows = sqlx::query(
        "SELECT p.id, p.name, p.created_at, p.updated_at, \
                (SELECT COUNT(*) FROM playlist_tracks pt WHERE pt.playlist_id = p.id) AS track_count \
         FROM playlists p ORDER BY p.name",
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(Playlist {
                id: PlaylistId::new(row.get::<String, _>("id")),
                name: row.get("name"),
                track_count: row.get("track_count"),
                created_at: DateTime::from_timestamp(row.get::<i64, _>("created_at"), 0)
                    .ok_or_else(|| StorageError::InvalidRow("invalid created_at".into()))?,
                updated_at: DateTime::from_timestamp(row.get::<i64, _>("updated_at"), 0)
                    .ok_or_else(|| StorageError::InvalidRow("invalid updated_at".into()))?,
            })
        })
        .collect()
}

/// Add a track to the end of a playlist
pub async fn add_track(pool: &SqlitePool, playlist_id: &PlaylistId, track_id: &TrackId) -> Result<()> {
    let now = Utc::now().timestamp();
    let mut tx = pool.begin().await?;

    let next_position: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(position), -1) + 1 FROM playlist_tracks WHERE playlist_id = ?",
    )
    .bind(playlist_id.as_str())
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO playlist_tracks (playlist_id, track_id, position, added_at) VALUES (?, ?, ?, ?)",
    )
    .bind(playlist_id.as_str())
    .bind(track_id.as_str())
    .bind(next_position)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE playlists SET updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(playlist_id.as_str())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Remove a track from a playlist, compacting member positions
pub async fn remove_track(
    pool: &SqlitePool,
    playlist_id: &PlaylistId,
    track_id: &TrackId,
) -> Result<()> {
    let mut tx = pool.begin().await?;

    let position: Option<i64> = sqlx::query_scalar(
        "SELECT position FROM playlist_tracks WHERE playlist_id = ? AND track_id = ?",
    )
    .bind(playlist_id.as_str())
    .bind(track_id.as_str())
    .fetch_optional(&mut *tx)
    .await?;

    let Some(position) = position else {
        return Ok(());
    };

    sqlx::query("DELETE FROM playlist_tracks WHERE playlist_id = ? AND track_id = ?")
        .bind(playlist_id.as_str())
        .bind(track_id.as_str())
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "UPDATE playlist_tracks SET position = position - 1 WHERE playlist_id = ? AND position > ?",
    )
    .bind(playlist_id.as_str())
    .bind(position)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE playlists SET updated_at = ? WHERE id = ?")
        .bind(Utc::now().timestamp())
        .bind(playlist_id.as_str())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Get the resolved tracks of a playlist in member order
pub async fn get_tracks(pool: &SqlitePool, playlist_id: &PlaylistId) -> Result<Vec<Track>> {
    let rows = sqlx::query(
        "SELECT track_id FROM playlist_tracks WHERE playlist_id = ? ORDER BY position ASC",
    )
    .bind(playlist_id.as_str())
    .fetch_all(pool)
    .await?;

    let ids: Vec<TrackId> = rows
        .iter()
        .map(|row| TrackId::new(row.get::<String, _>("track_id")))
        .collect();

    crate::tracks::get_by_ids(pool, &ids).await
}
