//! Track library storage
//!
//! Tracks are produced by the media indexing collaborator and replaced
//! wholesale on every rescan; nothing here mutates individual rows.

use crate::StorageError;
use chrono::DateTime;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::path::Path;
use wavelet_core::types::{Track, TrackId};

type Result<T> = std::result::Result<T, StorageError>;

const TRACK_COLUMNS: &str = "id, uri, title, artist, album, duration_ms, file_path, mime_type, \
     size_bytes, track_number, year, added_at, modified_at, artwork_uri";

fn track_from_row(row: &SqliteRow) -> Result<Track> {
    Ok(Track {
        id: TrackId::new(row.get::<String, _>("id")),
        uri: row.get("uri"),
        title: row.get("title"),
        artist: row.get("artist"),
        album: row.get("album"),
        duration_ms: row.get::<i64, _>("duration_ms") as u64,
        file_path: Path::new(&row.get::<String, _>("file_path")).to_path_buf(),
        mime_type: row.get("mime_type"),
        size_bytes: row.get::<i64, _>("size_bytes") as u64,
        track_number: row.get::<Option<i64>, _>("track_number").map(|n| n as u32),
        year: row.get::<Option<i64>, _>("year").map(|n| n as u32),
        added_at: DateTime::from_timestamp(row.get::<i64, _>("added_at"), 0)
            .ok_or_else(|| StorageError::InvalidRow("invalid added_at timestamp".into()))?,
        modified_at: DateTime::from_timestamp(row.get::<i64, _>("modified_at"), 0)
            .ok_or_else(|| StorageError::InvalidRow("invalid modified_at timestamp".into()))?,
        artwork_uri: row.get("artwork_uri"),
    })
}

/// Replace the entire track library with the result of a rescan
///
/// Runs as a single transaction: a crash mid-rescan leaves the previous
/// library intact.
pub async fn replace_all(pool: &SqlitePool, tracks: &[Track]) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM tracks").execute(&mut *tx).await?;

    for track in tracks {
        sqlx::query(
            "INSERT INTO tracks (id, uri, title, artist, album, duration_ms, file_path, \
             mime_type, size_bytes, track_number, year, added_at, modified_at, artwork_uri) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(track.id.as_str())
        .bind(&track.uri)
        .bind(&track.title)
        .bind(&track.artist)
        .bind(&track.album)
        .bind(track.duration_ms as i64)
        .bind(track.file_path.to_string_lossy().to_string())
        .bind(&track.mime_type)
        .bind(track.size_bytes as i64)
        .bind(track.track_number.map(|n| i64::from(n)))
        .bind(track.year.map(|n| i64::from(n)))
        .bind(track.added_at.timestamp())
        .bind(track.modified_at.timestamp())
        .bind(&track.artwork_uri)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Get a single track by id
pub async fn get_by_id(pool: &SqlitePool, id: &TrackId) -> Result<Option<Track>> {
    let row = sqlx::query(&format!(
        "SELECT {TRACK_COLUMNS} FROM tracks WHERE id = ?"
    ))
    .bind(id.as_str())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(track_from_row).transpose()
}

/// Get tracks by id, preserving the order of the input list
///
/// Ids with no matching row are skipped, so a queue referencing a track that
/// disappeared in a rescan resolves to the tracks that still exist.
pub async fn get_by_ids(pool: &SqlitePool, ids: &[TrackId]) -> Result<Vec<Track>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!("SELECT {TRACK_COLUMNS} FROM tracks WHERE id IN ({placeholders})");

    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(id.as_str());
    }
    let rows = query.fetch_all(pool).await?;

    let mut by_id = std::collections::HashMap::with_capacity(rows.len());
    for row in &rows {
        let track = track_from_row(row)?;
        by_id.insert(track.id.clone(), track);
    }

    Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
}

/// Get all tracks ordered by title
pub async fn get_all(pool: &SqlitePool) -> Result<Vec<Track>> {
    let rows = sqlx::query(&format!(
        "SELECT {TRACK_COLUMNS} FROM tracks ORDER BY title"
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(track_from_row).collect()
}

/// Search tracks by title, artist, or album
pub async fn search(pool: &SqlitePool, query: &str) -> Result<Vec<Track>> {
    let pattern = format!("%{}%", query);

    let rows = sqlx::query(&format!(
        "SELECT {TRACK_COLUMNS} FROM tracks \
         WHERE title LIKE ? OR artist LIKE ? OR album LIKE ? \
         ORDER BY title"
    ))
    .bind(&pattern)
    .bind(&pattern)
    .bind(&pattern)
    .fetch_all(pool)
    .await?;

    rows.iter().map(track_from_row).collect()
}

/// Number of tracks in the library
pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tracks")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
