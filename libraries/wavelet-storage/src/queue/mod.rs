//! Durable play queue storage
//!
//! The queue is an ordered list of track references mirroring the session's
//! live queue. Positions form a contiguous zero-based sequence with no gaps or
//! duplicates after every mutation; multi-row rewrites run inside a single
//! transaction so a crash leaves either the old queue or the new one.

use crate::StorageError;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use wavelet_core::types::{QueueEntry, Track, TrackId};

type Result<T> = std::result::Result<T, StorageError>;

/// Get all queue entries ordered by position
pub async fn get_entries(pool: &SqlitePool) -> Result<Vec<QueueEntry>> {
    let rows = sqlx::query(
        "SELECT track_id, position, added_at FROM queue_items ORDER BY position ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| QueueEntry {
            track_id: TrackId::new(row.get::<String, _>("track_id")),
            position: row.get("position"),
            added_at: row.get("added_at"),
        })
        .collect())
}

/// Get the resolved queue tracks in queue order
pub async fn get_tracks(pool: &SqlitePool) -> Result<Vec<Track>> {
    let entries = get_entries(pool).await?;
    let ids: Vec<TrackId> = entries.into_iter().map(|e| e.track_id).collect();
    crate::tracks::get_by_ids(pool, &ids).await
}

/// Number of entries in the queue
pub async fn len(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM queue_items")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Replace the entire queue with the given track list
///
/// This is the write path for play-now operations: clear plus reinsert in one
/// transaction.
pub async fn replace_all(pool: &SqlitePool, track_ids: &[TrackId]) -> Result<()> {
    let now = Utc::now().timestamp();
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM queue_items")
        .execute(&mut *tx)
        .await?;

    for (position, track_id) in track_ids.iter().enumerate() {
        sqlx::query("INSERT INTO queue_items (track_id, position, added_at) VALUES (?, ?, ?)")
            .bind(track_id.as_str())
            .bind(position as i64)
            .bind(now)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Append a track to the end of the queue
pub async fn append(pool: &SqlitePool, track_id: &TrackId) -> Result<()> {
    let now = Utc::now().timestamp();
    let mut tx = pool.begin().await?;

    let next_position: i64 =
        sqlx::query_scalar("SELECT COALESCE(MAX(position), -1) + 1 FROM queue_items")
            .fetch_one(&mut *tx)
            .await?;

    sqlx::query("INSERT INTO queue_items (track_id, position, added_at) VALUES (?, ?, ?)")
        .bind(track_id.as_str())
        .bind(next_position)
        .bind(now)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Insert a track immediately after the given position
///
/// The insertion point is clamped to `[0, len]`, so inserting after the last
/// element (or after any out-of-range position) appends.
pub async fn insert_after(pool: &SqlitePool, track_id: &TrackId, after_position: i64) -> Result<()> {
    let now = Utc::now().timestamp();
    let mut tx = pool.begin().await?;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM queue_items")
        .fetch_one(&mut *tx)
        .await?;
    let position = (after_position + 1).clamp(0, count);

    sqlx::query("UPDATE queue_items SET position = position + 1 WHERE position >= ?")
        .bind(position)
        .execute(&mut *tx)
        .await?;

    sqlx::query("INSERT INTO queue_items (track_id, position, added_at) VALUES (?, ?, ?)")
        .bind(track_id.as_str())
        .bind(position)
        .bind(now)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Remove the entry at the given position
///
/// Out-of-range positions are ignored; returns whether an entry was removed.
/// Remaining entries are compacted so positions stay contiguous.
pub async fn remove_at(pool: &SqlitePool, position: i64) -> Result<bool> {
    let mut tx = pool.begin().await?;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM queue_items")
        .fetch_one(&mut *tx)
        .await?;
    if position < 0 || position >= count {
        return Ok(false);
    }

    sqlx::query("DELETE FROM queue_items WHERE position = ?")
        .bind(position)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE queue_items SET position = position - 1 WHERE position > ?")
        .bind(position)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(true)
}

/// Move the entry at `from_position` to `to_position`
///
/// Out-of-range indices leave the queue completely unchanged; returns whether
/// a move happened. Implemented as a transactional clear-and-reinsert so the
/// rewrite is atomic.
pub async fn move_item(pool: &SqlitePool, from_position: i64, to_position: i64) -> Result<bool> {
    let mut tx = pool.begin().await?;

    let rows = sqlx::query(
        "SELECT track_id, added_at FROM queue_items ORDER BY position ASC",
    )
    .fetch_all(&mut *tx)
    .await?;

    let len = rows.len() as i64;
    if from_position < 0 || from_position >= len || to_position < 0 || to_position >= len {
        return Ok(false);
    }
    if from_position == to_position {
        return Ok(true);
    }

    let mut items: Vec<(String, i64)> = rows
        .iter()
        .map(|row| (row.get::<String, _>("track_id"), row.get::<i64, _>("added_at")))
        .collect();
    let item = items.remove(from_position as usize);
    items.insert(to_position as usize, item);

    sqlx::query("DELETE FROM queue_items")
        .execute(&mut *tx)
        .await?;

    for (position, (track_id, added_at)) in items.iter().enumerate() {
        sqlx::query("INSERT INTO queue_items (track_id, position, added_at) VALUES (?, ?, ?)")
            .bind(track_id)
            .bind(position as i64)
            .bind(added_at)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(true)
}

/// Clear the entire queue
pub async fn clear(pool: &SqlitePool) -> Result<()> {
    sqlx::query("DELETE FROM queue_items").execute(pool).await?;
    Ok(())
}
