//! Session controller - core orchestration
//!
//! Single owner of the live session state. Mediates between engine events,
//! UI commands, and the durable queue/playback-state mirrors; restores the
//! previous session on engine readiness and saves it on dispose.
//!
//! Command contract: always returns, always updates optimistic state, never
//! surfaces engine or storage failures to the caller. Durable mirror writes
//! are fire-and-forget background tasks; live state stays authoritative if
//! one fails.

use crate::state::SessionState;
use crate::ticker;
use sqlx::SqlitePool;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use wavelet_core::types::{RepeatMode, Track, TrackId};
use wavelet_engine::{EngineAdapter, EngineEvent, EngineItem, TransportState};
use wavelet_storage::{playback_state, queue, StorageError};

// Durable mirror writes are fire-and-forget from the caller's view but must
// still land in command order, so they funnel through one FIFO worker.
type PersistJob = Pin<Box<dyn Future<Output = ()> + Send>>;

/// The playback session controller
///
/// Created with [`spawn`](Self::spawn), which starts the engine connection,
/// the event pump, the restore watcher, and the position ticker. Dropped
/// tasks are cancelled through [`dispose`](Self::dispose).
pub struct SessionController {
    adapter: EngineAdapter,
    pool: SqlitePool,
    state: Arc<SessionState>,
    shutdown_tx: watch::Sender<bool>,
    persist_tx: mpsc::UnboundedSender<PersistJob>,
    restore_started: AtomicBool,
    disposed: AtomicBool,
}

impl SessionController {
    /// Create the controller and start its background tasks
    ///
    /// Must be called within a Tokio runtime. Initializes the engine adapter
    /// (non-blocking) and restores the persisted session once the engine
    /// signals readiness.
    pub fn spawn(adapter: EngineAdapter, pool: SqlitePool) -> Arc<Self> {
        let (shutdown_tx, _) = watch::channel(false);
        let (persist_tx, persist_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_persist_loop(persist_rx));

        let controller = Arc::new(Self {
            adapter: adapter.clone(),
            pool,
            state: Arc::new(SessionState::new()),
            shutdown_tx,
            persist_tx,
            restore_started: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        });

        controller.adapter.initialize();

        if let Some(events) = controller.adapter.take_events() {
            tokio::spawn(run_event_loop(
                Arc::clone(&controller.state),
                events,
                controller.shutdown_tx.subscribe(),
            ));
        }

        tokio::spawn(Arc::clone(&controller).run_restore_watcher(
            controller.adapter.watch_initialized(),
            controller.shutdown_tx.subscribe(),
        ));

        tokio::spawn(ticker::run(
            adapter,
            Arc::clone(&controller.state),
            controller.shutdown_tx.subscribe(),
        ));

        controller
    }

    /// The observable live state
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Whether the engine adapter has captured its handle
    pub fn is_initialized(&self) -> bool {
        self.adapter.is_initialized()
    }

    /// Observe engine readiness
    pub fn watch_initialized(&self) -> watch::Receiver<bool> {
        self.adapter.watch_initialized()
    }

    /// The position to display: scrub target while seeking, engine position
    /// otherwise
    pub fn display_position_ms(&self) -> u64 {
        self.state.display_position_ms()
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    // === Play-now operations ===

    /// Replace the queue with a single track and start playing it
    pub fn play_track(&self, track: Track) {
        self.play_tracks(vec![track], 0);
    }

    /// Replace the queue with a track list and start playing at `start_index`
    ///
    /// Live queue, current track, and index update synchronously; the durable
    /// queue mirror is rewritten in the background.
    pub fn play_tracks(&self, tracks: Vec<Track>, start_index: usize) {
        if self.is_disposed() || tracks.is_empty() {
            return;
        }
        let start_index = start_index.min(tracks.len() - 1);

        let items: Vec<EngineItem> = tracks.iter().map(EngineItem::from).collect();
        self.adapter.set_items(items, start_index, 0);
        self.adapter.play();

        self.state.update(|s| {
            s.queue.clone_from(&tracks);
            s.current_index = start_index;
            s.current_track = tracks.get(start_index).cloned();
            s.position_ms = 0;
        });

        let pool = self.pool.clone();
        let ids: Vec<TrackId> = tracks.iter().map(|t| t.id.clone()).collect();
        self.persist("queue", async move { queue::replace_all(&pool, &ids).await });
    }

    /// Play `track` within the context of `tracks`
    ///
    /// Falls back to index 0 when the track is not in the list.
    pub fn play_from_list(&self, tracks: Vec<Track>, track: &Track) {
        let index = tracks
            .iter()
            .position(|t| t.id == track.id)
            .unwrap_or(0);
        self.play_tracks(tracks, index);
    }

    // === Queue mutation ===

    /// Append a track to the end of the queue
    pub fn add_to_queue(&self, track: Track) {
        if self.is_disposed() {
            return;
        }
        self.adapter.append_item(EngineItem::from(&track));

        let track_id = track.id.clone();
        self.state.update(|s| s.queue.push(track));

        let pool = self.pool.clone();
        self.persist("queue append", async move {
            queue::append(&pool, &track_id).await
        });
    }

    /// Insert a track immediately after the live current index
    ///
    /// Clamped to the queue bounds: inserting while the last track plays
    /// appends.
    pub fn add_to_queue_next(&self, track: Track) {
        if self.is_disposed() {
            return;
        }
        let current_index = self.state.snapshot().current_index;

        self.adapter
            .insert_item(current_index + 1, EngineItem::from(&track));

        let track_id = track.id.clone();
        self.state.update(|s| {
            let index = (current_index + 1).min(s.queue.len());
            s.queue.insert(index, track);
        });

        let pool = self.pool.clone();
        self.persist("queue insert", async move {
            queue::insert_after(&pool, &track_id, current_index as i64).await
        });
    }

    /// Remove the queue entry at `index`
    ///
    /// Out-of-range indices are silently ignored.
    pub fn remove_from_queue(&self, index: usize) {
        if self.is_disposed() {
            return;
        }
        if index >= self.state.snapshot().queue.len() {
            return;
        }

        self.adapter.remove_item(index);
        self.state.update(|s| {
            if index < s.queue.len() {
                s.queue.remove(index);
            }
        });

        let pool = self.pool.clone();
        self.persist("queue remove", async move {
            queue::remove_at(&pool, index as i64).await.map(|_| ())
        });
    }

    /// Clear the queue and unload the current track
    pub fn clear_queue(&self) {
        if self.is_disposed() {
            return;
        }
        self.adapter.clear_items();
        self.state.update(|s| {
            s.queue.clear();
            s.current_track = None;
            s.current_index = 0;
        });

        let pool = self.pool.clone();
        self.persist("queue clear", async move { queue::clear(&pool).await });
    }

    /// Move a queue entry from `from` to `to`
    ///
    /// Out-of-range indices leave queue and engine completely unchanged.
    pub fn move_queue_item(&self, from: usize, to: usize) {
        if self.is_disposed() {
            return;
        }
        let len = self.state.snapshot().queue.len();
        if from >= len || to >= len {
            return;
        }

        self.adapter.move_item(from, to);
        self.state.update(|s| {
            if from < s.queue.len() && to < s.queue.len() {
                let track = s.queue.remove(from);
                s.queue.insert(to, track);
            }
        });

        let pool = self.pool.clone();
        self.persist("queue move", async move {
            queue::move_item(&pool, from as i64, to as i64).await.map(|_| ())
        });
    }

    // === Transport ===

    /// Start or resume playback
    pub fn play(&self) {
        if self.is_disposed() {
            return;
        }
        self.adapter.play();
    }

    /// Pause playback
    pub fn pause(&self) {
        if self.is_disposed() {
            return;
        }
        self.adapter.pause();
    }

    /// Toggle play/pause based on the engine's live state
    pub fn toggle_play_pause(&self) {
        if self.is_disposed() {
            return;
        }
        self.adapter.toggle_play_pause();
    }

    /// Seek to an absolute position in the current track
    pub fn seek_to(&self, position_ms: u64) {
        if self.is_disposed() {
            return;
        }
        self.adapter.seek_to(position_ms);
        self.state.update(|s| s.position_ms = position_ms);
    }

    /// Advance to the next track
    pub fn seek_to_next(&self) {
        if self.is_disposed() {
            return;
        }
        self.adapter.seek_to_next();
    }

    /// Return to the previous track
    pub fn seek_to_previous(&self) {
        if self.is_disposed() {
            return;
        }
        self.adapter.seek_to_previous();
    }

    /// Jump to the queue entry at `index` with zero offset
    pub fn skip_to_queue_item(&self, index: usize) {
        if self.is_disposed() {
            return;
        }
        self.adapter.seek_to_item(index);
    }

    // === Seek/scrub protocol ===

    /// Begin a user scrub at `position_ms`
    pub fn on_seek_start(&self, position_ms: u64) {
        if self.is_disposed() {
            return;
        }
        self.state.update(|s| {
            s.is_seeking = true;
            s.seek_target_ms = position_ms;
        });
    }

    /// Update the scrub target while the drag continues
    ///
    /// The engine is untouched; only the display position moves.
    pub fn on_seek_change(&self, position_ms: u64) {
        if self.is_disposed() {
            return;
        }
        self.state.update(|s| s.seek_target_ms = position_ms);
    }

    /// Finish the scrub and issue the real seek
    pub fn on_seek_end(&self, position_ms: u64) {
        if self.is_disposed() {
            return;
        }
        self.state.update(|s| s.is_seeking = false);
        self.seek_to(position_ms);
    }

    // === Session settings ===

    /// Set the repeat mode and persist it
    pub fn set_repeat_mode(&self, mode: RepeatMode) {
        if self.is_disposed() {
            return;
        }
        self.adapter.set_repeat_mode(mode);
        self.state.update(|s| s.repeat_mode = mode);

        let pool = self.pool.clone();
        self.persist("repeat mode", async move {
            playback_state::update_repeat_mode(&pool, mode).await
        });
    }

    /// Cycle the repeat mode: Off -> All -> One -> Off
    pub fn toggle_repeat_mode(&self) {
        let mode = self.state.snapshot().repeat_mode.cycled();
        self.set_repeat_mode(mode);
    }

    /// Set the shuffle flag and persist it
    pub fn set_shuffle(&self, enabled: bool) {
        if self.is_disposed() {
            return;
        }
        self.adapter.set_shuffle(enabled);
        self.state.update(|s| s.shuffle_enabled = enabled);

        let pool = self.pool.clone();
        self.persist("shuffle", async move {
            playback_state::update_shuffle(&pool, enabled).await
        });
    }

    /// Flip the shuffle flag
    pub fn toggle_shuffle(&self) {
        let enabled = !self.state.snapshot().shuffle_enabled;
        self.set_shuffle(enabled);
    }

    /// Set the playback speed and persist it
    ///
    /// Non-positive speeds are ignored.
    pub fn set_speed(&self, speed: f32) {
        if self.is_disposed() || speed <= 0.0 {
            return;
        }
        self.adapter.set_speed(speed);
        self.state.update(|s| s.speed = speed);

        let pool = self.pool.clone();
        self.persist("speed", async move {
            playback_state::update_speed(&pool, speed).await
        });
    }

    // === Persistence lifecycle ===

    /// Persist the current track and position in the background
    pub fn save_playback_state(&self) {
        let snapshot = self.state.snapshot();
        let Some(track) = snapshot.current_track else {
            return;
        };

        let pool = self.pool.clone();
        self.persist("playback state", async move {
            playback_state::update_current_track(&pool, Some(&track.id)).await?;
            playback_state::update_position(&pool, snapshot.position_ms).await
        });
    }

    /// Await all mirror writes enqueued before this call
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        let marker: PersistJob = Box::pin(async move {
            let _ = done_tx.send(());
        });
        if self.persist_tx.send(marker).is_err() {
            return;
        }
        let _ = done_rx.await;
    }

    /// Tear down the session
    ///
    /// Cancels the ticker and event pump, releases the engine connection, and
    /// persists the current track and position (best-effort). This is the
    /// only path that persists position outside of explicit saves; position
    /// is deliberately not written per tick. Commands issued after dispose
    /// have no effect; repeated dispose is a no-op.
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.shutdown_tx.send_replace(true);
        self.adapter.release();

        // Drain earlier mirror writes first so the final snapshot wins
        self.flush().await;

        let snapshot = self.state.snapshot();
        if let Some(track) = snapshot.current_track {
            if let Err(e) =
                playback_state::update_current_track(&self.pool, Some(&track.id)).await
            {
                tracing::warn!("failed to persist current track on dispose: {e}");
            }
            if let Err(e) = playback_state::update_position(&self.pool, snapshot.position_ms).await
            {
                tracing::warn!("failed to persist position on dispose: {e}");
            }
        }
    }

    // === Internals ===

    fn persist<F>(&self, what: &'static str, fut: F)
    where
        F: Future<Output = Result<(), StorageError>> + Send + 'static,
    {
        if self.is_disposed() {
            return;
        }
        let job: PersistJob = Box::pin(async move {
            if let Err(e) = fut.await {
                tracing::warn!("failed to persist {what}: {e}");
            }
        });
        let _ = self.persist_tx.send(job);
    }

    async fn run_restore_watcher(
        self: Arc<Self>,
        mut initialized: watch::Receiver<bool>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            if *initialized.borrow_and_update() {
                self.restore_once().await;
            }
            tokio::select! {
                changed = initialized.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }

    async fn restore_once(&self) {
        // Guard against duplicate readiness signals: restore runs exactly once
        if self.restore_started.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.restore_session().await {
            tracing::warn!("failed to restore playback session: {e}");
        }
    }

    async fn restore_session(&self) -> Result<(), StorageError> {
        playback_state::ensure_exists(&self.pool).await?;

        let Some(record) = playback_state::get(&self.pool).await? else {
            return Ok(());
        };
        let tracks = queue::get_tracks(&self.pool).await?;

        let Some(track_id) = record.current_track_id.clone() else {
            return Ok(());
        };
        if tracks.is_empty() {
            return Ok(());
        }

        self.adapter.restore_state(
            Some(&track_id),
            record.position_ms,
            record.repeat_mode,
            record.shuffle_enabled,
            record.speed,
            &tracks,
        );

        let index = tracks.iter().position(|t| t.id == track_id).unwrap_or(0);
        self.state.update(|s| {
            s.current_index = index;
            s.current_track = tracks.get(index).cloned();
            s.queue = tracks;
            s.position_ms = record.position_ms;
            s.repeat_mode = record.repeat_mode;
            s.shuffle_enabled = record.shuffle_enabled;
            s.speed = record.speed;
        });

        Ok(())
    }
}

async fn run_persist_loop(mut jobs: mpsc::UnboundedReceiver<PersistJob>) {
    while let Some(job) = jobs.recv().await {
        job.await;
    }
}

async fn run_event_loop(
    state: Arc<SessionState>,
    mut events: mpsc::UnboundedReceiver<EngineEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            maybe_event = events.recv() => match maybe_event {
                Some(event) => apply_event(&state, event),
                None => break,
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

fn apply_event(state: &SessionState, event: EngineEvent) {
    match event {
        EngineEvent::IsPlayingChanged { is_playing } => {
            state.update(|s| s.is_playing = is_playing);
        }
        EngineEvent::ActiveItemChanged { index } => {
            state.update(|s| {
                s.current_index = index;
                s.current_track = s.queue.get(index).cloned();
            });
        }
        EngineEvent::TransportChanged { state: transport } => match transport {
            TransportState::Ready { duration_ms } => {
                state.update(|s| s.duration_ms = duration_ms);
            }
            TransportState::Ended => {
                state.update(|s| s.is_playing = false);
            }
        },
        EngineEvent::RepeatModeChanged { mode } => {
            state.update(|s| s.repeat_mode = mode);
        }
        EngineEvent::ShuffleChanged { enabled } => {
            state.update(|s| s.shuffle_enabled = enabled);
        }
        EngineEvent::SpeedChanged { speed } => {
            state.update(|s| s.speed = speed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::LiveState;

    #[test]
    fn active_item_event_resolves_track_from_queue() {
        let state = SessionState::new();
        let tracks: Vec<Track> = ["a", "b", "c"]
            .iter()
            .map(|id| Track::new(TrackId::new(*id), format!("Track {id}"), format!("uri:{id}")))
            .collect();
        state.update(|s| s.queue.clone_from(&tracks));

        apply_event(&state, EngineEvent::ActiveItemChanged { index: 2 });

        let snapshot = state.snapshot();
        assert_eq!(snapshot.current_index, 2);
        assert_eq!(snapshot.current_track.map(|t| t.id), Some(TrackId::new("c")));
    }

    #[test]
    fn active_item_event_with_stale_index_clears_track() {
        let state = SessionState::new();
        apply_event(&state, EngineEvent::ActiveItemChanged { index: 5 });

        let snapshot = state.snapshot();
        assert_eq!(snapshot.current_index, 5);
        assert!(snapshot.current_track.is_none());
    }

    #[test]
    fn ended_transport_forces_paused() {
        let state = SessionState::new();
        state.update(|s| s.is_playing = true);

        apply_event(
            &state,
            EngineEvent::TransportChanged {
                state: TransportState::Ended,
            },
        );

        assert!(!state.snapshot().is_playing);
    }

    #[test]
    fn ready_transport_captures_duration() {
        let state = SessionState::new();
        apply_event(
            &state,
            EngineEvent::TransportChanged {
                state: TransportState::Ready { duration_ms: 181_000 },
            },
        );

        assert_eq!(state.snapshot().duration_ms, 181_000);
    }

    // LiveState is re-exported for observers that want the whole aggregate
    #[test]
    fn default_live_state_is_idle() {
        let state = LiveState::default();
        assert!(state.current_track.is_none());
        assert!(!state.is_playing);
        assert!(state.queue.is_empty());
    }
}
