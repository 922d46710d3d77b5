//! Session controller integration tests
//!
//! Drives a real controller against an in-memory database and a fake engine
//! that records every command and feeds events back through the adapter.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use wavelet_core::types::{RepeatMode, Track, TrackId};
use wavelet_engine::{
    EngineAdapter, EngineConnection, EngineConnector, EngineError, EngineEvent, EngineItem,
    MediaEngine,
};
use wavelet_session::SessionController;
use wavelet_storage::{create_pool, playback_state, queue, tracks};

#[derive(Debug, Default)]
struct FakeEngineState {
    items: Vec<EngineItem>,
    current_index: usize,
    playing: bool,
    position_ms: u64,
    repeat_mode: RepeatMode,
    shuffle_enabled: bool,
    speed: f32,
    seeks: Vec<u64>,
    play_calls: usize,
    set_items_calls: usize,
}

struct FakeEngine {
    state: Arc<Mutex<FakeEngineState>>,
    events: mpsc::UnboundedSender<EngineEvent>,
}

impl FakeEngine {
    fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }
}

impl MediaEngine for FakeEngine {
    fn set_items(&mut self, items: Vec<EngineItem>, start_index: usize, start_ms: u64) {
        let mut state = self.state.lock().unwrap();
        state.items = items;
        state.current_index = start_index;
        state.position_ms = start_ms;
        state.set_items_calls += 1;
    }

    fn play(&mut self) {
        {
            let mut state = self.state.lock().unwrap();
            state.playing = true;
            state.play_calls += 1;
        }
        self.emit(EngineEvent::IsPlayingChanged { is_playing: true });
    }

    fn pause(&mut self) {
        self.state.lock().unwrap().playing = false;
        self.emit(EngineEvent::IsPlayingChanged { is_playing: false });
    }

    fn is_playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }

    fn seek_to(&mut self, position_ms: u64) {
        let mut state = self.state.lock().unwrap();
        state.position_ms = position_ms;
        state.seeks.push(position_ms);
    }

    fn seek_to_next(&mut self) {
        let mut state = self.state.lock().unwrap();
        if state.current_index + 1 < state.items.len() {
            state.current_index += 1;
        }
    }

    fn seek_to_previous(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.current_index = state.current_index.saturating_sub(1);
    }

    fn seek_to_item(&mut self, index: usize) {
        let mut state = self.state.lock().unwrap();
        state.current_index = index;
        state.position_ms = 0;
    }

    fn append_item(&mut self, item: EngineItem) {
        self.state.lock().unwrap().items.push(item);
    }

    fn insert_item(&mut self, index: usize, item: EngineItem) {
        self.state.lock().unwrap().items.insert(index, item);
    }

    fn remove_item(&mut self, index: usize) {
        self.state.lock().unwrap().items.remove(index);
    }

    fn move_item(&mut self, from: usize, to: usize) {
        let mut state = self.state.lock().unwrap();
        let item = state.items.remove(from);
        state.items.insert(to, item);
    }

    fn clear_items(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.items.clear();
        state.current_index = 0;
    }

    fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.state.lock().unwrap().repeat_mode = mode;
    }

    fn set_shuffle(&mut self, enabled: bool) {
        self.state.lock().unwrap().shuffle_enabled = enabled;
    }

    fn set_speed(&mut self, speed: f32) {
        self.state.lock().unwrap().speed = speed;
    }

    fn position_ms(&self) -> u64 {
        self.state.lock().unwrap().position_ms
    }

    fn current_index(&self) -> usize {
        self.state.lock().unwrap().current_index
    }

    fn item_count(&self) -> usize {
        self.state.lock().unwrap().items.len()
    }
}

struct FakeConnector {
    state: Arc<Mutex<FakeEngineState>>,
    attempts: Arc<AtomicUsize>,
    events_slot: Arc<Mutex<Option<mpsc::UnboundedSender<EngineEvent>>>>,
    fail: bool,
}

#[async_trait]
impl EngineConnector for FakeConnector {
    async fn connect(&self) -> Result<EngineConnection, EngineError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(EngineError::ConnectionFailed("no media session".into()));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        *self.events_slot.lock().unwrap() = Some(tx.clone());
        Ok(EngineConnection {
            engine: Box::new(FakeEngine {
                state: Arc::clone(&self.state),
                events: tx,
            }),
            events: rx,
        })
    }
}

struct Harness {
    pool: sqlx::SqlitePool,
    engine_state: Arc<Mutex<FakeEngineState>>,
    attempts: Arc<AtomicUsize>,
    events_slot: Arc<Mutex<Option<mpsc::UnboundedSender<EngineEvent>>>>,
    adapter: EngineAdapter,
}

impl Harness {
    async fn new(fail: bool) -> Self {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        wavelet_storage::run_migrations(&pool).await.unwrap();

        let engine_state = Arc::new(Mutex::new(FakeEngineState {
            speed: 1.0,
            ..Default::default()
        }));
        let attempts = Arc::new(AtomicUsize::new(0));
        let events_slot = Arc::new(Mutex::new(None));
        let adapter = EngineAdapter::new(Arc::new(FakeConnector {
            state: Arc::clone(&engine_state),
            attempts: Arc::clone(&attempts),
            events_slot: Arc::clone(&events_slot),
            fail,
        }));

        Self {
            pool,
            engine_state,
            attempts,
            events_slot,
            adapter,
        }
    }

    fn engine(&self) -> MutexGuard<'_, FakeEngineState> {
        self.engine_state.lock().unwrap()
    }

    /// Emit an event exactly as the engine would
    fn emit(&self, event: EngineEvent) {
        let slot = self.events_slot.lock().unwrap();
        let tx = slot.as_ref().expect("engine not connected");
        tx.send(event).unwrap();
    }

    async fn seed_library(&self, ids: &[&str]) -> Vec<Track> {
        let seeded: Vec<Track> = ids.iter().map(|id| test_track(id)).collect();
        tracks::replace_all(&self.pool, &seeded).await.unwrap();
        seeded
    }
}

fn test_track(id: &str) -> Track {
    let mut track = Track::new(
        TrackId::new(id),
        format!("Track {id}"),
        format!("content://media/{id}"),
    );
    track.artist = "Test Artist".to_string();
    track.album = "Test Album".to_string();
    track.duration_ms = 180_000;
    track.file_path = PathBuf::from(format!("/music/{id}.mp3"));
    track
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

async fn wait_for_record(pool: &sqlx::SqlitePool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while playback_state::get(pool).await.unwrap().is_none() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("playback record never created");
}

#[tokio::test]
async fn restore_round_trip() {
    let harness = Harness::new(false).await;
    let seeded = harness.seed_library(&["a", "b", "c"]).await;
    let ids: Vec<TrackId> = seeded.iter().map(|t| t.id.clone()).collect();
    queue::replace_all(&harness.pool, &ids).await.unwrap();

    playback_state::ensure_exists(&harness.pool).await.unwrap();
    playback_state::update_current_track(&harness.pool, Some(&ids[1]))
        .await
        .unwrap();
    playback_state::update_position(&harness.pool, 15_000).await.unwrap();
    playback_state::update_repeat_mode(&harness.pool, RepeatMode::All)
        .await
        .unwrap();
    playback_state::update_shuffle(&harness.pool, true).await.unwrap();
    playback_state::update_speed(&harness.pool, 1.5).await.unwrap();

    let controller = SessionController::spawn(harness.adapter.clone(), harness.pool.clone());
    let state = controller.state();
    wait_until(|| state.snapshot().current_track.is_some()).await;

    let snapshot = state.snapshot();
    assert_eq!(snapshot.current_index, 1);
    assert_eq!(snapshot.current_track.unwrap().id, ids[1]);
    assert_eq!(snapshot.queue.len(), 3);
    assert_eq!(snapshot.position_ms, 15_000);
    assert_eq!(snapshot.repeat_mode, RepeatMode::All);
    assert!(snapshot.shuffle_enabled);
    assert_eq!(snapshot.speed, 1.5);

    // The engine was prepared at the recorded spot but left paused
    let engine = harness.engine();
    assert_eq!(engine.current_index, 1);
    assert_eq!(engine.position_ms, 15_000);
    assert_eq!(engine.repeat_mode, RepeatMode::All);
    assert!(engine.shuffle_enabled);
    assert_eq!(engine.speed, 1.5);
    assert!(!engine.playing);
    assert_eq!(engine.play_calls, 0);
}

#[tokio::test]
async fn restore_leaves_idle_state_without_current_track() {
    let harness = Harness::new(false).await;
    let seeded = harness.seed_library(&["a", "b"]).await;
    let ids: Vec<TrackId> = seeded.iter().map(|t| t.id.clone()).collect();
    queue::replace_all(&harness.pool, &ids).await.unwrap();
    // Record exists but records no current track

    let controller = SessionController::spawn(harness.adapter.clone(), harness.pool.clone());
    wait_for_record(&harness.pool).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let snapshot = controller.state().snapshot();
    assert!(snapshot.current_track.is_none());
    assert!(snapshot.queue.is_empty());
    assert_eq!(harness.engine().set_items_calls, 0);
}

#[tokio::test]
async fn restore_leaves_idle_state_with_empty_queue() {
    let harness = Harness::new(false).await;
    let seeded = harness.seed_library(&["a"]).await;

    playback_state::ensure_exists(&harness.pool).await.unwrap();
    playback_state::update_current_track(&harness.pool, Some(&seeded[0].id))
        .await
        .unwrap();

    let controller = SessionController::spawn(harness.adapter.clone(), harness.pool.clone());
    wait_until(|| controller.is_initialized()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let snapshot = controller.state().snapshot();
    assert!(snapshot.current_track.is_none());
    assert!(snapshot.queue.is_empty());
    assert_eq!(harness.engine().set_items_calls, 0);
}

#[tokio::test]
async fn scrub_masks_ticker_and_issues_single_seek() {
    let harness = Harness::new(false).await;
    let controller = SessionController::spawn(harness.adapter.clone(), harness.pool.clone());
    wait_until(|| controller.is_initialized()).await;

    controller.play();
    let state = controller.state();
    wait_until(|| state.snapshot().is_playing).await;

    controller.on_seek_start(500);
    controller.on_seek_change(800);
    assert_eq!(controller.display_position_ms(), 800);

    // The engine keeps advancing while the drag is held; the ticker samples
    // it but must not overwrite the scrub target
    harness.engine().position_ms = 123_456;
    tokio::time::sleep(Duration::from_millis(450)).await;
    assert_eq!(controller.display_position_ms(), 800);
    assert!(harness.engine().seeks.is_empty());

    controller.on_seek_end(800);
    assert_eq!(harness.engine().seeks, vec![800]);
    assert_eq!(controller.display_position_ms(), 800);

    // Display tracks the engine again after the scrub
    harness.engine().position_ms = 90_000;
    wait_until(|| controller.display_position_ms() == 90_000).await;
}

#[tokio::test]
async fn repeat_toggle_cycle_persists() {
    let harness = Harness::new(false).await;
    let controller = SessionController::spawn(harness.adapter.clone(), harness.pool.clone());
    wait_for_record(&harness.pool).await;

    let state = controller.state();
    assert_eq!(state.snapshot().repeat_mode, RepeatMode::Off);

    let expected = [
        RepeatMode::All,
        RepeatMode::One,
        RepeatMode::Off,
        RepeatMode::All,
    ];
    for want in expected {
        controller.toggle_repeat_mode();
        assert_eq!(state.snapshot().repeat_mode, want);
    }

    controller.flush().await;
    let record = playback_state::get(&harness.pool).await.unwrap().unwrap();
    assert_eq!(record.repeat_mode, RepeatMode::All);
    assert_eq!(harness.engine().repeat_mode, RepeatMode::All);
}

#[tokio::test]
async fn shuffle_and_speed_toggles_persist() {
    let harness = Harness::new(false).await;
    let controller = SessionController::spawn(harness.adapter.clone(), harness.pool.clone());
    wait_for_record(&harness.pool).await;

    controller.toggle_shuffle();
    controller.set_speed(2.0);
    controller.set_speed(-1.0); // ignored

    let snapshot = controller.state().snapshot();
    assert!(snapshot.shuffle_enabled);
    assert_eq!(snapshot.speed, 2.0);

    controller.flush().await;
    let record = playback_state::get(&harness.pool).await.unwrap().unwrap();
    assert!(record.shuffle_enabled);
    assert_eq!(record.speed, 2.0);
}

#[tokio::test]
async fn add_to_queue_next_inserts_after_live_index() {
    let harness = Harness::new(false).await;
    let seeded = harness.seed_library(&["a", "b", "c", "x"]).await;
    let controller = SessionController::spawn(harness.adapter.clone(), harness.pool.clone());
    wait_until(|| controller.is_initialized()).await;

    controller.play_tracks(seeded[..3].to_vec(), 1);
    controller.add_to_queue_next(seeded[3].clone());

    let live_ids: Vec<String> = controller
        .state()
        .snapshot()
        .queue
        .iter()
        .map(|t| t.id.as_str().to_string())
        .collect();
    assert_eq!(live_ids, ["a", "b", "x", "c"]);

    let engine_ids: Vec<String> = harness
        .engine()
        .items
        .iter()
        .map(|i| i.id.as_str().to_string())
        .collect();
    assert_eq!(engine_ids, ["a", "b", "x", "c"]);

    controller.flush().await;
    let entries = queue::get_entries(&harness.pool).await.unwrap();
    let stored: Vec<(String, i64)> = entries
        .iter()
        .map(|e| (e.track_id.as_str().to_string(), e.position))
        .collect();
    assert_eq!(
        stored,
        [
            ("a".to_string(), 0),
            ("b".to_string(), 1),
            ("x".to_string(), 2),
            ("c".to_string(), 3)
        ]
    );
}

#[tokio::test]
async fn add_to_queue_next_at_tail_appends() {
    let harness = Harness::new(false).await;
    let seeded = harness.seed_library(&["a", "b", "x"]).await;
    let controller = SessionController::spawn(harness.adapter.clone(), harness.pool.clone());
    wait_until(|| controller.is_initialized()).await;

    controller.play_tracks(seeded[..2].to_vec(), 1);
    controller.add_to_queue_next(seeded[2].clone());

    let live_ids: Vec<String> = controller
        .state()
        .snapshot()
        .queue
        .iter()
        .map(|t| t.id.as_str().to_string())
        .collect();
    assert_eq!(live_ids, ["a", "b", "x"]);
}

#[tokio::test]
async fn queue_bounds_are_safe() {
    let harness = Harness::new(false).await;
    let seeded = harness.seed_library(&["a", "b", "c"]).await;
    let controller = SessionController::spawn(harness.adapter.clone(), harness.pool.clone());
    wait_until(|| controller.is_initialized()).await;

    controller.play_tracks(seeded.clone(), 0);
    controller.flush().await;

    controller.move_queue_item(99, 0);
    controller.move_queue_item(0, 99);
    controller.remove_from_queue(99);
    controller.flush().await;

    let snapshot = controller.state().snapshot();
    assert_eq!(snapshot.queue.len(), 3);
    assert_eq!(snapshot.queue[0].id.as_str(), "a");
    assert_eq!(harness.engine().items.len(), 3);

    let entries = queue::get_entries(&harness.pool).await.unwrap();
    let positions: Vec<i64> = entries.iter().map(|e| e.position).collect();
    assert_eq!(positions, [0, 1, 2]);
}

#[tokio::test]
async fn remove_and_move_update_all_three_mirrors() {
    let harness = Harness::new(false).await;
    let seeded = harness.seed_library(&["a", "b", "c"]).await;
    let controller = SessionController::spawn(harness.adapter.clone(), harness.pool.clone());
    wait_until(|| controller.is_initialized()).await;

    controller.play_tracks(seeded, 0);
    controller.move_queue_item(0, 2);
    controller.remove_from_queue(0);
    controller.flush().await;

    let live_ids: Vec<String> = controller
        .state()
        .snapshot()
        .queue
        .iter()
        .map(|t| t.id.as_str().to_string())
        .collect();
    assert_eq!(live_ids, ["c", "a"]);

    let engine_ids: Vec<String> = harness
        .engine()
        .items
        .iter()
        .map(|i| i.id.as_str().to_string())
        .collect();
    assert_eq!(engine_ids, ["c", "a"]);

    let entries = queue::get_entries(&harness.pool).await.unwrap();
    let stored: Vec<(String, i64)> = entries
        .iter()
        .map(|e| (e.track_id.as_str().to_string(), e.position))
        .collect();
    assert_eq!(stored, [("c".to_string(), 0), ("a".to_string(), 1)]);
}

#[tokio::test]
async fn double_initialize_runs_restore_once() {
    let harness = Harness::new(false).await;
    let seeded = harness.seed_library(&["a", "b"]).await;
    let ids: Vec<TrackId> = seeded.iter().map(|t| t.id.clone()).collect();
    queue::replace_all(&harness.pool, &ids).await.unwrap();
    playback_state::ensure_exists(&harness.pool).await.unwrap();
    playback_state::update_current_track(&harness.pool, Some(&ids[0]))
        .await
        .unwrap();

    let controller = SessionController::spawn(harness.adapter.clone(), harness.pool.clone());
    harness.adapter.initialize();
    harness.adapter.initialize();

    wait_until(|| controller.state().snapshot().current_track.is_some()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(harness.attempts.load(Ordering::SeqCst), 1);
    assert_eq!(harness.engine().set_items_calls, 1);
}

#[tokio::test]
async fn failed_engine_leaves_usable_controller() {
    let harness = Harness::new(true).await;
    harness.seed_library(&["a"]).await;
    let controller = SessionController::spawn(harness.adapter.clone(), harness.pool.clone());
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(!controller.is_initialized());

    // Commands still return and update optimistic state; nothing panics
    controller.play_track(test_track("a"));
    controller.toggle_play_pause();
    controller.on_seek_start(100);
    controller.on_seek_end(100);

    let snapshot = controller.state().snapshot();
    assert_eq!(snapshot.queue.len(), 1);
    assert_eq!(
        snapshot.current_track.map(|t| t.id),
        Some(TrackId::new("a"))
    );

    // The durable mirror still tracks the optimistic queue
    controller.flush().await;
    assert_eq!(queue::len(&harness.pool).await.unwrap(), 1);
}

#[tokio::test]
async fn dispose_saves_track_and_position_then_goes_inert() {
    let harness = Harness::new(false).await;
    let seeded = harness.seed_library(&["a", "b"]).await;
    let controller = SessionController::spawn(harness.adapter.clone(), harness.pool.clone());
    wait_for_record(&harness.pool).await;

    controller.play_tracks(seeded, 0);
    controller.seek_to(42_000);
    controller.dispose().await;

    let record = playback_state::get(&harness.pool).await.unwrap().unwrap();
    assert_eq!(record.current_track_id, Some(TrackId::new("a")));
    assert_eq!(record.position_ms, 42_000);
    assert!(!controller.is_initialized());

    // Disposed controllers ignore every command
    controller.toggle_repeat_mode();
    controller.add_to_queue(test_track("b"));
    let snapshot = controller.state().snapshot();
    assert_eq!(snapshot.repeat_mode, RepeatMode::Off);
    assert_eq!(snapshot.queue.len(), 2);

    // The ticker is cancelled: engine movement no longer reaches live state
    harness.engine().position_ms = 99_000;
    tokio::time::sleep(Duration::from_millis(450)).await;
    assert_eq!(controller.state().snapshot().position_ms, 42_000);

    // Second dispose is a no-op
    controller.dispose().await;
}

#[tokio::test]
async fn engine_events_drive_live_state_in_order() {
    let harness = Harness::new(false).await;
    let seeded = harness.seed_library(&["a", "b", "c"]).await;
    let controller = SessionController::spawn(harness.adapter.clone(), harness.pool.clone());
    wait_until(|| controller.is_initialized()).await;

    controller.play_tracks(seeded, 0);
    let state = controller.state();
    wait_until(|| state.snapshot().is_playing).await;

    // Engine auto-advance: the controller reconciles the resulting events
    harness.emit(EngineEvent::ActiveItemChanged { index: 1 });
    harness.emit(EngineEvent::TransportChanged {
        state: wavelet_engine::TransportState::Ready {
            duration_ms: 200_000,
        },
    });
    wait_until(|| state.snapshot().duration_ms == 200_000).await;

    let snapshot = state.snapshot();
    assert_eq!(snapshot.current_index, 1);
    assert_eq!(
        snapshot.current_track.map(|t| t.id),
        Some(TrackId::new("b"))
    );

    // Queue exhausted: ended transport forces paused
    harness.emit(EngineEvent::TransportChanged {
        state: wavelet_engine::TransportState::Ended,
    });
    wait_until(|| !state.snapshot().is_playing).await;

    // Engine-originated setting changes flow back too
    harness.emit(EngineEvent::RepeatModeChanged {
        mode: RepeatMode::One,
    });
    harness.emit(EngineEvent::SpeedChanged { speed: 0.5 });
    wait_until(|| state.snapshot().speed == 0.5).await;
    assert_eq!(state.snapshot().repeat_mode, RepeatMode::One);
}
