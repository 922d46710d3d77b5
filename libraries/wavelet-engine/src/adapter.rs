//! Engine adapter
//!
//! Wraps the asynchronous, fallible engine construction behind a two-state
//! capability: uninitialized (queries return defaults, commands are silent
//! no-ops) or ready-with-handle. Readiness is exposed as an observable
//! boolean rather than requiring callers to block.

use crate::engine::{EngineConnection, EngineConnector, EngineItem, MediaEngine};
use crate::events::EngineEvent;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use wavelet_core::types::{RepeatMode, Track, TrackId};

/// Adapter over the opaque playback engine
///
/// Cheap to clone; clones share the same connection and handle.
#[derive(Clone)]
pub struct EngineAdapter {
    shared: Arc<Shared>,
}

struct Shared {
    connector: Arc<dyn EngineConnector>,
    engine: Mutex<Option<Box<dyn MediaEngine>>>,
    connect_task: Mutex<Option<JoinHandle<()>>>,
    // Set by release(); a connect completing afterwards must not capture
    released: AtomicBool,
    initialized_tx: watch::Sender<bool>,
    events_tx: mpsc::UnboundedSender<EngineEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<EngineEvent>>>,
}

impl EngineAdapter {
    /// Create an adapter around the given connector
    ///
    /// No connection is attempted until [`initialize`](Self::initialize).
    pub fn new(connector: Arc<dyn EngineConnector>) -> Self {
        let (initialized_tx, _) = watch::channel(false);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            shared: Arc::new(Shared {
                connector,
                engine: Mutex::new(None),
                connect_task: Mutex::new(None),
                released: AtomicBool::new(false),
                initialized_tx,
                events_tx,
                events_rx: Mutex::new(Some(events_rx)),
            }),
        }
    }

    /// Begin connecting to the engine
    ///
    /// Idempotent: calling while a connection is pending or complete is a
    /// no-op. Never blocks; a failed connection leaves the adapter usable in
    /// query-returns-defaults mode.
    pub fn initialize(&self) {
        let Ok(mut task_slot) = self.shared.connect_task.lock() else {
            return;
        };
        if task_slot.is_some() {
            return;
        }
        if let Ok(engine) = self.shared.engine.lock() {
            if engine.is_some() {
                return;
            }
        }

        self.shared.released.store(false, Ordering::SeqCst);
        let shared = Arc::clone(&self.shared);
        *task_slot = Some(tokio::spawn(async move {
            Shared::connect_and_pump(shared).await;
        }));
    }

    /// Cancel any pending connection and detach the engine handle
    ///
    /// Safe to call multiple times and before initialization ever completed.
    pub fn release(&self) {
        self.shared.released.store(true, Ordering::SeqCst);

        if let Ok(mut task_slot) = self.shared.connect_task.lock() {
            if let Some(task) = task_slot.take() {
                task.abort();
            }
        }
        if let Ok(mut engine) = self.shared.engine.lock() {
            *engine = None;
        }
        // send_replace: the flag must flip even with no subscribers around
        self.shared.initialized_tx.send_replace(false);
    }

    /// Whether the engine handle has been captured
    pub fn is_initialized(&self) -> bool {
        *self.shared.initialized_tx.borrow()
    }

    /// Observe the initialized flag
    pub fn watch_initialized(&self) -> watch::Receiver<bool> {
        self.shared.initialized_tx.subscribe()
    }

    /// Take the engine event stream
    ///
    /// Single-consumer: the first caller gets the receiver, later calls get
    /// `None`. Events arrive in the order the engine produced them.
    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<EngineEvent>> {
        self.shared.events_rx.lock().ok().and_then(|mut rx| rx.take())
    }

    fn with_engine<R>(&self, default: R, f: impl FnOnce(&mut dyn MediaEngine) -> R) -> R {
        match self.shared.engine.lock() {
            Ok(mut guard) => match guard.as_deref_mut() {
                Some(engine) => f(engine),
                None => default,
            },
            Err(_) => default,
        }
    }

    // === Commands (silent no-ops while uninitialized) ===

    /// Replace the engine queue with a single item and prepare it
    pub fn set_item(&self, item: EngineItem) {
        self.set_items(vec![item], 0, 0);
    }

    /// Replace the engine queue, preparing `start_index` at `start_ms`
    pub fn set_items(&self, items: Vec<EngineItem>, start_index: usize, start_ms: u64) {
        self.with_engine((), |engine| engine.set_items(items, start_index, start_ms));
    }

    /// Start or resume playback
    pub fn play(&self) {
        self.with_engine((), |engine| engine.play());
    }

    /// Pause playback
    pub fn pause(&self) {
        self.with_engine((), |engine| engine.pause());
    }

    /// Toggle play/pause based on the engine's live state
    ///
    /// Reads `is_playing` from the engine rather than a locally cached guess,
    /// so hardware media-key input cannot make the two diverge.
    pub fn toggle_play_pause(&self) {
        self.with_engine((), |engine| {
            if engine.is_playing() {
                engine.pause();
            } else {
                engine.play();
            }
        });
    }

    /// Seek to an absolute position in the current item
    pub fn seek_to(&self, position_ms: u64) {
        self.with_engine((), |engine| engine.seek_to(position_ms));
    }

    /// Advance to the next item
    pub fn seek_to_next(&self) {
        self.with_engine((), |engine| engine.seek_to_next());
    }

    /// Return to the previous item
    pub fn seek_to_previous(&self) {
        self.with_engine((), |engine| engine.seek_to_previous());
    }

    /// Jump to the item at `index` with zero offset
    pub fn seek_to_item(&self, index: usize) {
        self.with_engine((), |engine| {
            if index < engine.item_count() {
                engine.seek_to_item(index);
            }
        });
    }

    /// Append an item to the end of the engine queue
    pub fn append_item(&self, item: EngineItem) {
        self.with_engine((), |engine| engine.append_item(item));
    }

    /// Insert an item at `index`, clamped to the engine queue bounds
    pub fn insert_item(&self, index: usize, item: EngineItem) {
        self.with_engine((), |engine| {
            let index = index.min(engine.item_count());
            engine.insert_item(index, item);
        });
    }

    /// Insert an item immediately after the currently playing index
    pub fn insert_item_next(&self, item: EngineItem) {
        self.with_engine((), |engine| {
            let index = (engine.current_index() + 1).min(engine.item_count());
            engine.insert_item(index, item);
        });
    }

    /// Remove the item at `index` (bounds-checked)
    pub fn remove_item(&self, index: usize) {
        self.with_engine((), |engine| {
            if index < engine.item_count() {
                engine.remove_item(index);
            }
        });
    }

    /// Move an item between indices (bounds-checked)
    pub fn move_item(&self, from: usize, to: usize) {
        self.with_engine((), |engine| {
            let count = engine.item_count();
            if from < count && to < count {
                engine.move_item(from, to);
            }
        });
    }

    /// Clear the engine queue
    pub fn clear_items(&self) {
        self.with_engine((), |engine| engine.clear_items());
    }

    /// Set the repeat mode
    pub fn set_repeat_mode(&self, mode: RepeatMode) {
        self.with_engine((), |engine| engine.set_repeat_mode(mode));
    }

    /// Enable or disable shuffle
    pub fn set_shuffle(&self, enabled: bool) {
        self.with_engine((), |engine| engine.set_shuffle(enabled));
    }

    /// Set the playback speed multiplier
    ///
    /// Non-positive speeds are rejected at this edge.
    pub fn set_speed(&self, speed: f32) {
        if speed <= 0.0 {
            return;
        }
        self.with_engine((), |engine| engine.set_speed(speed));
    }

    // === Queries (defaults while uninitialized) ===

    /// The engine's live playing state
    pub fn is_playing(&self) -> bool {
        self.with_engine(false, |engine| engine.is_playing())
    }

    /// The engine's reported position in milliseconds
    pub fn position_ms(&self) -> u64 {
        self.with_engine(0, |engine| engine.position_ms())
    }

    /// The engine's current item index
    pub fn current_index(&self) -> usize {
        self.with_engine(0, |engine| engine.current_index())
    }

    /// Number of items in the engine queue
    pub fn item_count(&self) -> usize {
        self.with_engine(0, |engine| engine.item_count())
    }

    // === Restore ===

    /// Restore a previously persisted session into the engine
    ///
    /// Sets the full queue, resolves the start index as the position of
    /// `track_id` in the list (index 0 if absent or `None`), seeks to
    /// `position_ms`, and applies repeat/shuffle/speed. The engine is left
    /// prepared but paused: restoring must never itself start audible
    /// playback.
    pub fn restore_state(
        &self,
        track_id: Option<&TrackId>,
        position_ms: u64,
        repeat_mode: RepeatMode,
        shuffle_enabled: bool,
        speed: f32,
        tracks: &[Track],
    ) {
        if tracks.is_empty() {
            return;
        }

        self.with_engine((), |engine| {
            let start_index = track_id
                .and_then(|id| tracks.iter().position(|t| &t.id == id))
                .unwrap_or(0);
            let items: Vec<EngineItem> = tracks.iter().map(EngineItem::from).collect();

            engine.set_items(items, start_index, position_ms);
            engine.set_repeat_mode(repeat_mode);
            engine.set_shuffle(shuffle_enabled);
            if speed > 0.0 {
                engine.set_speed(speed);
            }
        });
    }
}

impl Shared {
    async fn connect_and_pump(shared: Arc<Self>) {
        match shared.connector.connect().await {
            Ok(EngineConnection { engine, mut events }) => {
                // Capture only if the connection finished without being
                // cancelled by release(); checked under the engine lock so a
                // concurrent release cannot leave a stale handle behind.
                {
                    let Ok(mut slot) = shared.engine.lock() else {
                        return;
                    };
                    if shared.released.load(Ordering::SeqCst) {
                        return;
                    }
                    *slot = Some(engine);
                }
                shared.initialized_tx.send_replace(true);
                tracing::debug!("playback engine connected");

                while let Some(event) = events.recv().await {
                    if shared.events_tx.send(event).is_err() {
                        break;
                    }
                }
            }
            Err(e) => {
                tracing::warn!("playback engine connection failed: {e}");
            }
        }
    }
}
