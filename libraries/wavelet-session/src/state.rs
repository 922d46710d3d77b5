//! Live session state
//!
//! The in-memory, observable aggregate owned by the session controller. All
//! mutation funnels through [`SessionState::update`], which holds a single
//! lock while applying the change and republishing, so concurrent producers
//! (engine event pump, position ticker, UI commands) can never produce torn
//! reads of the aggregate.
//!
//! Each field is published over its own `watch` channel; subscribers see
//! every change in update order and only when the value actually changed.

use std::sync::Mutex;
use tokio::sync::watch;
use wavelet_core::types::{RepeatMode, Track};

/// The live session aggregate
#[derive(Debug, Clone, PartialEq)]
pub struct LiveState {
    /// Currently loaded track, if any
    pub current_track: Option<Track>,

    /// Whether the engine is playing
    pub is_playing: bool,

    /// Engine-reported position in milliseconds
    pub position_ms: u64,

    /// Duration of the current track in milliseconds
    pub duration_ms: u64,

    /// Repeat mode
    pub repeat_mode: RepeatMode,

    /// Whether shuffle is enabled
    pub shuffle_enabled: bool,

    /// Playback speed multiplier
    pub speed: f32,

    /// Snapshot of the play queue
    pub queue: Vec<Track>,

    /// Index of the current track within the queue
    pub current_index: usize,

    /// Whether a user scrub is in progress
    pub is_seeking: bool,

    /// Scrub target while a seek is in progress
    pub seek_target_ms: u64,
}

impl Default for LiveState {
    fn default() -> Self {
        Self {
            current_track: None,
            is_playing: false,
            position_ms: 0,
            duration_ms: 0,
            repeat_mode: RepeatMode::Off,
            shuffle_enabled: false,
            speed: 1.0,
            queue: Vec::new(),
            current_index: 0,
            is_seeking: false,
            seek_target_ms: 0,
        }
    }
}

impl LiveState {
    /// The position to display: the scrub target while seeking, otherwise the
    /// engine-reported position
    pub fn display_position_ms(&self) -> u64 {
        if self.is_seeking {
            self.seek_target_ms
        } else {
            self.position_ms
        }
    }
}

/// Observable session state
///
/// Owned by the session controller; observers hold `watch` receivers.
pub struct SessionState {
    inner: Mutex<LiveState>,
    current_track: watch::Sender<Option<Track>>,
    is_playing: watch::Sender<bool>,
    position: watch::Sender<u64>,
    display_position: watch::Sender<u64>,
    duration: watch::Sender<u64>,
    repeat_mode: watch::Sender<RepeatMode>,
    shuffle_enabled: watch::Sender<bool>,
    speed: watch::Sender<f32>,
    queue: watch::Sender<Vec<Track>>,
    current_index: watch::Sender<usize>,
    is_seeking: watch::Sender<bool>,
}

impl SessionState {
    /// Create session state with default values
    pub fn new() -> Self {
        let defaults = LiveState::default();
        Self {
            current_track: watch::channel(defaults.current_track.clone()).0,
            is_playing: watch::channel(defaults.is_playing).0,
            position: watch::channel(defaults.position_ms).0,
            display_position: watch::channel(defaults.display_position_ms()).0,
            duration: watch::channel(defaults.duration_ms).0,
            repeat_mode: watch::channel(defaults.repeat_mode).0,
            shuffle_enabled: watch::channel(defaults.shuffle_enabled).0,
            speed: watch::channel(defaults.speed).0,
            queue: watch::channel(defaults.queue.clone()).0,
            current_index: watch::channel(defaults.current_index).0,
            is_seeking: watch::channel(defaults.is_seeking).0,
            inner: Mutex::new(defaults),
        }
    }

    /// Apply a mutation to the aggregate and republish changed fields
    ///
    /// The lock is held across both steps; every producer goes through here.
    pub fn update(&self, f: impl FnOnce(&mut LiveState)) {
        let Ok(mut state) = self.inner.lock() else {
            return;
        };
        f(&mut state);
        self.publish(&state);
    }

    /// A consistent copy of the whole aggregate
    pub fn snapshot(&self) -> LiveState {
        self.inner
            .lock()
            .map(|state| state.clone())
            .unwrap_or_default()
    }

    /// Current display position (scrub target while seeking)
    pub fn display_position_ms(&self) -> u64 {
        *self.display_position.borrow()
    }

    fn publish(&self, state: &LiveState) {
        send_if_changed(&self.current_track, &state.current_track);
        send_if_changed(&self.is_playing, &state.is_playing);
        send_if_changed(&self.position, &state.position_ms);
        send_if_changed(&self.display_position, &state.display_position_ms());
        send_if_changed(&self.duration, &state.duration_ms);
        send_if_changed(&self.repeat_mode, &state.repeat_mode);
        send_if_changed(&self.shuffle_enabled, &state.shuffle_enabled);
        send_if_changed(&self.speed, &state.speed);
        send_if_changed(&self.queue, &state.queue);
        send_if_changed(&self.current_index, &state.current_index);
        send_if_changed(&self.is_seeking, &state.is_seeking);
    }

    // === Subscriptions ===

    /// Observe the current track
    pub fn watch_current_track(&self) -> watch::Receiver<Option<Track>> {
        self.current_track.subscribe()
    }

    /// Observe the playing flag
    pub fn watch_is_playing(&self) -> watch::Receiver<bool> {
        self.is_playing.subscribe()
    }

    /// Observe the raw engine-reported position
    pub fn watch_position(&self) -> watch::Receiver<u64> {
        self.position.subscribe()
    }

    /// Observe the display position (scrub-aware)
    pub fn watch_display_position(&self) -> watch::Receiver<u64> {
        self.display_position.subscribe()
    }

    /// Observe the current track duration
    pub fn watch_duration(&self) -> watch::Receiver<u64> {
        self.duration.subscribe()
    }

    /// Observe the repeat mode
    pub fn watch_repeat_mode(&self) -> watch::Receiver<RepeatMode> {
        self.repeat_mode.subscribe()
    }

    /// Observe the shuffle flag
    pub fn watch_shuffle_enabled(&self) -> watch::Receiver<bool> {
        self.shuffle_enabled.subscribe()
    }

    /// Observe the playback speed
    pub fn watch_speed(&self) -> watch::Receiver<f32> {
        self.speed.subscribe()
    }

    /// Observe the queue snapshot
    pub fn watch_queue(&self) -> watch::Receiver<Vec<Track>> {
        self.queue.subscribe()
    }

    /// Observe the current queue index
    pub fn watch_current_index(&self) -> watch::Receiver<usize> {
        self.current_index.subscribe()
    }

    /// Observe the seeking flag
    pub fn watch_is_seeking(&self) -> watch::Receiver<bool> {
        self.is_seeking.subscribe()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

fn send_if_changed<T: Clone + PartialEq>(sender: &watch::Sender<T>, value: &T) {
    sender.send_if_modified(|current| {
        if current == value {
            false
        } else {
            *current = value.clone();
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use wavelet_core::types::TrackId;

    fn track(id: &str) -> Track {
        Track::new(TrackId::new(id), format!("Track {id}"), format!("uri:{id}"))
    }

    #[test]
    fn update_publishes_changed_fields() {
        let state = SessionState::new();
        let mut is_playing = state.watch_is_playing();
        assert!(!*is_playing.borrow_and_update());

        state.update(|s| s.is_playing = true);
        assert!(is_playing.has_changed().unwrap());
        assert!(*is_playing.borrow_and_update());
    }

    #[test]
    fn unchanged_fields_do_not_wake_subscribers() {
        let state = SessionState::new();
        let mut duration = state.watch_duration();
        duration.borrow_and_update();

        state.update(|s| s.is_playing = true);
        assert!(!duration.has_changed().unwrap());
    }

    #[test]
    fn display_position_follows_seek_target_while_seeking() {
        let state = SessionState::new();
        state.update(|s| s.position_ms = 100);
        assert_eq!(state.display_position_ms(), 100);

        state.update(|s| {
            s.is_seeking = true;
            s.seek_target_ms = 800;
        });
        assert_eq!(state.display_position_ms(), 800);

        // Engine position changes are masked during the scrub
        state.update(|s| s.position_ms = 150);
        assert_eq!(state.display_position_ms(), 800);

        state.update(|s| s.is_seeking = false);
        assert_eq!(state.display_position_ms(), 150);
    }

    #[test]
    fn snapshot_is_consistent_with_updates() {
        let state = SessionState::new();
        state.update(|s| {
            s.queue = vec![track("1"), track("2")];
            s.current_index = 1;
            s.current_track = s.queue.get(1).cloned();
        });

        let snapshot = state.snapshot();
        assert_eq!(snapshot.queue.len(), 2);
        assert_eq!(snapshot.current_index, 1);
        assert_eq!(
            snapshot.current_track.map(|t| t.id),
            Some(TrackId::new("2"))
        );
    }
}
