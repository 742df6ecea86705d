use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::common::errors::EngineError;

/// The fixed set of media providers a track can come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    #[default]
    #[serde(rename = "yt")]
    YouTube,
    #[serde(rename = "sp")]
    Spotify,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::YouTube => "yt",
            Self::Spotify => "sp",
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yt" => Ok(Self::YouTube),
            "sp" => Ok(Self::Spotify),
            other => Err(EngineError::UnknownSource(other.to_string())),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A playable media reference. Immutable once enqueued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    pub artist: String,
    /// Provider-specific identifier or URL.
    pub identifier: String,
    pub source: SourceKind,
    pub genre: String,
    pub duration_secs: Option<u64>,
}

struct QueueState {
    tracks: Vec<Track>,
    /// Index of the current track, -1 when the queue is empty.
    cursor: isize,
}

/// Ordered track list with a movable cursor.
///
/// Shared between the command path (producer) and the playback loop
/// (consumer); every operation runs inside one short lock-held critical
/// section and performs no I/O.
pub struct PlaybackQueue {
    state: Mutex<QueueState>,
}

impl Default for PlaybackQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                tracks: Vec::new(),
                cursor: -1,
            }),
        }
    }

    /// Append a track. The first track added becomes the current one.
    pub fn add(&self, track: Track) {
        let mut state = self.state.lock();
        state.tracks.push(track);
        if state.cursor == -1 {
            state.cursor = 0;
        }
    }

    /// Remove the track at `index`, keeping the cursor on the same logical
    /// track where possible. Removing the current track makes its successor
    /// current; removing the current last track wraps the cursor to 0.
    pub fn remove(&self, index: usize) -> Result<Track, EngineError> {
        let mut state = self.state.lock();
        if index >= state.tracks.len() {
            return Err(EngineError::InvalidIndex(index));
        }

        let removed = state.tracks.remove(index);
        let len = state.tracks.len() as isize;
        if len == 0 {
            state.cursor = -1;
        } else if (index as isize) < state.cursor {
            state.cursor -= 1;
        } else if state.cursor >= len {
            state.cursor = 0;
        }
        Ok(removed)
    }

    pub fn current(&self) -> Result<Track, EngineError> {
        let state = self.state.lock();
        if state.cursor < 0 {
            return Err(EngineError::QueueEmpty);
        }
        Ok(state.tracks[state.cursor as usize].clone())
    }

    /// Move the cursor forward, wrapping past the last track. Combined with
    /// recommendation refill this allows indefinite looped playback.
    pub fn advance(&self) -> Result<Track, EngineError> {
        let mut state = self.state.lock();
        let len = state.tracks.len() as isize;
        if len == 0 {
            return Err(EngineError::QueueEmpty);
        }
        state.cursor = (state.cursor + 1) % len;
        Ok(state.tracks[state.cursor as usize].clone())
    }

    /// Defensive copy of the queue contents, for display.
    pub fn snapshot(&self) -> Vec<Track> {
        self.state.lock().tracks.clone()
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.tracks.clear();
        state.cursor = -1;
    }

    pub fn len(&self) -> usize {
        self.state.lock().tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().tracks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(title: &str) -> Track {
        Track {
            title: title.to_string(),
            artist: "Test Artist".to_string(),
            identifier: format!("id_{title}"),
            source: SourceKind::YouTube,
            genre: "rock".to_string(),
            duration_secs: Some(180),
        }
    }

    #[test]
    fn new_queue_is_empty() {
        let queue = PlaybackQueue::new();
        assert!(queue.is_empty());
        assert!(matches!(queue.current(), Err(EngineError::QueueEmpty)));
        assert!(matches!(queue.advance(), Err(EngineError::QueueEmpty)));
    }

    #[test]
    fn first_add_sets_cursor() {
        let queue = PlaybackQueue::new();
        queue.add(track("a"));
        assert_eq!(queue.current().unwrap().title, "a");
        queue.add(track("b"));
        // Cursor stays on the first track.
        assert_eq!(queue.current().unwrap().title, "a");
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn remove_before_cursor_shifts_it() {
        let queue = PlaybackQueue::new();
        queue.add(track("a"));
        queue.add(track("b"));
        queue.add(track("c"));
        queue.advance().unwrap(); // current = b

        queue.remove(0).unwrap();
        assert_eq!(queue.current().unwrap().title, "b");
    }

    #[test]
    fn remove_current_promotes_successor() {
        let queue = PlaybackQueue::new();
        queue.add(track("a"));
        queue.add(track("b"));

        let removed = queue.remove(0).unwrap();
        assert_eq!(removed.title, "a");
        assert_eq!(queue.snapshot().len(), 1);
        assert_eq!(queue.current().unwrap().title, "b");
    }

    #[test]
    fn remove_current_last_wraps_to_front() {
        let queue = PlaybackQueue::new();
        queue.add(track("a"));
        queue.add(track("b"));
        queue.advance().unwrap(); // current = b

        queue.remove(1).unwrap();
        assert_eq!(queue.current().unwrap().title, "a");
    }

    #[test]
    fn remove_last_track_empties_queue() {
        let queue = PlaybackQueue::new();
        queue.add(track("a"));
        queue.remove(0).unwrap();
        assert!(queue.is_empty());
        assert!(matches!(queue.current(), Err(EngineError::QueueEmpty)));
    }

    #[test]
    fn remove_out_of_range_is_rejected() {
        let queue = PlaybackQueue::new();
        queue.add(track("a"));
        assert!(matches!(
            queue.remove(5),
            Err(EngineError::InvalidIndex(5))
        ));
    }

    #[test]
    fn advance_wraps_circularly() {
        let queue = PlaybackQueue::new();
        queue.add(track("a"));
        queue.add(track("b"));

        assert_eq!(queue.advance().unwrap().title, "b");
        assert_eq!(queue.advance().unwrap().title, "a");
        assert_eq!(queue.advance().unwrap().title, "b");
    }

    #[test]
    fn single_element_advance_repeats() {
        let queue = PlaybackQueue::new();
        queue.add(track("only"));
        for _ in 0..3 {
            assert_eq!(queue.advance().unwrap().title, "only");
        }
    }

    #[test]
    fn clear_resets_cursor() {
        let queue = PlaybackQueue::new();
        queue.add(track("a"));
        queue.add(track("b"));
        queue.clear();
        assert!(queue.is_empty());
        assert!(matches!(queue.current(), Err(EngineError::QueueEmpty)));
        // Queue is usable again afterwards.
        queue.add(track("c"));
        assert_eq!(queue.current().unwrap().title, "c");
    }

    #[test]
    fn snapshot_is_a_copy() {
        let queue = PlaybackQueue::new();
        queue.add(track("a"));
        let mut snap = queue.snapshot();
        snap.clear();
        assert_eq!(queue.len(), 1);
    }
}
