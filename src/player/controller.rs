use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::common::errors::EngineError;
use crate::common::types::{ChannelId, RoomId};
use crate::config::{PlayerConfig, PlayerSettings};
use crate::gateway::Gateway;
use crate::player::session::PlaybackSession;
use crate::queue::{PlaybackQueue, Track};
use crate::sources::SourceManager;
use crate::transport::{AudioStreamer, StreamLocation};

/// How one streaming attempt sequence for a track ended.
enum StreamOutcome {
    Completed,
    /// A skip arrived mid-stream; the cursor has already moved.
    Skipped,
    Failed,
}

/// Owns the per-room voice sessions and the single playback loop.
///
/// Commands mutate shared state (queue, flags, skip signal); the loop
/// observes that state at attempt boundaries. All I/O (voice joins, encoder
/// work) happens outside the session-registry and player-flag locks.
pub struct PlaybackController {
    queue: Arc<PlaybackQueue>,
    sources: Arc<SourceManager>,
    gateway: Arc<dyn Gateway>,
    streamer: Arc<dyn AudioStreamer>,
    settings: Arc<PlayerSettings>,
    sessions: DashMap<RoomId, PlaybackSession>,
    /// At most one playback loop per process. Racing starts collapse to one.
    playing: Mutex<bool>,
    stopped: AtomicBool,
    paused: AtomicBool,
    skip_signal: Notify,
    /// Bumped on every skip. Attempt boundaries compare against the value
    /// captured when the loop read the current track, so a skip that fires
    /// outside a `select!` window is still observed.
    skip_epoch: AtomicU64,
    resume_signal: Notify,
    retry_limit: u32,
    backoff_base: Duration,
}

impl PlaybackController {
    pub fn new(
        queue: Arc<PlaybackQueue>,
        sources: Arc<SourceManager>,
        gateway: Arc<dyn Gateway>,
        streamer: Arc<dyn AudioStreamer>,
        settings: Arc<PlayerSettings>,
        config: &PlayerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            queue,
            sources,
            gateway,
            streamer,
            settings,
            sessions: DashMap::new(),
            playing: Mutex::new(false),
            stopped: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            skip_signal: Notify::new(),
            skip_epoch: AtomicU64::new(0),
            resume_signal: Notify::new(),
            retry_limit: config.retry_limit.max(1),
            backoff_base: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    /// Join `channel` in `room` (or reuse the existing session), append the
    /// track and make sure the playback loop is running.
    pub async fn enqueue_and_ensure_running(
        self: &Arc<Self>,
        room: &RoomId,
        channel: &ChannelId,
        track: Track,
    ) -> Result<(), EngineError> {
        self.ensure_joined(room, channel).await?;
        self.queue.add(track);
        self.start_loop_if_idle();
        Ok(())
    }

    /// Establish (or reuse) the voice session for a room.
    ///
    /// The registry lock only installs and removes handles; the join/leave
    /// round trips run outside it. A concurrent join for the same room is
    /// resolved by tearing down the superseded connection.
    pub async fn ensure_joined(
        &self,
        room: &RoomId,
        channel: &ChannelId,
    ) -> Result<PlaybackSession, EngineError> {
        if let Some(existing) = self.sessions.get(room).map(|s| s.clone()) {
            if existing.channel == *channel {
                return Ok(existing);
            }
            // Channel switch: disconnect the old session first.
            self.sessions.remove(room);
            self.gateway.leave_voice(&existing.handle).await;
        }

        let handle = self.gateway.join_voice(room, channel).await?;
        debug!("joined voice channel {} in {}", channel, room);
        let session = PlaybackSession {
            handle,
            channel: channel.clone(),
        };

        if let Some(prev) = self.sessions.insert(room.clone(), session.clone()) {
            if prev.handle != session.handle {
                self.gateway.leave_voice(&prev.handle).await;
            }
        }
        Ok(session)
    }

    /// Spawn the playback loop unless one is already active. Returns whether
    /// a new loop was started.
    pub fn start_loop_if_idle(self: &Arc<Self>) -> bool {
        {
            let mut playing = self.playing.lock();
            // Clearing the stop flag under the lock lets a start request
            // revive a loop that is still winding down from a stop.
            self.stopped.store(false, Ordering::SeqCst);
            if *playing {
                return false;
            }
            *playing = true;
        }

        let controller = Arc::clone(self);
        tokio::spawn(async move {
            controller.run_loop().await;
        });
        true
    }

    pub fn is_playing(&self) -> bool {
        *self.playing.lock()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Pause the in-flight streams. Returns false when nothing is active.
    pub fn pause(&self) -> bool {
        if !self.is_playing() || self.sessions.is_empty() {
            return false;
        }
        self.paused.store(true, Ordering::SeqCst);
        for entry in self.sessions.iter() {
            self.streamer.set_paused(&entry.value().handle, true);
        }
        true
    }

    /// Resume paused streams. Returns false when nothing was paused.
    pub fn resume(&self) -> bool {
        if !self.paused.swap(false, Ordering::SeqCst) {
            return false;
        }
        for entry in self.sessions.iter() {
            self.streamer.set_paused(&entry.value().handle, false);
        }
        self.resume_signal.notify_one();
        true
    }

    /// Clear the queue, release every encoder and halt the loop.
    ///
    /// The in-flight frame write is not killed: releasing the encoder makes
    /// the current stream finish on its own, and the loop observes the
    /// stopped flag at the next attempt boundary.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        // Wake a loop parked on the pause gate so it observes the stop.
        self.resume_signal.notify_one();
        self.queue.clear();
        for entry in self.sessions.iter() {
            self.streamer.cleanup(&entry.value().handle);
        }
        info!("playback stopped, queue cleared");
    }

    /// Advance to the next track and tell the loop to abandon the current
    /// streaming attempt.
    pub fn skip(&self) -> Result<Track, EngineError> {
        let next = self.queue.advance()?;
        self.skip_epoch.fetch_add(1, Ordering::SeqCst);
        self.skip_signal.notify_waiters();
        Ok(next)
    }

    /// Disconnect every voice session. Used on shutdown.
    pub async fn leave_all(&self) {
        let rooms: Vec<RoomId> = self.sessions.iter().map(|e| e.key().clone()).collect();
        for room in rooms {
            if let Some((_, session)) = self.sessions.remove(&room) {
                self.streamer.cleanup(&session.handle);
                self.gateway.leave_voice(&session.handle).await;
            }
        }
    }

    async fn run_loop(self: Arc<Self>) {
        info!("playback loop started");
        loop {
            let epoch = self.skip_epoch.load(Ordering::SeqCst);
            if self.stopped.load(Ordering::SeqCst) {
                if self.finish_if_idle() {
                    break;
                }
                continue;
            }
            let track = match self.queue.current() {
                Ok(track) => track,
                Err(_) => {
                    // Queue drained, back to idle.
                    if self.finish_if_idle() {
                        break;
                    }
                    continue;
                }
            };

            let outcome = self.play_track(&track, epoch).await;

            if self.stopped.load(Ordering::SeqCst) {
                continue;
            }
            if self.skip_epoch.load(Ordering::SeqCst) != epoch {
                // A skip landed while this track was in flight; the cursor
                // already points at the right track.
                continue;
            }
            match outcome {
                StreamOutcome::Skipped => continue,
                StreamOutcome::Completed | StreamOutcome::Failed => {
                    if self.settings.smart_play() {
                        self.refill_recommendations(&track).await;
                    }
                    let _ = self.queue.advance();
                }
            }
        }
        info!("playback loop stopped");
    }

    /// Wind-down check under the playing lock. A start request that raced
    /// the shutdown (stop, then enqueue before the loop exited) clears the
    /// stop flag while the flag lock is held, so either this check sees the
    /// new work and keeps the loop alive, or the starter sees the loop gone
    /// and spawns a fresh one.
    fn finish_if_idle(&self) -> bool {
        let mut playing = self.playing.lock();
        if !self.stopped.load(Ordering::SeqCst) && !self.queue.is_empty() {
            return false;
        }
        *playing = false;
        true
    }

    /// Block until the controller is unpaused. Resume and stop both wake
    /// the gate.
    async fn wait_while_paused(&self) {
        while self.paused.load(Ordering::SeqCst) {
            self.resume_signal.notified().await;
        }
    }

    /// Resolve and stream one track into every joined room. Never escalates
    /// a failure beyond this track.
    async fn play_track(&self, track: &Track, epoch: u64) -> StreamOutcome {
        let Some(source) = self.sources.by_kind(track.source) else {
            warn!(
                "{}",
                EngineError::UnknownSource(track.source.to_string())
            );
            return StreamOutcome::Failed;
        };

        let location = match source.resolve(&track.identifier).await {
            Ok(location) => location,
            Err(e) => {
                warn!(
                    "{} ({}), skipping '{}'",
                    EngineError::SourceUnresolvable(track.identifier.clone()),
                    e,
                    track.title
                );
                return StreamOutcome::Failed;
            }
        };

        let sessions: Vec<PlaybackSession> =
            self.sessions.iter().map(|e| e.value().clone()).collect();
        if sessions.is_empty() {
            debug!("no voice sessions joined, nothing to stream into");
            return StreamOutcome::Failed;
        }

        info!(
            "streaming '{}' by {} [{}]",
            track.title, track.artist, track.source
        );
        for session in sessions {
            match self.stream_with_retry(&session, &location, track, epoch).await {
                StreamOutcome::Completed => {}
                StreamOutcome::Skipped => return StreamOutcome::Skipped,
                StreamOutcome::Failed => return StreamOutcome::Failed,
            }
        }
        StreamOutcome::Completed
    }

    /// Stream a source into one session, retrying transient failures.
    ///
    /// Real sources get `retry_limit` attempts with linearly growing backoff
    /// (1x, 2x, ... the base unit). A placeholder source is attempted exactly
    /// once: a failure there is a configuration or test artifact, not a
    /// transient fault.
    async fn stream_with_retry(
        &self,
        session: &PlaybackSession,
        location: &StreamLocation,
        track: &Track,
        epoch: u64,
    ) -> StreamOutcome {
        let attempts = if location.is_placeholder() {
            1
        } else {
            self.retry_limit
        };

        for attempt in 1..=attempts {
            self.wait_while_paused().await;
            if self.stopped.load(Ordering::SeqCst) {
                return StreamOutcome::Failed;
            }
            // A skip that fired before this attempt registered a waiter
            // (during resolution, or between tracks) shows up here.
            if self.skip_epoch.load(Ordering::SeqCst) != epoch {
                debug!("skip requested, abandoning '{}'", track.title);
                self.streamer.cleanup(&session.handle);
                return StreamOutcome::Skipped;
            }
            tokio::select! {
                _ = self.skip_signal.notified() => {
                    debug!("skip requested, abandoning '{}'", track.title);
                    self.streamer.cleanup(&session.handle);
                    return StreamOutcome::Skipped;
                }
                result = self.streamer.stream_into(&session.handle, location) => match result {
                    Ok(()) => return StreamOutcome::Completed,
                    Err(e) => {
                        warn!(
                            "stream attempt {}/{} for '{}' in {} failed: {}",
                            attempt, attempts, track.title, session.handle.room, e
                        );
                        if attempt < attempts {
                            let backoff = self.backoff_base * attempt;
                            tokio::select! {
                                _ = self.skip_signal.notified() => {
                                    debug!("skip requested during backoff of '{}'", track.title);
                                    return StreamOutcome::Skipped;
                                }
                                _ = tokio::time::sleep(backoff) => {}
                            }
                        }
                    }
                }
            }
        }

        warn!(
            "{}",
            EngineError::StreamingFailed {
                attempts,
                cause: format!("giving up on '{}'", track.title),
            }
        );
        StreamOutcome::Failed
    }

    /// Smart-play refill: append genre recommendations so the queue can
    /// keep feeding the loop indefinitely.
    async fn refill_recommendations(&self, track: &Track) {
        let Some(source) = self.sources.by_kind(track.source) else {
            return;
        };
        match source.recommend(&track.genre).await {
            Ok(results) => {
                let count = results.len();
                for result in results {
                    self.queue.add(result.into_track(track.source));
                }
                debug!(
                    "smart play: appended {} recommendations for genre '{}'",
                    count, track.genre
                );
            }
            Err(e) => warn!("smart play: recommendation fetch failed: {}", e),
        }
    }
}
