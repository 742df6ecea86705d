use std::sync::Arc;

use tracing::info;

use crate::common::errors::EngineError;
use crate::common::types::{RoomId, UserId};
use crate::config::{Config, PlayerSettings};
use crate::gateway::{Gateway, PresenceEvent};
use crate::player::PlaybackController;
use crate::presence::{PresenceResolver, PresenceStore};
use crate::queue::{PlaybackQueue, SourceKind, Track};
use crate::sources::{SearchResult, SourceManager};
use crate::transport::AudioStreamer;

/// Typed outcome of a command. Rendering to chat text is the embedder's job.
#[derive(Debug)]
pub enum Reply {
    Enqueued(Track),
    Paused,
    Resumed,
    NothingPlaying,
    NotPaused,
    Stopped,
    Skipped(Track),
    Removed(Track),
    Queue(Vec<Track>),
    SearchResults(Vec<SearchResult>),
    DefaultSource(SourceKind),
    SmartPlay(bool),
}

/// The engine facade the command layer talks to.
///
/// Owns the presence cache, the queue and the playback controller, and
/// wires them to the external gateway, provider and transport collaborators.
/// Construct once per process.
pub struct Engine {
    store: Arc<PresenceStore>,
    resolver: PresenceResolver,
    controller: Arc<PlaybackController>,
    sources: Arc<SourceManager>,
    settings: Arc<PlayerSettings>,
    queue: Arc<PlaybackQueue>,
}

impl Engine {
    pub fn new(
        config: &Config,
        gateway: Arc<dyn Gateway>,
        streamer: Arc<dyn AudioStreamer>,
    ) -> Self {
        let store = Arc::new(PresenceStore::new());
        let resolver = PresenceResolver::new(store.clone(), gateway.clone(), &config.presence);
        let queue = Arc::new(PlaybackQueue::new());
        let sources = Arc::new(SourceManager::new(config));
        let settings = Arc::new(PlayerSettings::new(&config.player));
        let controller = PlaybackController::new(
            queue.clone(),
            sources.clone(),
            gateway,
            streamer,
            settings.clone(),
            &config.player,
        );

        Self {
            store,
            resolver,
            controller,
            sources,
            settings,
            queue,
        }
    }

    /// The presence cache, for wiring into the gateway's event stream.
    pub fn presence(&self) -> Arc<PresenceStore> {
        self.store.clone()
    }

    /// Feed one gateway voice-state event into the presence cache.
    pub fn handle_presence_event(&self, event: &PresenceEvent) {
        self.store.apply(event);
    }

    /// Resolve the caller's voice channel, search the provider and enqueue
    /// the best match. Starts playback if the loop is idle.
    pub async fn play(
        &self,
        room: &RoomId,
        user: &UserId,
        query: &str,
        source: Option<SourceKind>,
    ) -> Result<Reply, EngineError> {
        let channel = self.resolver.resolve(room, user).await?;
        let kind = source.unwrap_or_else(|| self.settings.default_source());
        let provider = self
            .sources
            .by_kind(kind)
            .ok_or_else(|| EngineError::UnknownSource(kind.to_string()))?;

        let results = provider.search(query).await?;
        let first = results.into_iter().next().ok_or(EngineError::NoResults)?;
        let track = first.into_track(kind);

        info!(
            "enqueueing '{}' by {} for {} in {}",
            track.title, track.artist, user, room
        );
        self.controller
            .enqueue_and_ensure_running(room, &channel, track.clone())
            .await?;
        Ok(Reply::Enqueued(track))
    }

    /// Search without touching the queue.
    pub async fn search(
        &self,
        query: &str,
        source: Option<SourceKind>,
    ) -> Result<Reply, EngineError> {
        let kind = source.unwrap_or_else(|| self.settings.default_source());
        let provider = self
            .sources
            .by_kind(kind)
            .ok_or_else(|| EngineError::UnknownSource(kind.to_string()))?;

        let results = provider.search(query).await?;
        if results.is_empty() {
            return Err(EngineError::NoResults);
        }
        Ok(Reply::SearchResults(results))
    }

    pub fn pause(&self) -> Reply {
        if self.controller.pause() {
            Reply::Paused
        } else {
            Reply::NothingPlaying
        }
    }

    pub fn resume(&self) -> Reply {
        if self.controller.resume() {
            Reply::Resumed
        } else {
            Reply::NotPaused
        }
    }

    pub fn stop(&self) -> Reply {
        self.controller.stop();
        Reply::Stopped
    }

    pub fn skip(&self) -> Result<Reply, EngineError> {
        let next = self.controller.skip()?;
        Ok(Reply::Skipped(next))
    }

    pub fn list_queue(&self) -> Reply {
        Reply::Queue(self.queue.snapshot())
    }

    pub fn remove_at(&self, index: usize) -> Result<Reply, EngineError> {
        let removed = self.queue.remove(index)?;
        Ok(Reply::Removed(removed))
    }

    pub fn set_default_source(&self, kind: SourceKind) -> Reply {
        self.settings.set_default_source(kind);
        Reply::DefaultSource(kind)
    }

    pub fn set_smart_play(&self, enabled: bool) -> Reply {
        self.settings.set_smart_play(enabled);
        Reply::SmartPlay(enabled)
    }

    /// Tear down all voice sessions. Call on process shutdown.
    pub async fn shutdown(&self) {
        self.controller.stop();
        self.controller.leave_all().await;
    }
}
