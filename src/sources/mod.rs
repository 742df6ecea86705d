pub mod spotify;
pub mod youtube;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::common::errors::SourceError;
use crate::config::Config;
use crate::queue::{SourceKind, Track};
use crate::transport::StreamLocation;

/// One catalog entry returned by a provider search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub duration_secs: Option<u64>,
    pub genre: String,
}

impl SearchResult {
    /// Turn this result into a queueable track for the given provider.
    pub fn into_track(self, kind: SourceKind) -> Track {
        Track {
            title: self.title,
            artist: self.artist,
            identifier: self.id,
            source: kind,
            genre: self.genre,
            duration_secs: self.duration_secs,
        }
    }
}

/// A media-catalog/source-resolution provider for one platform.
#[async_trait]
pub trait AudioSource: Send + Sync {
    /// Human-readable source name (e.g. "YouTube").
    fn name(&self) -> &'static str;

    /// The provider tag tracks from this source carry.
    fn kind(&self) -> SourceKind;

    /// Search the catalog for candidate tracks, best match first.
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SourceError>;

    /// Resolve a track identifier into a streamable location.
    async fn resolve(&self, identifier: &str) -> Result<StreamLocation, SourceError>;

    /// Genre-based recommendations, used by the smart-play refill.
    async fn recommend(&self, genre: &str) -> Result<Vec<SearchResult>, SourceError>;
}

pub type BoxedSource = Box<dyn AudioSource>;

/// Registry of enabled sources, keyed by provider tag.
pub struct SourceManager {
    sources: Vec<BoxedSource>,
}

impl SourceManager {
    pub fn new(config: &Config) -> Self {
        let mut sources: Vec<BoxedSource> = Vec::new();
        let placeholder_ms = config.player.placeholder_ms;

        if config.sources.youtube {
            info!("Loaded source: YouTube");
            sources.push(Box::new(youtube::YouTubeSource::new(
                config.sources.youtube_api_key.clone(),
                placeholder_ms,
            )));
        }
        if config.sources.spotify {
            info!("Loaded source: Spotify");
            sources.push(Box::new(spotify::SpotifySource::new(placeholder_ms)));
        }

        Self { sources }
    }

    #[cfg(test)]
    pub(crate) fn with_sources(sources: Vec<BoxedSource>) -> Self {
        Self { sources }
    }

    /// Find the source registered for a provider tag.
    pub fn by_kind(&self, kind: SourceKind) -> Option<&dyn AudioSource> {
        self.sources
            .iter()
            .find(|s| s.kind() == kind)
            .map(|s| s.as_ref())
    }

    /// Names of all registered sources.
    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manager_registers_enabled_sources() {
        let manager = SourceManager::new(&Config::default());
        assert_eq!(manager.source_names(), vec!["YouTube", "Spotify"]);
        assert!(manager.by_kind(SourceKind::YouTube).is_some());
        assert!(manager.by_kind(SourceKind::Spotify).is_some());
    }

    #[test]
    fn disabled_source_is_not_registered() {
        let mut config = Config::default();
        config.sources.spotify = false;
        let manager = SourceManager::new(&config);
        assert!(manager.by_kind(SourceKind::Spotify).is_none());
    }
}
