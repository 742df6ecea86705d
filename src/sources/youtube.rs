use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::common::errors::SourceError;
use crate::queue::SourceKind;
use crate::sources::{AudioSource, SearchResult};
use crate::transport::StreamLocation;

const SEARCH_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/search";

/// Identifier prefixes that mark synthetic catalog entries. They resolve to
/// a placeholder stream instead of a real source.
const MOCK_PREFIXES: [&str; 2] = ["mock_", "rec_"];

#[derive(Debug, Deserialize)]
struct ApiSearchResponse {
    #[serde(default)]
    items: Vec<ApiItem>,
}

#[derive(Debug, Deserialize)]
struct ApiItem {
    id: ApiId,
    snippet: ApiSnippet,
}

#[derive(Debug, Deserialize)]
struct ApiId {
    #[serde(rename = "videoId", default)]
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct ApiSnippet {
    title: String,
    #[serde(rename = "channelTitle")]
    channel_title: String,
}

pub struct YouTubeSource {
    api_key: Option<String>,
    http: reqwest::Client,
    placeholder: Duration,
}

impl YouTubeSource {
    pub fn new(api_key: Option<String>, placeholder_ms: u64) -> Self {
        Self {
            api_key,
            http: reqwest::Client::new(),
            placeholder: Duration::from_millis(placeholder_ms),
        }
    }

    async fn api_search(&self, query: &str, key: &str) -> Result<Vec<SearchResult>, SourceError> {
        let response = self
            .http
            .get(SEARCH_ENDPOINT)
            .query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("maxResults", "5"),
                ("q", query),
                ("key", key),
            ])
            .send()
            .await?
            .error_for_status()
            .map_err(SourceError::from)?;

        let body: ApiSearchResponse = response.json().await?;
        Ok(body
            .items
            .into_iter()
            .filter(|item| !item.id.video_id.is_empty())
            .map(|item| SearchResult {
                id: item.id.video_id,
                title: item.snippet.title,
                artist: item.snippet.channel_title,
                duration_secs: None,
                genre: "unknown".to_string(),
            })
            .collect())
    }

    /// Deterministic stand-in results for keyless or offline operation.
    fn mock_results(query: &str) -> Vec<SearchResult> {
        let escaped = urlencoding::encode(query).into_owned();
        (1..=2)
            .map(|n| SearchResult {
                id: format!("mock_{escaped}_{n}"),
                title: format!("{query} - Song {n}"),
                artist: format!("Mock Artist {n}"),
                duration_secs: Some(180 + 60 * n),
                genre: "unknown".to_string(),
            })
            .collect()
    }

    fn mock_recommendations(genre: &str) -> Vec<SearchResult> {
        let genre = match genre {
            "pop" | "rock" => genre,
            _ => "unknown",
        };
        (1..=2)
            .map(|n| SearchResult {
                id: format!("rec_{genre}_{n}"),
                title: format!("Recommended {genre} {n}"),
                artist: format!("{genre} artist {n}"),
                duration_secs: Some(200),
                genre: genre.to_string(),
            })
            .collect()
    }
}

#[async_trait]
impl AudioSource for YouTubeSource {
    fn name(&self) -> &'static str {
        "YouTube"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::YouTube
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SourceError> {
        let Some(key) = self.api_key.as_deref() else {
            debug!("youtube: no API key configured, serving mock results");
            return Ok(Self::mock_results(query));
        };

        match self.api_search(query, key).await {
            Ok(results) if !results.is_empty() => Ok(results),
            Ok(_) => Ok(Self::mock_results(query)),
            Err(e) => {
                // Degrade to mock data rather than failing the command.
                warn!("youtube: search failed ({}), serving mock results", e);
                Ok(Self::mock_results(query))
            }
        }
    }

    async fn resolve(&self, identifier: &str) -> Result<StreamLocation, SourceError> {
        if identifier.is_empty() {
            return Err(SourceError::Unresolvable(identifier.to_string()));
        }
        if MOCK_PREFIXES.iter().any(|p| identifier.starts_with(p)) {
            return Ok(StreamLocation::Placeholder {
                duration: self.placeholder,
            });
        }
        Ok(StreamLocation::Remote(format!(
            "https://www.youtube.com/watch?v={identifier}"
        )))
    }

    async fn recommend(&self, genre: &str) -> Result<Vec<SearchResult>, SourceError> {
        Ok(Self::mock_recommendations(genre))
    }
}
