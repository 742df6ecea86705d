use thiserror::Error;

/// Errors surfaced to the command layer.
///
/// The variants fall into four classes with different handling policies:
/// caller errors are returned verbatim and never retried, resource errors
/// prevent the loop from starting but never break it, transient source
/// errors are retried with bounded backoff before the track is skipped,
/// and permanent source errors skip the track immediately.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("you must be in a voice channel to use this command")]
    NotInVoice,

    #[error("queue is empty")]
    QueueEmpty,

    #[error("invalid track index: {0}")]
    InvalidIndex(usize),

    #[error("no results found for query")]
    NoResults,

    #[error("no source registered for '{0}'")]
    UnknownSource(String),

    #[error("failed to join voice channel: {0}")]
    JoinFailed(#[from] GatewayError),

    #[error("could not resolve a playable source for '{0}'")]
    SourceUnresolvable(String),

    #[error("provider request failed: {0}")]
    Provider(#[from] SourceError),

    #[error("streaming failed after {attempts} attempt(s): {cause}")]
    StreamingFailed { attempts: u32, cause: String },
}

impl EngineError {
    /// True for errors caused by the caller's request rather than the
    /// engine or its collaborators.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::NotInVoice
                | Self::QueueEmpty
                | Self::InvalidIndex(_)
                | Self::NoResults
                | Self::UnknownSource(_)
        )
    }
}

/// Errors from the chat-platform gateway collaborator.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("voice connect rejected: {0}")]
    ConnectRejected(String),

    #[error("snapshot request failed: {0}")]
    SnapshotFailed(String),
}

/// Errors from a media source provider.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source returned no playable location for '{0}'")]
    Unresolvable(String),

    #[error("provider request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        Self::Request(e.to_string())
    }
}

/// Errors from the transcoding/transport collaborator.
#[derive(Debug, Error)]
#[error("stream error: {0}")]
pub struct StreamError(pub String);
