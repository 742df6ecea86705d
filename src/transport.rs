use std::time::Duration;

use async_trait::async_trait;

use crate::common::errors::StreamError;
use crate::gateway::TransportHandle;

/// Where the audio for a track comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamLocation {
    /// Synthetic silence of a fixed duration. Used for test identifiers to
    /// prove transport health without a real media source.
    Placeholder { duration: Duration },
    /// Opaque locator the encoder can consume (direct URL, file path, ...).
    Remote(String),
}

impl StreamLocation {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder { .. })
    }
}

/// The transcoding/transport session collaborator.
///
/// Implementations pull audio from a [`StreamLocation`], encode it and push
/// frames through the voice connection behind the handle.
#[async_trait]
pub trait AudioStreamer: Send + Sync {
    /// Stream the source into the voice connection. Blocks the task until
    /// the stream finishes or fails.
    async fn stream_into(
        &self,
        handle: &TransportHandle,
        location: &StreamLocation,
    ) -> Result<(), StreamError>;

    /// Pause or resume the in-flight stream for this connection.
    fn set_paused(&self, handle: &TransportHandle, paused: bool);

    /// Release encoder resources held for this connection. An in-flight
    /// `stream_into` call is expected to return shortly afterwards.
    fn cleanup(&self, handle: &TransportHandle);
}
