use crate::common::types::ChannelId;
use crate::gateway::TransportHandle;

/// One live voice connection for a room.
///
/// Owned by the controller's session registry and replaced, never mutated
/// in place, when the room switches channels.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    pub handle: TransportHandle,
    pub channel: ChannelId,
}
