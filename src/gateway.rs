use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::common::errors::GatewayError;
use crate::common::types::{ChannelId, RoomId, UserId};

/// A real-time voice-state update delivered by the platform gateway.
///
/// `channel: None` means the user left voice in that room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceEvent {
    pub room: RoomId,
    pub user: UserId,
    pub channel: Option<ChannelId>,
    pub timestamp_ms: u64,
}

/// Authoritative voice-state listing for one room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room: RoomId,
    pub members: Vec<SnapshotMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMember {
    pub user: UserId,
    pub channel: ChannelId,
}

/// Opaque token for an established voice connection. The transport
/// collaborator knows how to push frames through it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransportHandle {
    pub room: RoomId,
    pub channel: ChannelId,
    /// Connection id, unique per join.
    pub connection_id: u64,
}

/// The chat-platform client, as seen by this engine.
///
/// Presence events arrive out of band through [`PresenceStore::apply`];
/// this trait covers the request/response half of the gateway.
///
/// [`PresenceStore::apply`]: crate::presence::PresenceStore::apply
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Fetch the current voice state of every user in the room.
    async fn fetch_room_snapshot(&self, room: &RoomId) -> Result<RoomSnapshot, GatewayError>;

    /// Establish a voice connection to the given channel.
    async fn join_voice(
        &self,
        room: &RoomId,
        channel: &ChannelId,
    ) -> Result<TransportHandle, GatewayError>;

    /// Tear down a previously established voice connection.
    async fn leave_voice(&self, handle: &TransportHandle);
}
