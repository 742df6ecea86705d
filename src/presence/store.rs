use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::common::types::{ChannelId, RoomId, UserId};
use crate::gateway::{PresenceEvent, RoomSnapshot};

/// Which side of the platform reported this record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceOrigin {
    /// Real-time gateway event. Zero latency, no staleness window.
    Event,
    /// Periodic authoritative snapshot fetch.
    Snapshot,
}

#[derive(Debug, Clone)]
pub struct PresenceRecord {
    pub channel: ChannelId,
    pub updated_at_ms: u64,
    pub origin: PresenceOrigin,
}

/// Last-known voice-channel membership per (room, user).
///
/// Written by the event-ingestion task and the periodic snapshot
/// reconciler, read by the command path. Critical sections are short and
/// never perform I/O.
#[derive(Default)]
pub struct PresenceStore {
    records: RwLock<HashMap<(RoomId, UserId), PresenceRecord>>,
}

impl PresenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatch a gateway event into the store.
    pub fn apply(&self, event: &PresenceEvent) {
        match &event.channel {
            Some(channel) => self.record_join(
                &event.room,
                &event.user,
                channel.clone(),
                event.timestamp_ms,
            ),
            None => self.record_leave(&event.room, &event.user, event.timestamp_ms),
        }
    }

    /// Upsert a membership record. Events are delivered in arrival order per
    /// user, so the newest write always wins.
    pub fn record_join(&self, room: &RoomId, user: &UserId, channel: ChannelId, timestamp_ms: u64) {
        trace!("presence: {} joined {} in {}", user, channel, room);
        self.records.write().insert(
            (room.clone(), user.clone()),
            PresenceRecord {
                channel,
                updated_at_ms: timestamp_ms,
                origin: PresenceOrigin::Event,
            },
        );
    }

    /// Drop the membership record, if any.
    pub fn record_leave(&self, room: &RoomId, user: &UserId, _timestamp_ms: u64) {
        trace!("presence: {} left voice in {}", user, room);
        self.records.write().remove(&(room.clone(), user.clone()));
    }

    pub fn lookup(&self, room: &RoomId, user: &UserId) -> Option<ChannelId> {
        self.records
            .read()
            .get(&(room.clone(), user.clone()))
            .map(|r| r.channel.clone())
    }

    /// Replace every record for `room` with the snapshot contents.
    ///
    /// A record whose timestamp is newer than the snapshot's fetch time is
    /// preserved: the snapshot endpoint can lag very recent events and would
    /// otherwise report a ghost empty room.
    pub fn reconcile(&self, room: &RoomId, snapshot: &RoomSnapshot, fetched_at_ms: u64) {
        let mut records = self.records.write();

        records.retain(|(r, _), record| r != room || record.updated_at_ms > fetched_at_ms);

        let mut applied = 0usize;
        for member in &snapshot.members {
            let key = (room.clone(), member.user.clone());
            if records.contains_key(&key) {
                // Preserved event-sourced record is newer than the snapshot.
                continue;
            }
            records.insert(
                key,
                PresenceRecord {
                    channel: member.channel.clone(),
                    updated_at_ms: fetched_at_ms,
                    origin: PresenceOrigin::Snapshot,
                },
            );
            applied += 1;
        }

        debug!(
            "presence: reconciled {} ({} snapshot members applied)",
            room, applied
        );
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}
