use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::common::errors::EngineError;
use crate::common::types::{ChannelId, RoomId, UserId, now_ms};
use crate::config::PresenceConfig;
use crate::gateway::Gateway;
use crate::presence::store::PresenceStore;

/// Resolves which voice channel a user currently occupies.
///
/// The event-sourced store is the primary source of truth and the gateway
/// snapshot is a recovery mechanism: the snapshot endpoint has a network
/// round trip and a staleness window the event stream does not. The
/// `snapshot_first` knob flips that precedence if operational evidence ever
/// points the other way.
pub struct PresenceResolver {
    store: Arc<PresenceStore>,
    gateway: Arc<dyn Gateway>,
    recheck_delay: Duration,
    snapshot_first: bool,
}

impl PresenceResolver {
    pub fn new(store: Arc<PresenceStore>, gateway: Arc<dyn Gateway>, config: &PresenceConfig) -> Self {
        Self {
            store,
            gateway,
            recheck_delay: Duration::from_millis(config.recheck_delay_ms),
            snapshot_first: config.snapshot_first,
        }
    }

    /// Find the user's voice channel in `room`.
    ///
    /// Lookup order (default policy): store, then snapshot + reconcile +
    /// re-query, then one bounded delay to absorb an in-flight event, then
    /// [`EngineError::NotInVoice`].
    pub async fn resolve(&self, room: &RoomId, user: &UserId) -> Result<ChannelId, EngineError> {
        if self.snapshot_first {
            if let Some(channel) = self.refresh_and_lookup(room, user).await {
                return Ok(channel);
            }
            if let Some(channel) = self.store.lookup(room, user) {
                return Ok(channel);
            }
        } else {
            if let Some(channel) = self.store.lookup(room, user) {
                debug!("presence: {} found in store for {}", user, room);
                return Ok(channel);
            }
            if let Some(channel) = self.refresh_and_lookup(room, user).await {
                return Ok(channel);
            }
        }

        // Last resort: the join event may be in flight but not yet applied.
        tokio::time::sleep(self.recheck_delay).await;
        if let Some(channel) = self.store.lookup(room, user) {
            debug!("presence: {} found after recheck delay in {}", user, room);
            return Ok(channel);
        }

        debug!("presence: {} not in voice in {}", user, room);
        Err(EngineError::NotInVoice)
    }

    async fn refresh_and_lookup(&self, room: &RoomId, user: &UserId) -> Option<ChannelId> {
        let fetched_at = now_ms();
        match self.gateway.fetch_room_snapshot(room).await {
            Ok(snapshot) => {
                self.store.reconcile(room, &snapshot, fetched_at);
                self.store.lookup(room, user)
            }
            Err(e) => {
                warn!("presence: snapshot fetch for {} failed: {}", room, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::common::errors::GatewayError;
    use crate::gateway::{RoomSnapshot, SnapshotMember, TransportHandle};

    struct MockGateway {
        snapshot: RoomSnapshot,
        fetch_count: AtomicUsize,
    }

    impl MockGateway {
        fn with_members(members: Vec<SnapshotMember>) -> Arc<Self> {
            Arc::new(Self {
                snapshot: RoomSnapshot {
                    room: RoomId::from("room-1"),
                    members,
                },
                fetch_count: AtomicUsize::new(0),
            })
        }

        fn fetches(&self) -> usize {
            self.fetch_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Gateway for MockGateway {
        async fn fetch_room_snapshot(&self, _room: &RoomId) -> Result<RoomSnapshot, GatewayError> {
            self.fetch_count.fetch_add(1, Ordering::SeqCst);
            Ok(self.snapshot.clone())
        }

        async fn join_voice(
            &self,
            room: &RoomId,
            channel: &ChannelId,
        ) -> Result<TransportHandle, GatewayError> {
            Ok(TransportHandle {
                room: room.clone(),
                channel: channel.clone(),
                connection_id: 1,
            })
        }

        async fn leave_voice(&self, _handle: &TransportHandle) {}
    }

    fn resolver_with(
        store: Arc<PresenceStore>,
        gateway: Arc<MockGateway>,
    ) -> PresenceResolver {
        PresenceResolver::new(store, gateway, &PresenceConfig::default())
    }

    #[tokio::test]
    async fn store_hit_skips_the_gateway() {
        let store = Arc::new(PresenceStore::new());
        let room = RoomId::from("room-1");
        let user = UserId::from("alice");
        store.record_join(&room, &user, ChannelId::from("general"), now_ms());

        let gateway = MockGateway::with_members(vec![]);
        let resolver = resolver_with(store, gateway.clone());

        let channel = resolver.resolve(&room, &user).await.unwrap();
        assert_eq!(channel, ChannelId::from("general"));
        assert_eq!(gateway.fetches(), 0);
    }

    #[tokio::test]
    async fn snapshot_recovers_a_store_miss_once() {
        let store = Arc::new(PresenceStore::new());
        let room = RoomId::from("room-1");
        let user = UserId::from("alice");

        let gateway = MockGateway::with_members(vec![SnapshotMember {
            user: user.clone(),
            channel: ChannelId::from("music"),
        }]);
        let resolver = resolver_with(store, gateway.clone());

        let channel = resolver.resolve(&room, &user).await.unwrap();
        assert_eq!(channel, ChannelId::from("music"));
        assert_eq!(gateway.fetches(), 1);

        // Second resolve is served from the reconciled store.
        let channel = resolver.resolve(&room, &user).await.unwrap();
        assert_eq!(channel, ChannelId::from("music"));
        assert_eq!(gateway.fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn recheck_delay_absorbs_in_flight_event() {
        let store = Arc::new(PresenceStore::new());
        let room = RoomId::from("room-1");
        let user = UserId::from("alice");

        let gateway = MockGateway::with_members(vec![]);
        let resolver = resolver_with(store.clone(), gateway.clone());

        // The join event lands while the resolver is inside its delay.
        let writer = {
            let store = store.clone();
            let room = room.clone();
            let user = user.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                store.record_join(&room, &user, ChannelId::from("late"), now_ms());
            })
        };

        let channel = resolver.resolve(&room, &user).await.unwrap();
        writer.await.unwrap();
        assert_eq!(channel, ChannelId::from("late"));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_lookup_is_not_in_voice() {
        let store = Arc::new(PresenceStore::new());
        let gateway = MockGateway::with_members(vec![]);
        let resolver = resolver_with(store, gateway.clone());

        let err = resolver
            .resolve(&RoomId::from("room-1"), &UserId::from("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotInVoice));
        assert_eq!(gateway.fetches(), 1);
    }

    #[tokio::test]
    async fn snapshot_first_policy_queries_gateway_up_front() {
        let store = Arc::new(PresenceStore::new());
        let room = RoomId::from("room-1");
        let user = UserId::from("alice");
        let gateway = MockGateway::with_members(vec![SnapshotMember {
            user: user.clone(),
            channel: ChannelId::from("music"),
        }]);

        let config = PresenceConfig {
            snapshot_first: true,
            ..PresenceConfig::default()
        };
        let resolver = PresenceResolver::new(store, gateway.clone(), &config);

        resolver.resolve(&room, &user).await.unwrap();
        assert_eq!(gateway.fetches(), 1);
    }
}
