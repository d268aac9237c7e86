// Room orchestration for spawning and managing per-room session tasks.

use crate::domain::ports::PlayerStore;
use crate::domain::systems::resolver::StepReport;
use crate::domain::{Action, ActionRejection, GameData, JoinError, Player, Room, SessionSnapshot};
use crate::use_cases::game::{RoomTimers, room_task};
use crate::use_cases::session::{SessionEngine, SessionLimits};
use crate::use_cases::types::{JoinRequest, RoomEvent};
use axum::extract::ws::Utf8Bytes;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, RwLock, broadcast, mpsc, oneshot, watch};
use tracing::info;

const ROOM_ID_LEN: usize = 8;
const ROOM_ID_ATTEMPTS: usize = 16;

/// Shared configuration for spawning rooms.
#[derive(Debug, Clone)]
pub struct RoomSettings {
    /// Capacity for inbound room events.
    pub event_channel_capacity: usize,
    /// Capacity for broadcast snapshots.
    pub snapshot_broadcast_capacity: usize,
    /// Upper bound on players per room.
    pub max_players: usize,
    /// Entries kept in each room's diagnostics ring.
    pub diagnostics_capacity: usize,
    /// Idle turn limit; `None` keeps a stalled turn forever.
    pub turn_timeout: Option<Duration>,
    /// Lifetime of a room nobody is in; `None` keeps it until shutdown.
    pub empty_room_ttl: Option<Duration>,
}

/// Called with every freshly spawned room, before it is registered.
pub type SpawnHook = Arc<dyn Fn(&RoomHandle) + Send + Sync>;

type RoomMap = Arc<RwLock<HashMap<String, RoomHandle>>>;

/// Errors returned by room registry and handle operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomError {
    NotFound,
    AlreadyExists,
    /// The room task has stopped.
    Closed,
    Join(JoinError),
    Rejected(ActionRejection),
}

impl fmt::Display for RoomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("room not found"),
            Self::AlreadyExists => f.write_str("room already exists"),
            Self::Closed => f.write_str("room is closed"),
            Self::Join(e) => write!(f, "{e}"),
            Self::Rejected(e) => write!(f, "{e}"),
        }
    }
}

/// Per-room channels.
#[derive(Clone)]
pub struct RoomHandle {
    /// Identifier clients use to target this room.
    pub room_id: Arc<str>,
    /// Sender for events into the room task.
    pub events_tx: mpsc::Sender<RoomEvent>,
    /// Broadcast sender for raw snapshots.
    pub snapshot_tx: broadcast::Sender<SessionSnapshot>,
    /// Broadcast sender for serialized snapshots.
    pub snapshot_bytes_tx: broadcast::Sender<Utf8Bytes>,
    /// Watch sender holding the latest serialized snapshot.
    pub snapshot_latest_tx: watch::Sender<Utf8Bytes>,
    /// Signal that stops the room task.
    shutdown: Arc<Notify>,
}

impl RoomHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> RoomEvent,
    ) -> Result<T, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.events_tx
            .send(build(reply))
            .await
            .map_err(|_| RoomError::Closed)?;
        rx.await.map_err(|_| RoomError::Closed)
    }

    pub async fn join(&self, request: JoinRequest) -> Result<Player, RoomError> {
        self.request(|reply| RoomEvent::Join { request, reply })
            .await?
            .map_err(RoomError::Join)
    }

    pub async fn submit(&self, player_id: &str, action: Action) -> Result<StepReport, RoomError> {
        let player_id = player_id.to_string();
        self.request(|reply| RoomEvent::Action {
            player_id,
            action,
            reply,
        })
        .await?
        .map_err(RoomError::Rejected)
    }

    /// Records wire input that could not be turned into an action.
    pub async fn report_invalid(&self, player_id: &str, detail: String) -> Result<(), RoomError> {
        self.events_tx
            .send(RoomEvent::InvalidInput {
                player_id: player_id.to_string(),
                detail,
            })
            .await
            .map_err(|_| RoomError::Closed)
    }

    /// Disconnect bookkeeping. Returns how many players remain.
    pub async fn leave(&self, player_id: &str) -> Result<usize, RoomError> {
        let player_id = player_id.to_string();
        self.request(|reply| RoomEvent::Leave { player_id, reply })
            .await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, RoomError> {
        self.request(|reply| RoomEvent::Snapshot { reply }).await
    }

    pub async fn export(&self) -> Result<Room, RoomError> {
        self.request(|reply| RoomEvent::Export { reply }).await
    }
}

/// Thread-safe registry for active rooms.
pub struct RoomRegistry {
    /// Global settings applied to newly created rooms.
    settings: RoomSettings,
    /// Static game data shared by every room.
    data: Arc<GameData>,
    /// Character saves used for resume joins and phase persistence.
    player_store: Arc<dyn PlayerStore>,
    /// Runs alongside every room task, e.g. to start snapshot serialization.
    spawn_hook: Option<SpawnHook>,
    /// Map of room id to active handle.
    rooms: RoomMap,
}

impl RoomRegistry {
    pub fn new(
        settings: RoomSettings,
        data: Arc<GameData>,
        player_store: Arc<dyn PlayerStore>,
    ) -> Self {
        Self {
            settings,
            data,
            player_store,
            spawn_hook: None,
            rooms: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn with_spawn_hook(mut self, hook: impl Fn(&RoomHandle) + Send + Sync + 'static) -> Self {
        self.spawn_hook = Some(Arc::new(hook));
        self
    }

    fn limits(&self) -> SessionLimits {
        SessionLimits {
            max_players: self.settings.max_players,
            diagnostics_capacity: self.settings.diagnostics_capacity,
        }
    }

    /// Creates an empty room under a fresh short id and spawns its task.
    pub async fn create_room(&self) -> Result<RoomHandle, RoomError> {
        let mut rooms = self.rooms.write().await;
        let room_id = (0..ROOM_ID_ATTEMPTS)
            .map(|_| short_id())
            .find(|id| !rooms.contains_key(id))
            .ok_or(RoomError::AlreadyExists)?;

        let engine = SessionEngine::new(room_id.clone(), self.data.clone(), self.limits());
        let handle = self.spawn(engine);
        rooms.insert(room_id.clone(), handle.clone());
        info!(%room_id, "room created");
        Ok(handle)
    }

    /// Re-registers a saved room under its original id.
    pub async fn restore_room(&self, room: Room) -> Result<RoomHandle, RoomError> {
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(&room.id) {
            return Err(RoomError::AlreadyExists);
        }

        let room_id = room.id.clone();
        let engine = SessionEngine::restore(room, self.data.clone(), self.limits());
        let handle = self.spawn(engine);
        rooms.insert(room_id.clone(), handle.clone());
        info!(%room_id, "room restored");
        Ok(handle)
    }

    fn spawn(&self, engine: SessionEngine) -> RoomHandle {
        // Channel wiring for the room task.
        let (events_tx, events_rx) =
            mpsc::channel::<RoomEvent>(self.settings.event_channel_capacity);
        let (snapshot_tx, _snapshot_rx) =
            broadcast::channel::<SessionSnapshot>(self.settings.snapshot_broadcast_capacity);
        let (snapshot_bytes_tx, _snapshot_bytes_rx) =
            broadcast::channel::<Utf8Bytes>(self.settings.snapshot_broadcast_capacity);
        let (snapshot_latest_tx, _snapshot_latest_rx) =
            watch::channel::<Utf8Bytes>(Utf8Bytes::from(""));
        let shutdown = Arc::new(Notify::new());

        let handle = RoomHandle {
            room_id: Arc::from(engine.room_id()),
            events_tx,
            snapshot_tx: snapshot_tx.clone(),
            snapshot_bytes_tx,
            snapshot_latest_tx,
            shutdown: shutdown.clone(),
        };

        if let Some(hook) = &self.spawn_hook {
            hook(&handle);
        }

        // Spawn the authoritative sequential task for this room.
        let task = room_task(
            events_rx,
            engine,
            snapshot_tx,
            self.player_store.clone(),
            shutdown,
            RoomTimers {
                turn_timeout: self.settings.turn_timeout,
                empty_room_ttl: self.settings.empty_room_ttl,
            },
        );
        let rooms = Arc::clone(&self.rooms);
        let room_id = handle.room_id.clone();
        let events = handle.events_tx.downgrade();
        tokio::spawn(async move {
            task.await;
            unregister(&rooms, &room_id, &events).await;
        });
        handle
    }

    /// Returns a room handle for the provided id, if it exists.
    pub async fn get_room(&self, room_id: &str) -> Option<RoomHandle> {
        let rooms = self.rooms.read().await;
        rooms.get(room_id).cloned()
    }

    /// Removes the room and stops its task.
    pub async fn remove_room(&self, room_id: &str) -> Option<RoomHandle> {
        let removed = self.rooms.write().await.remove(room_id);
        if let Some(handle) = &removed {
            handle.shutdown.notify_one();
            info!(%room_id, "room removed");
        }
        removed
    }

    /// Active room ids in sorted order.
    pub async fn room_ids(&self) -> Vec<String> {
        let rooms = self.rooms.read().await;
        let mut ids: Vec<String> = rooms.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Current state of every live room, for shutdown persistence.
    pub async fn export_rooms(&self) -> Vec<Room> {
        let handles: Vec<RoomHandle> = self.rooms.read().await.values().cloned().collect();
        let mut exported = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Ok(room) = handle.export().await {
                exported.push(room);
            }
        }
        exported
    }
}

// Drops the registry entry of a finished room task, unless the id now belongs to a newer room.
async fn unregister(rooms: &RoomMap, room_id: &str, events: &mpsc::WeakSender<RoomEvent>) {
    let mut rooms = rooms.write().await;
    let current = rooms.get(room_id).is_some_and(|handle| {
        events
            .upgrade()
            .is_some_and(|tx| tx.same_channel(&handle.events_tx))
    });
    if current {
        rooms.remove(room_id);
        info!(%room_id, "room closed");
    }
}

fn short_id() -> String {
    uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(ROOM_ID_LEN)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::test_support::InMemoryStore;
    use crate::use_cases::types::JoinMode;
    use crate::domain::Direction;

    fn registry() -> RoomRegistry {
        RoomRegistry::new(
            RoomSettings {
                event_channel_capacity: 16,
                snapshot_broadcast_capacity: 16,
                max_players: 6,
                diagnostics_capacity: 16,
                turn_timeout: None,
                empty_room_ttl: None,
            },
            Arc::new(GameData::embedded().expect("embedded data")),
            Arc::new(InMemoryStore::default()),
        )
    }

    fn join_request(player_id: &str) -> JoinRequest {
        JoinRequest {
            player_id: player_id.to_string(),
            slot: "default".to_string(),
            mode: JoinMode::New {
                class: Some("Wizard".into()),
                subclass: Some("Evoker".into()),
            },
        }
    }

    #[tokio::test]
    async fn when_room_is_created_then_it_gets_a_short_id() {
        let registry = registry();
        let room = registry.create_room().await.expect("created");
        assert_eq!(room.room_id.len(), ROOM_ID_LEN);
        assert!(registry.get_room(&room.room_id).await.is_some());
        assert_eq!(registry.room_ids().await, vec![room.room_id.to_string()]);
    }

    #[tokio::test]
    async fn when_two_rooms_are_created_then_ids_differ() {
        let registry = registry();
        let a = registry.create_room().await.expect("created");
        let b = registry.create_room().await.expect("created");
        assert_ne!(a.room_id, b.room_id);
    }

    #[tokio::test]
    async fn when_rooms_are_independent_then_actions_do_not_leak() {
        let registry = registry();
        let a = registry.create_room().await.expect("created");
        let b = registry.create_room().await.expect("created");
        a.join(join_request("p1")).await.expect("joined a");
        b.join(join_request("p1")).await.expect("joined b");

        a.submit("p1", Action::Move { direction: Direction::Up })
            .await
            .expect("moved");
        let in_a = a.snapshot().await.expect("snapshot a");
        let in_b = b.snapshot().await.expect("snapshot b");
        assert_ne!(in_a.players[0].position, in_b.players[0].position);
        assert_eq!(in_b.last_action, None);
    }

    #[tokio::test]
    async fn when_join_is_invalid_then_error_is_wrapped() {
        let registry = registry();
        let room = registry.create_room().await.expect("created");
        let mut request = join_request("p1");
        request.mode = JoinMode::New {
            class: Some("Bard".into()),
            subclass: Some("Lore".into()),
        };
        assert_eq!(
            room.join(request).await,
            Err(RoomError::Join(JoinError::UnknownClass("Bard".into())))
        );
    }

    #[tokio::test]
    async fn when_room_is_removed_then_handle_reports_closed() {
        let registry = registry();
        let room = registry.create_room().await.expect("created");
        let removed = registry.remove_room(&room.room_id).await;
        assert!(removed.is_some());
        assert!(registry.get_room(&room.room_id).await.is_none());

        room.events_tx.closed().await;
        assert_eq!(room.snapshot().await, Err(RoomError::Closed));
    }

    #[tokio::test]
    async fn when_saved_room_is_restored_then_state_and_id_survive() {
        let registry = registry();
        let original = registry.create_room().await.expect("created");
        original.join(join_request("p1")).await.expect("joined");
        let exported = original.export().await.expect("exported");
        registry.remove_room(&original.room_id).await;

        let restored = registry.restore_room(exported.clone()).await.expect("restored");
        assert_eq!(restored.room_id, original.room_id);
        assert_eq!(restored.export().await.expect("export"), exported);
        assert_eq!(
            registry.restore_room(exported).await.err(),
            Some(RoomError::AlreadyExists)
        );
    }

    #[tokio::test]
    async fn when_last_player_leaves_then_room_leaves_the_registry() {
        let registry = registry();
        let room = registry.create_room().await.expect("created");
        room.join(join_request("p1")).await.expect("joined");
        assert_eq!(room.leave("p1").await, Ok(0));

        room.events_tx.closed().await;
        for _ in 0..50 {
            if registry.get_room(&room.room_id).await.is_none() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("closed room stayed registered");
    }

    #[tokio::test]
    async fn when_old_task_finishes_then_restored_room_with_same_id_stays() {
        let registry = registry();
        let original = registry.create_room().await.expect("created");
        original.join(join_request("p1")).await.expect("joined");
        let exported = original.export().await.expect("exported");
        registry.remove_room(&original.room_id).await;
        let restored = registry.restore_room(exported).await.expect("restored");

        original.events_tx.closed().await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(registry.get_room(&restored.room_id).await.is_some());
        assert!(restored.snapshot().await.is_ok());
    }

    #[tokio::test]
    async fn when_spawn_hook_is_set_then_it_runs_for_created_and_restored_rooms() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let spawned = Arc::new(AtomicUsize::new(0));
        let counter = spawned.clone();
        let registry = registry().with_spawn_hook(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let room = registry.create_room().await.expect("created");
        room.join(join_request("p1")).await.expect("joined");
        let exported = room.export().await.expect("exported");
        registry.remove_room(&room.room_id).await;
        registry.restore_room(exported).await.expect("restored");

        assert_eq!(spawned.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn when_exporting_all_rooms_then_each_live_room_is_returned() {
        let registry = registry();
        registry.create_room().await.expect("created");
        registry.create_room().await.expect("created");
        assert_eq!(registry.export_rooms().await.len(), 2);
    }
}
