// In-memory persistence fakes for use-case tests.

use crate::domain::ports::{PlayerStore, RoomStore};
use crate::domain::{Player, Room, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
pub struct InMemoryStore {
    players: Mutex<HashMap<(String, String), Player>>,
    rooms: Mutex<HashMap<String, Room>>,
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
}

impl InMemoryStore {
    pub fn insert_player(&self, player: Player) {
        let key = (player.id.clone(), player.save_slot.clone());
        self.players.lock().expect("players lock").insert(key, player);
    }

    pub fn insert_room(&self, room: Room) {
        self.rooms.lock().expect("rooms lock").insert(room.id.clone(), room);
    }

    pub fn saved_players(&self) -> Vec<Player> {
        let mut players: Vec<Player> = self
            .players
            .lock()
            .expect("players lock")
            .values()
            .cloned()
            .collect();
        players.sort_by(|a, b| a.id.cmp(&b.id));
        players
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    fn check(&self, flag: &AtomicBool) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Io("injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PlayerStore for InMemoryStore {
    async fn load_player(&self, player_id: &str, slot: &str) -> Result<Option<Player>, StoreError> {
        self.check(&self.fail_loads)?;
        let key = (player_id.to_string(), slot.to_string());
        Ok(self.players.lock().expect("players lock").get(&key).cloned())
    }

    async fn save_player(&self, player: &Player) -> Result<(), StoreError> {
        self.check(&self.fail_saves)?;
        self.insert_player(player.clone());
        Ok(())
    }
}

#[async_trait]
impl RoomStore for InMemoryStore {
    async fn load_rooms(&self) -> Result<Vec<Room>, StoreError> {
        self.check(&self.fail_loads)?;
        Ok(self.rooms.lock().expect("rooms lock").values().cloned().collect())
    }

    async fn save_room(&self, room: &Room) -> Result<(), StoreError> {
        self.check(&self.fail_saves)?;
        self.insert_room(room.clone());
        Ok(())
    }

    async fn remove_room(&self, room_id: &str) -> Result<bool, StoreError> {
        self.check(&self.fail_saves)?;
        Ok(self.rooms.lock().expect("rooms lock").remove(room_id).is_some())
    }
}
