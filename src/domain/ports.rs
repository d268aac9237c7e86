use async_trait::async_trait;

use crate::domain::entities::Player;
use crate::domain::errors::StoreError;
use crate::domain::state::Room;

// Port for character saves keyed by (player id, save slot).
#[async_trait]
pub trait PlayerStore: Send + Sync {
    async fn load_player(&self, player_id: &str, slot: &str) -> Result<Option<Player>, StoreError>;
    // The slot comes from `player.save_slot`.
    async fn save_player(&self, player: &Player) -> Result<(), StoreError>;
}

// Port for whole-room records keyed by room id. Plain get/put, no transactions.
#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn load_rooms(&self) -> Result<Vec<Room>, StoreError>;
    async fn save_room(&self, room: &Room) -> Result<(), StoreError>;
    async fn remove_room(&self, room_id: &str) -> Result<bool, StoreError>;
}
