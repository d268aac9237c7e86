// JSON file persistence for character saves and room records.

use crate::domain::ports::{PlayerStore, RoomStore};
use crate::domain::{Player, Room, StoreError};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const MAX_KEY_LEN: usize = 64;
const PLAYERS_DIR: &str = "players";
const ROOMS_DIR: &str = "rooms";

/// Keys become file names, so only `[A-Za-z0-9_-]{1,64}` is accepted.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn checked_key(key: &str) -> Result<&str, StoreError> {
    if is_valid_key(key) {
        Ok(key)
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

/// One JSON document per player save and per room under a root directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the directory layout if it does not exist yet.
    pub async fn init(&self) -> Result<(), StoreError> {
        for dir in [PLAYERS_DIR, ROOMS_DIR] {
            tokio::fs::create_dir_all(self.root.join(dir))
                .await
                .map_err(io_error)?;
        }
        Ok(())
    }

    fn player_path(&self, player_id: &str, slot: &str) -> Result<PathBuf, StoreError> {
        let file = format!("{}__{}.json", checked_key(player_id)?, checked_key(slot)?);
        Ok(self.root.join(PLAYERS_DIR).join(file))
    }

    fn room_path(&self, room_id: &str) -> Result<PathBuf, StoreError> {
        let file = format!("{}.json", checked_key(room_id)?);
        Ok(self.root.join(ROOMS_DIR).join(file))
    }
}

fn io_error(e: std::io::Error) -> StoreError {
    StoreError::Io(e.to_string())
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_error(e)),
    };
    serde_json::from_slice(&raw)
        .map(Some)
        .map_err(|e| StoreError::Corrupt(format!("{}: {e}", path.display())))
}

// Write to a sibling then rename so readers never see a half-written file.
async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let bytes =
        serde_json::to_vec_pretty(value).map_err(|e| StoreError::Corrupt(e.to_string()))?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await.map_err(io_error)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_error)?;
    debug!(path = %path.display(), "saved");
    Ok(())
}

#[async_trait]
impl PlayerStore for JsonFileStore {
    async fn load_player(&self, player_id: &str, slot: &str) -> Result<Option<Player>, StoreError> {
        read_json(&self.player_path(player_id, slot)?).await
    }

    async fn save_player(&self, player: &Player) -> Result<(), StoreError> {
        write_json(&self.player_path(&player.id, &player.save_slot)?, player).await
    }
}

#[async_trait]
impl RoomStore for JsonFileStore {
    async fn load_rooms(&self) -> Result<Vec<Room>, StoreError> {
        let dir = self.root.join(ROOMS_DIR);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(e)),
        };

        let mut rooms = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            // One unreadable record must not keep the others from loading.
            match read_json::<Room>(&path).await {
                Ok(Some(room)) if is_valid_key(&room.id) => rooms.push(room),
                Ok(Some(room)) => {
                    warn!(path = %path.display(), room_id = %room.id, "skipping room with invalid id");
                }
                Ok(None) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable room"),
            }
        }
        rooms.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(rooms)
    }

    async fn save_room(&self, room: &Room) -> Result<(), StoreError> {
        write_json(&self.room_path(&room.id)?, room).await
    }

    async fn remove_room(&self, room_id: &str) -> Result<bool, StoreError> {
        match tokio::fs::remove_file(self.room_path(room_id)?).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(e)),
        }
    }
}
