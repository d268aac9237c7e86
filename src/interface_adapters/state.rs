use crate::domain::ports::RoomStore;
use crate::use_cases::RoomRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    // Live rooms and their task handles.
    pub registry: Arc<RoomRegistry>,
    // Room records; empty rooms are deleted here as well.
    pub room_store: Arc<dyn RoomStore>,
}
