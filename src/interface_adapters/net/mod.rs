// Network adapter modules split by WebSocket clients vs HTTP room routes.

pub mod client;
pub mod rooms;

pub use client::{spawn_room_serializer, ws_handler};
pub use rooms::{create_room_handler, get_room_handler, join_room_handler, list_rooms_handler};
