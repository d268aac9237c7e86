use crate::interface_adapters::net::{
    create_room_handler, get_room_handler, join_room_handler, list_rooms_handler, ws_handler,
};
use crate::interface_adapters::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/rooms", post(create_room_handler).get(list_rooms_handler))
        .route("/rooms/{room_id}", get(get_room_handler))
        .route("/rooms/{room_id}/join", post(join_room_handler))
        .route("/ws/{room_id}/{player_id}", get(ws_handler))
        .layer(create_cors_layer())
        .with_state(state)
}

// Browser clients are served from other origins.
fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
