use crate::domain::JoinError;
use crate::interface_adapters::http::error_response;
use crate::interface_adapters::protocol::{
    CreateRoomResponse, JoinRoomRequest, PlayerDto, RoomListResponse, SnapshotDto,
};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::storage::is_valid_key;
use crate::use_cases::{JoinMode, JoinRequest, RoomError};

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::warn;

const DEFAULT_SLOT: &str = "default";

pub fn room_error_status(error: &RoomError) -> StatusCode {
    match error {
        RoomError::NotFound => StatusCode::NOT_FOUND,
        RoomError::AlreadyExists => StatusCode::CONFLICT,
        RoomError::Closed => StatusCode::SERVICE_UNAVAILABLE,
        RoomError::Join(JoinError::ClassRequired)
        | RoomError::Join(JoinError::UnknownClass(_))
        | RoomError::Join(JoinError::UnknownSubclass(_)) => StatusCode::BAD_REQUEST,
        RoomError::Join(JoinError::SaveNotFound) => StatusCode::NOT_FOUND,
        RoomError::Join(JoinError::RoomFull) | RoomError::Join(JoinError::GameOver) => {
            StatusCode::CONFLICT
        }
        RoomError::Join(JoinError::Storage(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        RoomError::Rejected(_) => StatusCode::BAD_REQUEST,
    }
}

fn room_error_response(error: RoomError) -> Response {
    error_response(room_error_status(&error), error.to_string())
}

pub async fn create_room_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.registry.create_room().await {
        Ok(room) => (
            StatusCode::CREATED,
            Json(CreateRoomResponse {
                room_id: room.room_id.to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "failed to create room");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

pub async fn list_rooms_handler(State(state): State<Arc<AppState>>) -> Json<RoomListResponse> {
    Json(RoomListResponse {
        rooms: state.registry.room_ids().await,
    })
}

pub async fn get_room_handler(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Response {
    let Some(room) = state.registry.get_room(&room_id).await else {
        return room_error_response(RoomError::NotFound);
    };
    match room.snapshot().await {
        Ok(snapshot) => Json(SnapshotDto::from(snapshot)).into_response(),
        Err(e) => room_error_response(e),
    }
}

pub async fn join_room_handler(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Json(payload): Json<JoinRoomRequest>,
) -> Response {
    let player_id = payload.player_id.trim().to_string();
    if !is_valid_key(&player_id) {
        return error_response(
            StatusCode::BAD_REQUEST,
            "player_id must be 1-64 letters, digits, '_' or '-'",
        );
    }
    let slot = payload
        .slot
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_SLOT.to_string());
    if !is_valid_key(&slot) {
        return error_response(
            StatusCode::BAD_REQUEST,
            "slot must be 1-64 letters, digits, '_' or '-'",
        );
    }

    let Some(room) = state.registry.get_room(&room_id).await else {
        return room_error_response(RoomError::NotFound);
    };

    let mode = if payload.resume {
        JoinMode::Resume
    } else {
        JoinMode::New {
            class: payload.class,
            subclass: payload.subclass,
        }
    };
    let request = JoinRequest {
        player_id,
        slot,
        mode,
    };
    match room.join(request).await {
        Ok(player) => Json(PlayerDto::from(&player)).into_response(),
        Err(e) => room_error_response(e),
    }
}
