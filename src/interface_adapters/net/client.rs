use crate::domain::{Action, ActionRejection, Outcome, SessionSnapshot};
use crate::domain::ports::RoomStore;
use crate::interface_adapters::http::error_response;
use crate::interface_adapters::protocol::{ClientMessage, ServerMessage, SnapshotDto};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{RoomError, RoomHandle, RoomRegistry};

use axum::{
    Error,
    extract::{
        Path, State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, watch};
use tracing::{Instrument, debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    RoomClosed,
    SnapshotsClosed,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

pub async fn snapshot_serializer(
    mut snapshot_rx: broadcast::Receiver<SessionSnapshot>,
    snapshot_bytes_tx: broadcast::Sender<Utf8Bytes>,
    snapshot_latest_tx: watch::Sender<Utf8Bytes>,
) {
    // Serialize each snapshot once and broadcast the shared bytes.
    loop {
        match snapshot_rx.recv().await {
            Ok(snapshot) => {
                let msg = ServerMessage::Snapshot(SnapshotDto::from(snapshot));
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize snapshot");
                        continue;
                    }
                };

                let bytes = Utf8Bytes::from(txt);
                // Store the latest bytes for lag recovery.
                let _ = snapshot_latest_tx.send(bytes.clone());
                let _ = snapshot_bytes_tx.send(bytes);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "snapshot serializer lagged; skipping to latest");
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("snapshot channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub fn spawn_room_serializer(room: &RoomHandle) {
    tokio::spawn(snapshot_serializer(
        room.snapshot_tx.subscribe(),
        room.snapshot_bytes_tx.clone(),
        room.snapshot_latest_tx.clone(),
    ));
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path((room_id, player_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let Some(room) = state.registry.get_room(&room_id).await else {
        return error_response(StatusCode::NOT_FOUND, "room not found");
    };

    // Seats are taken over HTTP; the socket only attaches to an existing seat.
    let joined = match room.snapshot().await {
        Ok(snapshot) => snapshot.player_order.iter().any(|id| id == &player_id),
        Err(_) => return error_response(StatusCode::NOT_FOUND, "room not found"),
    };
    if !joined {
        return error_response(StatusCode::FORBIDDEN, "join the room before connecting");
    }

    let registry = state.registry.clone();
    let room_store = state.room_store.clone();
    ws.on_upgrade(move |socket| {
        // Separate connection id so reconnects of the same player can be told apart.
        let conn_id = uuid::Uuid::new_v4().simple().to_string();
        let span = info_span!("conn", %conn_id, room_id = %room.room_id, %player_id);
        handle_socket(socket, room, registry, room_store, player_id).instrument(span)
    })
}

async fn handle_socket(
    mut socket: WebSocket,
    room: RoomHandle,
    registry: Arc<RoomRegistry>,
    room_store: Arc<dyn RoomStore>,
    player_id: String,
) {
    let mut ctx = match bootstrap_connection(&mut socket, room, registry, room_store, player_id)
        .await
    {
        Ok(ctx) => ctx,
        Err((e, ctx)) => {
            error!(error = ?e, "failed to bootstrap connection");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "bootstrap failed".into(),
                })))
                .await;
            let _ = socket.close().await;
            if let Err(e) = disconnect_cleanup(&ctx).await {
                warn!(error = ?e, "error during disconnect cleanup");
            }
            return;
        }
    };

    info!("client connected");

    // Main Client Loop
    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

struct ConnCtx {
    pub player_id: String,
    pub room: RoomHandle,
    // Registry access so the last leaver can retire the room.
    pub registry: Arc<RoomRegistry>,
    pub room_store: Arc<dyn RoomStore>,
    pub snapshot_bytes_rx: broadcast::Receiver<Utf8Bytes>,
    pub snapshot_latest_rx: watch::Receiver<Utf8Bytes>,
    // Count lag recovery snapshots sent to this client.
    pub lag_recovery_count: u64,

    pub msgs_in: u64,
    pub msgs_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,

    pub invalid_msgs: u32,

    pub last_snapshot_lag_log: Instant,
    pub last_invalid_input_log: Instant,

    pub close_frame: Option<CloseFrame>,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    room: RoomHandle,
    registry: Arc<RoomRegistry>,
    room_store: Arc<dyn RoomStore>,
    player_id: String,
) -> Result<ConnCtx, (NetError, ConnCtx)> {
    // Subscribe to updates *before* doing anything else (awaits) to not miss packets.
    let snapshot_bytes_rx = room.snapshot_bytes_tx.subscribe();
    let snapshot_latest_rx = room.snapshot_latest_tx.subscribe();

    let now = Instant::now() - LOG_THROTTLE;
    let mut ctx = ConnCtx {
        player_id,
        room,
        registry,
        room_store,
        snapshot_bytes_rx,
        snapshot_latest_rx,
        lag_recovery_count: 0,

        msgs_in: 0,
        msgs_out: 0,
        bytes_in: 0,
        bytes_out: 0,

        invalid_msgs: 0,

        last_snapshot_lag_log: now,
        last_invalid_input_log: now,

        close_frame: None,
    };

    // Send Initial State
    let snapshot = match ctx.room.snapshot().await {
        Ok(snapshot) => snapshot,
        Err(_) => return Err((NetError::RoomClosed, ctx)),
    };
    let msg = ServerMessage::Snapshot(SnapshotDto::from(snapshot));
    match send_message(socket, &msg).await {
        Ok(bytes) => {
            ctx.msgs_out += 1;
            ctx.bytes_out += bytes as u64;
            Ok(ctx)
        }
        Err(e) => Err((e, ctx)),
    }
}

enum LoopControl {
    Continue,
    Disconnect,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_MSGS: u32 = 10;

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let mut fatal: Option<NetError> = None;

    loop {
        // disconnect becomes true on error
        let disconnect: bool = tokio::select! {
            // Incoming Message from Client
            incoming = socket.recv() => {
                match handle_incoming_ws(socket, incoming, ctx).await {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // Outgoing Snapshot
            snapshot_msg = ctx.snapshot_bytes_rx.recv() => {
                match snapshot_msg {
                    Ok(bytes) => match forward_bytes(bytes, socket, ctx).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(&mut ctx.last_snapshot_lag_log) {
                            warn!(missed = n, "snapshots lagged; sending latest");
                        }

                        // Resync strategy: only the newest snapshot matters.
                        let latest = ctx.snapshot_latest_rx.borrow().clone();
                        if latest.is_empty() {
                            false
                        } else {
                            ctx.lag_recovery_count += 1;
                            match forward_bytes(latest, socket, ctx).await {
                                LoopControl::Continue => false,
                                LoopControl::Disconnect => true,
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::SnapshotsClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = ctx.close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Err(e) = disconnect_cleanup(ctx).await {
        warn!(error = ?e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

async fn handle_incoming_ws(
    socket: &mut WebSocket,
    incoming: Option<Result<Message, Error>>,
    ctx: &mut ConnCtx,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                ctx.msgs_in += 1;
                ctx.bytes_in += text.len() as u64;

                let parsed = serde_json::from_str::<ClientMessage>(&text)
                    .map_err(|e| ActionRejection::UnrecognizedInput(e.to_string()))
                    .and_then(|ClientMessage::Action(dto)| Action::try_from(dto));

                match parsed {
                    Ok(action) => submit_action(socket, ctx, action).await,
                    Err(rejection) => reject_invalid(socket, ctx, rejection, text.len()).await,
                }
            }
            Message::Binary(_) => {
                ctx.close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!("websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn submit_action(
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
    action: Action,
) -> Result<LoopControl, NetError> {
    let reply = match ctx.room.submit(&ctx.player_id, action).await {
        // The snapshot broadcast already tells everyone about the change.
        Ok(report) => match report.outcome {
            Outcome::Applied => return Ok(LoopControl::Continue),
            Outcome::NoEffect(reason) => ServerMessage::Ignored {
                reason: reason.to_string(),
            },
        },
        Err(RoomError::Rejected(rejection)) => ServerMessage::Rejected {
            reason: rejection.to_string(),
        },
        Err(_) => return Err(NetError::RoomClosed),
    };
    Ok(reply_to_client(socket, ctx, &reply).await)
}

async fn reject_invalid(
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
    rejection: ActionRejection,
    bytes: usize,
) -> Result<LoopControl, NetError> {
    ctx.invalid_msgs += 1;
    if should_log(&mut ctx.last_invalid_input_log) {
        warn!(bytes, reason = %rejection, "invalid client message");
    }

    if let ActionRejection::UnrecognizedInput(detail) = &rejection {
        ctx.room
            .report_invalid(&ctx.player_id, detail.clone())
            .await
            .map_err(|_| NetError::RoomClosed)?;
    }

    if ctx.invalid_msgs > MAX_INVALID_MSGS {
        ctx.close_frame = Some(CloseFrame {
            code: close_code::POLICY,
            reason: "too many invalid messages".into(),
        });
        return Ok(LoopControl::Disconnect);
    }

    let reply = ServerMessage::Rejected {
        reason: rejection.to_string(),
    };
    Ok(reply_to_client(socket, ctx, &reply).await)
}

async fn reply_to_client(socket: &mut WebSocket, ctx: &mut ConnCtx, msg: &ServerMessage) -> LoopControl {
    match send_message(socket, msg).await {
        Ok(bytes) => {
            ctx.msgs_out += 1;
            ctx.bytes_out += bytes as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Log unexpected send failures; disconnect will follow immediately.
            warn!(error = ?err, "failed to send reply");
            LoopControl::Disconnect
        }
    }
}

async fn forward_bytes(bytes: Utf8Bytes, socket: &mut WebSocket, ctx: &mut ConnCtx) -> LoopControl {
    let bytes_len = bytes.len();
    match socket.send(Message::Text(bytes)).await.map_err(NetError::Ws) {
        Ok(()) => {
            ctx.msgs_out += 1;
            ctx.bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Log unexpected send failures; disconnect will follow immediately.
            warn!(error = ?err, "failed to send snapshot");
            LoopControl::Disconnect
        }
    }
}

async fn disconnect_cleanup(ctx: &ConnCtx) -> Result<(), NetError> {
    let remaining = match ctx.room.leave(&ctx.player_id).await {
        Ok(remaining) => remaining,
        // Already removed (shutdown or a concurrent last leaver).
        Err(RoomError::Closed) => 0,
        Err(_) => return Err(NetError::RoomClosed),
    };

    // The room task closes itself on the last leave; drop what is left of it.
    if remaining == 0 {
        ctx.registry.remove_room(&ctx.room.room_id).await;
        if let Err(e) = ctx.room_store.remove_room(&ctx.room.room_id).await {
            warn!(error = %e, "failed to delete stored room");
        }
    }

    debug!(
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        bytes_in = ctx.bytes_in,
        bytes_out = ctx.bytes_out,
        invalid_msgs = ctx.invalid_msgs,
        lag_recovery_count = ctx.lag_recovery_count,
        "connection stats"
    );
    info!(remaining, "client disconnected");
    Ok(())
}
