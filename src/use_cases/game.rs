use super::session::SessionEngine;
use super::types::{JoinMode, JoinRequest, RoomEvent};
use crate::domain::ports::PlayerStore;
use crate::domain::{JoinError, Player, SessionSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, broadcast, mpsc};
use tokio::time::Instant;
use tracing::{debug, info, warn};

// Turn holder being timed, keyed by log length so any accepted action restarts the clock.
struct IdleWatch {
    holder: String,
    log_len: usize,
    deadline: Instant,
}

/// Time limits a room task enforces on its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoomTimers {
    /// Idle turn limit; `None` keeps a stalled turn forever.
    pub turn_timeout: Option<Duration>,
    /// How long a room may sit with no players before it closes.
    pub empty_room_ttl: Option<Duration>,
}

/// Sequential owner of one room. Events are handled strictly one at a time.
///
/// Returns when the room is shut down, when its last player leaves, or when
/// it has been empty for `empty_room_ttl`.
pub async fn room_task(
    mut events_rx: mpsc::Receiver<RoomEvent>,
    mut engine: SessionEngine,
    snapshot_tx: broadcast::Sender<SessionSnapshot>,
    player_store: Arc<dyn PlayerStore>,
    shutdown: Arc<Notify>,
    timers: RoomTimers,
) {
    let room_id = engine.room_id().to_string();
    let mut idle: Option<IdleWatch> = None;
    let mut empty_since: Option<Instant> = None;
    debug!(%room_id, "room task started");

    loop {
        refresh_idle_watch(&engine, timers.turn_timeout, &mut idle);
        let deadline = idle.as_ref().map(|watch| watch.deadline);

        empty_since = match engine.player_count() {
            0 => empty_since.or_else(|| Some(Instant::now())),
            _ => None,
        };
        let empty_deadline = timers
            .empty_room_ttl
            .zip(empty_since)
            .map(|(ttl, since)| since + ttl);

        tokio::select! {
            _ = shutdown.notified() => {
                // Exit cleanly when the room is removed.
                break;
            }
            _ = async move {
                match empty_deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending::<()>().await,
                }
            } => {
                info!(%room_id, "empty room expired");
                break;
            }
            _ = async move {
                match deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending::<()>().await,
                }
            } => {
                if let Some(watch) = idle.take()
                    && engine.pass_turn(&watch.holder)
                {
                    info!(%room_id, player_id = %watch.holder, "idle turn passed");
                    let _ = snapshot_tx.send(engine.snapshot());
                }
            }
            event = events_rx.recv() => {
                let Some(event) = event else {
                    break;
                };
                if handle_event(&mut engine, event, &snapshot_tx, player_store.as_ref()).await
                    == RoomFlow::Close
                {
                    info!(%room_id, "last player left; room closing");
                    break;
                }
            }
        }
    }

    debug!(%room_id, "room task stopped");
}

fn refresh_idle_watch(
    engine: &SessionEngine,
    turn_timeout: Option<Duration>,
    idle: &mut Option<IdleWatch>,
) {
    let Some(timeout) = turn_timeout else {
        return;
    };
    let state = &engine.room().state;
    let holder = match (&state.turn, state.winner) {
        (Some(holder), None) => holder,
        _ => {
            *idle = None;
            return;
        }
    };
    let log_len = state.log.len();
    let unchanged = idle
        .as_ref()
        .is_some_and(|watch| &watch.holder == holder && watch.log_len == log_len);
    if !unchanged {
        *idle = Some(IdleWatch {
            holder: holder.clone(),
            log_len,
            deadline: Instant::now() + timeout,
        });
    }
}

#[derive(Debug, PartialEq, Eq)]
enum RoomFlow {
    Continue,
    Close,
}

async fn handle_event(
    engine: &mut SessionEngine,
    event: RoomEvent,
    snapshot_tx: &broadcast::Sender<SessionSnapshot>,
    player_store: &dyn PlayerStore,
) -> RoomFlow {
    match event {
        RoomEvent::Join { request, reply } => {
            let result = join(engine, request, player_store).await;
            if result.is_ok() {
                let _ = snapshot_tx.send(engine.snapshot());
            }
            let _ = reply.send(result);
        }
        RoomEvent::Action {
            player_id,
            action,
            reply,
        } => {
            let result = engine.apply(&player_id, &action);
            if let Ok(report) = &result {
                persist_players(engine.room_id(), &report.persist, player_store).await;
                let _ = snapshot_tx.send(engine.snapshot());
            }
            let _ = reply.send(result);
        }
        RoomEvent::InvalidInput { player_id, detail } => {
            engine.reject_input(&player_id, &detail);
        }
        RoomEvent::Leave { player_id, reply } => {
            let removed = engine.disconnect(&player_id);
            if removed {
                let _ = snapshot_tx.send(engine.snapshot());
            }
            let remaining = engine.player_count();
            let _ = reply.send(remaining);
            // Closing here orders the last leave before any queued join.
            if removed && remaining == 0 {
                return RoomFlow::Close;
            }
        }
        RoomEvent::Snapshot { reply } => {
            let _ = reply.send(engine.snapshot());
        }
        RoomEvent::Export { reply } => {
            let _ = reply.send(engine.room().clone());
        }
    }
    RoomFlow::Continue
}

async fn join(
    engine: &mut SessionEngine,
    request: JoinRequest,
    player_store: &dyn PlayerStore,
) -> Result<Player, JoinError> {
    let JoinRequest {
        player_id,
        slot,
        mode,
    } = request;
    match mode {
        JoinMode::New { class, subclass } => {
            engine.join_new(&player_id, class.as_deref(), subclass.as_deref(), &slot)
        }
        JoinMode::Resume => {
            // Members re-joining get their live record back without a store round-trip.
            if let Some(existing) = engine.room().players.get(&player_id) {
                return Ok(existing.clone());
            }
            let saved = player_store
                .load_player(&player_id, &slot)
                .await
                .map_err(|e| JoinError::Storage(e.to_string()))?
                .ok_or(JoinError::SaveNotFound)?;
            engine.join_existing(saved)
        }
    }
}

async fn persist_players(room_id: &str, players: &[Player], player_store: &dyn PlayerStore) {
    for player in players {
        if let Err(e) = player_store.save_player(player).await {
            warn!(room_id, player_id = %player.id, error = %e, "failed to persist player");
        }
    }
}
