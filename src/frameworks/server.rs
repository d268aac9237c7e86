// Framework bootstrap for the tactics server runtime.

use crate::domain::GameData;
use crate::domain::ports::RoomStore;
use crate::frameworks::config;
use crate::interface_adapters::net::spawn_room_serializer;
use crate::interface_adapters::routes;
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::storage::JsonFileStore;
use crate::use_cases::{RoomRegistry, RoomSettings};

use std::io::Result;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    run_with_data_dir(listener, config::data_dir()).await
}

/// Serves until Ctrl-C, then saves every live room under `data_dir`.
pub async fn run_with_data_dir(listener: tokio::net::TcpListener, data_dir: PathBuf) -> Result<()> {
    let address = listener.local_addr()?;
    // build state
    let state = build_state(data_dir).await?;
    let app = routes::app(state.clone());

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .inspect_err(|e| {
            tracing::error!(error = %e, "server error");
        })?;

    save_rooms(&state).await;
    Ok(())
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::new(config::bind_addr(), config::http_port());

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

async fn build_state(data_dir: PathBuf) -> Result<Arc<AppState>> {
    let game_data_path = config::game_data_path();
    let data = GameData::load(game_data_path.as_deref())
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    tracing::debug!(
        game_data = ?game_data_path,
        encounters = data.catalog().len(),
        "game data loaded"
    );

    let store = Arc::new(JsonFileStore::new(data_dir));
    store
        .init()
        .await
        .map_err(|e| std::io::Error::other(format!("failed to prepare data dir: {e}")))?;
    tracing::debug!(data_dir = %store.root().display(), "json store ready");

    // Setup Room Registry
    // This owns the set of active room tasks.
    let registry = Arc::new(RoomRegistry::new(
        RoomSettings {
            event_channel_capacity: config::EVENT_CHANNEL_CAPACITY,
            snapshot_broadcast_capacity: config::SNAPSHOT_BROADCAST_CAPACITY,
            max_players: config::MAX_PLAYERS_PER_ROOM,
            diagnostics_capacity: config::DIAGNOSTICS_CAPACITY,
            turn_timeout: config::turn_timeout(),
            empty_room_ttl: Some(config::EMPTY_ROOM_TTL),
        },
        Arc::new(data),
        store.clone(),
    )
    // Every room gets its snapshot serializer as soon as its task exists.
    .with_spawn_hook(spawn_room_serializer));

    restore_rooms(&registry, store.as_ref()).await;

    Ok(Arc::new(AppState {
        registry,
        room_store: store,
    }))
}

async fn restore_rooms(registry: &RoomRegistry, store: &dyn RoomStore) {
    let rooms = match store.load_rooms().await {
        Ok(rooms) => rooms,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load saved rooms");
            return;
        }
    };

    for room in rooms {
        let room_id = room.id.clone();
        if room.player_order.is_empty() {
            // Empty rooms are never kept.
            if let Err(e) = store.remove_room(&room_id).await {
                tracing::warn!(%room_id, error = %e, "failed to delete empty room");
            }
            continue;
        }
        if let Err(e) = registry.restore_room(room).await {
            tracing::warn!(%room_id, error = %e, "failed to restore room");
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        // Without a signal handler, serve until the process is killed.
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

async fn save_rooms(state: &AppState) {
    let rooms = state.registry.export_rooms().await;
    let mut saved = 0usize;
    for room in &rooms {
        match state.room_store.save_room(room).await {
            Ok(()) => saved += 1,
            Err(e) => tracing::warn!(room_id = %room.id, error = %e, "failed to save room"),
        }
    }
    tracing::info!(saved, total = rooms.len(), "rooms saved");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Room;

    #[tokio::test]
    async fn when_saved_rooms_exist_then_non_empty_ones_are_restored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path());
        let data = GameData::embedded().expect("data");

        let mut busy = Room::new("busy", data.shop.clone());
        let alice = crate::domain::systems::progression::create_character(
            &data,
            "alice",
            Some("Cleric"),
            Some("Life"),
            "default",
        )
        .expect("character");
        busy.player_order.push("alice".into());
        busy.players.insert("alice".into(), alice);
        busy.state.turn = Some("alice".into());
        store.save_room(&busy).await.expect("saved");
        store
            .save_room(&Room::new("empty", data.shop.clone()))
            .await
            .expect("saved");

        let state = build_state(dir.path().to_path_buf()).await.expect("state");

        assert_eq!(state.registry.room_ids().await, vec!["busy".to_string()]);
        let ids: Vec<String> = store
            .load_rooms()
            .await
            .expect("loaded")
            .into_iter()
            .map(|room| room.id)
            .collect();
        assert_eq!(ids, vec!["busy".to_string()]);

        let snapshot = state
            .registry
            .get_room("busy")
            .await
            .expect("restored")
            .snapshot()
            .await
            .expect("snapshot");
        assert_eq!(snapshot.turn.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn when_shutting_down_then_live_rooms_are_saved() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = build_state(dir.path().to_path_buf()).await.expect("state");
        let room = state.registry.create_room().await.expect("created");

        save_rooms(&state).await;

        let store = JsonFileStore::new(dir.path());
        let saved = store.load_rooms().await.expect("loaded");
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].id, room.room_id.as_ref());
    }

    #[tokio::test]
    async fn when_room_is_created_through_the_registry_then_snapshots_are_serialized() {
        use crate::use_cases::{JoinMode, JoinRequest};

        let dir = tempfile::tempdir().expect("tempdir");
        let state = build_state(dir.path().to_path_buf()).await.expect("state");
        let room = state.registry.create_room().await.expect("created");
        let mut latest = room.snapshot_latest_tx.subscribe();

        room.join(JoinRequest {
            player_id: "alice".into(),
            slot: "default".into(),
            mode: JoinMode::New {
                class: Some("Fighter".into()),
                subclass: Some("Champion".into()),
            },
        })
        .await
        .expect("joined");

        tokio::time::timeout(std::time::Duration::from_secs(1), latest.changed())
            .await
            .expect("serialized before timeout")
            .expect("serializer alive");
        let bytes = latest.borrow().clone();
        assert!(bytes.as_str().contains("\"alice\""));
    }
}
