use std::{env, net::IpAddr, path::PathBuf, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("TACTICS_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3001)
}

pub fn bind_addr() -> IpAddr {
    env::var("TACTICS_BIND_ADDR")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(IpAddr::from([127, 0, 0, 1]))
}

pub fn data_dir() -> PathBuf {
    env::var("DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./saves"))
}

// Unset means the game data compiled into the binary.
pub fn game_data_path() -> Option<PathBuf> {
    env::var("GAME_DATA_PATH")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

// 0 disables the idle-turn pass.
pub fn turn_timeout() -> Option<Duration> {
    let secs = env::var("TURN_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(0);
    (secs > 0).then(|| Duration::from_secs(secs))
}

pub const EVENT_CHANNEL_CAPACITY: usize = 256;
pub const SNAPSHOT_BROADCAST_CAPACITY: usize = 64;
pub const MAX_PLAYERS_PER_ROOM: usize = 6;
pub const DIAGNOSTICS_CAPACITY: usize = 64;
// Rooms nobody has joined, or everyone left, close after this long.
pub const EMPTY_ROOM_TTL: Duration = Duration::from_secs(300);
