// Use-case level inputs/outputs for the per-room task.

use crate::domain::systems::resolver::StepReport;
use crate::domain::{Action, ActionRejection, JoinError, Player, Room, SessionSnapshot};
use tokio::sync::oneshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinMode {
    // Build a fresh character from class data.
    New {
        class: Option<String>,
        subclass: Option<String>,
    },
    // Load the character saved under `slot`.
    Resume,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub player_id: String,
    pub slot: String,
    pub mode: JoinMode,
}

/// Everything a room task accepts. Replies travel back on the embedded oneshot.
#[derive(Debug)]
pub enum RoomEvent {
    Join {
        request: JoinRequest,
        reply: oneshot::Sender<Result<Player, JoinError>>,
    },
    Action {
        player_id: String,
        action: Action,
        reply: oneshot::Sender<Result<StepReport, ActionRejection>>,
    },
    // Wire input that never became an action.
    InvalidInput {
        player_id: String,
        detail: String,
    },
    Leave {
        player_id: String,
        // Players remaining after the leave.
        reply: oneshot::Sender<usize>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Export {
        reply: oneshot::Sender<Room>,
    },
}
