// Session engine: sole owner of one room's state. Every mutation goes through here.

use crate::domain::grid::{self, Position};
use crate::domain::systems::resolver::{self, StepReport};
use crate::domain::systems::{Outcome, encounters, progression, turns};
use crate::domain::{
    Action, ActionLogEntry, ActionRejection, GameData, JoinError, Player, Room, SessionSnapshot,
};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info};

/// Per-room limits supplied by configuration.
#[derive(Debug, Clone, Copy)]
pub struct SessionLimits {
    pub max_players: usize,
    pub diagnostics_capacity: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    // Refused; nothing changed and the turn was kept.
    Rejected,
    // Accepted without effect; the turn was consumed.
    Ignored,
}

/// Record of a rejected or ignored submission, kept for tests and operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub player_id: String,
    pub action: String,
    pub kind: DiagnosticKind,
    pub reason: String,
}

pub struct SessionEngine {
    room: Room,
    data: Arc<GameData>,
    limits: SessionLimits,
    diagnostics: VecDeque<Diagnostic>,
}

impl SessionEngine {
    pub fn new(room_id: impl Into<String>, data: Arc<GameData>, limits: SessionLimits) -> Self {
        let room = Room::new(room_id, data.shop.clone());
        Self::restore(room, data, limits)
    }

    /// Resumes a previously exported room.
    pub fn restore(room: Room, data: Arc<GameData>, limits: SessionLimits) -> Self {
        Self {
            room,
            data,
            limits,
            diagnostics: VecDeque::new(),
        }
    }

    pub fn room(&self) -> &Room {
        &self.room
    }

    pub fn room_id(&self) -> &str {
        &self.room.id
    }

    pub fn player_count(&self) -> usize {
        self.room.player_order.len()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.room.snapshot()
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Joins with a freshly created character. Re-joining returns the existing record.
    pub fn join_new(
        &mut self,
        player_id: &str,
        class: Option<&str>,
        subclass: Option<&str>,
        save_slot: &str,
    ) -> Result<Player, JoinError> {
        if let Some(existing) = self.room.players.get(player_id) {
            return Ok(existing.clone());
        }
        self.check_open()?;
        let player =
            progression::create_character(&self.data, player_id, class, subclass, save_slot)?;
        self.admit(player)
    }

    /// Joins with a character loaded from a save. Fallen characters come back at full health.
    pub fn join_existing(&mut self, mut player: Player) -> Result<Player, JoinError> {
        if let Some(existing) = self.room.players.get(&player.id) {
            return Ok(existing.clone());
        }
        self.check_open()?;
        if !player.is_alive() {
            player.hp = player.max_hp;
        }
        self.admit(player)
    }

    fn check_open(&self) -> Result<(), JoinError> {
        if self.room.state.winner.is_some() {
            return Err(JoinError::GameOver);
        }
        if self.room.player_order.len() >= self.limits.max_players {
            return Err(JoinError::RoomFull);
        }
        Ok(())
    }

    fn admit(&mut self, mut player: Player) -> Result<Player, JoinError> {
        let preferred = Position::clamped(
            grid::GRID_SIZE as i32 - 1,
            self.room.player_order.len() as i32 + 1,
        );
        player.position = grid::nearest_free(&grid::occupied_cells(&self.room), preferred)
            .ok_or(JoinError::RoomFull)?;

        self.room.player_order.push(player.id.clone());
        self.room.players.insert(player.id.clone(), player.clone());
        turns::ensure_turn(&mut self.room);
        info!(
            room_id = %self.room.id,
            player_id = %player.id,
            class = %player.class,
            "player joined"
        );
        Ok(player)
    }

    /// Validates and resolves one action, then appends it to the audit log.
    pub fn apply(&mut self, player_id: &str, action: &Action) -> Result<StepReport, ActionRejection> {
        let round = self.room.state.round;
        let report = match resolver::resolve(&mut self.room, &self.data, player_id, action) {
            Ok(report) => report,
            Err(rejection) => {
                debug!(
                    room_id = %self.room.id,
                    player_id,
                    action = action.tag(),
                    reason = %rejection,
                    "action rejected"
                );
                self.record(player_id, action.tag(), DiagnosticKind::Rejected, rejection.to_string());
                return Err(rejection);
            }
        };

        let result = match &report.outcome {
            Outcome::Applied => "applied".to_string(),
            Outcome::NoEffect(reason) => {
                debug!(
                    room_id = %self.room.id,
                    player_id,
                    action = action.tag(),
                    reason = %reason,
                    "action had no effect"
                );
                self.record(player_id, action.tag(), DiagnosticKind::Ignored, reason.to_string());
                reason.to_string()
            }
        };
        self.push_log(round, player_id, Some(action.clone()), result);
        Ok(report)
    }

    /// Records input refused at the wire boundary, before it became an `Action`.
    pub fn reject_input(&mut self, player_id: &str, detail: &str) -> ActionRejection {
        let rejection = ActionRejection::UnrecognizedInput(detail.to_string());
        self.record(player_id, "unknown", DiagnosticKind::Rejected, rejection.to_string());
        rejection
    }

    /// Disconnect bookkeeping. Returns false if the player was not in the room.
    pub fn disconnect(&mut self, player_id: &str) -> bool {
        if !turns::remove_player(&mut self.room, player_id) {
            return false;
        }
        // The leaver may have been the last one standing.
        encounters::check_terminal(&mut self.room, &self.data);
        info!(room_id = %self.room.id, player_id, "player left");
        true
    }

    /// Skips an idle turn holder. No enemy step runs for a pass.
    pub fn pass_turn(&mut self, player_id: &str) -> bool {
        if self.room.state.winner.is_some() || self.room.state.turn.as_deref() != Some(player_id) {
            return false;
        }
        let round = self.room.state.round;
        turns::advance(&mut self.room);
        self.push_log(round, player_id, None, "turn passed (idle)".to_string());
        true
    }

    // `round` is the round the action was taken in, before any wrap.
    fn push_log(&mut self, round: u32, player_id: &str, action: Option<Action>, result: String) {
        let entry = ActionLogEntry {
            seq: self.room.state.log.len() as u64 + 1,
            round,
            player_id: player_id.to_string(),
            action,
            result,
        };
        self.room.state.log.push(entry);
    }

    fn record(&mut self, player_id: &str, action: &str, kind: DiagnosticKind, reason: String) {
        if self.limits.diagnostics_capacity == 0 {
            return;
        }
        while self.diagnostics.len() >= self.limits.diagnostics_capacity {
            self.diagnostics.pop_front();
        }
        self.diagnostics.push_back(Diagnostic {
            player_id: player_id.to_string(),
            action: action.to_string(),
            kind,
            reason,
        });
    }
}
