// Room and session state plus the immutable snapshot handed to the transport.

use crate::domain::action::Action;
use crate::domain::entities::{Enemy, LootItem, Player, ShopItem};
use crate::domain::grid::{GRID_SIZE, Position};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Setup,
    Combat,
    Loot,
    Shop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Players,
    Enemies,
}

/// One accepted action (or turn pass) in the append-only audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLogEntry {
    pub seq: u64,
    pub round: u32,
    pub player_id: String,
    // `None` records an idle turn pass.
    pub action: Option<Action>,
    pub result: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub turn: Option<String>,
    pub phase: Phase,
    pub enemies: Vec<Enemy>,
    pub shop: Vec<ShopItem>,
    pub loot: Vec<LootItem>,
    pub encounter_index: usize,
    pub round: u32,
    pub winner: Option<Winner>,
    pub log: Vec<ActionLogEntry>,
}

impl SessionState {
    pub fn new(shop: Vec<ShopItem>) -> Self {
        Self {
            turn: None,
            phase: Phase::Setup,
            enemies: Vec::new(),
            shop,
            loot: Vec::new(),
            encounter_index: 0,
            round: 1,
            winner: None,
            log: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    // Turn rotation order.
    pub player_order: Vec<String>,
    pub players: HashMap<String, Player>,
    pub state: SessionState,
}

impl Room {
    pub fn new(id: impl Into<String>, shop: Vec<ShopItem>) -> Self {
        Self {
            id: id.into(),
            player_order: Vec::new(),
            players: HashMap::new(),
            state: SessionState::new(shop),
        }
    }

    /// Players in turn order.
    pub fn ordered_players(&self) -> impl Iterator<Item = &Player> {
        self.player_order
            .iter()
            .filter_map(|id| self.players.get(id))
    }

    pub fn living_players(&self) -> impl Iterator<Item = &Player> {
        self.ordered_players().filter(|p| p.is_alive())
    }

    /// True only when at least one player exists and every one of them is down.
    pub fn all_players_down(&self) -> bool {
        !self.players.is_empty() && self.players.values().all(|p| !p.is_alive())
    }

    pub fn enemy_index(&self, name: &str) -> Option<usize> {
        self.state.enemies.iter().position(|e| e.name == name)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let mut grid = vec![vec![None; GRID_SIZE as usize]; GRID_SIZE as usize];
        let mut place = |position: Position, label: &str| {
            if let Some(cell) = grid
                .get_mut(position.row as usize)
                .and_then(|row| row.get_mut(position.col as usize))
            {
                *cell = Some(label.to_string());
            }
        };
        for player in self.living_players() {
            place(player.position, &player.id);
        }
        for enemy in &self.state.enemies {
            place(enemy.position, &enemy.name);
        }

        SessionSnapshot {
            room_id: self.id.clone(),
            players: self.ordered_players().cloned().collect(),
            player_order: self.player_order.clone(),
            turn: self.state.turn.clone(),
            phase: self.state.phase,
            grid,
            enemies: self.state.enemies.clone(),
            shop: self.state.shop.clone(),
            loot: self.state.loot.clone(),
            encounter_index: self.state.encounter_index,
            round: self.state.round,
            winner: self.state.winner,
            last_action: self.state.log.last().cloned(),
        }
    }
}

/// Immutable view of a room after an accepted change.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub room_id: String,
    pub players: Vec<Player>,
    pub player_order: Vec<String>,
    pub turn: Option<String>,
    pub phase: Phase,
    // Occupant label per cell, row-major.
    pub grid: Vec<Vec<Option<String>>>,
    pub enemies: Vec<Enemy>,
    pub shop: Vec<ShopItem>,
    pub loot: Vec<LootItem>,
    pub encounter_index: usize,
    pub round: u32,
    pub winner: Option<Winner>,
    pub last_action: Option<ActionLogEntry>,
}
