// Phase cycle (Setup -> Combat -> Loot -> Shop -> Setup), encounter progression and win/loss detection.

use crate::domain::entities::Player;
use crate::domain::errors::ActionRejection;
use crate::domain::game_data::GameData;
use crate::domain::grid::{self, Position};
use crate::domain::state::{Phase, Room, Winner};
use crate::domain::systems::{Outcome, progression};
use tracing::info;

pub const CHAMPION: &str = "Champion";

/// Side effects of a phase change that the caller must carry out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseEffects {
    pub persist: Vec<Player>,
}

/// Sets `winner` once a terminal condition holds. Clears the encounter when combat is empty.
pub fn check_terminal(room: &mut Room, data: &GameData) {
    if room.state.winner.is_some() {
        return;
    }
    if room.all_players_down() {
        declare(room, Winner::Enemies);
        return;
    }
    if room.state.phase == Phase::Combat && room.state.enemies.is_empty() {
        finish_encounter(room, data);
    }
}

pub fn next_phase(
    room: &mut Room,
    data: &GameData,
    effects: &mut PhaseEffects,
) -> Result<Outcome, ActionRejection> {
    match room.state.phase {
        Phase::Setup => start_encounter(room, data),
        Phase::Combat => {
            if !room.state.enemies.is_empty() {
                return Err(ActionRejection::EnemiesRemain);
            }
            finish_encounter(room, data);
        }
        Phase::Loot => {
            room.state.loot.clear();
            room.state.shop = data.shop.clone();
            room.state.phase = Phase::Shop;
        }
        Phase::Shop => {
            revive_players(room);
            effects.persist = room.ordered_players().cloned().collect();
            room.state.phase = Phase::Setup;
        }
    }
    Ok(Outcome::Applied)
}

fn start_encounter(room: &mut Room, data: &GameData) {
    room.state.enemies = data.catalog().current(room.state.encounter_index);
    scatter_players(room);
    room.state.phase = Phase::Combat;
    info!(
        room_id = %room.id,
        encounter_index = room.state.encounter_index,
        enemies = room.state.enemies.len(),
        "encounter started"
    );
}

/// Places living players on free cells nearest the bottom row, in turn order.
fn scatter_players(room: &mut Room) {
    let mut occupied: std::collections::HashSet<Position> =
        room.state.enemies.iter().map(|e| e.position).collect();
    let order = room.player_order.clone();
    for (slot, id) in order.iter().enumerate() {
        let Some(player) = room.players.get_mut(id).filter(|p| p.is_alive()) else {
            continue;
        };
        let preferred = Position::clamped(grid::GRID_SIZE as i32 - 1, slot as i32);
        if let Some(cell) = grid::nearest_free(&occupied, preferred) {
            player.position = cell;
            occupied.insert(cell);
        }
    }
}

/// Restores every player to full hp. The fallen may be lying under a living
/// player, so each one is re-seated on the nearest free cell when needed.
fn revive_players(room: &mut Room) {
    let mut occupied = grid::occupied_cells(room);
    let order = room.player_order.clone();
    for id in &order {
        let Some(player) = room.players.get_mut(id) else {
            continue;
        };
        if !player.is_alive() && occupied.contains(&player.position) {
            if let Some(cell) = grid::nearest_free(&occupied, player.position) {
                player.position = cell;
            }
        }
        occupied.insert(player.position);
        player.hp = player.max_hp;
    }
}

fn finish_encounter(room: &mut Room, data: &GameData) {
    let index = room.state.encounter_index;
    let Some(template) = data.catalog().template(index) else {
        declare(room, Winner::Players);
        return;
    };

    let living: Vec<String> = room.living_players().map(|p| p.id.clone()).collect();
    for id in &living {
        if let Some(player) = room.players.get_mut(id) {
            player.gold = player.gold.saturating_add(template.gold_reward);
            progression::gain_xp(data, player, template.xp_reward);
        }
    }
    room.state.loot = template.loot.clone();
    info!(room_id = %room.id, encounter = %template.name, "encounter cleared");

    match data.catalog().advance(index) {
        Some(next) => {
            room.state.encounter_index = next;
            room.state.phase = Phase::Loot;
        }
        None => {
            for id in &living {
                if let Some(player) = room.players.get_mut(id) {
                    player.award(CHAMPION);
                }
            }
            declare(room, Winner::Players);
        }
    }
}

fn declare(room: &mut Room, winner: Winner) {
    room.state.winner = Some(winner);
    info!(room_id = %room.id, ?winner, "game over");
}
