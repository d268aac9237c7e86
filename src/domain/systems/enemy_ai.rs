// Enemy turn: each enemy attacks the nearest adjacent player or takes one greedy step.

use crate::domain::grid::{self, Position};
use crate::domain::state::Room;
use tracing::debug;

/// Runs one decision for every enemy, in catalog order.
///
/// Movement is myopic on purpose: close the row gap first, then the column gap, and stay put
/// if that single cell is taken. There is no pathfinding around obstacles.
pub fn enemy_step(room: &mut Room) {
    for index in 0..room.state.enemies.len() {
        let enemy_pos = room.state.enemies[index].position;
        let Some((target_id, target_pos)) = nearest_player(room, enemy_pos) else {
            return;
        };

        if grid::is_adjacent(enemy_pos, target_pos) {
            let damage = room.state.enemies[index].attack;
            if let Some(player) = room.players.get_mut(&target_id) {
                player.hp -= damage;
                debug!(
                    enemy = %room.state.enemies[index].name,
                    player_id = %target_id,
                    player_hp = player.hp,
                    "enemy attack"
                );
            }
            continue;
        }

        let next = step_toward(enemy_pos, target_pos);
        if !grid::occupied_cells(room).contains(&next) {
            room.state.enemies[index].position = next;
        }
    }
}

/// Closest living player by Manhattan distance; the earlier entry in turn order wins ties.
fn nearest_player(room: &Room, from: Position) -> Option<(String, Position)> {
    let mut best: Option<(u32, &str, Position)> = None;
    for player in room.living_players() {
        let d = grid::distance(from, player.position);
        if best.is_none_or(|(bd, _, _)| d < bd) {
            best = Some((d, player.id.as_str(), player.position));
        }
    }
    best.map(|(_, id, pos)| (id.to_string(), pos))
}

fn step_toward(from: Position, to: Position) -> Position {
    let toward = |a: u8, b: u8| -> i32 {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => a as i32 + 1,
            std::cmp::Ordering::Greater => a as i32 - 1,
            std::cmp::Ordering::Equal => a as i32,
        }
    };
    if from.row != to.row {
        Position::clamped(toward(from.row, to.row), from.col as i32)
    } else {
        Position::clamped(from.row as i32, toward(from.col, to.col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::fixtures::{enemy, player};

    fn room() -> Room {
        let mut room = Room::new("r", Vec::new());
        room.player_order = vec!["a".into(), "b".into()];
        room.players.insert("a".into(), player("a", 5, 0));
        room.players.insert("b".into(), player("b", 5, 4));
        room
    }

    #[test]
    fn when_enemy_is_adjacent_then_it_attacks() {
        let mut room = room();
        room.state.enemies.push(enemy("Goblin", 6, 4, 0));
        enemy_step(&mut room);
        assert_eq!(room.players["a"].hp, 8);
        assert_eq!(room.state.enemies[0].position, Position { row: 4, col: 0 });
    }

    #[test]
    fn when_enemy_is_far_then_it_closes_the_row_gap_first() {
        let mut room = room();
        room.state.enemies.push(enemy("Goblin", 6, 0, 3));
        enemy_step(&mut room);
        // b at (5,4) is at distance 6, a at (5,0) at distance 8.
        assert_eq!(room.state.enemies[0].position, Position { row: 1, col: 3 });
    }

    #[test]
    fn when_rows_match_then_enemy_moves_along_the_column() {
        let mut room = room();
        room.state.enemies.push(enemy("Goblin", 6, 5, 2));
        room.players.get_mut("b").expect("b").hp = 0;
        enemy_step(&mut room);
        assert_eq!(room.state.enemies[0].position, Position { row: 5, col: 1 });
    }

    #[test]
    fn when_players_are_equidistant_then_first_in_order_is_targeted() {
        let mut room = room();
        room.players.get_mut("a").expect("a").position = Position { row: 2, col: 1 };
        room.players.get_mut("b").expect("b").position = Position { row: 2, col: 3 };
        room.state.enemies.push(enemy("Goblin", 6, 2, 2));
        enemy_step(&mut room);
        assert_eq!(room.players["a"].hp, 8);
        assert_eq!(room.players["b"].hp, 10);
    }

    #[test]
    fn when_next_cell_is_occupied_then_enemy_stays_put() {
        let mut room = room();
        room.state.enemies.push(enemy("Front", 6, 3, 0));
        room.state.enemies.push(enemy("Back", 6, 2, 0));
        room.players.get_mut("b").expect("b").hp = 0;
        enemy_step(&mut room);
        assert_eq!(room.state.enemies[0].position, Position { row: 4, col: 0 });
        assert_eq!(room.state.enemies[1].position, Position { row: 3, col: 0 });
    }

    #[test]
    fn when_blocked_by_another_enemy_then_no_detour_is_taken() {
        let mut room = room();
        room.players.get_mut("b").expect("b").hp = 0;
        room.state.enemies.push(enemy("Wall", 6, 4, 0));
        room.state.enemies.push(enemy("Stuck", 6, 3, 0));
        enemy_step(&mut room);
        assert_eq!(room.players["a"].hp, 8);
        assert_eq!(room.state.enemies[1].position, Position { row: 3, col: 0 });
    }

    #[test]
    fn when_no_player_is_alive_then_enemies_do_nothing() {
        let mut room = room();
        for p in room.players.values_mut() {
            p.hp = 0;
        }
        room.state.enemies.push(enemy("Goblin", 6, 0, 0));
        enemy_step(&mut room);
        assert_eq!(room.state.enemies[0].position, Position { row: 0, col: 0 });
    }
}
