// Fixed 6x6 board geometry: coordinates, Manhattan metrics and occupancy.

use crate::domain::state::Room;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Rows and columns both span `0..GRID_SIZE`.
pub const GRID_SIZE: u8 = 6;
const MAX_INDEX: u8 = GRID_SIZE - 1;

/// A single board cell. Value type; compare and copy freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: u8,
    pub col: u8,
}

impl Position {
    /// Builds a position, clamping both axes onto the board.
    pub fn clamped(row: i32, col: i32) -> Self {
        Self {
            row: row.clamp(0, MAX_INDEX as i32) as u8,
            col: col.clamp(0, MAX_INDEX as i32) as u8,
        }
    }

    pub fn in_bounds(&self) -> bool {
        self.row <= MAX_INDEX && self.col <= MAX_INDEX
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

pub fn distance(a: Position, b: Position) -> u32 {
    (a.row.abs_diff(b.row) + a.col.abs_diff(b.col)) as u32
}

pub fn is_adjacent(a: Position, b: Position) -> bool {
    distance(a, b) == 1
}

pub fn in_range(a: Position, b: Position, range: u32) -> bool {
    distance(a, b) <= range
}

/// One step in `direction`, clamped at the board edge.
pub fn step(from: Position, direction: Direction) -> Position {
    let (row, col) = (from.row as i32, from.col as i32);
    match direction {
        Direction::Up => Position::clamped(row - 1, col),
        Direction::Down => Position::clamped(row + 1, col),
        Direction::Left => Position::clamped(row, col - 1),
        Direction::Right => Position::clamped(row, col + 1),
    }
}

/// Cells held by living players and enemies. Dead players never block.
pub fn occupied_cells(room: &Room) -> HashSet<Position> {
    room.players
        .values()
        .filter(|p| p.is_alive())
        .map(|p| p.position)
        .chain(room.state.enemies.iter().map(|e| e.position))
        .collect()
}

/// Free cell closest to `preferred`; ties resolved in row-major order.
pub fn nearest_free(occupied: &HashSet<Position>, preferred: Position) -> Option<Position> {
    let preferred = Position::clamped(preferred.row as i32, preferred.col as i32);
    (0..GRID_SIZE)
        .flat_map(|row| (0..GRID_SIZE).map(move |col| Position { row, col }))
        .filter(|cell| !occupied.contains(cell))
        .min_by_key(|cell| distance(*cell, preferred))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(row: u8, col: u8) -> Position {
        Position { row, col }
    }

    #[test]
    fn when_positions_differ_on_both_axes_then_distance_is_manhattan() {
        assert_eq!(distance(pos(0, 0), pos(3, 2)), 5);
        assert_eq!(distance(pos(4, 1), pos(1, 4)), 6);
        assert!(is_adjacent(pos(2, 2), pos(2, 3)));
        assert!(!is_adjacent(pos(2, 2), pos(3, 3)));
        assert!(in_range(pos(0, 0), pos(1, 2), 3));
        assert!(!in_range(pos(0, 0), pos(2, 2), 3));
    }

    #[test]
    fn when_stepping_off_the_edge_then_position_is_clamped() {
        assert_eq!(step(pos(0, 3), Direction::Up), pos(0, 3));
        assert_eq!(step(pos(5, 5), Direction::Right), pos(5, 5));
        assert_eq!(step(pos(5, 0), Direction::Left), pos(5, 0));
        assert_eq!(step(pos(2, 2), Direction::Down), pos(3, 2));
    }

    #[test]
    fn when_direction_text_is_unknown_then_parse_returns_none() {
        assert_eq!(Direction::parse(" Up "), Some(Direction::Up));
        assert_eq!(Direction::parse("sideways"), None);
    }

    #[test]
    fn when_preferred_cell_is_taken_then_nearest_free_picks_a_neighbor() {
        let occupied = HashSet::from([pos(5, 1)]);
        let found = nearest_free(&occupied, pos(5, 1)).expect("board has space");
        assert_eq!(distance(found, pos(5, 1)), 1);
        assert!(!occupied.contains(&found));
    }

    #[test]
    fn when_board_is_full_then_nearest_free_returns_none() {
        let occupied: HashSet<Position> = (0..GRID_SIZE)
            .flat_map(|row| (0..GRID_SIZE).map(move |col| pos(row, col)))
            .collect();
        assert_eq!(nearest_free(&occupied, pos(0, 0)), None);
    }
}
