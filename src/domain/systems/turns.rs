// Turn ownership: rotation through `player_order`, skipping the fallen, and disconnect bookkeeping.

use crate::domain::state::Room;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnAdvance {
    pub next: Option<String>,
    // Rotation passed the end of the order.
    pub wrapped: bool,
}

/// Next living entry after `current`, cyclically. Falls back to the plain next entry
/// when nobody is alive, and to `None` when the order is empty.
pub fn next_turn(room: &Room, current: Option<&str>) -> TurnAdvance {
    let order = &room.player_order;
    if order.is_empty() {
        return TurnAdvance {
            next: None,
            wrapped: false,
        };
    }

    let len = order.len();
    // Unknown or missing current: start scanning from the first entry.
    let start = current
        .and_then(|id| order.iter().position(|p| p == id))
        .unwrap_or(len - 1);

    let alive = |id: &String| room.players.get(id).is_some_and(|p| p.is_alive());
    let pick = (1..=len)
        .map(|offset| (start + offset) % len)
        .find(|&index| alive(&order[index]))
        .unwrap_or((start + 1) % len);

    TurnAdvance {
        next: Some(order[pick].clone()),
        wrapped: pick <= start,
    }
}

/// Moves the turn on from its current holder and bumps the round on wrap-around.
pub fn advance(room: &mut Room) {
    let step = next_turn(room, room.state.turn.as_deref());
    if step.wrapped {
        room.state.round += 1;
    }
    room.state.turn = step.next;
}

/// Hands the turn to the first joiner when nobody holds it.
pub fn ensure_turn(room: &mut Room) {
    if room.state.turn.is_none() {
        room.state.turn = first_holder(room);
    }
}

/// Removes a player from the order and the roster. Returns false for unknown players.
pub fn remove_player(room: &mut Room, player_id: &str) -> bool {
    let before = room.player_order.len();
    room.player_order.retain(|id| id != player_id);
    let removed_from_roster = room.players.remove(player_id).is_some();
    if before == room.player_order.len() && !removed_from_roster {
        return false;
    }

    if room.state.turn.as_deref() == Some(player_id) {
        room.state.turn = first_holder(room);
    }
    true
}

fn first_holder(room: &Room) -> Option<String> {
    room.living_players()
        .next()
        .map(|p| p.id.clone())
        .or_else(|| room.player_order.first().cloned())
}
