use crate::domain::errors::{ActionRejection, NoEffect};
use crate::domain::grid::{self, Direction};
use crate::domain::state::Room;
use crate::domain::systems::Outcome;

/// One clamped step. Edges and occupied cells leave the player in place.
pub fn move_player(
    room: &mut Room,
    player_id: &str,
    direction: Direction,
) -> Result<Outcome, ActionRejection> {
    let from = room
        .players
        .get(player_id)
        .map(|p| p.position)
        .ok_or(ActionRejection::UnknownPlayer)?;

    let to = grid::step(from, direction);
    if to == from || grid::occupied_cells(room).contains(&to) {
        return Ok(Outcome::NoEffect(NoEffect::Blocked));
    }

    if let Some(player) = room.players.get_mut(player_id) {
        player.position = to;
    }
    Ok(Outcome::Applied)
}
