// Player-initiated combat: melee and spells.

use crate::domain::action::SpellTarget;
use crate::domain::errors::{ActionRejection, NoEffect};
use crate::domain::game_data::{GameData, SpellEffect};
use crate::domain::grid::{self, Position};
use crate::domain::state::Room;
use crate::domain::systems::Outcome;
use tracing::debug;

pub const MELEE_DAMAGE: i32 = 3;
pub const FIRST_BLOOD: &str = "First Blood";

pub fn attack(room: &mut Room, actor_id: &str, target: &str) -> Result<Outcome, ActionRejection> {
    let origin = actor_position(room, actor_id)?;
    let index = room
        .enemy_index(target)
        .ok_or(ActionRejection::TargetNotFound)?;
    if !grid::is_adjacent(origin, room.state.enemies[index].position) {
        return Err(ActionRejection::OutOfRange);
    }

    damage_enemies(room, actor_id, &[index], MELEE_DAMAGE);
    Ok(Outcome::Applied)
}

pub fn cast_spell(
    room: &mut Room,
    data: &GameData,
    actor_id: &str,
    spell: &str,
    target: &SpellTarget,
) -> Result<Outcome, ActionRejection> {
    let origin = actor_position(room, actor_id)?;
    let Some(effect) = data.spell_effect(spell) else {
        return Ok(Outcome::NoEffect(NoEffect::UnknownSpell(spell.to_string())));
    };
    let knows = room
        .players
        .get(actor_id)
        .is_some_and(|p| p.knows_spell(spell));
    if !knows {
        return Err(ActionRejection::SpellNotKnown);
    }
    let range = data.spell_range(spell);

    match (effect, target) {
        (SpellEffect::Area { damage, radius }, SpellTarget::Enemy(name)) => {
            let center = enemy_in_range(room, origin, name, range)?;
            // Single hop: the target plus everything within `radius` of it.
            let hit: Vec<usize> = room
                .state
                .enemies
                .iter()
                .enumerate()
                .filter(|(_, e)| grid::in_range(center, e.position, radius))
                .map(|(i, _)| i)
                .collect();
            damage_enemies(room, actor_id, &hit, damage);
            Ok(Outcome::Applied)
        }
        (SpellEffect::Damage { amount }, SpellTarget::Enemy(name)) => {
            enemy_in_range(room, origin, name, range)?;
            let index = room
                .enemy_index(name)
                .ok_or(ActionRejection::TargetNotFound)?;
            damage_enemies(room, actor_id, &[index], amount);
            Ok(Outcome::Applied)
        }
        (SpellEffect::Heal { amount }, SpellTarget::Player(target_id)) => {
            let target = room
                .players
                .get_mut(target_id)
                .filter(|p| p.is_alive())
                .ok_or(ActionRejection::TargetNotFound)?;
            if !grid::in_range(origin, target.position, range) {
                return Err(ActionRejection::OutOfRange);
            }
            let healed = target.heal(amount);
            debug!(caster = actor_id, target = %target_id, healed, "heal");
            Ok(Outcome::Applied)
        }
        _ => Err(ActionRejection::InvalidTarget),
    }
}

fn actor_position(room: &Room, actor_id: &str) -> Result<Position, ActionRejection> {
    room.players
        .get(actor_id)
        .map(|p| p.position)
        .ok_or(ActionRejection::UnknownPlayer)
}

fn enemy_in_range(
    room: &Room,
    origin: Position,
    name: &str,
    range: u32,
) -> Result<Position, ActionRejection> {
    let enemy = room
        .state
        .enemies
        .iter()
        .find(|e| e.name == name)
        .ok_or(ActionRejection::TargetNotFound)?;
    if !grid::in_range(origin, enemy.position, range) {
        return Err(ActionRejection::OutOfRange);
    }
    Ok(enemy.position)
}

/// Applies `amount` to each listed enemy and drops the dead ones from the active set.
fn damage_enemies(room: &mut Room, actor_id: &str, indices: &[usize], amount: i32) {
    let mut kills = 0;
    for &index in indices {
        if let Some(enemy) = room.state.enemies.get_mut(index) {
            enemy.hp -= amount;
            debug!(
                attacker = actor_id,
                enemy = %enemy.name,
                enemy_hp = enemy.hp,
                "enemy hit"
            );
            if !enemy.is_alive() {
                kills += 1;
            }
        }
    }

    if kills > 0 {
        room.state.enemies.retain(|e| e.is_alive());
        if let Some(actor) = room.players.get_mut(actor_id) {
            actor.award(FIRST_BLOOD);
        }
    }
}
