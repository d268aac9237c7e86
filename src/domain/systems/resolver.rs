// One player action end to end: validate, dispatch, terminal check, enemy step, turn advance.

use crate::domain::action::Action;
use crate::domain::entities::Player;
use crate::domain::errors::ActionRejection;
use crate::domain::game_data::GameData;
use crate::domain::state::Room;
use crate::domain::systems::encounters::{self, PhaseEffects};
use crate::domain::systems::{Outcome, combat, economy, enemy_ai, movement, progression, turns};

/// What an accepted action did, plus follow-up work for the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub outcome: Outcome,
    // Characters to hand to the persistence collaborator.
    pub persist: Vec<Player>,
}

/// Applies `action` for `player_id`. Rejections leave `room` untouched.
pub fn resolve(
    room: &mut Room,
    data: &GameData,
    player_id: &str,
    action: &Action,
) -> Result<StepReport, ActionRejection> {
    if room.state.winner.is_some() {
        return Err(ActionRejection::GameOver);
    }
    if room.state.turn.as_deref() != Some(player_id) {
        return Err(ActionRejection::NotYourTurn);
    }
    let actor = room
        .players
        .get(player_id)
        .ok_or(ActionRejection::UnknownPlayer)?;
    if !actor.is_alive() {
        return Err(ActionRejection::ActorDown);
    }

    let mut effects = PhaseEffects::default();
    let outcome = match action {
        Action::Move { direction } => movement::move_player(room, player_id, *direction),
        Action::Attack { target } => combat::attack(room, player_id, target),
        Action::Spell { name, target } => combat::cast_spell(room, data, player_id, name, target),
        Action::UseItem { item } => economy::use_item(room, data, player_id, item),
        Action::Trade { item, to_player } => economy::trade(room, player_id, item, to_player),
        Action::GiveGold { amount, to_player } => {
            economy::give_gold(room, player_id, *amount, to_player)
        }
        Action::Buy { item } => economy::buy(room, player_id, item),
        Action::Sell { item } => economy::sell(room, player_id, item),
        Action::GainXp { amount } => gain_xp(room, data, player_id, *amount),
        Action::ApplyStatus { tag } => apply_status(room, player_id, tag),
        Action::ClaimLoot { item } => economy::claim_loot(room, player_id, item),
        Action::NextPhase => encounters::next_phase(room, data, &mut effects),
    }?;

    encounters::check_terminal(room, data);
    if room.state.winner.is_none() {
        enemy_ai::enemy_step(room);
        encounters::check_terminal(room, data);
    }
    if room.state.winner.is_none() {
        turns::advance(room);
    }

    Ok(StepReport {
        outcome,
        persist: effects.persist,
    })
}

fn gain_xp(
    room: &mut Room,
    data: &GameData,
    player_id: &str,
    amount: u32,
) -> Result<Outcome, ActionRejection> {
    if amount == 0 {
        return Err(ActionRejection::InvalidAmount);
    }
    let player = room
        .players
        .get_mut(player_id)
        .ok_or(ActionRejection::UnknownPlayer)?;
    progression::gain_xp(data, player, amount);
    Ok(Outcome::Applied)
}

// No expiry is modeled; tags stay until the character is replaced.
fn apply_status(room: &mut Room, player_id: &str, tag: &str) -> Result<Outcome, ActionRejection> {
    let player = room
        .players
        .get_mut(player_id)
        .ok_or(ActionRejection::UnknownPlayer)?;
    player.add_status(tag);
    Ok(Outcome::Applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::fixtures::{enemy, player};
    use crate::domain::grid::{self, Direction, Position};
    use crate::domain::state::{Phase, Winner};

    fn data() -> GameData {
        GameData::embedded().expect("embedded data")
    }

    /// Two players flanking a lone 10 hp enemy on the last encounter of combat.
    fn duel_room(data: &GameData, encounter_index: usize) -> Room {
        let mut room = Room::new("r", data.shop.clone());
        room.player_order = vec!["a".into(), "b".into()];
        room.players.insert("a".into(), player("a", 2, 1));
        room.players.insert("b".into(), player("b", 2, 3));
        room.state.turn = Some("a".into());
        room.state.phase = Phase::Combat;
        room.state.encounter_index = encounter_index;
        let mut ogre = enemy("Ogre", 10, 2, 2);
        ogre.attack = 1;
        room.state.enemies.push(ogre);
        room
    }

    fn ogre_hp(room: &Room) -> Option<i32> {
        room.state.enemies.iter().find(|e| e.name == "Ogre").map(|e| e.hp)
    }

    #[test]
    fn when_not_your_turn_then_action_is_rejected_without_mutation() {
        let data = data();
        let mut room = duel_room(&data, 0);
        let before = room.clone();
        assert_eq!(
            resolve(&mut room, &data, "b", &Action::Attack { target: "Ogre".into() }),
            Err(ActionRejection::NotYourTurn)
        );
        assert_eq!(room, before);
    }

    #[test]
    fn when_game_is_over_then_every_action_is_rejected() {
        let data = data();
        let mut room = duel_room(&data, 0);
        room.state.winner = Some(Winner::Enemies);
        let before = room.clone();
        assert_eq!(
            resolve(&mut room, &data, "a", &Action::NextPhase),
            Err(ActionRejection::GameOver)
        );
        assert_eq!(room, before);
    }

    #[test]
    fn when_players_take_turns_attacking_then_enemy_dies_on_fourth_hit() {
        let data = data();
        let mut room = duel_room(&data, 0);
        let attack = Action::Attack {
            target: "Ogre".into(),
        };

        resolve(&mut room, &data, "a", &attack).expect("a attacks");
        assert_eq!(ogre_hp(&room), Some(7));
        assert_eq!(room.state.turn.as_deref(), Some("b"));

        resolve(&mut room, &data, "b", &attack).expect("b attacks");
        assert_eq!(ogre_hp(&room), Some(4));

        resolve(&mut room, &data, "a", &attack).expect("a attacks again");
        assert_eq!(ogre_hp(&room), Some(1));
        assert_eq!(room.state.encounter_index, 0);

        resolve(&mut room, &data, "b", &attack).expect("kill shot");
        assert_eq!(ogre_hp(&room), None);
        assert_eq!(room.state.encounter_index, 1);
        assert_eq!(room.state.phase, Phase::Loot);
        assert_eq!(room.state.winner, None);
    }

    #[test]
    fn when_final_encounter_falls_then_players_win_and_turn_freezes() {
        let data = data();
        let last = data.catalog().len() - 1;
        let mut room = duel_room(&data, last);
        room.state.enemies[0].hp = 3;
        resolve(&mut room, &data, "a", &Action::Attack { target: "Ogre".into() })
            .expect("kill shot");
        assert_eq!(room.state.winner, Some(Winner::Players));
        assert_eq!(room.state.turn.as_deref(), Some("a"));
        assert_eq!(
            resolve(&mut room, &data, "a", &Action::NextPhase),
            Err(ActionRejection::GameOver)
        );
    }

    #[test]
    fn when_enemies_kill_everyone_then_enemies_win() {
        let data = data();
        let mut room = duel_room(&data, 0);
        room.state.enemies[0].attack = 50;
        room.players.get_mut("b").expect("b").hp = 0;
        resolve(&mut room, &data, "a", &Action::ApplyStatus { tag: "blessed".into() })
            .expect("accepted");
        assert_eq!(room.state.winner, Some(Winner::Enemies));
        let frozen = room.clone();
        assert_eq!(
            resolve(&mut room, &data, "a", &Action::GainXp { amount: 5 }),
            Err(ActionRejection::GameOver)
        );
        assert_eq!(room, frozen);
    }

    #[test]
    fn when_action_is_accepted_then_enemy_acts_before_turn_passes() {
        let data = data();
        let mut room = duel_room(&data, 0);
        resolve(
            &mut room,
            &data,
            "a",
            &Action::Move {
                direction: Direction::Up,
            },
        )
        .expect("accepted");
        assert_eq!(room.players["a"].position, Position { row: 1, col: 1 });
        // a stepped away, so b is now the nearest target.
        assert_eq!(room.players["b"].hp, 9);
        assert_eq!(room.state.turn.as_deref(), Some("b"));
    }

    #[test]
    fn when_gaining_xp_across_threshold_then_excess_is_discarded() {
        let data = data();
        let mut room = duel_room(&data, 0);
        room.state.phase = Phase::Setup;
        room.state.enemies.clear();
        room.players.get_mut("a").expect("a").xp = 95;
        resolve(&mut room, &data, "a", &Action::GainXp { amount: 10 }).expect("accepted");
        let a = &room.players["a"];
        assert_eq!((a.level, a.xp), (2, 0));
        assert_eq!(a.attributes.strength, 4);
        assert_eq!(a.attributes.constitution, 3);
    }

    #[test]
    fn when_shop_phase_ends_then_report_asks_to_persist_everyone() {
        let data = data();
        let mut room = duel_room(&data, 1);
        room.state.phase = Phase::Shop;
        room.state.enemies.clear();
        let report = resolve(&mut room, &data, "a", &Action::NextPhase).expect("accepted");
        assert_eq!(report.persist.len(), 2);
        assert_eq!(room.state.phase, Phase::Setup);
    }

    #[test]
    fn when_a_full_cycle_runs_then_no_two_living_entities_share_a_cell() {
        let data = data();
        let mut room = Room::new("r", data.shop.clone());
        room.player_order = vec!["a".into(), "b".into()];
        room.players.insert("a".into(), player("a", 5, 1));
        room.players.insert("b".into(), player("b", 5, 2));
        room.state.turn = Some("a".into());

        resolve(&mut room, &data, "a", &Action::NextPhase).expect("combat starts");
        let moves = [Direction::Up, Direction::Right, Direction::Up, Direction::Left];
        for step in 0..12 {
            let Some(turn) = room.state.turn.clone() else {
                break;
            };
            if room.state.winner.is_some() {
                break;
            }
            let action = Action::Move {
                direction: moves[step % moves.len()],
            };
            resolve(&mut room, &data, &turn, &action).expect("move accepted");

            let living = room.living_players().count() + room.state.enemies.len();
            assert_eq!(grid::occupied_cells(&room).len(), living);
        }
    }
}
