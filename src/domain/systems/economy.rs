// Shop, trade, item use and loot claims. Gold never goes below zero.

use crate::domain::errors::{ActionRejection, NoEffect};
use crate::domain::game_data::{GameData, ItemEffect};
use crate::domain::state::{Phase, Room};
use crate::domain::systems::Outcome;

/// Paid for items the shop does not list.
pub const SELL_FALLBACK_PRICE: u32 = 1;

pub fn buy(room: &mut Room, actor_id: &str, item: &str) -> Result<Outcome, ActionRejection> {
    let price = room
        .state
        .shop
        .iter()
        .find(|s| s.name == item)
        .map(|s| s.price)
        .ok_or(ActionRejection::ItemNotListed)?;
    let actor = room
        .players
        .get_mut(actor_id)
        .ok_or(ActionRejection::UnknownPlayer)?;
    let Some(remaining) = actor.gold.checked_sub(price) else {
        return Err(ActionRejection::InsufficientGold);
    };
    actor.gold = remaining;
    actor.inventory.push(item.to_string());
    Ok(Outcome::Applied)
}

pub fn sell(room: &mut Room, actor_id: &str, item: &str) -> Result<Outcome, ActionRejection> {
    let price = room
        .state
        .shop
        .iter()
        .find(|s| s.name == item)
        .map(|s| s.price / 2)
        .unwrap_or(SELL_FALLBACK_PRICE);
    let actor = room
        .players
        .get_mut(actor_id)
        .ok_or(ActionRejection::UnknownPlayer)?;
    if !actor.take_item(item) {
        return Err(ActionRejection::ItemNotInInventory);
    }
    actor.gold = actor.gold.saturating_add(price);
    Ok(Outcome::Applied)
}

pub fn trade(
    room: &mut Room,
    actor_id: &str,
    item: &str,
    to_player: &str,
) -> Result<Outcome, ActionRejection> {
    check_recipient(room, actor_id, to_player)?;
    let actor = room
        .players
        .get_mut(actor_id)
        .ok_or(ActionRejection::UnknownPlayer)?;
    if !actor.take_item(item) {
        return Err(ActionRejection::ItemNotInInventory);
    }
    if let Some(recipient) = room.players.get_mut(to_player) {
        recipient.inventory.push(item.to_string());
    }
    Ok(Outcome::Applied)
}

pub fn give_gold(
    room: &mut Room,
    actor_id: &str,
    amount: u32,
    to_player: &str,
) -> Result<Outcome, ActionRejection> {
    if amount == 0 {
        return Err(ActionRejection::InvalidAmount);
    }
    check_recipient(room, actor_id, to_player)?;
    // Balance is checked against the sender only, before either side changes.
    let actor = room
        .players
        .get_mut(actor_id)
        .ok_or(ActionRejection::UnknownPlayer)?;
    let Some(remaining) = actor.gold.checked_sub(amount) else {
        return Err(ActionRejection::InsufficientGold);
    };
    actor.gold = remaining;
    if let Some(recipient) = room.players.get_mut(to_player) {
        recipient.gold = recipient.gold.saturating_add(amount);
    }
    Ok(Outcome::Applied)
}

/// Consumes one matching entry. Unknown items are still consumed, with no effect.
pub fn use_item(
    room: &mut Room,
    data: &GameData,
    actor_id: &str,
    item: &str,
) -> Result<Outcome, ActionRejection> {
    let actor = room
        .players
        .get_mut(actor_id)
        .ok_or(ActionRejection::UnknownPlayer)?;
    if !actor.take_item(item) {
        return Err(ActionRejection::ItemNotInInventory);
    }
    match data.item_effect(item) {
        Some(ItemEffect::Heal { amount }) => {
            actor.heal(amount);
            Ok(Outcome::Applied)
        }
        None => Ok(Outcome::NoEffect(NoEffect::UnknownItem(item.to_string()))),
    }
}

pub fn claim_loot(room: &mut Room, actor_id: &str, item: &str) -> Result<Outcome, ActionRejection> {
    if room.state.phase != Phase::Loot {
        return Err(ActionRejection::WrongPhase);
    }
    let index = room
        .state
        .loot
        .iter()
        .position(|l| l.name == item)
        .ok_or(ActionRejection::LootNotFound)?;
    let actor = room
        .players
        .get_mut(actor_id)
        .ok_or(ActionRejection::UnknownPlayer)?;
    let loot = room.state.loot.remove(index);
    actor.inventory.push(loot.name);
    Ok(Outcome::Applied)
}

fn check_recipient(room: &Room, actor_id: &str, to_player: &str) -> Result<(), ActionRejection> {
    if actor_id == to_player {
        return Err(ActionRejection::InvalidTarget);
    }
    if !room.players.contains_key(to_player) {
        return Err(ActionRejection::TargetNotFound);
    }
    Ok(())
}
