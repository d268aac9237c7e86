// Domain records for everything that lives inside a room.

use crate::domain::grid::Position;
use serde::{Deserialize, Serialize};

/// Core attribute block. Serialized with the short tabletop names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    #[serde(rename = "Str")]
    pub strength: i32,
    #[serde(rename = "Con")]
    pub constitution: i32,
    #[serde(rename = "Wis")]
    pub wisdom: i32,
    #[serde(rename = "Int")]
    pub intelligence: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub class: String,
    pub subclass: String,
    pub level: u32,
    pub xp: u32,
    pub attributes: Attributes,
    // Zero or below means dead.
    pub hp: i32,
    pub max_hp: i32,
    pub position: Position,
    pub gold: u32,
    // Ordered, duplicates allowed.
    pub inventory: Vec<String>,
    // Set semantics, insertion order kept for display.
    pub spells: Vec<String>,
    pub weapon: String,
    #[serde(default)]
    pub passives: Vec<String>,
    #[serde(default)]
    pub statuses: Vec<String>,
    #[serde(default)]
    pub achievements: Vec<String>,
    // Save slot this character persists into.
    pub save_slot: String,
}

impl Player {
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn knows_spell(&self, spell: &str) -> bool {
        self.spells.iter().any(|s| s == spell)
    }

    /// Returns false when the spell was already known.
    pub fn learn_spell(&mut self, spell: &str) -> bool {
        push_unique(&mut self.spells, spell)
    }

    pub fn add_status(&mut self, tag: &str) -> bool {
        push_unique(&mut self.statuses, tag)
    }

    pub fn add_passive(&mut self, passive: &str) -> bool {
        push_unique(&mut self.passives, passive)
    }

    pub fn award(&mut self, achievement: &str) -> bool {
        push_unique(&mut self.achievements, achievement)
    }

    pub fn has_item(&self, item: &str) -> bool {
        self.inventory.iter().any(|i| i == item)
    }

    /// Removes one instance of `item`, keeping the order of the rest.
    pub fn take_item(&mut self, item: &str) -> bool {
        match self.inventory.iter().position(|i| i == item) {
            Some(index) => {
                self.inventory.remove(index);
                true
            }
            None => false,
        }
    }

    /// Restores up to `amount` hit points without passing max. Returns the amount healed.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.hp;
        self.hp = (self.hp + amount.max(0)).min(self.max_hp).max(before);
        self.hp - before
    }
}

fn push_unique(set: &mut Vec<String>, value: &str) -> bool {
    if set.iter().any(|v| v == value) {
        return false;
    }
    set.push(value.to_string());
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enemy {
    // Unique within the current encounter.
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub hp: i32,
    pub max_hp: i32,
    pub attack: i32,
    pub armor: i32,
    pub position: Position,
}

impl Enemy {
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopItem {
    pub name: String,
    pub price: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LootItem {
    pub name: String,
    #[serde(default)]
    pub value: u32,
}

/// Catalog template: the enemies of one fight plus its rewards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encounter {
    pub name: String,
    pub enemies: Vec<Enemy>,
    #[serde(default)]
    pub xp_reward: u32,
    #[serde(default)]
    pub gold_reward: u32,
    #[serde(default)]
    pub loot: Vec<LootItem>,
}
