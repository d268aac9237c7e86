// Static, read-only game tables: class progression, spells, items, shop stock and encounters.

use crate::domain::catalog::EncounterCatalog;
use crate::domain::entities::{Attributes, ShopItem};
use crate::domain::errors::GameDataError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

const EMBEDDED_GAME_DATA: &str = include_str!("../../data/game_data.json");

/// Range used for spells missing from the spell table.
pub const DEFAULT_SPELL_RANGE: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockKind {
    Spell,
    Weapon,
    Passive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unlock {
    pub level: u32,
    pub kind: UnlockKind,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassData {
    pub subclasses: Vec<String>,
    pub base_hp: i32,
    pub attributes: Attributes,
    pub starting_weapon: String,
    #[serde(default)]
    pub starting_spells: Vec<String>,
    #[serde(default)]
    pub starting_gold: u32,
    #[serde(default)]
    pub starting_items: Vec<String>,
    // Learned on every level-up until known.
    #[serde(default)]
    pub level_up_spell: Option<String>,
    #[serde(default)]
    pub unlocks: Vec<Unlock>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpellEffect {
    Area { damage: i32, radius: u32 },
    Damage { amount: i32 },
    Heal { amount: i32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellData {
    pub range: u32,
    #[serde(default)]
    pub effect: Option<SpellEffect>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemEffect {
    Heal { amount: i32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemData {
    pub effect: ItemEffect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameData {
    pub classes: BTreeMap<String, ClassData>,
    #[serde(default)]
    pub spells: BTreeMap<String, SpellData>,
    #[serde(default)]
    pub items: BTreeMap<String, ItemData>,
    #[serde(default)]
    pub shop: Vec<ShopItem>,
    pub encounters: EncounterCatalog,
}

impl GameData {
    /// Tables compiled into the binary.
    pub fn embedded() -> Result<Self, GameDataError> {
        Self::from_json_str(EMBEDDED_GAME_DATA)
    }

    /// Reads an override file, falling back to the embedded tables when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, GameDataError> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(GameDataError::Read)?;
                Self::from_json_str(&raw)
            }
            None => Self::embedded(),
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, GameDataError> {
        let data: GameData = serde_json::from_str(raw).map_err(GameDataError::Parse)?;
        data.validate()?;
        Ok(data)
    }

    fn validate(&self) -> Result<(), GameDataError> {
        if self.encounters.is_empty() {
            return Err(GameDataError::Invalid("no encounters defined".into()));
        }
        for encounter in self.encounters.iter() {
            let mut names = HashSet::new();
            let mut cells = HashSet::new();
            for enemy in &encounter.enemies {
                if !names.insert(enemy.name.as_str()) {
                    return Err(GameDataError::Invalid(format!(
                        "duplicate enemy {:?} in {:?}",
                        enemy.name, encounter.name
                    )));
                }
                if !enemy.position.in_bounds() || !cells.insert(enemy.position) {
                    return Err(GameDataError::Invalid(format!(
                        "bad position for {:?} in {:?}",
                        enemy.name, encounter.name
                    )));
                }
            }
        }
        for (name, class) in &self.classes {
            if class.subclasses.is_empty() {
                return Err(GameDataError::Invalid(format!(
                    "class {name:?} has no subclasses"
                )));
            }
        }
        Ok(())
    }

    pub fn class(&self, name: &str) -> Option<&ClassData> {
        self.classes.get(name)
    }

    pub fn spell_range(&self, spell: &str) -> u32 {
        self.spells
            .get(spell)
            .map(|s| s.range)
            .unwrap_or(DEFAULT_SPELL_RANGE)
    }

    pub fn spell_effect(&self, spell: &str) -> Option<SpellEffect> {
        self.spells.get(spell).and_then(|s| s.effect)
    }

    pub fn item_effect(&self, item: &str) -> Option<ItemEffect> {
        self.items.get(item).map(|i| i.effect)
    }

    pub fn unlocks_at(&self, class: &str, level: u32) -> Vec<Unlock> {
        self.classes
            .get(class)
            .map(|c| {
                c.unlocks
                    .iter()
                    .filter(|u| u.level == level)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn catalog(&self) -> &EncounterCatalog {
        &self.encounters
    }
}
