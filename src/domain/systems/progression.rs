// Character creation and leveling driven by the class tables.

use crate::domain::entities::Player;
use crate::domain::errors::JoinError;
use crate::domain::game_data::{GameData, UnlockKind};
use crate::domain::grid::Position;
use tracing::debug;

/// Experience needed for the next level. Excess is discarded on level-up.
pub const LEVEL_UP_XP: u32 = 100;
pub const HP_PER_LEVEL: i32 = 2;
pub const VETERAN_LEVEL: u32 = 5;
pub const VETERAN: &str = "Veteran";

/// Builds a level-1 character from the class tables.
pub fn create_character(
    data: &GameData,
    player_id: &str,
    class: Option<&str>,
    subclass: Option<&str>,
    save_slot: &str,
) -> Result<Player, JoinError> {
    let (Some(class), Some(subclass)) = (
        class.map(str::trim).filter(|c| !c.is_empty()),
        subclass.map(str::trim).filter(|s| !s.is_empty()),
    ) else {
        return Err(JoinError::ClassRequired);
    };

    let class_data = data
        .class(class)
        .ok_or_else(|| JoinError::UnknownClass(class.to_string()))?;
    if !class_data.subclasses.iter().any(|s| s == subclass) {
        return Err(JoinError::UnknownSubclass(subclass.to_string()));
    }

    let mut player = Player {
        id: player_id.to_string(),
        class: class.to_string(),
        subclass: subclass.to_string(),
        level: 1,
        xp: 0,
        attributes: class_data.attributes,
        hp: class_data.base_hp,
        max_hp: class_data.base_hp,
        position: Position { row: 5, col: 0 },
        gold: class_data.starting_gold,
        inventory: class_data.starting_items.clone(),
        spells: Vec::new(),
        weapon: class_data.starting_weapon.clone(),
        passives: Vec::new(),
        statuses: Vec::new(),
        achievements: Vec::new(),
        save_slot: save_slot.to_string(),
    };
    for spell in &class_data.starting_spells {
        player.learn_spell(spell);
    }
    Ok(player)
}

/// Adds experience; crossing the threshold levels up once. Returns true on level-up.
pub fn gain_xp(data: &GameData, player: &mut Player, amount: u32) -> bool {
    player.xp = player.xp.saturating_add(amount);
    if player.xp < LEVEL_UP_XP {
        return false;
    }
    level_up(data, player);
    true
}

fn level_up(data: &GameData, player: &mut Player) {
    player.level += 1;
    player.xp = 0;
    player.attributes.strength += 1;
    player.attributes.constitution += 1;
    player.max_hp += HP_PER_LEVEL;
    if player.is_alive() {
        player.hp += HP_PER_LEVEL;
    }

    if let Some(spell) = data
        .class(&player.class)
        .and_then(|c| c.level_up_spell.clone())
    {
        player.learn_spell(&spell);
    }

    for unlock in data.unlocks_at(&player.class, player.level) {
        match unlock.kind {
            UnlockKind::Spell => {
                player.learn_spell(&unlock.name);
            }
            UnlockKind::Weapon => player.weapon = unlock.name,
            UnlockKind::Passive => {
                player.add_passive(&unlock.name);
            }
        }
    }

    if player.level >= VETERAN_LEVEL {
        player.award(VETERAN);
    }

    debug!(player_id = %player.id, level = player.level, "level up");
}
