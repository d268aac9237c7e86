// Validated player actions. Shape checks happen once, at the wire boundary.

use crate::domain::grid::Direction;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpellTarget {
    Enemy(String),
    Player(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Move { direction: Direction },
    Attack { target: String },
    Spell { name: String, target: SpellTarget },
    UseItem { item: String },
    Trade { item: String, to_player: String },
    GiveGold { amount: u32, to_player: String },
    Buy { item: String },
    Sell { item: String },
    GainXp { amount: u32 },
    ApplyStatus { tag: String },
    ClaimLoot { item: String },
    NextPhase,
}

impl Action {
    /// Stable tag used in logs and diagnostics.
    pub fn tag(&self) -> &'static str {
        match self {
            Action::Move { .. } => "move",
            Action::Attack { .. } => "attack",
            Action::Spell { .. } => "spell",
            Action::UseItem { .. } => "use_item",
            Action::Trade { .. } => "trade",
            Action::GiveGold { .. } => "give_gold",
            Action::Buy { .. } => "buy",
            Action::Sell { .. } => "sell",
            Action::GainXp { .. } => "gain_xp",
            Action::ApplyStatus { .. } => "apply_status",
            Action::ClaimLoot { .. } => "claim_loot",
            Action::NextPhase => "next_phase",
        }
    }
}
