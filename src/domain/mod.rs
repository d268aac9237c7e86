// Domain layer: core session types and rules.

pub mod action;
pub mod catalog;
pub mod entities;
pub mod errors;
pub mod game_data;
pub mod grid;
pub mod ports;
pub mod state;
pub mod systems;

pub use action::{Action, SpellTarget};
pub use catalog::EncounterCatalog;
pub use entities::{Attributes, Encounter, Enemy, LootItem, Player, ShopItem};
pub use errors::{ActionRejection, GameDataError, JoinError, NoEffect, StoreError};
pub use game_data::GameData;
pub use grid::{Direction, Position};
pub use state::{ActionLogEntry, Phase, Room, SessionSnapshot, SessionState, Winner};
pub use systems::Outcome;
