// Domain-level errors and non-fatal outcomes for session workflows.

use std::fmt;

/// Why an action was refused. A rejected action never mutates state and keeps the turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRejection {
    NotYourTurn,
    GameOver,
    UnknownPlayer,
    ActorDown,
    TargetNotFound,
    OutOfRange,
    InsufficientGold,
    ItemNotInInventory,
    ItemNotListed,
    SpellNotKnown,
    WrongPhase,
    EnemiesRemain,
    InvalidTarget,
    InvalidAmount,
    LootNotFound,
    UnrecognizedInput(String),
}

impl fmt::Display for ActionRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotYourTurn => f.write_str("not your turn"),
            Self::GameOver => f.write_str("game already has a winner"),
            Self::UnknownPlayer => f.write_str("player is not in this room"),
            Self::ActorDown => f.write_str("player is down"),
            Self::TargetNotFound => f.write_str("target not found"),
            Self::OutOfRange => f.write_str("target out of range"),
            Self::InsufficientGold => f.write_str("insufficient gold"),
            Self::ItemNotInInventory => f.write_str("item not in inventory"),
            Self::ItemNotListed => f.write_str("item not sold here"),
            Self::SpellNotKnown => f.write_str("spell not known"),
            Self::WrongPhase => f.write_str("not allowed in the current phase"),
            Self::EnemiesRemain => f.write_str("enemies remain"),
            Self::InvalidTarget => f.write_str("invalid target"),
            Self::InvalidAmount => f.write_str("invalid amount"),
            Self::LootNotFound => f.write_str("loot not found"),
            Self::UnrecognizedInput(detail) => write!(f, "unrecognized input: {detail}"),
        }
    }
}

/// Accepted input that changed nothing beyond consuming the turn (and, for items, the item).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoEffect {
    UnknownSpell(String),
    UnknownItem(String),
    Blocked,
}

impl fmt::Display for NoEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSpell(name) => write!(f, "spell {name:?} has no effect"),
            Self::UnknownItem(name) => write!(f, "item {name:?} was used up with no effect"),
            Self::Blocked => f.write_str("movement blocked"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinError {
    ClassRequired,
    UnknownClass(String),
    UnknownSubclass(String),
    SaveNotFound,
    RoomFull,
    GameOver,
    Storage(String),
}

impl fmt::Display for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClassRequired => f.write_str("class and subclass are required"),
            Self::UnknownClass(class) => write!(f, "unknown class {class:?}"),
            Self::UnknownSubclass(subclass) => write!(f, "unknown subclass {subclass:?}"),
            Self::SaveNotFound => f.write_str("saved character not found"),
            Self::RoomFull => f.write_str("room is full"),
            Self::GameOver => f.write_str("game already has a winner"),
            Self::Storage(detail) => write!(f, "storage failure: {detail}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    InvalidKey(String),
    Io(String),
    Corrupt(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKey(key) => write!(f, "invalid storage key {key:?}"),
            Self::Io(detail) => write!(f, "io error: {detail}"),
            Self::Corrupt(detail) => write!(f, "corrupt record: {detail}"),
        }
    }
}

#[derive(Debug)]
pub enum GameDataError {
    Read(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl fmt::Display for GameDataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read(e) => write!(f, "failed to read game data: {e}"),
            Self::Parse(e) => write!(f, "failed to parse game data: {e}"),
            Self::Invalid(detail) => write!(f, "invalid game data: {detail}"),
        }
    }
}
