// Rules that mutate a room. `resolver` is the single entry point for player actions.

pub mod combat;
pub mod economy;
pub mod encounters;
pub mod enemy_ai;
pub mod movement;
pub mod progression;
pub mod resolver;
pub mod turns;

use crate::domain::errors::NoEffect;

/// Result of an accepted action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    NoEffect(NoEffect),
}
