// Ordered, immutable sequence of encounter templates.

use crate::domain::entities::{Encounter, Enemy};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncounterCatalog {
    encounters: Vec<Encounter>,
}

impl EncounterCatalog {
    pub fn new(encounters: Vec<Encounter>) -> Self {
        Self { encounters }
    }

    pub fn len(&self) -> usize {
        self.encounters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encounters.is_empty()
    }

    pub fn template(&self, index: usize) -> Option<&Encounter> {
        self.encounters.get(index)
    }

    /// Fresh copy of the enemy set for `index`. Rooms never share template state.
    pub fn current(&self, index: usize) -> Vec<Enemy> {
        self.encounters
            .get(index)
            .map(|encounter| encounter.enemies.clone())
            .unwrap_or_default()
    }

    pub fn has_next(&self, index: usize) -> bool {
        index + 1 < self.encounters.len()
    }

    pub fn advance(&self, index: usize) -> Option<usize> {
        self.has_next(index).then_some(index + 1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Encounter> {
        self.encounters.iter()
    }
}
