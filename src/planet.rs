use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::house::HouseId;

pub const DEFAULT_PLANET_SPACES: u32 = 80;
pub const DEFAULT_MOON_SPACES: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanetId(pub u64);

impl fmt::Display for PlanetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "planet#{}", self.0)
    }
}

/// Caller-supplied body type. It only picks the default capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanetKind {
    Planet,
    Moon,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Planet {
    pub id: PlanetId,
    pub name: String,
    pub kind: PlanetKind,
    pub(crate) total_spaces: u32,
    #[serde(default)]
    pub(crate) allocations: BTreeMap<HouseId, u32>,
}

impl Planet {
    pub fn new(id: PlanetId, name: impl Into<String>, kind: PlanetKind, total_spaces: u32) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            total_spaces,
            allocations: BTreeMap::new(),
        }
    }

    pub fn total_spaces(&self) -> u32 {
        self.total_spaces
    }

    pub fn allocations(&self) -> &BTreeMap<HouseId, u32> {
        &self.allocations
    }

    pub fn allocation_of(&self, house: HouseId) -> u32 {
        self.allocations.get(&house).copied().unwrap_or(0)
    }

    /// Sum of all allocations. Widened so corrupt loaded data cannot overflow.
    pub fn allocated(&self) -> u64 {
        self.allocations.values().map(|v| *v as u64).sum()
    }

    pub fn available(&self) -> u32 {
        (self.total_spaces as u64).saturating_sub(self.allocated()) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_tracks_allocations() {
        let mut planet = Planet::new(PlanetId(1), "Caladan", PlanetKind::Planet, DEFAULT_PLANET_SPACES);
        assert_eq!(planet.available(), 80);
        planet.allocations.insert(HouseId(1), 60);
        planet.allocations.insert(HouseId(2), 5);
        assert_eq!(planet.allocated(), 65);
        assert_eq!(planet.available(), 15);
        assert_eq!(planet.allocation_of(HouseId(2)), 5);
        assert_eq!(planet.allocation_of(HouseId(3)), 0);
    }

    #[test]
    fn test_available_never_underflows() {
        let mut planet = Planet::new(PlanetId(1), "Arrakis I", PlanetKind::Moon, 10);
        planet.allocations.insert(HouseId(1), 15);
        assert_eq!(planet.available(), 0);
    }
}
