//! Two-sided space ledger between Houses and Planets.
//!
//! Every (house, planet) pair is recorded twice: in `House::space_claims` and
//! in `Planet::allocations`. The two entries are always equal, and a pair with
//! no spaces has no entry on either side. All mutations validate first and
//! write both sides afterwards, so a failure leaves both aggregates untouched.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::{PRIMARY_SPACE_COST, SECONDARY_SPACE_COST};
use crate::error::{LedgerError, LedgerResult};
use crate::house::{House, HouseId};
use crate::planet::{Planet, PlanetId};

/// Parse caller text into a non-negative whole amount.
pub fn parse_amount(input: &str) -> LedgerResult<i64> {
    let trimmed = input.trim();
    match trimmed.parse::<i64>() {
        Ok(v) if v >= 0 => Ok(v),
        _ => Err(LedgerError::invalid_amount(trimmed)),
    }
}

fn to_spaces(value: i64) -> LedgerResult<u32> {
    u32::try_from(value).map_err(|_| LedgerError::invalid_amount(value))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Allocation {
    pub house: HouseId,
    pub planet: PlanetId,
    pub previous: u32,
    pub current: u32,
    /// Planet capacity left after the change
    pub available: u32,
}

fn write_pair(house: &mut House, planet: &mut Planet, spaces: u32) {
    if spaces == 0 {
        house.space_claims.remove(&planet.id);
        planet.allocations.remove(&house.id);
    } else {
        house.space_claims.insert(planet.id, spaces);
        planet.allocations.insert(house.id, spaces);
    }
}

/// Set the House's holding on the Planet to exactly `spaces`.
///
/// Only the increase over the current holding is checked against free
/// capacity. Setting zero removes the entry on both sides.
pub fn allocate(house: &mut House, planet: &mut Planet, spaces: i64) -> LedgerResult<Allocation> {
    let spaces = to_spaces(spaces)?;
    let current = planet.allocation_of(house.id);
    if spaces > current {
        let increase = spaces - current;
        let available = planet.available();
        if increase > available {
            return Err(LedgerError::InsufficientCapacity {
                requested: increase,
                available,
            });
        }
    }
    write_pair(house, planet, spaces);
    Ok(Allocation {
        house: house.id,
        planet: planet.id,
        previous: current,
        current: spaces,
        available: planet.available(),
    })
}

/// Remove the pair from both sides. Returns the spaces freed.
pub fn deallocate(house: &mut House, planet: &mut Planet) -> LedgerResult<u32> {
    let held = planet.allocation_of(house.id);
    if held == 0 && !house.space_claims.contains_key(&planet.id) {
        return Err(LedgerError::NoAllocation {
            house: house.id,
            planet: planet.id,
        });
    }
    write_pair(house, planet, 0);
    Ok(held)
}

pub fn total_controlled(house: &House) -> u64 {
    house.space_claims.values().map(|v| *v as u64).sum()
}

pub fn required_spaces(house: &House) -> u64 {
    PRIMARY_SPACE_COST * house.primary_domains.len() as u64
        + SECONDARY_SPACE_COST * house.secondary_domains.len() as u64
}

/// Negative means deficit. Informational only: allocation never checks it.
pub fn surplus_or_deficit(house: &House) -> i64 {
    total_controlled(house) as i64 - required_spaces(house) as i64
}

pub fn available_spaces(planet: &Planet) -> u32 {
    planet.available()
}

/// Change a Planet's capacity. Returns the previous capacity.
pub fn set_total_spaces(planet: &mut Planet, total: i64) -> LedgerResult<u32> {
    let total = to_spaces(total)?;
    let allocated = planet.allocated();
    if (total as u64) < allocated {
        let allocated = allocated.min(u32::MAX as u64) as u32;
        return Err(LedgerError::WouldOrphanAllocations {
            allocated,
            requested: total,
            must_free: allocated - total,
        });
    }
    let previous = planet.total_spaces;
    planet.total_spaces = total;
    Ok(previous)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpaceReport {
    pub controlled: u64,
    pub required: u64,
    pub surplus: i64,
    pub holdings: BTreeMap<PlanetId, u32>,
}

impl SpaceReport {
    pub fn in_deficit(&self) -> bool {
        self.surplus < 0
    }
}

pub fn space_report(house: &House) -> SpaceReport {
    SpaceReport {
        controlled: total_controlled(house),
        required: required_spaces(house),
        surplus: surplus_or_deficit(house),
        holdings: house.space_claims.clone(),
    }
}
