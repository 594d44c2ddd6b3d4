use std::collections::BTreeMap;

use serde::Serialize;

use crate::house::{House, HouseId, STATUS_MAX};
use crate::ledger::total_controlled;
use crate::planet::{Planet, PlanetId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// House and Planet disagree about a pair
    Asymmetric,
    /// An entry recorded with zero spaces
    ZeroEntry,
    OverCapacity,
    /// An entry pointing at an entity that does not exist
    Dangling,
    StatusOutOfRange,
    DomainLimit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvariantViolation {
    pub kind: ViolationKind,
    pub msg: String,
}

fn violation(kind: ViolationKind, msg: String) -> InvariantViolation {
    InvariantViolation { kind, msg }
}

pub fn assert_house_invariants(house: &House) -> Result<(), InvariantViolation> {
    if house.status() as i64 > STATUS_MAX {
        return Err(violation(
            ViolationKind::StatusOutOfRange,
            format!("{} status {} above {}", house.id, house.status(), STATUS_MAX),
        ));
    }
    let tier = house.tier();
    if house.primary_domains().len() > tier.primary_limit()
        || house.secondary_domains().len() > tier.secondary_limit()
    {
        return Err(violation(
            ViolationKind::DomainLimit,
            format!(
                "{} holds {}/{} domains, {} tier allows {}/{}",
                house.id,
                house.primary_domains().len(),
                house.secondary_domains().len(),
                tier.as_str(),
                tier.primary_limit(),
                tier.secondary_limit()
            ),
        ));
    }
    Ok(())
}

pub fn assert_capacity(planet: &Planet) -> Result<(), InvariantViolation> {
    let allocated = planet.allocated();
    if allocated > planet.total_spaces() as u64 {
        return Err(violation(
            ViolationKind::OverCapacity,
            format!(
                "{} has {} spaces allocated but capacity {}",
                planet.id,
                allocated,
                planet.total_spaces()
            ),
        ));
    }
    Ok(())
}

/// Walk both sides of the ledger and report every inconsistency found.
pub fn audit_ledger(
    houses: &BTreeMap<HouseId, House>,
    planets: &BTreeMap<PlanetId, Planet>,
) -> Vec<InvariantViolation> {
    let mut out = Vec::new();

    for house in houses.values() {
        if let Err(v) = assert_house_invariants(house) {
            out.push(v);
        }
        for (planet_id, spaces) in house.space_claims() {
            if *spaces == 0 {
                out.push(violation(
                    ViolationKind::ZeroEntry,
                    format!("{} records a zero claim on {}", house.id, planet_id),
                ));
            }
            match planets.get(planet_id) {
                None => out.push(violation(
                    ViolationKind::Dangling,
                    format!("{} claims spaces on missing {}", house.id, planet_id),
                )),
                Some(planet) => {
                    let mirrored = planet.allocations().get(&house.id).copied();
                    if mirrored != Some(*spaces) {
                        out.push(violation(
                            ViolationKind::Asymmetric,
                            format!(
                                "{} claims {} on {} but the planet records {:?}",
                                house.id, spaces, planet_id, mirrored
                            ),
                        ));
                    }
                }
            }
        }
    }

    for planet in planets.values() {
        if let Err(v) = assert_capacity(planet) {
            out.push(v);
        }
        for (house_id, spaces) in planet.allocations() {
            if *spaces == 0 {
                out.push(violation(
                    ViolationKind::ZeroEntry,
                    format!("{} records a zero allocation for {}", planet.id, house_id),
                ));
            }
            match houses.get(house_id) {
                None => out.push(violation(
                    ViolationKind::Dangling,
                    format!("{} allocates spaces to missing {}", planet.id, house_id),
                )),
                Some(house) => {
                    // The matching direction was already reported above.
                    if !house.space_claims().contains_key(&planet.id) {
                        out.push(violation(
                            ViolationKind::Asymmetric,
                            format!(
                                "{} allocates {} to {} but the house records no claim",
                                planet.id, spaces, house_id
                            ),
                        ));
                    }
                }
            }
        }
    }

    out
}

/// Totals on both sides must agree once the per-pair check passes.
pub fn assert_totals_balance(
    houses: &BTreeMap<HouseId, House>,
    planets: &BTreeMap<PlanetId, Planet>,
) -> Result<(), InvariantViolation> {
    let claimed: u64 = houses.values().map(total_controlled).sum();
    let allocated: u64 = planets.values().map(|p| p.allocated()).sum();
    if claimed != allocated {
        return Err(violation(
            ViolationKind::Asymmetric,
            format!("houses claim {} spaces, planets allocate {}", claimed, allocated),
        ));
    }
    Ok(())
}
