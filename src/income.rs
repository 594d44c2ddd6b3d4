//! Per-cycle income derived from a House's domain claims.
//!
//! Income is never stored as authoritative state. It is recomputed from the
//! current claims and roles whenever it is needed.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::{AreaCategory, DomainClaim, DomainRank, DomainSubtype};
use crate::house::{House, HouseRole};

/// Floors applied to each domain after area modifiers
pub const MIN_DOMAIN_RESOURCES: i64 = 2;
pub const MIN_DOMAIN_WEALTH: i64 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Income {
    pub resources: u64,
    pub wealth: u64,
}

impl Income {
    pub fn new(resources: u64, wealth: u64) -> Self {
        Self { resources, wealth }
    }

    fn plus(self, other: Income) -> Income {
        Income {
            resources: self.resources.saturating_add(other.resources),
            wealth: self.wealth.saturating_add(other.wealth),
        }
    }
}

/// Signed (resources, wealth) pair used before floors are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Yield {
    resources: i64,
    wealth: i64,
}

const fn y(resources: i64, wealth: i64) -> Yield {
    Yield { resources, wealth }
}

fn base_rate(rank: DomainRank, subtype: DomainSubtype) -> Yield {
    match (rank, subtype) {
        (DomainRank::Primary, DomainSubtype::Expertise) => y(6, 44),
        (DomainRank::Primary, DomainSubtype::Machinery) => y(10, 36),
        (DomainRank::Primary, DomainSubtype::Produce) => y(14, 30),
        (DomainRank::Primary, DomainSubtype::Workers) => y(12, 32),
        (DomainRank::Primary, DomainSubtype::Understanding) => y(4, 48),
        (DomainRank::Secondary, DomainSubtype::Expertise) => y(3, 22),
        (DomainRank::Secondary, DomainSubtype::Machinery) => y(5, 18),
        (DomainRank::Secondary, DomainSubtype::Produce) => y(7, 15),
        (DomainRank::Secondary, DomainSubtype::Workers) => y(6, 16),
        (DomainRank::Secondary, DomainSubtype::Understanding) => y(2, 24),
    }
}

/// (resources delta, wealth delta) for an area category at a given rank
fn area_modifier(rank: DomainRank, category: AreaCategory) -> Yield {
    match (rank, category) {
        (DomainRank::Primary, AreaCategory::WealthWeighted) => y(-3, 8),
        (DomainRank::Secondary, AreaCategory::WealthWeighted) => y(-1, 4),
        (DomainRank::Primary, AreaCategory::ResourceWeighted) => y(3, -6),
        (DomainRank::Secondary, AreaCategory::ResourceWeighted) => y(1, -4),
        (_, AreaCategory::Neutral) => y(0, 0),
    }
}

/// Flat bonus a filled role contributes each cycle
pub fn role_bonus(role: HouseRole) -> Income {
    match role {
        HouseRole::Treasurer => Income::new(0, 10),
        _ => Income::default(),
    }
}

/// One domain's contribution, with the intermediate steps kept for reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainYield {
    pub rank: DomainRank,
    pub area: String,
    pub subtype: DomainSubtype,
    pub base: (i64, i64),
    pub modified: (i64, i64),
    pub income: Income,
}

/// Floors, not caps: applied after the area modifier.
fn floored(modified: Yield) -> Income {
    Income::new(
        modified.resources.max(MIN_DOMAIN_RESOURCES) as u64,
        modified.wealth.max(MIN_DOMAIN_WEALTH) as u64,
    )
}

pub fn domain_yield(rank: DomainRank, claim: &DomainClaim) -> DomainYield {
    let base = base_rate(rank, claim.subtype);
    let delta = area_modifier(rank, claim.category());
    let modified = y(base.resources + delta.resources, base.wealth + delta.wealth);
    let income = floored(modified);
    DomainYield {
        rank,
        area: claim.area.clone(),
        subtype: claim.subtype,
        base: (base.resources, base.wealth),
        modified: (modified.resources, modified.wealth),
        income,
    }
}

pub fn compute_income(
    primary: &[DomainClaim],
    secondary: &[DomainClaim],
    filled_roles: &BTreeSet<HouseRole>,
) -> Income {
    let domains = primary
        .iter()
        .map(|c| domain_yield(DomainRank::Primary, c).income)
        .chain(secondary.iter().map(|c| domain_yield(DomainRank::Secondary, c).income))
        .fold(Income::default(), Income::plus);
    filled_roles
        .iter()
        .map(|r| role_bonus(*r))
        .fold(domains, Income::plus)
}

pub fn income_for(house: &House) -> Income {
    compute_income(house.primary_domains(), house.secondary_domains(), house.filled_roles())
}

pub fn breakdown(house: &House) -> Vec<DomainYield> {
    house
        .primary_domains()
        .iter()
        .map(|c| domain_yield(DomainRank::Primary, c))
        .chain(house.secondary_domains().iter().map(|c| domain_yield(DomainRank::Secondary, c)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim(area: &str, subtype: &str) -> DomainClaim {
        DomainClaim::new(area, subtype, "").unwrap()
    }

    #[test]
    fn test_wealth_weighted_primary() {
        let dy = domain_yield(DomainRank::Primary, &claim("Artistic", "Expertise"));
        assert_eq!(dy.base, (6, 44));
        assert_eq!(dy.modified, (3, 52));
        assert_eq!(dy.income, Income::new(3, 52));
    }

    #[test]
    fn test_wealth_floor() {
        assert_eq!(floored(y(1, 4)), Income::new(2, 10));
        assert_eq!(floored(y(5, -3)), Income::new(5, 10));
        assert_eq!(floored(y(3, 10)), Income::new(3, 10));
        assert_eq!(floored(y(3, 11)), Income::new(3, 11));
    }

    #[test]
    fn test_resource_floor() {
        assert_eq!(floored(y(-2, 40)), Income::new(2, 40));
        assert_eq!(floored(y(2, 9)), Income::new(2, 10));
        assert_eq!(floored(y(0, 0)), Income::new(2, 10));
    }

    #[test]
    fn test_resource_floor_after_modifier() {
        // 4 - 3 = 1, floored to 2
        let dy = domain_yield(DomainRank::Primary, &claim("Espionage", "Understanding"));
        assert_eq!(dy.modified, (1, 56));
        assert_eq!(dy.income, Income::new(2, 56));

        // 2 - 1 = 1, floored to 2
        let dy = domain_yield(DomainRank::Secondary, &claim("Religion", "Understanding"));
        assert_eq!(dy.modified.0, 1);
        assert_eq!(dy.income.resources, 2);
    }

    #[test]
    fn test_resource_weighted_secondary() {
        let dy = domain_yield(DomainRank::Secondary, &claim("Farming", "Produce"));
        assert_eq!(dy.modified, (8, 11));
        assert_eq!(dy.income, Income::new(8, 11));
    }

    #[test]
    fn test_resource_weighted_and_neutral() {
        let dy = domain_yield(DomainRank::Primary, &claim("Industrial", "Machinery"));
        assert_eq!(dy.income, Income::new(13, 30));
        let dy = domain_yield(DomainRank::Primary, &claim("Trade", "Machinery"));
        assert_eq!(dy.income, Income::new(10, 36));
    }

    #[test]
    fn test_secondary_table_is_about_half() {
        for subtype in DomainSubtype::ALL {
            let p = base_rate(DomainRank::Primary, subtype);
            let s = base_rate(DomainRank::Secondary, subtype);
            assert_eq!(s.resources, p.resources / 2, "{:?}", subtype);
            assert_eq!(s.wealth, p.wealth / 2, "{:?}", subtype);
        }
    }

    #[test]
    fn test_compute_income_sums_and_adds_treasurer() {
        let primary = vec![claim("Artistic", "Expertise")];
        let secondary = vec![claim("Farming", "Produce"), claim("Trade", "Workers")];
        let mut roles = BTreeSet::new();

        let base = compute_income(&primary, &secondary, &roles);
        assert_eq!(base, Income::new(3 + 8 + 6, 52 + 11 + 16));

        roles.insert(HouseRole::Spymaster);
        assert_eq!(compute_income(&primary, &secondary, &roles), base);

        roles.insert(HouseRole::Treasurer);
        let with_treasurer = compute_income(&primary, &secondary, &roles);
        assert_eq!(with_treasurer.resources, base.resources);
        assert_eq!(with_treasurer.wealth, base.wealth + 10);
    }

    #[test]
    fn test_no_domains_no_income() {
        assert_eq!(compute_income(&[], &[], &BTreeSet::new()), Income::default());
    }
}
