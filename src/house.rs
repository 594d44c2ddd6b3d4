use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{DomainClaim, DomainRank};
use crate::error::{LedgerError, LedgerResult};
use crate::planet::PlanetId;

pub const STATUS_MIN: i64 = 0;
pub const STATUS_MAX: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HouseId(pub u64);

impl fmt::Display for HouseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "house#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HouseTier {
    Nascent,
    Minor,
    Major,
    Great,
}

impl HouseTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            HouseTier::Nascent => "nascent",
            HouseTier::Minor => "minor",
            HouseTier::Major => "major",
            HouseTier::Great => "great",
        }
    }

    pub fn parse(input: &str) -> LedgerResult<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "nascent" => Ok(HouseTier::Nascent),
            "minor" => Ok(HouseTier::Minor),
            "major" => Ok(HouseTier::Major),
            "great" => Ok(HouseTier::Great),
            other => Err(LedgerError::Validation(format!("unknown house tier '{}'", other))),
        }
    }

    pub fn primary_limit(&self) -> usize {
        match self {
            HouseTier::Nascent => 0,
            HouseTier::Minor => 1,
            HouseTier::Major => 1,
            HouseTier::Great => 2,
        }
    }

    pub fn secondary_limit(&self) -> usize {
        match self {
            HouseTier::Nascent => 1,
            HouseTier::Minor => 1,
            HouseTier::Major => 2,
            HouseTier::Great => 3,
        }
    }

    pub fn domain_limit(&self, rank: DomainRank) -> usize {
        match rank {
            DomainRank::Primary => self.primary_limit(),
            DomainRank::Secondary => self.secondary_limit(),
        }
    }
}

/// Seats in a House's roster. Filling and vacating them is the roster layer's
/// business; the ledger only reads which are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HouseRole {
    Ruler,
    Consort,
    Advisor,
    ChiefPhysician,
    Councilor,
    Envoy,
    Heir,
    Marshal,
    Scholar,
    Security,
    Spymaster,
    Swordmaster,
    Treasurer,
    Warmaster,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct House {
    pub id: HouseId,
    pub name: String,
    pub(crate) tier: HouseTier,
    pub(crate) status: u8,
    pub(crate) wealth: u64,
    pub(crate) resources: u64,
    #[serde(default)]
    pub(crate) primary_domains: Vec<DomainClaim>,
    #[serde(default)]
    pub(crate) secondary_domains: Vec<DomainClaim>,
    #[serde(default)]
    pub(crate) space_claims: BTreeMap<PlanetId, u32>,
    #[serde(default)]
    pub(crate) filled_roles: BTreeSet<HouseRole>,
}

impl House {
    pub fn new(id: HouseId, name: impl Into<String>, tier: HouseTier) -> Self {
        Self {
            id,
            name: name.into(),
            tier,
            status: 0,
            wealth: 0,
            resources: 0,
            primary_domains: Vec::new(),
            secondary_domains: Vec::new(),
            space_claims: BTreeMap::new(),
            filled_roles: BTreeSet::new(),
        }
    }

    pub fn tier(&self) -> HouseTier {
        self.tier
    }

    pub fn status(&self) -> u8 {
        self.status
    }

    pub fn wealth(&self) -> u64 {
        self.wealth
    }

    pub fn resources(&self) -> u64 {
        self.resources
    }

    pub fn domains(&self, rank: DomainRank) -> &[DomainClaim] {
        match rank {
            DomainRank::Primary => &self.primary_domains,
            DomainRank::Secondary => &self.secondary_domains,
        }
    }

    pub fn primary_domains(&self) -> &[DomainClaim] {
        &self.primary_domains
    }

    pub fn secondary_domains(&self) -> &[DomainClaim] {
        &self.secondary_domains
    }

    pub fn space_claims(&self) -> &BTreeMap<PlanetId, u32> {
        &self.space_claims
    }

    pub fn claim_on(&self, planet: PlanetId) -> u32 {
        self.space_claims.get(&planet).copied().unwrap_or(0)
    }

    pub fn filled_roles(&self) -> &BTreeSet<HouseRole> {
        &self.filled_roles
    }

    pub fn has_role(&self, role: HouseRole) -> bool {
        self.filled_roles.contains(&role)
    }

    /// Append a domain claim, respecting the tier's limit for that rank.
    /// Returns the claim's index within its rank.
    pub fn claim_domain(&mut self, rank: DomainRank, claim: DomainClaim) -> LedgerResult<usize> {
        let limit = self.tier.domain_limit(rank);
        let held = self.domains(rank).len();
        if held >= limit {
            return Err(LedgerError::Validation(format!(
                "{} tier allows {} {} domain(s), {} already held",
                self.tier.as_str(),
                limit,
                rank.as_str(),
                held
            )));
        }
        let list = match rank {
            DomainRank::Primary => &mut self.primary_domains,
            DomainRank::Secondary => &mut self.secondary_domains,
        };
        list.push(claim);
        Ok(list.len() - 1)
    }

    pub fn release_domain(&mut self, rank: DomainRank, index: usize) -> LedgerResult<DomainClaim> {
        let list = match rank {
            DomainRank::Primary => &mut self.primary_domains,
            DomainRank::Secondary => &mut self.secondary_domains,
        };
        if index >= list.len() {
            return Err(LedgerError::Validation(format!(
                "no {} domain at position {} ({} held)",
                rank.as_str(),
                index + 1,
                list.len()
            )));
        }
        Ok(list.remove(index))
    }

    /// Administrative tier change. Refused while the House holds more domains
    /// than the new tier allows. Returns the previous tier.
    pub fn set_tier(&mut self, tier: HouseTier) -> LedgerResult<HouseTier> {
        for rank in [DomainRank::Primary, DomainRank::Secondary] {
            let held = self.domains(rank).len();
            let limit = tier.domain_limit(rank);
            if held > limit {
                return Err(LedgerError::Validation(format!(
                    "{} tier allows {} {} domain(s) but {} are held; release {} first",
                    tier.as_str(),
                    limit,
                    rank.as_str(),
                    held,
                    held - limit
                )));
            }
        }
        let previous = self.tier;
        self.tier = tier;
        Ok(previous)
    }

    /// Returns true when the role set actually changed.
    pub fn set_role_filled(&mut self, role: HouseRole, filled: bool) -> bool {
        if filled {
            self.filled_roles.insert(role)
        } else {
            self.filled_roles.remove(&role)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim(area: &str, subtype: &str) -> DomainClaim {
        DomainClaim::new(area, subtype, "").unwrap()
    }

    #[test]
    fn test_tier_limits_table() {
        let primary: Vec<usize> = [HouseTier::Nascent, HouseTier::Minor, HouseTier::Major, HouseTier::Great]
            .iter()
            .map(|t| t.primary_limit())
            .collect();
        let secondary: Vec<usize> = [HouseTier::Nascent, HouseTier::Minor, HouseTier::Major, HouseTier::Great]
            .iter()
            .map(|t| t.secondary_limit())
            .collect();
        assert_eq!(primary, vec![0, 1, 1, 2]);
        assert_eq!(secondary, vec![1, 1, 2, 3]);
    }

    #[test]
    fn test_nascent_cannot_claim_primary() {
        let mut house = House::new(HouseId(1), "Moritani", HouseTier::Nascent);
        let err = house
            .claim_domain(DomainRank::Primary, claim("Military", "Workers"))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert!(house.primary_domains().is_empty());
        assert_eq!(house.claim_domain(DomainRank::Secondary, claim("Farming", "Produce")).unwrap(), 0);
    }

    #[test]
    fn test_claim_limit_enforced() {
        let mut house = House::new(HouseId(1), "Atreides", HouseTier::Major);
        house.claim_domain(DomainRank::Secondary, claim("Farming", "Produce")).unwrap();
        house.claim_domain(DomainRank::Secondary, claim("Military", "Workers")).unwrap();
        assert!(house.claim_domain(DomainRank::Secondary, claim("Science", "Understanding")).is_err());
        assert_eq!(house.secondary_domains().len(), 2);
    }

    #[test]
    fn test_release_domain_out_of_range() {
        let mut house = House::new(HouseId(1), "Atreides", HouseTier::Minor);
        house.claim_domain(DomainRank::Primary, claim("Military", "Workers")).unwrap();
        assert!(house.release_domain(DomainRank::Primary, 1).is_err());
        let released = house.release_domain(DomainRank::Primary, 0).unwrap();
        assert_eq!(released.area, "Military");
        assert!(house.primary_domains().is_empty());
    }

    #[test]
    fn test_tier_downgrade_blocked_by_domains() {
        let mut house = House::new(HouseId(1), "Harkonnen", HouseTier::Great);
        house.claim_domain(DomainRank::Primary, claim("Industrial", "Machinery")).unwrap();
        house.claim_domain(DomainRank::Primary, claim("Military", "Workers")).unwrap();
        assert!(house.set_tier(HouseTier::Major).is_err());
        assert_eq!(house.tier(), HouseTier::Great);

        house.release_domain(DomainRank::Primary, 1).unwrap();
        assert_eq!(house.set_tier(HouseTier::Major).unwrap(), HouseTier::Great);
        assert_eq!(house.tier(), HouseTier::Major);
    }

    #[test]
    fn test_role_toggle_reports_change() {
        let mut house = House::new(HouseId(1), "Ginaz", HouseTier::Minor);
        assert!(house.set_role_filled(HouseRole::Treasurer, true));
        assert!(!house.set_role_filled(HouseRole::Treasurer, true));
        assert!(house.has_role(HouseRole::Treasurer));
        assert!(house.set_role_filled(HouseRole::Treasurer, false));
        assert!(!house.has_role(HouseRole::Treasurer));
    }

    #[test]
    fn test_tier_parse() {
        assert_eq!(HouseTier::parse("Great").unwrap(), HouseTier::Great);
        assert!(HouseTier::parse("imperial").is_err());
    }
}
