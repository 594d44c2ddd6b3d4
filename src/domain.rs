//! Domain claims: a House's declared areas of economic activity.
//!
//! A claim is normalized once, when it is created or loaded: the subtype is
//! resolved to a [`DomainSubtype`] and the area is classified into an
//! [`AreaCategory`]. Nothing downstream re-parses strings.

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// Space cost of one primary domain
pub const PRIMARY_SPACE_COST: u64 = 25;
/// Space cost of one secondary domain
pub const SECONDARY_SPACE_COST: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainRank {
    Primary,
    Secondary,
}

impl DomainRank {
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainRank::Primary => "primary",
            DomainRank::Secondary => "secondary",
        }
    }

    pub fn space_cost(&self) -> u64 {
        match self {
            DomainRank::Primary => PRIMARY_SPACE_COST,
            DomainRank::Secondary => SECONDARY_SPACE_COST,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DomainSubtype {
    Expertise,
    Machinery,
    Produce,
    Workers,
    Understanding,
}

impl DomainSubtype {
    pub const ALL: [DomainSubtype; 5] = [
        DomainSubtype::Expertise,
        DomainSubtype::Machinery,
        DomainSubtype::Produce,
        DomainSubtype::Workers,
        DomainSubtype::Understanding,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DomainSubtype::Expertise => "Expertise",
            DomainSubtype::Machinery => "Machinery",
            DomainSubtype::Produce => "Produce",
            DomainSubtype::Workers => "Workers",
            DomainSubtype::Understanding => "Understanding",
        }
    }

    /// Case-insensitive match on the subtype name
    pub fn parse(input: &str) -> LedgerResult<Self> {
        let wanted = input.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                LedgerError::Validation(format!(
                    "unknown domain subtype '{}' (expected one of Expertise, Machinery, Produce, Workers, Understanding)",
                    wanted
                ))
            })
    }
}

/// How an area shifts a domain's yield between wealth and resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaCategory {
    WealthWeighted,
    ResourceWeighted,
    Neutral,
}

const WEALTH_AREAS: [&str; 4] = ["Artistic", "Espionage", "Political", "Religion"];
const RESOURCE_AREAS: [&str; 5] = ["Farming", "Industrial", "Kanly", "Military", "Science"];

impl AreaCategory {
    pub fn of(area: &str) -> Self {
        let area = area.trim();
        if WEALTH_AREAS.iter().any(|a| a.eq_ignore_ascii_case(area)) {
            AreaCategory::WealthWeighted
        } else if RESOURCE_AREAS.iter().any(|a| a.eq_ignore_ascii_case(area)) {
            AreaCategory::ResourceWeighted
        } else {
            AreaCategory::Neutral
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainClaim {
    pub area: String,
    pub subtype: DomainSubtype,
    #[serde(default)]
    pub description: String,
}

impl DomainClaim {
    pub fn new(area: &str, subtype: &str, description: &str) -> LedgerResult<Self> {
        let area = area.trim();
        if area.is_empty() {
            return Err(LedgerError::Validation("domain area must not be empty".to_string()));
        }
        Ok(Self {
            area: area.to_string(),
            subtype: DomainSubtype::parse(subtype)?,
            description: description.trim().to_string(),
        })
    }

    pub fn category(&self) -> AreaCategory {
        AreaCategory::of(&self.area)
    }
}
