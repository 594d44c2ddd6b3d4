//! Reputation: a tier-relative reading of a House's status.
//!
//! The same status means different things for different Houses. A Great
//! House at 45 is still feeble in the eyes of its peers, while a Minor House
//! at 45 is strong. Each tier has an ascending threshold table, and the
//! reputation is the first band whose upper bound covers the status.

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::house::{House, HouseTier, STATUS_MAX, STATUS_MIN};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Reputation {
    Feeble,
    Weak,
    Respected,
    Strong,
    Problematic,
    Dangerous,
}

impl Reputation {
    const BANDS: [Reputation; 5] = [
        Reputation::Feeble,
        Reputation::Weak,
        Reputation::Respected,
        Reputation::Strong,
        Reputation::Problematic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Reputation::Feeble => "Feeble",
            Reputation::Weak => "Weak",
            Reputation::Respected => "Respected",
            Reputation::Strong => "Strong",
            Reputation::Problematic => "Problematic",
            Reputation::Dangerous => "Dangerous",
        }
    }
}

/// Inclusive upper bounds for Feeble, Weak, Respected, Strong, Problematic.
/// Anything above the last bound is Dangerous.
fn thresholds(tier: HouseTier) -> [u8; 5] {
    match tier {
        HouseTier::Nascent | HouseTier::Minor => [10, 20, 40, 50, 70],
        HouseTier::Major => [20, 40, 60, 70, 80],
        HouseTier::Great => [40, 60, 70, 80, 90],
    }
}

pub fn reputation_tier(status: u8, tier: HouseTier) -> Reputation {
    thresholds(tier)
        .iter()
        .zip(Reputation::BANDS.iter())
        .find(|(bound, _)| status <= **bound)
        .map(|(_, rep)| *rep)
        .unwrap_or(Reputation::Dangerous)
}

/// Fixed modifiers a reputation imposes on House actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReputationEffect {
    /// Added to the difficulty of House actions (negative eases them)
    pub difficulty_modifier: i8,
    pub threat_per_action: u8,
    pub text: &'static str,
}

pub fn effects(reputation: Reputation) -> ReputationEffect {
    match reputation {
        Reputation::Feeble => ReputationEffect {
            difficulty_modifier: 1,
            threat_per_action: 0,
            text: "+1 difficulty on House actions; rivals see an easy target",
        },
        Reputation::Weak => ReputationEffect {
            difficulty_modifier: 1,
            threat_per_action: 0,
            text: "+1 difficulty on House actions involving other Houses",
        },
        Reputation::Respected => ReputationEffect {
            difficulty_modifier: 0,
            threat_per_action: 0,
            text: "No modifier",
        },
        Reputation::Strong => ReputationEffect {
            difficulty_modifier: -1,
            threat_per_action: 0,
            text: "-1 difficulty on House actions",
        },
        Reputation::Problematic => ReputationEffect {
            difficulty_modifier: -1,
            threat_per_action: 0,
            text: "-1 difficulty on House actions; rivals begin to move against the House",
        },
        Reputation::Dangerous => ReputationEffect {
            difficulty_modifier: -2,
            threat_per_action: 1,
            text: "-2 difficulty on House actions; +1 Threat per House action",
        },
    }
}

/// Outcome of a status mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReputationChange {
    pub old_status: u8,
    pub new_status: u8,
    pub old: Reputation,
    pub new: Reputation,
}

impl ReputationChange {
    pub fn tier_changed(&self) -> bool {
        self.old != self.new
    }

    pub fn message(&self) -> String {
        if self.tier_changed() {
            format!(
                "status {} -> {}: reputation changed from {} to {}",
                self.old_status,
                self.new_status,
                self.old.as_str(),
                self.new.as_str()
            )
        } else {
            format!(
                "status {} -> {}: reputation remains {}",
                self.old_status,
                self.new_status,
                self.new.as_str()
            )
        }
    }
}

pub fn current(house: &House) -> Reputation {
    reputation_tier(house.status, house.tier)
}

fn apply(house: &mut House, new_status: u8) -> ReputationChange {
    let old_status = house.status;
    let old = current(house);
    house.status = new_status;
    ReputationChange {
        old_status,
        new_status,
        old,
        new: current(house),
    }
}

pub fn set_status(house: &mut House, value: i64) -> LedgerResult<ReputationChange> {
    if !(STATUS_MIN..=STATUS_MAX).contains(&value) {
        return Err(LedgerError::Validation(format!(
            "status must be between {} and {}, got {}",
            STATUS_MIN, STATUS_MAX, value
        )));
    }
    Ok(apply(house, value as u8))
}

/// Saturating: the result is clamped into range rather than rejected.
pub fn adjust_status(house: &mut House, delta: i64) -> ReputationChange {
    let target = (house.status as i64).saturating_add(delta).clamp(STATUS_MIN, STATUS_MAX);
    apply(house, target as u8)
}
