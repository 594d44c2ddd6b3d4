//! Error types for ledger operations.
//!
//! Every failure carries the numbers a caller needs to explain it (current
//! balance, required amount, remaining capacity). Failures never leave an
//! aggregate partially written.

use thiserror::Error;

use crate::house::HouseId;
use crate::planet::PlanetId;
use crate::treasury::Currency;

/// Result type alias for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Malformed or out-of-range scalar input
    #[error("invalid value: {0}")]
    Validation(String),

    /// Negative, oversized or non-numeric quantity
    #[error("invalid amount '{input}': expected a non-negative whole number")]
    InvalidAmount { input: String },

    /// Planet cannot absorb the requested allocation increase
    #[error("insufficient capacity: {requested} more spaces requested, {available} available")]
    InsufficientCapacity { requested: u32, available: u32 },

    /// Balance too low for a removal or trade
    #[error("insufficient {currency}: have {balance}, need {required}")]
    InsufficientFunds {
        currency: Currency,
        balance: u64,
        required: u64,
    },

    /// A single trade may move at most a third of current holdings. This
    /// refines `InsufficientFunds`: the House holds the amount but may not
    /// spend that much in one trade. `is_funds_shortfall` covers both.
    #[error("trade of {requested} {currency} exceeds the limit of {limit} (one third of holdings)")]
    TradeLimitExceeded {
        currency: Currency,
        requested: u64,
        limit: u64,
    },

    /// Trade amount rounds down to zero gained units
    #[error("trade of {offered} {currency} is too small: need at least {minimum}")]
    BelowMinimumTrade {
        currency: Currency,
        offered: u64,
        minimum: u64,
    },

    #[error("{house} holds no spaces on {planet}")]
    NoAllocation { house: HouseId, planet: PlanetId },

    /// Capacity reduction would strand existing claims
    #[error("cannot reduce capacity to {requested}: {allocated} spaces allocated, free {must_free} first")]
    WouldOrphanAllocations {
        allocated: u32,
        requested: u32,
        must_free: u32,
    },

    #[error("unknown house: {0}")]
    UnknownHouse(String),

    #[error("unknown planet: {0}")]
    UnknownPlanet(String),

    #[error("a {kind} named '{name}' already exists")]
    DuplicateName { kind: &'static str, name: String },
}

impl LedgerError {
    pub fn invalid_amount(input: impl ToString) -> Self {
        LedgerError::InvalidAmount {
            input: input.to_string(),
        }
    }

    /// True for `InsufficientFunds` and its refinement `TradeLimitExceeded`.
    pub fn is_funds_shortfall(&self) -> bool {
        matches!(
            self,
            LedgerError::InsufficientFunds { .. } | LedgerError::TradeLimitExceeded { .. }
        )
    }

    /// Stable short code for structured logs
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::Validation(_) => "validation",
            LedgerError::InvalidAmount { .. } => "invalid_amount",
            LedgerError::InsufficientCapacity { .. } => "insufficient_capacity",
            LedgerError::InsufficientFunds { .. } => "insufficient_funds",
            LedgerError::TradeLimitExceeded { .. } => "trade_limit_exceeded",
            LedgerError::BelowMinimumTrade { .. } => "below_minimum_trade",
            LedgerError::NoAllocation { .. } => "no_allocation",
            LedgerError::WouldOrphanAllocations { .. } => "would_orphan_allocations",
            LedgerError::UnknownHouse(_) => "unknown_house",
            LedgerError::UnknownPlanet(_) => "unknown_planet",
            LedgerError::DuplicateName { .. } => "duplicate_name",
        }
    }
}
