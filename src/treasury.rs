//! House treasury: wealth and resource balances, trades and income collection.
//!
//! Trades convert at 3 wealth per resource in both directions, and a single
//! trade may move at most a third of the holdings being spent.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::house::House;
use crate::income::{income_for, Income};

pub const TRADE_RATE: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Wealth,
    Resources,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Wealth => "wealth",
            Currency::Resources => "resources",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    pub wealth: u64,
    pub resources: u64,
}

impl Balances {
    pub fn of(house: &House) -> Self {
        Self {
            wealth: house.wealth,
            resources: house.resources,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TradeReceipt {
    pub spent: Currency,
    pub requested: u64,
    /// Actually deducted; may be less than requested
    pub deducted: u64,
    pub gained: u64,
    pub balances: Balances,
}

fn balance(house: &House, currency: Currency) -> u64 {
    match currency {
        Currency::Wealth => house.wealth,
        Currency::Resources => house.resources,
    }
}

fn balance_mut(house: &mut House, currency: Currency) -> &mut u64 {
    match currency {
        Currency::Wealth => &mut house.wealth,
        Currency::Resources => &mut house.resources,
    }
}

fn non_negative(amount: i64) -> LedgerResult<u64> {
    u64::try_from(amount).map_err(|_| LedgerError::invalid_amount(amount))
}

pub fn deposit(house: &mut House, currency: Currency, amount: i64) -> LedgerResult<Balances> {
    let amount = non_negative(amount)?;
    let slot = balance_mut(house, currency);
    *slot = slot
        .checked_add(amount)
        .ok_or_else(|| LedgerError::Validation(format!("{} balance would overflow", currency)))?;
    Ok(Balances::of(house))
}

pub fn withdraw(house: &mut House, currency: Currency, amount: i64) -> LedgerResult<Balances> {
    let amount = non_negative(amount)?;
    let held = balance(house, currency);
    if amount > held {
        return Err(LedgerError::InsufficientFunds {
            currency,
            balance: held,
            required: amount,
        });
    }
    *balance_mut(house, currency) = held - amount;
    Ok(Balances::of(house))
}

pub fn add_wealth(house: &mut House, amount: i64) -> LedgerResult<Balances> {
    deposit(house, Currency::Wealth, amount)
}

pub fn add_resources(house: &mut House, amount: i64) -> LedgerResult<Balances> {
    deposit(house, Currency::Resources, amount)
}

pub fn remove_wealth(house: &mut House, amount: i64) -> LedgerResult<Balances> {
    withdraw(house, Currency::Wealth, amount)
}

pub fn remove_resources(house: &mut House, amount: i64) -> LedgerResult<Balances> {
    withdraw(house, Currency::Resources, amount)
}

/// Checks shared by both trade directions: positive, covered, within the cap.
fn check_trade(house: &House, currency: Currency, amount: i64) -> LedgerResult<u64> {
    if amount <= 0 {
        return Err(LedgerError::invalid_amount(amount));
    }
    let amount = amount as u64;
    let held = balance(house, currency);
    if amount > held {
        return Err(LedgerError::InsufficientFunds {
            currency,
            balance: held,
            required: amount,
        });
    }
    let limit = held / TRADE_RATE;
    if amount > limit {
        return Err(LedgerError::TradeLimitExceeded {
            currency,
            requested: amount,
            limit,
        });
    }
    Ok(amount)
}

/// Spend wealth for resources at 3:1. Only whole resources are bought; the
/// part of the request below the next multiple of 3 stays in the treasury.
pub fn trade_wealth_for_resources(house: &mut House, wealth_amount: i64) -> LedgerResult<TradeReceipt> {
    let requested = check_trade(house, Currency::Wealth, wealth_amount)?;
    let gained = requested / TRADE_RATE;
    if gained == 0 {
        return Err(LedgerError::BelowMinimumTrade {
            currency: Currency::Wealth,
            offered: requested,
            minimum: TRADE_RATE,
        });
    }
    let deducted = gained * TRADE_RATE;
    let resources = house
        .resources
        .checked_add(gained)
        .ok_or_else(|| LedgerError::Validation("resources balance would overflow".to_string()))?;
    house.wealth -= deducted;
    house.resources = resources;
    Ok(TradeReceipt {
        spent: Currency::Wealth,
        requested,
        deducted,
        gained,
        balances: Balances::of(house),
    })
}

/// Spend resources for wealth at 1:3. Exact in this direction.
pub fn trade_resources_for_wealth(house: &mut House, resource_amount: i64) -> LedgerResult<TradeReceipt> {
    let requested = check_trade(house, Currency::Resources, resource_amount)?;
    let gained = requested
        .checked_mul(TRADE_RATE)
        .and_then(|g| house.wealth.checked_add(g).map(|_| g))
        .ok_or_else(|| LedgerError::Validation("wealth balance would overflow".to_string()))?;
    house.resources -= requested;
    house.wealth += gained;
    Ok(TradeReceipt {
        spent: Currency::Resources,
        requested,
        deducted: requested,
        gained,
        balances: Balances::of(house),
    })
}

/// Credit one cycle of domain income to the treasury.
pub fn collect_income(house: &mut House) -> LedgerResult<(Income, Balances)> {
    let income = income_for(house);
    let wealth = house.wealth.checked_add(income.wealth);
    let resources = house.resources.checked_add(income.resources);
    match (wealth, resources) {
        (Some(wealth), Some(resources)) => {
            house.wealth = wealth;
            house.resources = resources;
            Ok((income, Balances::of(house)))
        }
        _ => Err(LedgerError::Validation("treasury balance would overflow".to_string())),
    }
}
