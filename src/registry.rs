//! Directory of every House and Planet, and the callable surface over them.
//!
//! All aggregates sit behind one mutex. Each method takes the lock once, so
//! a ledger operation that touches a House and a Planet is observed by other
//! threads either fully applied or not at all.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use anyhow::{bail, Context};
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::domain::{DomainClaim, DomainRank};
use crate::error::{LedgerError, LedgerResult};
use crate::house::{House, HouseId, HouseRole, HouseTier};
use crate::income::{breakdown, income_for, DomainYield, Income};
use crate::ledger::{self, parse_amount, Allocation, SpaceReport};
use crate::logging::{
    log_allocation, log_audit, log_capacity_change, log_domain_change, log_invariant_violation,
    log_lifecycle, log_rejected, log_reputation_change, log_trade, log_treasury, v_str, Domain,
    ProfileScope,
};
use crate::planet::{Planet, PlanetId, PlanetKind};
use crate::reputation::{self, effects, Reputation, ReputationChange, ReputationEffect};
use crate::state::Config;
use crate::storage::{RecordKind, RecordStore};
use crate::treasury::{self, Balances, Currency, TradeReceipt};
use crate::verify::invariants::{audit_ledger, InvariantViolation};

#[derive(Debug, Default)]
struct Directory {
    next_id: u64,
    houses: BTreeMap<HouseId, House>,
    planets: BTreeMap<PlanetId, Planet>,
    house_names: HashMap<String, HouseId>,
    planet_names: HashMap<String, PlanetId>,
}

impl Directory {
    fn issue_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn house(&self, id: HouseId) -> LedgerResult<&House> {
        self.houses.get(&id).ok_or_else(|| LedgerError::UnknownHouse(id.to_string()))
    }

    fn house_mut(&mut self, id: HouseId) -> LedgerResult<&mut House> {
        self.houses
            .get_mut(&id)
            .ok_or_else(|| LedgerError::UnknownHouse(id.to_string()))
    }

    fn planet(&self, id: PlanetId) -> LedgerResult<&Planet> {
        self.planets
            .get(&id)
            .ok_or_else(|| LedgerError::UnknownPlanet(id.to_string()))
    }

    fn planet_mut(&mut self, id: PlanetId) -> LedgerResult<&mut Planet> {
        self.planets
            .get_mut(&id)
            .ok_or_else(|| LedgerError::UnknownPlanet(id.to_string()))
    }

    fn pair_mut(&mut self, house: HouseId, planet: PlanetId) -> LedgerResult<(&mut House, &mut Planet)> {
        let h = self
            .houses
            .get_mut(&house)
            .ok_or_else(|| LedgerError::UnknownHouse(house.to_string()))?;
        let p = self
            .planets
            .get_mut(&planet)
            .ok_or_else(|| LedgerError::UnknownPlanet(planet.to_string()))?;
        Ok((h, p))
    }
}

/// Read-only view of a House with everything derived from it.
#[derive(Debug, Clone, Serialize)]
pub struct HouseSnapshot {
    pub house: House,
    pub reputation: Reputation,
    pub effects: ReputationEffect,
    pub income: Income,
    pub yields: Vec<DomainYield>,
    pub space: SpaceReport,
    pub state_hash: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanetSnapshot {
    pub planet: Planet,
    pub allocated: u64,
    pub available: u32,
    pub state_hash: String,
}

fn sha256_hex<T: Serialize>(value: &T) -> String {
    let mut hasher = Sha256::new();
    // Serializing plain structs and BTreeMaps cannot fail.
    if let Ok(bytes) = serde_json::to_vec(value) {
        hasher.update(&bytes);
    }
    hex::encode(hasher.finalize())
}

fn normalize_name(kind: &str, name: &str) -> LedgerResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LedgerError::Validation(format!("{} name must not be empty", kind)));
    }
    Ok(name.to_string())
}

fn observe<T>(domain: Domain, op: &str, result: LedgerResult<T>) -> LedgerResult<T> {
    if let Err(err) = &result {
        log_rejected(domain, op, err.code(), &err.to_string());
    }
    result
}

pub struct Registry {
    config: Config,
    dir: Mutex<Directory>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::from_config(Config::default())
    }

    pub fn from_config(config: Config) -> Self {
        Self {
            config,
            dir: Mutex::new(Directory::default()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Directory> {
        // Mutations validate before writing, so a poisoned guard still holds
        // a consistent directory.
        self.dir.lock().unwrap_or_else(|p| p.into_inner())
    }

    // ---------------------------------------------------------------------
    // Lifecycle and lookup
    // ---------------------------------------------------------------------

    pub fn create_house(&self, name: &str, tier: HouseTier) -> LedgerResult<HouseId> {
        observe(Domain::Registry, "create_house", self.insert_house(name, tier))
    }

    fn insert_house(&self, name: &str, tier: HouseTier) -> LedgerResult<HouseId> {
        let name = normalize_name("house", name)?;
        let mut dir = self.lock();
        if dir.house_names.contains_key(&name) {
            return Err(LedgerError::DuplicateName { kind: "house", name });
        }
        let id = HouseId(dir.issue_id());
        dir.house_names.insert(name.clone(), id);
        dir.houses.insert(id, House::new(id, name.clone(), tier));
        log_lifecycle("create", "house", id.0, &name);
        Ok(id)
    }

    pub fn create_planet(&self, name: &str, kind: PlanetKind) -> LedgerResult<PlanetId> {
        self.create_planet_with_spaces(name, kind, i64::from(self.config.default_spaces(kind)))
    }

    pub fn create_planet_with_spaces(&self, name: &str, kind: PlanetKind, total: i64) -> LedgerResult<PlanetId> {
        observe(Domain::Registry, "create_planet", self.insert_planet(name, kind, total))
    }

    fn insert_planet(&self, name: &str, kind: PlanetKind, total: i64) -> LedgerResult<PlanetId> {
        let name = normalize_name("planet", name)?;
        let total = u32::try_from(total).map_err(|_| LedgerError::invalid_amount(total))?;
        let mut dir = self.lock();
        if dir.planet_names.contains_key(&name) {
            return Err(LedgerError::DuplicateName { kind: "planet", name });
        }
        let id = PlanetId(dir.issue_id());
        dir.planet_names.insert(name.clone(), id);
        dir.planets.insert(id, Planet::new(id, name.clone(), kind, total));
        log_lifecycle("create", "planet", id.0, &name);
        Ok(id)
    }

    /// Remove a House and every allocation it holds on any Planet.
    pub fn destroy_house(&self, id: HouseId) -> LedgerResult<House> {
        let mut dir = self.lock();
        let house = observe(
            Domain::Registry,
            "destroy_house",
            dir.houses.remove(&id).ok_or_else(|| LedgerError::UnknownHouse(id.to_string())),
        )?;
        dir.house_names.remove(&house.name);
        for planet_id in house.space_claims().keys() {
            if let Some(planet) = dir.planets.get_mut(planet_id) {
                planet.allocations.remove(&id);
            }
        }
        log_lifecycle("destroy", "house", id.0, &house.name);
        Ok(house)
    }

    /// Remove a Planet and every House claim pointing at it.
    pub fn destroy_planet(&self, id: PlanetId) -> LedgerResult<Planet> {
        let mut dir = self.lock();
        let planet = observe(
            Domain::Registry,
            "destroy_planet",
            dir.planets.remove(&id).ok_or_else(|| LedgerError::UnknownPlanet(id.to_string())),
        )?;
        dir.planet_names.remove(&planet.name);
        for house_id in planet.allocations().keys() {
            if let Some(house) = dir.houses.get_mut(house_id) {
                house.space_claims.remove(&id);
            }
        }
        log_lifecycle("destroy", "planet", id.0, &planet.name);
        Ok(planet)
    }

    pub fn find_house(&self, name: &str) -> LedgerResult<HouseId> {
        self.lock()
            .house_names
            .get(name)
            .copied()
            .ok_or_else(|| LedgerError::UnknownHouse(name.to_string()))
    }

    pub fn find_planet(&self, name: &str) -> LedgerResult<PlanetId> {
        self.lock()
            .planet_names
            .get(name)
            .copied()
            .ok_or_else(|| LedgerError::UnknownPlanet(name.to_string()))
    }

    pub fn house_ids(&self) -> Vec<HouseId> {
        self.lock().houses.keys().copied().collect()
    }

    pub fn planet_ids(&self) -> Vec<PlanetId> {
        self.lock().planets.keys().copied().collect()
    }

    pub fn house(&self, id: HouseId) -> LedgerResult<House> {
        self.lock().house(id).cloned()
    }

    pub fn planet(&self, id: PlanetId) -> LedgerResult<Planet> {
        self.lock().planet(id).cloned()
    }

    pub fn house_snapshot(&self, id: HouseId) -> LedgerResult<HouseSnapshot> {
        let dir = self.lock();
        let house = dir.house(id)?;
        let rep = reputation::current(house);
        Ok(HouseSnapshot {
            reputation: rep,
            effects: effects(rep),
            income: income_for(house),
            yields: breakdown(house),
            space: ledger::space_report(house),
            state_hash: sha256_hex(house),
            house: house.clone(),
        })
    }

    pub fn planet_snapshot(&self, id: PlanetId) -> LedgerResult<PlanetSnapshot> {
        let dir = self.lock();
        let planet = dir.planet(id)?;
        Ok(PlanetSnapshot {
            allocated: planet.allocated(),
            available: planet.available(),
            state_hash: sha256_hex(planet),
            planet: planet.clone(),
        })
    }

    // ---------------------------------------------------------------------
    // Reputation
    // ---------------------------------------------------------------------

    pub fn reputation(&self, id: HouseId) -> LedgerResult<(Reputation, ReputationEffect)> {
        let dir = self.lock();
        let rep = reputation::current(dir.house(id)?);
        Ok((rep, effects(rep)))
    }

    pub fn set_status(&self, id: HouseId, value: i64) -> LedgerResult<ReputationChange> {
        let mut dir = self.lock();
        let result = dir.house_mut(id).and_then(|h| reputation::set_status(h, value));
        let change = observe(Domain::Reputation, "set_status", result)?;
        Self::report_change(id, &change);
        Ok(change)
    }

    pub fn adjust_status(&self, id: HouseId, delta: i64) -> LedgerResult<ReputationChange> {
        let mut dir = self.lock();
        let result = dir.house_mut(id).map(|h| reputation::adjust_status(h, delta));
        let change = observe(Domain::Reputation, "adjust_status", result)?;
        Self::report_change(id, &change);
        Ok(change)
    }

    fn report_change(id: HouseId, change: &ReputationChange) {
        log_reputation_change(
            id.0,
            change.old_status,
            change.new_status,
            change.old.as_str(),
            change.new.as_str(),
        );
    }

    // ---------------------------------------------------------------------
    // Domains, tier, roles
    // ---------------------------------------------------------------------

    /// Returns the index of the new claim within its rank.
    pub fn claim_domain(
        &self,
        id: HouseId,
        rank: DomainRank,
        area: &str,
        subtype: &str,
        description: &str,
    ) -> LedgerResult<usize> {
        let mut dir = self.lock();
        let result = DomainClaim::new(area, subtype, description)
            .and_then(|claim| dir.house_mut(id).and_then(|h| h.claim_domain(rank, claim)));
        let index = observe(Domain::Domains, "claim_domain", result)?;
        log_domain_change(
            id.0,
            "claim_domain",
            &[
                ("rank", v_str(rank.as_str())),
                ("area", v_str(area.trim())),
                ("subtype", v_str(subtype.trim())),
            ],
        );
        Ok(index)
    }

    pub fn release_domain(&self, id: HouseId, rank: DomainRank, index: usize) -> LedgerResult<DomainClaim> {
        let mut dir = self.lock();
        let result = dir.house_mut(id).and_then(|h| h.release_domain(rank, index));
        let claim = observe(Domain::Domains, "release_domain", result)?;
        log_domain_change(
            id.0,
            "release_domain",
            &[("rank", v_str(rank.as_str())), ("area", v_str(&claim.area))],
        );
        Ok(claim)
    }

    /// Returns the previous tier.
    pub fn set_tier(&self, id: HouseId, tier: HouseTier) -> LedgerResult<HouseTier> {
        let mut dir = self.lock();
        let result = dir.house_mut(id).and_then(|h| h.set_tier(tier));
        let previous = observe(Domain::Domains, "set_tier", result)?;
        log_domain_change(
            id.0,
            "set_tier",
            &[("previous", v_str(previous.as_str())), ("current", v_str(tier.as_str()))],
        );
        Ok(previous)
    }

    /// Returns whether the role set changed.
    pub fn set_role_filled(&self, id: HouseId, role: HouseRole, filled: bool) -> LedgerResult<bool> {
        let mut dir = self.lock();
        let changed = observe(Domain::Domains, "set_role", dir.house_mut(id))?.set_role_filled(role, filled);
        log_domain_change(
            id.0,
            "set_role",
            &[("role", json!(role)), ("filled", json!(filled))],
        );
        Ok(changed)
    }

    // ---------------------------------------------------------------------
    // Income
    // ---------------------------------------------------------------------

    pub fn income(&self, id: HouseId) -> LedgerResult<Income> {
        self.lock().house(id).map(income_for)
    }

    pub fn income_breakdown(&self, id: HouseId) -> LedgerResult<Vec<DomainYield>> {
        self.lock().house(id).map(breakdown)
    }

    pub fn collect_income(&self, id: HouseId) -> LedgerResult<(Income, Balances)> {
        let mut dir = self.lock();
        let result = dir.house_mut(id).and_then(treasury::collect_income);
        let (income, balances) = observe(Domain::Treasury, "collect_income", result)?;
        log_treasury(id.0, "collect_income", income.wealth, balances.wealth, balances.resources);
        Ok((income, balances))
    }

    // ---------------------------------------------------------------------
    // Space ledger
    // ---------------------------------------------------------------------

    pub fn allocate(&self, house: HouseId, planet: PlanetId, spaces: i64) -> LedgerResult<Allocation> {
        let mut dir = self.lock();
        let result = dir
            .pair_mut(house, planet)
            .and_then(|(h, p)| ledger::allocate(h, p, spaces));
        let out = observe(Domain::Ledger, "allocate", result)?;
        log_allocation(house.0, planet.0, out.previous, out.current, out.available);
        Ok(out)
    }

    /// Same as [`Registry::allocate`] for caller-supplied text.
    pub fn allocate_str(&self, house: HouseId, planet: PlanetId, spaces: &str) -> LedgerResult<Allocation> {
        let spaces = observe(Domain::Ledger, "allocate", parse_amount(spaces))?;
        self.allocate(house, planet, spaces)
    }

    pub fn deallocate(&self, house: HouseId, planet: PlanetId) -> LedgerResult<u32> {
        let mut dir = self.lock();
        let result = dir
            .pair_mut(house, planet)
            .and_then(|(h, p)| ledger::deallocate(h, p).map(|freed| (freed, p.available())));
        let (freed, available) = observe(Domain::Ledger, "deallocate", result)?;
        log_allocation(house.0, planet.0, freed, 0, available);
        Ok(freed)
    }

    pub fn set_total_spaces(&self, planet: PlanetId, total: i64) -> LedgerResult<u32> {
        let mut dir = self.lock();
        let result = dir.planet_mut(planet).and_then(|p| {
            ledger::set_total_spaces(p, total).map(|prev| (prev, p.total_spaces(), p.allocated()))
        });
        let (previous, current, allocated) = observe(Domain::Ledger, "set_total_spaces", result)?;
        log_capacity_change(planet.0, previous, current, allocated);
        Ok(previous)
    }

    pub fn space_report(&self, id: HouseId) -> LedgerResult<SpaceReport> {
        self.lock().house(id).map(ledger::space_report)
    }

    pub fn available_spaces(&self, id: PlanetId) -> LedgerResult<u32> {
        self.lock().planet(id).map(ledger::available_spaces)
    }

    // ---------------------------------------------------------------------
    // Treasury
    // ---------------------------------------------------------------------

    pub fn balances(&self, id: HouseId) -> LedgerResult<Balances> {
        self.lock().house(id).map(Balances::of)
    }

    fn move_funds(&self, id: HouseId, currency: Currency, amount: i64, credit: bool) -> LedgerResult<Balances> {
        let op = match (credit, currency) {
            (true, Currency::Wealth) => "add_wealth",
            (true, Currency::Resources) => "add_resources",
            (false, Currency::Wealth) => "remove_wealth",
            (false, Currency::Resources) => "remove_resources",
        };
        let mut dir = self.lock();
        let result = dir.house_mut(id).and_then(|h| {
            if credit {
                treasury::deposit(h, currency, amount)
            } else {
                treasury::withdraw(h, currency, amount)
            }
        });
        let balances = observe(Domain::Treasury, op, result)?;
        log_treasury(id.0, op, amount.unsigned_abs(), balances.wealth, balances.resources);
        Ok(balances)
    }

    pub fn add_wealth(&self, id: HouseId, amount: i64) -> LedgerResult<Balances> {
        self.move_funds(id, Currency::Wealth, amount, true)
    }

    pub fn add_resources(&self, id: HouseId, amount: i64) -> LedgerResult<Balances> {
        self.move_funds(id, Currency::Resources, amount, true)
    }

    pub fn remove_wealth(&self, id: HouseId, amount: i64) -> LedgerResult<Balances> {
        self.move_funds(id, Currency::Wealth, amount, false)
    }

    pub fn remove_resources(&self, id: HouseId, amount: i64) -> LedgerResult<Balances> {
        self.move_funds(id, Currency::Resources, amount, false)
    }

    pub fn trade_wealth_for_resources(&self, id: HouseId, wealth: i64) -> LedgerResult<TradeReceipt> {
        let mut dir = self.lock();
        let result = dir
            .house_mut(id)
            .and_then(|h| treasury::trade_wealth_for_resources(h, wealth));
        let receipt = observe(Domain::Treasury, "trade_wealth_for_resources", result)?;
        Self::report_trade(id, &receipt);
        Ok(receipt)
    }

    pub fn trade_resources_for_wealth(&self, id: HouseId, resources: i64) -> LedgerResult<TradeReceipt> {
        let mut dir = self.lock();
        let result = dir
            .house_mut(id)
            .and_then(|h| treasury::trade_resources_for_wealth(h, resources));
        let receipt = observe(Domain::Treasury, "trade_resources_for_wealth", result)?;
        Self::report_trade(id, &receipt);
        Ok(receipt)
    }

    fn report_trade(id: HouseId, r: &TradeReceipt) {
        log_trade(id.0, r.spent.as_str(), r.requested, r.deducted, r.gained);
    }

    // ---------------------------------------------------------------------
    // Audit and persistence
    // ---------------------------------------------------------------------

    /// Every ledger inconsistency currently present. Empty when healthy.
    pub fn audit(&self) -> Vec<InvariantViolation> {
        let _scope = ProfileScope::new("registry_audit");
        let dir = self.lock();
        let found = audit_ledger(&dir.houses, &dir.planets);
        for v in &found {
            log_invariant_violation(&format!("{:?}", v.kind), &v.msg);
        }
        found
    }

    /// sha256 over the canonical JSON of every aggregate.
    pub fn state_hash(&self) -> String {
        let dir = self.lock();
        sha256_hex(&(&dir.houses, &dir.planets))
    }

    /// Write every aggregate to `store` in one batch. Returns the state hash.
    pub fn save_to(&self, store: &mut dyn RecordStore) -> anyhow::Result<String> {
        let _scope = ProfileScope::new("registry_save");
        let dir = self.lock();
        let mut records = Vec::with_capacity(dir.houses.len() + dir.planets.len());
        for (id, house) in &dir.houses {
            records.push((RecordKind::House, id.0.to_string(), serde_json::to_value(house)?));
        }
        for (id, planet) in &dir.planets {
            records.push((RecordKind::Planet, id.0.to_string(), serde_json::to_value(planet)?));
        }
        store.replace_all(&[RecordKind::House, RecordKind::Planet], &records)?;
        let hash = sha256_hex(&(&dir.houses, &dir.planets));
        log_audit("save", &hash, dir.houses.len(), dir.planets.len());
        Ok(hash)
    }

    /// Rebuild a registry from `store`. Data that breaks the ledger contract
    /// is rejected rather than repaired.
    pub fn load_from(config: Config, store: &dyn RecordStore) -> anyhow::Result<Self> {
        let _scope = ProfileScope::new("registry_load");
        let mut dir = Directory::default();

        for key in store.keys(RecordKind::House)? {
            let Some(body) = store.get(RecordKind::House, &key)? else {
                continue;
            };
            let house: House =
                serde_json::from_value(body).with_context(|| format!("decoding house record {}", key))?;
            if house.id.0.to_string() != key {
                bail!("house record {} carries id {}", key, house.id);
            }
            if dir.house_names.insert(house.name.clone(), house.id).is_some() {
                bail!("duplicate house name '{}'", house.name);
            }
            dir.next_id = dir.next_id.max(house.id.0);
            dir.houses.insert(house.id, house);
        }

        for key in store.keys(RecordKind::Planet)? {
            let Some(body) = store.get(RecordKind::Planet, &key)? else {
                continue;
            };
            let planet: Planet =
                serde_json::from_value(body).with_context(|| format!("decoding planet record {}", key))?;
            if planet.id.0.to_string() != key {
                bail!("planet record {} carries id {}", key, planet.id);
            }
            if dir.planet_names.insert(planet.name.clone(), planet.id).is_some() {
                bail!("duplicate planet name '{}'", planet.name);
            }
            dir.next_id = dir.next_id.max(planet.id.0);
            dir.planets.insert(planet.id, planet);
        }

        let violations = audit_ledger(&dir.houses, &dir.planets);
        if !violations.is_empty() {
            for v in &violations {
                log_invariant_violation(&format!("{:?}", v.kind), &v.msg);
            }
            bail!(
                "stored ledger is inconsistent ({} violations): {}",
                violations.len(),
                violations[0].msg
            );
        }

        let hash = sha256_hex(&(&dir.houses, &dir.planets));
        log_audit("load", &hash, dir.houses.len(), dir.planets.len());
        Ok(Self {
            config,
            dir: Mutex::new(dir),
        })
    }
}
