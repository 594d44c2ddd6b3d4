//! End-to-end scenarios through the registry surface.

use landsraad::domain::DomainRank;
use landsraad::house::{HouseRole, HouseTier};
use landsraad::income::Income;
use landsraad::planet::PlanetKind;
use landsraad::reputation::{effects, reputation_tier, Reputation};
use landsraad::treasury::Balances;
use landsraad::{LedgerError, Registry};

#[test]
fn minor_house_status_rises_into_strong() {
    let reg = Registry::new();
    let h = reg.create_house("Moritani", HouseTier::Minor).unwrap();

    let change = reg.set_status(h, 25).unwrap();
    assert_eq!(change.new, Reputation::Respected);

    let change = reg.adjust_status(h, 20).unwrap();
    assert_eq!((change.old_status, change.new_status), (25, 45));
    assert_eq!(change.old, Reputation::Respected);
    assert_eq!(change.new, Reputation::Strong);
    assert!(change.tier_changed());
    let msg = change.message();
    assert!(msg.contains("Respected") && msg.contains("Strong"), "{}", msg);

    let (rep, effect) = reg.reputation(h).unwrap();
    assert_eq!(rep, Reputation::Strong);
    assert_eq!(effect.difficulty_modifier, -1);
    assert_eq!(effect.text, "-1 difficulty on House actions");
}

#[test]
fn status_bounds() {
    let reg = Registry::new();
    let h = reg.create_house("Vernius", HouseTier::Major).unwrap();
    assert!(matches!(reg.set_status(h, -1), Err(LedgerError::Validation(_))));
    assert!(matches!(reg.set_status(h, 101), Err(LedgerError::Validation(_))));
    assert_eq!(reg.adjust_status(h, 500).unwrap().new_status, 100);
    assert_eq!(reg.adjust_status(h, -500).unwrap().new_status, 0);
}

#[test]
fn reputation_is_monotonic_for_every_tier() {
    for tier in [HouseTier::Nascent, HouseTier::Minor, HouseTier::Major, HouseTier::Great] {
        let mut last = reputation_tier(0, tier);
        for status in 1..=100u8 {
            let rep = reputation_tier(status, tier);
            assert!(rep >= last, "{:?} dropped at status {}", tier, status);
            last = rep;
        }
        assert_eq!(last, Reputation::Dangerous);
    }
    assert_eq!(reputation_tier(45, HouseTier::Nascent), reputation_tier(45, HouseTier::Minor));
    let danger = effects(Reputation::Dangerous);
    assert_eq!(danger.threat_per_action, 1);
    assert!(danger.text.contains("+1 Threat per House action"));
}

#[test]
fn second_house_cannot_overfill_planet() {
    let reg = Registry::new();
    let a = reg.create_house("Atreides", HouseTier::Major).unwrap();
    let b = reg.create_house("Harkonnen", HouseTier::Major).unwrap();
    let p = reg.create_planet("Caladan", PlanetKind::Planet).unwrap();

    let out = reg.allocate(a, p, 60).unwrap();
    assert_eq!(out.available, 20);
    assert_eq!(reg.available_spaces(p).unwrap(), 20);

    let err = reg.allocate_str(b, p, "25").unwrap_err();
    assert_eq!(
        err,
        LedgerError::InsufficientCapacity {
            requested: 25,
            available: 20
        }
    );
    assert!(err.to_string().contains("20 available"));
    assert!(reg.house(b).unwrap().space_claims().is_empty());
    assert_eq!(reg.available_spaces(p).unwrap(), 20);
}

#[test]
fn shrinking_planet_below_allocations_is_refused() {
    let reg = Registry::new();
    let a = reg.create_house("Atreides", HouseTier::Major).unwrap();
    let p = reg.create_planet("Caladan", PlanetKind::Planet).unwrap();
    reg.allocate(a, p, 60).unwrap();

    let err = reg.set_total_spaces(p, 50).unwrap_err();
    assert_eq!(
        err,
        LedgerError::WouldOrphanAllocations {
            allocated: 60,
            requested: 50,
            must_free: 10
        }
    );
    assert!(err.to_string().contains("free 10 first"));
    assert_eq!(reg.planet(p).unwrap().total_spaces(), 80);

    reg.allocate(a, p, 50).unwrap();
    assert_eq!(reg.set_total_spaces(p, 50).unwrap(), 80);
    assert_eq!(reg.available_spaces(p).unwrap(), 0);
}

#[test]
fn trading_wealth_keeps_the_remainder() {
    let reg = Registry::new();
    let h = reg.create_house("Ginaz", HouseTier::Minor).unwrap();
    reg.add_wealth(h, 27).unwrap();
    let r = reg.trade_wealth_for_resources(h, 9).unwrap();
    assert_eq!(r.balances, Balances { wealth: 18, resources: 3 });

    let g = reg.create_house("Ix", HouseTier::Minor).unwrap();
    reg.add_wealth(g, 30).unwrap();
    let r = reg.trade_wealth_for_resources(g, 10).unwrap();
    assert_eq!((r.requested, r.deducted, r.gained), (10, 9, 3));
    assert_eq!(reg.balances(g).unwrap(), Balances { wealth: 21, resources: 3 });

    let err = reg.trade_wealth_for_resources(g, 8).unwrap_err();
    assert!(matches!(err, LedgerError::TradeLimitExceeded { limit: 7, .. }));
}

#[test]
fn domain_income_with_modifiers_and_floor() {
    let reg = Registry::new();
    let h = reg.create_house("Richese", HouseTier::Great).unwrap();
    reg.claim_domain(h, DomainRank::Primary, "Artistic", "Expertise", "court music")
        .unwrap();
    assert_eq!(reg.income(h).unwrap(), Income::new(3, 52));

    // 4 resources - 3 floors at 2
    reg.claim_domain(h, DomainRank::Primary, "Political", "Understanding", "")
        .unwrap();
    let yields = reg.income_breakdown(h).unwrap();
    assert_eq!(yields[1].income, Income::new(2, 56));
    assert_eq!(reg.income(h).unwrap(), Income::new(5, 108));

    reg.set_role_filled(h, HouseRole::Treasurer, true).unwrap();
    let (income, balances) = reg.collect_income(h).unwrap();
    assert_eq!(income, Income::new(5, 118));
    assert_eq!(balances, Balances { wealth: 118, resources: 5 });
}

#[test]
fn domain_limits_follow_tier() {
    let reg = Registry::new();
    let h = reg.create_house("Ordos", HouseTier::Nascent).unwrap();
    assert!(matches!(
        reg.claim_domain(h, DomainRank::Primary, "Industrial", "Machinery", ""),
        Err(LedgerError::Validation(_))
    ));
    assert!(matches!(
        reg.claim_domain(h, DomainRank::Secondary, "Industrial", "Gears", ""),
        Err(LedgerError::Validation(_))
    ));
    reg.claim_domain(h, DomainRank::Secondary, "Industrial", "Machinery", "")
        .unwrap();

    assert_eq!(reg.set_tier(h, HouseTier::Major).unwrap(), HouseTier::Nascent);
    reg.claim_domain(h, DomainRank::Primary, "Military", "Workers", "").unwrap();
    reg.claim_domain(h, DomainRank::Secondary, "Farming", "Produce", "").unwrap();
    assert_eq!(reg.space_report(h).unwrap().required, 45);

    // two secondaries do not fit a Minor house
    assert!(matches!(reg.set_tier(h, HouseTier::Minor), Err(LedgerError::Validation(_))));
    let released = reg.release_domain(h, DomainRank::Secondary, 1).unwrap();
    assert_eq!(released.area, "Farming");
    reg.set_tier(h, HouseTier::Minor).unwrap();
    assert!(reg.audit().is_empty());
}

#[test]
fn deficit_is_informational() {
    let reg = Registry::new();
    let h = reg.create_house("Tleilax", HouseTier::Major).unwrap();
    let p = reg.create_planet("Tleilax IV", PlanetKind::Moon).unwrap();
    reg.claim_domain(h, DomainRank::Primary, "Science", "Understanding", "").unwrap();
    reg.allocate(h, p, 10).unwrap();
    let report = reg.space_report(h).unwrap();
    assert_eq!((report.controlled, report.required, report.surplus), (10, 25, -15));
    assert!(report.in_deficit());
    // allocation never consults the deficit
    reg.allocate(h, p, 5).unwrap();
    assert_eq!(reg.deallocate(h, p).unwrap(), 5);
    assert!(matches!(reg.deallocate(h, p), Err(LedgerError::NoAllocation { .. })));
}
