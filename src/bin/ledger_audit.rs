//! Load a stored ledger, verify it and print a per-entity report.
//!
//! Usage: ledger_audit [sqlite_path]   (defaults to SQLITE_PATH)

use anyhow::Result;

use landsraad::logging::{log, obj, v_str, Domain, Level};
use landsraad::registry::Registry;
use landsraad::state::Config;
use landsraad::storage::SqliteStore;

fn main() -> Result<()> {
    let cfg = Config::from_env();
    let path = std::env::args().nth(1).unwrap_or_else(|| cfg.sqlite_path.clone());
    log(Level::Info, Domain::System, "audit_start", obj(&[("path", v_str(&path))]));

    let store = SqliteStore::new(&path)?;
    // load_from already refuses data that breaks the ledger contract
    let registry = match Registry::load_from(cfg, &store) {
        Ok(r) => r,
        Err(err) => {
            eprintln!("FAIL {}: {:#}", path, err);
            std::process::exit(1);
        }
    };

    println!("=== LEDGER AUDIT: {} ===\n", path);
    println!(
        "{:<24} {:>8} {:>7} {:>12} {:>9} {:>9} {:>9}",
        "House", "Tier", "Status", "Reputation", "Spaces", "Required", "Wealth"
    );
    println!("{}", "-".repeat(84));
    for id in registry.house_ids() {
        let snap = registry.house_snapshot(id)?;
        let flag = if snap.space.in_deficit() { " !" } else { "" };
        println!(
            "{:<24} {:>8} {:>7} {:>12} {:>9} {:>9} {:>9}{}",
            snap.house.name,
            snap.house.tier().as_str(),
            snap.house.status(),
            snap.reputation.as_str(),
            snap.space.controlled,
            snap.space.required,
            snap.house.wealth(),
            flag
        );
    }

    println!();
    println!("{:<24} {:>8} {:>10} {:>10}", "Planet", "Total", "Allocated", "Available");
    println!("{}", "-".repeat(56));
    for id in registry.planet_ids() {
        let snap = registry.planet_snapshot(id)?;
        println!(
            "{:<24} {:>8} {:>10} {:>10}",
            snap.planet.name,
            snap.planet.total_spaces(),
            snap.allocated,
            snap.available
        );
    }

    let violations = registry.audit();
    println!("\nstate hash: {}", registry.state_hash());
    if violations.is_empty() {
        println!("✓ ledger consistent");
        Ok(())
    } else {
        for v in &violations {
            println!("✗ {:?}: {}", v.kind, v.msg);
        }
        std::process::exit(1);
    }
}
