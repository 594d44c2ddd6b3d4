//! Persistence through a real sqlite file.

use serde_json::json;

use landsraad::domain::DomainRank;
use landsraad::house::{HouseRole, HouseTier};
use landsraad::planet::PlanetKind;
use landsraad::state::Config;
use landsraad::storage::{RecordKind, RecordStore, SqliteStore};
use landsraad::Registry;

fn populated() -> Registry {
    let reg = Registry::new();
    let a = reg.create_house("Atreides", HouseTier::Major).unwrap();
    let b = reg.create_house("Harkonnen", HouseTier::Great).unwrap();
    let p = reg.create_planet("Arrakis", PlanetKind::Planet).unwrap();
    let m = reg.create_planet("Krelln", PlanetKind::Moon).unwrap();
    reg.claim_domain(a, DomainRank::Primary, "Military", "Workers", "sardaukar drills")
        .unwrap();
    reg.claim_domain(b, DomainRank::Secondary, "Kanly", "Machinery", "").unwrap();
    reg.set_role_filled(b, HouseRole::Treasurer, true).unwrap();
    reg.set_status(a, 55).unwrap();
    reg.add_wealth(b, 300).unwrap();
    reg.allocate(a, p, 30).unwrap();
    reg.allocate(b, p, 45).unwrap();
    reg.allocate(b, m, 12).unwrap();
    reg
}

#[test]
fn sqlite_round_trip_preserves_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.sqlite");
    let path = path.to_str().unwrap();

    let reg = populated();
    let hash = {
        let mut store = SqliteStore::new(path).unwrap();
        reg.save_to(&mut store).unwrap()
    };

    let store = SqliteStore::new(path).unwrap();
    let loaded = Registry::load_from(Config::default(), &store).unwrap();
    assert_eq!(loaded.state_hash(), hash);

    let b = loaded.find_house("Harkonnen").unwrap();
    let snap = loaded.house_snapshot(b).unwrap();
    assert!(snap.house.has_role(HouseRole::Treasurer));
    assert_eq!(snap.space.controlled, 57);
    assert_eq!(snap.house.wealth(), 300);
    let p = loaded.find_planet("Arrakis").unwrap();
    assert_eq!(loaded.available_spaces(p).unwrap(), 5);
}

#[test]
fn saving_again_replaces_destroyed_entities() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.sqlite");
    let mut store = SqliteStore::new(path.to_str().unwrap()).unwrap();

    let reg = populated();
    reg.save_to(&mut store).unwrap();
    let m = reg.find_planet("Krelln").unwrap();
    reg.destroy_planet(m).unwrap();
    reg.save_to(&mut store).unwrap();

    assert_eq!(store.keys(RecordKind::Planet).unwrap().len(), 1);
    let loaded = Registry::load_from(Config::default(), &store).unwrap();
    assert!(loaded.find_planet("Krelln").is_err());
    assert!(loaded.audit().is_empty());
}

#[test]
fn load_rejects_inconsistent_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.sqlite");
    let mut store = SqliteStore::new(path.to_str().unwrap()).unwrap();
    populated().save_to(&mut store).unwrap();

    // house claims more than the planet records
    let keys = store.keys(RecordKind::House).unwrap();
    let mut body = store.get(RecordKind::House, &keys[0]).unwrap().unwrap();
    let claims = body["space_claims"].as_object_mut().unwrap();
    let planet_key = claims.keys().next().unwrap().clone();
    claims.insert(planet_key, json!(79));
    store.put(RecordKind::House, &keys[0], &body).unwrap();

    let err = Registry::load_from(Config::default(), &store).err().unwrap();
    assert!(err.to_string().contains("inconsistent"), "{}", err);
}

#[test]
fn load_rejects_over_capacity_planet() {
    let mut store = SqliteStore::in_memory().unwrap();
    populated().save_to(&mut store).unwrap();

    let keys = store.keys(RecordKind::Planet).unwrap();
    for key in keys {
        let mut body = store.get(RecordKind::Planet, &key).unwrap().unwrap();
        body["total_spaces"] = json!(1);
        store.put(RecordKind::Planet, &key, &body).unwrap();
    }
    assert!(Registry::load_from(Config::default(), &store).is_err());
}
