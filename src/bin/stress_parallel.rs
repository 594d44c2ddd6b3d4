//! Parallel stress test - hammers one shared registry from many threads and
//! checks the ledger contract still holds afterwards.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use rand::{rngs::StdRng, Rng, SeedableRng};

use landsraad::house::{HouseId, HouseTier};
use landsraad::planet::{PlanetId, PlanetKind};
use landsraad::registry::Registry;
use landsraad::state::Config;
use landsraad::verify::invariants::assert_totals_balance;

const HOUSES: usize = 12;
const PLANETS: usize = 6;

fn get_memory_mb() -> f64 {
    std::fs::read_to_string("/proc/self/statm")
        .ok()
        .and_then(|s| s.split_whitespace().nth(1)?.parse::<usize>().ok())
        .map(|pages| pages as f64 * 4096.0 / 1_000_000.0)
        .unwrap_or(0.0)
}

fn seed_world(registry: &Registry) -> anyhow::Result<(Vec<HouseId>, Vec<PlanetId>)> {
    let tiers = [HouseTier::Nascent, HouseTier::Minor, HouseTier::Major, HouseTier::Great];
    let mut houses = Vec::with_capacity(HOUSES);
    for i in 0..HOUSES {
        let id = registry.create_house(&format!("House {}", i), tiers[i % tiers.len()])?;
        registry.add_wealth(id, 1_000)?;
        registry.add_resources(id, 300)?;
        houses.push(id);
    }
    let mut planets = Vec::with_capacity(PLANETS);
    for i in 0..PLANETS {
        let kind = if i % 3 == 2 { PlanetKind::Moon } else { PlanetKind::Planet };
        planets.push(registry.create_planet(&format!("World {}", i), kind)?);
    }
    Ok((houses, planets))
}

/// One random operation. Returns whether it succeeded.
fn random_op(registry: &Registry, rng: &mut StdRng, houses: &[HouseId], planets: &[PlanetId]) -> bool {
    let h = houses[rng.gen_range(0..houses.len())];
    let p = planets[rng.gen_range(0..planets.len())];
    match rng.gen_range(0..10) {
        0..=3 => registry.allocate(h, p, rng.gen_range(0..40)).is_ok(),
        4 | 5 => registry.deallocate(h, p).is_ok(),
        6 => registry.set_total_spaces(p, rng.gen_range(20..100)).is_ok(),
        7 => registry.trade_wealth_for_resources(h, rng.gen_range(1..120)).is_ok(),
        8 => registry.trade_resources_for_wealth(h, rng.gen_range(1..40)).is_ok(),
        _ => registry.adjust_status(h, rng.gen_range(-15..15)).is_ok(),
    }
}

fn main() -> anyhow::Result<()> {
    println!("=== PARALLEL STRESS TEST ===\n");

    let cfg = Config::from_env();
    let n_threads = if cfg.stress_threads > 0 {
        cfg.stress_threads
    } else {
        num_cpus::get().min(8)
    };
    let ops_per_thread = cfg.stress_ops;

    println!("Threads: {}", n_threads);
    println!("Ops per thread: {}", ops_per_thread);
    println!();

    let registry = Arc::new(Registry::from_config(cfg));
    let (houses, planets) = seed_world(&registry)?;
    let houses = Arc::new(houses);
    let planets = Arc::new(planets);

    let applied = Arc::new(AtomicU64::new(0));
    let rejected = Arc::new(AtomicU64::new(0));

    let start = Instant::now();
    let initial_mem = get_memory_mb();

    let mut handles = vec![];
    for t in 0..n_threads {
        let registry = Arc::clone(&registry);
        let houses = Arc::clone(&houses);
        let planets = Arc::clone(&planets);
        let applied = Arc::clone(&applied);
        let rejected = Arc::clone(&rejected);

        handles.push(thread::spawn(move || {
            let mut rng = StdRng::seed_from_u64(t as u64);
            for _ in 0..ops_per_thread {
                if random_op(&registry, &mut rng, &houses, &planets) {
                    applied.fetch_add(1, Ordering::Relaxed);
                } else {
                    rejected.fetch_add(1, Ordering::Relaxed);
                }
            }
        }));
    }

    for h in handles {
        if h.join().is_err() {
            anyhow::bail!("worker thread panicked");
        }
    }

    let total_time = start.elapsed();
    let final_mem = get_memory_mb();
    let total_ops = applied.load(Ordering::Relaxed) + rejected.load(Ordering::Relaxed);

    println!("=== Summary ===");
    println!("Total time: {:.2?}", total_time);
    println!("Operations: {} ({} applied, {} rejected)",
             total_ops,
             applied.load(Ordering::Relaxed),
             rejected.load(Ordering::Relaxed));
    println!("Throughput: {:.0} ops/sec", total_ops as f64 / total_time.as_secs_f64());
    println!("Memory: {:.1} MB initial → {:.1} MB final (Δ {:.1} MB)",
             initial_mem, final_mem, final_mem - initial_mem);

    let violations = registry.audit();
    let mut houses_map = std::collections::BTreeMap::new();
    for id in houses.iter() {
        houses_map.insert(*id, registry.house(*id)?);
    }
    let mut planets_map = std::collections::BTreeMap::new();
    for id in planets.iter() {
        planets_map.insert(*id, registry.planet(*id)?);
    }
    let balanced = assert_totals_balance(&houses_map, &planets_map);

    if violations.is_empty() && balanced.is_ok() {
        println!("\n✓ Ledger consistent after concurrent load");
        println!("state hash: {}", registry.state_hash());
        Ok(())
    } else {
        for v in &violations {
            println!("✗ {:?}: {}", v.kind, v.msg);
        }
        if let Err(v) = balanced {
            println!("✗ {}", v.msg);
        }
        anyhow::bail!("{} ledger violations", violations.len())
    }
}
