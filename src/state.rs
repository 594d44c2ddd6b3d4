use crate::planet::{PlanetKind, DEFAULT_MOON_SPACES, DEFAULT_PLANET_SPACES};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub sqlite_path: String,
    /// Capacity given to new planets
    pub planet_spaces: u32,
    /// Capacity given to new moons
    pub moon_spaces: u32,
    pub stress_threads: usize,
    pub stress_ops: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sqlite_path: "./landsraad.sqlite".to_string(),
            planet_spaces: DEFAULT_PLANET_SPACES,
            moon_spaces: DEFAULT_MOON_SPACES,
            stress_threads: 0,
            stress_ops: 20_000,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            sqlite_path: std::env::var("SQLITE_PATH").unwrap_or(d.sqlite_path),
            planet_spaces: std::env::var("PLANET_SPACES").ok().and_then(|v| v.parse().ok()).unwrap_or(d.planet_spaces),
            moon_spaces: std::env::var("MOON_SPACES").ok().and_then(|v| v.parse().ok()).unwrap_or(d.moon_spaces),
            stress_threads: std::env::var("STRESS_THREADS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.stress_threads),
            stress_ops: std::env::var("STRESS_OPS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.stress_ops),
        }
    }

    pub fn default_spaces(&self, kind: PlanetKind) -> u32 {
        match kind {
            PlanetKind::Planet => self.planet_spaces,
            PlanetKind::Moon => self.moon_spaces,
        }
    }
}

pub fn now_ts() -> u64 {
    chrono::Utc::now().timestamp() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_spaces_by_kind() {
        let cfg = Config::default();
        assert_eq!(cfg.default_spaces(PlanetKind::Planet), 80);
        assert_eq!(cfg.default_spaces(PlanetKind::Moon), 30);
    }

    #[test]
    fn test_now_ts_is_recent() {
        // 2023-11-14
        assert!(now_ts() > 1_700_000_000);
    }
}
