//! Structured logging for the ledger core.
//!
//! Every record is one JSON object per line with a run id, a monotonic
//! sequence number, level, domain and event name. Records go to stdout and,
//! when `LOG_DIR` is set, to `events.jsonl` / `trace.jsonl` under a per-run
//! directory so a session can be replayed and audited afterwards.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl Level {
    pub fn from_env() -> Self {
        match std::env::var("LOG_LEVEL").as_deref() {
            Ok("trace") => Level::Trace,
            Ok("debug") => Level::Debug,
            Ok("info") => Level::Info,
            Ok("warn") => Level::Warn,
            Ok("error") => Level::Error,
            Ok("fatal") => Level::Fatal,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

// =============================================================================
// Log Domains (categories for filtering)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Ledger,     // Space allocation between houses and planets
    Treasury,   // Balances, trades, income collection
    Reputation, // Status and reputation transitions
    Domains,    // Domain claims, tier and role changes
    Registry,   // Entity lifecycle and lookups
    Store,      // Persistence reads and writes
    Audit,      // Invariant audits and state hashes
    System,     // Startup, shutdown, tools
    Profile,    // Performance profiling
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Ledger => "ledger",
            Domain::Treasury => "treasury",
            Domain::Reputation => "reputation",
            Domain::Domains => "domains",
            Domain::Registry => "registry",
            Domain::Store => "store",
            Domain::Audit => "audit",
            Domain::System => "system",
            Domain::Profile => "profile",
        }
    }

    pub fn is_enabled(&self) -> bool {
        // LOG_DOMAINS is a comma-separated list or "all"
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

// =============================================================================
// Run context
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static RUN_CONTEXT: OnceLock<RunContext> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug)]
struct RunContext {
    run_id: String,
    events: Option<Mutex<BufWriter<File>>>,
    trace: Option<Mutex<BufWriter<File>>>,
}

fn open_sink(path: PathBuf) -> Option<Mutex<BufWriter<File>>> {
    match File::create(&path) {
        Ok(f) => Some(Mutex::new(BufWriter::new(f))),
        Err(err) => {
            eprintln!("[log] failed to create {}: {}", path.display(), err);
            None
        }
    }
}

fn ensure_run_context() -> &'static RunContext {
    RUN_CONTEXT.get_or_init(|| {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("r-{}-{}", ts_epoch_ms(), process::id()));
        let Ok(base) = std::env::var("LOG_DIR") else {
            return RunContext {
                run_id,
                events: None,
                trace: None,
            };
        };
        let mut run_dir = PathBuf::from(base);
        run_dir.push(&run_id);
        if let Err(err) = create_dir_all(&run_dir) {
            eprintln!("[log] failed to create run dir: {}", err);
        }
        let _ = std::fs::write(
            run_dir.join("manifest.json"),
            json!({
                "run_id": run_id,
                "ts": ts_now(),
                "pid": process::id(),
                "log_dir": run_dir.to_string_lossy(),
            })
            .to_string(),
        );

        RunContext {
            events: open_sink(run_dir.join("events.jsonl")),
            trace: open_sink(run_dir.join("trace.jsonl")),
            run_id,
        }
    })
}

/// Lift identifying keys to the top level of the record
fn split_fields(mut fields: Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
    let mut top = Map::new();
    for key in ["house_id", "planet_id", "msg"] {
        if let Some(value) = fields.remove(key) {
            top.insert(key.to_string(), value);
        }
    }
    (top, fields)
}

fn write_line(writer: &Option<Mutex<BufWriter<File>>>, line: &str) {
    if let Some(writer) = writer {
        if let Ok(mut w) = writer.lock() {
            let _ = writeln!(w, "{}", line);
            let _ = w.flush();
        }
    }
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

pub fn enabled(level: Level, domain: Domain) -> bool {
    level >= Level::from_env() && domain.is_enabled()
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    if !enabled(level, domain) {
        return;
    }
    emit_record(level, domain.as_str(), event, fields);
}

fn emit_record(level: Level, component: &str, event: &str, fields: Map<String, Value>) {
    let ctx = ensure_run_context();
    let (mut top, data) = split_fields(fields);

    let msg = top.remove("msg").unwrap_or(Value::String(String::new()));
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("run_id".to_string(), json!(ctx.run_id.clone()));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("component".to_string(), json!(component));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    for (k, v) in top {
        entry.insert(k, v);
    }
    entry.insert("data".to_string(), Value::Object(data));

    let line = Value::Object(entry).to_string();
    match level {
        Level::Trace | Level::Debug => write_line(&ctx.trace, &line),
        _ => write_line(&ctx.events, &line),
    }
    println!("{}", line);
}

// =============================================================================
// Ledger and treasury
// =============================================================================

pub fn log_allocation(house_id: u64, planet_id: u64, previous: u32, current: u32, available: u32) {
    log(
        Level::Debug,
        Domain::Ledger,
        if current == 0 { "release" } else { "allocate" },
        obj(&[
            ("house_id", json!(house_id)),
            ("planet_id", json!(planet_id)),
            ("previous", json!(previous)),
            ("current", json!(current)),
            ("available", json!(available)),
        ]),
    );
}

pub fn log_capacity_change(planet_id: u64, previous: u32, current: u32, allocated: u64) {
    log(
        Level::Info,
        Domain::Ledger,
        "capacity_change",
        obj(&[
            ("planet_id", json!(planet_id)),
            ("previous", json!(previous)),
            ("current", json!(current)),
            ("allocated", json!(allocated)),
        ]),
    );
}

pub fn log_treasury(house_id: u64, op: &str, amount: u64, wealth: u64, resources: u64) {
    log(
        Level::Debug,
        Domain::Treasury,
        op,
        obj(&[
            ("house_id", json!(house_id)),
            ("amount", json!(amount)),
            ("wealth", json!(wealth)),
            ("resources", json!(resources)),
        ]),
    );
}

pub fn log_trade(house_id: u64, spent: &str, requested: u64, deducted: u64, gained: u64) {
    log(
        Level::Info,
        Domain::Treasury,
        "trade",
        obj(&[
            ("house_id", json!(house_id)),
            ("spent", v_str(spent)),
            ("requested", json!(requested)),
            ("deducted", json!(deducted)),
            ("gained", json!(gained)),
        ]),
    );
}

/// A refused operation. These are ordinary caller errors, not faults.
pub fn log_rejected(domain: Domain, op: &str, code: &str, reason: &str) {
    log(
        Level::Debug,
        domain,
        "rejected",
        obj(&[
            ("op", v_str(op)),
            ("code", v_str(code)),
            ("msg", v_str(reason)),
        ]),
    );
}

// =============================================================================
// Reputation, domains, lifecycle
// =============================================================================

pub fn log_reputation_change(house_id: u64, old_status: u8, new_status: u8, old: &str, new: &str) {
    let level = if old != new { Level::Info } else { Level::Debug };
    log(
        level,
        Domain::Reputation,
        "status_change",
        obj(&[
            ("house_id", json!(house_id)),
            ("old_status", json!(old_status)),
            ("new_status", json!(new_status)),
            ("old", v_str(old)),
            ("new", v_str(new)),
        ]),
    );
}

pub fn log_domain_change(house_id: u64, event: &str, detail: &[(&str, Value)]) {
    let mut fields = obj(detail);
    fields.insert("house_id".to_string(), json!(house_id));
    log(Level::Info, Domain::Domains, event, fields);
}

pub fn log_lifecycle(event: &str, kind: &str, id: u64, name: &str) {
    log(
        Level::Info,
        Domain::Registry,
        event,
        obj(&[("kind", v_str(kind)), ("id", json!(id)), ("name", v_str(name))]),
    );
}

// =============================================================================
// Audit trail
// =============================================================================

pub fn log_audit(event: &str, state_hash: &str, houses: usize, planets: usize) {
    log(
        Level::Info,
        Domain::Audit,
        event,
        obj(&[
            ("state_hash", v_str(state_hash)),
            ("houses", json!(houses)),
            ("planets", json!(planets)),
        ]),
    );
}

pub fn log_invariant_violation(kind: &str, msg: &str) {
    log(
        Level::Error,
        Domain::Audit,
        "invariant_violation",
        obj(&[("kind", v_str(kind)), ("msg", v_str(msg))]),
    );
}

// =============================================================================
// Helpers
// =============================================================================

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

// =============================================================================
// Profiling Scope
// =============================================================================

/// Emits a trace record with elapsed time when dropped.
pub struct ProfileScope {
    label: &'static str,
    started: Instant,
    enabled: bool,
}

impl ProfileScope {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            started: Instant::now(),
            enabled: enabled(Level::Trace, Domain::Profile),
        }
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        if !self.enabled {
            return;
        }
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        log(
            Level::Trace,
            Domain::Profile,
            "profile",
            obj(&[("label", v_str(self.label)), ("elapsed_ms", v_num(elapsed_ms))]),
        );
    }
}

// =============================================================================
// Tests
// =============================================================================
