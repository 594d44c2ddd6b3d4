//! Identity-keyed record store.
//!
//! Records are JSON bodies addressed by (kind, key). The registry is the only
//! writer; it decides what a record means.

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use crate::logging::{log, obj, v_str, Domain, Level};
use crate::state::now_ts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordKind {
    House,
    Planet,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::House => "house",
            RecordKind::Planet => "planet",
        }
    }
}

pub trait RecordStore {
    fn get(&self, kind: RecordKind, key: &str) -> Result<Option<Value>>;
    fn put(&mut self, kind: RecordKind, key: &str, body: &Value) -> Result<()>;
    /// Returns whether a record was removed
    fn delete(&mut self, kind: RecordKind, key: &str) -> Result<bool>;
    /// All keys of one kind, ascending
    fn keys(&self, kind: RecordKind) -> Result<Vec<String>>;

    /// Replace every record of the given kinds with `records`.
    fn replace_all(&mut self, kinds: &[RecordKind], records: &[(RecordKind, String, Value)]) -> Result<()> {
        for kind in kinds {
            for key in self.keys(*kind)? {
                self.delete(*kind, &key)?;
            }
        }
        for (kind, key, body) in records {
            self.put(*kind, key, body)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: BTreeMap<(RecordKind, String), Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, kind: RecordKind, key: &str) -> Result<Option<Value>> {
        Ok(self.records.get(&(kind, key.to_string())).cloned())
    }

    fn put(&mut self, kind: RecordKind, key: &str, body: &Value) -> Result<()> {
        self.records.insert((kind, key.to_string()), body.clone());
        Ok(())
    }

    fn delete(&mut self, kind: RecordKind, key: &str) -> Result<bool> {
        Ok(self.records.remove(&(kind, key.to_string())).is_some())
    }

    fn keys(&self, kind: RecordKind) -> Result<Vec<String>> {
        Ok(self
            .records
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, key)| key.clone())
            .collect())
    }
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new(path: &str) -> Result<Self> {
        let mut store = Self {
            conn: Connection::open(path)?,
        };
        store.init()?;
        log(
            Level::Info,
            Domain::Store,
            "open",
            obj(&[("path", v_str(path))]),
        );
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let mut store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init()?;
        Ok(store)
    }

    pub fn init(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "BEGIN;
            CREATE TABLE IF NOT EXISTS records (
                kind TEXT NOT NULL,
                key TEXT NOT NULL,
                body TEXT NOT NULL,
                updated_ts INTEGER NOT NULL,
                PRIMARY KEY (kind, key)
            );
            COMMIT;",
        )?;
        Ok(())
    }
}

fn parse_body(kind: RecordKind, key: &str, body: &str) -> Result<Value> {
    match serde_json::from_str(body) {
        Ok(v) => Ok(v),
        Err(err) => bail!("corrupt {} record {}: {}", kind.as_str(), key, err),
    }
}

impl RecordStore for SqliteStore {
    fn get(&self, kind: RecordKind, key: &str) -> Result<Option<Value>> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM records WHERE kind = ?1 AND key = ?2",
                params![kind.as_str(), key],
                |row| row.get(0),
            )
            .optional()?;
        body.map(|b| parse_body(kind, key, &b)).transpose()
    }

    fn put(&mut self, kind: RecordKind, key: &str, body: &Value) -> Result<()> {
        self.conn.execute(
            "INSERT INTO records (kind, key, body, updated_ts) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(kind, key) DO UPDATE SET body = excluded.body, updated_ts = excluded.updated_ts",
            params![kind.as_str(), key, body.to_string(), now_ts() as i64],
        )?;
        Ok(())
    }

    fn delete(&mut self, kind: RecordKind, key: &str) -> Result<bool> {
        let n = self.conn.execute(
            "DELETE FROM records WHERE kind = ?1 AND key = ?2",
            params![kind.as_str(), key],
        )?;
        Ok(n > 0)
    }

    fn keys(&self, kind: RecordKind) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM records WHERE kind = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![kind.as_str()], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// One transaction: a crash mid-save leaves the previous state intact.
    fn replace_all(&mut self, kinds: &[RecordKind], records: &[(RecordKind, String, Value)]) -> Result<()> {
        let ts = now_ts() as i64;
        let tx = self.conn.transaction()?;
        for kind in kinds {
            tx.execute("DELETE FROM records WHERE kind = ?1", params![kind.as_str()])?;
        }
        for (kind, key, body) in records {
            tx.execute(
                "INSERT INTO records (kind, key, body, updated_ts) VALUES (?1, ?2, ?3, ?4)",
                params![kind.as_str(), key, body.to_string(), ts],
            )?;
        }
        tx.commit()?;
        log(
            Level::Debug,
            Domain::Store,
            "replace_all",
            obj(&[("records", serde_json::json!(records.len()))]),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exercise(store: &mut dyn RecordStore) {
        assert_eq!(store.get(RecordKind::House, "1").unwrap(), None);
        store.put(RecordKind::House, "1", &json!({"name": "Atreides"})).unwrap();
        store.put(RecordKind::House, "2", &json!({"name": "Harkonnen"})).unwrap();
        store.put(RecordKind::Planet, "1", &json!({"name": "Caladan"})).unwrap();
        assert_eq!(store.get(RecordKind::House, "1").unwrap(), Some(json!({"name": "Atreides"})));
        assert_eq!(store.keys(RecordKind::House).unwrap(), vec!["1", "2"]);

        store.put(RecordKind::House, "1", &json!({"name": "Atreides", "status": 40})).unwrap();
        assert_eq!(store.get(RecordKind::House, "1").unwrap().unwrap()["status"], 40);

        assert!(store.delete(RecordKind::House, "2").unwrap());
        assert!(!store.delete(RecordKind::House, "2").unwrap());

        store
            .replace_all(
                &[RecordKind::House],
                &[(RecordKind::House, "7".to_string(), json!({"name": "Ecaz"}))],
            )
            .unwrap();
        assert_eq!(store.keys(RecordKind::House).unwrap(), vec!["7"]);
        // kinds not listed are untouched
        assert_eq!(store.keys(RecordKind::Planet).unwrap(), vec!["1"]);
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new();
        exercise(&mut store);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_sqlite_store() {
        let mut store = SqliteStore::in_memory().unwrap();
        exercise(&mut store);
    }

    #[test]
    fn test_sqlite_rejects_corrupt_body() {
        let mut store = SqliteStore::in_memory().unwrap();
        store
            .conn
            .execute(
                "INSERT INTO records (kind, key, body, updated_ts) VALUES ('house', '1', '{not json', 0)",
                [],
            )
            .unwrap();
        assert!(store.get(RecordKind::House, "1").is_err());
    }
}
