//! Key-value memory store for cross-chunk extraction context.
//!
//! Extractors persist a bounded trailing snapshot of accepted entities here
//! between model calls (one logical key per extractor type). Two backings:
//! [`InMemoryStore`] for tests and single-run use, [`SqliteStore`] for
//! persistence across process restarts. Operations are best-effort: backend
//! failures are logged and surface as cache misses, never as errors: a lost
//! memory entry only risks one duplicate re-extraction, which the
//! accumulator-level dedup catches anyway.

use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use rusqlite::{Connection, OpenFlags, params};

/// Key-value contract shared by all extractor memory backends.
///
/// `set` with `ttl = None` stores without expiry; `get` never returns an
/// expired value.
pub trait MemoryStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str, ttl: Option<Duration>);
    fn delete(&self, key: &str);
}

struct MemEntry {
    value: String,
    expires_at: Option<Instant>,
}

/// Process-local store backed by a concurrent map.
#[derive(Default)]
pub struct InMemoryStore {
    entries: DashMap<String, MemEntry>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryStore for InMemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let entry = self.entries.get(key)?;
        if let Some(deadline) = entry.expires_at
            && Instant::now() >= deadline
        {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        Some(entry.value.clone())
    }

    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) {
        self.entries.insert(
            key.to_string(),
            MemEntry {
                value: value.to_string(),
                expires_at: ttl.map(|d| Instant::now() + d),
            },
        );
    }

    fn delete(&self, key: &str) {
        self.entries.remove(key);
    }
}

fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Open a SQLite connection with WAL mode and standard pragmas.
fn open_sqlite(path: &Path) -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(conn)
}

/// Persistent store on disk. Expired rows are removed lazily on read.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, rusqlite::Error> {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = open_sqlite(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS memory_store (
                 key        TEXT PRIMARY KEY,
                 value      TEXT NOT NULL,
                 expires_at INTEGER
             );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl MemoryStore for SqliteStore {
    fn get(&self, key: &str) -> Option<String> {
        let conn = self.conn.lock().ok()?;
        let row: Option<(String, Option<u64>)> = conn
            .query_row(
                "SELECT value, expires_at FROM memory_store WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .ok();
        let (value, expires_at) = row?;
        if let Some(deadline) = expires_at
            && now_epoch() >= deadline
        {
            let _ = conn.execute("DELETE FROM memory_store WHERE key = ?1", params![key]);
            return None;
        }
        Some(value)
    }

    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) {
        let Ok(conn) = self.conn.lock() else {
            return;
        };
        let expires_at = ttl.map(|d| now_epoch() + d.as_secs());
        if let Err(e) = conn.execute(
            "INSERT OR REPLACE INTO memory_store (key, value, expires_at) VALUES (?1, ?2, ?3)",
            params![key, value, expires_at],
        ) {
            tracing::warn!(key, error = %e, "memory store write failed");
        }
    }

    fn delete(&self, key: &str) {
        let Ok(conn) = self.conn.lock() else {
            return;
        };
        if let Err(e) = conn.execute("DELETE FROM memory_store WHERE key = ?1", params![key]) {
            tracing::warn!(key, error = %e, "memory store delete failed");
        }
    }
}
