//! SQLite persistence layer for the local cache.
//!
//! RULE: Only store.rs talks to the database.
//! LocalCache and SessionManager call store methods; they never execute
//! SQL directly.

use crate::{error::CoreResult, types::Millis};
use rusqlite::{params, Connection, OptionalExtension};

pub struct LocalStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl LocalStore {
    /// Open (or create) the cache database at `path`.
    pub fn open(path: &str) -> CoreResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests and as the fallback).
    pub fn in_memory() -> CoreResult<Self> {
        let conn = Connection::open(":memory:")?;
        Ok(Self { conn, path: None })
    }

    /// Open and migrate `path`; if the file cannot be used, keep playing
    /// on an in-memory database instead.
    pub fn open_or_memory(path: &str) -> CoreResult<Self> {
        let opened = Self::open(path).and_then(|store| {
            store.migrate()?;
            Ok(store)
        });
        match opened {
            Ok(store) => Ok(store),
            Err(e) => {
                log::warn!("Local cache at {path} unavailable ({e}); using in-memory cache");
                let store = Self::in_memory()?;
                store.migrate()?;
                Ok(store)
            }
        }
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> CoreResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_local_cache.sql"))?;
        Ok(())
    }

    // ── Key-value ──────────────────────────────────────────────

    pub fn get(&self, key: &str) -> CoreResult<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn put(&self, key: &str, value: &str, now: Millis) -> CoreResult<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }

    pub fn delete(&self, key: &str) -> CoreResult<()> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// All values whose key starts with `prefix`, in key order.
    pub fn scan_prefix(&self, prefix: &str) -> CoreResult<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT key, value FROM kv
             WHERE substr(key, 1, length(?1)) = ?1
             ORDER BY key ASC",
        )?;
        let rows = stmt
            .query_map(params![prefix], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
