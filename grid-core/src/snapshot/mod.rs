//! SnapshotStore (C14) — state persistence for crash recovery.
//!
//! Backed by `rusqlite`. Blobs are opaque JSON produced by whichever engine
//! owns them (decimals as strings, timestamps ISO-8601 UTC, enums as their
//! string values) — the store itself interprets nothing.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// A persisted snapshot for one bot: opaque per-engine JSON blobs keyed by
/// engine name (`"grid_order_manager"`, `"dca_position_manager"`.).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub bot_name: String,
    pub engines: HashMap<String, String>,
    pub saved_at: DateTime<Utc>,
}

pub struct SnapshotStore {
    conn: Connection,
}

impl SnapshotStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path).context("opening snapshot database")?;
        Self::init(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("opening in-memory snapshot database")?;
        Self::init(&conn)?;
        Ok(Self { conn })
    }

    fn init(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS snapshots (
                bot_name TEXT PRIMARY KEY,
                engines TEXT NOT NULL,
                saved_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Upserts the snapshot row for `bot_name`. Atomic with respect to
    /// concurrent readers (SQLite's own transaction semantics).
    pub fn save(&self, bot_name: &str, engines: &HashMap<String, String>, wall_clock: DateTime<Utc>) -> Result<()> {
        let engines_json = serde_json::to_string(engines).context("serializing engine blobs")?;
        self.conn.execute(
            "INSERT INTO snapshots (bot_name, engines, saved_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(bot_name) DO UPDATE SET engines = excluded.engines, saved_at = excluded.saved_at",
            params![bot_name, engines_json, wall_clock.to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn load(&self, bot_name: &str) -> Result<Option<Snapshot>> {
        let mut stmt = self
            .conn
            .prepare("SELECT engines, saved_at FROM snapshots WHERE bot_name = ?1")?;
        let mut rows = stmt.query(params![bot_name])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let engines_json: String = row.get(0)?;
        let saved_at_str: String = row.get(1)?;
        let engines: HashMap<String, String> = serde_json::from_str(&engines_json).context("deserializing engine blobs")?;
        let saved_at = DateTime::parse_from_rfc3339(&saved_at_str)
            .context("parsing saved_at timestamp")?
            .with_timezone(&Utc);
        Ok(Some(Snapshot {
            bot_name: bot_name.to_string(),
            engines,
            saved_at,
        }))
    }

    pub fn delete(&self, bot_name: &str) -> Result<()> {
        self.conn.execute("DELETE FROM snapshots WHERE bot_name = ?1", params![bot_name])?;
        Ok(())
    }

    /// Lists every bot with a stored snapshot, most recently saved first.
    pub fn list_bots(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT bot_name FROM snapshots ORDER BY saved_at DESC")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }
}
