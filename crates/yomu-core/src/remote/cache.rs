//! Local cache of the remote index
//!
//! One row per remote catalog, keyed by source id. Each successful refresh
//! replaces the table wholesale inside a single transaction so a crash
//! mid-refresh can never leave a mixed snapshot.

use std::path::Path;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use rusqlite::{params, Connection};

use super::RemoteCatalogEntry;

pub struct RemoteCatalogCache {
    conn: Mutex<Connection>,
}

impl RemoteCatalogCache {
    /// Open (or create) the cache database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open catalog cache {}", path.display()))?;
        Self::from_connection(conn)
    }

    /// In-memory cache for tests and ephemeral hosts.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS remote_catalogs (
                source_id INTEGER NOT NULL UNIQUE,
                name TEXT NOT NULL,
                pkg TEXT NOT NULL,
                version TEXT NOT NULL,
                code INTEGER NOT NULL,
                lang TEXT NOT NULL,
                apk TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                nsfw INTEGER NOT NULL DEFAULT 0
            )",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Snapshot of the cached index, in insertion order.
    pub fn load_all(&self) -> Result<Vec<RemoteCatalogEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT name, pkg, version, code, lang, apk, source_id, description, nsfw
             FROM remote_catalogs ORDER BY rowid",
        )?;
        let entries = stmt
            .query_map([], |row| {
                Ok(RemoteCatalogEntry {
                    name: row.get(0)?,
                    pkg: row.get(1)?,
                    version: row.get(2)?,
                    code: row.get(3)?,
                    lang: row.get(4)?,
                    apk: row.get(5)?,
                    id: row.get(6)?,
                    description: row.get(7)?,
                    nsfw: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Replace the whole table with `entries` in one transaction.
    pub fn replace_all(&self, entries: &[RemoteCatalogEntry]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM remote_catalogs", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO remote_catalogs
                 (name, pkg, version, code, lang, apk, source_id, description, nsfw)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for entry in entries {
                stmt.execute(params![
                    entry.name,
                    entry.pkg,
                    entry.version,
                    entry.code,
                    entry.lang,
                    entry.apk,
                    entry.id,
                    entry.description,
                    entry.nsfw,
                ])?;
            }
        }
        tx.commit().context("failed to commit catalog refresh")?;
        Ok(())
    }
}
