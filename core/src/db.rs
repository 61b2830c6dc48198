use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// The logical collections the ledger persists. Each is stored whole, as one
/// JSON document, and rewritten whole on every save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Foods,
    Meals,
    Activities,
    Diary,
}

impl Collection {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Foods => "foods",
            Collection::Meals => "meals",
            Collection::Activities => "activities",
            Collection::Diary => "diary",
        }
    }
}

/// Result of loading a collection. `recovered` holds the parse error when the
/// stored document was unreadable and an empty collection was substituted.
#[derive(Debug)]
pub struct Loaded<T> {
    pub data: T,
    pub recovered: Option<String>,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS collections (
                    kind TEXT PRIMARY KEY NOT NULL,
                    body TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    /// Load a collection, creating an empty one on first access. A stored body
    /// that no longer parses is reported and replaced by an empty collection
    /// in memory; the stored text is left alone until the next save.
    pub fn load_collection<T>(&self, kind: Collection) -> Result<Loaded<T>>
    where
        T: DeserializeOwned + Serialize + Default,
    {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM collections WHERE kind = ?1",
                params![kind.as_str()],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("Failed to read {} collection", kind.as_str()))?;

        let Some(body) = body else {
            tracing::debug!(collection = kind.as_str(), "creating empty collection");
            let data = T::default();
            self.save_collection(kind, &data)?;
            return Ok(Loaded {
                data,
                recovered: None,
            });
        };

        match serde_json::from_str(&body) {
            Ok(data) => Ok(Loaded {
                data,
                recovered: None,
            }),
            Err(e) => {
                tracing::warn!(
                    collection = kind.as_str(),
                    error = %e,
                    "stored collection is unreadable; starting from an empty one"
                );
                Ok(Loaded {
                    data: T::default(),
                    recovered: Some(e.to_string()),
                })
            }
        }
    }

    pub fn save_collection<T: Serialize>(&self, kind: Collection, data: &T) -> Result<()> {
        let body = encode_collection(kind, data)?;
        write_body(&self.conn, kind, &body)?;
        tracing::debug!(collection = kind.as_str(), bytes = body.len(), "saved collection");
        Ok(())
    }

    /// Write several encoded collections in one transaction. Either all of
    /// them are stored or none is.
    pub fn save_collections(&self, batch: &[(Collection, String)]) -> Result<()> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to start transaction")?;
        for (kind, body) in batch {
            write_body(&tx, *kind, body)?;
        }
        tx.commit().context("Failed to commit collections")?;
        tracing::debug!(collections = batch.len(), "saved collections");
        Ok(())
    }

    #[cfg(test)]
    fn write_raw(&self, kind: Collection, body: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO collections (kind, body, updated_at) VALUES (?1, ?2, ?3)",
            params![kind.as_str(), body, Local::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Make every write to `kind` fail, as a full disk or a locked file would.
    #[cfg(test)]
    pub(crate) fn reject_writes_to(&self, kind: Collection) -> Result<()> {
        let k = kind.as_str();
        self.conn.execute_batch(&format!(
            "CREATE TRIGGER reject_insert_{k} BEFORE INSERT ON collections
                 WHEN NEW.kind = '{k}' BEGIN SELECT RAISE(ABORT, 'write rejected'); END;
             CREATE TRIGGER reject_update_{k} BEFORE UPDATE ON collections
                 WHEN NEW.kind = '{k}' BEGIN SELECT RAISE(ABORT, 'write rejected'); END;"
        ))?;
        Ok(())
    }

    #[cfg(test)]
    fn has_row(&self, kind: Collection) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM collections WHERE kind = ?1",
            params![kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

pub fn encode_collection<T: Serialize>(kind: Collection, data: &T) -> Result<String> {
    serde_json::to_string(data)
        .with_context(|| format!("Failed to serialize {} collection", kind.as_str()))
}

fn write_body(conn: &Connection, kind: Collection, body: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO collections (kind, body, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(kind) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
        params![kind.as_str(), body, Local::now().to_rfc3339()],
    )
    .with_context(|| format!("Failed to write {} collection", kind.as_str()))?;
    Ok(())
}
