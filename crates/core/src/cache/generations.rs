//! Cache generation operations.
//!
//! A generation is a named container of entries. Opening one is idempotent;
//! deleting one removes its entries through the foreign key cascade.

use super::connection::CacheDb;
use super::meta::CURRENT_GENERATION;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// A cache generation with its entry count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub name: String,
    pub created_at: String,
    pub entry_count: u64,
}

impl CacheDb {
    /// Create the generation if it does not exist yet.
    pub async fn open_generation(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    pub async fn has_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM generations WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// List every generation, oldest first.
    pub async fn list_generations(&self) -> Result<Vec<Generation>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<Generation>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT g.name, g.created_at, COUNT(e.key_hash)
                     FROM generations g
                     LEFT JOIN entries e ON e.generation = g.name
                     GROUP BY g.name, g.created_at
                     ORDER BY g.created_at ASC, g.name ASC",
                )?;

                let rows = stmt.query_map([], |row| {
                    Ok(Generation {
                        name: row.get(0)?,
                        created_at: row.get(1)?,
                        entry_count: row.get::<_, i64>(2)? as u64,
                    })
                })?;

                let mut generations = Vec::new();
                for row in rows {
                    generations.push(row?);
                }
                Ok(generations)
            })
            .await
            .map_err(Error::from)
    }

    /// Names of every generation, oldest first.
    pub async fn generation_names(&self) -> Result<Vec<String>, Error> {
        Ok(self.list_generations().await?.into_iter().map(|g| g.name).collect())
    }

    /// Delete a generation and all of its entries.
    ///
    /// Returns false if the generation did not exist.
    pub async fn delete_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM generations WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Make `keep` the current generation and delete every other one.
    ///
    /// Both happen in one transaction: if recording the current generation
    /// fails, nothing is deleted. Returns the deleted names.
    pub async fn promote_generation(&self, keep: &str) -> Result<Vec<String>, Error> {
        let keep = keep.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let tx = conn.transaction()?;
                let stale = {
                    let mut stmt = tx.prepare("SELECT name FROM generations WHERE name != ?1 ORDER BY name")?;
                    let rows = stmt.query_map(params![keep], |row| row.get::<_, String>(0))?;
                    let mut names = Vec::new();
                    for row in rows {
                        names.push(row?);
                    }
                    names
                };
                tx.execute("DELETE FROM generations WHERE name != ?1", params![keep])?;
                tx.execute(
                    "INSERT INTO worker_meta (key, value, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                    params![CURRENT_GENERATION, keep, now],
                )?;
                tx.commit()?;
                Ok(stale)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every generation. Returns the number removed.
    pub async fn clear_generations(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM generations", [])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
