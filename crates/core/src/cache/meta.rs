//! Worker bookkeeping stored next to the cache.
//!
//! Keeps the name of the generation promoted by the last activation and the
//! time of the last periodic refresh, so both survive a restart.

use super::connection::CacheDb;
use crate::Error;
use chrono::{DateTime, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

pub(super) const CURRENT_GENERATION: &str = "current_generation";
const LAST_REFRESH: &str = "last_refresh";

impl CacheDb {
    pub async fn get_meta(&self, key: &str) -> Result<Option<String>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let result =
                    conn.query_row("SELECT value FROM worker_meta WHERE key = ?1", params![key], |row| row.get(0));

                match result {
                    Ok(value) => Ok(Some(value)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    pub async fn set_meta(&self, key: &str, value: &str) -> Result<(), Error> {
        let key = key.to_string();
        let value = value.to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO worker_meta (key, value, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                    params![key, value, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    pub async fn delete_meta(&self, key: &str) -> Result<(), Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute("DELETE FROM worker_meta WHERE key = ?1", params![key])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Generation promoted by the most recent activation.
    pub async fn current_generation(&self) -> Result<Option<String>, Error> {
        self.get_meta(CURRENT_GENERATION).await
    }

    pub async fn set_current_generation(&self, name: &str) -> Result<(), Error> {
        self.set_meta(CURRENT_GENERATION, name).await
    }

    /// Forget the current generation, e.g. after every generation was cleared.
    pub async fn clear_current_generation(&self) -> Result<(), Error> {
        self.delete_meta(CURRENT_GENERATION).await
    }

    /// Time of the last completed periodic refresh.
    pub async fn last_refresh(&self) -> Result<Option<DateTime<Utc>>, Error> {
        let Some(raw) = self.get_meta(LAST_REFRESH).await? else {
            return Ok(None);
        };
        let parsed = DateTime::parse_from_rfc3339(&raw).map_err(|e| Error::Corrupt(format!("last_refresh: {e}")))?;
        Ok(Some(parsed.with_timezone(&Utc)))
    }

    pub async fn set_last_refresh(&self, at: DateTime<Utc>) -> Result<(), Error> {
        self.set_meta(LAST_REFRESH, &at.to_rfc3339()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_meta_roundtrip_and_overwrite() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.get_meta("k").await.unwrap().is_none());

        db.set_meta("k", "a").await.unwrap();
        db.set_meta("k", "b").await.unwrap();
        assert_eq!(db.get_meta("k").await.unwrap().as_deref(), Some("b"));

        db.delete_meta("k").await.unwrap();
        assert!(db.get_meta("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_last_refresh() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.last_refresh().await.unwrap().is_none());

        let at = DateTime::parse_from_rfc3339("2026-10-01T08:00:00Z").unwrap().with_timezone(&Utc);
        db.set_last_refresh(at).await.unwrap();
        assert_eq!(db.last_refresh().await.unwrap(), Some(at));
    }

    #[tokio::test]
    async fn test_current_generation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.set_current_generation("study-support-v2").await.unwrap();
        assert_eq!(db.current_generation().await.unwrap().as_deref(), Some("study-support-v2"));

        db.clear_current_generation().await.unwrap();
        assert!(db.current_generation().await.unwrap().is_none());
    }
}
