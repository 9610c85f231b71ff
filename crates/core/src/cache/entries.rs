//! Cache entry operations within a generation.
//!
//! The store enforces the admission rule itself: only GET requests with a
//! status 200 response are written. Anything else is rejected with
//! [`Error::NotCacheable`] so no caller can persist a failed or partial
//! response by accident.

use std::collections::BTreeMap;

use super::connection::CacheDb;
use super::hash::compute_request_key;
use crate::http::{Request, Response, ResponseSource};
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;
use url::Url;

/// Row shape shared by the insert paths.
struct EntryRow {
    key_hash: String,
    method: String,
    url: String,
    status: u16,
    headers_json: String,
    body: Vec<u8>,
}

fn admit(request: &Request, response: &Response) -> Result<EntryRow, Error> {
    if !request.is_get() {
        return Err(Error::NotCacheable(format!("{} {}", request.method, request.url)));
    }
    if !response.is_cacheable() {
        return Err(Error::NotCacheable(format!("status {} for {}", response.status, request.url)));
    }

    Ok(EntryRow {
        key_hash: compute_request_key(&request.method, request.url.as_str()),
        method: request.method.to_ascii_uppercase(),
        url: request.url.to_string(),
        status: response.status,
        headers_json: serde_json::to_string(&response.headers)?,
        body: response.body.clone(),
    })
}

fn insert_row(conn: &rusqlite::Connection, generation: &str, row: &EntryRow, now: &str) -> Result<(), Error> {
    conn.execute(
        "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
        params![generation, now],
    )?;
    conn.execute(
        "INSERT INTO entries (generation, key_hash, method, url, status, headers_json, body, stored_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(generation, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![generation, row.key_hash, row.method, row.url, row.status, row.headers_json, row.body, now],
    )?;
    Ok(())
}

impl CacheDb {
    /// Look up a request in a generation.
    ///
    /// Non-GET requests never match. A hit is returned with
    /// [`ResponseSource::Cache`].
    pub async fn match_entry(&self, generation: &str, request: &Request) -> Result<Option<Response>, Error> {
        if !request.is_get() {
            return Ok(None);
        }

        let generation = generation.to_string();
        let key_hash = compute_request_key(&request.method, request.url.as_str());
        let row = self
            .conn
            .call(move |conn| -> Result<Option<(u16, String, Vec<u8>)>, Error> {
                let result = conn.query_row(
                    "SELECT status, headers_json, body FROM entries WHERE generation = ?1 AND key_hash = ?2",
                    params![generation, key_hash],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                );

                match result {
                    Ok(r) => Ok(Some(r)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        let Some((status, headers_json, body)) = row else {
            return Ok(None);
        };
        let headers: BTreeMap<String, String> = serde_json::from_str(&headers_json)?;

        Ok(Some(Response { status, headers, body, source: ResponseSource::Cache }))
    }

    /// Insert or overwrite the entry for a request.
    ///
    /// Creates the generation if it does not exist yet.
    pub async fn put_entry(&self, generation: &str, request: &Request, response: &Response) -> Result<(), Error> {
        let row = admit(request, response)?;
        let generation = generation.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> { insert_row(conn, &generation, &row, &now) })
            .await
            .map_err(Error::from)
    }

    /// Write a batch of entries in a single transaction.
    ///
    /// Either every entry is written and the generation exists afterwards, or
    /// nothing changes. Used by install, which must not leave a half-seeded
    /// generation behind.
    pub async fn put_entries(&self, generation: &str, entries: &[(Request, Response)]) -> Result<(), Error> {
        let rows = entries
            .iter()
            .map(|(request, response)| admit(request, response))
            .collect::<Result<Vec<_>, _>>()?;
        let generation = generation.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![generation, now],
                )?;
                for row in &rows {
                    insert_row(&tx, &generation, row, &now)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Requests stored in a generation, ordered by URL.
    pub async fn entry_keys(&self, generation: &str) -> Result<Vec<Request>, Error> {
        let generation = generation.to_string();
        let rows = self
            .conn
            .call(move |conn| -> Result<Vec<(String, String)>, Error> {
                let mut stmt =
                    conn.prepare("SELECT method, url FROM entries WHERE generation = ?1 ORDER BY url ASC")?;
                let rows = stmt.query_map(params![generation], |row| Ok((row.get(0)?, row.get(1)?)))?;

                let mut keys = Vec::new();
                for row in rows {
                    keys.push(row?);
                }
                Ok(keys)
            })
            .await
            .map_err(Error::from)?;

        rows.into_iter()
            .map(|(method, url)| {
                let url = Url::parse(&url).map_err(|e| Error::Corrupt(format!("stored url {url}: {e}")))?;
                Ok(Request::new(&method, url))
            })
            .collect()
    }

    pub async fn count_entries(&self, generation: &str) -> Result<u64, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE generation = ?1", params![generation], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = get("https://example.com/static/main.js");
        let resp = Response::new(200, "console.log(1)").with_header("content-type", "text/javascript");

        db.put_entry("v1", &req, &resp).await.unwrap();

        let hit = db.match_entry("v1", &req).await.unwrap().unwrap();
        assert_eq!(hit.body, resp.body);
        assert_eq!(hit.content_type(), Some("text/javascript"));
        assert_eq!(hit.source, ResponseSource::Cache);
        assert!(db.has_generation("v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_match_other_generation_misses() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = get("https://example.com/");
        db.put_entry("v1", &req, &Response::new(200, "<html>")).await.unwrap();

        assert!(db.match_entry("v2", &req).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = get("https://example.com/");
        db.put_entry("v1", &req, &Response::new(200, "old")).await.unwrap();
        db.put_entry("v1", &req, &Response::new(200, "new")).await.unwrap();

        let hit = db.match_entry("v1", &req).await.unwrap().unwrap();
        assert_eq!(hit.text(), "new");
        assert_eq!(db.count_entries("v1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rejects_non_get() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = Request::new("POST", Url::parse("https://example.com/upload").unwrap());

        let result = db.put_entry("v1", &req, &Response::new(200, "{}")).await;
        assert!(matches!(result, Err(Error::NotCacheable(_))));
        assert!(db.match_entry("v1", &req).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejects_non_200() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = get("https://example.com/video");

        for status in [206, 404, 500] {
            let result = db.put_entry("v1", &req, &Response::new(status, "")).await;
            assert!(matches!(result, Err(Error::NotCacheable(_))));
        }
        assert_eq!(db.count_entries("v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_put_entries_is_atomic() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let entries = vec![
            (get("https://example.com/"), Response::new(200, "<html>")),
            (get("https://example.com/broken"), Response::new(404, "")),
        ];

        assert!(db.put_entries("v2", &entries).await.is_err());
        assert!(!db.has_generation("v2").await.unwrap());
    }

    #[tokio::test]
    async fn test_entry_keys() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let a = get("https://example.com/a.js");
        let b = get("https://example.com/b.js");
        db.put_entries("v1", &[(b.clone(), Response::new(200, "b")), (a.clone(), Response::new(200, "a"))])
            .await
            .unwrap();

        let keys = db.entry_keys("v1").await.unwrap();
        assert_eq!(keys, vec![a, b]);
    }

    #[tokio::test]
    async fn test_deleting_generation_cascades() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = get("https://example.com/");
        db.put_entry("v1", &req, &Response::new(200, "<html>")).await.unwrap();

        db.delete_generation("v1").await.unwrap();
        assert_eq!(db.count_entries("v1").await.unwrap(), 0);
    }
}
