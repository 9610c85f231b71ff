//! Pending mutation queue.
//!
//! Holds mutating requests that could not reach the network. Rows are only
//! removed after a confirmed replay; a failed replay bumps the attempt
//! counter and keeps the row in place for the next sync.

use std::collections::BTreeMap;

use super::connection::CacheDb;
use crate::http::Request;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use url::Url;

/// A queued request awaiting replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub id: i64,
    pub queue: String,
    pub request: Request,
    pub enqueued_at: String,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub last_attempt_at: Option<String>,
}

type PendingRow = (i64, String, String, String, String, Option<Vec<u8>>, String, u32, Option<String>, Option<String>);

impl CacheDb {
    /// Append a request to the named queue, returning its id.
    pub async fn enqueue_pending(&self, queue: &str, request: &Request) -> Result<i64, Error> {
        let queue = queue.to_string();
        let method = request.method.clone();
        let url = request.url.to_string();
        let headers_json = serde_json::to_string(&request.headers)?;
        let body = request.body.clone();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<i64, Error> {
                conn.execute(
                    "INSERT INTO pending_requests (queue, method, url, headers_json, body, enqueued_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![queue, method, url, headers_json, body, now],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(Error::from)
    }

    /// Queued requests in enqueue order.
    pub async fn list_pending(&self, queue: &str) -> Result<Vec<PendingRequest>, Error> {
        let queue = queue.to_string();
        let rows = self
            .conn
            .call(move |conn| -> Result<Vec<PendingRow>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT id, queue, method, url, headers_json, body, enqueued_at,
                            attempts, last_error, last_attempt_at
                     FROM pending_requests WHERE queue = ?1 ORDER BY id ASC",
                )?;
                let rows = stmt.query_map(params![queue], |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                        row.get(8)?,
                        row.get(9)?,
                    ))
                })?;

                let mut pending = Vec::new();
                for row in rows {
                    pending.push(row?);
                }
                Ok(pending)
            })
            .await
            .map_err(Error::from)?;

        rows.into_iter().map(decode_pending).collect()
    }

    /// Remove a request after a successful replay.
    pub async fn remove_pending(&self, id: i64) -> Result<bool, Error> {
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM pending_requests WHERE id = ?1", params![id])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Record a failed replay attempt; the request stays queued.
    pub async fn record_pending_failure(&self, id: i64, error: &str) -> Result<(), Error> {
        let error = error.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "UPDATE pending_requests
                     SET attempts = attempts + 1, last_error = ?2, last_attempt_at = ?3
                     WHERE id = ?1",
                    params![id, error, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    pub async fn count_pending(&self, queue: &str) -> Result<u64, Error> {
        let queue = queue.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM pending_requests WHERE queue = ?1",
                    params![queue],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

fn decode_pending(row: PendingRow) -> Result<PendingRequest, Error> {
    let (id, queue, method, url, headers_json, body, enqueued_at, attempts, last_error, last_attempt_at) = row;
    let url = Url::parse(&url).map_err(|e| Error::Corrupt(format!("queued url {url}: {e}")))?;
    let headers: BTreeMap<String, String> = serde_json::from_str(&headers_json)?;

    Ok(PendingRequest {
        id,
        queue,
        request: Request { method, url, headers, body },
        enqueued_at,
        attempts,
        last_error,
        last_attempt_at,
    })
}
