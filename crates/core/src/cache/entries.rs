//! Captured responses and per-entry operations.

use std::fmt;
use std::str::FromStr;

use super::connection::CacheDb;
use super::hash::compute_cache_key;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// How a response relates to the application origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin response with full access to status, headers and body.
    Basic,
    /// Cross-origin response the remote explicitly shared.
    Cors,
    /// Cross-origin response the caller may not inspect.
    Opaque,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Basic => "basic",
            ResponseType::Cors => "cors",
            ResponseType::Opaque => "opaque",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(ResponseType::Basic),
            "cors" => Ok(ResponseType::Cors),
            "opaque" => Ok(ResponseType::Opaque),
            other => Err(Error::CorruptEntry(format!("unknown response type: {other}"))),
        }
    }
}

/// A response captured into a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    /// Canonical request URL the entry is keyed by.
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub response_type: ResponseType,
    /// Header pairs in the order they were received.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Set by storage when the entry is written.
    pub stored_at: Option<String>,
}

impl CachedResponse {
    /// Case-insensitive header lookup; first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

impl CacheDb {
    /// Store a response in a bucket, creating the bucket if it is absent.
    ///
    /// An existing entry for the same URL is replaced (last write wins).
    pub async fn put(&self, bucket: &str, response: &CachedResponse) -> Result<(), Error> {
        let bucket = bucket.to_string();
        let response = response.clone();
        let headers_json = serde_json::to_string(&response.headers)?;
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO buckets (name, created_at) VALUES (?1, ?2)",
                    params![&bucket, &now],
                )?;
                conn.execute(
                    "INSERT INTO entries (
                    bucket, key_hash, url, status, status_text, response_type, headers_json, body, stored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(bucket, key_hash) DO UPDATE SET
                    url = excluded.url,
                    status = excluded.status,
                    status_text = excluded.status_text,
                    response_type = excluded.response_type,
                    headers_json = excluded.headers_json,
                    body = excluded.body,
                    stored_at = excluded.stored_at",
                    params![
                        &bucket,
                        compute_cache_key(&response.url),
                        &response.url,
                        response.status,
                        &response.status_text,
                        response.response_type.as_str(),
                        &headers_json,
                        &response.body,
                        &now,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a request URL in one bucket.
    ///
    /// Returns None if the bucket or the entry doesn't exist.
    pub async fn match_url(&self, bucket: &str, url: &str) -> Result<Option<CachedResponse>, Error> {
        let bucket = bucket.to_string();
        let key_hash = compute_cache_key(url);
        self.conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, status, status_text, response_type, headers_json, body, stored_at
                FROM entries WHERE bucket = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![bucket, key_hash], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, u16>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, Vec<u8>>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                });

                match result {
                    Ok((url, status, status_text, response_type, headers_json, body, stored_at)) => {
                        Ok(Some(CachedResponse {
                            url,
                            status,
                            status_text,
                            response_type: response_type.parse()?,
                            headers: serde_json::from_str(&headers_json)?,
                            body,
                            stored_at: Some(stored_at),
                        }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }
}
