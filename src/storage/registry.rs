//! The URL registry: the persistence contract for verification results.
//!
//! All writes are upserts keyed on the unique `host` column, so re-submitting a
//! host replaces its previous row and concurrent writers resolve to the last
//! write.

use std::path::Path;
use std::sync::Arc;

use log::debug;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::error_handling::DatabaseError;
use crate::policy::VendorVerdict;
use crate::score::TrustScore;

use super::models::{UrlRecord, UrlUpsert};
use super::{init_db_pool_with_path, run_migrations};

const SELECT_COLUMNS: &str = "SELECT id, host, tls, trust, trust_edge, trust_chrome, trust_firefox,
        chain_edge, chain_chrome, chain_firefox, updated_at_ms FROM urls";

/// Handle to the `urls` table. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Registry {
    pool: Arc<SqlitePool>,
}

fn encode_verdict(verdict: &Option<VendorVerdict>) -> Result<Option<String>, DatabaseError> {
    verdict
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(DatabaseError::SerializationError)
}

fn decode_verdict(
    row: &SqliteRow,
    column: &'static str,
) -> Result<Option<VendorVerdict>, DatabaseError> {
    let text: Option<String> = row.try_get(column)?;
    let verdict: Option<VendorVerdict> = text
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(DatabaseError::SerializationError)?;
    match verdict {
        Some(v) if v.authorized != v.error_code.is_none() => {
            Err(DatabaseError::InconsistentVerdict(column))
        }
        verdict => Ok(verdict),
    }
}

fn decode_score(row: &SqliteRow, column: &'static str) -> Result<TrustScore, DatabaseError> {
    let value: i64 = row.try_get(column)?;
    TrustScore::try_from(value).map_err(|_| DatabaseError::InvalidScore { column, value })
}

fn record_from_row(row: &SqliteRow) -> Result<UrlRecord, DatabaseError> {
    Ok(UrlRecord {
        id: row.try_get("id")?,
        host: row.try_get("host")?,
        tls: row.try_get("tls")?,
        trust: decode_score(row, "trust")?,
        trust_edge: decode_score(row, "trust_edge")?,
        trust_chrome: decode_score(row, "trust_chrome")?,
        trust_firefox: decode_score(row, "trust_firefox")?,
        chain_edge: decode_verdict(row, "chain_edge")?,
        chain_chrome: decode_verdict(row, "chain_chrome")?,
        chain_firefox: decode_verdict(row, "chain_firefox")?,
        updated_at_ms: row.try_get("updated_at_ms")?,
    })
}

impl Registry {
    /// Opens (creating if needed) the database at `path` and applies migrations.
    pub async fn open(path: &Path) -> Result<Self, DatabaseError> {
        let pool = init_db_pool_with_path(path).await?;
        Self::with_pool(pool).await
    }

    /// Wraps an existing pool, applying migrations.
    pub async fn with_pool(pool: Arc<SqlitePool>) -> Result<Self, DatabaseError> {
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Inserts or replaces the row for `record.host`. Returns the row id.
    pub async fn upsert(&self, record: &UrlUpsert) -> Result<i64, DatabaseError> {
        debug!(
            "Upserting {} (trust={}, firefox={}, chrome={}, edge={})",
            record.host, record.trust, record.trust_firefox, record.trust_chrome, record.trust_edge
        );

        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO urls (
                host, tls, trust, trust_edge, trust_chrome, trust_firefox,
                chain_edge, chain_chrome, chain_firefox, updated_at_ms
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(host) DO UPDATE SET
                tls=excluded.tls,
                trust=excluded.trust,
                trust_edge=excluded.trust_edge,
                trust_chrome=excluded.trust_chrome,
                trust_firefox=excluded.trust_firefox,
                chain_edge=excluded.chain_edge,
                chain_chrome=excluded.chain_chrome,
                chain_firefox=excluded.chain_firefox,
                updated_at_ms=excluded.updated_at_ms
            RETURNING id",
        )
        .bind(&record.host)
        .bind(record.tls)
        .bind(i64::from(record.trust.value()))
        .bind(i64::from(record.trust_edge.value()))
        .bind(i64::from(record.trust_chrome.value()))
        .bind(i64::from(record.trust_firefox.value()))
        .bind(encode_verdict(&record.chain_edge)?)
        .bind(encode_verdict(&record.chain_chrome)?)
        .bind(encode_verdict(&record.chain_firefox)?)
        .bind(record.updated_at_ms)
        .fetch_one(self.pool())
        .await?;

        Ok(id)
    }

    /// All rows, ordered by host.
    pub async fn get_all(&self) -> Result<Vec<UrlRecord>, DatabaseError> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY host"))
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(record_from_row).collect()
    }

    /// The row for a normalized host key, if any.
    pub async fn get(&self, host: &str) -> Result<Option<UrlRecord>, DatabaseError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE host = ?"))
            .bind(host)
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(record_from_row).transpose()
    }

    /// Deletes one host. Returns whether a row existed.
    pub async fn delete(&self, host: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM urls WHERE host = ?")
            .bind(host)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Deletes every row. Returns the number removed.
    pub async fn delete_all(&self) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM urls").execute(self.pool()).await?;
        debug!("Deleted {} registry rows", result.rows_affected());
        Ok(result.rows_affected())
    }

    pub async fn count(&self) -> Result<i64, DatabaseError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM urls")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }
}
