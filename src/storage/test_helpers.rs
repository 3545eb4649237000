//! Shared test helpers for storage module tests.

use std::sync::Arc;

use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::policy::{Vendor, VendorVerdict};
use crate::storage::run_migrations;

/// Creates a test database pool with migrations applied.
///
/// In-memory SQLite databases are per connection, so the pool holds exactly one.
pub async fn create_test_pool() -> Arc<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test database pool");
    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    Arc::new(pool)
}

/// An authorized verdict with an empty chain.
pub fn authorized_verdict(vendor: Vendor) -> VendorVerdict {
    VendorVerdict::authorized(vendor, Vec::new(), None, Utc::now())
}
