//! Deterministic demo storefront seed.
//!
//! Two vendors, six products, three months of order history, reviews in
//! mixed classification states and an interaction log, sized so every
//! analytics pipeline has signal to work with.

use sqlx::{Executor, Row};

use vendorsight_core::access::AccessError;

use crate::connection::DbPool;

const SEED_TABLES: &[(&str, i64)] = &[
    ("customer_profile", 6),
    ("product", 6),
    ("inventory", 4),
    ("store_order", 18),
    ("order_line", 23),
    ("product_review", 8),
    ("user_interaction", 16),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedResult {
    pub profiles: i64,
    pub products: i64,
    pub orders: i64,
    pub order_lines: i64,
    pub reviews: i64,
    pub interactions: i64,
}

pub struct DemoStorefront;

impl DemoStorefront {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_storefront.sql");

    /// Load the demo dataset in one transaction and verify the row counts
    /// match the seed contract.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, AccessError> {
        let mut tx = pool.begin().await.map_err(backend)?;
        tx.execute(sqlx::query(Self::SQL)).await.map_err(backend)?;
        tx.commit().await.map_err(backend)?;

        for (table, expected) in SEED_TABLES {
            let count = Self::count(pool, table).await?;
            if count != *expected {
                return Err(AccessError::Backend(format!(
                    "seed verification failed: {table} has {count} rows, expected {expected}"
                )));
            }
        }

        Ok(SeedResult {
            profiles: Self::count(pool, "customer_profile").await?,
            products: Self::count(pool, "product").await?,
            orders: Self::count(pool, "store_order").await?,
            order_lines: Self::count(pool, "order_line").await?,
            reviews: Self::count(pool, "product_review").await?,
            interactions: Self::count(pool, "user_interaction").await?,
        })
    }

    async fn count(pool: &DbPool, table: &str) -> Result<i64, AccessError> {
        // table names come from the static seed contract above
        let row = sqlx::query(&format!("SELECT COUNT(*) AS count FROM {table}"))
            .fetch_one(pool)
            .await
            .map_err(backend)?;
        row.try_get("count").map_err(backend)
    }
}

fn backend(error: sqlx::Error) -> AccessError {
    AccessError::Backend(error.to_string())
}
