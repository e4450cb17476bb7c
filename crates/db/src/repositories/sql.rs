//! SQLite-backed implementation of the analytics repository contract.
//!
//! Filters arrive typed and are translated here into static SQL with
//! nullable binds, so an unconstrained field simply disables its predicate.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row};

use vendorsight_core::access::{AccessError, OrderFilter, ProductFilter, ReviewFilter};
use vendorsight_core::domain::{
    CustomerProfile, Gender, Interaction, InteractionKind, Inventory, Order, OrderId, OrderLine,
    OrderStatus, Product, ProductId, Review, ReviewId, SentimentLabel, UserId, VendorId,
};
use vendorsight_core::Repository;

use crate::DbPool;

pub struct SqlRepository {
    pool: DbPool,
}

impl SqlRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn categories_by_product(&self) -> Result<HashMap<i64, Vec<String>>, AccessError> {
        let rows = sqlx::query(
            "SELECT product_id, category
             FROM product_category
             ORDER BY product_id, position, category",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let mut categories: HashMap<i64, Vec<String>> = HashMap::new();
        for row in rows {
            let product_id = row.try_get::<i64, _>("product_id").map_err(backend)?;
            let category = row.try_get::<String, _>("category").map_err(backend)?;
            categories.entry(product_id).or_default().push(category);
        }
        Ok(categories)
    }
}

#[async_trait::async_trait]
impl Repository for SqlRepository {
    async fn products(&self, filter: ProductFilter) -> Result<Vec<Product>, AccessError> {
        let rows = sqlx::query(
            "SELECT p.id, p.vendor_id, p.name, p.description, p.price, p.total_views
             FROM product p
             WHERE (?1 IS NULL OR p.vendor_id = ?1)
               AND (?2 IS NULL OR EXISTS (
                   SELECT 1 FROM product_category pc
                   WHERE pc.product_id = p.id AND pc.category = ?2))
             ORDER BY p.id",
        )
        .bind(filter.vendor.map(|vendor| vendor.0))
        .bind(filter.category)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let mut categories = self.categories_by_product().await?;
        rows.into_iter()
            .map(|row| {
                let id = row.try_get::<i64, _>("id").map_err(backend)?;
                Ok(Product {
                    id: ProductId(id),
                    vendor_id: VendorId(row.try_get("vendor_id").map_err(backend)?),
                    name: row.try_get("name").map_err(backend)?,
                    description: row.try_get("description").map_err(backend)?,
                    price: decimal_column(&row, "price")?,
                    categories: categories.remove(&id).unwrap_or_default(),
                    total_views: unsigned_column(&row, "total_views")?,
                })
            })
            .collect()
    }

    async fn inventory_for(
        &self,
        product: ProductId,
    ) -> Result<Option<Inventory>, AccessError> {
        let row = sqlx::query(
            "SELECT product_id, current_stock, safety_stock_level, reorder_point
             FROM inventory
             WHERE product_id = ?1",
        )
        .bind(product.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(|row| {
            Ok(Inventory {
                product_id: ProductId(row.try_get("product_id").map_err(backend)?),
                current_stock: unsigned_column(&row, "current_stock")? as u32,
                safety_stock_level: unsigned_column(&row, "safety_stock_level")? as u32,
                reorder_point: unsigned_column(&row, "reorder_point")? as u32,
            })
        })
        .transpose()
    }

    async fn orders(&self, filter: OrderFilter) -> Result<Vec<Order>, AccessError> {
        let rows = sqlx::query(
            "SELECT o.id, o.user_id, o.placed_at, o.total_amount, o.status
             FROM store_order o
             WHERE (?1 IS NULL OR EXISTS (
                   SELECT 1 FROM order_line l
                   JOIN product p ON p.id = l.product_id
                   WHERE l.order_id = o.id AND p.vendor_id = ?1))
               AND (?2 IS NULL OR EXISTS (
                   SELECT 1 FROM order_line l
                   WHERE l.order_id = o.id AND l.product_id = ?2))
               AND (?3 IS NULL OR EXISTS (
                   SELECT 1 FROM order_line l
                   JOIN product_category pc ON pc.product_id = l.product_id
                   WHERE l.order_id = o.id AND pc.category = ?3))
               AND (?4 IS NULL OR o.placed_at >= ?4)
               AND (?5 IS NULL OR o.placed_at <= ?5)
             ORDER BY o.id",
        )
        .bind(filter.vendor.map(|vendor| vendor.0))
        .bind(filter.product.map(|product| product.0))
        .bind(filter.category)
        .bind(filter.since)
        .bind(filter.until)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter()
            .map(|row| {
                Ok(Order {
                    id: OrderId(row.try_get("id").map_err(backend)?),
                    user_id: UserId(row.try_get("user_id").map_err(backend)?),
                    placed_at: row
                        .try_get::<DateTime<Utc>, _>("placed_at")
                        .map_err(backend)?,
                    total_amount: decimal_column(&row, "total_amount")?,
                    status: parsed_column::<OrderStatus>(&row, "status")?,
                })
            })
            .collect()
    }

    async fn order_lines(&self, filter: OrderFilter) -> Result<Vec<OrderLine>, AccessError> {
        let rows = sqlx::query(
            "SELECT l.order_id, l.product_id, o.user_id, l.quantity, l.unit_price, o.placed_at
             FROM order_line l
             JOIN store_order o ON o.id = l.order_id
             JOIN product p ON p.id = l.product_id
             WHERE (?1 IS NULL OR p.vendor_id = ?1)
               AND (?2 IS NULL OR l.product_id = ?2)
               AND (?3 IS NULL OR EXISTS (
                   SELECT 1 FROM product_category pc
                   WHERE pc.product_id = l.product_id AND pc.category = ?3))
               AND (?4 IS NULL OR o.placed_at >= ?4)
               AND (?5 IS NULL OR o.placed_at <= ?5)
             ORDER BY o.placed_at, l.id",
        )
        .bind(filter.vendor.map(|vendor| vendor.0))
        .bind(filter.product.map(|product| product.0))
        .bind(filter.category)
        .bind(filter.since)
        .bind(filter.until)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter()
            .map(|row| {
                Ok(OrderLine {
                    order_id: OrderId(row.try_get("order_id").map_err(backend)?),
                    product_id: ProductId(row.try_get("product_id").map_err(backend)?),
                    user_id: UserId(row.try_get("user_id").map_err(backend)?),
                    quantity: unsigned_column(&row, "quantity")? as u32,
                    unit_price: decimal_column(&row, "unit_price")?,
                    placed_at: row
                        .try_get::<DateTime<Utc>, _>("placed_at")
                        .map_err(backend)?,
                })
            })
            .collect()
    }

    async fn reviews(&self, filter: ReviewFilter) -> Result<Vec<Review>, AccessError> {
        let rows = sqlx::query(
            "SELECT r.id, r.product_id, r.user_id, r.rating, r.comment, r.sentiment
             FROM product_review r
             JOIN product p ON p.id = r.product_id
             WHERE (?1 IS NULL OR r.product_id = ?1)
               AND (?2 IS NULL OR p.vendor_id = ?2)
               AND (?3 = 0 OR r.sentiment IS NULL)
             ORDER BY r.id",
        )
        .bind(filter.product.map(|product| product.0))
        .bind(filter.vendor.map(|vendor| vendor.0))
        .bind(filter.unclassified_only)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter()
            .map(|row| {
                let sentiment = row
                    .try_get::<Option<String>, _>("sentiment")
                    .map_err(backend)?
                    .map(|value| {
                        SentimentLabel::from_str(&value).map_err(AccessError::Decode)
                    })
                    .transpose()?;
                Ok(Review {
                    id: ReviewId(row.try_get("id").map_err(backend)?),
                    product_id: ProductId(row.try_get("product_id").map_err(backend)?),
                    user_id: UserId(row.try_get("user_id").map_err(backend)?),
                    rating: unsigned_column(&row, "rating")? as u8,
                    comment: row.try_get("comment").map_err(backend)?,
                    sentiment,
                })
            })
            .collect()
    }

    async fn profiles(&self, users: &[UserId]) -> Result<Vec<CustomerProfile>, AccessError> {
        if users.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::new(
            "SELECT user_id, date_of_birth, gender FROM customer_profile WHERE user_id IN (",
        );
        let mut separated = builder.separated(", ");
        for user in users {
            separated.push_bind(user.0);
        }
        separated.push_unseparated(") ORDER BY user_id");

        let rows = builder.build().fetch_all(&self.pool).await.map_err(backend)?;
        rows.into_iter()
            .map(|row| {
                Ok(CustomerProfile {
                    user_id: UserId(row.try_get("user_id").map_err(backend)?),
                    date_of_birth: row
                        .try_get::<NaiveDate, _>("date_of_birth")
                        .map_err(backend)?,
                    gender: parsed_column::<Gender>(&row, "gender")?,
                })
            })
            .collect()
    }

    async fn interactions(&self) -> Result<Vec<Interaction>, AccessError> {
        let rows = sqlx::query(
            "SELECT user_id, product_id, kind, occurred_at
             FROM user_interaction
             ORDER BY occurred_at, id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter()
            .map(|row| {
                Ok(Interaction {
                    user_id: UserId(row.try_get("user_id").map_err(backend)?),
                    product_id: ProductId(row.try_get("product_id").map_err(backend)?),
                    kind: parsed_column::<InteractionKind>(&row, "kind")?,
                    occurred_at: row
                        .try_get::<DateTime<Utc>, _>("occurred_at")
                        .map_err(backend)?,
                })
            })
            .collect()
    }

    async fn set_review_sentiment(
        &self,
        review: ReviewId,
        label: SentimentLabel,
    ) -> Result<(), AccessError> {
        sqlx::query("UPDATE product_review SET sentiment = ?1 WHERE id = ?2")
            .bind(label.as_str())
            .bind(review.0)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }
}

fn backend(error: sqlx::Error) -> AccessError {
    AccessError::Backend(error.to_string())
}

fn decimal_column(row: &SqliteRow, column: &str) -> Result<Decimal, AccessError> {
    let raw = row.try_get::<String, _>(column).map_err(backend)?;
    Decimal::from_str(&raw)
        .map_err(|error| AccessError::Decode(format!("{column}: {error}")))
}

fn unsigned_column(row: &SqliteRow, column: &str) -> Result<u64, AccessError> {
    let raw = row.try_get::<i64, _>(column).map_err(backend)?;
    u64::try_from(raw)
        .map_err(|_| AccessError::Decode(format!("{column}: negative value {raw}")))
}

fn parsed_column<T: FromStr<Err = String>>(
    row: &SqliteRow,
    column: &str,
) -> Result<T, AccessError> {
    let raw = row.try_get::<String, _>(column).map_err(backend)?;
    raw.parse().map_err(AccessError::Decode)
}
