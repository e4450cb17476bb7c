//! Repository contract the analytics core consumes.
//!
//! The core never composes queries; it asks for typed collections through
//! explicit methods with typed filter parameters and leaves the query shape
//! to the implementation. All reads are snapshot reads; the single write is
//! the sentiment label persistence owned by the aggregator.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{
    CustomerProfile, Interaction, Inventory, Order, OrderLine, Product, ProductId, Review,
    ReviewId, SentimentLabel, UserId, VendorId,
};

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("data access failure: {0}")]
    Backend(String),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Typed product query filter; `None` fields are unconstrained.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProductFilter {
    pub vendor: Option<VendorId>,
    pub category: Option<String>,
}

impl ProductFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_vendor(vendor: VendorId) -> Self {
        Self { vendor: Some(vendor), category: None }
    }

    pub fn for_category(category: impl Into<String>) -> Self {
        Self { vendor: None, category: Some(category.into()) }
    }
}

/// Typed order-history filter; `None` fields are unconstrained.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OrderFilter {
    pub vendor: Option<VendorId>,
    pub product: Option<ProductId>,
    pub category: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl OrderFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_vendor(vendor: VendorId) -> Self {
        Self { vendor: Some(vendor), ..Self::default() }
    }

    pub fn for_product(product: ProductId) -> Self {
        Self { product: Some(product), ..Self::default() }
    }

    pub fn for_category(category: impl Into<String>) -> Self {
        Self { category: Some(category.into()), ..Self::default() }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReviewFilter {
    pub product: Option<ProductId>,
    pub vendor: Option<VendorId>,
    /// When true, only reviews without an assigned sentiment label.
    pub unclassified_only: bool,
}

impl ReviewFilter {
    pub fn for_product(product: ProductId) -> Self {
        Self { product: Some(product), ..Self::default() }
    }

    pub fn for_vendor(vendor: VendorId) -> Self {
        Self { vendor: Some(vendor), ..Self::default() }
    }
}

/// Read accessors over the storefront's transactional data, plus the one
/// write the sentiment aggregator owns.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn products(&self, filter: ProductFilter) -> Result<Vec<Product>, AccessError>;

    async fn inventory_for(&self, product: ProductId)
        -> Result<Option<Inventory>, AccessError>;

    async fn orders(&self, filter: OrderFilter) -> Result<Vec<Order>, AccessError>;

    /// Order details joined with their parent order timestamp and user.
    async fn order_lines(&self, filter: OrderFilter) -> Result<Vec<OrderLine>, AccessError>;

    async fn reviews(&self, filter: ReviewFilter) -> Result<Vec<Review>, AccessError>;

    /// Profiles for the given users; users without a stored profile are
    /// silently absent from the result.
    async fn profiles(&self, users: &[UserId]) -> Result<Vec<CustomerProfile>, AccessError>;

    /// The full append-only interaction log.
    async fn interactions(&self) -> Result<Vec<Interaction>, AccessError>;

    /// Persist a classifier-assigned sentiment label on a review.
    async fn set_review_sentiment(
        &self,
        review: ReviewId,
        label: SentimentLabel,
    ) -> Result<(), AccessError>;
}
