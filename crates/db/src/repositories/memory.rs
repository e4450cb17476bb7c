//! In-memory repository for tests and local development. Mirrors the filter
//! semantics of the SQL implementation over plain vectors.

use tokio::sync::RwLock;

use vendorsight_core::access::{AccessError, OrderFilter, ProductFilter, ReviewFilter};
use vendorsight_core::domain::{
    CustomerProfile, Interaction, Inventory, Order, OrderLine, Product, ProductId, Review,
    ReviewId, SentimentLabel, UserId, VendorId,
};
use vendorsight_core::Repository;

#[derive(Default)]
struct Snapshot {
    products: Vec<Product>,
    inventories: Vec<Inventory>,
    orders: Vec<Order>,
    lines: Vec<OrderLine>,
    reviews: Vec<Review>,
    profiles: Vec<CustomerProfile>,
    interactions: Vec<Interaction>,
}

#[derive(Default)]
pub struct InMemoryRepository {
    snapshot: RwLock<Snapshot>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_product(&self, product: Product) {
        self.snapshot.write().await.products.push(product);
    }

    pub async fn insert_inventory(&self, inventory: Inventory) {
        self.snapshot.write().await.inventories.push(inventory);
    }

    pub async fn insert_order(&self, order: Order) {
        self.snapshot.write().await.orders.push(order);
    }

    pub async fn insert_order_line(&self, line: OrderLine) {
        self.snapshot.write().await.lines.push(line);
    }

    pub async fn insert_review(&self, review: Review) {
        self.snapshot.write().await.reviews.push(review);
    }

    pub async fn insert_profile(&self, profile: CustomerProfile) {
        self.snapshot.write().await.profiles.push(profile);
    }

    pub async fn insert_interaction(&self, interaction: Interaction) {
        self.snapshot.write().await.interactions.push(interaction);
    }
}

fn vendor_of(products: &[Product], product: ProductId) -> Option<VendorId> {
    products.iter().find(|p| p.id == product).map(|p| p.vendor_id)
}

fn categories_of<'a>(products: &'a [Product], product: ProductId) -> &'a [String] {
    products
        .iter()
        .find(|p| p.id == product)
        .map(|p| p.categories.as_slice())
        .unwrap_or(&[])
}

fn line_matches(snapshot: &Snapshot, line: &OrderLine, filter: &OrderFilter) -> bool {
    if let Some(vendor) = filter.vendor {
        if vendor_of(&snapshot.products, line.product_id) != Some(vendor) {
            return false;
        }
    }
    if let Some(product) = filter.product {
        if line.product_id != product {
            return false;
        }
    }
    if let Some(category) = &filter.category {
        if !categories_of(&snapshot.products, line.product_id).contains(category) {
            return false;
        }
    }
    if let Some(since) = filter.since {
        if line.placed_at < since {
            return false;
        }
    }
    if let Some(until) = filter.until {
        if line.placed_at > until {
            return false;
        }
    }
    true
}

#[async_trait::async_trait]
impl Repository for InMemoryRepository {
    async fn products(&self, filter: ProductFilter) -> Result<Vec<Product>, AccessError> {
        let snapshot = self.snapshot.read().await;
        Ok(snapshot
            .products
            .iter()
            .filter(|product| {
                filter.vendor.map(|vendor| product.vendor_id == vendor).unwrap_or(true)
                    && filter
                        .category
                        .as_ref()
                        .map(|category| product.categories.contains(category))
                        .unwrap_or(true)
            })
            .cloned()
            .collect())
    }

    async fn inventory_for(
        &self,
        product: ProductId,
    ) -> Result<Option<Inventory>, AccessError> {
        let snapshot = self.snapshot.read().await;
        Ok(snapshot.inventories.iter().find(|inv| inv.product_id == product).copied())
    }

    async fn orders(&self, filter: OrderFilter) -> Result<Vec<Order>, AccessError> {
        let snapshot = self.snapshot.read().await;
        Ok(snapshot
            .orders
            .iter()
            .filter(|order| {
                let order_lines: Vec<&OrderLine> =
                    snapshot.lines.iter().filter(|line| line.order_id == order.id).collect();
                let scope_ok = (filter.vendor.is_none()
                    && filter.product.is_none()
                    && filter.category.is_none())
                    || order_lines.iter().any(|line| {
                        line_matches(
                            &snapshot,
                            line,
                            &OrderFilter { since: None, until: None, ..filter.clone() },
                        )
                    });
                let since_ok = filter.since.map(|since| order.placed_at >= since).unwrap_or(true);
                let until_ok = filter.until.map(|until| order.placed_at <= until).unwrap_or(true);
                scope_ok && since_ok && until_ok
            })
            .cloned()
            .collect())
    }

    async fn order_lines(&self, filter: OrderFilter) -> Result<Vec<OrderLine>, AccessError> {
        let snapshot = self.snapshot.read().await;
        Ok(snapshot
            .lines
            .iter()
            .filter(|line| line_matches(&snapshot, line, &filter))
            .cloned()
            .collect())
    }

    async fn reviews(&self, filter: ReviewFilter) -> Result<Vec<Review>, AccessError> {
        let snapshot = self.snapshot.read().await;
        Ok(snapshot
            .reviews
            .iter()
            .filter(|review| {
                filter.product.map(|product| review.product_id == product).unwrap_or(true)
                    && filter
                        .vendor
                        .map(|vendor| {
                            vendor_of(&snapshot.products, review.product_id) == Some(vendor)
                        })
                        .unwrap_or(true)
                    && (!filter.unclassified_only || review.sentiment.is_none())
            })
            .cloned()
            .collect())
    }

    async fn profiles(&self, users: &[UserId]) -> Result<Vec<CustomerProfile>, AccessError> {
        let snapshot = self.snapshot.read().await;
        Ok(snapshot
            .profiles
            .iter()
            .filter(|profile| users.contains(&profile.user_id))
            .cloned()
            .collect())
    }

    async fn interactions(&self) -> Result<Vec<Interaction>, AccessError> {
        let snapshot = self.snapshot.read().await;
        Ok(snapshot.interactions.clone())
    }

    async fn set_review_sentiment(
        &self,
        review: ReviewId,
        label: SentimentLabel,
    ) -> Result<(), AccessError> {
        let mut snapshot = self.snapshot.write().await;
        if let Some(stored) = snapshot.reviews.iter_mut().find(|stored| stored.id == review) {
            stored.sentiment = Some(label);
        }
        Ok(())
    }
}
