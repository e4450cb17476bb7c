//! Vendor-facing orchestration over the analytic engines.
//!
//! `VendorAnalytics` fetches typed snapshots through the repository contract
//! and delegates to the pure pipelines. Access guards (login, vendor checks)
//! run before any of this is reached; the service never re-checks identity.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, instrument};

use crate::access::{OrderFilter, ProductFilter, Repository, ReviewFilter};
use crate::cache::{AnalyticsBundle, AnalyticsCache, CacheStore, CategoryForecast};
use crate::config::AnalyticsConfig;
use crate::domain::{Product, ProductId, Review, UserId, VendorId};
use crate::errors::AnalyticsError;
use crate::features::{self, InteractionMatrix};
use crate::forecast::{ForecastEngine, ForecastPoint};
use crate::inventory::{InventoryPredictor, InventoryPrediction};
use crate::recommend::{ProductDocument, RecommendationEngine};
use crate::segmentation::{CustomerSegmentation, SegmentationEngine};
use crate::sentiment::{self, SentimentAggregator, SentimentClassifier, SentimentCounts};
use crate::stats::{calculate_vendor_stats, VendorStats};

/// Forecasting scope: one vendor's whole order history, or one category
/// across the storefront.
#[derive(Clone, Debug, PartialEq)]
pub enum ForecastScope {
    Vendor(VendorId),
    Category(String),
}

impl ForecastScope {
    fn to_filter(&self) -> OrderFilter {
        match self {
            Self::Vendor(vendor) => OrderFilter::for_vendor(*vendor),
            Self::Category(category) => OrderFilter::for_category(category.clone()),
        }
    }
}

pub struct VendorAnalytics {
    repository: Arc<dyn Repository>,
    aggregator: SentimentAggregator,
    cache: AnalyticsCache,
    config: AnalyticsConfig,
    engine: RecommendationEngine,
}

impl VendorAnalytics {
    pub fn new(
        repository: Arc<dyn Repository>,
        classifier: Arc<dyn SentimentClassifier>,
        store: Arc<dyn CacheStore>,
        config: AnalyticsConfig,
    ) -> Self {
        let cache = AnalyticsCache::new(
            store,
            Duration::from_secs(config.cache.ttl_secs),
            Duration::from_secs(config.cache.compute_timeout_secs),
        );
        Self {
            repository,
            aggregator: SentimentAggregator::new(classifier),
            cache,
            config,
            engine: RecommendationEngine::new(),
        }
    }

    /// Hybrid product recommendations for `product_id`, at most `n` entries,
    /// never containing the query product. `user` feeds the collaborative
    /// half; without one (or without history) the ranking is pure
    /// content-based.
    #[instrument(skip(self))]
    pub async fn recommend(
        &self,
        product_id: ProductId,
        user: Option<UserId>,
        n: Option<usize>,
    ) -> Result<Vec<Product>, AnalyticsError> {
        let n = n.unwrap_or(self.config.recommendation.default_count);
        let products = self.repository.products(ProductFilter::all()).await?;
        let reviews = self.repository.reviews(ReviewFilter::default()).await?;
        let interactions = self.repository.interactions().await?;

        let mut reviews_by_product: HashMap<ProductId, Vec<Review>> = HashMap::new();
        for review in reviews {
            reviews_by_product.entry(review.product_id).or_default().push(review);
        }

        let corpus: Vec<ProductDocument> = products
            .iter()
            .map(|product| {
                let product_reviews =
                    reviews_by_product.get(&product.id).map(Vec::as_slice).unwrap_or(&[]);
                ProductDocument {
                    id: product.id,
                    text: features::product_feature_text(
                        product,
                        sentiment::average_sentiment(product_reviews),
                    ),
                }
            })
            .collect();

        let mut user_ids: Vec<UserId> =
            interactions.iter().map(|interaction| interaction.user_id).collect();
        user_ids.sort_unstable();
        user_ids.dedup();
        let product_ids: Vec<ProductId> = products.iter().map(|product| product.id).collect();
        let matrix = InteractionMatrix::build(&user_ids, &product_ids, &interactions);

        let ranked = self.engine.recommend(&corpus, &matrix, product_id, user, n);
        let by_id: HashMap<ProductId, &Product> =
            products.iter().map(|product| (product.id, product)).collect();
        Ok(ranked.into_iter().filter_map(|id| by_id.get(&id).map(|p| (*p).clone())).collect())
    }

    /// Daily revenue forecast for the scope over `horizon_days` (defaults to
    /// the configured horizon). Empty history yields an empty series.
    #[instrument(skip(self))]
    pub async fn forecast_sales(
        &self,
        scope: ForecastScope,
        horizon_days: Option<usize>,
    ) -> Result<Vec<ForecastPoint>, AnalyticsError> {
        let horizon = horizon_days.unwrap_or(self.config.forecast.default_horizon_days);
        let lines = self.repository.order_lines(scope.to_filter()).await?;
        let engine = ForecastEngine::new(self.config.forecast.seasonal_period);
        Ok(engine.forecast(&lines, horizon))
    }

    /// Short-horizon demand predictions for every vendor product with order
    /// history; products without history are skipped entirely.
    #[instrument(skip(self))]
    pub async fn predict_vendor_inventory(
        &self,
        vendor: VendorId,
    ) -> Result<Vec<InventoryPrediction>, AnalyticsError> {
        let products = self.repository.products(ProductFilter::for_vendor(vendor)).await?;
        let predictor = InventoryPredictor::new(
            self.config.inventory.horizon_days,
            self.config.inventory.boosting_rounds,
            self.config.inventory.learning_rate,
        );
        let today = Utc::now().date_naive();

        let mut predictions = Vec::new();
        for product in &products {
            let Some(inventory) = self.repository.inventory_for(product.id).await? else {
                continue;
            };
            let lines =
                self.repository.order_lines(OrderFilter::for_product(product.id)).await?;
            if let Some(prediction) = predictor.predict(&inventory, &lines, today) {
                predictions.push(prediction);
            }
        }
        debug!(vendor = vendor.0, products = products.len(), predicted = predictions.len(),
            "inventory demand predicted");
        Ok(predictions)
    }

    /// Cluster the vendor's purchasing customers; recomputed on every call,
    /// deliberately outside the cached bundle.
    #[instrument(skip(self))]
    pub async fn segment_customers(
        &self,
        vendor: VendorId,
    ) -> Result<CustomerSegmentation, AnalyticsError> {
        let lines = self.repository.order_lines(OrderFilter::for_vendor(vendor)).await?;
        let products = self.repository.products(ProductFilter::for_vendor(vendor)).await?;

        let mut user_ids: Vec<UserId> = lines.iter().map(|line| line.user_id).collect();
        user_ids.sort_unstable();
        user_ids.dedup();
        let profiles = self.repository.profiles(&user_ids).await?;

        let categories_by_product: HashMap<ProductId, Vec<String>> =
            products.iter().map(|product| (product.id, product.categories.clone())).collect();
        let rows = features::build_customer_features(
            &profiles,
            &lines,
            &categories_by_product,
            Utc::now().date_naive(),
        );

        let engine = SegmentationEngine::new(
            self.config.segmentation.clusters,
            self.config.segmentation.seed,
            self.config.segmentation.components,
            self.config.segmentation.max_iterations,
        );
        Ok(engine.segment(&rows))
    }

    /// Headline stats for the vendor dashboard.
    pub async fn vendor_stats(&self, vendor: VendorId) -> Result<VendorStats, AnalyticsError> {
        let products = self.repository.products(ProductFilter::for_vendor(vendor)).await?;
        let lines = self.repository.order_lines(OrderFilter::for_vendor(vendor)).await?;
        Ok(calculate_vendor_stats(&products, &lines))
    }

    /// Assign sentiment labels to the vendor's unclassified reviews,
    /// persisting each assignment. Returns the number of labels assigned.
    #[instrument(skip(self))]
    pub async fn classify_pending_reviews(
        &self,
        vendor: VendorId,
    ) -> Result<usize, AnalyticsError> {
        let mut reviews = self
            .repository
            .reviews(ReviewFilter { vendor: Some(vendor), unclassified_only: true, ..Default::default() })
            .await?;
        self.aggregator.classify_reviews(self.repository.as_ref(), &mut reviews).await
    }

    /// Per-label review counts for one product; unclassified reviews are
    /// excluded from the histogram.
    pub async fn sentiment_counts(
        &self,
        product: ProductId,
    ) -> Result<SentimentCounts, AnalyticsError> {
        let reviews = self.repository.reviews(ReviewFilter::for_product(product)).await?;
        Ok(sentiment::aggregate(&reviews))
    }

    /// Weighted emotion score for one product; exactly 0 without reviews.
    pub async fn product_average_sentiment(
        &self,
        product: ProductId,
    ) -> Result<f64, AnalyticsError> {
        let reviews = self.repository.reviews(ReviewFilter::for_product(product)).await?;
        Ok(sentiment::average_sentiment(&reviews))
    }

    /// The memoized dashboard bundle: inventory predictions for every vendor
    /// product plus per-category revenue forecasts, served from cache within
    /// the TTL and recomputed (once, even under concurrency) after it.
    #[instrument(skip(self))]
    pub async fn vendor_dashboard(
        &self,
        vendor: VendorId,
    ) -> Result<AnalyticsBundle, AnalyticsError> {
        self.cache.get_or_compute(vendor, || self.compute_bundle(vendor)).await
    }

    async fn compute_bundle(&self, vendor: VendorId) -> Result<AnalyticsBundle, AnalyticsError> {
        let inventory = self.predict_vendor_inventory(vendor).await?;

        let products = self.repository.products(ProductFilter::for_vendor(vendor)).await?;
        let mut categories: Vec<String> =
            products.iter().flat_map(|product| product.categories.clone()).collect();
        categories.sort_unstable();
        categories.dedup();

        let engine = ForecastEngine::new(self.config.forecast.seasonal_period);
        let horizon = self.config.forecast.default_horizon_days;
        let mut forecasts = Vec::with_capacity(categories.len());
        for category in categories {
            let lines = self
                .repository
                .order_lines(OrderFilter {
                    vendor: Some(vendor),
                    category: Some(category.clone()),
                    ..Default::default()
                })
                .await?;
            forecasts.push(CategoryForecast { category, points: engine.forecast(&lines, horizon) });
        }

        Ok(AnalyticsBundle { vendor_id: vendor, generated_at: Utc::now(), inventory, forecasts })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use tokio::sync::RwLock;

    use crate::access::AccessError;
    use crate::cache::InMemoryCacheStore;
    use crate::domain::{
        CustomerProfile, Gender, Interaction, InteractionKind, Inventory, Order, OrderId,
        OrderLine, ReviewId, SentimentLabel,
    };
    use crate::sentiment::ClassifierError;

    use super::*;

    /// Snapshot-backed repository used by the service tests.
    #[derive(Default)]
    struct SnapshotRepository {
        products: Vec<Product>,
        inventories: Vec<Inventory>,
        lines: Vec<OrderLine>,
        reviews: RwLock<Vec<Review>>,
        profiles: Vec<CustomerProfile>,
        interactions: Vec<Interaction>,
        order_line_calls: AtomicUsize,
    }

    #[async_trait]
    impl Repository for SnapshotRepository {
        async fn products(&self, filter: ProductFilter) -> Result<Vec<Product>, AccessError> {
            Ok(self
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
            Ok(self.inventories.iter().find(|inv| inv.product_id == product).copied())
        }

        async fn orders(&self, _: OrderFilter) -> Result<Vec<Order>, AccessError> {
            Ok(Vec::new())
        }

        async fn order_lines(&self, filter: OrderFilter) -> Result<Vec<OrderLine>, AccessError> {
            self.order_line_calls.fetch_add(1, Ordering::SeqCst);
            let vendor_products: Vec<ProductId> = self
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
                .map(|product| product.id)
                .collect();
            Ok(self
                .lines
                .iter()
                .filter(|line| {
                    filter.product.map(|product| line.product_id == product).unwrap_or(true)
                        && vendor_products.contains(&line.product_id)
                })
                .cloned()
                .collect())
        }

        async fn reviews(&self, filter: ReviewFilter) -> Result<Vec<Review>, AccessError> {
            let reviews = self.reviews.read().await;
            Ok(reviews
                .iter()
                .filter(|review| {
                    filter.product.map(|product| review.product_id == product).unwrap_or(true)
                        && (!filter.unclassified_only || review.sentiment.is_none())
                })
                .cloned()
                .collect())
        }

        async fn profiles(&self, users: &[UserId]) -> Result<Vec<CustomerProfile>, AccessError> {
            Ok(self
                .profiles
                .iter()
                .filter(|profile| users.contains(&profile.user_id))
                .cloned()
                .collect())
        }

        async fn interactions(&self) -> Result<Vec<Interaction>, AccessError> {
            Ok(self.interactions.clone())
        }

        async fn set_review_sentiment(
            &self,
            review: ReviewId,
            label: SentimentLabel,
        ) -> Result<(), AccessError> {
            let mut reviews = self.reviews.write().await;
            if let Some(stored) = reviews.iter_mut().find(|stored| stored.id == review) {
                stored.sentiment = Some(label);
            }
            Ok(())
        }
    }

    struct NeutralClassifier;

    #[async_trait]
    impl SentimentClassifier for NeutralClassifier {
        async fn classify(&self, _: &str) -> Result<SentimentLabel, ClassifierError> {
            Ok(SentimentLabel::Neutral)
        }
    }

    fn product(id: i64, vendor: i64, name: &str, description: &str, category: &str) -> Product {
        Product {
            id: ProductId(id),
            vendor_id: VendorId(vendor),
            name: name.to_string(),
            description: description.to_string(),
            price: Decimal::new(4_999, 2),
            categories: vec![category.to_string()],
            total_views: 100,
        }
    }

    fn line(order: i64, user: i64, product: i64, day: u32) -> OrderLine {
        OrderLine {
            order_id: OrderId(order),
            product_id: ProductId(product),
            user_id: UserId(user),
            quantity: 2,
            unit_price: Decimal::new(4_999, 2),
            placed_at: Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap(),
        }
    }

    fn fixture() -> SnapshotRepository {
        SnapshotRepository {
            products: vec![
                product(1, 1, "Walnut Desk", "solid walnut standing desk", "furniture"),
                product(2, 1, "Walnut Shelf", "walnut wall shelf", "furniture"),
                product(3, 1, "Ceramic Mug", "hand thrown ceramic mug", "kitchen"),
                product(4, 2, "Espresso Maker", "stovetop espresso maker", "kitchen"),
            ],
            inventories: vec![Inventory {
                product_id: ProductId(1),
                current_stock: 30,
                safety_stock_level: 5,
                reorder_point: 10,
            }],
            lines: (1..=14).map(|d| line(d as i64, 10, 1, d)).collect(),
            reviews: RwLock::new(vec![Review {
                id: ReviewId(1),
                product_id: ProductId(1),
                user_id: UserId(10),
                rating: 5,
                comment: "love this desk".to_string(),
                sentiment: None,
            }]),
            profiles: vec![CustomerProfile {
                user_id: UserId(10),
                date_of_birth: chrono::NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
                gender: Gender::Female,
            }],
            interactions: vec![Interaction {
                user_id: UserId(10),
                product_id: ProductId(1),
                kind: InteractionKind::Purchase,
                occurred_at: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            }],
            order_line_calls: AtomicUsize::new(0),
        }
    }

    fn service(repository: Arc<SnapshotRepository>) -> VendorAnalytics {
        VendorAnalytics::new(
            repository,
            Arc::new(NeutralClassifier),
            Arc::new(InMemoryCacheStore::new()),
            AnalyticsConfig::default(),
        )
    }

    #[tokio::test]
    async fn recommend_excludes_query_and_maps_back_to_products() {
        let service = service(Arc::new(fixture()));
        let result = service.recommend(ProductId(1), Some(UserId(10)), Some(3)).await.unwrap();

        assert!(result.len() <= 3);
        assert!(result.iter().all(|product| product.id != ProductId(1)));
        // the other walnut furniture item should lead the ranking
        assert_eq!(result.first().map(|product| product.id), Some(ProductId(2)));
    }

    #[tokio::test]
    async fn forecast_scopes_filter_order_history() {
        let service = service(Arc::new(fixture()));

        let vendor = service
            .forecast_sales(ForecastScope::Vendor(VendorId(1)), Some(10))
            .await
            .unwrap();
        assert_eq!(vendor.len(), 10);

        // vendor 2 never sold anything
        let empty = service
            .forecast_sales(ForecastScope::Vendor(VendorId(2)), Some(10))
            .await
            .unwrap();
        assert!(empty.is_empty());

        let category = service
            .forecast_sales(ForecastScope::Category("kitchen".to_string()), Some(5))
            .await
            .unwrap();
        assert!(category.is_empty());
    }

    #[tokio::test]
    async fn inventory_skips_products_without_history_or_stock_record() {
        let service = service(Arc::new(fixture()));
        let predictions = service.predict_vendor_inventory(VendorId(1)).await.unwrap();

        // only product 1 has both an inventory record and order history
        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0].product_id, ProductId(1));
        assert_eq!(predictions[0].predictions.len(), 7);
    }

    #[tokio::test]
    async fn segmentation_covers_the_vendors_customers() {
        let service = service(Arc::new(fixture()));
        let segmentation = service.segment_customers(VendorId(1)).await.unwrap();

        assert_eq!(segmentation.assignments.len(), 1);
        assert_eq!(segmentation.assignments[0].user_id, UserId(10));
        assert_eq!(segmentation.summaries.len(), 4);
    }

    #[tokio::test]
    async fn vendor_stats_count_orders_and_views() {
        let service = service(Arc::new(fixture()));
        let stats = service.vendor_stats(VendorId(1)).await.unwrap();

        assert_eq!(stats.total_orders, 14);
        assert_eq!(stats.total_views, 300);
        assert!(stats.conversion_rate > 0.0);
    }

    #[tokio::test]
    async fn pending_reviews_get_classified_and_persisted() {
        let repository = Arc::new(fixture());
        let service = service(Arc::clone(&repository));

        let assigned = service.classify_pending_reviews(VendorId(1)).await.unwrap();
        assert_eq!(assigned, 1);

        let stored = repository.reviews.read().await;
        assert_eq!(stored[0].sentiment, Some(SentimentLabel::Neutral));
    }

    #[tokio::test]
    async fn zero_review_product_has_average_sentiment_zero() {
        let service = service(Arc::new(fixture()));
        let average = service.product_average_sentiment(ProductId(3)).await.unwrap();
        assert_eq!(average, 0.0);
    }

    #[tokio::test]
    async fn dashboard_bundle_is_served_from_cache_within_ttl() {
        let repository = Arc::new(fixture());
        let service = service(Arc::clone(&repository));

        let first = service.vendor_dashboard(VendorId(1)).await.unwrap();
        let calls_after_first = repository.order_line_calls.load(Ordering::SeqCst);

        let second = service.vendor_dashboard(VendorId(1)).await.unwrap();
        let calls_after_second = repository.order_line_calls.load(Ordering::SeqCst);

        assert_eq!(first, second);
        assert_eq!(calls_after_first, calls_after_second, "hit must not touch the repository");
        assert_eq!(first.inventory.len(), 1);
        assert_eq!(first.forecasts.len(), 2);
    }
}
