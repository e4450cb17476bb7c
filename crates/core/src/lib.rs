pub mod access;
pub mod cache;
pub mod config;
pub mod domain;
pub mod errors;
pub mod features;
pub mod forecast;
pub mod inventory;
pub mod recommend;
pub mod segmentation;
pub mod sentiment;
pub mod service;
pub mod stats;
pub mod telemetry;

pub use access::{AccessError, OrderFilter, ProductFilter, Repository, ReviewFilter};
pub use cache::{
    AnalyticsBundle, AnalyticsCache, CacheError, CacheStore, CategoryForecast, InMemoryCacheStore,
};
pub use config::{AnalyticsConfig, ConfigError};
pub use domain::customer::{CustomerProfile, Gender, UserId};
pub use domain::interaction::{Interaction, InteractionKind};
pub use domain::order::{Order, OrderId, OrderLine, OrderStatus};
pub use domain::product::{Inventory, Product, ProductId, VendorId};
pub use domain::review::{Review, ReviewId, SentimentLabel};
pub use errors::AnalyticsError;
pub use forecast::{ForecastEngine, ForecastPoint};
pub use inventory::{InventoryPrediction, InventoryPredictor};
pub use recommend::{ProductDocument, RecommendationEngine};
pub use segmentation::{
    ClusterSummary, CustomerAssignment, CustomerSegmentation, SegmentationEngine,
};
pub use sentiment::{
    ClassifierError, SentimentAggregator, SentimentClassifier, SentimentCounts,
};
pub use service::{ForecastScope, VendorAnalytics};
pub use stats::{calculate_vendor_stats, VendorStats};
