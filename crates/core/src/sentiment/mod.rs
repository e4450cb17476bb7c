//! Review emotion classification and aggregation.
//!
//! Classification delegates to an injected black-box capability; the
//! aggregator owns assigning the label and persisting it through the
//! repository. Aggregation and the product-level weighted score are pure
//! functions over review collections.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::access::Repository;
use crate::domain::{Review, SentimentLabel};
use crate::errors::AnalyticsError;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("inference failure: {0}")]
    Inference(String),
    #[error("classifier unavailable: {0}")]
    Unavailable(String),
}

/// Black-box emotion inference over the fixed 7-label set.
#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<SentimentLabel, ClassifierError>;
}

/// Label histogram; `BTreeMap` keeps iteration order stable for callers that
/// render or snapshot it.
pub type SentimentCounts = BTreeMap<SentimentLabel, u64>;

/// Count assigned labels. Unclassified reviews are excluded, not treated as
/// a distinct label.
pub fn aggregate(reviews: &[Review]) -> SentimentCounts {
    let mut counts = SentimentCounts::new();
    for review in reviews {
        if let Some(label) = review.sentiment {
            *counts.entry(label).or_insert(0) += 1;
        }
    }
    counts
}

/// Weighted emotion score for one product's reviews: mean label weight over
/// the labeled reviews, exactly 0 when there are none.
pub fn average_sentiment(reviews: &[Review]) -> f64 {
    let weights: Vec<f64> =
        reviews.iter().filter_map(|review| review.sentiment.map(|label| label.weight())).collect();
    if weights.is_empty() {
        return 0.0;
    }
    weights.iter().sum::<f64>() / weights.len() as f64
}

/// Assigns labels to unclassified reviews and persists each assignment.
pub struct SentimentAggregator {
    classifier: Arc<dyn SentimentClassifier>,
}

impl SentimentAggregator {
    pub fn new(classifier: Arc<dyn SentimentClassifier>) -> Self {
        Self { classifier }
    }

    /// Classify every review lacking a label, writing each assignment back
    /// through the repository. A classifier failure leaves that review
    /// unset and the batch continues; the count of successful assignments
    /// is returned.
    pub async fn classify_reviews(
        &self,
        repository: &dyn Repository,
        reviews: &mut [Review],
    ) -> Result<usize, AnalyticsError> {
        let mut assigned = 0;
        for review in reviews.iter_mut().filter(|review| review.sentiment.is_none()) {
            match self.classifier.classify(&review.comment).await {
                Ok(label) => {
                    repository.set_review_sentiment(review.id, label).await?;
                    review.sentiment = Some(label);
                    assigned += 1;
                }
                Err(error) => {
                    warn!(review = review.id.0, %error, "sentiment classification failed");
                }
            }
        }
        Ok(assigned)
    }
}
