use serde::{Deserialize, Serialize};

use super::customer::UserId;
use super::product::ProductId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReviewId(pub i64);

/// Fixed emotion label set assigned by the sentiment classifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Sadness,
    Anger,
    Fear,
    Joy,
    Love,
    Surprise,
    Neutral,
}

impl SentimentLabel {
    pub const ALL: [SentimentLabel; 7] = [
        Self::Sadness,
        Self::Anger,
        Self::Fear,
        Self::Joy,
        Self::Love,
        Self::Surprise,
        Self::Neutral,
    ];

    /// Weight used when folding labels into a product-level sentiment score.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Sadness => -2.0,
            Self::Anger => -1.0,
            Self::Fear => -1.0,
            Self::Joy => 2.0,
            Self::Love => 3.0,
            Self::Surprise => 1.0,
            Self::Neutral => 0.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sadness => "sadness",
            Self::Anger => "anger",
            Self::Fear => "fear",
            Self::Joy => "joy",
            Self::Love => "love",
            Self::Surprise => "surprise",
            Self::Neutral => "neutral",
        }
    }
}

impl std::str::FromStr for SentimentLabel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sadness" => Ok(Self::Sadness),
            "anger" => Ok(Self::Anger),
            "fear" => Ok(Self::Fear),
            "joy" => Ok(Self::Joy),
            "love" => Ok(Self::Love),
            "surprise" => Ok(Self::Surprise),
            "neutral" => Ok(Self::Neutral),
            other => Err(format!("unknown sentiment label `{other}`")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    /// Star rating in [1, 5].
    pub rating: u8,
    pub comment: String,
    /// Set once by the sentiment aggregator; `None` until classified or when
    /// classification failed.
    pub sentiment: Option<SentimentLabel>,
}
