use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::customer::UserId;
use super::product::ProductId;

/// Event kinds in ascending precedence. When a user has several interaction
/// kinds with the same product, the affinity matrix keeps the heaviest one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    View,
    Wishlist,
    Purchase,
}

impl InteractionKind {
    /// Affinity weight used when building the user-product matrix.
    pub fn weight(&self) -> f64 {
        match self {
            Self::View => 1.0,
            Self::Wishlist => 2.0,
            Self::Purchase => 3.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Wishlist => "wishlist",
            Self::Purchase => "purchase",
        }
    }
}

impl std::str::FromStr for InteractionKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "view" => Ok(Self::View),
            "wishlist" => Ok(Self::Wishlist),
            "purchase" => Ok(Self::Purchase),
            other => Err(format!("unknown interaction kind `{other}`")),
        }
    }
}

/// Append-only interaction log entry; never mutated after the fact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub kind: InteractionKind,
    pub occurred_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purchase_outranks_wishlist_outranks_view() {
        assert!(InteractionKind::Purchase > InteractionKind::Wishlist);
        assert!(InteractionKind::Wishlist > InteractionKind::View);
        assert_eq!(InteractionKind::View.weight(), 1.0);
        assert_eq!(InteractionKind::Wishlist.weight(), 2.0);
        assert_eq!(InteractionKind::Purchase.weight(), 3.0);
    }
}
