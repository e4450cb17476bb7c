//! Feature engineering shared by the analytic pipelines.
//!
//! Everything here is rebuilt fresh per call from snapshot collections; no
//! incremental state survives between computations.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{CustomerProfile, Gender, Interaction, OrderLine, Product, ProductId, UserId};

/// Text feature for content-based ranking: name, description, categories and
/// the product's weighted sentiment score in one string.
pub fn product_feature_text(product: &Product, average_sentiment: f64) -> String {
    format!(
        "{} {} {} {}",
        product.name,
        product.description,
        product.categories.join(" "),
        format_sentiment(average_sentiment)
    )
}

// A whole-valued score renders without a trailing fraction, so a product
// without reviews contributes a bare `0` to its feature string.
fn format_sentiment(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Dense user-product affinity matrix. Rows follow `user_ids`, columns follow
/// `product_ids`; a cell holds the weight of the heaviest interaction kind
/// observed for the pair, 0 when the pair never interacted.
#[derive(Clone, Debug, PartialEq)]
pub struct InteractionMatrix {
    user_ids: Vec<UserId>,
    product_ids: Vec<ProductId>,
    rows: Vec<Vec<f64>>,
}

impl InteractionMatrix {
    pub fn build(
        users: &[UserId],
        products: &[ProductId],
        interactions: &[Interaction],
    ) -> Self {
        let user_index: HashMap<UserId, usize> =
            users.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let product_index: HashMap<ProductId, usize> =
            products.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let mut rows = vec![vec![0.0; products.len()]; users.len()];
        for interaction in interactions {
            let (Some(&row), Some(&col)) = (
                user_index.get(&interaction.user_id),
                product_index.get(&interaction.product_id),
            ) else {
                continue;
            };
            let weight = interaction.kind.weight();
            if weight > rows[row][col] {
                rows[row][col] = weight;
            }
        }

        Self { user_ids: users.to_vec(), product_ids: products.to_vec(), rows }
    }

    pub fn user_ids(&self) -> &[UserId] {
        &self.user_ids
    }

    pub fn product_ids(&self) -> &[ProductId] {
        &self.product_ids
    }

    pub fn user_index(&self, user: UserId) -> Option<usize> {
        self.user_ids.iter().position(|id| *id == user)
    }

    pub fn row(&self, index: usize) -> &[f64] {
        &self.rows[index]
    }

    pub fn user_count(&self) -> usize {
        self.user_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.user_ids.is_empty() || self.product_ids.is_empty()
    }
}

/// One customer's segmentation feature row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerFeatures {
    pub user_id: UserId,
    pub age: u32,
    pub total_spent: f64,
    pub order_count: u32,
    pub gender: Gender,
    /// Most-frequent purchased category; ties go to the category encountered
    /// first in the descending-count ordering. `None` for zero order lines.
    pub top_category: Option<String>,
}

/// Build one feature row per profiled customer from the given order lines.
/// Customers without a profile are skipped; order lines for unknown products
/// contribute spend but no category signal.
pub fn build_customer_features(
    profiles: &[CustomerProfile],
    lines: &[OrderLine],
    categories_by_product: &HashMap<ProductId, Vec<String>>,
    as_of: NaiveDate,
) -> Vec<CustomerFeatures> {
    let mut per_user: HashMap<UserId, Vec<&OrderLine>> = HashMap::new();
    for line in lines {
        per_user.entry(line.user_id).or_default().push(line);
    }

    profiles
        .iter()
        .map(|profile| {
            let lines = per_user.get(&profile.user_id).map(Vec::as_slice).unwrap_or(&[]);

            let total_spent: f64 = lines
                .iter()
                .map(|line| f64::try_from(line.amount()).unwrap_or(0.0))
                .sum();

            let mut order_ids: Vec<_> = lines.iter().map(|line| line.order_id).collect();
            order_ids.sort_unstable();
            order_ids.dedup();

            CustomerFeatures {
                user_id: profile.user_id,
                age: profile.age_at(as_of),
                total_spent,
                order_count: order_ids.len() as u32,
                gender: profile.gender,
                top_category: top_category(lines, categories_by_product),
            }
        })
        .collect()
}

fn top_category(
    lines: &[&OrderLine],
    categories_by_product: &HashMap<ProductId, Vec<String>>,
) -> Option<String> {
    // Counts kept in first-encounter order so equal counts resolve to the
    // category seen first.
    let mut counts: Vec<(&str, u32)> = Vec::new();
    for line in lines {
        let Some(categories) = categories_by_product.get(&line.product_id) else {
            continue;
        };
        for category in categories {
            match counts.iter_mut().find(|(name, _)| *name == category.as_str()) {
                Some((_, count)) => *count += line.quantity,
                None => counts.push((category.as_str(), line.quantity)),
            }
        }
    }

    let mut best: Option<(&str, u32)> = None;
    for (name, count) in counts {
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((name, count)),
        }
    }
    best.map(|(name, _)| name.to_string())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use crate::domain::{InteractionKind, OrderId, VendorId};

    use super::*;

    fn product(id: i64, name: &str, description: &str, categories: &[&str]) -> Product {
        Product {
            id: ProductId(id),
            vendor_id: VendorId(1),
            name: name.to_string(),
            description: description.to_string(),
            price: Decimal::new(1999, 2),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            total_views: 0,
        }
    }

    fn interaction(user: i64, product: i64, kind: InteractionKind) -> Interaction {
        Interaction {
            user_id: UserId(user),
            product_id: ProductId(product),
            kind,
            occurred_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    fn line(order: i64, user: i64, product: i64, quantity: u32, cents: i64) -> OrderLine {
        OrderLine {
            order_id: OrderId(order),
            product_id: ProductId(product),
            user_id: UserId(user),
            quantity,
            unit_price: Decimal::new(cents, 2),
            placed_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn feature_text_with_no_reviews_ends_in_bare_zero() {
        let p = product(1, "Walnut Desk", "Solid walnut standing desk", &["furniture", "office"]);
        assert_eq!(
            product_feature_text(&p, 0.0),
            "Walnut Desk Solid walnut standing desk furniture office 0"
        );
    }

    #[test]
    fn feature_text_keeps_fractional_sentiment() {
        let p = product(1, "Mug", "Ceramic mug", &["kitchen"]);
        assert_eq!(product_feature_text(&p, 1.5), "Mug Ceramic mug kitchen 1.5");
    }

    #[test]
    fn matrix_keeps_heaviest_interaction_per_pair() {
        let users = [UserId(1), UserId(2)];
        let products = [ProductId(10), ProductId(11)];
        let interactions = [
            interaction(1, 10, InteractionKind::View),
            interaction(1, 10, InteractionKind::Purchase),
            interaction(1, 10, InteractionKind::Wishlist),
            interaction(2, 11, InteractionKind::Wishlist),
        ];

        let matrix = InteractionMatrix::build(&users, &products, &interactions);
        assert_eq!(matrix.row(0), &[3.0, 0.0]);
        assert_eq!(matrix.row(1), &[0.0, 2.0]);
    }

    #[test]
    fn matrix_ignores_unknown_users_and_products() {
        let users = [UserId(1)];
        let products = [ProductId(10)];
        let interactions =
            [interaction(9, 10, InteractionKind::Purchase), interaction(1, 99, InteractionKind::View)];

        let matrix = InteractionMatrix::build(&users, &products, &interactions);
        assert_eq!(matrix.row(0), &[0.0]);
    }

    #[test]
    fn customer_features_aggregate_spend_and_orders() {
        let profiles = [CustomerProfile {
            user_id: UserId(1),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            gender: Gender::Female,
        }];
        let lines = [line(1, 1, 10, 2, 1000), line(1, 1, 11, 1, 500), line(2, 1, 10, 1, 1000)];
        let categories: HashMap<ProductId, Vec<String>> = [
            (ProductId(10), vec!["kitchen".to_string()]),
            (ProductId(11), vec!["office".to_string()]),
        ]
        .into();

        let rows = build_customer_features(
            &profiles,
            &lines,
            &categories,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        );

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.age, 34);
        assert_eq!(row.order_count, 2);
        assert!((row.total_spent - 35.0).abs() < 1e-9);
        assert_eq!(row.top_category.as_deref(), Some("kitchen"));
    }

    #[test]
    fn top_category_tie_goes_to_first_encountered() {
        let profiles = [CustomerProfile {
            user_id: UserId(1),
            date_of_birth: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
            gender: Gender::Male,
        }];
        // one unit of "office" first, then one unit of "kitchen"
        let lines = [line(1, 1, 11, 1, 500), line(2, 1, 10, 1, 1000)];
        let categories: HashMap<ProductId, Vec<String>> = [
            (ProductId(10), vec!["kitchen".to_string()]),
            (ProductId(11), vec!["office".to_string()]),
        ]
        .into();

        let rows = build_customer_features(
            &profiles,
            &lines,
            &categories,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        );
        assert_eq!(rows[0].top_category.as_deref(), Some("office"));
    }

    #[test]
    fn customer_with_no_lines_gets_zeroed_row() {
        let profiles = [CustomerProfile {
            user_id: UserId(7),
            date_of_birth: NaiveDate::from_ymd_opt(1985, 12, 31).unwrap(),
            gender: Gender::Other,
        }];

        let rows = build_customer_features(
            &profiles,
            &[],
            &HashMap::new(),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        );

        assert_eq!(rows[0].order_count, 0);
        assert_eq!(rows[0].total_spent, 0.0);
        assert_eq!(rows[0].top_category, None);
    }
}
