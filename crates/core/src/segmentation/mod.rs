//! Unsupervised customer segmentation.
//!
//! Numeric features (age, total spent, order count) are standardized to zero
//! mean and unit variance, categorical features (gender, most-ordered
//! category) one-hot encoded, then clustered with seeded k-means and
//! projected to 2-3 principal components for visualization.

pub mod kmeans;
pub mod pca;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Gender, UserId};
use crate::features::CustomerFeatures;

use kmeans::kmeans;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerAssignment {
    pub user_id: UserId,
    pub cluster: usize,
    /// 2-3 component projection for plotting.
    pub projection: Vec<f64>,
}

/// Human-readable description of one cluster: mean of the numeric features,
/// mode of the categorical ones.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub cluster: usize,
    pub size: usize,
    pub mean_age: f64,
    pub mean_total_spent: f64,
    pub mean_order_count: f64,
    pub modal_gender: Option<Gender>,
    pub modal_category: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerSegmentation {
    pub assignments: Vec<CustomerAssignment>,
    /// Always exactly `k` entries; empty clusters have `size == 0`.
    pub summaries: Vec<ClusterSummary>,
}

#[derive(Clone, Copy, Debug)]
pub struct SegmentationEngine {
    clusters: usize,
    seed: u64,
    components: usize,
    max_iterations: usize,
}

impl SegmentationEngine {
    pub fn new(clusters: usize, seed: u64, components: usize, max_iterations: usize) -> Self {
        Self { clusters, seed, components, max_iterations }
    }

    pub fn segment(&self, features: &[CustomerFeatures]) -> CustomerSegmentation {
        let rows = encode(features);
        let fit = kmeans(&rows, self.clusters, self.seed, self.max_iterations);
        let projections = pca::project(&rows, self.components);
        debug!(customers = features.len(), clusters = self.clusters, "segmented customers");

        let assignments = features
            .iter()
            .zip(fit.assignments.iter())
            .zip(projections)
            .map(|((feature, &cluster), projection)| CustomerAssignment {
                user_id: feature.user_id,
                cluster,
                projection,
            })
            .collect();

        let summaries = (0..self.clusters)
            .map(|cluster| summarize(cluster, features, &fit.assignments))
            .collect();

        CustomerSegmentation { assignments, summaries }
    }
}

/// Standardized numeric columns followed by one-hot gender and category
/// columns. The category vocabulary is sorted so the encoding is independent
/// of input order.
fn encode(features: &[CustomerFeatures]) -> Vec<Vec<f64>> {
    if features.is_empty() {
        return Vec::new();
    }

    let ages: Vec<f64> = features.iter().map(|f| f.age as f64).collect();
    let spends: Vec<f64> = features.iter().map(|f| f.total_spent).collect();
    let orders: Vec<f64> = features.iter().map(|f| f.order_count as f64).collect();

    let age_z = standardize(&ages);
    let spend_z = standardize(&spends);
    let order_z = standardize(&orders);

    let mut vocabulary: Vec<&str> =
        features.iter().filter_map(|f| f.top_category.as_deref()).collect();
    vocabulary.sort_unstable();
    vocabulary.dedup();

    let genders = [Gender::Female, Gender::Male, Gender::Other];

    features
        .iter()
        .enumerate()
        .map(|(index, feature)| {
            let mut row = vec![age_z[index], spend_z[index], order_z[index]];
            for gender in genders {
                row.push(if feature.gender == gender { 1.0 } else { 0.0 });
            }
            for category in &vocabulary {
                let hit = feature.top_category.as_deref() == Some(*category);
                row.push(if hit { 1.0 } else { 0.0 });
            }
            row
        })
        .collect()
}

/// Zero mean, unit variance; a zero-variance column standardizes to zeros.
fn standardize(values: &[f64]) -> Vec<f64> {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();
    if std_dev == 0.0 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - mean) / std_dev).collect()
}

fn summarize(
    cluster: usize,
    features: &[CustomerFeatures],
    assignments: &[usize],
) -> ClusterSummary {
    let members: Vec<&CustomerFeatures> = features
        .iter()
        .zip(assignments)
        .filter(|(_, &assignment)| assignment == cluster)
        .map(|(feature, _)| feature)
        .collect();

    if members.is_empty() {
        return ClusterSummary {
            cluster,
            size: 0,
            mean_age: 0.0,
            mean_total_spent: 0.0,
            mean_order_count: 0.0,
            modal_gender: None,
            modal_category: None,
        };
    }

    let size = members.len() as f64;
    ClusterSummary {
        cluster,
        size: members.len(),
        mean_age: members.iter().map(|m| m.age as f64).sum::<f64>() / size,
        mean_total_spent: members.iter().map(|m| m.total_spent).sum::<f64>() / size,
        mean_order_count: members.iter().map(|m| m.order_count as f64).sum::<f64>() / size,
        modal_gender: mode(members.iter().map(|m| m.gender)),
        modal_category: mode(members.iter().filter_map(|m| m.top_category.clone())),
    }
}

/// Most frequent value; ties resolve to the value encountered first.
fn mode<T: PartialEq>(values: impl Iterator<Item = T>) -> Option<T> {
    let mut counts: Vec<(T, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(existing, _)| *existing == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }

    let mut best: Option<(T, usize)> = None;
    for (value, count) in counts {
        match &best {
            Some((_, best_count)) if count <= *best_count => {}
            _ => best = Some((value, count)),
        }
    }
    best.map(|(value, _)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(
        id: i64,
        age: u32,
        spent: f64,
        orders: u32,
        gender: Gender,
        category: &str,
    ) -> CustomerFeatures {
        CustomerFeatures {
            user_id: UserId(id),
            age,
            total_spent: spent,
            order_count: orders,
            gender,
            top_category: Some(category.to_string()),
        }
    }

    fn mixed_population() -> Vec<CustomerFeatures> {
        vec![
            customer(1, 22, 120.0, 3, Gender::Female, "beauty"),
            customer(2, 24, 150.0, 4, Gender::Female, "beauty"),
            customer(3, 23, 90.0, 2, Gender::Male, "beauty"),
            customer(4, 61, 2400.0, 22, Gender::Male, "furniture"),
            customer(5, 58, 2600.0, 25, Gender::Male, "furniture"),
            customer(6, 63, 2500.0, 24, Gender::Female, "furniture"),
        ]
    }

    #[test]
    fn always_exactly_k_summaries() {
        let engine = SegmentationEngine::new(4, 42, 2, 100);
        let result = engine.segment(&mixed_population());
        assert_eq!(result.summaries.len(), 4);

        // more clusters than customers still yields k groups
        let wide = SegmentationEngine::new(10, 42, 2, 100);
        let result = wide.segment(&mixed_population()[..2]);
        assert_eq!(result.summaries.len(), 10);
        assert!(result.summaries.iter().filter(|s| s.size == 0).count() >= 8);
    }

    #[test]
    fn fixed_seed_makes_segmentation_deterministic() {
        let engine = SegmentationEngine::new(4, 42, 2, 100);
        let left = engine.segment(&mixed_population());
        let right = engine.segment(&mixed_population());
        assert_eq!(left, right);
    }

    #[test]
    fn distinct_populations_land_in_distinct_clusters() {
        let engine = SegmentationEngine::new(2, 42, 2, 100);
        let result = engine.segment(&mixed_population());

        let young: Vec<usize> =
            result.assignments[..3].iter().map(|a| a.cluster).collect();
        let older: Vec<usize> =
            result.assignments[3..].iter().map(|a| a.cluster).collect();
        assert!(young.iter().all(|&c| c == young[0]));
        assert!(older.iter().all(|&c| c == older[0]));
        assert_ne!(young[0], older[0]);
    }

    #[test]
    fn summaries_average_raw_features_and_take_modes() {
        let engine = SegmentationEngine::new(2, 42, 2, 100);
        let result = engine.segment(&mixed_population());

        let older_cluster = result.assignments[3].cluster;
        let summary = &result.summaries[older_cluster];
        assert_eq!(summary.size, 3);
        assert!((summary.mean_age - (61.0 + 58.0 + 63.0) / 3.0).abs() < 1e-9);
        assert_eq!(summary.modal_category.as_deref(), Some("furniture"));
        assert_eq!(summary.modal_gender, Some(Gender::Male));
    }

    #[test]
    fn projections_use_the_configured_component_count() {
        let engine = SegmentationEngine::new(2, 42, 3, 100);
        let result = engine.segment(&mixed_population());
        assert!(result.assignments.iter().all(|a| a.projection.len() == 3));
    }

    #[test]
    fn empty_population_segments_to_empty_assignments() {
        let engine = SegmentationEngine::new(4, 42, 2, 100);
        let result = engine.segment(&[]);
        assert!(result.assignments.is_empty());
        assert_eq!(result.summaries.len(), 4);
    }

    #[test]
    fn mode_tie_goes_to_first_encountered() {
        assert_eq!(mode(["a", "b", "b", "a"].into_iter()), Some("a"));
        assert_eq!(mode(["b", "a", "a", "b"].into_iter()), Some("b"));
        assert_eq!(mode(std::iter::empty::<&str>()), None);
    }
}
