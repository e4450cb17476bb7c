//! Short-horizon per-product demand prediction.
//!
//! Training rows are the product's per-day historical order quantities with
//! day-of-week and month as the only two features, fitted by gradient-boosted
//! regression stumps under squared loss. Predictions cover the next calendar
//! days (not trading days), rounded up with a fixed +1 safety pad.

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Inventory, OrderLine, ProductId};

const FEATURE_DAY_OF_WEEK: usize = 0;
const FEATURE_MONTH: usize = 1;

/// Demand outlook for one product, alongside the stock thresholds the caller
/// compares it against.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InventoryPrediction {
    pub product_id: ProductId,
    /// One non-negative unit count per horizon day.
    pub predictions: Vec<u32>,
    pub current_stock: u32,
    pub safety_stock_level: u32,
    pub reorder_point: u32,
}

impl InventoryPrediction {
    /// Total predicted demand over the horizon.
    pub fn total_demand(&self) -> u32 {
        self.predictions.iter().sum()
    }

    /// True when predicted demand would push stock to or below the safety
    /// level before the horizon ends.
    pub fn at_risk(&self) -> bool {
        self.total_demand() + self.safety_stock_level > self.current_stock
    }
}

#[derive(Clone, Copy, Debug)]
struct Stump {
    feature: usize,
    threshold: f64,
    left: f64,
    right: f64,
}

impl Stump {
    fn predict(&self, row: &[f64; 2]) -> f64 {
        if row[self.feature] <= self.threshold {
            self.left
        } else {
            self.right
        }
    }
}

/// Depth-one gradient boosting under squared loss. Split search is an
/// exhaustive scan over both features' midpoints, so fitting is fully
/// deterministic.
#[derive(Clone, Debug)]
pub struct GradientBoostedRegressor {
    base: f64,
    shrinkage: f64,
    stumps: Vec<Stump>,
}

impl GradientBoostedRegressor {
    pub fn fit(rows: &[[f64; 2]], targets: &[f64], rounds: usize, learning_rate: f64) -> Self {
        let base = targets.iter().sum::<f64>() / targets.len().max(1) as f64;
        let mut model = Self { base, shrinkage: learning_rate, stumps: Vec::new() };

        let mut predictions = vec![base; targets.len()];
        for _ in 0..rounds {
            let residuals: Vec<f64> =
                targets.iter().zip(&predictions).map(|(y, p)| y - p).collect();
            let Some(stump) = best_stump(rows, &residuals) else {
                break;
            };
            for (prediction, row) in predictions.iter_mut().zip(rows) {
                *prediction += learning_rate * stump.predict(row);
            }
            model.stumps.push(stump);
        }
        model
    }

    pub fn predict(&self, row: &[f64; 2]) -> f64 {
        self.base
            + self.stumps.iter().map(|stump| self.shrinkage * stump.predict(row)).sum::<f64>()
    }
}

fn best_stump(rows: &[[f64; 2]], residuals: &[f64]) -> Option<Stump> {
    let mut best: Option<(f64, Stump)> = None;

    for feature in [FEATURE_DAY_OF_WEEK, FEATURE_MONTH] {
        let mut values: Vec<f64> = rows.iter().map(|row| row[feature]).collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        values.dedup();

        for pair in values.windows(2) {
            let threshold = (pair[0] + pair[1]) / 2.0;

            let (mut left_sum, mut left_count) = (0.0, 0usize);
            let (mut right_sum, mut right_count) = (0.0, 0usize);
            for (row, &residual) in rows.iter().zip(residuals) {
                if row[feature] <= threshold {
                    left_sum += residual;
                    left_count += 1;
                } else {
                    right_sum += residual;
                    right_count += 1;
                }
            }
            if left_count == 0 || right_count == 0 {
                continue;
            }

            let left = left_sum / left_count as f64;
            let right = right_sum / right_count as f64;
            let sse: f64 = rows
                .iter()
                .zip(residuals)
                .map(|(row, &residual)| {
                    let fitted = if row[feature] <= threshold { left } else { right };
                    (residual - fitted).powi(2)
                })
                .sum();

            // strict improvement keeps the scan order deterministic
            if best.as_ref().map(|(best_sse, _)| sse < *best_sse).unwrap_or(true) {
                best = Some((sse, Stump { feature, threshold, left, right }));
            }
        }
    }

    best.map(|(_, stump)| stump)
}

#[derive(Clone, Copy, Debug)]
pub struct InventoryPredictor {
    horizon_days: usize,
    boosting_rounds: usize,
    learning_rate: f64,
}

impl InventoryPredictor {
    pub fn new(horizon_days: usize, boosting_rounds: usize, learning_rate: f64) -> Self {
        Self { horizon_days, boosting_rounds, learning_rate }
    }

    /// Predict the next horizon of daily demand for one product. Products
    /// without order history are skipped, signalled by `None` rather than a
    /// zero-filled series.
    pub fn predict(
        &self,
        inventory: &Inventory,
        lines: &[OrderLine],
        today: NaiveDate,
    ) -> Option<InventoryPrediction> {
        let mut per_day: HashMap<NaiveDate, u32> = HashMap::new();
        for line in lines {
            *per_day.entry(line.placed_at.date_naive()).or_insert(0) += line.quantity;
        }
        if per_day.is_empty() {
            return None;
        }

        let mut samples: Vec<(NaiveDate, u32)> = per_day.into_iter().collect();
        samples.sort_unstable();

        let rows: Vec<[f64; 2]> = samples.iter().map(|(date, _)| calendar_features(*date)).collect();
        let targets: Vec<f64> = samples.iter().map(|(_, quantity)| *quantity as f64).collect();

        let model =
            GradientBoostedRegressor::fit(&rows, &targets, self.boosting_rounds, self.learning_rate);
        debug!(product = inventory.product_id.0, days = rows.len(), "fitted demand model");

        let predictions = (1..=self.horizon_days)
            .map(|offset| {
                let day = today + Duration::days(offset as i64);
                let raw = model.predict(&calendar_features(day));
                // round up, then a fixed +1 safety pad
                (raw.ceil() + 1.0).max(0.0) as u32
            })
            .collect();

        Some(InventoryPrediction {
            product_id: inventory.product_id,
            predictions,
            current_stock: inventory.current_stock,
            safety_stock_level: inventory.safety_stock_level,
            reorder_point: inventory.reorder_point,
        })
    }
}

fn calendar_features(date: NaiveDate) -> [f64; 2] {
    [date.weekday().num_days_from_monday() as f64, date.month() as f64]
}
