//! Principal component projection via power iteration with deflation.
//!
//! Deterministic by construction: fixed start vector, fixed iteration count,
//! sign normalized so the dominant loading is always non-negative.

const POWER_ITERATIONS: usize = 200;

/// Project `rows` onto their top `components` principal directions. Returns
/// one projected row per input row; the effective dimensionality is capped at
/// the input width.
pub fn project(rows: &[Vec<f64>], components: usize) -> Vec<Vec<f64>> {
    if rows.is_empty() {
        return Vec::new();
    }
    let width = rows[0].len();
    let components = components.min(width);
    if components == 0 {
        return vec![Vec::new(); rows.len()];
    }

    let centered = center(rows, width);
    let mut covariance = covariance_matrix(&centered, width);

    let mut axes: Vec<Vec<f64>> = Vec::with_capacity(components);
    for _ in 0..components {
        let axis = dominant_eigenvector(&covariance, width);
        deflate(&mut covariance, &axis);
        axes.push(axis);
    }

    centered
        .iter()
        .map(|row| axes.iter().map(|axis| dot(row, axis)).collect())
        .collect()
}

fn center(rows: &[Vec<f64>], width: usize) -> Vec<Vec<f64>> {
    let n = rows.len() as f64;
    let means: Vec<f64> =
        (0..width).map(|dim| rows.iter().map(|row| row[dim]).sum::<f64>() / n).collect();
    rows.iter()
        .map(|row| row.iter().zip(&means).map(|(value, mean)| value - mean).collect())
        .collect()
}

fn covariance_matrix(centered: &[Vec<f64>], width: usize) -> Vec<Vec<f64>> {
    let denominator = (centered.len().saturating_sub(1)).max(1) as f64;
    let mut matrix = vec![vec![0.0; width]; width];
    for row in centered {
        for i in 0..width {
            for j in 0..width {
                matrix[i][j] += row[i] * row[j] / denominator;
            }
        }
    }
    matrix
}

fn dominant_eigenvector(matrix: &[Vec<f64>], width: usize) -> Vec<f64> {
    // fixed non-uniform start so it is never orthogonal to every direction
    let mut vector: Vec<f64> = (0..width).map(|i| 1.0 / (i + 1) as f64).collect();
    normalize(&mut vector);

    for _ in 0..POWER_ITERATIONS {
        let mut next: Vec<f64> =
            matrix.iter().map(|matrix_row| dot(matrix_row, &vector)).collect();
        if !normalize(&mut next) {
            break;
        }
        vector = next;
    }

    // sign convention: dominant loading non-negative
    let dominant = vector
        .iter()
        .cloned()
        .fold(0.0f64, |acc, v| if v.abs() > acc.abs() { v } else { acc });
    if dominant < 0.0 {
        for value in vector.iter_mut() {
            *value = -*value;
        }
    }
    vector
}

fn deflate(matrix: &mut [Vec<f64>], axis: &[f64]) {
    let eigenvalue = axis
        .iter()
        .enumerate()
        .map(|(i, &vi)| vi * dot(&matrix[i], axis))
        .sum::<f64>();
    for i in 0..axis.len() {
        for j in 0..axis.len() {
            matrix[i][j] -= eigenvalue * axis[i] * axis[j];
        }
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn normalize(vector: &mut [f64]) -> bool {
    let norm = dot(vector, vector).sqrt();
    if norm < 1e-12 {
        return false;
    }
    for value in vector.iter_mut() {
        *value /= norm;
    }
    true
}
