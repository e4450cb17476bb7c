//! Seeded Lloyd's k-means with deterministic tie-breaking.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;

pub struct KMeansFit {
    pub assignments: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
}

/// Cluster `rows` into exactly `k` groups. Groups may end up empty when the
/// data has fewer distinct points than `k`; their centroids are left where
/// initialization put them. Fixed `seed` makes the whole fit reproducible.
pub fn kmeans(rows: &[Vec<f64>], k: usize, seed: u64, max_iterations: usize) -> KMeansFit {
    if rows.is_empty() || k == 0 {
        return KMeansFit { assignments: Vec::new(), centroids: vec![Vec::new(); k] };
    }

    let mut centroids = initial_centroids(rows, k, seed);
    let mut assignments = vec![0usize; rows.len()];

    for _ in 0..max_iterations.max(1) {
        let next: Vec<usize> = rows.iter().map(|row| nearest(row, &centroids)).collect();
        let converged = next == assignments;
        assignments = next;

        for (index, centroid) in centroids.iter_mut().enumerate() {
            let members: Vec<&Vec<f64>> = rows
                .iter()
                .zip(&assignments)
                .filter(|(_, &assignment)| assignment == index)
                .map(|(row, _)| row)
                .collect();
            if members.is_empty() {
                continue;
            }
            for (dim, value) in centroid.iter_mut().enumerate() {
                *value = members.iter().map(|row| row[dim]).sum::<f64>() / members.len() as f64;
            }
        }

        if converged {
            break;
        }
    }

    KMeansFit { assignments, centroids }
}

fn initial_centroids(rows: &[Vec<f64>], k: usize, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    if rows.len() >= k {
        let mut picks: Vec<usize> = sample(&mut rng, rows.len(), k).into_vec();
        picks.sort_unstable();
        picks.into_iter().map(|index| rows[index].clone()).collect()
    } else {
        // fewer points than clusters: reuse rows cyclically; the duplicate
        // centroids end up owning empty groups
        (0..k).map(|index| rows[index % rows.len()].clone()).collect()
    }
}

/// Index of the closest centroid; equal distances resolve to the lowest
/// cluster index.
fn nearest(row: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0usize;
    let mut best_distance = f64::INFINITY;
    for (index, centroid) in centroids.iter().enumerate() {
        let distance: f64 =
            row.iter().zip(centroid.iter()).map(|(a, b)| (a - b) * (a - b)).sum();
        if distance < best_distance {
            best = index;
            best_distance = distance;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 0.1],
            vec![0.1, 0.0],
            vec![0.05, 0.05],
            vec![10.0, 10.1],
            vec![10.1, 10.0],
            vec![10.05, 9.95],
        ]
    }

    #[test]
    fn separates_well_separated_blobs() {
        let fit = kmeans(&two_blobs(), 2, 42, 100);
        assert_eq!(fit.assignments[0], fit.assignments[1]);
        assert_eq!(fit.assignments[1], fit.assignments[2]);
        assert_eq!(fit.assignments[3], fit.assignments[4]);
        assert_eq!(fit.assignments[4], fit.assignments[5]);
        assert_ne!(fit.assignments[0], fit.assignments[3]);
    }

    #[test]
    fn same_seed_reproduces_the_fit() {
        let left = kmeans(&two_blobs(), 3, 7, 100);
        let right = kmeans(&two_blobs(), 3, 7, 100);
        assert_eq!(left.assignments, right.assignments);
        assert_eq!(left.centroids, right.centroids);
    }

    #[test]
    fn fewer_points_than_clusters_still_yields_k_centroids() {
        let rows = vec![vec![1.0, 1.0], vec![2.0, 2.0]];
        let fit = kmeans(&rows, 4, 42, 100);
        assert_eq!(fit.centroids.len(), 4);
        assert_eq!(fit.assignments.len(), 2);
        assert!(fit.assignments.iter().all(|&a| a < 4));
    }

    #[test]
    fn empty_input_yields_empty_assignments() {
        let fit = kmeans(&[], 4, 42, 100);
        assert!(fit.assignments.is_empty());
        assert_eq!(fit.centroids.len(), 4);
    }
}
