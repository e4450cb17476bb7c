//! Hybrid product recommendation: content-based TF-IDF ranking merged with
//! collaborative filtering over the interaction matrix.
//!
//! Output contract: never contains the query product, no duplicates, at most
//! `n` entries, deterministic for a fixed data snapshot.

pub mod tfidf;

use tracing::debug;

use crate::domain::{ProductId, UserId};
use crate::features::InteractionMatrix;

pub use tfidf::{cosine, TfidfMatrix};

/// One product's entry in the recommendation corpus: its id and the feature
/// text built by [`crate::features::product_feature_text`].
#[derive(Clone, Debug, PartialEq)]
pub struct ProductDocument {
    pub id: ProductId,
    pub text: String,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RecommendationEngine;

impl RecommendationEngine {
    pub fn new() -> Self {
        Self
    }

    /// TF-IDF cosine ranking of the corpus against `query`, best first,
    /// excluding the query product itself. Unknown query or empty corpus
    /// yields an empty list.
    pub fn content_based(
        &self,
        corpus: &[ProductDocument],
        query: ProductId,
        n: usize,
    ) -> Vec<ProductId> {
        if corpus.is_empty() || n == 0 {
            return Vec::new();
        }
        let Some(query_index) = corpus.iter().position(|doc| doc.id == query) else {
            return Vec::new();
        };

        let documents: Vec<String> = corpus.iter().map(|doc| doc.text.clone()).collect();
        let matrix = TfidfMatrix::fit(&documents);

        let mut ranked: Vec<(usize, f64)> = (0..corpus.len())
            .filter(|&index| index != query_index)
            .map(|index| (index, matrix.similarity(query_index, index)))
            .collect();
        sort_ranked(&mut ranked);

        ranked.into_iter().take(n).map(|(index, _)| corpus[index].id).collect()
    }

    /// Collaborative ranking: sum the `n` most similar users' interaction
    /// weights per product. An unknown user or an all-zero history row makes
    /// every similarity 0 and the result empty.
    pub fn collaborative(
        &self,
        matrix: &InteractionMatrix,
        user: UserId,
        n: usize,
    ) -> Vec<ProductId> {
        if matrix.is_empty() || n == 0 {
            return Vec::new();
        }
        let Some(user_index) = matrix.user_index(user) else {
            return Vec::new();
        };

        let target_row = matrix.row(user_index);
        let mut neighbors: Vec<(usize, f64)> = (0..matrix.user_count())
            .filter(|&index| index != user_index)
            .map(|index| (index, cosine(target_row, matrix.row(index))))
            .collect();
        sort_ranked(&mut neighbors);
        neighbors.truncate(n);

        let mut scores = vec![0.0; matrix.product_ids().len()];
        for (neighbor, similarity) in &neighbors {
            if *similarity <= 0.0 {
                continue;
            }
            for (score, weight) in scores.iter_mut().zip(matrix.row(*neighbor)) {
                *score += weight;
            }
        }

        let mut ranked: Vec<(usize, f64)> = scores
            .iter()
            .enumerate()
            .filter(|(_, &score)| score > 0.0)
            .map(|(index, &score)| (index, score))
            .collect();
        sort_ranked(&mut ranked);

        ranked.into_iter().map(|(index, _)| matrix.product_ids()[index]).collect()
    }

    /// Hybrid ranking: content-based results first, then collaborative,
    /// deduplicated in first-seen order, query product dropped, truncated
    /// to `n`. Without a user (or without history for one) the result is
    /// pure content-based.
    pub fn recommend(
        &self,
        corpus: &[ProductDocument],
        matrix: &InteractionMatrix,
        query: ProductId,
        user: Option<UserId>,
        n: usize,
    ) -> Vec<ProductId> {
        let content = self.content_based(corpus, query, n);
        let collaborative = match user {
            Some(user) => self.collaborative(matrix, user, n),
            None => Vec::new(),
        };
        debug!(
            content = content.len(),
            collaborative = collaborative.len(),
            "merging recommendation halves"
        );

        let mut merged: Vec<ProductId> = Vec::with_capacity(n);
        for id in content.into_iter().chain(collaborative) {
            if id == query || merged.contains(&id) {
                continue;
            }
            merged.push(id);
            if merged.len() == n {
                break;
            }
        }
        merged
    }
}

/// Descending by score, ties broken by ascending index so equal scores keep
/// a stable, snapshot-deterministic order.
fn sort_ranked(ranked: &mut [(usize, f64)]) {
    ranked.sort_by(|(left_index, left), (right_index, right)| {
        right
            .partial_cmp(left)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(left_index.cmp(right_index))
    });
}
