//! Term-frequency / inverse-document-frequency vectorization.
//!
//! Uses the common text-vectorizer defaults: lowercase alphanumeric tokens
//! of two or more characters, English stop-word removal, smoothed idf
//! `ln((1+n)/(1+df)) + 1`, L2-normalized rows.

use std::collections::HashMap;

/// English stop-word list applied during tokenization.
const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "cannot", "could", "did", "do", "does", "doing", "down", "during", "each",
    "few", "for", "from", "further", "had", "has", "have", "having", "he", "her", "here",
    "hers", "herself", "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it",
    "its", "itself", "me", "more", "most", "my", "myself", "no", "nor", "not", "of", "off",
    "on", "once", "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own",
    "same", "she", "should", "so", "some", "such", "than", "that", "the", "their", "theirs",
    "them", "themselves", "then", "there", "these", "they", "this", "those", "through", "to",
    "too", "under", "until", "up", "very", "was", "we", "were", "what", "when", "where",
    "which", "while", "who", "whom", "why", "with", "would", "you", "your", "yours",
    "yourself", "yourselves",
];

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= 2)
        .filter(|token| !STOP_WORDS.contains(token))
        .map(str::to_string)
        .collect()
}

/// Fitted document-term matrix with L2-normalized rows, so cosine similarity
/// between two rows reduces to their dot product.
#[derive(Clone, Debug)]
pub struct TfidfMatrix {
    rows: Vec<Vec<f64>>,
    vocabulary_size: usize,
}

impl TfidfMatrix {
    pub fn fit(documents: &[String]) -> Self {
        let tokenized: Vec<Vec<String>> = documents.iter().map(|doc| tokenize(doc)).collect();

        let mut vocabulary: HashMap<&str, usize> = HashMap::new();
        let mut document_frequency: Vec<usize> = Vec::new();
        for tokens in &tokenized {
            let mut seen: Vec<usize> = Vec::new();
            for token in tokens {
                let next_index = vocabulary.len();
                let index = *vocabulary.entry(token.as_str()).or_insert(next_index);
                if index == document_frequency.len() {
                    document_frequency.push(0);
                }
                if !seen.contains(&index) {
                    document_frequency[index] += 1;
                    seen.push(index);
                }
            }
        }

        let n = documents.len() as f64;
        let idf: Vec<f64> = document_frequency
            .iter()
            .map(|&df| ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0)
            .collect();

        let rows = tokenized
            .iter()
            .map(|tokens| {
                let mut row = vec![0.0; vocabulary.len()];
                for token in tokens {
                    if let Some(&index) = vocabulary.get(token.as_str()) {
                        row[index] += 1.0;
                    }
                }
                for (value, weight) in row.iter_mut().zip(idf.iter()) {
                    *value *= weight;
                }
                l2_normalize(&mut row);
                row
            })
            .collect();

        Self { rows, vocabulary_size: vocabulary.len() }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary_size
    }

    /// Cosine similarity between two documents; 0 for all-zero rows.
    pub fn similarity(&self, left: usize, right: usize) -> f64 {
        self.rows[left].iter().zip(self.rows[right].iter()).map(|(a, b)| a * b).sum()
    }
}

fn l2_normalize(row: &mut [f64]) {
    let norm: f64 = row.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm > 0.0 {
        for value in row.iter_mut() {
            *value /= norm;
        }
    }
}

/// Cosine similarity of two raw vectors; resolves to 0 when either side has
/// zero norm (a user with no interaction history).
pub fn cosine(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
