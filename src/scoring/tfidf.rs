//! TF-IDF over a fixed tokenizer
//!
//! The tokenizer is pinned so scores stay comparable between runs:
//! - tokens match `(?u)\b\w\w+\b` (two or more word characters)
//! - tokens are lowercased, no stop words are removed
//! - tf is the raw count, idf is smoothed: `ln((1 + n) / (1 + df)) + 1`
//! - every row is L2-normalized

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

const TOKEN_PATTERN: &str = r"(?u)\b\w\w+\b";

fn token_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(TOKEN_PATTERN).expect("token pattern is a valid regex"))
}

/// Split a document into lowercase tokens
pub fn tokenize(text: &str) -> Vec<String> {
    token_regex()
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Sparse TF-IDF matrix: one row of (term index, weight) per document
#[derive(Debug, Clone, Default)]
pub struct TfIdfMatrix {
    vocabulary: Vec<String>,
    rows: Vec<Vec<(usize, f64)>>,
}

impl TfIdfMatrix {
    /// Fit and transform a corpus in one batch
    pub fn fit_transform<S: AsRef<str>>(corpus: &[S]) -> Self {
        let tokenized: Vec<Vec<String>> = corpus.iter().map(|d| tokenize(d.as_ref())).collect();

        // Vocabulary in first-seen order; df counts documents containing the term
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut vocabulary = Vec::new();
        let mut doc_freq: Vec<usize> = Vec::new();
        let mut term_counts: Vec<Vec<(usize, usize)>> = Vec::with_capacity(tokenized.len());

        for tokens in &tokenized {
            let mut counts: HashMap<usize, usize> = HashMap::new();
            for token in tokens {
                let idx = match index.get(token) {
                    Some(&i) => i,
                    None => {
                        index.insert(token.clone(), vocabulary.len());
                        vocabulary.push(token.clone());
                        doc_freq.push(0);
                        vocabulary.len() - 1
                    }
                };
                *counts.entry(idx).or_insert(0) += 1;
            }
            let mut counts: Vec<(usize, usize)> = counts.into_iter().collect();
            counts.sort_unstable_by_key(|(idx, _)| *idx);
            for (idx, _) in &counts {
                doc_freq[*idx] += 1;
            }
            term_counts.push(counts);
        }

        let n = corpus.len() as f64;
        let idf: Vec<f64> = doc_freq
            .iter()
            .map(|&df| ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0)
            .collect();

        let rows = term_counts
            .into_iter()
            .map(|counts| {
                let mut row: Vec<(usize, f64)> = counts
                    .into_iter()
                    .map(|(idx, tf)| (idx, tf as f64 * idf[idx]))
                    .collect();
                let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
                if norm > 0.0 {
                    row.iter_mut().for_each(|(_, w)| *w /= norm);
                }
                row
            })
            .collect();

        Self { vocabulary, rows }
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    /// Weights of one document (term index order)
    pub fn row(&self, i: usize) -> &[(usize, f64)] {
        &self.rows[i]
    }

    /// Sum of each row's weights
    pub fn row_sums(&self) -> Vec<f64> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|(_, w)| w).sum())
            .collect()
    }
}
