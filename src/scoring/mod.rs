//! Frequency scoring - per-document relevance and change against history

pub mod change;
pub mod tfidf;

pub use change::percentage_change;
pub use tfidf::{tokenize, TfIdfMatrix};

use crate::extract::CorpusEntry;
use crate::stats::round_to;
use crate::{Document, DocumentScore};
use std::collections::HashMap;

/// Relevance score of every corpus entry (row sum of its TF-IDF weights, 2 decimals)
pub fn relevance_scores(corpus: &[CorpusEntry]) -> Vec<f64> {
    if corpus.iter().all(|e| e.text.trim().is_empty()) {
        return vec![0.0; corpus.len()];
    }
    let texts: Vec<&str> = corpus.iter().map(|e| e.text.as_str()).collect();
    TfIdfMatrix::fit_transform(&texts)
        .row_sums()
        .into_iter()
        .map(|s| round_to(s, 2))
        .collect()
}

/// Turns a corpus into document scores
#[derive(Debug, Clone, Default)]
pub struct Scorer<'a> {
    previous: Option<&'a HashMap<String, f64>>,
    prefer_supplied: bool,
}

impl<'a> Scorer<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last known score per source, used for the percentage change
    pub fn with_previous(mut self, previous: &'a HashMap<String, f64>) -> Self {
        self.previous = Some(previous);
        self
    }

    /// Use the frequency and percentage an earlier stage attached to a document
    pub fn prefer_supplied(mut self, enabled: bool) -> Self {
        self.prefer_supplied = enabled;
        self
    }

    /// Score `documents`; `corpus` must be built from the same slice
    pub fn score(&self, documents: &[Document], corpus: &[CorpusEntry]) -> Vec<DocumentScore> {
        debug_assert_eq!(documents.len(), corpus.len());
        let computed = relevance_scores(corpus);

        documents
            .iter()
            .zip(computed)
            .map(|(doc, score)| {
                let supplied = |v: Option<f64>| v.filter(|v| self.prefer_supplied && v.is_finite());
                let frequency = supplied(doc.frequency).unwrap_or(score);
                let previous = self.previous.and_then(|p| p.get(&doc.source).copied());
                let percentage = supplied(doc.percentage)
                    .unwrap_or_else(|| percentage_change(previous, frequency));
                DocumentScore {
                    source: doc.source.clone(),
                    frequency,
                    percentage,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::build_corpus;
    use serde_json::json;

    fn docs() -> Vec<Document> {
        vec![
            Document::new("https://a.example", json!({"title": "apple banana"})),
            Document::new("https://b.example", json!(["apple", {"t": "cherry"}])),
        ]
    }

    #[test]
    fn two_document_scores() {
        // Each row: apple weight 1/norm, other term (ln 1.5 + 1)/norm
        let corpus = build_corpus(&docs());
        assert_eq!(relevance_scores(&corpus), vec![1.39, 1.39]);
    }

    #[test]
    fn scores_are_deterministic() {
        let corpus = build_corpus(&docs());
        let first = relevance_scores(&corpus);
        for _ in 0..5 {
            assert_eq!(relevance_scores(&corpus), first);
        }
    }

    #[test]
    fn empty_texts_score_zero() {
        let documents = vec![
            Document::new("s", json!({"n": 1})),
            Document::new("t", json!([])),
        ];
        let corpus = build_corpus(&documents);
        assert_eq!(relevance_scores(&corpus), vec![0.0, 0.0]);
    }

    #[test]
    fn single_character_tokens_only() {
        let documents = vec![Document::new("s", json!("a b c"))];
        let corpus = build_corpus(&documents);
        assert_eq!(relevance_scores(&corpus), vec![0.0]);
    }

    #[test]
    fn single_token_document_scores_one() {
        let documents = vec![Document::new("s", json!("inflation"))];
        let corpus = build_corpus(&documents);
        assert_eq!(relevance_scores(&corpus), vec![1.0]);
    }

    #[test]
    fn change_uses_previous_score_per_source() {
        let documents = docs();
        let corpus = build_corpus(&documents);
        let mut previous = HashMap::new();
        previous.insert("https://a.example".to_string(), 0.0);

        let scores = Scorer::new().with_previous(&previous).score(&documents, &corpus);
        assert_eq!(scores[0].percentage, 100.0);
        assert_eq!(scores[1].percentage, 0.0);
        assert_eq!(scores[0].source, "https://a.example");
    }

    #[test]
    fn supplied_values_ignored_by_default() {
        let documents = vec![Document::new("s", json!("inflation")).with_supplied(Some(7.5), Some(-3.0))];
        let corpus = build_corpus(&documents);
        let scores = Scorer::new().score(&documents, &corpus);
        assert_eq!(scores[0].frequency, 1.0);
        assert_eq!(scores[0].percentage, 0.0);
    }

    #[test]
    fn supplied_values_preferred_when_enabled() {
        let documents = vec![
            Document::new("s", json!("inflation")).with_supplied(Some(7.5), Some(-3.0)),
            Document::new("t", json!("rates")).with_supplied(Some(2.0), None),
        ];
        let corpus = build_corpus(&documents);
        let mut previous = HashMap::new();
        previous.insert("t".to_string(), 1.0);

        let scores = Scorer::new()
            .with_previous(&previous)
            .prefer_supplied(true)
            .score(&documents, &corpus);
        assert_eq!(scores[0].frequency, 7.5);
        assert_eq!(scores[0].percentage, -3.0);
        assert_eq!(scores[1].frequency, 2.0);
        assert_eq!(scores[1].percentage, 100.0);
    }
}
