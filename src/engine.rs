//! Analysis engine - drives extraction, scoring, phrase profiling and the
//! statistics for one batch, then persists the resulting run

use crate::error::AnalysisError;
use crate::extract::build_corpus;
use crate::history::RunStore;
use crate::phrases;
use crate::scoring::Scorer;
use crate::stats::inferential::DEFAULT_TOP_PHRASES;
use crate::stats::trend::{DEFAULT_DIRECTION_THRESHOLD, DEFAULT_WINDOW};
use crate::stats::{
    Comparator, DescriptiveStats, Forecaster, InferentialSummary, ProbabilisticInsights,
    DEFAULT_ALPHA,
};
use crate::{AnalysisRun, Document, DocumentScore, SourceStats};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Tunables of one engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Significance level for every test
    pub alpha: f64,
    /// Persisted runs feeding the trend fit
    pub trend_window: usize,
    /// Slopes within +/- this value are "stable"
    pub trend_threshold: f64,
    /// Phrases per run entering the distribution test
    pub top_phrases: usize,
    /// Use frequency/percentage values supplied with the documents
    pub prefer_supplied_scores: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            trend_window: DEFAULT_WINDOW,
            trend_threshold: DEFAULT_DIRECTION_THRESHOLD,
            top_phrases: DEFAULT_TOP_PHRASES,
            prefer_supplied_scores: false,
        }
    }
}

/// Main engine: one `run` per batch
#[derive(Debug, Clone, Default)]
pub struct AnalysisEngine {
    settings: EngineSettings,
}

impl AnalysisEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Analyze `documents` and append the run to `store`.
    ///
    /// Nothing is written unless the whole run was computed.
    pub fn run<S: RunStore + ?Sized>(
        &self,
        store: &mut S,
        documents: &[Document],
        endpoint: &str,
    ) -> Result<AnalysisRun, AnalysisError> {
        let run = self.analyze(&*store, documents, endpoint)?;
        store.append(run.clone())?;
        tracing::info!(
            run_id = %run.id,
            documents = run.document_count,
            phrases = run.phrase_analysis.len(),
            "analysis run persisted"
        );
        Ok(run)
    }

    /// Compute a run against the history in `store` without persisting it
    pub fn analyze<S: RunStore + ?Sized>(
        &self,
        store: &S,
        documents: &[Document],
        endpoint: &str,
    ) -> Result<AnalysisRun, AnalysisError> {
        validate(documents)?;

        if documents.is_empty() {
            tracing::debug!("empty batch, recording a minimal run");
            return Ok(minimal_run(endpoint));
        }

        // Leaves first: extraction, scoring, phrase profile
        let corpus = build_corpus(documents);
        let sources: Vec<&str> = documents.iter().map(|d| d.source.as_str()).collect();
        let previous_scores = store.last_frequencies(&sources)?;
        let document_scores = Scorer::new()
            .with_previous(&previous_scores)
            .prefer_supplied(self.settings.prefer_supplied_scores)
            .score(documents, &corpus);
        let phrase_analysis = phrases::analyze(&corpus);

        let global_frequency_stats =
            DescriptiveStats::from_values(&column(&document_scores, |s| s.frequency));
        let global_percentage_stats =
            DescriptiveStats::from_values(&column(&document_scores, |s| s.percentage));
        let per_source_stats = per_source_stats(&document_scores);

        // History: previous run for the tests, last N runs for the trend
        let history = store.recent(self.settings.trend_window.max(1))?;
        let inferential_summary =
            Comparator::new(self.settings.alpha, self.settings.top_phrases).compare(
                &global_frequency_stats,
                &phrase_analysis,
                history.first(),
            );

        let mut window: Vec<f64> = history
            .iter()
            .take(self.settings.trend_window)
            .rev()
            .filter_map(|run| run.global_frequency_stats.mean)
            .collect();
        window.extend(global_frequency_stats.mean);
        let probabilistic_insights =
            Forecaster::new(self.settings.trend_threshold, self.settings.alpha).forecast(&window);

        Ok(AnalysisRun {
            id: Uuid::new_v4(),
            analyzed_endpoint: endpoint.to_string(),
            document_count: documents.len(),
            input_fingerprint: fingerprint(documents),
            document_scores,
            phrase_analysis,
            global_frequency_stats,
            global_percentage_stats,
            per_source_stats,
            inferential_summary,
            probabilistic_insights,
            created_at: Utc::now(),
        })
    }
}

fn validate(documents: &[Document]) -> Result<(), AnalysisError> {
    if let Some(pos) = documents.iter().position(|d| d.source.trim().is_empty()) {
        return Err(AnalysisError::InvalidBatch(format!(
            "document {} has an empty source",
            pos
        )));
    }
    Ok(())
}

fn minimal_run(endpoint: &str) -> AnalysisRun {
    AnalysisRun {
        id: Uuid::new_v4(),
        analyzed_endpoint: endpoint.to_string(),
        document_count: 0,
        input_fingerprint: fingerprint(&[]),
        document_scores: Vec::new(),
        phrase_analysis: Vec::new(),
        global_frequency_stats: DescriptiveStats::empty(),
        global_percentage_stats: DescriptiveStats::empty(),
        per_source_stats: BTreeMap::new(),
        inferential_summary: InferentialSummary::no_comparison()
            .with_notes("No documents in batch; nothing to compare."),
        probabilistic_insights: ProbabilisticInsights::notes_only(
            "No documents in batch; trend not computed.",
        ),
        created_at: Utc::now(),
    }
}

fn column(scores: &[DocumentScore], f: impl Fn(&DocumentScore) -> f64) -> Vec<f64> {
    scores.iter().map(f).collect()
}

fn per_source_stats(scores: &[DocumentScore]) -> BTreeMap<String, SourceStats> {
    let mut grouped: BTreeMap<&str, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for s in scores {
        let entry = grouped.entry(s.source.as_str()).or_default();
        entry.0.push(s.frequency);
        entry.1.push(s.percentage);
    }
    grouped
        .into_iter()
        .map(|(source, (freq, pct))| {
            (
                source.to_string(),
                SourceStats {
                    frequency_stats: DescriptiveStats::from_values(&freq),
                    percentage_stats: DescriptiveStats::from_values(&pct),
                },
            )
        })
        .collect()
}

/// SHA-256 over every document's source, content and supplied values
pub fn fingerprint(documents: &[Document]) -> String {
    let mut hasher = Sha256::new();
    for doc in documents {
        hasher.update(doc.source.as_bytes());
        hasher.update([0u8]);
        hasher.update(doc.content.to_string().as_bytes());
        hasher.update([0u8]);
        hasher.update(format!("{:?}/{:?}", doc.frequency, doc.percentage).as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryStore;
    use crate::stats::Direction;
    use serde_json::json;

    fn batch() -> Vec<Document> {
        vec![
            Document::new("https://a.example", json!({"title": "apple banana"})),
            Document::new("https://b.example", json!(["apple", {"t": "cherry"}])),
        ]
    }

    #[test]
    fn first_run_has_no_comparison() {
        let mut store = MemoryStore::new();
        let run = AnalysisEngine::default()
            .run(&mut store, &batch(), "feed")
            .unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(run.document_count, 2);
        assert_eq!(run.analyzed_endpoint, "feed");
        assert_eq!(run.inferential_summary.comparison_target, "none");
        assert!(run.inferential_summary.global_frequency_mean_ttest.is_none());
        assert_eq!(run.global_frequency_stats.mean, Some(1.39));
        assert_eq!(run.global_percentage_stats.mean, Some(0.0));
        assert!(run.probabilistic_insights.mean_frequency_trend.is_none());
        assert_eq!(run.probabilistic_insights.window, vec![1.39]);
        assert_eq!(run.per_source_stats.len(), 2);
        assert_eq!(run.input_fingerprint.len(), 64);
    }

    #[test]
    fn second_run_compares_and_trends() {
        let mut store = MemoryStore::new();
        let engine = AnalysisEngine::default();
        let first = engine.run(&mut store, &batch(), "feed").unwrap();
        let second = engine.run(&mut store, &batch(), "feed").unwrap();

        assert_eq!(second.inferential_summary.previous_run_id, Some(first.id));
        assert!(second.inferential_summary.global_frequency_mean_ttest.is_some());
        let fit = second
            .probabilistic_insights
            .mean_frequency_trend
            .as_ref()
            .and_then(|t| t.fit())
            .unwrap();
        assert_eq!(fit.direction, Direction::Stable);
        assert_eq!(second.probabilistic_insights.window, vec![1.39, 1.39]);
        assert_eq!(second.document_scores[0].percentage, 0.0);
        assert_eq!(second.input_fingerprint, first.input_fingerprint);
    }

    #[test]
    fn percentage_change_uses_source_history() {
        let mut store = MemoryStore::new();
        let engine = AnalysisEngine::default();
        engine
            .run(&mut store, &[Document::new("s", json!("a b c"))], "feed")
            .unwrap();
        let run = engine
            .run(&mut store, &[Document::new("s", json!("inflation"))], "feed")
            .unwrap();
        // previous score 0 (no surviving tokens), current 1
        assert_eq!(run.document_scores[0].frequency, 1.0);
        assert_eq!(run.document_scores[0].percentage, 100.0);
    }

    #[test]
    fn empty_batch_records_minimal_run() {
        let mut store = MemoryStore::new();
        let run = AnalysisEngine::default().run(&mut store, &[], "feed").unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(run.document_count, 0);
        assert!(run.phrase_analysis.is_empty());
        assert!(run.per_source_stats.is_empty());
        assert_eq!(run.global_frequency_stats.count, 0);
        assert!(run.inferential_summary.notes.is_some());
        assert!(run.probabilistic_insights.notes.is_some());
    }

    #[test]
    fn empty_source_is_invalid() {
        let mut store = MemoryStore::new();
        let err = AnalysisEngine::default()
            .run(&mut store, &[Document::new("  ", json!("x"))], "feed")
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidBatch(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn trend_window_is_bounded() {
        let mut store = MemoryStore::new();
        let engine = AnalysisEngine::new(EngineSettings {
            trend_window: 2,
            ..EngineSettings::default()
        });
        for _ in 0..4 {
            engine.run(&mut store, &batch(), "feed").unwrap();
        }
        let run = engine.run(&mut store, &batch(), "feed").unwrap();
        assert_eq!(run.probabilistic_insights.window.len(), 3);
    }

    #[test]
    fn per_source_stats_group_duplicates() {
        let docs = vec![
            Document::new("s", json!("alpha beta")),
            Document::new("s", json!("gamma")),
            Document::new("t", json!("delta")),
        ];
        let run = AnalysisEngine::default()
            .analyze(&MemoryStore::new(), &docs, "feed")
            .unwrap();
        assert_eq!(run.per_source_stats["s"].frequency_stats.count, 2);
        assert_eq!(run.per_source_stats["t"].frequency_stats.count, 1);
        let keys: Vec<_> = run.per_source_stats.keys().cloned().collect();
        assert_eq!(keys, vec!["s", "t"]);
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = fingerprint(&batch());
        let mut changed = batch();
        changed[0].content = json!({"title": "apple kiwi"});
        assert_ne!(a, fingerprint(&changed));
        assert_eq!(a, fingerprint(&batch()));
    }
}
