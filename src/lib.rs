//! trendscope: phrase-frequency analytics over batches of JSON documents
//!
//! Each invocation scores every document in a batch (TF-IDF relevance),
//! profiles the phrases the batch contains, summarizes the scores, and
//! compares the result with earlier runs kept in an append-only history.

pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod history;
pub mod logging;
pub mod phrases;
pub mod reporter;
pub mod scoring;
pub mod source;
pub mod stats;

pub use engine::{AnalysisEngine, EngineSettings};
pub use error::{AnalysisError, StoreError};
pub use history::{JsonFileStore, MemoryStore, RunPage, RunStore};
pub use stats::{DescriptiveStats, InferentialSummary, ProbabilisticInsights};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// One input record from the document source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier of where the record came from (usually a URL)
    pub source: String,
    /// Arbitrary JSON payload
    #[serde(default)]
    pub content: Value,
    /// Frequency computed by an earlier stage, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,
    /// Percentage computed by an earlier stage, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
}

impl Document {
    pub fn new(source: impl Into<String>, content: Value) -> Self {
        Self {
            source: source.into(),
            content,
            frequency: None,
            percentage: None,
        }
    }

    /// Attach values supplied by an earlier pipeline stage
    pub fn with_supplied(mut self, frequency: Option<f64>, percentage: Option<f64>) -> Self {
        self.frequency = frequency;
        self.percentage = percentage;
        self
    }
}

/// Score assigned to one document in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentScore {
    pub source: String,
    /// Relevance score (2 decimals)
    pub frequency: f64,
    /// Signed change against the previous score for the same source (2 decimals)
    pub percentage: f64,
}

/// Share of a phrase inside a single source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDetail {
    pub source: String,
    pub count_in_source: usize,
    /// count_in_source / phrases in that source * 100 (2 decimals)
    pub percentage_in_source: f64,
}

/// Global and per-source profile of a single phrase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseRecord {
    pub phrase: String,
    pub global_count: usize,
    /// global_count / all phrase occurrences * 100 (2 decimals)
    pub global_probability_percent: f64,
    /// Sorted by count_in_source, highest first
    pub source_details: Vec<SourceDetail>,
}

/// Descriptive statistics for one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceStats {
    pub frequency_stats: DescriptiveStats,
    pub percentage_stats: DescriptiveStats,
}

/// A persisted analysis run. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRun {
    pub id: Uuid,
    /// Where the analyzed documents were sourced from
    pub analyzed_endpoint: String,
    pub document_count: usize,
    /// SHA-256 of the input batch
    pub input_fingerprint: String,
    pub document_scores: Vec<DocumentScore>,
    /// Sorted by global_count, highest first
    pub phrase_analysis: Vec<PhraseRecord>,
    pub global_frequency_stats: DescriptiveStats,
    pub global_percentage_stats: DescriptiveStats,
    pub per_source_stats: BTreeMap<String, SourceStats>,
    pub inferential_summary: InferentialSummary,
    pub probabilistic_insights: ProbabilisticInsights,
    pub created_at: DateTime<Utc>,
}

impl AnalysisRun {
    /// Frequency recorded for `source` in this run (last matching document wins)
    pub fn frequency_for(&self, source: &str) -> Option<f64> {
        self.document_scores
            .iter()
            .rev()
            .find(|s| s.source == source)
            .map(|s| s.frequency)
    }
}

/// Public API: analyze one batch and append the resulting run to `store`.
///
/// Uses default engine settings; build an [`AnalysisEngine`] directly to
/// tune significance level, trend window and the rest.
pub fn run_analysis<S: RunStore + ?Sized>(
    store: &mut S,
    documents: &[Document],
    endpoint: &str,
) -> Result<AnalysisRun, AnalysisError> {
    AnalysisEngine::new(EngineSettings::default()).run(store, documents, endpoint)
}

/// Public API: one page of persisted runs, newest first. Never writes.
pub fn list_runs<S: RunStore + ?Sized>(
    store: &S,
    page: usize,
    page_size: usize,
) -> Result<RunPage, StoreError> {
    store.page(page, page_size)
}
