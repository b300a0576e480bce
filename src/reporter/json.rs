//! JSON reporter for machine-readable output

use crate::history::RunPage;
use crate::AnalysisRun;
use serde::Serialize;

/// Reporter for JSON output
pub struct JsonReporter {
    /// Whether to pretty-print JSON
    pretty: bool,
}

impl JsonReporter {
    /// Create a new JSON reporter
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Enable pretty-printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    /// One run, exactly as persisted
    pub fn report(&self, run: &AnalysisRun) -> String {
        self.encode(run, "{}")
    }

    /// A page of runs with paging metadata
    pub fn report_page(&self, page: &RunPage) -> String {
        let output = JsonPage {
            page: page.page,
            page_size: page.page_size,
            total: page.total,
            total_pages: page.total_pages(),
            results: &page.runs,
        };
        self.encode(&output, "{}")
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T, fallback: &str) -> String {
        let encoded = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        encoded.unwrap_or_else(|_| fallback.to_string())
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct JsonPage<'a> {
    page: usize,
    page_size: usize,
    total: usize,
    total_pages: usize,
    results: &'a [AnalysisRun],
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{run_analysis, Document, MemoryStore, RunStore};
    use serde_json::json;

    fn two_runs() -> MemoryStore {
        let mut store = MemoryStore::new();
        let docs = vec![
            Document::new("https://a.example", json!({"title": "rate hike", "tags": ["fed"]})),
            Document::new("https://b.example", json!({"title": "jobs report"})),
        ];
        run_analysis(&mut store, &docs, "feed").unwrap();
        run_analysis(&mut store, &docs, "feed").unwrap();
        store
    }

    #[test]
    fn test_run_has_expected_keys() {
        let store = two_runs();
        let run = &store.recent(1).unwrap()[0];
        let parsed: serde_json::Value =
            serde_json::from_str(&JsonReporter::new().report(run)).unwrap();

        for key in [
            "id",
            "analyzed_endpoint",
            "document_count",
            "input_fingerprint",
            "document_scores",
            "phrase_analysis",
            "global_frequency_stats",
            "global_percentage_stats",
            "per_source_stats",
            "inferential_summary",
            "probabilistic_insights",
            "created_at",
        ] {
            assert!(parsed.get(key).is_some(), "missing key {}", key);
        }
        let summary = &parsed["inferential_summary"];
        assert!(summary.get("global_frequency_mean_ttest").is_some());
        assert!(summary.get("phrase_distribution_chi2test").is_some());
    }

    #[test]
    fn test_pretty_output() {
        let store = two_runs();
        let run = &store.recent(1).unwrap()[0];
        let json = JsonReporter::new().pretty().report(run);
        assert!(json.contains('\n'), "pretty JSON should have newlines");
        assert!(json.contains("  "), "pretty JSON should have indentation");
    }

    #[test]
    fn test_page_envelope() {
        let store = two_runs();
        let page = store.page(1, 1).unwrap();
        let parsed: serde_json::Value =
            serde_json::from_str(&JsonReporter::new().report_page(&page)).unwrap();

        assert_eq!(parsed["page"], 1);
        assert_eq!(parsed["page_size"], 1);
        assert_eq!(parsed["total"], 2);
        assert_eq!(parsed["total_pages"], 2);
        assert_eq!(parsed["results"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_report_parses_back_into_run() {
        let store = two_runs();
        let run = store.recent(1).unwrap().remove(0);
        let back: AnalysisRun = serde_json::from_str(&JsonReporter::new().report(&run)).unwrap();
        assert_eq!(back.id, run.id);
        assert_eq!(back.phrase_analysis, run.phrase_analysis);
    }
}
