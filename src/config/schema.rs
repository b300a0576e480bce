//! Config schema and deserialization

use crate::engine::EngineSettings;
use crate::history::HISTORY_FILENAME;
use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root config structure for .trendscoperc.json
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Extend another config file (path relative to this config)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    /// Significance level for the run-over-run tests. Default: 0.05
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub significance_level: Option<f64>,

    /// Persisted runs feeding the trend fit. Default: 5
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend_window: Option<usize>,

    /// Slopes within +/- this value count as stable. Default: 0.001
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend_threshold: Option<f64>,

    /// Phrases per run entering the distribution test. Default: 20
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_phrases: Option<usize>,

    /// Use frequency/percentage values shipped with the documents. Default: false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefer_supplied_scores: Option<bool>,

    /// Run history file. Default: .trendscope-history.jsonl
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,

    /// Label recorded as the analyzed endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Glob patterns for input page files to skip
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore: Vec<String>,
}

impl Config {
    /// Config written by `trendscope init`: every key at its default
    pub fn init_template() -> Self {
        let defaults = EngineSettings::default();
        Self {
            extends: None,
            significance_level: Some(defaults.alpha),
            trend_window: Some(defaults.trend_window),
            trend_threshold: Some(defaults.trend_threshold),
            top_phrases: Some(defaults.top_phrases),
            prefer_supplied_scores: Some(defaults.prefer_supplied_scores),
            store: Some(HISTORY_FILENAME.to_string()),
            endpoint: None,
            ignore: vec!["**/*.draft.json".to_string()],
        }
    }

    /// Merge CLI overrides into config. CLI values take precedence.
    pub fn merge_with_cli(mut self, cli_store: Option<&Path>, cli_endpoint: Option<&str>) -> Self {
        if let Some(store) = cli_store {
            self.store = Some(store.to_string_lossy().to_string());
        }
        if let Some(endpoint) = cli_endpoint {
            self.endpoint = Some(endpoint.to_string());
        }
        self
    }

    /// Merge another config into this one (for extends)
    pub fn merge_from(&mut self, base: Config) {
        // Base values are overridden by this config's values
        if self.extends.is_none() {
            self.extends = base.extends;
        }
        self.significance_level = self.significance_level.or(base.significance_level);
        self.trend_window = self.trend_window.or(base.trend_window);
        self.trend_threshold = self.trend_threshold.or(base.trend_threshold);
        self.top_phrases = self.top_phrases.or(base.top_phrases);
        self.prefer_supplied_scores = self.prefer_supplied_scores.or(base.prefer_supplied_scores);
        if self.store.is_none() {
            self.store = base.store;
        }
        if self.endpoint.is_none() {
            self.endpoint = base.endpoint;
        }

        // Merge ignore patterns
        let mut all_ignores = base.ignore;
        all_ignores.append(&mut self.ignore);
        self.ignore = all_ignores;
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if let Some(alpha) = self.significance_level {
            ensure!(
                alpha > 0.0 && alpha < 1.0,
                "significanceLevel must be between 0 and 1 (got {})",
                alpha
            );
        }
        if let Some(window) = self.trend_window {
            ensure!(window >= 1, "trendWindow must be at least 1");
        }
        if let Some(threshold) = self.trend_threshold {
            ensure!(
                threshold.is_finite() && threshold >= 0.0,
                "trendThreshold must be a non-negative number (got {})",
                threshold
            );
        }
        if let Some(top) = self.top_phrases {
            ensure!(top >= 2, "topPhrases must be at least 2");
        }
        Ok(())
    }

    /// Engine settings with defaults filled in
    pub fn to_engine_settings(&self) -> EngineSettings {
        let defaults = EngineSettings::default();
        EngineSettings {
            alpha: self.significance_level.unwrap_or(defaults.alpha),
            trend_window: self.trend_window.unwrap_or(defaults.trend_window),
            trend_threshold: self.trend_threshold.unwrap_or(defaults.trend_threshold),
            top_phrases: self.top_phrases.unwrap_or(defaults.top_phrases),
            prefer_supplied_scores: self
                .prefer_supplied_scores
                .unwrap_or(defaults.prefer_supplied_scores),
        }
    }

    /// History file location; a relative path resolves against `base_dir`
    pub fn store_path(&self, base_dir: &Path) -> PathBuf {
        let store = Path::new(self.store.as_deref().unwrap_or(HISTORY_FILENAME));
        if store.is_absolute() {
            store.to_path_buf()
        } else {
            base_dir.join(store)
        }
    }

    /// Endpoint label, falling back to `default`
    pub fn endpoint_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.endpoint.as_deref().unwrap_or(default)
    }
}
