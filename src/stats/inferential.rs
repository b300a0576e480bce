//! Run-over-run comparison: mean, variance and phrase-distribution tests
//!
//! Every test checks its own preconditions and reports a `notes` outcome
//! naming the reason when it cannot run. Nothing here returns an error.

use super::{interpret, lenient_float, round_to, DescriptiveStats, DEFAULT_ALPHA};
use crate::{AnalysisRun, PhraseRecord};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, StudentsT};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

/// Number of top phrases (by global count) entering the chi-square table
pub const DEFAULT_TOP_PHRASES: usize = 20;

const PLACES: u32 = 4;

/// Result of a test that ran
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    #[serde(with = "lenient_float")]
    pub statistic: f64,
    #[serde(with = "lenient_float")]
    pub p_value: f64,
    /// Degrees of freedom (chi-square only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dof: Option<usize>,
    pub interpretation: String,
}

/// Either a test result or the reason the test was not performed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TestOutcome {
    Performed(TestResult),
    Skipped { notes: String },
}

impl TestOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        let notes = reason.into();
        tracing::debug!(%notes, "statistical test skipped");
        TestOutcome::Skipped { notes }
    }

    pub fn result(&self) -> Option<&TestResult> {
        match self {
            TestOutcome::Performed(r) => Some(r),
            TestOutcome::Skipped { .. } => None,
        }
    }

    pub fn is_performed(&self) -> bool {
        matches!(self, TestOutcome::Performed(_))
    }
}

/// Comparison of the current run against its predecessor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferentialSummary {
    /// `"none"` when there is no previous run
    pub comparison_target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_run_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_frequency_mean_ttest: Option<TestOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_frequency_variance_ftest: Option<TestOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phrase_distribution_chi2test: Option<TestOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl InferentialSummary {
    /// Summary for a run with nothing to compare against
    pub fn no_comparison() -> Self {
        Self {
            comparison_target: "none".to_string(),
            previous_run_id: None,
            global_frequency_mean_ttest: None,
            global_frequency_variance_ftest: None,
            phrase_distribution_chi2test: None,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Runs the three comparison tests
#[derive(Debug, Clone, Copy)]
pub struct Comparator {
    alpha: f64,
    top_phrases: usize,
}

impl Default for Comparator {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA, DEFAULT_TOP_PHRASES)
    }
}

impl Comparator {
    pub fn new(alpha: f64, top_phrases: usize) -> Self {
        Self { alpha, top_phrases }
    }

    /// Compare the current aggregates with `previous`, if there is one
    pub fn compare(
        &self,
        current_stats: &DescriptiveStats,
        current_phrases: &[PhraseRecord],
        previous: Option<&AnalysisRun>,
    ) -> InferentialSummary {
        let Some(prev) = previous else {
            return InferentialSummary::no_comparison();
        };

        InferentialSummary {
            comparison_target: format!(
                "Previous analysis {} created at {}",
                prev.id,
                prev.created_at.to_rfc3339()
            ),
            previous_run_id: Some(prev.id),
            global_frequency_mean_ttest: Some(
                self.mean_difference(current_stats, &prev.global_frequency_stats),
            ),
            global_frequency_variance_ftest: Some(
                self.variance_ratio(current_stats, &prev.global_frequency_stats),
            ),
            phrase_distribution_chi2test: Some(
                self.phrase_distribution(current_phrases, &prev.phrase_analysis),
            ),
            notes: None,
        }
    }

    /// Two-sample Student t-test from summary statistics (pooled variance)
    pub fn mean_difference(
        &self,
        current: &DescriptiveStats,
        previous: &DescriptiveStats,
    ) -> TestOutcome {
        let (Some(m1), Some(s1), Some(m2), Some(s2)) =
            (current.mean, current.std_dev, previous.mean, previous.std_dev)
        else {
            return TestOutcome::skipped("Insufficient data: mean or std_dev is missing for t-test.");
        };
        if current.count <= 1 || previous.count <= 1 {
            return TestOutcome::skipped("Insufficient data (count <= 1) for t-test.");
        }
        if s1 < 0.0 || s2 < 0.0 {
            return TestOutcome::skipped("Invalid data: negative std_dev for t-test.");
        }

        let n1 = current.count as f64;
        let n2 = previous.count as f64;
        let df = n1 + n2 - 2.0;
        let pooled_var = ((n1 - 1.0) * s1 * s1 + (n2 - 1.0) * s2 * s2) / df;
        let std_err = (pooled_var * (1.0 / n1 + 1.0 / n2)).sqrt();
        if !std_err.is_finite() || std_err <= 0.0 {
            return TestOutcome::skipped(
                "Could not perform t-test: both samples are constant (zero standard error).",
            );
        }

        let t = (m1 - m2) / std_err;
        let Ok(dist) = StudentsT::new(0.0, 1.0, df) else {
            return TestOutcome::skipped("Could not perform t-test: invalid degrees of freedom.");
        };
        let p = (2.0 * dist.sf(t.abs())).min(1.0);

        self.performed(t, p, None, "difference in mean frequency")
    }

    /// Upper-tail F-test on the ratio of current to previous variance
    pub fn variance_ratio(
        &self,
        current: &DescriptiveStats,
        previous: &DescriptiveStats,
    ) -> TestOutcome {
        let (Some(v1), Some(v2)) = (current.variance, previous.variance) else {
            return TestOutcome::skipped("Insufficient data: variance is missing for F-test.");
        };
        if current.count <= 1 || previous.count <= 1 {
            return TestOutcome::skipped("Insufficient data (count <= 1) for F-test.");
        }

        if v2 == 0.0 {
            return self.performed(f64::INFINITY, 0.0, None, "difference in frequency variance");
        }

        let f = v1 / v2;
        let d1 = (current.count - 1) as f64;
        let d2 = (previous.count - 1) as f64;
        let Ok(dist) = FisherSnedecor::new(d1, d2) else {
            return TestOutcome::skipped("Could not perform F-test: invalid degrees of freedom.");
        };
        let p = dist.sf(f);

        self.performed(f, p, None, "difference in frequency variance")
    }

    /// Chi-square test of independence over the top phrases both runs share
    pub fn phrase_distribution(
        &self,
        current: &[PhraseRecord],
        previous: &[PhraseRecord],
    ) -> TestOutcome {
        let cur = top_counts(current, self.top_phrases);
        let prev = top_counts(previous, self.top_phrases);

        let common: BTreeSet<&str> = cur
            .keys()
            .filter(|p| prev.contains_key(*p))
            .copied()
            .collect();
        if common.len() < 2 {
            return TestOutcome::skipped(
                "Not enough common top phrases between current and previous run for Chi-square test.",
            );
        }

        let (row_cur, row_prev): (Vec<f64>, Vec<f64>) = common
            .iter()
            .map(|p| (cur[p] as f64, prev[p] as f64))
            .filter(|(c, p)| *c > 0.0 || *p > 0.0)
            .unzip();
        if row_cur.len() < 2 {
            return TestOutcome::skipped("Not enough non-zero common top phrases for Chi-square test.");
        }

        match chi_square_independence(&[row_cur, row_prev]) {
            Some((stat, p, dof)) => self.performed(
                stat,
                p,
                Some(dof),
                "difference in phrase distributions (top common phrases)",
            ),
            None => TestOutcome::skipped(
                "Could not perform Chi-square test: a row or column total is zero.",
            ),
        }
    }

    fn performed(&self, statistic: f64, p_value: f64, dof: Option<usize>, subject: &str) -> TestOutcome {
        if p_value.is_nan() {
            return TestOutcome::skipped(format!("Could not compute p-value for {}.", subject));
        }
        TestOutcome::Performed(TestResult {
            statistic: round_to(statistic, PLACES),
            p_value: round_to(p_value, PLACES),
            dof,
            interpretation: interpret(p_value, self.alpha, subject),
        })
    }
}

/// phrase -> global count for the first `top` records
fn top_counts(records: &[PhraseRecord], top: usize) -> HashMap<&str, usize> {
    records
        .iter()
        .take(top)
        .map(|r| (r.phrase.as_str(), r.global_count))
        .collect()
}

/// Pearson chi-square for an R x K table of observed counts.
///
/// Yates' continuity correction is applied when the table has one degree of
/// freedom. Returns `None` when any expected frequency is zero.
pub fn chi_square_independence(table: &[Vec<f64>]) -> Option<(f64, f64, usize)> {
    let rows = table.len();
    let cols = table.first()?.len();
    if rows < 2 || cols < 2 || table.iter().any(|r| r.len() != cols) {
        return None;
    }

    let row_totals: Vec<f64> = table.iter().map(|r| r.iter().sum()).collect();
    let col_totals: Vec<f64> = (0..cols)
        .map(|j| table.iter().map(|r| r[j]).sum())
        .collect();
    let total: f64 = row_totals.iter().sum();
    if total <= 0.0 {
        return None;
    }

    let dof = (rows - 1) * (cols - 1);
    let mut stat = 0.0;
    for (i, row) in table.iter().enumerate() {
        for (j, &observed) in row.iter().enumerate() {
            let expected = row_totals[i] * col_totals[j] / total;
            if expected <= 0.0 {
                return None;
            }
            let mut o = observed;
            if dof == 1 {
                let diff = expected - observed;
                o += diff.signum() * diff.abs().min(0.5);
            }
            stat += (o - expected).powi(2) / expected;
        }
    }

    let dist = ChiSquared::new(dof as f64).ok()?;
    Some((stat, dist.sf(stat), dof))
}
