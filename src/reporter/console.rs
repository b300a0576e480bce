//! Console reporter with colored output

use crate::history::{format_delta, RunPage};
use crate::stats::{Direction, InferentialSummary, ProbabilisticInsights, TestOutcome, TrendOutcome};
use crate::{AnalysisRun, DescriptiveStats};
use colored::Colorize;
use std::fmt::Write;

const TOP_PHRASES_SHOWN: usize = 10;

/// Reporter for terminal output
pub struct ConsoleReporter {
    /// Whether to use colors
    use_colors: bool,
    /// Whether to show verbose output
    verbose: bool,
}

impl ConsoleReporter {
    /// Create a new console reporter
    pub fn new() -> Self {
        Self {
            use_colors: true,
            verbose: false,
        }
    }

    /// Disable colors
    pub fn without_colors(mut self) -> Self {
        self.use_colors = false;
        self
    }

    /// Enable verbose output
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Print a full run report
    pub fn report(&self, run: &AnalysisRun) {
        print!("{}", self.render(run));
    }

    /// Print one summary line
    pub fn report_quiet(&self, run: &AnalysisRun) {
        println!("{}", self.render_quiet(run));
    }

    /// Print a page of runs
    pub fn report_page(&self, page: &RunPage) {
        print!("{}", self.render_page(page));
    }

    pub fn render(&self, run: &AnalysisRun) -> String {
        let mut out = String::new();
        self.write_header(&mut out, run);
        self.write_stats(&mut out, run);
        self.write_phrases(&mut out, run);
        self.write_comparison(&mut out, &run.inferential_summary);
        self.write_trend(&mut out, &run.probabilistic_insights);
        out
    }

    pub fn render_quiet(&self, run: &AnalysisRun) -> String {
        let direction = run
            .probabilistic_insights
            .mean_frequency_trend
            .as_ref()
            .and_then(TrendOutcome::fit)
            .map(|f| self.colorize_direction(f.direction).to_string())
            .unwrap_or_else(|| "no trend".dimmed().to_string());
        format!(
            "{}: {} documents, mean frequency {} ({})",
            run.analyzed_endpoint,
            run.document_count,
            fmt_opt(run.global_frequency_stats.mean),
            direction
        )
    }

    pub fn render_page(&self, page: &RunPage) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{}",
            format!(
                "Runs {} of {} (page {}/{})",
                page.runs.len(),
                page.total,
                page.page,
                page.total_pages().max(1)
            )
            .bold()
        );
        if page.runs.is_empty() {
            let _ = writeln!(out, "   {}", "No runs recorded.".dimmed());
            return out;
        }
        for run in &page.runs {
            let _ = writeln!(
                out,
                "   {} {} {:>5} docs  mean {:>8}  {}",
                run.created_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
                run.id,
                run.document_count,
                fmt_opt(run.global_frequency_stats.mean),
                run.analyzed_endpoint
            );
        }
        out
    }

    fn write_header(&self, out: &mut String, run: &AnalysisRun) {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{}",
            format!("📊 Phrase Frequency Analysis: {}", run.analyzed_endpoint).bold()
        );
        let _ = writeln!(
            out,
            "   Run: {} | Documents: {} | Phrases: {}",
            run.id,
            run.document_count,
            run.phrase_analysis.len()
        );
        let _ = writeln!(out, "   Created: {}", run.created_at.to_rfc3339().dimmed());
        let _ = writeln!(out);
    }

    fn write_stats(&self, out: &mut String, run: &AnalysisRun) {
        let window = &run.probabilistic_insights.window;
        let previous_mean = (window.len() >= 2).then(|| window[window.len() - 2]);

        let _ = writeln!(out, "   {}", "Frequency:".bold());
        self.write_descriptive(out, &run.global_frequency_stats);
        if let Some(mean) = run.global_frequency_stats.mean {
            let delta = format_delta(previous_mean, mean);
            if !delta.is_empty() {
                let _ = writeln!(out, "   {}", delta.trim().dimmed());
            }
        }
        let _ = writeln!(out, "   {}", "Percentage change:".bold());
        self.write_descriptive(out, &run.global_percentage_stats);

        if self.verbose && !run.per_source_stats.is_empty() {
            let _ = writeln!(out, "   {}", "Per source:".bold());
            for (source, stats) in &run.per_source_stats {
                let _ = writeln!(
                    out,
                    "   {} n={} mean {} change {}",
                    source.dimmed(),
                    stats.frequency_stats.count,
                    fmt_opt(stats.frequency_stats.mean),
                    fmt_opt(stats.percentage_stats.mean)
                );
            }
        }
        let _ = writeln!(out);
    }

    fn write_descriptive(&self, out: &mut String, stats: &DescriptiveStats) {
        if stats.is_empty() {
            let _ = writeln!(out, "   {}", "no data".dimmed());
            return;
        }
        let _ = writeln!(
            out,
            "   n={} mean {} median {} sd {} min {} max {}",
            stats.count,
            fmt_opt(stats.mean),
            fmt_opt(stats.median),
            fmt_opt(stats.std_dev),
            fmt_opt(stats.min),
            fmt_opt(stats.max)
        );
    }

    fn write_phrases(&self, out: &mut String, run: &AnalysisRun) {
        if run.phrase_analysis.is_empty() {
            return;
        }
        let _ = writeln!(out, "   {}", "Top phrases:".bold());
        let shown = if self.verbose {
            run.phrase_analysis.len()
        } else {
            TOP_PHRASES_SHOWN
        };
        for record in run.phrase_analysis.iter().take(shown) {
            let _ = writeln!(
                out,
                "   {} {:>6.2}% {:>4}x {}",
                self.create_bar(record.global_probability_percent),
                record.global_probability_percent,
                record.global_count,
                record.phrase
            );
        }
        let hidden = run.phrase_analysis.len().saturating_sub(shown);
        if hidden > 0 {
            let _ = writeln!(
                out,
                "   {} {} more phrases (use --verbose to show)",
                "ℹ".blue(),
                hidden
            );
        }
        let _ = writeln!(out);
    }

    fn write_comparison(&self, out: &mut String, summary: &InferentialSummary) {
        let _ = writeln!(out, "   {}", "Comparison with previous run:".bold());
        if summary.previous_run_id.is_none() {
            let note = summary
                .notes
                .as_deref()
                .unwrap_or("no previous run to compare against");
            let _ = writeln!(out, "   {}", note.dimmed());
            let _ = writeln!(out);
            return;
        }
        let _ = writeln!(out, "   {}", summary.comparison_target.dimmed());
        let tests = [
            ("Mean (t-test)", &summary.global_frequency_mean_ttest),
            ("Variance (F-test)", &summary.global_frequency_variance_ftest),
            ("Phrases (chi-square)", &summary.phrase_distribution_chi2test),
        ];
        for (name, outcome) in tests {
            match outcome {
                Some(TestOutcome::Performed(result)) => {
                    let significant = result.interpretation.starts_with("significant");
                    let icon = if significant { "●".yellow() } else { "○".green() };
                    let _ = writeln!(
                        out,
                        "   {} {} stat {} p {} {}",
                        icon,
                        name,
                        result.statistic,
                        result.p_value,
                        result.interpretation.dimmed()
                    );
                }
                Some(TestOutcome::Skipped { notes }) => {
                    let _ = writeln!(out, "   {} {} {}", "-".dimmed(), name, notes.dimmed());
                }
                None => {}
            }
        }
        let _ = writeln!(out);
    }

    fn write_trend(&self, out: &mut String, insights: &ProbabilisticInsights) {
        let _ = writeln!(out, "   {}", "Trend:".bold());
        match insights.mean_frequency_trend.as_ref().and_then(TrendOutcome::fit) {
            Some(fit) => {
                let _ = writeln!(
                    out,
                    "   {} slope {} r² {} p {} next ≈ {}",
                    self.colorize_direction(fit.direction),
                    fit.slope,
                    fit.r_squared,
                    fit.p_value_for_slope,
                    fit.next_period_prediction
                );
                let _ = writeln!(
                    out,
                    "   up {}% / down {}% over {} runs",
                    fmt_opt(insights.prob_freq_increase_empiric_pct),
                    fmt_opt(insights.prob_freq_decrease_empiric_pct),
                    insights.window.len()
                );
            }
            None => {
                let note = insights.notes.as_deref().unwrap_or("no trend available");
                let _ = writeln!(out, "   {}", note.dimmed());
            }
        }
        let _ = writeln!(out);
    }

    fn colorize_direction(&self, direction: Direction) -> colored::ColoredString {
        let label = direction.to_string();
        match direction {
            Direction::Increasing => label.green(),
            Direction::Decreasing => label.red(),
            Direction::Stable => label.normal(),
        }
    }

    fn create_bar(&self, percent: f64) -> String {
        let width = 20usize;
        let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
        let bar = format!("{}{}", "█".repeat(filled), "░".repeat(width - filled));
        if self.use_colors {
            bar.cyan().to_string()
        } else {
            bar
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{run_analysis, Document, MemoryStore, RunStore};
    use serde_json::json;

    fn plain() -> ConsoleReporter {
        colored::control::set_override(false);
        ConsoleReporter::new().without_colors()
    }

    #[test]
    fn renders_first_run() {
        let mut store = MemoryStore::new();
        let docs = vec![Document::new("s", json!(["rates", "rates", "jobs"]))];
        let run = run_analysis(&mut store, &docs, "feed").unwrap();

        let text = plain().render(&run);
        assert!(text.contains("Phrase Frequency Analysis: feed"));
        assert!(text.contains("2x rates"));
        assert!(text.contains("no previous run to compare against"));
        assert!(text.contains("Not enough data points"));
    }

    #[test]
    fn renders_quiet_line() {
        let mut store = MemoryStore::new();
        let docs = vec![Document::new("s", json!("inflation"))];
        let run = run_analysis(&mut store, &docs, "feed").unwrap();
        assert_eq!(
            plain().render_quiet(&run),
            "feed: 1 documents, mean frequency 1 (no trend)"
        );
    }

    #[test]
    fn renders_empty_page() {
        let page = MemoryStore::new().page(1, 50).unwrap();
        let text = plain().render_page(&page);
        assert!(text.contains("Runs 0 of 0 (page 1/1)"));
        assert!(text.contains("No runs recorded."));
    }

    #[test]
    fn bar_width_is_fixed() {
        let r = plain();
        assert_eq!(r.create_bar(0.0).chars().count(), 20);
        assert_eq!(r.create_bar(100.0).chars().count(), 20);
        assert_eq!(r.create_bar(250.0), "█".repeat(20));
    }
}
