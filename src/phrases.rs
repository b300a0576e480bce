//! Phrase distribution - global and per-source phrase counts
//!
//! A phrase is one extracted string leaf, compared by exact equality.

use crate::extract::CorpusEntry;
use crate::stats::round_to;
use crate::{PhraseRecord, SourceDetail};
use std::collections::HashMap;

/// Phrase counts for one source
#[derive(Debug, Default)]
struct SourceTally {
    source: String,
    counts: HashMap<String, usize>,
    total: usize,
}

/// Per-invocation phrase counter. Remembers first-seen order of phrases and
/// sources so ties sort deterministically.
#[derive(Debug, Default)]
pub struct PhraseCounter {
    phrases: Vec<(String, usize)>,
    phrase_index: HashMap<String, usize>,
    sources: Vec<SourceTally>,
    source_index: HashMap<String, usize>,
    total: usize,
}

impl PhraseCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count every phrase of one document under `source`
    pub fn add(&mut self, source: &str, phrases: &[String]) {
        let tally_idx = match self.source_index.get(source) {
            Some(&i) => i,
            None => {
                self.sources.push(SourceTally {
                    source: source.to_string(),
                    ..SourceTally::default()
                });
                self.source_index
                    .insert(source.to_string(), self.sources.len() - 1);
                self.sources.len() - 1
            }
        };

        for phrase in phrases {
            match self.phrase_index.get(phrase) {
                Some(&i) => self.phrases[i].1 += 1,
                None => {
                    self.phrase_index.insert(phrase.clone(), self.phrases.len());
                    self.phrases.push((phrase.clone(), 1));
                }
            }
            let tally = &mut self.sources[tally_idx];
            *tally.counts.entry(phrase.clone()).or_insert(0) += 1;
            tally.total += 1;
        }
        self.total += phrases.len();
    }

    /// Total phrase occurrences counted so far
    pub fn total(&self) -> usize {
        self.total
    }

    /// Distinct phrases counted so far
    pub fn distinct(&self) -> usize {
        self.phrases.len()
    }

    /// Build records sorted by global count (highest first, ties in first-seen order)
    pub fn into_records(self) -> Vec<PhraseRecord> {
        let total = self.total;
        let mut records: Vec<PhraseRecord> = self
            .phrases
            .iter()
            .map(|(phrase, count)| {
                let mut details: Vec<SourceDetail> = self
                    .sources
                    .iter()
                    .filter_map(|tally| {
                        let c = *tally.counts.get(phrase)?;
                        Some(SourceDetail {
                            source: tally.source.clone(),
                            count_in_source: c,
                            percentage_in_source: percent(c, tally.total),
                        })
                    })
                    .collect();
                details.sort_by(|a, b| b.count_in_source.cmp(&a.count_in_source));

                PhraseRecord {
                    phrase: phrase.clone(),
                    global_count: *count,
                    global_probability_percent: percent(*count, total),
                    source_details: details,
                }
            })
            .collect();

        // Stable sort keeps first-seen order among equal counts
        records.sort_by(|a, b| b.global_count.cmp(&a.global_count));
        records
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round_to(part as f64 / whole as f64 * 100.0, 2)
}

/// Phrase profile of a whole corpus
pub fn analyze(corpus: &[CorpusEntry]) -> Vec<PhraseRecord> {
    let mut counter = PhraseCounter::new();
    for entry in corpus {
        counter.add(&entry.source, &entry.phrases);
    }
    counter.into_records()
}
