//! Run history - append-only store of analysis runs (.trendscope-history.jsonl)

use crate::error::StoreError;
use crate::AnalysisRun;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const HISTORY_FILENAME: &str = ".trendscope-history.jsonl";
pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 1000;

/// One page of runs, newest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunPage {
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub runs: Vec<AnalysisRun>,
}

impl RunPage {
    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(self.page_size.max(1))
    }
}

/// Append-only run storage queried by recency.
///
/// Implementors provide `load` (insertion order) and `append`; ordering,
/// paging and score lookups are derived from them.
pub trait RunStore {
    /// Every stored run in insertion order
    fn load(&self) -> Result<Vec<AnalysisRun>, StoreError>;

    fn append(&mut self, run: AnalysisRun) -> Result<(), StoreError>;

    /// Up to `limit` runs, newest first
    fn recent(&self, limit: usize) -> Result<Vec<AnalysisRun>, StoreError> {
        let mut runs = newest_first(self.load()?);
        runs.truncate(limit);
        Ok(runs)
    }

    /// 1-based page of runs, newest first. Page 0 reads as page 1 and the
    /// page size is clamped to `1..=MAX_PAGE_SIZE`.
    fn page(&self, page: usize, page_size: usize) -> Result<RunPage, StoreError> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let runs = newest_first(self.load()?);
        let total = runs.len();
        let runs = runs
            .into_iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .collect();
        Ok(RunPage {
            page,
            page_size,
            total,
            runs,
        })
    }

    /// Most recent score recorded for `source`
    fn last_frequency_for(&self, source: &str) -> Result<Option<f64>, StoreError> {
        Ok(newest_first(self.load()?)
            .iter()
            .find_map(|run| run.frequency_for(source)))
    }

    /// Most recent score of each source in `sources`, reading history once.
    /// Sources never seen before are absent from the map.
    fn last_frequencies(&self, sources: &[&str]) -> Result<HashMap<String, f64>, StoreError> {
        let runs = newest_first(self.load()?);
        let mut found = HashMap::new();
        for source in sources {
            if found.contains_key(*source) {
                continue;
            }
            if let Some(freq) = runs.iter().find_map(|run| run.frequency_for(source)) {
                found.insert(source.to_string(), freq);
            }
        }
        Ok(found)
    }
}

/// Sort by `created_at` descending; equal timestamps put the later insertion first
pub fn newest_first(mut runs: Vec<AnalysisRun>) -> Vec<AnalysisRun> {
    runs.reverse();
    runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    runs
}

/// In-process store
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    runs: Vec<AnalysisRun>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

impl RunStore for MemoryStore {
    fn load(&self) -> Result<Vec<AnalysisRun>, StoreError> {
        Ok(self.runs.clone())
    }

    fn append(&mut self, run: AnalysisRun) -> Result<(), StoreError> {
        self.runs.push(run);
        Ok(())
    }
}

/// Store backed by one JSON Lines file: one compact run per line, in
/// insertion order.
///
/// Every append is a single write of one complete line through an
/// append-mode handle, so concurrent writers each land their own run and
/// nothing already on disk is rewritten. A trailing line without its
/// newline is a run still being written and is not read yet.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default file name inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(HISTORY_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn read_raw(&self) -> Result<Vec<u8>, StoreError> {
        match fs::read(&self.path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(source) => Err(self.io_err(source)),
        }
    }

    /// Read every complete run. A missing file is an empty history.
    pub fn read(&self) -> Result<Vec<AnalysisRun>, StoreError> {
        parse_lines(&self.path, &self.read_raw()?)
    }
}

/// Every serialized run starts with its id
const RECORD_START: &[u8] = b"{\"id\":";

fn parse_lines(path: &Path, content: &[u8]) -> Result<Vec<AnalysisRun>, StoreError> {
    let (complete, pending) = match content.iter().rposition(|b| *b == b'\n') {
        Some(end) => content.split_at(end + 1),
        None => (&[][..], content),
    };

    let corrupt = |line: usize, details: String| StoreError::Corrupt {
        path: path.to_path_buf(),
        details: format!("line {}: {}", line, details),
    };
    let complete = std::str::from_utf8(complete).map_err(|e| StoreError::Corrupt {
        path: path.to_path_buf(),
        details: e.to_string(),
    })?;

    let mut runs = Vec::new();
    for (index, line) in complete.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let run = serde_json::from_str(line).map_err(|e| corrupt(index + 1, e.to_string()))?;
        runs.push(run);
    }

    let pending = pending.trim_ascii();
    if !pending.is_empty() {
        let in_flight = pending.starts_with(RECORD_START) || RECORD_START.starts_with(pending);
        if !in_flight {
            return Err(corrupt(complete.lines().count() + 1, "unterminated line".to_string()));
        }
        tracing::debug!(path = %path.display(), "skipping run still being written");
    }
    Ok(runs)
}

impl RunStore for JsonFileStore {
    fn load(&self) -> Result<Vec<AnalysisRun>, StoreError> {
        self.read()
    }

    /// Append one line. A corrupt history is reported and left as it is.
    fn append(&mut self, run: AnalysisRun) -> Result<(), StoreError> {
        let existing = self.read_raw()?;
        parse_lines(&self.path, &existing)?;

        // a torn tail is closed off rather than glued onto this run
        let mut line = if existing.is_empty() || existing.ends_with(b"\n") {
            String::new()
        } else {
            String::from("\n")
        };
        line.push_str(&serde_json::to_string(&run)?);
        line.push('\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_err(e))?;
        file.write_all(line.as_bytes()).map_err(|e| self.io_err(e))
    }
}

/// Format the change of a value for console: "[was 1.2, up 0.3]", "[was 1.2, down 0.1]",
/// "[unchanged at 1.2]" or "" without a previous value
pub fn format_delta(previous: Option<f64>, current: f64) -> String {
    let Some(prev) = previous else {
        return String::new();
    };
    let diff = current - prev;
    if diff.abs() < 1e-9 {
        return format!(" [unchanged at {}]", current);
    }
    if diff > 0.0 {
        format!(" [was {}, up {:.4}]", prev, diff)
    } else {
        format!(" [was {}, down {:.4}]", prev, -diff)
    }
}
