//! Document source - reads pages of records from JSON files
//!
//! A page is either a JSON array of records or a `{ "results": [...] }`
//! envelope. Each record is `{source, content, frequency?, percentage?}`.

use crate::config::is_ignored;
use crate::error::AnalysisError;
use crate::Document;
use anyhow::{Context, Result};
use globset::GlobSet;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Validate one page and turn its records into documents
pub fn parse_page(page: &Value) -> Result<Vec<Document>, AnalysisError> {
    let records = match page {
        Value::Array(records) => records,
        Value::Object(obj) => match obj.get("results") {
            Some(Value::Array(records)) => records,
            _ => {
                return Err(AnalysisError::InvalidBatch(
                    "page object has no \"results\" array".to_string(),
                ))
            }
        },
        _ => {
            return Err(AnalysisError::InvalidBatch(
                "page is neither an array nor a {\"results\": [...]} envelope".to_string(),
            ))
        }
    };

    records
        .iter()
        .enumerate()
        .map(|(i, record)| parse_record(i, record))
        .collect()
}

fn parse_record(index: usize, record: &Value) -> Result<Document, AnalysisError> {
    let Value::Object(obj) = record else {
        return Err(AnalysisError::InvalidBatch(format!(
            "record {} is not an object",
            index
        )));
    };
    let source = match obj.get("source") {
        Some(Value::String(s)) => s.clone(),
        Some(_) => {
            return Err(AnalysisError::InvalidBatch(format!(
                "record {}: \"source\" is not a string",
                index
            )))
        }
        None => {
            return Err(AnalysisError::InvalidBatch(format!(
                "record {}: missing \"source\"",
                index
            )))
        }
    };
    let content = obj.get("content").cloned().unwrap_or(Value::Null);

    Ok(Document::new(source, content).with_supplied(
        supplied_number(obj, index, "frequency"),
        supplied_number(obj, index, "percentage"),
    ))
}

/// Numbers and numeric strings are accepted; anything else is dropped with a warning
fn supplied_number(obj: &Map<String, Value>, index: usize, key: &str) -> Option<f64> {
    match obj.get(key)? {
        Value::Null => None,
        Value::Number(n) => n.as_f64(),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Some(v),
            _ => {
                tracing::warn!(record = index, field = key, value = %s, "ignoring non-numeric value");
                None
            }
        },
        other => {
            tracing::warn!(record = index, field = key, value = %other, "ignoring non-numeric value");
            None
        }
    }
}

/// Page files under `path`: the file itself, or every `*.json` below a
/// directory in sorted order. Hidden files and ignored paths are skipped.
pub fn page_files(path: &Path, ignore: Option<&GlobSet>) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.exists() {
        anyhow::bail!("Path does not exist: {}", path.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()))
    {
        // a page that cannot be reached fails the batch rather than shrinking it
        let entry =
            entry.with_context(|| format!("Failed to read page directory: {}", path.display()))?;
        let file_path = entry.path();
        let is_json = file_path.extension().and_then(|e| e.to_str()) == Some("json");
        if !entry.file_type().is_file() || !is_json {
            continue;
        }
        if let Some(set) = ignore {
            let relative = file_path.strip_prefix(path).unwrap_or(file_path);
            if is_ignored(relative, set) || is_ignored(file_path, set) {
                tracing::debug!(path = %file_path.display(), "ignored page file");
                continue;
            }
        }
        files.push(file_path.to_path_buf());
    }
    files.sort();
    Ok(files)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// Load every document from a page file or a directory of page files
pub fn load_documents(path: &Path, ignore: Option<&GlobSet>) -> Result<Vec<Document>> {
    let mut documents = Vec::new();
    for file in page_files(path, ignore)? {
        let content = fs::read_to_string(&file)
            .with_context(|| format!("Failed to read page: {}", file.display()))?;
        let page: Value = serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in page: {}", file.display()))?;
        let records =
            parse_page(&page).with_context(|| format!("Invalid page: {}", file.display()))?;
        tracing::debug!(path = %file.display(), records = records.len(), "loaded page");
        documents.extend(records);
    }
    Ok(documents)
}
