//! Text extraction - flatten JSON content into its string leaves

use crate::Document;
use rayon::prelude::*;
use serde_json::Value;

/// Extracted text for one document
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusEntry {
    pub source: String,
    /// Every string leaf, in document order
    pub phrases: Vec<String>,
    /// Phrases joined with single spaces
    pub text: String,
}

/// Collect every string leaf of `content`, objects by key order and arrays by index.
/// Numbers, booleans and nulls are skipped. Duplicates are kept.
pub fn extract(content: &Value) -> Vec<String> {
    let mut out = Vec::new();
    visit(content, &mut out);
    out
}

fn visit(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|item| visit(item, out)),
        Value::Object(map) => map.values().for_each(|item| visit(item, out)),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// Space-join extracted phrases into one document text
pub fn corpus_text(phrases: &[String]) -> String {
    phrases.join(" ")
}

/// Build one corpus entry per document, preserving order.
///
/// Documents are independent, so extraction runs in parallel.
pub fn build_corpus(documents: &[Document]) -> Vec<CorpusEntry> {
    documents
        .par_iter()
        .map(|doc| {
            let phrases = extract(&doc.content);
            let text = corpus_text(&phrases);
            CorpusEntry {
                source: doc.source.clone(),
                phrases,
                text,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_flat_object() {
        let v = json!({"title": "Rates hold", "body": "Markets calm"});
        assert_eq!(extract(&v), vec!["Rates hold", "Markets calm"]);
    }

    #[test]
    fn extract_skips_non_string_scalars() {
        let v = json!({"a": 1, "b": true, "c": null, "d": 2.5, "e": "kept"});
        assert_eq!(extract(&v), vec!["kept"]);
    }

    #[test]
    fn extract_deep_mixed_nesting() {
        let v = json!({
            "l1": {
                "l2": [
                    {"l3": {"l4": [["deep", {"l5": "deeper"}]]}},
                    "side"
                ]
            },
            "tail": ["x", ["y", ["z"]]]
        });
        assert_eq!(extract(&v), vec!["deep", "deeper", "side", "x", "y", "z"]);
    }

    #[test]
    fn extract_keeps_duplicates() {
        let v = json!(["inflation", "inflation", {"k": "inflation"}]);
        assert_eq!(extract(&v).len(), 3);
    }

    #[test]
    fn extract_empty_containers_and_top_level_scalars() {
        assert!(extract(&json!({})).is_empty());
        assert!(extract(&json!([])).is_empty());
        assert!(extract(&json!({"a": [], "b": {}})).is_empty());
        assert!(extract(&json!(42)).is_empty());
        assert_eq!(extract(&json!("solo")), vec!["solo"]);
    }

    #[test]
    fn extract_preserves_key_order() {
        let v: Value = serde_json::from_str(r#"{"z": "first", "a": "second"}"#).unwrap();
        assert_eq!(extract(&v), vec!["first", "second"]);
    }

    #[test]
    fn build_corpus_is_one_to_one_and_ordered() {
        let docs: Vec<Document> = (0..25)
            .map(|i| Document::new(format!("s{}", i), json!({"t": format!("doc {}", i)})))
            .collect();
        let corpus = build_corpus(&docs);
        assert_eq!(corpus.len(), 25);
        for (i, entry) in corpus.iter().enumerate() {
            assert_eq!(entry.source, format!("s{}", i));
            assert_eq!(entry.text, format!("doc {}", i));
        }
    }

    #[test]
    fn corpus_text_joins_with_spaces() {
        let phrases = vec!["a b".to_string(), "c".to_string()];
        assert_eq!(corpus_text(&phrases), "a b c");
        assert_eq!(corpus_text(&[]), "");
    }
}
