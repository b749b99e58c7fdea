// src/matching/normalize.rs - Canonicalizes raw sheet rows into scoring records
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::records::Record;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// A row as delivered by spreadsheet ingestion: header -> cell value.
///
/// Headers are matched loosely ("Meta Title", "meta-title" and
/// "meta_title" all resolve to the same field). Cells may be strings,
/// numbers, booleans or null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(pub Map<String, Value>);

impl RawRecord {
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                .collect(),
        )
    }

    fn field(&self, name: &str) -> String {
        self.0
            .iter()
            .find(|(key, _)| canonical_header(key) == name)
            .map(|(_, value)| cell_to_string(value))
            .unwrap_or_default()
    }
}

fn canonical_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

fn cell_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Trims and collapses internal whitespace.
pub fn clean_text(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text.trim(), " ").into_owned()
}

/// Trims whitespace and surrounding path separators.
pub fn clean_raw_slug(slug: &str) -> String {
    slug.trim().trim_matches('/').trim().to_string()
}

/// Builds a [`Record`] from a raw row. Never fails: absent or
/// non-textual cells become empty strings.
pub fn normalize(raw: &RawRecord) -> Record {
    Record {
        url: raw.field("url").trim().to_string(),
        slug: clean_raw_slug(&raw.field("slug")),
        meta_title: clean_text(&raw.field("meta_title")),
        meta_description: clean_text(&raw.field("meta_description")),
        h1: clean_text(&raw.field("h1")),
    }
}

pub fn normalize_rows(rows: &[RawRecord]) -> Vec<Record> {
    rows.iter().map(normalize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_fields_become_empty() {
        let record = normalize(&RawRecord::default());
        assert_eq!(record, Record::default());
    }

    #[test]
    fn test_trims_and_collapses() {
        let raw = RawRecord::from_pairs(&[
            ("url", "  https://loja.com/blusa-azul  "),
            ("slug", " /blusa-azul/ "),
            ("meta_title", "  Blusa \t Azul\n"),
            ("meta_description", "Blusa   de algodão"),
            ("h1", "Blusa"),
        ]);
        let record = normalize(&raw);
        assert_eq!(record.url, "https://loja.com/blusa-azul");
        assert_eq!(record.slug, "blusa-azul");
        assert_eq!(record.meta_title, "Blusa Azul");
        assert_eq!(record.meta_description, "Blusa de algodão");
        assert_eq!(record.h1, "Blusa");
    }

    #[test]
    fn test_loose_headers_and_non_string_cells() {
        let raw: RawRecord = serde_json::from_value(json!({
            "URL": "/p/123",
            "Slug": 123,
            "Meta Title": null,
            "meta-description": true,
            " H1 ": ["ignored"]
        }))
        .unwrap();
        let record = normalize(&raw);
        assert_eq!(record.url, "/p/123");
        assert_eq!(record.slug, "123");
        assert_eq!(record.meta_title, "");
        assert_eq!(record.meta_description, "true");
        assert_eq!(record.h1, "");
    }

    #[test]
    fn test_normalize_rows_keeps_order() {
        let rows = vec![
            RawRecord::from_pairs(&[("url", "/a")]),
            RawRecord::from_pairs(&[("url", "/b")]),
        ];
        let urls: Vec<String> = normalize_rows(&rows).into_iter().map(|r| r.url).collect();
        assert_eq!(urls, vec!["/a", "/b"]);
    }
}
