// src/utils/input.rs - Loads DE / RASTREIO rows exported from the workbook
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::matching::normalize::RawRecord;

/// A whole workbook export: one array of rows per sheet.
#[derive(Debug, Deserialize)]
struct WorkbookExport {
    #[serde(alias = "de", alias = "De")]
    #[serde(rename = "DE")]
    de: Vec<RawRecord>,
    #[serde(alias = "rastreio", alias = "Rastreio")]
    #[serde(rename = "RASTREIO")]
    rastreio: Vec<RawRecord>,
}

/// Reads a JSON array of rows.
pub fn load_rows(path: &Path) -> Result<Vec<RawRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read rows from {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of rows", path.display()))
}

/// Reads `{"DE": [...], "RASTREIO": [...]}`.
pub fn load_workbook(path: &Path) -> Result<(Vec<RawRecord>, Vec<RawRecord>)> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read workbook from {}", path.display()))?;
    let workbook: WorkbookExport = serde_json::from_str(&raw)
        .with_context(|| format!("{} is missing the DE or RASTREIO sheet", path.display()))?;
    Ok((workbook.de, workbook.rastreio))
}

/// Parses a comma-separated weight list such as `0.4,0.25,0.2,0.15`.
pub fn parse_weights(raw: &str) -> Result<Vec<f64>> {
    let weights = raw
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .with_context(|| format!("Invalid weight '{}'", part.trim()))
        })
        .collect::<Result<Vec<_>>>()?;
    if weights.len() != 4 {
        bail!("Expected 4 comma-separated weights, got {}", weights.len());
    }
    Ok(weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_rows() {
        let file = write_temp(r#"[{"url": "/a", "slug": "blusa-azul"}, {"url": "/b"}]"#);
        let rows = load_rows(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0["slug"], "blusa-azul");
    }

    #[test]
    fn test_load_rows_rejects_object() {
        let file = write_temp(r#"{"url": "/a"}"#);
        assert!(load_rows(file.path()).is_err());
    }

    #[test]
    fn test_load_workbook() {
        let file = write_temp(r#"{"DE": [{"url": "/a"}], "rastreio": [{"url": "/b"}, {"url": "/c"}]}"#);
        let (de, rast) = load_workbook(file.path()).unwrap();
        assert_eq!(de.len(), 1);
        assert_eq!(rast.len(), 2);
    }

    #[test]
    fn test_missing_file() {
        let err = load_rows(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read rows"));
    }

    #[test]
    fn test_parse_weights() {
        assert_eq!(parse_weights("0.4, 0.25,0.2 ,0.15").unwrap(), vec![0.4, 0.25, 0.2, 0.15]);
        assert!(parse_weights("0.4,0.6").is_err());
        assert!(parse_weights("0.4,abc,0.2,0.1").is_err());
    }
}
