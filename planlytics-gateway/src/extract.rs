//! Row extraction from uploaded plan documents
//!
//! Text formats are split into rows locally. Binary formats have no local
//! extractor, so their row count is reported as unknown.

use planlytics_common::RowCount;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Text,
    Csv,
    Binary,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("txt") | Some("md") => DocumentKind::Text,
            Some("csv") => DocumentKind::Csv,
            _ => DocumentKind::Binary,
        }
    }
}

/// Rows pulled from one document
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub kind: DocumentKind,
    pub headers: Vec<String>,
    /// None when the format could not be read locally
    pub rows: Option<Vec<Vec<String>>>,
}

impl Extraction {
    pub fn row_count(&self) -> RowCount {
        match &self.rows {
            Some(rows) => RowCount::Known(rows.len() as u64),
            None => RowCount::Unknown,
        }
    }
}

/// Blocking; call from `spawn_blocking`
pub fn extract_rows(path: &Path) -> planlytics_common::Result<Extraction> {
    let kind = DocumentKind::from_path(path);
    match kind {
        DocumentKind::Text => {
            let bytes = std::fs::read(path)?;
            let text = String::from_utf8_lossy(&bytes);
            let rows = text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(|line| vec![line.to_string()])
                .collect();
            Ok(Extraction {
                kind,
                headers: vec!["line".to_string()],
                rows: Some(rows),
            })
        }
        DocumentKind::Csv => {
            let mut reader = csv::ReaderBuilder::new()
                .flexible(true)
                .from_path(path)
                .map_err(|e| planlytics_common::Error::InvalidInput(format!("Unreadable CSV: {}", e)))?;
            let headers = reader
                .headers()
                .map_err(|e| planlytics_common::Error::InvalidInput(format!("Unreadable CSV: {}", e)))?
                .iter()
                .map(str::to_string)
                .collect();
            let mut rows = Vec::new();
            for record in reader.records() {
                let record = record.map_err(|e| {
                    planlytics_common::Error::InvalidInput(format!("Unreadable CSV: {}", e))
                })?;
                if record.iter().all(|field| field.trim().is_empty()) {
                    continue;
                }
                rows.push(record.iter().map(str::to_string).collect());
            }
            Ok(Extraction {
                kind,
                headers,
                rows: Some(rows),
            })
        }
        DocumentKind::Binary => Ok(Extraction {
            kind,
            headers: Vec::new(),
            rows: None,
        }),
    }
}
