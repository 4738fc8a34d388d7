//! Export artifacts written after analysis

use crate::extract::Extraction;
use chrono::Utc;
use serde_json::json;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ExportPaths {
    pub csv: PathBuf,
    pub json: PathBuf,
}

impl ExportPaths {
    pub fn csv_name(&self) -> String {
        file_name(&self.csv)
    }

    pub fn json_name(&self) -> String {
        file_name(&self.json)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Write `<stem>.csv` and `<stem>.json` into `outputs_dir`, replacing any
/// previous run for the same upload
pub fn write_exports(
    outputs_dir: &Path,
    stored_name: &str,
    extraction: &Extraction,
) -> planlytics_common::Result<ExportPaths> {
    std::fs::create_dir_all(outputs_dir)?;
    let stem = Path::new(stored_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| stored_name.to_string());

    let paths = ExportPaths {
        csv: outputs_dir.join(format!("{}.csv", stem)),
        json: outputs_dir.join(format!("{}.json", stem)),
    };

    write_csv(&paths.csv, extraction)
        .map_err(|e| planlytics_common::Error::Internal(format!("CSV export failed: {}", e)))?;

    let summary = json!({
        "source": stored_name,
        "kind": format!("{:?}", extraction.kind).to_lowercase(),
        "rows": extraction.row_count(),
        "columns": extraction.headers,
        "generated_at": Utc::now().to_rfc3339(),
    });
    std::fs::write(&paths.json, serde_json::to_vec_pretty(&summary)?)?;

    Ok(paths)
}

fn write_csv(path: &Path, extraction: &Extraction) -> Result<(), csv::Error> {
    // Ragged source rows are kept as-is
    let mut writer = csv::WriterBuilder::new().flexible(true).from_path(path)?;
    if !extraction.headers.is_empty() {
        writer.write_record(&extraction.headers)?;
    }
    for row in extraction.rows.iter().flatten() {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}
