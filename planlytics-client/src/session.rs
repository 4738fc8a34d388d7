//! Upload session and analysis result

use crate::cache_bust::CacheBuster;
use planlytics_common::api::AnalyzeResponse;
use planlytics_common::RowCount;
use serde::Serialize;
use std::fmt;

/// A file the gateway has accepted
///
/// Lives only in controller memory; discarded when a new upload starts or
/// the controller is reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadSession {
    /// Opaque token issued by the gateway
    pub file_reference: String,
    pub original_filename: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Xlsx,
    Json,
}

impl ExportFormat {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "csv" => Some(ExportFormat::Csv),
            "xlsx" => Some(ExportFormat::Xlsx),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Csv => f.write_str("CSV"),
            ExportFormat::Xlsx => f.write_str("Excel"),
            ExportFormat::Json => f.write_str("JSON"),
        }
    }
}

/// One export artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportLink {
    pub format: ExportFormat,
    /// URL exactly as the gateway returned it
    pub url: String,
    /// `url` with the cache-busting parameter appended
    pub href: String,
}

impl ExportLink {
    /// Last path segment of `url`, without query or fragment
    pub fn file_name(&self) -> Option<&str> {
        let path = self.url.split(['?', '#']).next().unwrap_or_default();
        path.rsplit('/').next().filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    pub rows_extracted: RowCount,
    /// Ordered CSV, XLSX, JSON; absent formats are skipped
    pub export_links: Vec<ExportLink>,
}

impl AnalysisResult {
    pub fn from_response(response: &AnalyzeResponse, buster: &mut CacheBuster) -> Self {
        let export_links = response
            .export_urls()
            .into_iter()
            .filter_map(|(key, url)| {
                ExportFormat::from_key(key).map(|format| ExportLink {
                    format,
                    url: url.to_string(),
                    href: buster.bust(url),
                })
            })
            .collect();

        Self {
            rows_extracted: response.rows,
            export_links,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(csv: Option<&str>, xlsx: Option<&str>) -> AnalyzeResponse {
        AnalyzeResponse {
            filename: Some("plan.pdf".into()),
            rows: RowCount::Known(42),
            download_url_csv: csv.map(str::to_string),
            download_url_xlsx: xlsx.map(str::to_string),
            download_url_json: None,
        }
    }

    #[test]
    fn test_links_follow_response_order() {
        let mut buster = CacheBuster::new();
        let result = AnalysisResult::from_response(
            &response(Some("/files/plan.csv"), Some("/files/plan.xlsx")),
            &mut buster,
        );

        assert_eq!(result.rows_extracted, RowCount::Known(42));
        assert_eq!(result.export_links.len(), 2);
        assert_eq!(result.export_links[0].format, ExportFormat::Csv);
        assert_eq!(result.export_links[0].url, "/files/plan.csv");
        assert!(result.export_links[0].href.starts_with("/files/plan.csv?t="));
        assert_eq!(result.export_links[1].format, ExportFormat::Xlsx);
    }

    #[test]
    fn test_file_name() {
        let link = ExportLink {
            format: ExportFormat::Csv,
            url: "/files/abc__plan.csv?x=1".into(),
            href: String::new(),
        };
        assert_eq!(link.file_name(), Some("abc__plan.csv"));

        let bare = ExportLink {
            format: ExportFormat::Csv,
            url: "/files/".into(),
            href: String::new(),
        };
        assert_eq!(bare.file_name(), None);
    }
}
