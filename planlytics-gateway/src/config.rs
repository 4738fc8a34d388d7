//! Runtime configuration for planlytics-gateway

use planlytics_common::config::{RootFolderInitializer, TomlConfig};
use std::num::NonZeroU32;
use std::path::PathBuf;

/// Resolved gateway settings
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Where uploads are stored under their session token
    pub uploads_dir: PathBuf,
    /// Export artifacts, served under `/files`
    pub outputs_dir: PathBuf,
    pub max_upload_bytes: u64,
    /// Lowercase, with leading dot
    pub allowed_extensions: Vec<String>,
    pub chat_requests_per_minute: NonZeroU32,
}

impl GatewayConfig {
    pub fn from_root(root: &RootFolderInitializer, toml: &TomlConfig) -> Self {
        Self {
            uploads_dir: root.uploads_dir(),
            outputs_dir: root.outputs_dir(),
            max_upload_bytes: toml.upload.max_upload_bytes(),
            allowed_extensions: toml
                .upload
                .allowed_extensions
                .iter()
                .map(|ext| normalize_extension(ext))
                .collect(),
            chat_requests_per_minute: NonZeroU32::new(toml.llm.requests_per_minute)
                .unwrap_or(NonZeroU32::MIN),
        }
    }

    pub fn is_allowed_extension(&self, ext: &str) -> bool {
        let ext = normalize_extension(ext);
        self.allowed_extensions.iter().any(|allowed| *allowed == ext)
    }
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_ascii_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_root_normalizes_extensions() {
        let mut toml = TomlConfig::default();
        toml.upload.allowed_extensions = vec!["PDF".into(), ".Txt".into()];
        toml.llm.requests_per_minute = 0;

        let root = RootFolderInitializer::new(PathBuf::from("/srv/planlytics"));
        let config = GatewayConfig::from_root(&root, &toml);

        assert_eq!(config.uploads_dir, PathBuf::from("/srv/planlytics/uploads"));
        assert_eq!(config.outputs_dir, PathBuf::from("/srv/planlytics/outputs"));
        assert!(config.is_allowed_extension(".pdf"));
        assert!(config.is_allowed_extension("TXT"));
        assert!(!config.is_allowed_extension(".exe"));
        assert_eq!(config.chat_requests_per_minute.get(), 1);
    }
}
