//! Configuration loading and root folder resolution
//!
//! Resolution priority for every setting (highest first):
//! 1. Command-line argument (clap, which also reads the matching env var)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default
//!
//! A missing or broken TOML file never aborts startup: it is logged and the
//! compiled defaults are used instead.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "PLANLYTICS_ROOT_FOLDER";
/// Environment variable overriding the LLM API key
pub const LLM_API_KEY_ENV: &str = "PLANLYTICS_LLM_API_KEY";
/// Gateway URL used when nothing else is configured
pub const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:8080";

const UPLOADS_DIR: &str = "uploads";
const OUTPUTS_DIR: &str = "outputs";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct TomlConfig {
    /// Root folder holding `uploads/` and `outputs/`
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Base URL of the analysis gateway (client only)
    #[serde(default)]
    pub gateway_url: Option<String>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub upload: UploadConfig,

    #[serde(default)]
    pub llm: LlmConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Upload limits enforced by the gateway
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct UploadConfig {
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,

    /// Lowercase extensions including the leading dot
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_upload_mb: default_max_upload_mb(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

impl UploadConfig {
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

/// LLM backend selection for the agent/homechat proxies
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LlmConfig {
    /// "ollama", "openai" or "anthropic"
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// Overrides the provider's default base URL
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    /// Prefer `PLANLYTICS_LLM_API_KEY` over storing the key here
    #[serde(default)]
    pub api_key: Option<String>,

    /// Gateway-wide quota for the chat endpoints
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            base_url: None,
            model: None,
            api_key: None,
            requests_per_minute: default_requests_per_minute(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_upload_mb() -> u64 {
    50
}

fn default_allowed_extensions() -> Vec<String> {
    [".pdf", ".docx", ".txt", ".csv", ".md"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_llm_provider() -> String {
    "ollama".to_string()
}

fn default_requests_per_minute() -> u32 {
    10
}

/// Default config file location for the platform, if one exists on disk
///
/// Linux checks `~/.config/planlytics/config.toml` then
/// `/etc/planlytics/config.toml`; other platforms only the user config dir.
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("planlytics").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/planlytics/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Read and parse a TOML config file
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// No config file exists at the default locations
    Defaults,
    File(PathBuf),
    /// A config file was found but could not be used
    Fallback { path: PathBuf, reason: String },
}

/// Configuration plus its provenance
///
/// Loading happens before the tracing subscriber exists, so the outcome is
/// kept here and reported by [`LoadedConfig::log_source`] once logging is up.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: TomlConfig,
    pub source: ConfigSource,
}

impl LoadedConfig {
    pub fn log_source(&self) {
        match &self.source {
            ConfigSource::Defaults => debug!("No config file found, using compiled defaults"),
            ConfigSource::File(path) => info!("Loaded config from {}", path.display()),
            ConfigSource::Fallback { reason, .. } => {
                warn!("{} - using compiled defaults", reason)
            }
        }
    }
}

/// Load configuration with graceful degradation
///
/// `explicit` is the `--config` argument; when absent the platform default
/// location is tried. Any failure yields `TomlConfig::default()`.
pub fn load_toml_config(explicit: Option<&Path>) -> LoadedConfig {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) => path,
            None => {
                return LoadedConfig {
                    config: TomlConfig::default(),
                    source: ConfigSource::Defaults,
                };
            }
        },
    };

    match read_toml_config(&path) {
        Ok(config) => LoadedConfig {
            config,
            source: ConfigSource::File(path),
        },
        Err(e) => LoadedConfig {
            config: TomlConfig::default(),
            source: ConfigSource::Fallback {
                path,
                reason: e.to_string(),
            },
        },
    }
}

/// Serialize a config back to disk
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize config failed: {}", e)))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("planlytics"))
        .unwrap_or_else(|| PathBuf::from("./planlytics_data"))
}

/// Resolves the root folder following the priority order above
pub struct RootFolderResolver {
    module_name: String,
}

impl RootFolderResolver {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
        }
    }

    pub fn resolve(&self, cli_arg: Option<&Path>, toml: &TomlConfig) -> PathBuf {
        if let Some(path) = cli_arg {
            debug!(module = %self.module_name, "Root folder from command line");
            return path.to_path_buf();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                debug!(module = %self.module_name, "Root folder from {}", ROOT_FOLDER_ENV);
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &toml.root_folder {
            debug!(module = %self.module_name, "Root folder from TOML config");
            return path.clone();
        }

        default_root_folder()
    }
}

/// Creates the root folder layout on first start
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create root, `uploads/` and `outputs/` if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        for dir in [self.root_folder.clone(), self.uploads_dir(), self.outputs_dir()] {
            if !dir.exists() {
                std::fs::create_dir_all(&dir)?;
                info!("Created directory: {}", dir.display());
            }
        }
        Ok(())
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root_folder.join(UPLOADS_DIR)
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.root_folder.join(OUTPUTS_DIR)
    }
}

/// Gateway URL: CLI/env value, then TOML, then the compiled default
pub fn resolve_gateway_url(cli_or_env: Option<&str>, toml: &TomlConfig) -> String {
    cli_or_env
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .or_else(|| toml.gateway_url.clone())
        .unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string())
        .trim_end_matches('/')
        .to_string()
}

/// LLM API key: environment first, then TOML
pub fn resolve_llm_api_key(toml: &TomlConfig) -> Option<String> {
    let env_key = std::env::var(LLM_API_KEY_ENV).ok();
    let toml_key = toml.llm.api_key.clone();

    if env_key.as_deref().is_some_and(is_valid_key) && toml_key.as_deref().is_some_and(is_valid_key) {
        warn!("LLM API key found in both environment and TOML. Using environment.");
    }

    env_key
        .filter(|k| is_valid_key(k))
        .or_else(|| toml_key.filter(|k| is_valid_key(k)))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
