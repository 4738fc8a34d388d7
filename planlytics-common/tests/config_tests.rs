//! Configuration resolution and graceful degradation tests
//!
//! Tests that touch PLANLYTICS_* environment variables are marked #[serial]
//! so they never race each other.

use planlytics_common::config::{
    default_root_folder, load_toml_config, read_toml_config, resolve_gateway_url,
    resolve_llm_api_key, write_toml_config, RootFolderInitializer, RootFolderResolver,
    ConfigSource, TomlConfig, DEFAULT_GATEWAY_URL, LLM_API_KEY_ENV, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let resolver = RootFolderResolver::new("test-module");
    let root = resolver.resolve(None, &TomlConfig::default());

    assert_eq!(root, default_root_folder());
    assert!(!root.as_os_str().is_empty());
}

#[test]
#[serial]
fn test_resolver_priority_order() {
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/planlytics-from-toml")),
        ..Default::default()
    };
    let resolver = RootFolderResolver::new("test-module");

    env::remove_var(ROOT_FOLDER_ENV);
    assert_eq!(
        resolver.resolve(None, &toml),
        PathBuf::from("/tmp/planlytics-from-toml")
    );

    env::set_var(ROOT_FOLDER_ENV, "/tmp/planlytics-from-env");
    assert_eq!(
        resolver.resolve(None, &toml),
        PathBuf::from("/tmp/planlytics-from-env")
    );

    let cli = Path::new("/tmp/planlytics-from-cli");
    assert_eq!(resolver.resolve(Some(cli), &toml), cli.to_path_buf());

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
fn test_initializer_creates_layout() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("nested").join("root");

    let initializer = RootFolderInitializer::new(root.clone());
    initializer.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    assert!(initializer.uploads_dir().is_dir());
    assert!(initializer.outputs_dir().is_dir());
    assert_eq!(initializer.uploads_dir(), root.join("uploads"));

    // Second call is a no-op
    initializer.ensure_directory_exists().unwrap();
}

#[test]
fn test_missing_config_file_falls_back_to_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("absent.toml");
    let loaded = load_toml_config(Some(&path));
    assert_eq!(loaded.config, TomlConfig::default());
    match loaded.source {
        ConfigSource::Fallback { path: failed, reason } => {
            assert_eq!(failed, path);
            assert!(reason.contains("absent.toml"));
        }
        other => panic!("expected fallback, got {:?}", other),
    }
}

#[test]
fn test_broken_config_file_falls_back_to_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(&path, "root_folder = [not toml").unwrap();

    assert!(read_toml_config(&path).is_err());
    let loaded = load_toml_config(Some(&path));
    assert_eq!(loaded.config, TomlConfig::default());
    assert!(matches!(
        loaded.source,
        ConfigSource::Fallback { ref reason, .. } if reason.starts_with("Configuration error: Parse")
    ));
}

#[test]
fn test_partial_config_keeps_defaults_for_missing_sections() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
gateway_url = "http://gateway.local:9000"

[upload]
max_upload_mb = 5

[llm]
provider = "anthropic"
"#,
    )
    .unwrap();

    let config = read_toml_config(&path).unwrap();
    assert_eq!(config.gateway_url.as_deref(), Some("http://gateway.local:9000"));
    assert_eq!(config.upload.max_upload_mb, 5);
    assert_eq!(config.upload.max_upload_bytes(), 5 * 1024 * 1024);
    assert!(config.upload.allowed_extensions.contains(&".pdf".to_string()));
    assert_eq!(config.llm.provider, "anthropic");
    assert_eq!(config.llm.requests_per_minute, 10);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_write_then_read_config() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("sub").join("config.toml");

    let mut config = TomlConfig::default();
    config.root_folder = Some(PathBuf::from("/srv/planlytics"));
    config.llm.model = Some("llama3".into());

    write_toml_config(&config, &path).unwrap();
    assert_eq!(read_toml_config(&path).unwrap(), config);
}

#[test]
fn test_gateway_url_resolution() {
    let toml = TomlConfig {
        gateway_url: Some("http://toml-host:1234/".into()),
        ..Default::default()
    };

    assert_eq!(
        resolve_gateway_url(Some("http://cli-host:1/"), &toml),
        "http://cli-host:1"
    );
    assert_eq!(resolve_gateway_url(Some("  "), &toml), "http://toml-host:1234");
    assert_eq!(
        resolve_gateway_url(None, &TomlConfig::default()),
        DEFAULT_GATEWAY_URL
    );
}

#[test]
#[serial]
fn test_llm_api_key_env_overrides_toml() {
    let mut toml = TomlConfig::default();
    toml.llm.api_key = Some("toml-key".into());

    env::remove_var(LLM_API_KEY_ENV);
    assert_eq!(resolve_llm_api_key(&toml).as_deref(), Some("toml-key"));

    env::set_var(LLM_API_KEY_ENV, "env-key");
    assert_eq!(resolve_llm_api_key(&toml).as_deref(), Some("env-key"));

    env::set_var(LLM_API_KEY_ENV, "   ");
    assert_eq!(resolve_llm_api_key(&toml).as_deref(), Some("toml-key"));

    env::remove_var(LLM_API_KEY_ENV);
    assert_eq!(resolve_llm_api_key(&TomlConfig::default()), None);
}

#[test]
fn test_loaded_config_records_its_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(&path, "gateway_url = \"http://analysis.local:9000\"\n").unwrap();

    let loaded = load_toml_config(Some(&path));
    assert_eq!(loaded.source, ConfigSource::File(path));
    assert_eq!(
        loaded.config.gateway_url.as_deref(),
        Some("http://analysis.local:9000")
    );
}
