use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::protocol::DEFAULT_RATING;

/// Name of the project-level override file looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = ".reqrank";

/// Status of config file loading
#[derive(Debug, Clone)]
pub enum ConfigLoadStatus {
    /// Config loaded successfully from existing file
    Loaded,
    /// Created default config file (first run)
    Created,
    /// Error occurred during loading, using defaults.
    Error(String),
}

/// Prioritization service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of the service, without the endpoint path.
    pub url: String,
    /// Path of the prioritize endpoint.
    pub endpoint: String,
    /// Request timeout in seconds. Zero disables the timeout.
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:5000".to_string(),
            endpoint: "/prioritize".to_string(),
            timeout_secs: 60,
        }
    }
}

impl ServiceConfig {
    /// Full URL of the prioritize endpoint.
    pub fn prioritize_url(&self) -> String {
        let base = self.url.trim_end_matches('/');
        let endpoint = self.endpoint.trim_start_matches('/');
        if endpoint.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, endpoint)
        }
    }
}

/// Rating configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingsConfig {
    /// Value stored for a rating field left blank.
    pub default: i32,
}

impl Default for RatingsConfig {
    fn default() -> Self {
        Self {
            default: DEFAULT_RATING,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub ratings: RatingsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Partial service configuration for project overrides.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PartialServiceConfig {
    pub url: Option<String>,
    pub endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Partial rating configuration for project overrides.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PartialRatingsConfig {
    pub default: Option<i32>,
}

/// Partial logging configuration for project overrides.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PartialLoggingConfig {
    pub level: Option<String>,
}

/// Project-specific configuration where every field is optional.
/// Parsed from `.reqrank` files. Fields that are `None` inherit from the global config.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PartialConfig {
    pub service: PartialServiceConfig,
    pub ratings: PartialRatingsConfig,
    pub logging: PartialLoggingConfig,
}

/// Merge a global config with a project-level partial config.
/// Project values override global values where present.
pub fn merge_config(global: &Config, project: &PartialConfig) -> Config {
    Config {
        service: ServiceConfig {
            url: project
                .service
                .url
                .clone()
                .unwrap_or_else(|| global.service.url.clone()),
            endpoint: project
                .service
                .endpoint
                .clone()
                .unwrap_or_else(|| global.service.endpoint.clone()),
            timeout_secs: project
                .service
                .timeout_secs
                .unwrap_or(global.service.timeout_secs),
        },
        ratings: RatingsConfig {
            default: project.ratings.default.unwrap_or(global.ratings.default),
        },
        logging: LoggingConfig {
            level: project
                .logging
                .level
                .clone()
                .unwrap_or_else(|| global.logging.level.clone()),
        },
    }
}

/// Overrides given on the command line. Highest priority.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub url: Option<String>,
    pub endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Apply command-line overrides to config
pub fn apply_cli_overrides(mut config: Config, overrides: &CliOverrides) -> Config {
    if let Some(url) = &overrides.url {
        debug!("Overriding service.url from --url");
        config.service.url = url.clone();
    }
    if let Some(endpoint) = &overrides.endpoint {
        debug!("Overriding service.endpoint from --endpoint");
        config.service.endpoint = endpoint.clone();
    }
    if let Some(timeout) = overrides.timeout_secs {
        debug!("Overriding service.timeout_secs from --timeout");
        config.service.timeout_secs = timeout;
    }
    config
}

/// Loaded configuration with metadata
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub config_path: PathBuf,
    pub project_config_path: Option<PathBuf>,
    pub status: ConfigLoadStatus,
}

/// Get the platform-appropriate config directory
fn get_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("dev", "reqrank", "reqrank").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the full path to the config file
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.reqrank in current working directory).
pub fn get_project_config_path() -> Option<PathBuf> {
    let path = std::env::current_dir().ok()?.join(PROJECT_CONFIG_FILE);
    if path.exists() { Some(path) } else { None }
}

/// Load a project config (.reqrank) from the given path.
/// Returns Ok(PartialConfig) on success, Err(String) on parse/read failure.
fn load_project_config(path: &Path) -> Result<PartialConfig, String> {
    let contents = fs::read_to_string(path).map_err(|e| {
        warn!(path = ?path, error = %e, "project_config_read_failed");
        format!("Failed to read {}: {}", PROJECT_CONFIG_FILE, e)
    })?;

    toml::from_str::<PartialConfig>(&contents).map_err(|e| {
        warn!(path = ?path, error = %e, "project_config_parse_failed");
        format!("Invalid {}: {}", PROJECT_CONFIG_FILE, e)
    })
}

/// Load configuration from file, environment, and defaults.
///
/// With `explicit_path` the given file is read and never created; otherwise
/// the platform config file is used and created with defaults on first run.
pub fn load_config(explicit_path: Option<&Path>) -> LoadedConfig {
    let (config_path, create_if_missing) = match explicit_path {
        Some(path) => (path.to_path_buf(), false),
        None => match get_config_path() {
            Some(path) => (path, true),
            None => {
                warn!("Could not determine config directory, using defaults");
                return LoadedConfig {
                    config: apply_env_overrides(Config::default()),
                    config_path: PathBuf::from("config.toml"),
                    project_config_path: None,
                    status: ConfigLoadStatus::Error(
                        "Could not determine config directory".to_string(),
                    ),
                };
            }
        },
    };

    debug!("Config path: {:?}", config_path);

    let (mut config, status) = load_or_create_config(&config_path, create_if_missing);

    // Check for project-level .reqrank file
    let project_config_path = get_project_config_path();
    if let Some(ref project_path) = project_config_path {
        match load_project_config(project_path) {
            Ok(partial) => {
                config = merge_config(&config, &partial);
                info!(path = ?project_path, "project_config_loaded");
            }
            Err(e) => {
                warn!(path = ?project_path, error = %e, "project_config_error");
            }
        }
    }

    let config = apply_env_overrides(config);

    LoadedConfig {
        config,
        config_path,
        project_config_path,
        status,
    }
}

/// Load config from file, or create default if not exists
fn load_or_create_config(config_path: &Path, create_if_missing: bool) -> (Config, ConfigLoadStatus) {
    match fs::read_to_string(config_path) {
        Ok(contents) => match toml::from_str::<Config>(&contents) {
            Ok(config) => {
                info!("Loaded config from {:?}", config_path);
                (config, ConfigLoadStatus::Loaded)
            }
            Err(e) => {
                warn!(
                    "Config file malformed at {:?}: {}. Using defaults.",
                    config_path, e
                );
                (
                    Config::default(),
                    ConfigLoadStatus::Error(format!("Malformed TOML: {}", e)),
                )
            }
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound && create_if_missing => {
            create_default_config(config_path)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("Config file not found at {:?}. Using defaults.", config_path);
            (
                Config::default(),
                ConfigLoadStatus::Error("Config file not found".to_string()),
            )
        }
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            warn!(
                "Permission denied reading config at {:?}. Using defaults.",
                config_path
            );
            (
                Config::default(),
                ConfigLoadStatus::Error("Permission denied reading config".to_string()),
            )
        }
        Err(e) => {
            warn!(
                "Error reading config at {:?}: {}. Using defaults.",
                config_path, e
            );
            (
                Config::default(),
                ConfigLoadStatus::Error(format!("Read error: {}", e)),
            )
        }
    }
}

/// Create the default config file
fn create_default_config(config_path: &Path) -> (Config, ConfigLoadStatus) {
    let config = Config::default();

    // Ensure parent directory exists
    if let Some(parent) = config_path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!(
            "Could not create config directory {:?}: {}. Continuing without file.",
            parent, e
        );
        return (
            config,
            ConfigLoadStatus::Error(format!("Could not create config directory: {}", e)),
        );
    }

    let toml_content = match toml::to_string_pretty(&config) {
        Ok(s) => s,
        Err(e) => {
            warn!("Could not serialize default config: {}", e);
            return (
                config,
                ConfigLoadStatus::Error(format!("Serialization error: {}", e)),
            );
        }
    };

    match fs::write(config_path, &toml_content) {
        Ok(()) => {
            info!("Created default config at {:?}", config_path);
            (config, ConfigLoadStatus::Created)
        }
        Err(e) => {
            warn!(
                "Could not write default config to {:?}: {}. Continuing without file.",
                config_path, e
            );
            (
                config,
                ConfigLoadStatus::Error(format!("Write error: {}", e)),
            )
        }
    }
}

/// Apply environment variable overrides to config
fn apply_env_overrides(config: Config) -> Config {
    apply_overrides_from(config, |key| env::var(key).ok())
}

/// Apply overrides read through `lookup`, keyed by environment variable name.
fn apply_overrides_from(mut config: Config, lookup: impl Fn(&str) -> Option<String>) -> Config {
    if let Some(url) = lookup("REQRANK_SERVICE_URL") {
        debug!("Overriding service.url from REQRANK_SERVICE_URL");
        config.service.url = url;
    }

    if let Some(endpoint) = lookup("REQRANK_ENDPOINT") {
        debug!("Overriding service.endpoint from REQRANK_ENDPOINT");
        config.service.endpoint = endpoint;
    }

    if let Some(level) = lookup("REQRANK_LOG") {
        debug!("Overriding logging.level from REQRANK_LOG");
        config.logging.level = level;
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service.url, "http://127.0.0.1:5000");
        assert_eq!(config.service.endpoint, "/prioritize");
        assert_eq!(config.service.timeout_secs, 60);
        assert_eq!(config.ratings.default, 3);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_prioritize_url_joins_slashes() {
        let mut service = ServiceConfig::default();
        assert_eq!(service.prioritize_url(), "http://127.0.0.1:5000/prioritize");

        service.url = "https://rank.example.com/api/".to_string();
        service.endpoint = "prioritize".to_string();
        assert_eq!(
            service.prioritize_url(),
            "https://rank.example.com/api/prioritize"
        );

        service.endpoint = String::new();
        assert_eq!(service.prioritize_url(), "https://rank.example.com/api");
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
[service]
url = "http://rank.internal:8080"
endpoint = "/v2/prioritize"
timeout_secs = 5

[ratings]
default = 1

[logging]
level = "debug"
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.service.url, "http://rank.internal:8080");
        assert_eq!(config.service.endpoint, "/v2/prioritize");
        assert_eq!(config.service.timeout_secs, 5);
        assert_eq!(config.ratings.default, 1);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_config_partial_deserialization() {
        let toml_str = r#"
[service]
url = "http://rank.internal:8080"
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.service.url, "http://rank.internal:8080");
        assert_eq!(config.service.endpoint, "/prioritize");
        assert_eq!(config.ratings.default, 3);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let toml_str = r#"
[service]
url = "http://rank.internal"
unknown_key = "should be ignored"

[unknown_section]
foo = "bar"
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.service.url, "http://rank.internal");
    }

    #[test]
    fn test_partial_config_empty() {
        let partial: PartialConfig = toml::from_str("").unwrap();
        assert!(partial.service.url.is_none());
        assert!(partial.service.endpoint.is_none());
        assert!(partial.service.timeout_secs.is_none());
        assert!(partial.ratings.default.is_none());
        assert!(partial.logging.level.is_none());
    }

    #[test]
    fn test_merge_config_no_overrides() {
        let global = Config::default();
        let merged = merge_config(&global, &PartialConfig::default());

        assert_eq!(merged.service.url, global.service.url);
        assert_eq!(merged.service.endpoint, global.service.endpoint);
        assert_eq!(merged.service.timeout_secs, global.service.timeout_secs);
        assert_eq!(merged.ratings.default, global.ratings.default);
        assert_eq!(merged.logging.level, global.logging.level);
    }

    #[test]
    fn test_merge_config_partial_overrides() {
        let global = Config::default();
        let partial: PartialConfig = toml::from_str(
            r#"
[service]
timeout_secs = 0

[ratings]
default = 2
"#,
        )
        .unwrap();
        let merged = merge_config(&global, &partial);

        // Overridden fields
        assert_eq!(merged.service.timeout_secs, 0);
        assert_eq!(merged.ratings.default, 2);

        // Inherited fields
        assert_eq!(merged.service.url, global.service.url);
        assert_eq!(merged.logging.level, global.logging.level);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("REQRANK_SERVICE_URL", "http://env:1234"),
            ("REQRANK_LOG", "trace"),
        ]
        .into_iter()
        .collect();

        let config = apply_overrides_from(Config::default(), |key| {
            vars.get(key).map(|v| v.to_string())
        });
        assert_eq!(config.service.url, "http://env:1234");
        assert_eq!(config.service.endpoint, "/prioritize");
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_cli_overrides_win() {
        let overrides = CliOverrides {
            url: Some("http://cli:9".to_string()),
            endpoint: None,
            timeout_secs: Some(3),
        };
        let config = apply_cli_overrides(Config::default(), &overrides);
        assert_eq!(config.service.url, "http://cli:9");
        assert_eq!(config.service.endpoint, "/prioritize");
        assert_eq!(config.service.timeout_secs, 3);
    }

    #[test]
    fn test_load_or_create_writes_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let (config, status) = load_or_create_config(&path, true);
        assert!(matches!(status, ConfigLoadStatus::Created));
        assert_eq!(config.service.endpoint, "/prioritize");

        let written: Config = toml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.service.url, config.service.url);

        let (_, status) = load_or_create_config(&path, true);
        assert!(matches!(status, ConfigLoadStatus::Loaded));
    }

    #[test]
    fn test_load_explicit_missing_file_does_not_create() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        let (config, status) = load_or_create_config(&path, false);
        assert!(matches!(status, ConfigLoadStatus::Error(_)));
        assert_eq!(config.ratings.default, 3);
        assert!(!path.exists());
    }

    #[test]
    fn test_load_malformed_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[service\nurl = ").unwrap();

        let (config, status) = load_or_create_config(&path, true);
        assert!(matches!(status, ConfigLoadStatus::Error(ref m) if m.starts_with("Malformed TOML")));
        assert_eq!(config.service.url, "http://127.0.0.1:5000");
    }

    #[test]
    fn test_load_project_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROJECT_CONFIG_FILE);
        fs::write(&path, "[service]\nurl = \"http://project:1\"\n").unwrap();

        let partial = load_project_config(&path).unwrap();
        assert_eq!(partial.service.url.as_deref(), Some("http://project:1"));
    }

    #[test]
    fn test_load_project_config_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROJECT_CONFIG_FILE);
        fs::write(&path, "service = 3 = 4").unwrap();

        let err = load_project_config(&path).unwrap_err();
        assert!(err.starts_with("Invalid .reqrank"));
    }
}
