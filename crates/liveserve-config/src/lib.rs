//! Configuration management for liveserve.
//!
//! Parses `liveserve.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Values without `${` are used verbatim; a bare `$VAR` is not expanded.
//!
//! Expanded fields:
//! - `server.host`
//! - `serve.root_dir`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override the served root directory.
    pub root_dir: Option<PathBuf>,
    /// Override the open-browser flag.
    pub open_browser: Option<bool>,
    /// Override the watch enabled flag.
    pub watch_enabled: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "liveserve.toml";

/// Upper bound for `watch.debounce_ms`.
const MAX_DEBOUNCE_MS: u64 = 10_000;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Serving configuration (paths are relative strings from TOML).
    serve: ServeConfigRaw,
    /// Change watcher configuration.
    pub watch: WatchConfig,

    /// Resolved serving configuration (set after loading).
    #[serde(skip)]
    pub serve_resolved: ServeConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address (all interfaces by default).
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Open the default browser once the listener is bound.
    pub open_browser: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 8000,
            open_browser: true,
        }
    }
}

/// Raw serving configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ServeConfigRaw {
    root_dir: Option<String>,
}

/// Resolved serving configuration with absolute paths.
#[derive(Debug, Default)]
pub struct ServeConfig {
    /// Directory tree that is served and watched.
    pub root_dir: PathBuf,
}

/// Change watcher configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Whether change notifications are enabled.
    pub enabled: bool,
    /// Quiet period before a burst of events on one path is reported.
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 100,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`server.host`").
        field: String,
        /// Error message (e.g., "${`LIVESERVE_HOST`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `liveserve.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = std::env::current_dir()
            .ok()
            .and_then(|cwd| Self::discover_config(&cwd))
        {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(root_dir) = &settings.root_dir {
            self.serve_resolved.root_dir.clone_from(root_dir);
        }
        if let Some(open_browser) = settings.open_browser {
            self.server.open_browser = open_browser;
        }
        if let Some(watch_enabled) = settings.watch_enabled {
            self.watch.enabled = watch_enabled;
        }
    }

    /// Search for config file in `start` and its parents.
    fn discover_config(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            server: ServerConfig::default(),
            serve: ServeConfigRaw::default(),
            watch: WatchConfig::default(),
            serve_resolved: ServeConfig {
                root_dir: base.to_path_buf(),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file and after CLI overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_watch()?;
        Ok(())
    }

    /// Validate server configuration.
    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;

        // Port 0 is technically valid (OS assigns a random port), but then the
        // browser URL and the startup banner would be meaningless
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }

        Ok(())
    }

    /// Validate watch configuration.
    fn validate_watch(&self) -> Result<(), ConfigError> {
        let debounce_ms = self.watch.debounce_ms;
        if debounce_ms == 0 {
            return Err(ConfigError::Validation(
                "watch.debounce_ms must be greater than 0".to_owned(),
            ));
        }
        if debounce_ms > MAX_DEBOUNCE_MS {
            return Err(ConfigError::Validation(format!(
                "watch.debounce_ms cannot exceed {MAX_DEBOUNCE_MS}"
            )));
        }

        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;

        if let Some(ref root_dir) = self.serve.root_dir {
            self.serve.root_dir = Some(expand::expand_env(root_dir, "serve.root_dir")?);
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    ///
    /// Without a `serve.root_dir`, the directory holding the config file is served.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.serve_resolved = ServeConfig {
            root_dir: config_dir.join(self.serve.root_dir.as_deref().unwrap_or(".")),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert!(config.server.open_browser);
        assert_eq!(config.serve_resolved.root_dir, PathBuf::from("/test"));
        assert!(config.watch.enabled);
        assert_eq!(config.watch.debounce_ms, 100);
        assert!(config.config_path.is_none());
    }

    #[test]
    fn test_parse_minimal_config() {
        let toml = "";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_parse_server_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000
open_browser = false
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert!(!config.server.open_browser);
    }

    #[test]
    fn test_parse_watch_config() {
        let toml = r"
[watch]
enabled = false
debounce_ms = 250
";
        let config: Config = toml::from_str(toml).unwrap();
        assert!(!config.watch.enabled);
        assert_eq!(config.watch.debounce_ms, 250);
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        let toml = r#"
[server]
port = "eight thousand"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_paths_default_root_is_config_dir() {
        let mut config: Config = toml::from_str("").unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.serve_resolved.root_dir,
            PathBuf::from("/project/.")
        );
    }

    #[test]
    fn test_resolve_paths_relative_root() {
        let toml = r#"
[serve]
root_dir = "public"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.serve_resolved.root_dir,
            PathBuf::from("/project/public")
        );
    }

    #[test]
    fn test_resolve_paths_absolute_root() {
        let toml = r#"
[serve]
root_dir = "/srv/site"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(config.serve_resolved.root_dir, PathBuf::from("/srv/site"));
    }

    #[test]
    fn test_apply_cli_settings_host() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let overrides = CliSettings {
            host: Some("127.0.0.1".to_owned()),
            ..Default::default()
        };

        config.apply_cli_settings(&overrides);

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000); // Unchanged
    }

    #[test]
    fn test_apply_cli_settings_port() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let overrides = CliSettings {
            port: Some(9000),
            ..Default::default()
        };

        config.apply_cli_settings(&overrides);

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0"); // Unchanged
    }

    #[test]
    fn test_apply_cli_settings_root_dir() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let overrides = CliSettings {
            root_dir: Some(PathBuf::from("/custom/site")),
            ..Default::default()
        };

        config.apply_cli_settings(&overrides);

        assert_eq!(
            config.serve_resolved.root_dir,
            PathBuf::from("/custom/site")
        );
    }

    #[test]
    fn test_apply_cli_settings_flags() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let overrides = CliSettings {
            open_browser: Some(false),
            watch_enabled: Some(false),
            ..Default::default()
        };

        config.apply_cli_settings(&overrides);

        assert!(!config.server.open_browser);
        assert!(!config.watch.enabled);
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let config_before = Config::default_with_base(Path::new("/test"));
        let mut config = Config::default_with_base(Path::new("/test"));

        config.apply_cli_settings(&CliSettings::default());

        assert_eq!(config.server.host, config_before.server.host);
        assert_eq!(config.server.port, config_before.server.port);
        assert_eq!(
            config.serve_resolved.root_dir,
            config_before.serve_resolved.root_dir
        );
        assert_eq!(config.watch.enabled, config_before.watch.enabled);
    }

    #[test]
    fn test_expand_env_vars_server_host() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("LIVESERVE_TEST_HOST", "127.0.0.1");
        }

        let toml = r#"
[server]
host = "${LIVESERVE_TEST_HOST}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();

        assert_eq!(config.server.host, "127.0.0.1");

        unsafe {
            std::env::remove_var("LIVESERVE_TEST_HOST");
        }
    }

    #[test]
    fn test_expand_env_vars_root_dir_default() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("LIVESERVE_TEST_ROOT");
        }

        let toml = r#"
[serve]
root_dir = "${LIVESERVE_TEST_ROOT:-site}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.serve_resolved.root_dir,
            PathBuf::from("/project/site")
        );
    }

    #[test]
    fn test_expand_env_vars_missing_required_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("MISSING_VAR_LIVESERVE_TEST");
        }

        let toml = r#"
[server]
host = "${MISSING_VAR_LIVESERVE_TEST}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        let err = config.expand_env_vars().unwrap_err();

        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("MISSING_VAR_LIVESERVE_TEST"));
        assert!(err.to_string().contains("server.host"));
    }

    #[test]
    fn test_load_root_dir_with_bare_dollar() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            r#"
[serve]
root_dir = "my$dir"
"#,
        )
        .unwrap();

        let config = Config::load(Some(path.as_path()), None).unwrap();

        assert_eq!(config.serve_resolved.root_dir, temp_dir.path().join("my$dir"));
    }

    #[test]
    fn test_discover_config_in_parent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested = temp_dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(temp_dir.path().join(CONFIG_FILENAME), "").unwrap();

        let found = Config::discover_config(&nested).unwrap();
        assert_eq!(found, temp_dir.path().join(CONFIG_FILENAME));
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let err = Config::load(Some(Path::new("/nonexistent/liveserve.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_from_file_resolves_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            r#"
[server]
port = 8123

[serve]
root_dir = "public"
"#,
        )
        .unwrap();

        let config = Config::load(Some(path.as_path()), None).unwrap();

        assert_eq!(config.server.port, 8123);
        assert_eq!(
            config.serve_resolved.root_dir,
            temp_dir.path().join("public")
        );
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_cli_settings_are_validated() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "").unwrap();

        let overrides = CliSettings {
            port: Some(0),
            ..Default::default()
        };
        let err = Config::load(Some(path.as_path()), Some(&overrides)).unwrap_err();

        assert!(matches!(err, ConfigError::Validation(_)));
    }

    // Validation tests

    /// Assert that validation fails with expected substrings in the error message.
    fn assert_validation_error(config: &Config, expected_substrings: &[&str]) {
        let result = config.validate();
        assert!(result.is_err(), "Expected validation to fail");
        let err = result.unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(_)),
            "Expected ConfigError::Validation, got {err:?}"
        );
        let msg = err.to_string();
        for s in expected_substrings {
            assert!(
                msg.contains(s),
                "Expected error to contain '{s}', got: {msg}"
            );
        }
    }

    #[test]
    fn test_validate_default_config_passes() {
        let config = Config::default_with_base(Path::new("/test"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_server_host_empty() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.server.host = String::new();
        assert_validation_error(&config, &["server.host", "empty"]);
    }

    #[test]
    fn test_validate_server_port_zero() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.server.port = 0;
        assert_validation_error(&config, &["server.port"]);
    }

    #[test]
    fn test_validate_watch_debounce_zero() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.watch.debounce_ms = 0;
        assert_validation_error(&config, &["debounce_ms", "greater than 0"]);
    }

    #[test]
    fn test_validate_watch_debounce_too_high() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.watch.debounce_ms = 60_000;
        assert_validation_error(&config, &["debounce_ms", "10000"]);
    }
}
