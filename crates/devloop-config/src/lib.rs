//! Configuration management for devloop.
//!
//! Parses `devloop.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! Relative paths in the file (`bundle.entry`, `bundle.output`,
//! `live_reload.watch_dir`) are resolved against the directory containing
//! the config file, or the current directory when no file was found.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override live reload enabled flag.
    pub live_reload_enabled: Option<bool>,
    /// Override the debounce quiet period in milliseconds.
    pub debounce_ms: Option<u64>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "devloop.toml";

/// Upper bound for the debounce quiet period.
const MAX_DEBOUNCE_MS: u64 = 10_000;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Application presentation settings.
    pub app: AppConfig,
    /// Bundler invocation (paths are relative strings from TOML).
    bundle: BundleConfigRaw,
    /// Live reload settings (paths are relative strings from TOML).
    live_reload: LiveReloadConfigRaw,

    /// Resolved bundle configuration (set after loading).
    #[serde(skip)]
    pub bundle_resolved: BundleConfig,
    /// Resolved live reload configuration (set after loading).
    #[serde(skip)]
    pub live_reload_resolved: LiveReloadConfig,
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
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8000,
        }
    }
}

/// Application presentation settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Name shown as page title and overlay in the HTML shell.
    pub name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "devloop".to_owned(),
        }
    }
}

/// Raw bundle configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct BundleConfigRaw {
    entry: Option<String>,
    output: Option<String>,
    command: Option<String>,
    args: Option<Vec<String>>,
    timeout_secs: Option<u64>,
}

/// Resolved bundler invocation with absolute paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleConfig {
    /// Entry module handed to the bundler.
    pub entry: PathBuf,
    /// Path of the compiled artifact.
    pub output: PathBuf,
    /// Bundler executable.
    pub command: String,
    /// Bundler arguments; `{entry}` and `{output}` are substituted.
    pub args: Vec<String>,
    /// Kill the bundler after this long (`None` waits forever).
    pub timeout: Option<Duration>,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self::with_base(Path::new("."))
    }
}

impl BundleConfig {
    fn with_base(base: &Path) -> Self {
        Self {
            entry: base.join("src").join("client.ts"),
            output: base.join("bin").join("deno_cache").join("client.bundle.js"),
            command: "deno".to_owned(),
            args: default_bundle_args(),
            timeout: None,
        }
    }
}

fn default_bundle_args() -> Vec<String> {
    ["bundle", "--output", "{output}", "{entry}"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}

/// Raw live reload configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct LiveReloadConfigRaw {
    enabled: Option<bool>,
    watch_dir: Option<String>,
    debounce_ms: Option<u64>,
    watch_patterns: Option<Vec<String>>,
}

/// Resolved live reload configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveReloadConfig {
    /// Whether the watch loop and reload stream are enabled.
    pub enabled: bool,
    /// Source tree to watch.
    pub watch_dir: PathBuf,
    /// Quiet period before a burst of changes triggers a rebuild.
    pub debounce_ms: u64,
    /// Glob patterns (relative to `watch_dir`) that count as source changes.
    pub watch_patterns: Option<Vec<String>>,
}

impl Default for LiveReloadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            watch_dir: PathBuf::from("src"),
            debounce_ms: 100,
            watch_patterns: None,
        }
    }
}

impl LiveReloadConfig {
    /// Quiet period as a [`Duration`].
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
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
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `devloop.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values. The merged result
    /// is validated.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails or
    /// the merged configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        config.validate()?;
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
        if let Some(enabled) = settings.live_reload_enabled {
            self.live_reload_resolved.enabled = enabled;
        }
        if let Some(debounce_ms) = settings.debounce_ms {
            self.live_reload_resolved.debounce_ms = debounce_ms;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
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
            app: AppConfig::default(),
            bundle: BundleConfigRaw::default(),
            live_reload: LiveReloadConfigRaw::default(),
            bundle_resolved: BundleConfig::with_base(base),
            live_reload_resolved: LiveReloadConfig {
                watch_dir: base.join("src"),
                ..LiveReloadConfig::default()
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_bundle()?;
        self.validate_live_reload()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;

        // Port 0 asks the OS for a random port, which the browser can't guess
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }

        Ok(())
    }

    fn validate_bundle(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.bundle_resolved.command, "bundle.command")?;

        if self.bundle_resolved.output.file_name().is_none() {
            return Err(ConfigError::Validation(
                "bundle.output must name a file".to_owned(),
            ));
        }

        Ok(())
    }

    fn validate_live_reload(&self) -> Result<(), ConfigError> {
        let debounce_ms = self.live_reload_resolved.debounce_ms;
        if debounce_ms == 0 {
            return Err(ConfigError::Validation(
                "live_reload.debounce_ms must be greater than 0".to_owned(),
            ));
        }
        if debounce_ms > MAX_DEBOUNCE_MS {
            return Err(ConfigError::Validation(format!(
                "live_reload.debounce_ms cannot exceed {MAX_DEBOUNCE_MS}"
            )));
        }

        for pattern in self.live_reload_resolved.watch_patterns.iter().flatten() {
            glob::Pattern::new(pattern).map_err(|e| {
                ConfigError::Validation(format!(
                    "live_reload.watch_patterns: invalid pattern {pattern:?}: {e}"
                ))
            })?;
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let defaults = BundleConfig::with_base(config_dir);
        let bundle = &self.bundle;

        self.bundle_resolved = BundleConfig {
            entry: bundle
                .entry
                .as_deref()
                .map_or(defaults.entry, |p| config_dir.join(p)),
            output: bundle
                .output
                .as_deref()
                .map_or(defaults.output, |p| config_dir.join(p)),
            command: bundle.command.clone().unwrap_or(defaults.command),
            args: bundle.args.clone().unwrap_or(defaults.args),
            // Zero means "no timeout" in the file format
            timeout: bundle
                .timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        };

        let live_reload = &self.live_reload;
        let live_defaults = LiveReloadConfig::default();
        self.live_reload_resolved = LiveReloadConfig {
            enabled: live_reload.enabled.unwrap_or(live_defaults.enabled),
            watch_dir: config_dir.join(live_reload.watch_dir.as_deref().unwrap_or("src")),
            debounce_ms: live_reload.debounce_ms.unwrap_or(live_defaults.debounce_ms),
            watch_patterns: live_reload.watch_patterns.clone(),
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
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.app.name, "devloop");
        assert_eq!(
            config.bundle_resolved.entry,
            PathBuf::from("/test/src/client.ts")
        );
        assert_eq!(
            config.bundle_resolved.output,
            PathBuf::from("/test/bin/deno_cache/client.bundle.js")
        );
        assert_eq!(config.bundle_resolved.command, "deno");
        assert_eq!(
            config.bundle_resolved.args,
            vec!["bundle", "--output", "{output}", "{entry}"]
        );
        assert_eq!(config.bundle_resolved.timeout, None);
        assert!(config.live_reload_resolved.enabled);
        assert_eq!(config.live_reload_resolved.watch_dir, PathBuf::from("/test/src"));
        assert_eq!(config.live_reload_resolved.debounce_ms, 100);
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_parse_server_config() {
        let toml = r#"
[server]
host = "0.0.0.0"
port = 9000
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_resolve_paths() {
        let toml = r#"
[bundle]
entry = "web/main.ts"
output = "build/app.js"
command = "esbuild"
args = ["{entry}", "--bundle", "--outfile={output}"]
timeout_secs = 30

[live_reload]
watch_dir = "web"
debounce_ms = 250
watch_patterns = ["**/*.ts"]
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.bundle_resolved,
            BundleConfig {
                entry: PathBuf::from("/project/web/main.ts"),
                output: PathBuf::from("/project/build/app.js"),
                command: "esbuild".to_owned(),
                args: vec![
                    "{entry}".to_owned(),
                    "--bundle".to_owned(),
                    "--outfile={output}".to_owned()
                ],
                timeout: Some(Duration::from_secs(30)),
            }
        );
        assert_eq!(
            config.live_reload_resolved,
            LiveReloadConfig {
                enabled: true,
                watch_dir: PathBuf::from("/project/web"),
                debounce_ms: 250,
                watch_patterns: Some(vec!["**/*.ts".to_owned()]),
            }
        );
    }

    #[test]
    fn test_zero_timeout_means_none() {
        let toml = r"
[bundle]
timeout_secs = 0
";
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));
        assert_eq!(config.bundle_resolved.timeout, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devloop.toml");
        std::fs::write(
            &path,
            r#"
[app]
name = "Knot Demo"

[live_reload]
enabled = false
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.app.name, "Knot Demo");
        assert!(!config.live_reload_resolved.enabled);
        assert_eq!(config.config_path, Some(path));
        assert_eq!(
            config.bundle_resolved.entry,
            dir.path().join("src").join("client.ts")
        );
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let result = Config::load(Some(Path::new("/nonexistent/devloop.toml")), None);
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devloop.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();

        let result = Config::load(Some(&path), None);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_applies_cli_settings_before_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devloop.toml");
        std::fs::write(&path, "").unwrap();

        let settings = CliSettings {
            debounce_ms: Some(0),
            ..Default::default()
        };
        let err = Config::load(Some(&path), Some(&settings)).unwrap_err();
        assert!(err.to_string().contains("debounce_ms"));
    }

    #[test]
    fn test_apply_cli_settings_multiple() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let settings = CliSettings {
            host: Some("0.0.0.0".to_owned()),
            port: Some(3000),
            live_reload_enabled: Some(false),
            debounce_ms: Some(50),
        };

        config.apply_cli_settings(&settings);

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert!(!config.live_reload_resolved.enabled);
        assert_eq!(config.live_reload_resolved.debounce_ms, 50);
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.apply_cli_settings(&CliSettings::default());

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert!(config.live_reload_resolved.enabled);
    }

    fn assert_validation_error(config: &Config, expected: &str) {
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(_)),
            "Expected ConfigError::Validation, got {err:?}"
        );
        assert!(
            err.to_string().contains(expected),
            "Expected error to mention {expected:?}, got: {err}"
        );
    }

    #[test]
    fn test_validate_default_config_passes() {
        assert!(Config::default_with_base(Path::new("/test")).validate().is_ok());
    }

    #[test]
    fn test_validate_server_host_empty() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.server.host = String::new();
        assert_validation_error(&config, "server.host");
    }

    #[test]
    fn test_validate_server_port_zero() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.server.port = 0;
        assert_validation_error(&config, "server.port");
    }

    #[test]
    fn test_validate_bundle_command_empty() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.bundle_resolved.command = "  ".to_owned();
        assert_validation_error(&config, "bundle.command");
    }

    #[test]
    fn test_validate_debounce_too_high() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.live_reload_resolved.debounce_ms = MAX_DEBOUNCE_MS + 1;
        assert_validation_error(&config, "cannot exceed");
    }

    #[test]
    fn test_validate_invalid_watch_pattern() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.live_reload_resolved.watch_patterns = Some(vec!["src/[".to_owned()]);
        assert_validation_error(&config, "watch_patterns");
    }

    #[test]
    fn test_debounce_duration() {
        let config = LiveReloadConfig {
            debounce_ms: 250,
            ..LiveReloadConfig::default()
        };
        assert_eq!(config.debounce(), Duration::from_millis(250));
    }
}
