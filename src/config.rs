//! Configuration loading for helpdesk.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.helpdesk/config.toml`)
//! 3. User config (`~/.helpdesk/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. The system runs with sensible defaults
//! when no config exists.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{HelpdeskError, Result};

/// Main configuration struct for helpdesk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Store engine configuration.
    pub store: StoreConfig,
    /// Resolution trigger configuration.
    pub reactor: ReactorConfig,
    /// Customer notification configuration.
    pub notifier: NotifierConfig,
}

/// Valid values for the store backend field.
pub const VALID_BACKENDS: &[&str] = &["file", "memory"];

/// Valid values for the notifier kind field.
pub const VALID_NOTIFIERS: &[&str] = &["log", "none"];

/// Store engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Engine: "file" or "memory".
    pub backend: String,
    /// Data directory for the file engine. Empty means `<home>/data`.
    pub data_dir: String,
    /// How often `watch` re-reads the file engine, in milliseconds.
    pub poll_interval_ms: u64,
}

impl StoreConfig {
    /// Check if a backend value is valid.
    pub fn is_valid_backend(value: &str) -> bool {
        VALID_BACKENDS.contains(&value)
    }

    /// Resolve the data directory, falling back to the default location.
    pub fn resolved_data_dir(&self) -> Option<PathBuf> {
        if self.data_dir.is_empty() {
            data_dir()
        } else {
            Some(PathBuf::from(&self.data_dir))
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: "file".to_string(),
            data_dir: String::new(),
            poll_interval_ms: 1000,
        }
    }
}

/// Resolution trigger configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReactorConfig {
    /// Whether the trigger runs in this process.
    pub enabled: bool,
    /// Deliveries per change event before it is abandoned.
    pub max_attempts: u32,
    /// Base redelivery delay in milliseconds.
    pub retry_backoff_ms: u64,
}

/// Minimum valid max_attempts value.
pub const MIN_MAX_ATTEMPTS: u32 = 1;

impl ReactorConfig {
    /// Check if max_attempts is valid (must be >= 1).
    pub fn is_valid_max_attempts(value: u32) -> bool {
        value >= MIN_MAX_ATTEMPTS
    }
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            retry_backoff_ms: 250,
        }
    }
}

/// Customer notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotifierConfig {
    /// Notifier: "log" or "none".
    pub kind: String,
}

impl NotifierConfig {
    /// Check if a notifier kind is valid.
    pub fn is_valid_kind(value: &str) -> bool {
        VALID_NOTIFIERS.contains(&value)
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            kind: "log".to_string(),
        }
    }
}

impl Config {
    /// Load configuration with full precedence chain.
    ///
    /// Precedence (highest to lowest):
    /// 1. Environment variables
    /// 2. Project config (`.helpdesk/config.toml` in cwd)
    /// 3. User config (`~/.helpdesk/config.toml`)
    /// 4. Defaults
    pub fn load() -> Self {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => {
                let mut config = Config::default();
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
                config.apply_env_overrides();
                config
            }
        }
    }

    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        config.apply_env_overrides();

        config
    }

    /// Load user config from `~/.helpdesk/config.toml`.
    fn load_user_config() -> Option<Config> {
        let home = helpdesk_home()?;
        Self::load_optional(&home.join("config.toml"))
    }

    /// Load project config from `.helpdesk/config.toml` in the given directory.
    fn load_project_config(cwd: &Path) -> Option<Config> {
        Self::load_optional(&cwd.join(".helpdesk").join("config.toml"))
    }

    /// Load a config file if it exists, warning when it is unreadable.
    fn load_optional(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(path) {
            Ok(config) => Some(config),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring config file");
                None
            }
        }
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| HelpdeskError::storage(path, e))?;
        toml::from_str(&content).map_err(|e| HelpdeskError::config(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // HELPDESK_STORE_BACKEND
        if let Ok(val) = env::var("HELPDESK_STORE_BACKEND") {
            if StoreConfig::is_valid_backend(&val) {
                self.store.backend = val;
            } else {
                eprintln!(
                    "Warning: Invalid HELPDESK_STORE_BACKEND value '{}'. \
                    Valid values: {:?}. Using '{}'.",
                    val, VALID_BACKENDS, self.store.backend
                );
            }
        }

        // HELPDESK_DATA_DIR
        if let Ok(val) = env::var("HELPDESK_DATA_DIR") {
            if !val.is_empty() {
                self.store.data_dir = val;
            }
        }

        // HELPDESK_REACTOR_ENABLED
        if let Ok(val) = env::var("HELPDESK_REACTOR_ENABLED") {
            self.reactor.enabled = val == "true" || val == "1";
        }

        // HELPDESK_REACTOR_MAX_ATTEMPTS
        if let Ok(val) = env::var("HELPDESK_REACTOR_MAX_ATTEMPTS") {
            match val.parse::<u32>() {
                Ok(n) if ReactorConfig::is_valid_max_attempts(n) => self.reactor.max_attempts = n,
                Ok(n) => eprintln!(
                    "Warning: Invalid HELPDESK_REACTOR_MAX_ATTEMPTS value '{}'. \
                    Must be >= {}. Using '{}'.",
                    n, MIN_MAX_ATTEMPTS, self.reactor.max_attempts
                ),
                Err(_) => eprintln!(
                    "Warning: Invalid HELPDESK_REACTOR_MAX_ATTEMPTS value '{}'. \
                    Expected a positive integer. Using '{}'.",
                    val, self.reactor.max_attempts
                ),
            }
        }

        // HELPDESK_REACTOR_BACKOFF_MS
        if let Ok(val) = env::var("HELPDESK_REACTOR_BACKOFF_MS") {
            match val.parse::<u64>() {
                Ok(n) => self.reactor.retry_backoff_ms = n,
                Err(_) => eprintln!(
                    "Warning: Invalid HELPDESK_REACTOR_BACKOFF_MS value '{}'. \
                    Expected a non-negative integer. Using '{}'.",
                    val, self.reactor.retry_backoff_ms
                ),
            }
        }

        // HELPDESK_NOTIFIER
        if let Ok(val) = env::var("HELPDESK_NOTIFIER") {
            if NotifierConfig::is_valid_kind(&val) {
                self.notifier.kind = val;
            } else {
                eprintln!(
                    "Warning: Invalid HELPDESK_NOTIFIER value '{}'. \
                    Valid values: {:?}. Using '{}'.",
                    val, VALID_NOTIFIERS, self.notifier.kind
                );
            }
        }
    }

    /// Merge another config into this one.
    ///
    /// Field-by-field: every non-default value in `other` wins. A layer cannot
    /// set a field back to its default to undo a lower layer.
    fn merge(mut self, other: Config) -> Self {
        let default_store = StoreConfig::default();
        if other.store.backend != default_store.backend {
            self.store.backend = other.store.backend;
        }
        if other.store.data_dir != default_store.data_dir {
            self.store.data_dir = other.store.data_dir;
        }
        if other.store.poll_interval_ms != default_store.poll_interval_ms {
            self.store.poll_interval_ms = other.store.poll_interval_ms;
        }

        let default_reactor = ReactorConfig::default();
        if other.reactor.enabled != default_reactor.enabled {
            self.reactor.enabled = other.reactor.enabled;
        }
        if other.reactor.max_attempts != default_reactor.max_attempts {
            self.reactor.max_attempts = other.reactor.max_attempts;
        }
        if other.reactor.retry_backoff_ms != default_reactor.retry_backoff_ms {
            self.reactor.retry_backoff_ms = other.reactor.retry_backoff_ms;
        }

        if other.notifier.kind != NotifierConfig::default().kind {
            self.notifier.kind = other.notifier.kind;
        }

        self
    }
}

/// Get the helpdesk home directory.
///
/// Checks `HELPDESK_HOME` first, then falls back to `~/.helpdesk`.
pub fn helpdesk_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("HELPDESK_HOME") {
        if home.is_empty() {
            tracing::warn!("HELPDESK_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("HELPDESK_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return Some(home.join(".helpdesk"));
    }

    let fallback = env::temp_dir().join("helpdesk");
    tracing::warn!(
        "HOME not set, using fallback location: {}",
        fallback.display()
    );
    Some(fallback)
}

/// Default data directory of the file engine.
pub fn data_dir() -> Option<PathBuf> {
    helpdesk_home().map(|home| home.join("data"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    const ENV_VARS: &[&str] = &[
        "HELPDESK_HOME",
        "HELPDESK_STORE_BACKEND",
        "HELPDESK_DATA_DIR",
        "HELPDESK_REACTOR_ENABLED",
        "HELPDESK_REACTOR_MAX_ATTEMPTS",
        "HELPDESK_REACTOR_BACKOFF_MS",
        "HELPDESK_NOTIFIER",
    ];

    /// Point HELPDESK_HOME at an empty dir and clear every override.
    fn isolated_env() -> TempDir {
        let home = TempDir::new().unwrap();
        for var in ENV_VARS {
            env::remove_var(var);
        }
        env::set_var("HELPDESK_HOME", home.path());
        home
    }

    fn write_project_config(cwd: &Path, content: &str) {
        let dir = cwd.join(".helpdesk");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.toml"), content).unwrap();
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.store.backend, "file");
        assert_eq!(config.store.poll_interval_ms, 1000);
        assert!(config.reactor.enabled);
        assert_eq!(config.reactor.max_attempts, 3);
        assert_eq!(config.reactor.retry_backoff_ms, 250);
        assert_eq!(config.notifier.kind, "log");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str("[reactor]\nmax_attempts = 5\n").unwrap();
        assert_eq!(config.reactor.max_attempts, 5);
        assert_eq!(config.reactor.retry_backoff_ms, 250);
        assert_eq!(config.store, StoreConfig::default());
    }

    #[test]
    fn test_merge_is_field_by_field() {
        let mut user = Config::default();
        user.reactor.max_attempts = 7;
        user.notifier.kind = "none".to_string();

        let mut project = Config::default();
        project.store.backend = "memory".to_string();

        let merged = Config::default().merge(user).merge(project);
        assert_eq!(merged.reactor.max_attempts, 7);
        assert_eq!(merged.notifier.kind, "none");
        assert_eq!(merged.store.backend, "memory");
    }

    #[test]
    #[serial]
    fn test_project_config_overrides_user_config() {
        let home = isolated_env();
        fs::write(
            home.path().join("config.toml"),
            "[reactor]\nmax_attempts = 9\nretry_backoff_ms = 10\n",
        )
        .unwrap();

        let cwd = TempDir::new().unwrap();
        write_project_config(cwd.path(), "[reactor]\nmax_attempts = 4\n");

        let config = Config::load_from_cwd(cwd.path());
        assert_eq!(config.reactor.max_attempts, 4);
        assert_eq!(config.reactor.retry_backoff_ms, 10);
        env::remove_var("HELPDESK_HOME");
    }

    #[test]
    #[serial]
    fn test_env_overrides_files() {
        let _home = isolated_env();
        let cwd = TempDir::new().unwrap();
        write_project_config(cwd.path(), "[store]\nbackend = \"file\"\n[notifier]\nkind = \"log\"\n");

        env::set_var("HELPDESK_STORE_BACKEND", "memory");
        env::set_var("HELPDESK_NOTIFIER", "none");
        env::set_var("HELPDESK_REACTOR_ENABLED", "0");
        env::set_var("HELPDESK_REACTOR_BACKOFF_MS", "5");

        let config = Config::load_from_cwd(cwd.path());
        assert_eq!(config.store.backend, "memory");
        assert_eq!(config.notifier.kind, "none");
        assert!(!config.reactor.enabled);
        assert_eq!(config.reactor.retry_backoff_ms, 5);

        for var in ENV_VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_invalid_env_values_are_ignored() {
        let _home = isolated_env();
        let cwd = TempDir::new().unwrap();

        env::set_var("HELPDESK_STORE_BACKEND", "postgres");
        env::set_var("HELPDESK_REACTOR_MAX_ATTEMPTS", "0");
        env::set_var("HELPDESK_REACTOR_BACKOFF_MS", "soon");

        let config = Config::load_from_cwd(cwd.path());
        assert_eq!(config.store.backend, "file");
        assert_eq!(config.reactor.max_attempts, 3);
        assert_eq!(config.reactor.retry_backoff_ms, 250);

        for var in ENV_VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_unparseable_project_config_is_skipped() {
        let _home = isolated_env();
        let cwd = TempDir::new().unwrap();
        write_project_config(cwd.path(), "this is = = not toml");

        let config = Config::load_from_cwd(cwd.path());
        assert_eq!(config, Config::default());
        env::remove_var("HELPDESK_HOME");
    }

    #[test]
    #[serial]
    fn test_data_dir_follows_home() {
        let home = isolated_env();
        assert_eq!(data_dir(), Some(home.path().join("data")));
        assert_eq!(
            StoreConfig::default().resolved_data_dir(),
            Some(home.path().join("data"))
        );

        let custom = StoreConfig {
            data_dir: "/srv/helpdesk".to_string(),
            ..Default::default()
        };
        assert_eq!(custom.resolved_data_dir(), Some(PathBuf::from("/srv/helpdesk")));
        env::remove_var("HELPDESK_HOME");
    }
}
