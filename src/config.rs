//! Configuration types for the contest watcher.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Upstream contest API settings.
    pub upstream: UpstreamConfig,
    /// Cache refresh cadence.
    pub refresh: RefreshConfig,
    /// Paginated listing settings.
    pub pagination: PaginationConfig,
    /// Discord bot settings.
    pub discord: DiscordConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

/// Upstream contest API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the Codeforces API host.
    pub base_url: String,
    /// Timeout for a single contest list fetch, in seconds.
    pub timeout_secs: u64,
    /// Prefix joined with a contest id to form its deep link.
    pub contest_url_base: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://codeforces.com".to_owned(),
            timeout_secs: 30,
            contest_url_base: "https://codeforces.com/contest/".to_owned(),
        }
    }
}

/// Cache refresh configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Seconds between refresh cycles.
    pub interval_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60 * 60,
        }
    }
}

/// What happens when a listing is opened in a channel that already has one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SameTargetPolicy {
    /// Close the older session before opening the new one.
    #[default]
    Replace,
    /// Keep every session alive until it expires on its own.
    Coexist,
}

/// Paginated listing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Contests shown per page.
    pub page_size: usize,
    /// Inactivity timeout of a paginated session, in seconds.
    pub wait_secs: u64,
    /// Policy for multiple sessions in one channel.
    pub same_target: SameTargetPolicy,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: 5,
            wait_secs: 5 * 60,
            same_target: SameTargetPolicy::Replace,
        }
    }
}

/// Discord bot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Bot token. `BOT_TOKEN` in the environment takes precedence.
    pub bot_token: String,
    /// Prefix that marks a message as a command (e.g. `;future`).
    pub command_prefix: String,
    /// Discord REST API base URL.
    pub api_base: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            command_prefix: ";".to_owned(),
            api_base: "https://discord.com/api/v10".to_owned(),
        }
    }
}

/// Log output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for daily rolling log files. `None` logs to stderr only.
    pub dir: Option<PathBuf>,
    /// Rolled log files kept on disk.
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            max_files: 3,
        }
    }
}

impl WatchConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::WatchError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::WatchError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values that would stall the refresh loop or paginator.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.pagination.page_size == 0 {
            return Err(crate::error::WatchError::Config(
                "pagination.page_size must be at least 1".to_owned(),
            ));
        }
        if self.pagination.wait_secs == 0 {
            return Err(crate::error::WatchError::Config(
                "pagination.wait_secs must be at least 1".to_owned(),
            ));
        }
        if self.refresh.interval_secs == 0 {
            return Err(crate::error::WatchError::Config(
                "refresh.interval_secs must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file path: `~/.config/contest-watch/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config)
                .join("contest-watch")
                .join("config.toml")
        } else if let Some(config) = dirs::config_dir() {
            config.join("contest-watch").join("config.toml")
        } else {
            PathBuf::from("/tmp/contest-watch-config/config.toml")
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = WatchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pagination.page_size, 5);
        assert_eq!(config.pagination.wait_secs, 300);
        assert_eq!(config.refresh.interval_secs, 3600);
        assert_eq!(config.pagination.same_target, SameTargetPolicy::Replace);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");

        let mut config = WatchConfig::default();
        config.pagination.page_size = 8;
        config.pagination.same_target = SameTargetPolicy::Coexist;
        config.discord.command_prefix = "!".to_owned();

        config.save_to_file(&path).expect("save");
        let loaded = WatchConfig::from_file(&path).expect("load");

        assert_eq!(loaded.pagination.page_size, 8);
        assert_eq!(loaded.pagination.same_target, SameTargetPolicy::Coexist);
        assert_eq!(loaded.discord.command_prefix, "!");
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[refresh]\ninterval_secs = 120\n").expect("write");

        let loaded = WatchConfig::from_file(&path).expect("load");
        assert_eq!(loaded.refresh.interval_secs, 120);
        assert_eq!(loaded.pagination.page_size, 5);
        assert_eq!(loaded.upstream.base_url, "https://codeforces.com");
    }

    #[test]
    fn from_file_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").expect("write");

        let result = WatchConfig::from_file(&path);
        assert!(matches!(result, Err(crate::WatchError::Config(_))));
    }

    #[test]
    fn from_file_nonexistent_returns_error() {
        let result = WatchConfig::from_file(std::path::Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let mut config = WatchConfig::default();
        config.pagination.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_config_path_ends_with_config_toml() {
        let path = WatchConfig::default_config_path();
        let path_str = path.to_string_lossy();
        assert!(path_str.ends_with("config.toml"));
        assert!(path_str.contains("contest-watch"));
    }
}
