use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub transport: TransportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Data directory path
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Timeout for a single access-path attempt, in seconds
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    /// Pause between feeds during a batch refresh, in milliseconds
    #[serde(default = "default_feed_delay")]
    pub feed_delay_ms: u64,
    /// Background refresh interval in seconds (0 = disabled)
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_timeout(),
            feed_delay_ms: default_feed_delay(),
            refresh_interval_secs: default_refresh_interval(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Access paths tried in order until one yields a parseable document
    #[serde(default = "default_access_paths")]
    pub access_paths: Vec<AccessPathConfig>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            access_paths: default_access_paths(),
        }
    }
}

/// One way of reaching a feed URL.
///
/// `Proxy` paths request `prefix` followed by the percent-encoded feed URL,
/// e.g. `https://corsproxy.io/?https%3A%2F%2Fexample.com%2Ffeed.xml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AccessPathConfig {
    Direct,
    Proxy { name: String, prefix: String },
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("feedkeep")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_feed_delay() -> u64 {
    500
}

fn default_refresh_interval() -> u64 {
    3600 // 1 hour
}

fn default_user_agent() -> String {
    format!("feedkeep/{}", env!("CARGO_PKG_VERSION"))
}

fn default_access_paths() -> Vec<AccessPathConfig> {
    vec![
        AccessPathConfig::Direct,
        AccessPathConfig::Proxy {
            name: "corsproxy".to_string(),
            prefix: "https://corsproxy.io/?".to_string(),
        },
        AccessPathConfig::Proxy {
            name: "allorigins".to_string(),
            prefix: "https://api.allorigins.win/raw?url=".to_string(),
        },
    ]
}

/// Expand tilde (~) in path to user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if let Some(stripped) = path_str.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(stripped);
            }
        } else if path_str == "~" {
            if let Some(home) = dirs::home_dir() {
                return home;
            }
        }
    }
    path.to_path_buf()
}

impl AppConfig {
    /// Load configuration from file or return defaults
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from an explicit path, defaults if it does not exist
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> crate::Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    /// Get the configuration file path
    /// Always uses ~/.config/feedkeep/config.toml on all platforms
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("feedkeep")
            .join("config.toml")
    }

    /// Get the snapshot file path
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir().join(crate::storage::SNAPSHOT_FILE_NAME)
    }

    /// Get the data directory (with tilde expansion)
    pub fn data_dir(&self) -> PathBuf {
        expand_tilde(&self.general.data_dir)
    }
}
