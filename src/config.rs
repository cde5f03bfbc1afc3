//! Configuration types for pageimg

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// Default time-to-live for newly cached images (6 hours)
pub const DEFAULT_TTL: Duration = Duration::from_millis(1000 * 60 * 60 * 6);

/// Which backend holds cached image payloads
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    /// In-process map, lost when the process exits
    Memory,
    /// SQLite file at [`CacheConfig::database_path`] (default)
    #[default]
    Sqlite,
}

/// Resource cache configuration
///
/// Groups settings for the named TTL-aware store that backs the loader.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Name of the cache store holding image entries (default: "images")
    #[serde(default = "default_store_name")]
    pub store_name: String,

    /// Lifetime of newly created entries, in milliseconds on the wire (default: 6 hours)
    ///
    /// Only affects entries created after the value is set; existing entries
    /// keep the expiry they were stored with.
    #[serde(default = "default_ttl", with = "duration_ms_serde")]
    pub ttl: Duration,

    /// Storage backend (default: sqlite)
    #[serde(default)]
    pub backend: CacheBackend,

    /// Database path for the sqlite backend (default: "./pageimg-cache.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            store_name: default_store_name(),
            ttl: DEFAULT_TTL,
            backend: CacheBackend::default(),
            database_path: default_database_path(),
        }
    }
}

/// HTTP client configuration for network fetches
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header sent with image requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Request timeout (None = transport default, no explicit timeout)
    #[serde(default, with = "optional_duration_ms_serde")]
    pub timeout: Option<Duration>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout: None,
        }
    }
}

/// Page scanning and progress labelling
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PageConfig {
    /// Attribute whose presence selects cache-aside loading (default: "data-src")
    #[serde(default = "default_marker_attribute")]
    pub marker_attribute: String,

    /// Label reported to the progress sink for every image unit (default: "image")
    #[serde(default = "default_progress_label")]
    pub progress_label: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            marker_attribute: default_marker_attribute(),
            progress_label: default_progress_label(),
        }
    }
}

/// Main configuration for the image loader
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Resource cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Page scanning settings
    #[serde(default)]
    pub page: PageConfig,
}

impl Config {
    /// Parse a JSON configuration document
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON configuration file
    pub async fn from_json_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config file '{}': {}", path.display(), e),
            ))
        })?;
        Self::from_json_str(&content)
    }

    /// Check settings that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.cache.store_name.trim().is_empty() {
            return Err(Error::Config {
                message: "cache store name must not be empty".into(),
                key: Some("cache.store_name".into()),
            });
        }
        if self.page.marker_attribute.trim().is_empty() {
            return Err(Error::Config {
                message: "marker attribute must not be empty".into(),
                key: Some("page.marker_attribute".into()),
            });
        }
        Ok(())
    }
}

fn default_store_name() -> String {
    "images".to_string()
}

fn default_ttl() -> Duration {
    DEFAULT_TTL
}

fn default_database_path() -> PathBuf {
    PathBuf::from("pageimg-cache.db")
}

fn default_user_agent() -> String {
    concat!("pageimg/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_marker_attribute() -> String {
    "data-src".to_string()
}

fn default_progress_label() -> String {
    "image".to_string()
}

// Durations travel as integer milliseconds
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}

mod optional_duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms: Option<u64> = Option::deserialize(deserializer)?;
        Ok(ms.map(Duration::from_millis))
    }
}
