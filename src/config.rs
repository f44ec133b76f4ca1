use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Collection that holds geo-coordinate records in the vector store.
pub const GEO_COLLECTION: &str = "my-first-ragbot.geo-coords";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RagbotConfig {
    pub log: LogConfig,
    pub storage: StorageConfig,
    pub ollama: OllamaConfig,
    pub weather: WeatherConfig,
    pub memory: MemoryConfig,
    pub geo: GeoConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OllamaConfig {
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub embedding_dim: usize,
    pub timeout_secs: u64,
}

/// OpenWeatherMap settings. `api_key` is shared by the geocoding and
/// weather endpoints.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WeatherConfig {
    pub api_key: Option<String>,
    pub geo_url: String,
    pub weather_url: String,
    pub units: String,
    pub lang: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MemoryConfig {
    pub collection: String,
    pub search_limit: usize,
    pub min_relevance: f64,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct GeoConfig {
    pub coalesce_inflight: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChatConfig {
    pub system_prompt: Option<String>,
    pub max_tool_rounds: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_ragbot_dir()
            .join("memory.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            chat_model: "mistral".into(),
            embedding_model: "mistral".into(),
            embedding_dim: 4096,
            timeout_secs: 120,
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            geo_url: "https://api.openweathermap.org/geo/1.0/direct".into(),
            weather_url: "https://api.openweathermap.org/data/2.5/weather".into(),
            units: "metric".into(),
            lang: "bg".into(),
            timeout_secs: 10,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            collection: GEO_COLLECTION.into(),
            search_limit: 5,
            min_relevance: 0.7,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            max_tool_rounds: 4,
        }
    }
}

impl OllamaConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl WeatherConfig {
    /// The configured API key, or `None` when unset or blank.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Returns `~/.ragbot/`
pub fn default_ragbot_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".ragbot")
}

/// Returns the config file path: `$RAGBOT_CONFIG` or `~/.ragbot/config.toml`
pub fn default_config_path() -> PathBuf {
    match std::env::var("RAGBOT_CONFIG") {
        Ok(path) if !path.is_empty() => expand_tilde(&path),
        _ => default_ragbot_dir().join("config.toml"),
    }
}

impl RagbotConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            RagbotConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (RAGBOT_DB, RAGBOT_LOG_LEVEL, OPENWEATHER_API_KEY, OLLAMA_HOST).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("RAGBOT_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("RAGBOT_LOG_LEVEL") {
            self.log.level = val;
        }
        if let Ok(val) = std::env::var("OPENWEATHER_API_KEY") {
            self.weather.api_key = Some(val);
        }
        if let Ok(val) = std::env::var("OLLAMA_HOST") {
            self.ollama.base_url = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = RagbotConfig::default();
        assert_eq!(config.log.level, "info");
        assert_eq!(config.memory.collection, "my-first-ragbot.geo-coords");
        assert_eq!(config.ollama.embedding_dim, 4096);
        assert_eq!(config.weather.units, "metric");
        assert_eq!(config.weather.lang, "bg");
        assert!(config.weather.api_key.is_none());
        assert!(!config.geo.coalesce_inflight);
        assert!(config.storage.db_path.ends_with("memory.db"));
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[log]
level = "debug"

[storage]
db_path = "/tmp/test.db"

[weather]
api_key = "abc123"
lang = "en"

[geo]
coalesce_inflight = true
"#;
        let config: RagbotConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.storage.db_path, "/tmp/test.db");
        assert_eq!(config.weather.credential(), Some("abc123"));
        assert_eq!(config.weather.lang, "en");
        assert!(config.geo.coalesce_inflight);
        // defaults still apply for unset fields
        assert_eq!(config.weather.units, "metric");
        assert_eq!(config.memory.search_limit, 5);
        assert_eq!(config.chat.max_tool_rounds, 4);
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let mut weather = WeatherConfig::default();
        assert_eq!(weather.credential(), None);

        weather.api_key = Some("   ".into());
        assert_eq!(weather.credential(), None);

        weather.api_key = Some(" key ".into());
        assert_eq!(weather.credential(), Some("key"));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = RagbotConfig::default();
        std::env::set_var("RAGBOT_DB", "/tmp/override.db");
        std::env::set_var("RAGBOT_LOG_LEVEL", "trace");
        std::env::set_var("OPENWEATHER_API_KEY", "from-env");
        std::env::set_var("OLLAMA_HOST", "http://ollama:11434");

        config.apply_env_overrides();

        assert_eq!(config.storage.db_path, "/tmp/override.db");
        assert_eq!(config.log.level, "trace");
        assert_eq!(config.weather.credential(), Some("from-env"));
        assert_eq!(config.ollama.base_url, "http://ollama:11434");

        // Clean up
        std::env::remove_var("RAGBOT_DB");
        std::env::remove_var("RAGBOT_LOG_LEVEL");
        std::env::remove_var("OPENWEATHER_API_KEY");
        std::env::remove_var("OLLAMA_HOST");
    }

    #[test]
    fn load_from_missing_file_uses_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = RagbotConfig::load_from(tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.memory.collection, GEO_COLLECTION);
    }
}
