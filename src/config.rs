use std::path::PathBuf;

use directories::ProjectDirs;
use serde::Deserialize;

/// Application configuration loaded from TOML config file.
/// All fields have defaults; the config file is optional.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Live snapshot database (overrides the working-directory default).
    pub live_db_path: Option<PathBuf>,
    /// Historical archive database.
    pub history_db_path: Option<PathBuf>,
    /// Directory the HTML reports are written to and served from.
    pub output_dir: Option<PathBuf>,
    /// Separately sourced yearly export used by `wrapped`.
    pub wrapped_csv: Option<PathBuf>,
    /// Artists to plot on the focused timeline. Empty = most persistent five.
    pub focus_artists: Vec<String>,
    /// Streaming service API settings.
    pub spotify: SpotifyConfig,
    /// Static file server settings.
    pub server: ServerConfig,
}

/// Streaming service API configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    pub api_base: String,
    /// OAuth bearer token. The authorization flow itself happens elsewhere.
    pub access_token: Option<String>,
    /// Items requested per look-back window (upstream maximum is 50).
    pub limit: usize,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.spotify.com/v1".to_string(),
            access_token: None,
            limit: 50,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

impl AppConfig {
    /// Load config from `~/.config/listening-trends/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) if path.exists() => match std::fs::read_to_string(&path) {
                Ok(contents) => match Self::parse(&contents) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", path.display());
                        config
                    }
                    Err(e) => {
                        log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                        Self::default()
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn live_db(&self) -> PathBuf {
        self.live_db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LIVE_DB))
    }

    pub fn history_db(&self) -> PathBuf {
        self.history_db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY_DB))
    }

    pub fn output(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }

    pub fn wrapped(&self) -> PathBuf {
        self.wrapped_csv
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WRAPPED_CSV))
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

// Working-directory defaults
const DEFAULT_LIVE_DB: &str = "listening_trends.db";
const DEFAULT_HISTORY_DB: &str = "listening_history.db";
const DEFAULT_OUTPUT_DIR: &str = "visualizations";
const DEFAULT_WRAPPED_CSV: &str = "Spotify_data.csv";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.live_db(), PathBuf::from("listening_trends.db"));
        assert_eq!(config.history_db(), PathBuf::from("listening_history.db"));
        assert_eq!(config.output(), PathBuf::from("visualizations"));
        assert_eq!(config.spotify.limit, 50);
        assert_eq!(config.server.port, 8080);
        assert!(config.spotify.access_token.is_none());
    }

    #[test]
    fn test_partial_config() {
        let config = AppConfig::parse(
            r#"
            live_db_path = "/data/live.db"
            focus_artists = ["Bon Iver", "mike."]

            [spotify]
            access_token = "abc"

            [server]
            port = 9000
            "#,
        )
        .unwrap();
        assert_eq!(config.live_db(), PathBuf::from("/data/live.db"));
        assert_eq!(config.focus_artists.len(), 2);
        assert_eq!(config.spotify.access_token.as_deref(), Some("abc"));
        assert_eq!(config.spotify.api_base, "https://api.spotify.com/v1");
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_bad_config_is_error() {
        assert!(AppConfig::parse("server = 3").is_err());
    }
}
