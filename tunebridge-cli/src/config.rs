//! Configuration file loading and management
//!
//! This module handles loading and parsing the client configuration from
//! `$XDG_CONFIG_HOME/tunebridge/config.toml`. If the configuration file doesn't
//! exist, a default configuration is created with documented comments.

use anyhow::{Context, Result};
use provider_apple_music::{AppleMusicConfig, DEFAULT_LIBRARY_LIMIT};
use provider_spotify::{
    SpotifyConfig, DEFAULT_API_BASE_URL, DEFAULT_AUTHORIZE_URL, DEFAULT_SCOPES, DEFAULT_TOKEN_URL,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Redirect URI registered for the Spotify app.
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8888/callback";

/// Main client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub spotify: SpotifySection,
    #[serde(default)]
    pub apple_music: AppleMusicSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    /// Default: "info"
    pub level: String,
}

/// Credential store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CredentialsConfig {
    /// Path to the credentials file
    /// If None, uses XDG_DATA_HOME/tunebridge/credentials.json
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Spotify app registration and endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpotifySection {
    pub enabled: bool,
    /// Client ID from the Spotify developer dashboard
    pub client_id: String,
    /// Only for apps registered as confidential clients
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub api_base_url: String,
    pub authorize_url: String,
    pub token_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppleMusicSection {
    /// Maximum number of entries per library request
    /// Default: 1000
    pub library_limit: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for SpotifySection {
    fn default() -> Self {
        Self {
            enabled: false,
            client_id: String::new(),
            client_secret: None,
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
        }
    }
}

impl Default for AppleMusicSection {
    fn default() -> Self {
        Self {
            library_limit: DEFAULT_LIBRARY_LIMIT,
        }
    }
}

impl SpotifySection {
    /// Build the provider configuration from this section.
    pub fn provider_config(&self) -> Result<SpotifyConfig> {
        let mut config = SpotifyConfig::new(self.client_id.clone(), self.redirect_uri.clone())
            .context("Invalid spotify.redirect_uri")?;
        config.client_secret = self.client_secret.clone().filter(|s| !s.is_empty());
        config.scopes = self.scopes.clone();
        config.api_base_url = parse_url("spotify.api_base_url", &self.api_base_url)?;
        config.authorize_url = parse_url("spotify.authorize_url", &self.authorize_url)?;
        config.token_url = parse_url("spotify.token_url", &self.token_url)?;
        Ok(config)
    }
}

impl AppleMusicSection {
    pub fn provider_config(&self) -> AppleMusicConfig {
        AppleMusicConfig {
            library_limit: self.library_limit,
        }
    }
}

fn parse_url(field: &str, raw: &str) -> Result<Url> {
    Url::parse(raw).with_context(|| format!("Invalid {field}: {raw}"))
}

impl Config {
    /// Load configuration from the specified path
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// The parsed configuration or an error if loading/parsing fails
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default XDG config location
    ///
    /// If the configuration file doesn't exist, creates a default configuration
    /// file with documented comments.
    pub fn load_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_file(&config_path)?;
        }

        Self::load(&config_path)
    }

    /// Get the default configuration file path
    ///
    /// Returns `$XDG_CONFIG_HOME/tunebridge/config.toml`
    pub fn default_config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "raibid-labs", "tunebridge")
            .context("Failed to determine project directories")?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Create a default configuration file with documented comments
    pub fn create_default_file(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, Self::default_config_content())
            .with_context(|| format!("Failed to write default config file: {}", path.display()))?;

        tracing::info!("Created default configuration file at: {}", path.display());
        Ok(())
    }

    /// Generate the default configuration file content with comments
    fn default_config_content() -> String {
        r#"# Tunebridge Configuration

[logging]
# Log level: trace, debug, info, warn, error
# RUST_LOG overrides this when set.
# Default: "info"
level = "info"

[credentials]
# Where access and refresh tokens are stored
# If not specified, defaults to $XDG_DATA_HOME/tunebridge/credentials.json
# path = "/path/to/credentials.json"

[spotify]
# Register an app at https://developer.spotify.com/dashboard and add the
# redirect URI below to it.
enabled = false
client_id = ""
# client_secret = ""
redirect_uri = "http://127.0.0.1:8888/callback"
scopes = ["user-library-read", "playlist-read-private", "playlist-read-collaborative"]

# Endpoints, only changed for proxies and testing
api_base_url = "https://api.spotify.com/v1/"
authorize_url = "https://accounts.spotify.com/authorize"
token_url = "https://accounts.spotify.com/api/token"

[apple_music]
# Maximum number of albums or playlists fetched per request
# Default: 1000
library_limit = 1000
"#
        .to_string()
    }

    /// Validate the configuration
    ///
    /// Ensures all configuration values are valid and within acceptable ranges.
    pub fn validate(&self) -> Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!(
                "Invalid logging.level: {}. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            );
        }

        if self.spotify.enabled && self.spotify.client_id.trim().is_empty() {
            anyhow::bail!("spotify.client_id must be set when Spotify is enabled");
        }
        self.spotify.provider_config()?;

        if self.apple_music.library_limit == 0 {
            anyhow::bail!("apple_music.library_limit must be greater than 0");
        }

        Ok(())
    }

    /// Get the credentials file path
    ///
    /// Returns the configured path or the default XDG data directory path
    pub fn credentials_path(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.credentials.path {
            return Ok(path.clone());
        }

        tunebridge_credentials::default_store_path().context("Failed to determine credentials path")
    }
}
