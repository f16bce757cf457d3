use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Environment variable naming an alternative config file
pub const CONFIG_PATH_ENV: &str = "SUHUA_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config/suhua.toml";
const API_KEY_PLACEHOLDER: &str = "YOUR_API_KEY_IS_NOT_SET";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a one-line message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    /// Central Weather Administration open data
    #[serde(default)]
    pub cwa: CwaConfig,

    /// Road incident feed and classification
    #[serde(default)]
    pub road: RoadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Externally reachable base URL (e.g. "https://suhua.example.org");
    /// proxied image links are absolute when set
    pub public_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            public_url: None,
        }
    }
}

/// A rain gauge shown on the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationConfig {
    /// Label shown on the dashboard (e.g. "蘇澳鎮")
    pub name: String,
    /// StationName as published by CWA
    pub station: String,
    /// County used to look up the township forecast
    pub county: String,
}

impl StationConfig {
    fn new(name: &str, station: &str, county: &str) -> Self {
        Self {
            name: name.to_string(),
            station: station.to_string(),
            county: county.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarthquakeConfig {
    /// Events older than this are dropped
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    /// Minimum intensity label ("1", "3", "5弱", ...) in any reference area
    #[serde(default = "default_min_intensity")]
    pub min_intensity: String,
    /// Reference counties; the first two feed `hualien_level` / `yilan_level`
    #[serde(default = "default_areas")]
    pub areas: Vec<String>,
}

fn default_window_days() -> u32 {
    3
}

fn default_min_intensity() -> String {
    "1".to_string()
}

fn default_areas() -> Vec<String> {
    vec!["花蓮縣".to_string(), "宜蘭縣".to_string()]
}

impl Default for EarthquakeConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            min_intensity: default_min_intensity(),
            areas: default_areas(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CwaConfig {
    /// Authorization key for opendata.cwa.gov.tw (can be set via CWA_API_KEY)
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub radar_image_url: String,
    pub typhoon_image_url: String,
    #[serde(default = "default_stations")]
    pub stations: Vec<StationConfig>,
    #[serde(default)]
    pub earthquake: EarthquakeConfig,
}

fn default_stations() -> Vec<StationConfig> {
    vec![
        StationConfig::new("蘇澳鎮", "蘇澳", "宜蘭縣"),
        StationConfig::new("東澳", "東澳", "宜蘭縣"),
        StationConfig::new("南澳鄉", "南澳", "宜蘭縣"),
        StationConfig::new("和平", "和平", "花蓮縣"),
        StationConfig::new("秀林鄉", "富世", "花蓮縣"),
    ]
}

impl CwaConfig {
    /// Check if the API key is configured (not a placeholder)
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && self.api_key != API_KEY_PLACEHOLDER
    }
}

impl Default for CwaConfig {
    fn default() -> Self {
        Self {
            api_key: API_KEY_PLACEHOLDER.to_string(),
            base_url: "https://opendata.cwa.gov.tw/api/v1/rest/datastore".to_string(),
            timeout_secs: 15,
            radar_image_url: "https://www.cwa.gov.tw/Data/radar/CV1_3600.png".to_string(),
            typhoon_image_url: "https://www.cwa.gov.tw/Data/typhoon/TY_NEWS/PTA_NEW_zhtw.png"
                .to_string(),
            stations: default_stations(),
            earthquake: EarthquakeConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadConfig {
    /// TDX client credentials (can be set via TDX_CLIENT_ID / TDX_CLIENT_SECRET)
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub auth_url: String,
    pub news_url: String,
    pub timeout_secs: u64,
    /// Validity window of the classified road snapshot
    pub cache_minutes: u32,
    /// Keyword taxonomy file; the built-in taxonomy is used when unset
    #[serde(default)]
    pub taxonomy_path: Option<PathBuf>,
}

impl RoadConfig {
    /// Returns the credential pair when both halves are present
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some((id, secret))
            }
            _ => None,
        }
    }

    pub fn cache_window(&self) -> std::time::Duration {
        std::time::Duration::from_secs(u64::from(self.cache_minutes) * 60)
    }
}

impl Default for RoadConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            auth_url: "https://tdx.transportdata.tw/auth/realms/TDXConnect/protocol/openid-connect/token"
                .to_string(),
            news_url: "https://tdx.transportdata.tw/api/basic/v2/Road/Traffic/Live/News/Highway?$format=JSON"
                .to_string(),
            timeout_secs: 15,
            cache_minutes: 5,
            taxonomy_path: None,
        }
    }
}

impl Config {
    /// Load configuration from `SUHUA_CONFIG` (or the default path), then
    /// apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::load`] with an injected environment.
    ///
    /// A missing default file yields defaults; a path named explicitly via
    /// `SUHUA_CONFIG` must exist.
    pub fn load_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
            Some(explicit) => {
                let path = PathBuf::from(explicit);
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.display().to_string()));
                }
                Self::load_from(&path)?
            }
            None => Self::load_from(Path::new(DEFAULT_CONFIG_PATH))?,
        };
        config.apply_env_overrides(lookup);
        Ok(config)
    }

    /// Load configuration from a specific file without environment overrides
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load configuration and validate it
    ///
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult), ConfigError> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()));
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Apply credentials and port supplied by the environment.
    ///
    /// `lookup` is injected so tests don't touch the process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("CWA_API_KEY").filter(|v| !v.is_empty()) {
            self.cwa.api_key = key;
        }
        if let Some(id) = lookup("TDX_CLIENT_ID").filter(|v| !v.is_empty()) {
            self.road.client_id = Some(id);
        }
        if let Some(secret) = lookup("TDX_CLIENT_SECRET").filter(|v| !v.is_empty()) {
            self.road.client_secret = Some(secret);
        }
        if let Some(port) = lookup("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.server.port == 0 {
            result.add_error("server.port", "Port cannot be 0");
        }

        if let Some(public_url) = &self.server.public_url {
            validate_url(public_url, "server.public_url", &mut result);
        }

        validate_url(&self.cwa.base_url, "cwa.base_url", &mut result);
        validate_url(&self.cwa.radar_image_url, "cwa.radar_image_url", &mut result);
        validate_url(&self.cwa.typhoon_image_url, "cwa.typhoon_image_url", &mut result);
        validate_url(&self.road.auth_url, "road.auth_url", &mut result);
        validate_url(&self.road.news_url, "road.news_url", &mut result);

        if !self.cwa.is_configured() {
            result.add_warning(
                "cwa.api_key",
                "CWA API key not configured - weather data will be unavailable",
            );
        }

        if self.cwa.stations.is_empty() {
            result.add_warning("cwa.stations", "No rain stations configured");
        }

        if self.cwa.timeout_secs == 0 {
            result.add_error("cwa.timeout_secs", "Timeout must be greater than 0");
        }
        if self.road.timeout_secs == 0 {
            result.add_error("road.timeout_secs", "Timeout must be greater than 0");
        }

        if self.road.cache_minutes == 0 {
            result.add_warning(
                "road.cache_minutes",
                "Road cache disabled (0 minutes) - every request refetches",
            );
        } else if self.road.cache_minutes > 60 {
            result.add_warning(
                "road.cache_minutes",
                "Road cache window is more than an hour",
            );
        }

        if self.road.credentials().is_none() {
            result.add_warning(
                "road",
                "TDX credentials not configured - using anonymous access",
            );
        }

        if let Some(path) = &self.road.taxonomy_path {
            if !path.exists() {
                result.add_error(
                    "road.taxonomy_path",
                    format!("Path does not exist: {}", path.display()),
                );
            }
        }

        result
    }
}

/// Validate a URL field
fn validate_url(url_str: &str, field_name: &str, result: &mut ValidationResult) {
    match Url::parse(url_str) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                result.add_error(
                    field_name,
                    format!("URL must use http or https scheme, got: {}", url.scheme()),
                );
            }
            if url.host().is_none() {
                result.add_error(field_name, "URL must have a host");
            }
        }
        Err(e) => {
            result.add_error(field_name, format!("Invalid URL: {}", e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
    }

    #[test]
    fn test_missing_api_key_is_warning() {
        let result = Config::default().validate();
        assert!(result.warnings.iter().any(|w| w.field == "cwa.api_key"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.cwa.base_url = "ftp://opendata.cwa.gov.tw".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_invalid_url() {
        let mut config = Config::default();
        config.road.news_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "road.news_url"));
    }

    #[test]
    fn test_zero_port_is_error() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(!config.validate().is_valid());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("CWA_API_KEY", "CWA-KEY"),
            ("TDX_CLIENT_ID", "id"),
            ("TDX_CLIENT_SECRET", "secret"),
            ("PORT", "9000"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.cwa.api_key, "CWA-KEY");
        assert!(config.cwa.is_configured());
        assert_eq!(config.road.credentials(), Some(("id", "secret")));
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml_str(
            r#"
            [server]
            host = "127.0.0.1"
            port = 8080
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.road.cache_minutes, 5);
        assert_eq!(config.cwa.stations.len(), 5);
        assert_eq!(config.cwa.earthquake.window_days, 3);
    }

    #[test]
    fn test_partial_table_fills_remaining_fields() {
        let config = Config::from_toml_str(
            r#"
            [cwa]
            api_key = "CWA-KEY"

            [road]
            cache_minutes = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.cwa.api_key, "CWA-KEY");
        assert_eq!(config.cwa.base_url, CwaConfig::default().base_url);
        assert_eq!(config.cwa.timeout_secs, 15);
        assert_eq!(config.road.cache_minutes, 10);
        assert_eq!(config.road.news_url, RoadConfig::default().news_url);
        assert!(config.validate().is_valid());
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = Config::from_toml_str("[server]\nport = \"eighty\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_explicit_config_path_must_exist() {
        let err = Config::load_with(|key| {
            (key == CONFIG_PATH_ENV).then(|| "/nonexistent/suhua.toml".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(path) if path.contains("nonexistent")));
    }

    #[test]
    fn test_invalid_public_url() {
        let mut config = Config::default();
        config.server.public_url = Some("suhua.example.org".to_string());
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "server.public_url"));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = Config::load_from(Path::new("/nonexistent/suhua.toml")).unwrap();
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_cache_window() {
        let config = RoadConfig::default();
        assert_eq!(config.cache_window(), std::time::Duration::from_secs(300));
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }

    #[test]
    fn test_shipped_config_parses() {
        let config = Config::from_toml_str(include_str!("../../../config/suhua.toml")).unwrap();
        assert_eq!(config.cwa.stations, default_stations());
        assert_eq!(config.road.cache_minutes, 5);
        assert!(config.road.taxonomy_path.is_some());
    }
}
