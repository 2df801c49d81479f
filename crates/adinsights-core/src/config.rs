use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration for the reporting service
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AdInsightsConfig {
    /// Upstream reporting API
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// HTTP listener
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Identity returned by `GET /`
    #[serde(default)]
    pub identity: IdentityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL every endpoint is appended to, without trailing slash
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Static bearer token
    #[serde(default = "default_token")]
    pub token: SecretString,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: default_token(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    #[serde(default = "default_log_level")]
    pub level: String,
    /// pretty or compact
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct IdentityConfig {
    #[serde(default = "default_identity_name")]
    pub name: String,
    #[serde(default = "default_identity_email")]
    pub email: String,
    #[serde(default)]
    pub linkedin: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            name: default_identity_name(),
            email: default_identity_email(),
            linkedin: String::new(),
        }
    }
}

fn default_base_url() -> String {
    "https://sidebar.stract.to/api".to_string()
}
fn default_token() -> SecretString {
    SecretString::from("ProcessoSeletivoStract2025")
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    5000
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}
fn default_identity_name() -> String {
    "adinsights".to_string()
}
fn default_identity_email() -> String {
    "reports@example.com".to_string()
}

/// Configuration manager: loads once at startup, read-only afterwards
#[derive(Debug)]
pub struct ConfigManager {
    config: AdInsightsConfig,
    config_path: Option<PathBuf>,
    /// Non-fatal problems met while loading, for logging once tracing is up
    warnings: Vec<String>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables (.env file)
    /// 2. Config file (`explicit_path`, else .adinsights.toml, else ~/.adinsights/config.toml)
    /// 3. Defaults
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut warnings = Vec::new();
        Self::load_dotenv(&mut warnings);

        let (config, config_path) = match explicit_path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.display().to_string()));
                }
                (Self::read_toml_file(path)?, Some(path.to_path_buf()))
            }
            None => Self::load_config_file()?,
        };

        let config =
            Self::apply_env_overrides(config, |key| std::env::var(key).ok(), &mut warnings);
        Self::validate_config(&config)?;

        Ok(Self {
            config,
            config_path,
            warnings,
        })
    }

    fn load_dotenv(warnings: &mut Vec<String>) {
        if Path::new(".env").exists() {
            if let Err(e) = dotenv::from_filename(".env") {
                warnings.push(format!("Failed to load .env file: {}", e));
            }
        }
    }

    fn load_config_file() -> Result<(AdInsightsConfig, Option<PathBuf>), ConfigError> {
        let local_config = Path::new(".adinsights.toml");
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".adinsights").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        Ok((AdInsightsConfig::default(), None))
    }

    fn read_toml_file(path: &Path) -> Result<AdInsightsConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn apply_env_overrides(
        mut config: AdInsightsConfig,
        var: impl Fn(&str) -> Option<String>,
        warnings: &mut Vec<String>,
    ) -> AdInsightsConfig {
        if let Some(url) = var("ADINSIGHTS_API_BASE_URL") {
            config.upstream.base_url = url;
        }
        if let Some(token) = var("ADINSIGHTS_API_TOKEN") {
            config.upstream.token = SecretString::from(token);
        }

        if let Some(host) = var("ADINSIGHTS_HOST") {
            config.server.host = host;
        }
        if let Some(port) = var("ADINSIGHTS_PORT") {
            match port.parse() {
                Ok(port) => config.server.port = port,
                Err(_) => warnings.push(format!("Ignoring non-numeric ADINSIGHTS_PORT={}", port)),
            }
        }

        if let Some(level) = var("RUST_LOG") {
            config.logging.level = level;
        }
        if let Some(format) = var("ADINSIGHTS_LOG_FORMAT") {
            config.logging.format = format;
        }

        if let Some(name) = var("ADINSIGHTS_IDENTITY_NAME") {
            config.identity.name = name;
        }
        if let Some(email) = var("ADINSIGHTS_IDENTITY_EMAIL") {
            config.identity.email = email;
        }
        if let Some(linkedin) = var("ADINSIGHTS_IDENTITY_LINKEDIN") {
            config.identity.linkedin = linkedin;
        }

        config
    }

    fn validate_config(config: &AdInsightsConfig) -> Result<(), ConfigError> {
        let base_url = config.upstream.base_url.trim_end_matches('/');
        match url::Url::parse(base_url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            Ok(parsed) => {
                return Err(ConfigError::ValidationError(format!(
                    "Upstream base URL must be http or https, got scheme: {}",
                    parsed.scheme()
                )))
            }
            Err(e) => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid upstream base URL {}: {}",
                    base_url, e
                )))
            }
        }

        if config.upstream.token.expose_secret().trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Upstream token must not be empty".to_string(),
            ));
        }

        // RUST_LOG may carry a full filter directive; only bare levels are checked.
        let level = config.logging.level.as_str();
        if !level.contains('=') && !level.contains(',') {
            match level {
                "trace" | "debug" | "info" | "warn" | "error" => {}
                other => {
                    return Err(ConfigError::ValidationError(format!(
                        "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                        other
                    )))
                }
            }
        }

        match config.logging.format.as_str() {
            "pretty" | "compact" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {}. Must be one of: pretty, compact",
                    other
                )))
            }
        }

        Ok(())
    }

    pub fn config(&self) -> &AdInsightsConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut AdInsightsConfig {
        &mut self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AdInsightsConfig::default();
        assert_eq!(config.upstream.base_url, "https://sidebar.stract.to/api");
        assert_eq!(config.server.port, 5000);
        assert!(ConfigManager::validate_config(&config).is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut bad_url = AdInsightsConfig::default();
        bad_url.upstream.base_url = "ftp://example.com".into();
        assert!(ConfigManager::validate_config(&bad_url).is_err());

        let mut empty_token = AdInsightsConfig::default();
        empty_token.upstream.token = SecretString::from("  ");
        assert!(ConfigManager::validate_config(&empty_token).is_err());

        let mut bad_level = AdInsightsConfig::default();
        bad_level.logging.level = "loud".into();
        assert!(ConfigManager::validate_config(&bad_level).is_err());

        let mut directive = AdInsightsConfig::default();
        directive.logging.level = "adinsights_api=debug,tower_http=info".into();
        assert!(ConfigManager::validate_config(&directive).is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("ADINSIGHTS_API_BASE_URL", "http://localhost:9000/api"),
            ("ADINSIGHTS_API_TOKEN", "secret"),
            ("ADINSIGHTS_PORT", "8080"),
            ("ADINSIGHTS_IDENTITY_NAME", "Ada"),
        ]);
        let mut warnings = Vec::new();
        let config = ConfigManager::apply_env_overrides(
            AdInsightsConfig::default(),
            |key| env.get(key).map(|v| v.to_string()),
            &mut warnings,
        );
        assert!(warnings.is_empty());

        assert_eq!(config.upstream.base_url, "http://localhost:9000/api");
        assert_eq!(config.upstream.token.expose_secret(), "secret");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.identity.name, "Ada");
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_bad_port_is_ignored() {
        let mut warnings = Vec::new();
        let config = ConfigManager::apply_env_overrides(
            AdInsightsConfig::default(),
            |key| (key == "ADINSIGHTS_PORT").then(|| "eighty".to_string()),
            &mut warnings,
        );
        assert_eq!(config.server.port, 5000);
        assert_eq!(warnings, ["Ignoring non-numeric ADINSIGHTS_PORT=eighty"]);
    }

    #[test]
    fn test_read_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[upstream]
base_url = "http://127.0.0.1:7000"
token = "t0ken"

[server]
port = 3001

[identity]
name = "Reports Team"
"#
        )
        .unwrap();

        let config = ConfigManager::read_toml_file(file.path()).unwrap();
        assert_eq!(config.upstream.base_url, "http://127.0.0.1:7000");
        assert_eq!(config.upstream.token.expose_secret(), "t0ken");
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.identity.name, "Reports Team");
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = ConfigManager::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
