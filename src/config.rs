use std::fs;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Environment variable overriding `postgres_url`
pub const POSTGRES_URL_ENV: &str = "POSTGRES_URL";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    pub gateway: GatewayConfig,
    /// PostgreSQL connection URL. Without one the in-memory store is used.
    #[serde(default)]
    pub postgres_url: Option<String>,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    /// YAML seed for the in-memory store
    #[serde(default)]
    pub seed_file: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

/// Log file rotation period
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    Never,
    Hourly,
    #[default]
    Daily,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `info,coffee_pos=debug`
    pub level: String,
    pub dir: String,
    pub file: String,
    /// JSON lines in the file instead of plain text
    pub json: bool,
    pub rotation: Rotation,
    /// Mirror logs to stdout
    pub stdout: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: "./logs".to_string(),
            file: "coffee_pos.log".to_string(),
            json: false,
            rotation: Rotation::Daily,
            stdout: true,
        }
    }
}

fn default_db_max_connections() -> u32 {
    10
}

impl AppConfig {
    /// Load `config/{env}.yaml`, then apply environment overrides.
    pub fn load(env: &str) -> anyhow::Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        let mut config = Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path))?;

        if let Ok(url) = std::env::var(POSTGRES_URL_ENV) {
            config.apply_postgres_override(url);
        }
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    fn apply_postgres_override(&mut self, url: String) {
        let url = url.trim();
        if !url.is_empty() {
            self.postgres_url = Some(url.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEV_YAML: &str = r#"
logging:
  level: debug
  rotation: hourly
gateway:
  host: 0.0.0.0
  port: 8080
seed_file: fixtures/inventory.yaml
"#;

    #[test]
    fn test_parse_with_defaults() {
        let config = AppConfig::from_yaml_str(DEV_YAML).unwrap();
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.postgres_url, None);
        assert_eq!(config.db_max_connections, 10);
        assert_eq!(config.seed_file.as_deref(), Some("fixtures/inventory.yaml"));
    }

    #[test]
    fn test_logging_section_fills_defaults() {
        let config = AppConfig::from_yaml_str(DEV_YAML).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.rotation, Rotation::Hourly);
        assert_eq!(config.logging.file, "coffee_pos.log");
        assert!(config.logging.stdout);

        let bare = AppConfig::from_yaml_str("gateway:\n  host: 127.0.0.1\n  port: 9000\n").unwrap();
        assert_eq!(bare.logging, LoggingConfig::default());
    }

    #[test]
    fn test_unknown_rotation_fails() {
        let yaml = "logging:\n  rotation: weekly\ngateway:\n  host: 0.0.0.0\n  port: 8080\n";
        assert!(AppConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_missing_gateway_fails() {
        assert!(AppConfig::from_yaml_str("logging:\n  level: info\n").is_err());
    }

    #[test]
    fn test_postgres_override() {
        let mut config = AppConfig::from_yaml_str(DEV_YAML).unwrap();
        config.apply_postgres_override("  ".to_string());
        assert_eq!(config.postgres_url, None);

        config.apply_postgres_override("postgresql://localhost/coffee_pos".to_string());
        assert_eq!(
            config.postgres_url.as_deref(),
            Some("postgresql://localhost/coffee_pos")
        );
    }
}
