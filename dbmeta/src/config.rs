//! Configuration handling for dbmeta
//!
//! Every section has defaults, so a configuration file is optional. Values given
//! on the command line take precedence over the file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Load configuration from a TOML file
pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let config_str = fs::read_to_string(path).map_err(|e| {
        Error::ConfigError(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    let config: Config = toml::from_str(&config_str)
        .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;

    config.validate()?;
    Ok(config)
}

/// Represents the complete dbmeta configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub export: ExportConfig,
    pub migrations: MigrationsConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Reject values that would make an operation meaningless
    pub fn validate(&self) -> Result<()> {
        if self.database.schema.trim().is_empty() {
            return Err(Error::ConfigError("database.schema must not be empty".into()));
        }
        if self.export.file_name.trim().is_empty() {
            return Err(Error::ConfigError("export.file_name must not be empty".into()));
        }
        if self.migrations.extension.trim().is_empty() {
            return Err(Error::ConfigError("migrations.extension must not be empty".into()));
        }
        Ok(())
    }
}

/// Connection settings shared by every operation
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub timeout_seconds: u64,
    /// Schema whose objects are exported
    pub schema: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            schema: "public".to_string(),
        }
    }
}

/// Server used by `build-db` to create new databases
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Database to connect to while issuing `CREATE DATABASE`
    pub maintenance_database: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            username: "postgres".to_string(),
            password: "postgres".to_string(),
            maintenance_database: "postgres".to_string(),
        }
    }
}

/// Export settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ExportConfig {
    pub file_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            file_name: "output.sql".to_string(),
        }
    }
}

/// Script application settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct MigrationsConfig {
    /// File extension of migration scripts, without the dot
    pub extension: String,
    /// Keep applying later scripts after one fails
    pub continue_on_error: bool,
    pub transaction_per_script: bool,
    pub dry_run: bool,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            extension: "sql".to_string(),
            continue_on_error: true,
            transaction_per_script: true,
            dry_run: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub format: String,
    pub stdout: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            format: "text".to_string(),
            stdout: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn empty_file_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.database.schema, "public");
        assert_eq!(config.server.port, 5432);
        assert_eq!(config.export.file_name, "output.sql");
        assert_eq!(config.migrations.extension, "sql");
        assert!(config.migrations.continue_on_error);
        assert!(config.migrations.transaction_per_script);
        assert!(!config.migrations.dry_run);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            host = "db.internal"

            [migrations]
            continue_on_error = false
            "#,
        )
        .unwrap();

        assert_eq!(config.server.host, "db.internal");
        assert_eq!(config.server.username, "postgres");
        assert!(!config.migrations.continue_on_error);
        assert_eq!(config.migrations.extension, "sql");
    }

    #[test]
    fn load_from_file_rejects_blank_schema() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[database]\nschema = \"  \"").unwrap();

        let err = load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn load_from_file_reports_missing_file() {
        let err = load_from_file("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
