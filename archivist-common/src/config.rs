//! Configuration loading and resolution
//!
//! Every setting resolves in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing default TOML file is not an error. An explicitly named file that
//! is missing, unreadable, or malformed is a configuration error.

use crate::logging::LogFormat;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable overriding the database URL
pub const DATABASE_URL_ENV: &str = "ARCHIVIST_DATABASE_URL";

/// Environment variable overriding the TOML config file location
pub const CONFIG_PATH_ENV: &str = "ARCHIVIST_CONFIG";

/// Environment variable overriding the HTTP download timeout
pub const HTTP_TIMEOUT_ENV: &str = "ARCHIVIST_HTTP_TIMEOUT_SECS";

/// Default HTTP download timeout in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default maximum time spent retrying a locked database, in milliseconds
pub const DEFAULT_MAX_LOCK_WAIT_MS: u64 = 5000;

/// Logging section of the TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive (e.g. "info", "archivist_ingest=debug")
    pub level: Option<String>,
    /// Output format
    pub format: Option<LogFormat>,
}

/// Contents of `config.toml`
///
/// Every field is optional; absent fields fall through to the compiled default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub database_url: Option<String>,
    /// Ordered source URLs, replacing the built-in list
    pub sources: Option<Vec<String>>,
    pub http_timeout_secs: Option<u64>,
    pub max_lock_wait_ms: Option<u64>,
    /// Structure-validate every record of a source instead of the first one
    pub validate_all_records: Option<bool>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Locate the TOML config file
///
/// Returns `None` when no file is configured and the platform default does not exist.
pub fn config_file_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|d| d.join("archivist").join("config.toml"))
        .filter(|p| p.exists())
}

/// Load the TOML config file, or defaults when there is none
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        debug!("No config file found, using defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        return Err(Error::Config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;

    info!("Loaded config file: {}", path.display());
    Ok(config)
}

/// Resolve the database URL
pub fn resolve_database_url(cli_arg: Option<&str>, toml_config: &TomlConfig) -> Result<String> {
    let url = if let Some(url) = cli_arg {
        url.to_string()
    } else if let Some(url) = std::env::var(DATABASE_URL_ENV).ok().filter(|u| !u.trim().is_empty()) {
        url
    } else if let Some(url) = &toml_config.database_url {
        url.clone()
    } else {
        default_database_url()?
    };

    validate_database_url(&url)?;
    Ok(url)
}

/// Resolve the HTTP timeout in seconds
pub fn resolve_http_timeout_secs(cli_arg: Option<u64>, toml_config: &TomlConfig) -> Result<u64> {
    let secs = match cli_arg {
        Some(secs) => secs,
        None => match std::env::var(HTTP_TIMEOUT_ENV) {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|e| {
                Error::Config(format!("{} must be a whole number of seconds: {}", HTTP_TIMEOUT_ENV, e))
            })?,
            Err(_) => toml_config
                .http_timeout_secs
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
        },
    };

    if secs == 0 {
        return Err(Error::Config("HTTP timeout must be at least 1 second".to_string()));
    }
    Ok(secs)
}

/// Reject connection strings this build cannot open
pub fn validate_database_url(url: &str) -> Result<()> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(Error::Config("Database URL is empty".to_string()));
    }
    if !trimmed.starts_with("sqlite:") {
        return Err(Error::Config(format!(
            "Unsupported database URL '{}': expected a sqlite: URL",
            trimmed
        )));
    }
    Ok(())
}

/// Compiled default database location
///
/// `<data_local_dir>/archivist/archivist.db`, created on first use.
pub fn default_database_url() -> Result<String> {
    let dir = dirs::data_local_dir()
        .map(|d| d.join("archivist"))
        .unwrap_or_else(|| PathBuf::from("./archivist_data"));

    std::fs::create_dir_all(&dir).map_err(|e| {
        Error::Config(format!("Cannot create data directory {}: {}", dir.display(), e))
    })?;

    Ok(format!("sqlite://{}?mode=rwc", dir.join("archivist.db").display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_database_url() {
        assert!(validate_database_url("sqlite::memory:").is_ok());
        assert!(validate_database_url("sqlite:///tmp/x.db?mode=rwc").is_ok());
        assert!(matches!(validate_database_url(""), Err(Error::Config(_))));
        assert!(matches!(
            validate_database_url("postgres://localhost/archive"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert!(config.database_url.is_none());
        assert!(config.sources.is_none());
        assert!(config.logging.format.is_none());
    }

    #[test]
    fn test_toml_full_document() {
        let config: TomlConfig = toml::from_str(
            r#"
            database_url = "sqlite::memory:"
            sources = ["https://example.org/2023.json", "https://example.org/2024.json"]
            http_timeout_secs = 10
            validate_all_records = true

            [logging]
            level = "debug"
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.database_url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(config.sources.as_ref().map(|s| s.len()), Some(2));
        assert_eq!(config.http_timeout_secs, Some(10));
        assert_eq!(config.validate_all_records, Some(true));
        assert_eq!(config.logging.format, Some(LogFormat::Json));
    }
}
